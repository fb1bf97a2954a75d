//! Mapping normalized landmark coordinates onto the on-screen video rectangle.
//!
//! A video shown with `object-fit: contain` semantics keeps its aspect ratio: when it doesn't match
//! the aspect ratio of the box it is displayed in, black bars are added above and below
//! (letterboxing) or left and right (pillarboxing). [`DisplayGeometry`] describes where the video
//! content ends up inside the box.

use std::fmt;

use crate::landmark::Landmark;
use crate::video::VideoSource;

/// Resolution (`width x height`) of a video or canvas, in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns whether this resolution has zero width or height.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `width / height`, or [`None`] if `self` [`is_empty`][Self::is_empty].
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Size of the box a video element is rendered into, in (possibly fractional) screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns whether the box has no visible area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Returns the canvas resolution that covers this box.
    pub fn to_resolution(&self) -> Resolution {
        Resolution::new(to_pixels(self.width), to_pixels(self.height))
    }
}

fn to_pixels(v: f32) -> u32 {
    if v > 0.0 {
        v.round() as u32
    } else {
        0
    }
}

/// Placement of the rendered video content inside its display box.
///
/// A normalized coordinate `(x, y)` maps to the pixel
/// `(x * scale_x + offset_x, y * scale_y + offset_y)` of the display box.
///
/// The offsets are never negative. At most one of them is non-zero: either the video fills the
/// box's width and is letterboxed, or it fills the height and is pillarboxed. Both are zero when
/// the aspect ratios match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    pub video_width: f32,
    pub video_height: f32,
    pub display_width: f32,
    pub display_height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl DisplayGeometry {
    /// Computes the geometry of a video with intrinsic resolution `video` shown in `display`.
    ///
    /// If the intrinsic resolution is unknown (eg. because the video's metadata hasn't loaded yet)
    /// or empty, the video is assumed to have the size of the display box.
    pub fn compute(video: Option<Resolution>, display: DisplaySize) -> Self {
        let DisplaySize {
            width: display_width,
            height: display_height,
        } = display;

        if display.is_empty() {
            return Self {
                video_width: 0.0,
                video_height: 0.0,
                display_width: display_width.max(0.0),
                display_height: display_height.max(0.0),
                scale_x: 0.0,
                scale_y: 0.0,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }

        let (video_width, video_height) = match video {
            Some(res) if !res.is_empty() => (res.width() as f32, res.height() as f32),
            _ => (display_width, display_height),
        };

        let video_aspect = video_width / video_height;
        let display_aspect = display_width / display_height;

        let (actual_width, actual_height, offset_x, offset_y);
        if video_aspect > display_aspect {
            // Video is wider than the box: fills the width, bars above and below.
            actual_width = display_width;
            actual_height = display_width / video_aspect;
            offset_x = 0.0;
            offset_y = (display_height - actual_height) / 2.0;
        } else {
            // Video is taller (or equal): fills the height, bars left and right.
            actual_width = display_height * video_aspect;
            actual_height = display_height;
            offset_x = (display_width - actual_width) / 2.0;
            offset_y = 0.0;
        }

        let geometry = Self {
            video_width,
            video_height,
            display_width,
            display_height,
            scale_x: actual_width,
            scale_y: actual_height,
            // Rounding can push an offset slightly below zero when the aspect ratios match.
            offset_x: offset_x.max(0.0),
            offset_y: offset_y.max(0.0),
        };
        log::trace!(
            "video {}x{} in {}x{} box -> {:?}",
            video_width,
            video_height,
            display_width,
            display_height,
            geometry
        );
        geometry
    }

    /// Computes the current geometry of `video`.
    ///
    /// This has to be called again whenever the video or its display box changes size. Calling it
    /// once per processed frame is cheap.
    pub fn of_video<V: VideoSource + ?Sized>(video: &V) -> Self {
        Self::compute(video.intrinsic_resolution(), video.display_size())
    }

    /// Maps a normalized coordinate to display box pixels.
    #[inline]
    pub fn to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale_x + self.offset_x,
            y * self.scale_y + self.offset_y,
        )
    }

    /// Maps the X and Y coordinates of `landmark` to display box pixels.
    #[inline]
    pub fn project(&self, landmark: &Landmark) -> (f32, f32) {
        self.to_pixel(landmark.x(), landmark.y())
    }
}
