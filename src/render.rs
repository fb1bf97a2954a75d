//! Skeleton drawing.

use std::fmt;

use crate::canvas::Canvas;
use crate::filter::{self, VisibilityGate};
use crate::geometry::DisplayGeometry;
use crate::image::{draw, Color};
use crate::landmark::{BodyRegion, LandmarkIdx, PoseFrame, CONNECTIONS};

/// Colors and sizes used when drawing a skeleton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonStyle {
    pub bone_color: Color,
    pub bone_width: u32,
    /// Color of head and face joints ([`BodyRegion::Core`]).
    pub core_color: Color,
    /// Color of all other joints ([`BodyRegion::Limb`]).
    pub limb_color: Color,
    pub joint_radius: u32,
}

impl Default for SkeletonStyle {
    fn default() -> Self {
        Self {
            bone_color: Color::from_rgb8(0x00, 0xff, 0x00),
            bone_width: 2,
            core_color: Color::from_rgb8(0xff, 0x6b, 0x6b),
            limb_color: Color::from_rgb8(0x38, 0xbd, 0xf8),
            joint_radius: 4,
        }
    }
}

impl SkeletonStyle {
    pub fn joint_color(&self, region: BodyRegion) -> Color {
        match region {
            BodyRegion::Core => self.core_color,
            BodyRegion::Limb => self.limb_color,
        }
    }
}

/// Error returned by [`SkeletonRenderer::render`] when the canvas has no drawing surface.
#[derive(Debug, Clone, Copy)]
pub struct RenderError {
    _priv: (),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("overlay canvas has no drawing surface")
    }
}

impl std::error::Error for RenderError {}

/// Draws the bones and joints of a [`PoseFrame`] onto a [`Canvas`].
#[derive(Debug, Clone, Default)]
pub struct SkeletonRenderer {
    style: SkeletonStyle,
    gate: VisibilityGate,
}

impl SkeletonRenderer {
    pub fn new(style: SkeletonStyle) -> Self {
        Self {
            style,
            gate: VisibilityGate::default(),
        }
    }

    pub fn style(&self) -> &SkeletonStyle {
        &self.style
    }

    /// Replaces the canvas contents with the skeleton of `frame`.
    ///
    /// Landmark positions are mapped to canvas pixels through `geometry`. If `mirror` is set, every
    /// X coordinate is mirrored first, which puts the skeleton exactly where the landmarks returned
    /// by [`filter::transform`] with the same `mirror` flag point.
    ///
    /// Only bones whose both ends pass the visibility gate are drawn, and only joints that pass it
    /// get a dot. Bones are drawn first, joints on top.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        frame: &PoseFrame,
        geometry: &DisplayGeometry,
        mirror: bool,
    ) -> Result<(), RenderError> {
        let surface = canvas.surface().ok_or(RenderError { _priv: () })?;
        surface.clear(Color::NONE);

        let pixel = |idx: LandmarkIdx| {
            let mut lm = frame.get(idx);
            if mirror {
                lm = filter::mirror(lm);
            }
            let (x, y) = geometry.project(&lm);
            (x.round() as i32, y.round() as i32)
        };

        for &(a, b) in CONNECTIONS {
            if !self.gate.is_bone_visible(frame, (a, b)) {
                continue;
            }
            let (ax, ay) = pixel(a);
            let (bx, by) = pixel(b);
            draw::line(surface, ax, ay, bx, by)
                .color(self.style.bone_color)
                .stroke_width(self.style.bone_width);
        }

        for idx in LandmarkIdx::ALL {
            if !self.gate.is_visible(&frame[idx]) {
                continue;
            }
            let (x, y) = pixel(idx);
            draw::dot(surface, x, y)
                .radius(self.style.joint_radius)
                .color(self.style.joint_color(idx.region()));
        }

        Ok(())
    }
}
