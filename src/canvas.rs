//! The transparent surface the skeleton is drawn on.
//!
//! The overlay canvas is positioned over the video by the host, covers the video's display box, and
//! never receives input. This module only cares about its pixels.

use crate::geometry::Resolution;
use crate::image::{Color, Image};

/// A drawing surface that can be resized to match the video's display box.
pub trait Canvas {
    /// Returns the current size of the canvas, in pixels.
    fn resolution(&self) -> Resolution;

    /// Changes the size of the canvas. The contents are discarded.
    fn resize(&mut self, resolution: Resolution);

    /// Returns the pixels to draw on.
    ///
    /// Returns [`None`] when the canvas can't be drawn to right now (for example because it has no
    /// area). Drawing for the current frame is skipped in that case.
    fn surface(&mut self) -> Option<&mut Image>;
}

/// A [`Canvas`] backed by an in-memory [`Image`].
#[derive(Debug, Clone)]
pub struct OverlayCanvas {
    image: Image,
}

impl OverlayCanvas {
    /// Creates a fully transparent canvas of the given size.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            image: Image::new(resolution.width(), resolution.height()),
        }
    }

    /// Returns the current contents of the canvas.
    pub fn image(&self) -> &Image {
        &self.image
    }
}

impl Default for OverlayCanvas {
    fn default() -> Self {
        Self::new(Resolution::default())
    }
}

impl Canvas for OverlayCanvas {
    fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    fn resize(&mut self, resolution: Resolution) {
        log::trace!("resizing overlay canvas {} -> {}", self.resolution(), resolution);
        self.image = Image::new(resolution.width(), resolution.height());
    }

    fn surface(&mut self) -> Option<&mut Image> {
        if self.image.resolution().is_empty() {
            None
        } else {
            Some(&mut self.image)
        }
    }
}

impl<C: Canvas + ?Sized> Canvas for &mut C {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn resize(&mut self, resolution: Resolution) {
        (**self).resize(resolution)
    }

    fn surface(&mut self) -> Option<&mut Image> {
        (**self).surface()
    }
}

impl<C: Canvas + ?Sized> Canvas for Box<C> {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn resize(&mut self, resolution: Resolution) {
        (**self).resize(resolution)
    }

    fn surface(&mut self) -> Option<&mut Image> {
        (**self).surface()
    }
}

/// Clears the whole canvas to transparent, if it can be drawn to.
pub fn clear<C: Canvas + ?Sized>(canvas: &mut C) {
    if let Some(surface) = canvas.surface() {
        surface.clear(Color::NONE);
    }
}
