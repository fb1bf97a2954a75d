//! Drawing primitives.
//!
//! Every function returns a guard that draws when dropped and can be used to customize the drawn
//! shape first:
//!
//! ```
//! # use pose_overlay::image::{draw, Color, Image};
//! let mut image = Image::new(64, 64);
//! draw::line(&mut image, 2, 2, 60, 60).color(Color::GREEN).stroke_width(2);
//! ```

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
};

use super::{Color, Image};

/// Guard returned by [`line`]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: &'a mut Image,
    start: Point,
    end: Point,
    color: Color,
    stroke_width: u32,
}

impl DrawLine<'_> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawLine<'_> {
    fn drop(&mut self) {
        match Line::new(self.start, self.end)
            .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width))
            .draw(&mut Target(&mut *self.image))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Guard returned by [`dot`]; draws the filled circle when dropped and allows customization.
pub struct DrawDot<'a> {
    image: &'a mut Image,
    center: Point,
    radius: u32,
    color: Color,
}

impl DrawDot<'_> {
    /// Sets the dot's fill color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the dot's radius, in pixels.
    ///
    /// The default radius is 4.
    pub fn radius(&mut self, radius: u32) -> &mut Self {
        self.radius = radius;
        self
    }
}

impl Drop for DrawDot<'_> {
    fn drop(&mut self) {
        let diameter = self.radius * 2 + 1;
        match Circle::with_center(self.center, diameter)
            .into_styled(PrimitiveStyle::with_fill(self.color))
            .draw(&mut Target(&mut *self.image))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws a line from `(start_x, start_y)` to `(end_x, end_y)`.
///
/// Parts of the line outside of the image are clipped.
pub fn line(
    image: &mut Image,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
) -> DrawLine<'_> {
    DrawLine {
        image,
        start: Point::new(start_x, start_y),
        end: Point::new(end_x, end_y),
        color: Color::GREEN,
        stroke_width: 1,
    }
}

/// Draws a filled circle centered at `(x, y)`.
pub fn dot(image: &mut Image, x: i32, y: i32) -> DrawDot<'_> {
    DrawDot {
        image,
        center: Point::new(x, y),
        radius: 4,
        color: Color::GREEN,
    }
}

struct Target<'a>(&'a mut Image);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                self.0.set(point.x as u32, point.y as u32, color);
            }
        }

        Ok(())
    }
}
