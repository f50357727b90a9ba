//! Graphics support via embedded-graphics
//!
//! [`GraphicSurface`] wraps any [`PixelSurface`] (a [`Display`](crate::Display)
//! or a [`Canvas`](crate::Canvas)) and implements
//! [`DrawTarget`] with [`Rgb565`] colours, so the
//! embedded-graphics primitives, fonts and image decoders draw straight
//! through the surface's clipping and transfer paths.
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{
//!     pixelcolor::Rgb565,
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//! use tft_render::{Canvas, Color, ColorDepth, GraphicSurface, PixelSurface};
//!
//! let canvas = Canvas::new(64, 32, ColorDepth::Bpp16, 1).unwrap();
//! let mut target = GraphicSurface::new(canvas);
//!
//! Rectangle::new(Point::new(4, 4), Size::new(10, 6))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
//!     .draw(&mut target)
//!     .unwrap();
//!
//! let mut canvas = target.into_inner();
//! assert_eq!(canvas.read_pixel(5, 5).unwrap(), Color::RED);
//! ```

use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Size},
    pixelcolor::Rgb565,
    prelude::{Pixel, Point},
    primitives::Rectangle,
};

use crate::color::Color;
use crate::surface::{PixelSurface, with_native_order};

/// Pixels converted per push in `fill_contiguous`
const ROW_CHUNK: usize = 64;

/// Surface adapter for embedded-graphics
///
/// Drawing coordinates are relative to the viewport datum of the wrapped
/// surface, the same as its own drawing calls.
pub struct GraphicSurface<S> {
    surface: S,
}

impl<S> GraphicSurface<S>
where
    S: PixelSurface,
{
    /// Wrap a surface
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    /// Access the wrapped surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Access the wrapped surface mutably
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Give back the wrapped surface
    pub fn into_inner(self) -> S {
        self.surface
    }
}

impl<S> DrawTarget for GraphicSurface<S>
where
    S: PixelSurface,
{
    type Color = Rgb565;
    type Error = S::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            self.surface.draw_pixel(x, y, color.into())?;
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let Point { x, y } = area.top_left;
        let (w, h) = (area.size.width as i32, area.size.height as i32);
        let mut colors = colors.into_iter();
        with_native_order(&mut self.surface, |surface: &mut S| -> Result<(), S::Error> {
            let mut line = [0u16; ROW_CHUNK];
            for row in 0..h {
                let mut col = 0;
                while col < w {
                    let n = (w - col).min(ROW_CHUNK as i32);
                    for slot in &mut line[..n as usize] {
                        *slot = colors.next().map_or(0, |c| Color::from(c).0);
                    }
                    surface.push_image(x + col, y + row, n, 1, &line[..n as usize], None)?;
                    col += n;
                }
            }
            Ok(())
        })
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let Point { x, y } = area.top_left;
        self.surface.fill_rect(
            x,
            y,
            area.size.width as i32,
            area.size.height as i32,
            color.into(),
        )
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let size = self.size();
        self.surface
            .fill_rect(0, 0, size.width as i32, size.height as i32, color.into())
    }
}

impl<S> OriginDimensions for GraphicSurface<S>
where
    S: PixelSurface,
{
    fn size(&self) -> Size {
        let viewport = self.surface.viewport();
        Size::new(
            viewport.datum_width().max(0) as u32,
            viewport.datum_height().max(0) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::display::tests::{Op, test_display};
    use crate::pixmap::ColorDepth;
    use embedded_graphics::{
        prelude::*,
        primitives::{Circle, PrimitiveStyle},
    };

    fn canvas(w: i32, h: i32) -> GraphicSurface<Canvas> {
        let mut canvas = Canvas::new(w, h, ColorDepth::Bpp16, 1).unwrap();
        canvas.fill_sprite(Color::BLACK);
        GraphicSurface::new(canvas)
    }

    #[test]
    fn test_size_follows_viewport() {
        let mut target = canvas(40, 30);
        assert_eq!(target.size(), Size::new(40, 30));
        target.surface_mut().set_viewport(5, 5, 10, 8, true);
        assert_eq!(target.size(), Size::new(10, 8));
    }

    #[test]
    fn test_fill_solid_is_clipped() {
        let mut target = canvas(16, 16);
        Rectangle::new(Point::new(-4, 12), Size::new(8, 8))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::GREEN))
            .draw(&mut target)
            .unwrap();
        let surface = target.surface_mut();
        assert_eq!(surface.read_pixel(0, 15).unwrap(), Color::GREEN);
        assert_eq!(surface.read_pixel(3, 12).unwrap(), Color::GREEN);
        assert_eq!(surface.read_pixel(4, 12).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_circle_outline_on_canvas() {
        let mut target = canvas(32, 32);
        Circle::new(Point::new(4, 4), 21)
            .into_styled(PrimitiveStyle::with_stroke(Rgb565::WHITE, 1))
            .draw(&mut target)
            .unwrap();
        let surface = target.surface_mut();
        assert_eq!(surface.read_pixel(14, 4).unwrap(), Color::WHITE);
        assert_eq!(surface.read_pixel(14, 14).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_fill_contiguous_ignores_swap_flag() {
        let mut target = canvas(8, 8);
        target.surface_mut().set_swap_bytes(true);
        let area = Rectangle::new(Point::new(6, 0), Size::new(3, 2));
        let colors = [
            Rgb565::RED,
            Rgb565::GREEN,
            Rgb565::BLUE,
            Rgb565::WHITE,
            Rgb565::RED,
            Rgb565::GREEN,
        ];
        target.fill_contiguous(&area, colors).unwrap();
        let surface = target.surface_mut();
        assert!(surface.swap_bytes());
        assert_eq!(surface.read_pixel(6, 0).unwrap(), Color::RED);
        assert_eq!(surface.read_pixel(7, 0).unwrap(), Color::GREEN);
        assert_eq!(surface.read_pixel(6, 1).unwrap(), Color::WHITE);
        assert_eq!(surface.read_pixel(7, 1).unwrap(), Color::RED);
    }

    #[test]
    fn test_display_target_writes_through_bus() {
        let mut target = GraphicSurface::new(test_display(8, 4));
        target.clear(Rgb565::BLUE).unwrap();
        Pixel(Point::new(2, 1), Rgb565::RED)
            .draw(&mut target)
            .unwrap();
        let display = target.into_inner();
        let bus = display.bus();
        assert_eq!(bus.pixel(2, 1), Color::RED.0);
        assert_eq!(bus.pixel(3, 1), Color::BLUE.0);
        assert!(bus.ops.contains(&Op::Window(2, 1, 2, 1)));
    }
}
