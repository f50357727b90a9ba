//! Packed image payloads
//!
//! An [`Image`] borrows pixel data at 1, 4, 8 or 16 bits per pixel and draws
//! it onto any [`PixelSurface`]. Packing matches the canvas frames: 1 and 4
//! bpp rows are padded to whole bytes with the leftmost pixel in the most
//! significant bits.
//!
//! A transparent key, when set, is compared against the stored value before
//! any decoding: the bit for 1 bpp, the palette index for 4 bpp, the RGB332
//! byte for 8 bpp. For 16 bpp it is the native RGB565 colour, matched against
//! the data the same way the destination's `push_image` matches it.
//!
//! ```
//! use tft_render::{Canvas, Color, ColorDepth, Image, Pixels, PixelSurface};
//!
//! let mut canvas = Canvas::new(16, 16, ColorDepth::Bpp16, 1).unwrap();
//! // 8x2 arrow head, 1 bpp
//! let arrow = [0b0001_1000, 0b0011_1100];
//! let image = Image::new(8, 2, Pixels::Mono { data: &arrow, fg: Color::YELLOW, bg: Color::BLACK })
//!     .unwrap()
//!     .with_transparent(Some(0));
//! image.draw(&mut canvas, 4, 4).unwrap();
//! assert_eq!(canvas.read_pixel(7, 4).unwrap(), Color::YELLOW);
//! ```

use crate::color::Color;
use crate::error::ImageError;
use crate::surface::{PixelSurface, with_native_order};

/// Pixels decoded per push
const RUN_CHUNK: usize = 64;

/// Borrowed pixel data of an [`Image`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pixels<'a> {
    /// 1 bpp, set bits drawn in `fg`, clear bits in `bg`
    Mono {
        /// Packed rows
        data: &'a [u8],
        /// Colour of set bits
        fg: Color,
        /// Colour of clear bits
        bg: Color,
    },
    /// 4 bpp palette indices; indices past the palette draw black
    Indexed4 {
        /// Packed rows
        data: &'a [u8],
        /// Up to 16 colours
        palette: &'a [Color],
    },
    /// 8 bpp RGB332
    Rgb332(&'a [u8]),
    /// 16 bpp RGB565, subject to the destination byte swap flag
    Rgb565(&'a [u16]),
}

/// A sized view over packed pixel data
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Image<'a> {
    width: i32,
    height: i32,
    pixels: Pixels<'a>,
    transparent: Option<u16>,
}

impl<'a> Image<'a> {
    /// Describe a `width` x `height` image
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidSize`] for a negative side and
    /// [`ImageError::BufferTooSmall`] if the data cannot cover the image.
    pub fn new(width: i32, height: i32, pixels: Pixels<'a>) -> Result<Self, ImageError> {
        if width < 0 || height < 0 {
            return Err(ImageError::InvalidSize);
        }
        let (w, h) = (width as usize, height as usize);
        let (required, provided) = match pixels {
            Pixels::Mono { data, .. } => (w.div_ceil(8).saturating_mul(h), data.len()),
            Pixels::Indexed4 { data, .. } => (w.div_ceil(2).saturating_mul(h), data.len()),
            Pixels::Rgb332(data) => (w.saturating_mul(h), data.len()),
            Pixels::Rgb565(data) => (w.saturating_mul(h), data.len()),
        };
        if provided < required {
            return Err(ImageError::BufferTooSmall { required, provided });
        }
        Ok(Self {
            width,
            height,
            pixels,
            transparent: None,
        })
    }

    /// Skip pixels whose stored value equals `key`
    pub fn with_transparent(mut self, key: Option<u16>) -> Self {
        self.transparent = key;
        self
    }

    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Stored value at `(x, y)`; the caller keeps the point inside the image
    fn raw(&self, x: usize, y: usize) -> u16 {
        let w = self.width as usize;
        match self.pixels {
            Pixels::Mono { data, .. } => {
                let byte = data[y * w.div_ceil(8) + x / 8];
                u16::from((byte >> (7 - (x & 7))) & 1)
            }
            Pixels::Indexed4 { data, .. } => {
                let byte = data[y * w.div_ceil(2) + x / 2];
                u16::from(if x & 1 == 0 { byte >> 4 } else { byte & 0x0F })
            }
            Pixels::Rgb332(data) => u16::from(data[y * w + x]),
            Pixels::Rgb565(data) => data[y * w + x],
        }
    }

    fn decode(&self, raw: u16) -> Color {
        match self.pixels {
            Pixels::Mono { fg, bg, .. } => {
                if raw != 0 {
                    fg
                } else {
                    bg
                }
            }
            Pixels::Indexed4 { palette, .. } => {
                palette.get(raw as usize).copied().unwrap_or(Color::BLACK)
            }
            Pixels::Rgb332(_) => Color::from_rgb332(raw as u8),
            Pixels::Rgb565(_) => Color(raw),
        }
    }

    /// Colour of the pixel at `(x, y)`, or `None` outside the image
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.decode(self.raw(x as usize, y as usize)))
    }

    /// Draw the image with its top-left corner at `(x, y)`
    ///
    /// Clipped to the surface viewport. Only visible pixels are decoded.
    pub fn draw<S>(&self, surface: &mut S, x: i32, y: i32) -> Result<(), S::Error>
    where
        S: PixelSurface + ?Sized,
    {
        if let Pixels::Rgb565(data) = self.pixels {
            let key = self.transparent.map(Color);
            return surface.push_image(x, y, self.width, self.height, data, key);
        }
        let Some(rect) = surface
            .viewport()
            .clip_addr_window(x, y, self.width, self.height)
        else {
            return Ok(());
        };

        with_native_order(surface, |surface: &mut S| -> Result<(), S::Error> {
            let mut line = [0u16; RUN_CHUNK];
            for row in rect.dy..rect.dy + rect.h {
                let mut run = 0usize;
                let mut run_x = 0;
                for col in rect.dx..rect.dx + rect.w {
                    let raw = self.raw(col as usize, row as usize);
                    if Some(raw) == self.transparent {
                        if run > 0 {
                            surface.push_image(x + run_x, y + row, run as i32, 1, &line[..run], None)?;
                            run = 0;
                        }
                        continue;
                    }
                    if run == 0 {
                        run_x = col;
                    }
                    line[run] = self.decode(raw).0;
                    run += 1;
                    if run == RUN_CHUNK {
                        surface.push_image(x + run_x, y + row, run as i32, 1, &line, None)?;
                        run = 0;
                    }
                }
                if run > 0 {
                    surface.push_image(x + run_x, y + row, run as i32, 1, &line[..run], None)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::pixmap::ColorDepth;

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new(16, 16, ColorDepth::Bpp16, 1).unwrap();
        canvas.fill_sprite(Color::NAVY);
        canvas
    }

    #[test]
    fn test_new_checks_data_length() {
        let data = [0u8; 3];
        let result = Image::new(9, 2, Pixels::Rgb332(&data));
        assert_eq!(
            result.unwrap_err(),
            ImageError::BufferTooSmall {
                required: 18,
                provided: 3
            }
        );
        let mono = [0u8; 4];
        let pixels = Pixels::Mono {
            data: &mono,
            fg: Color::WHITE,
            bg: Color::BLACK,
        };
        assert!(Image::new(9, 2, pixels).is_ok());
        assert_eq!(Image::new(-1, 2, pixels).unwrap_err(), ImageError::InvalidSize);
    }

    #[test]
    fn test_mono_with_background() {
        let mut canvas = canvas();
        let data = [0b1000_0001];
        let image = Image::new(
            8,
            1,
            Pixels::Mono {
                data: &data,
                fg: Color::RED,
                bg: Color::GREEN,
            },
        )
        .unwrap();
        image.draw(&mut canvas, 2, 3).unwrap();
        assert_eq!(canvas.read_pixel(2, 3).unwrap(), Color::RED);
        assert_eq!(canvas.read_pixel(3, 3).unwrap(), Color::GREEN);
        assert_eq!(canvas.read_pixel(9, 3).unwrap(), Color::RED);
        assert_eq!(canvas.read_pixel(10, 3).unwrap(), Color::NAVY);
    }

    #[test]
    fn test_indexed_with_transparent_index() {
        let mut canvas = canvas();
        let palette = [Color::BLACK, Color::WHITE, Color::ORANGE];
        let data = [0x12, 0x0F];
        let image = Image::new(3, 1, Pixels::Indexed4 { data: &data, palette: &palette })
            .unwrap()
            .with_transparent(Some(0));
        image.draw(&mut canvas, 0, 0).unwrap();
        assert_eq!(canvas.read_pixel(0, 0).unwrap(), Color::WHITE);
        assert_eq!(canvas.read_pixel(1, 0).unwrap(), Color::ORANGE);
        assert_eq!(canvas.read_pixel(2, 0).unwrap(), Color::NAVY);
        assert_eq!(image.pixel(2, 0), Some(Color::BLACK));
        assert_eq!(image.pixel(3, 0), None);
    }

    #[test]
    fn test_rgb332_clipped() {
        let mut canvas = canvas();
        let data = [0xE0, 0x1C, 0x03, 0xFF];
        let image = Image::new(2, 2, Pixels::Rgb332(&data)).unwrap();
        image.draw(&mut canvas, -1, 15).unwrap();
        assert_eq!(canvas.read_pixel(0, 15).unwrap(), Color::from_rgb332(0x1C));
        assert_eq!(canvas.read_pixel(1, 15).unwrap(), Color::NAVY);
    }

    #[test]
    fn test_rgb565_honours_swap_flag() {
        let mut canvas = canvas();
        canvas.set_swap_bytes(true);
        let data = [0x00F8u16, Color::TRANSPARENT.0.swap_bytes()];
        let image = Image::new(2, 1, Pixels::Rgb565(&data))
            .unwrap()
            .with_transparent(Some(Color::TRANSPARENT.0));
        image.draw(&mut canvas, 0, 0).unwrap();
        assert_eq!(canvas.read_pixel(0, 0).unwrap(), Color::RED);
        assert_eq!(canvas.read_pixel(1, 0).unwrap(), Color::NAVY);
    }

    #[test]
    fn test_decoded_depths_ignore_swap_flag() {
        let mut canvas = canvas();
        canvas.set_swap_bytes(true);
        let data = [0xE0];
        Image::new(1, 1, Pixels::Rgb332(&data))
            .unwrap()
            .draw(&mut canvas, 0, 0)
            .unwrap();
        assert_eq!(canvas.read_pixel(0, 0).unwrap(), Color::from_rgb332(0xE0));
        assert!(canvas.swap_bytes());
    }
}
