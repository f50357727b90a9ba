//! Pixel surface capability
//!
//! [`PixelSurface`] is what every drawing algorithm in the crate targets. The
//! device ([`Display`](crate::display::Display)) and the in-memory
//! [`Canvas`](crate::canvas::Canvas) both implement it, so shapes, smooth
//! primitives, rotated pushes and text are written once.
//!
//! Coordinates passed to drawing calls are relative to the viewport datum and
//! clipped against the viewport. Window streaming (`set_window` and the push
//! calls after it) uses absolute surface coordinates and is not clipped, the
//! same as the bus it mirrors.

use crate::color::Color;
use crate::viewport::Viewport;

/// Something that receives pixel writes
pub trait PixelSurface {
    /// Error reported by the underlying storage or bus
    type Error;

    /// Logical width in the current rotation
    fn width(&self) -> i32;

    /// Logical height in the current rotation
    fn height(&self) -> i32;

    /// Active viewport
    fn viewport(&self) -> &Viewport;

    /// Active viewport, mutable
    fn viewport_mut(&mut self) -> &mut Viewport;

    /// Point rotated pushes onto this surface are centred on
    fn pivot(&self) -> (i32, i32);

    /// Whether raw pixel data pushed to this surface is byte swapped
    fn swap_bytes(&self) -> bool;

    /// Set the byte swap flag for raw pixel pushes
    fn set_swap_bytes(&mut self, swap: bool);

    /// Write one pixel; points outside the viewport are ignored
    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<(), Self::Error>;

    /// Read one pixel; points outside the viewport read as black
    fn read_pixel(&mut self, x: i32, y: i32) -> Result<Color, Self::Error>;

    /// Fill a rectangle clipped to the viewport
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color)
    -> Result<(), Self::Error>;

    /// Copy a `w` x `h` block of RGB565 pixels, clipped to the viewport
    ///
    /// Pixels equal to `transparent` (compared before any byte swap is undone)
    /// leave the surface untouched. Rows missing from a short `data` slice are
    /// skipped.
    fn push_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u16],
        transparent: Option<Color>,
    ) -> Result<(), Self::Error>;

    /// Open an inclusive window in absolute coordinates for streaming
    fn set_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), Self::Error>;

    /// Stream one colour into the open window
    fn push_color(&mut self, color: Color) -> Result<(), Self::Error>;

    /// Stream `len` copies of one colour into the open window
    fn push_block(&mut self, color: Color, len: u32) -> Result<(), Self::Error>;

    /// Stream raw pixels into the open window, undoing the byte swap if set
    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), Self::Error>;

    /// Horizontal line of `w` pixels
    fn draw_fast_hline(&mut self, x: i32, y: i32, w: i32, color: Color) -> Result<(), Self::Error> {
        self.fill_rect(x, y, w, 1, color)
    }

    /// Vertical line of `h` pixels
    fn draw_fast_vline(&mut self, x: i32, y: i32, h: i32, color: Color) -> Result<(), Self::Error> {
        self.fill_rect(x, y, 1, h, color)
    }

    /// Copy the pixels of a `w` x `h` image whose mask bit is set
    ///
    /// `mask` is 1 bpp, most significant bit first, each row padded to a
    /// whole byte. Set pixels go out in runs through
    /// [`push_image`](Self::push_image), so clipping and the byte swap apply
    /// as there. Rows missing from a short `img` or `mask` are skipped.
    fn push_masked_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        img: &[u16],
        mask: &[u8],
    ) -> Result<(), Self::Error> {
        let Some(rect) = self.viewport().clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        let mask_stride = (w as usize).div_ceil(8);
        let (skip, visible) = (rect.dx as usize, rect.w as usize);
        for row in 0..rect.h {
            let line = (rect.dy + row) as usize;
            let Some(start) = rect.source_offset(row, w) else {
                break;
            };
            let pixels = img.get(start..start + visible);
            let bits = line
                .checked_mul(mask_stride)
                .and_then(|base| mask.get(base..base + mask_stride));
            let (Some(pixels), Some(bits)) = (pixels, bits) else {
                break;
            };
            let is_set = |col: usize| {
                let col = skip + col;
                bits[col / 8] & (0x80 >> (col % 8)) != 0
            };

            let py = y.saturating_add(rect.dy + row);
            let mut col = 0;
            while col < visible {
                if !is_set(col) {
                    col += 1;
                    continue;
                }
                let run_start = col;
                while col < visible && is_set(col) {
                    col += 1;
                }
                let px = x.saturating_add((skip + run_start) as i32);
                let run = &pixels[run_start..col];
                self.push_image(px, py, run.len() as i32, 1, run, None)?;
            }
        }
        Ok(())
    }

    /// Replace the viewport; see [`Viewport::set`]
    fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32, datum: bool) {
        self.viewport_mut().set(x, y, w, h, datum);
    }

    /// Restore the full-surface viewport
    fn reset_viewport(&mut self) {
        self.viewport_mut().reset();
    }

    /// Whether any part of the area is visible
    fn check_viewport(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.viewport().check(x, y, w, h)
    }
}

/// Run `f` with the surface byte swap turned off, restoring it afterwards
///
/// Used when pushing pixels that were decoded in native order.
pub(crate) fn with_native_order<S, R>(surface: &mut S, f: impl FnOnce(&mut S) -> R) -> R
where
    S: PixelSurface + ?Sized,
{
    let swap = surface.swap_bytes();
    surface.set_swap_bytes(false);
    let result = f(surface);
    surface.set_swap_bytes(swap);
    result
}
