//! Offscreen canvases
//!
//! A [`Canvas`] is an in-memory [`PixelSurface`] at 1, 4, 8 or 16 bits per
//! pixel. Everything that draws on the display draws on a canvas too, and a
//! finished canvas can be pushed onto any other surface, with or without a
//! transparent colour.
//!
//! ## Depths
//!
//! - 16 bpp stores RGB565 as is
//! - 8 bpp stores RGB332
//! - 4 bpp stores indices into a 16-entry palette
//! - 1 bpp stores a bit per pixel, shown with the bitmap foreground and
//!   background colours
//!
//! ## Example
//!
//! ```
//! use tft_render::{Canvas, Color, ColorDepth, PixelSurface};
//!
//! let mut sprite = match Canvas::new(32, 32, ColorDepth::Bpp16, 1) {
//!     Ok(sprite) => sprite,
//!     Err(_) => return,
//! };
//! sprite.fill_sprite(Color::RED);
//!
//! let mut screen = match Canvas::new(64, 64, ColorDepth::Bpp16, 1) {
//!     Ok(screen) => screen,
//!     Err(_) => return,
//! };
//! let _ = sprite.push_to(&mut screen, 16, 16, None);
//! assert_eq!(screen.read_pixel(16, 16), Ok(Color::RED));
//! assert_eq!(screen.read_pixel(0, 0), Ok(Color::BLACK));
//! ```

use alloc::vec::Vec;
use core::convert::Infallible;

use crate::blit::RotationState;
use crate::color::{DEFAULT_4BIT_PALETTE, distance};
use crate::config::Rotation;
use crate::error::{CanvasError, MAX_DIMENSION};
use crate::pixmap::{ColorDepth, PixelBuffer};
use crate::rotation::{apply_rotation, rotated_size};
use crate::surface::{PixelSurface, with_native_order};
use crate::viewport::Viewport;
use crate::Color;

/// Pixels decoded per push when a canvas is copied to another surface
const LINE_CHUNK: usize = 64;

/// Streaming window state for `set_window`/`push_color`
#[derive(Clone, Copy, Debug)]
struct StreamWindow {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    x: i32,
    y: i32,
}

impl StreamWindow {
    const EMPTY: Self = Self {
        x0: 0,
        y0: 0,
        x1: -1,
        y1: -1,
        x: 0,
        y: 0,
    };

    fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }
}

/// Area moved by [`Canvas::scroll`]
#[derive(Clone, Copy, Debug)]
struct ScrollRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    fill: Color,
}

/// Offscreen pixel surface
#[derive(Clone, Debug)]
pub struct Canvas {
    /// Physical width of each frame
    width: i32,
    /// Physical height of each frame
    height: i32,
    depth: ColorDepth,
    frames: Vec<PixelBuffer>,
    frame_count: u8,
    active: usize,
    rotation: Rotation,
    palette: [Color; 16],
    bitmap_fg: Color,
    bitmap_bg: Color,
    viewport: Viewport,
    pivot: (i32, i32),
    swap_bytes: bool,
    window: StreamWindow,
    scroll: ScrollRect,
    pub(crate) rotation_state: RotationState,
}

impl Canvas {
    /// Allocate a canvas
    ///
    /// `frames` is 1, or 2 for double-buffered use with
    /// [`select_frame`](Self::select_frame).
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::InvalidSize` for empty or oversized dimensions,
    /// `CanvasError::InvalidFrames` for a frame count other than 1 or 2 and
    /// `CanvasError::OutOfMemory` if the buffers cannot be allocated.
    pub fn new(width: i32, height: i32, depth: ColorDepth, frames: u8) -> Result<Self, CanvasError> {
        let max = i32::from(MAX_DIMENSION);
        if width < 1 || height < 1 || width > max || height > max {
            return Err(CanvasError::InvalidSize { width, height });
        }
        if !(1..=2).contains(&frames) {
            return Err(CanvasError::InvalidFrames(frames));
        }
        let mut canvas = Self {
            width,
            height,
            depth,
            frames: Vec::new(),
            frame_count: frames,
            active: 0,
            rotation: Rotation::Rotate0,
            palette: DEFAULT_4BIT_PALETTE,
            bitmap_fg: Color::WHITE,
            bitmap_bg: Color::BLACK,
            viewport: Viewport::new(width, height),
            pivot: (width / 2, height / 2),
            swap_bytes: false,
            window: StreamWindow::EMPTY,
            scroll: ScrollRect {
                x: 0,
                y: 0,
                w: width,
                h: height,
                fill: Color::BLACK,
            },
            rotation_state: RotationState::default(),
        };
        canvas.allocate()?;
        Ok(canvas)
    }

    fn allocate(&mut self) -> Result<(), CanvasError> {
        self.frames.clear();
        self.active = 0;
        let mut frames = Vec::new();
        if frames.try_reserve_exact(self.frame_count as usize).is_err() {
            return Err(CanvasError::OutOfMemory {
                bytes: self.frame_count as usize * core::mem::size_of::<PixelBuffer>(),
            });
        }
        for _ in 0..self.frame_count {
            frames.push(PixelBuffer::allocate(
                self.depth,
                self.width as usize,
                self.height as usize,
            )?);
        }
        self.frames = frames;
        log::debug!(
            "canvas {}x{} at {} bpp, {} frame(s)",
            self.width,
            self.height,
            self.depth.bits(),
            self.frame_count
        );
        Ok(())
    }

    /// Free the pixel buffers
    ///
    /// A deleted canvas ignores drawing and reads black until its depth is
    /// set again.
    pub fn delete(&mut self) {
        self.frames = Vec::new();
        self.active = 0;
    }

    /// Whether the canvas currently owns a buffer
    pub fn created(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Change depth, reallocating and clearing every frame
    ///
    /// Also recreates the buffers of a deleted canvas at its previous size.
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::OutOfMemory` if the new buffers cannot be
    /// allocated; the canvas is left deleted.
    pub fn set_color_depth(&mut self, depth: ColorDepth) -> Result<(), CanvasError> {
        self.delete();
        self.depth = depth;
        self.window = StreamWindow::EMPTY;
        self.allocate()
    }

    /// Current depth
    pub fn color_depth(&self) -> ColorDepth {
        self.depth
    }

    /// Number of frames allocated when created
    pub fn frame_count(&self) -> u8 {
        self.frame_count
    }

    /// Index of the frame drawing goes to
    pub fn active_frame(&self) -> usize {
        self.active
    }

    /// Make frame `index` the drawing target
    ///
    /// Returns false if the frame does not exist.
    pub fn select_frame(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.active = index;
        true
    }

    /// Active frame storage
    pub fn frame(&self) -> Option<&PixelBuffer> {
        self.frames.get(self.active)
    }

    /// Active frame as RGB565 words, for 16 bpp canvases
    ///
    /// The words are in physical (unrotated) order.
    pub fn pixels16_mut(&mut self) -> Option<&mut [u16]> {
        self.frames
            .get_mut(self.active)
            .and_then(PixelBuffer::as_words_mut)
    }

    /// Rotate the logical coordinate frame
    ///
    /// The viewport, scroll area and streaming window are reset.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        let (w, h) = self.logical_size();
        self.viewport.resize(w, h);
        self.window = StreamWindow::EMPTY;
        self.scroll = ScrollRect {
            x: 0,
            y: 0,
            w,
            h,
            fill: self.scroll.fill,
        };
    }

    /// Current rotation
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Set the pivot used by rotated pushes, in canvas coordinates
    pub fn set_pivot(&mut self, x: i32, y: i32) {
        self.pivot = (x, y);
    }

    /// Replace palette entries, starting at index 0
    ///
    /// Only 4 bpp canvases have a palette; returns false otherwise. Entries
    /// past the sixteenth are ignored.
    pub fn set_palette(&mut self, colors: &[Color]) -> bool {
        if self.depth != ColorDepth::Bpp4 {
            return false;
        }
        for (slot, color) in self.palette.iter_mut().zip(colors) {
            *slot = *color;
        }
        true
    }

    /// Replace one palette entry
    pub fn set_palette_color(&mut self, index: usize, color: Color) -> bool {
        if self.depth != ColorDepth::Bpp4 {
            return false;
        }
        match self.palette.get_mut(index) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Palette entry, if the canvas is 4 bpp and the index exists
    pub fn palette_color(&self, index: usize) -> Option<Color> {
        if self.depth != ColorDepth::Bpp4 {
            return None;
        }
        self.palette.get(index).copied()
    }

    /// Colours shown for set and clear bits of a 1 bpp canvas
    pub fn set_bitmap_color(&mut self, fg: Color, bg: Color) {
        self.bitmap_fg = fg;
        self.bitmap_bg = bg;
    }

    /// Convert a colour to the stored value at the current depth
    pub fn encode(&self, color: Color) -> u16 {
        match self.depth {
            ColorDepth::Bpp16 => color.0,
            ColorDepth::Bpp8 => u16::from(color.to_rgb332()),
            ColorDepth::Bpp4 => self
                .palette
                .iter()
                .position(|entry| *entry == color)
                .or_else(|| {
                    self.palette
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, entry)| distance(**entry, color))
                        .map(|(index, _)| index)
                })
                .unwrap_or(0) as u16,
            ColorDepth::Bpp1 => u16::from(color != self.bitmap_bg),
        }
    }

    /// Convert a stored value back to a colour
    pub fn decode(&self, raw: u16) -> Color {
        match self.depth {
            ColorDepth::Bpp16 => Color(raw),
            ColorDepth::Bpp8 => Color::from_rgb332(raw as u8),
            ColorDepth::Bpp4 => self.palette[(raw & 0x0F) as usize],
            ColorDepth::Bpp1 => {
                if raw & 1 != 0 {
                    self.bitmap_fg
                } else {
                    self.bitmap_bg
                }
            }
        }
    }

    /// Stored value at a point, without colour conversion
    pub fn read_pixel_value(&self, x: i32, y: i32) -> u16 {
        match self.viewport.clip_point(x, y) {
            Some((x, y)) => self.get_raw(x, y),
            None => 0,
        }
    }

    /// Fill the viewport with one colour
    pub fn fill_sprite(&mut self, color: Color) {
        if self.viewport.is_full() {
            let raw = self.encode(color);
            if let Some(frame) = self.frames.get_mut(self.active) {
                frame.fill(raw);
            }
        } else if let Some((x0, y0, x1, y1)) = self.viewport.drawable() {
            let _ = self.fill_rect(x0, y0, x1 - x0, y1 - y0, color);
        }
    }

    /// Area moved by [`scroll`](Self::scroll), clamped to the canvas
    pub fn set_scroll_rect(&mut self, x: i32, y: i32, w: i32, h: i32, fill: Color) {
        let (lw, lh) = self.logical_size();
        let (mut x, mut y, mut w, mut h) = (x, y, w, h);
        if x < 0 {
            w = w.saturating_add(x);
            x = 0;
        }
        if y < 0 {
            h = h.saturating_add(y);
            y = 0;
        }
        w = w.min(lw - x);
        h = h.min(lh - y);
        if w < 1 || h < 1 {
            return;
        }
        self.scroll = ScrollRect { x, y, w, h, fill };
    }

    /// Shift the scroll area contents by `(dx, dy)`
    ///
    /// Vacated columns and rows take the scroll fill colour; pixels outside
    /// the scroll area are untouched.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let ScrollRect { x, y, w, h, fill } = self.scroll;
        let raw_fill = self.encode(fill);
        if dx.unsigned_abs() >= w.unsigned_abs() || dy.unsigned_abs() >= h.unsigned_abs() {
            self.fill_raw(x, y, w, h, raw_fill);
            return;
        }

        let (cx0, cx1) = if dx >= 0 { (x + dx, x + w) } else { (x, x + w + dx) };
        let (cy0, cy1) = if dy >= 0 { (y + dy, y + h) } else { (y, y + h + dy) };

        for row in 0..cy1 - cy0 {
            let ty = if dy > 0 { cy1 - 1 - row } else { cy0 + row };
            for col in 0..cx1 - cx0 {
                let tx = if dx > 0 { cx1 - 1 - col } else { cx0 + col };
                let value = self.get_raw(tx - dx, ty - dy);
                self.put_raw(tx, ty, value);
            }
        }

        if dx > 0 {
            self.fill_raw(x, y, dx, h, raw_fill);
        } else if dx < 0 {
            self.fill_raw(x + w + dx, y, -dx, h, raw_fill);
        }
        if dy > 0 {
            self.fill_raw(x, y, w, dy, raw_fill);
        } else if dy < 0 {
            self.fill_raw(x, y + h + dy, w, -dy, raw_fill);
        }
    }

    /// Copy the whole canvas onto `dst` at `(x, y)`
    ///
    /// Pixels whose stored value matches `transparent` at this canvas's depth
    /// are skipped.
    pub fn push_to<S>(&self, dst: &mut S, x: i32, y: i32, transparent: Option<Color>) -> Result<(), S::Error>
    where
        S: PixelSurface + ?Sized,
    {
        let (w, h) = self.logical_size();
        self.push_region_to(dst, x, y, 0, 0, w, h, transparent)
    }

    /// Copy the canvas area `(sx, sy, sw, sh)` onto `dst` at `(x, y)`
    pub fn push_region_to<S>(
        &self,
        dst: &mut S,
        x: i32,
        y: i32,
        sx: i32,
        sy: i32,
        sw: i32,
        sh: i32,
        transparent: Option<Color>,
    ) -> Result<(), S::Error>
    where
        S: PixelSurface + ?Sized,
    {
        if !self.created() {
            return Ok(());
        }
        let (lw, lh) = self.logical_size();
        let (mut x, mut y, mut sx, mut sy, mut sw, mut sh) = (x, y, sx, sy, sw, sh);
        if sx < 0 {
            sw = sw.saturating_add(sx);
            x = x.saturating_sub(sx);
            sx = 0;
        }
        if sy < 0 {
            sh = sh.saturating_add(sy);
            y = y.saturating_sub(sy);
            sy = 0;
        }
        sw = sw.min(lw - sx);
        sh = sh.min(lh - sy);
        if sw < 1 || sh < 1 {
            return Ok(());
        }
        // Compare in the stored format, so a transparent colour matches
        // whatever it quantises to at this depth.
        let transparent = transparent.map(|color| self.decode(self.encode(color)));

        with_native_order(dst, |dst: &mut S| -> Result<(), S::Error> {
            if let (Some(words), Rotation::Rotate0, true) = (
                self.frame().and_then(PixelBuffer::as_words),
                self.rotation,
                sx == 0 && sw == lw,
            ) {
                let start = (sy * lw) as usize;
                let end = start + (sw * sh) as usize;
                if let Some(rows) = words.get(start..end) {
                    return dst.push_image(x, y, sw, sh, rows, transparent);
                }
            }

            let mut line = [0u16; LINE_CHUNK];
            for row in 0..sh {
                let mut col = 0;
                while col < sw {
                    let run = (sw - col).min(LINE_CHUNK as i32);
                    for (offset, slot) in line.iter_mut().take(run as usize).enumerate() {
                        let raw = self.get_raw(sx + col + offset as i32, sy + row);
                        *slot = self.decode(raw).0;
                    }
                    dst.push_image(x + col, y + row, run, 1, &line[..run as usize], transparent)?;
                    col += run;
                }
            }
            Ok(())
        })
    }

    /// Logical size in the current rotation
    pub(crate) fn logical_size(&self) -> (i32, i32) {
        let (w, h) = rotated_size(self.width as u32, self.height as u32, self.rotation);
        (w as i32, h as i32)
    }

    /// Stored value at an absolute logical point; 0 outside the canvas
    pub(crate) fn get_raw(&self, x: i32, y: i32) -> u16 {
        let (lw, lh) = self.logical_size();
        if x < 0 || y < 0 || x >= lw || y >= lh {
            return 0;
        }
        let (px, py) = apply_rotation(
            x as u32,
            y as u32,
            self.width as u32,
            self.height as u32,
            self.rotation,
        );
        self.frames
            .get(self.active)
            .map_or(0, |frame| frame.get(px as usize, py as usize, self.width as usize))
    }

    /// Store a value at an absolute logical point; ignored outside the canvas
    fn put_raw(&mut self, x: i32, y: i32, value: u16) {
        let (lw, lh) = self.logical_size();
        if x < 0 || y < 0 || x >= lw || y >= lh {
            return;
        }
        let (px, py) = apply_rotation(
            x as u32,
            y as u32,
            self.width as u32,
            self.height as u32,
            self.rotation,
        );
        let width = self.width as usize;
        if let Some(frame) = self.frames.get_mut(self.active) {
            frame.set(px as usize, py as usize, width, value);
        }
    }

    /// Fill an absolute logical rectangle with a stored value
    fn fill_raw(&mut self, x: i32, y: i32, w: i32, h: i32, value: u16) {
        if self.rotation == Rotation::Rotate0 {
            let width = self.width as usize;
            if let Some(frame) = self.frames.get_mut(self.active) {
                for row in y..y + h {
                    frame.fill_span(x as usize, row as usize, w as usize, width, value);
                }
            }
            return;
        }
        for row in y..y + h {
            for col in x..x + w {
                self.put_raw(col, row, value);
            }
        }
    }

    fn stream_raw(&mut self, value: u16) {
        if self.window.is_empty() {
            return;
        }
        let StreamWindow { x, y, .. } = self.window;
        self.put_raw(x, y, value);
        let window = &mut self.window;
        window.x += 1;
        if window.x > window.x1 {
            window.x = window.x0;
            window.y += 1;
            if window.y > window.y1 {
                window.y = window.y0;
            }
        }
    }
}

impl PixelSurface for Canvas {
    type Error = Infallible;

    fn width(&self) -> i32 {
        self.logical_size().0
    }

    fn height(&self) -> i32 {
        self.logical_size().1
    }

    fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    fn pivot(&self) -> (i32, i32) {
        self.pivot
    }

    fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<(), Self::Error> {
        if let Some((x, y)) = self.viewport.clip_point(x, y) {
            let raw = self.encode(color);
            self.put_raw(x, y, raw);
        }
        Ok(())
    }

    fn read_pixel(&mut self, x: i32, y: i32) -> Result<Color, Self::Error> {
        if !self.created() {
            return Ok(Color::BLACK);
        }
        Ok(match self.viewport.clip_point(x, y) {
            Some((x, y)) => self.decode(self.get_raw(x, y)),
            None => Color::BLACK,
        })
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<(), Self::Error> {
        if let Some(rect) = self.viewport.clip_addr_window(x, y, w, h) {
            let raw = self.encode(color);
            self.fill_raw(rect.x, rect.y, rect.w, rect.h, raw);
        }
        Ok(())
    }

    fn push_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u16],
        transparent: Option<Color>,
    ) -> Result<(), Self::Error> {
        let Some(rect) = self.viewport.clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        let swap = self.swap_bytes;
        let key = transparent.map(|color| if swap { color.0.swap_bytes() } else { color.0 });

        for row in 0..rect.h {
            let Some(start) = rect.source_offset(row, w) else {
                break;
            };
            let Some(src) = data.get(start..start + rect.w as usize) else {
                break;
            };
            let fast = key.is_none() && !swap && self.rotation == Rotation::Rotate0;
            if fast {
                if let (ColorDepth::Bpp16, Some(frame)) = (self.depth, self.frames.get_mut(self.active)) {
                    if let Some(words) = frame.as_words_mut() {
                        let dst = ((rect.y + row) * self.width + rect.x) as usize;
                        if let Some(span) = words.get_mut(dst..dst + src.len()) {
                            span.copy_from_slice(src);
                            continue;
                        }
                    }
                }
            }
            for (col, &value) in src.iter().enumerate() {
                if Some(value) == key {
                    continue;
                }
                let color = Color(if swap { value.swap_bytes() } else { value });
                let raw = self.encode(color);
                self.put_raw(rect.x + col as i32, rect.y + row, raw);
            }
        }
        Ok(())
    }

    fn set_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), Self::Error> {
        let (lw, lh) = self.logical_size();
        let (x0, x1) = if x0 > x1 { (x1, x0) } else { (x0, x1) };
        let (y0, y1) = if y0 > y1 { (y1, y0) } else { (y0, y1) };
        if x0 >= lw || y0 >= lh || x1 < 0 || y1 < 0 {
            self.window = StreamWindow::EMPTY;
            return Ok(());
        }
        let (x0, y0) = (x0.max(0), y0.max(0));
        self.window = StreamWindow {
            x0,
            y0,
            x1: x1.min(lw - 1),
            y1: y1.min(lh - 1),
            x: x0,
            y: y0,
        };
        Ok(())
    }

    fn push_color(&mut self, color: Color) -> Result<(), Self::Error> {
        let raw = self.encode(color);
        self.stream_raw(raw);
        Ok(())
    }

    fn push_block(&mut self, color: Color, len: u32) -> Result<(), Self::Error> {
        let raw = self.encode(color);
        for _ in 0..len {
            self.stream_raw(raw);
        }
        Ok(())
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<(), Self::Error> {
        for &value in pixels {
            let color = Color(if self.swap_bytes { value.swap_bytes() } else { value });
            let raw = self.encode(color);
            self.stream_raw(raw);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: i32, h: i32, depth: ColorDepth) -> Canvas {
        Canvas::new(w, h, depth, 1).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_sizes_and_frames() {
        assert_eq!(
            Canvas::new(0, 10, ColorDepth::Bpp16, 1).unwrap_err(),
            CanvasError::InvalidSize {
                width: 0,
                height: 10
            }
        );
        assert_eq!(
            Canvas::new(10, 10, ColorDepth::Bpp16, 3).unwrap_err(),
            CanvasError::InvalidFrames(3)
        );
    }

    #[test]
    fn test_round_trip_16bpp_is_exact() {
        let mut c = canvas(8, 8, ColorDepth::Bpp16);
        for (i, raw) in [0x0000u16, 0x1234, 0xFFFF, 0x0120].into_iter().enumerate() {
            c.draw_pixel(i as i32, 0, Color(raw)).unwrap();
            assert_eq!(c.read_pixel(i as i32, 0).unwrap(), Color(raw));
        }
    }

    #[test]
    fn test_round_trip_8bpp_requantizes() {
        let mut c = canvas(8, 8, ColorDepth::Bpp8);
        let color = Color(0x1234);
        c.draw_pixel(1, 1, color).unwrap();
        assert_eq!(
            c.read_pixel(1, 1).unwrap(),
            Color::from_rgb332(color.to_rgb332())
        );
        c.draw_pixel(2, 2, Color::TRANSPARENT).unwrap();
        assert_eq!(c.read_pixel(2, 2).unwrap(), Color::TRANSPARENT);
        assert_eq!(c.read_pixel_value(2, 2), 0x04);
    }

    #[test]
    fn test_round_trip_4bpp_palette_hits() {
        let mut c = canvas(8, 8, ColorDepth::Bpp4);
        for (i, color) in DEFAULT_4BIT_PALETTE.iter().enumerate() {
            c.draw_pixel(i as i32 % 8, i as i32 / 8, *color).unwrap();
            assert_eq!(c.read_pixel(i as i32 % 8, i as i32 / 8).unwrap(), *color);
            assert_eq!(c.read_pixel_value(i as i32 % 8, i as i32 / 8), i as u16);
        }
    }

    #[test]
    fn test_4bpp_nearest_palette_entry() {
        let mut c = canvas(4, 4, ColorDepth::Bpp4);
        c.draw_pixel(0, 0, Color(0xF000)).unwrap();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::RED);
        assert!(c.set_palette_color(2, Color::SKYBLUE));
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::SKYBLUE);
        assert_eq!(c.palette_color(2), Some(Color::SKYBLUE));
        assert!(!c.set_palette_color(16, Color::RED));
    }

    #[test]
    fn test_palette_only_at_4bpp() {
        let mut c = canvas(4, 4, ColorDepth::Bpp8);
        assert!(!c.set_palette(&[Color::RED]));
        assert_eq!(c.palette_color(0), None);

        let mut c = canvas(4, 4, ColorDepth::Bpp4);
        let colors = [Color::WHITE; 20];
        assert!(c.set_palette(&colors));
        assert_eq!(c.palette_color(15), Some(Color::WHITE));
    }

    #[test]
    fn test_round_trip_1bpp_uses_bitmap_colors() {
        let mut c = canvas(10, 3, ColorDepth::Bpp1);
        c.set_bitmap_color(Color::YELLOW, Color::NAVY);
        c.draw_pixel(9, 2, Color::YELLOW).unwrap();
        c.draw_pixel(8, 2, Color::NAVY).unwrap();
        assert_eq!(c.read_pixel(9, 2).unwrap(), Color::YELLOW);
        assert_eq!(c.read_pixel(8, 2).unwrap(), Color::NAVY);
        assert_eq!(c.read_pixel_value(9, 2), 1);
        assert_eq!(c.read_pixel_value(8, 2), 0);
    }

    #[test]
    fn test_draw_outside_is_noop() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.draw_pixel(-1, 0, Color::RED).unwrap();
        c.draw_pixel(4, 0, Color::RED).unwrap();
        c.fill_rect(10, 10, 5, 5, Color::RED).unwrap();
        assert!(c.frame().unwrap().as_words().unwrap().iter().all(|w| *w == 0));
        assert_eq!(c.read_pixel(100, 100).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_set_color_depth_clears() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.fill_sprite(Color::WHITE);
        c.set_color_depth(ColorDepth::Bpp8).unwrap();
        assert_eq!(c.color_depth(), ColorDepth::Bpp8);
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::BLACK);
        assert_eq!(c.frame().unwrap().byte_len(), 16);
    }

    #[test]
    fn test_delete_and_recreate() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.delete();
        assert!(!c.created());
        c.draw_pixel(0, 0, Color::RED).unwrap();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::BLACK);
        c.set_color_depth(ColorDepth::Bpp16).unwrap();
        assert!(c.created());
    }

    #[test]
    fn test_select_frame() {
        let mut c = Canvas::new(4, 4, ColorDepth::Bpp8, 2).unwrap();
        c.fill_sprite(Color::WHITE);
        assert!(c.select_frame(1));
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::BLACK);
        assert!(c.select_frame(0));
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::WHITE);
        assert!(!c.select_frame(2));
    }

    #[test]
    fn test_fill_sprite_respects_viewport() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.set_viewport(1, 1, 2, 2, false);
        c.fill_sprite(Color::GREEN);
        c.reset_viewport();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::BLACK);
        assert_eq!(c.read_pixel(1, 1).unwrap(), Color::GREEN);
        assert_eq!(c.read_pixel(2, 2).unwrap(), Color::GREEN);
        assert_eq!(c.read_pixel(3, 3).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_push_to_scenario() {
        let mut sprite = canvas(32, 32, ColorDepth::Bpp16);
        sprite.fill_sprite(Color(0xF800));
        let mut screen = canvas(64, 64, ColorDepth::Bpp16);
        screen.fill_sprite(Color::NAVY);
        sprite.push_to(&mut screen, 16, 16, None).unwrap();
        assert_eq!(screen.read_pixel(16, 16).unwrap(), Color(0xF800));
        assert_eq!(screen.read_pixel(47, 47).unwrap(), Color(0xF800));
        assert_eq!(screen.read_pixel(0, 0).unwrap(), Color::NAVY);
        assert_eq!(screen.read_pixel(48, 48).unwrap(), Color::NAVY);
    }

    #[test]
    fn test_push_to_with_transparent() {
        let mut sprite = canvas(4, 4, ColorDepth::Bpp8);
        sprite.fill_sprite(Color::TRANSPARENT);
        sprite.draw_pixel(1, 1, Color::WHITE).unwrap();
        let mut screen = canvas(8, 8, ColorDepth::Bpp16);
        screen.fill_sprite(Color::BLUE);
        sprite
            .push_to(&mut screen, 2, 2, Some(Color::TRANSPARENT))
            .unwrap();
        assert_eq!(screen.read_pixel(3, 3).unwrap(), Color::WHITE);
        assert_eq!(screen.read_pixel(2, 2).unwrap(), Color::BLUE);
        assert_eq!(screen.read_pixel(5, 5).unwrap(), Color::BLUE);
    }

    #[test]
    fn test_push_to_clips_at_destination() {
        let mut sprite = canvas(4, 4, ColorDepth::Bpp4);
        sprite.fill_sprite(Color::YELLOW);
        let mut screen = canvas(8, 8, ColorDepth::Bpp16);
        sprite.push_to(&mut screen, -2, 6, None).unwrap();
        assert_eq!(screen.read_pixel(0, 6).unwrap(), Color::YELLOW);
        assert_eq!(screen.read_pixel(1, 7).unwrap(), Color::YELLOW);
        assert_eq!(screen.read_pixel(2, 6).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_push_region_to() {
        let mut sprite = canvas(4, 4, ColorDepth::Bpp16);
        sprite.draw_pixel(2, 2, Color::RED).unwrap();
        let mut screen = canvas(8, 8, ColorDepth::Bpp16);
        sprite
            .push_region_to(&mut screen, 0, 0, 2, 2, 2, 2, None)
            .unwrap();
        assert_eq!(screen.read_pixel(0, 0).unwrap(), Color::RED);
        assert_eq!(screen.read_pixel(2, 2).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_push_to_keeps_destination_swap_flag() {
        let mut sprite = canvas(2, 1, ColorDepth::Bpp16);
        sprite.fill_sprite(Color::RED);
        let mut screen = canvas(2, 1, ColorDepth::Bpp16);
        screen.set_swap_bytes(true);
        sprite.push_to(&mut screen, 0, 0, None).unwrap();
        assert!(screen.swap_bytes());
        assert_eq!(screen.read_pixel(1, 0).unwrap(), Color::RED);
    }

    #[test]
    fn test_push_image_swaps_when_flagged() {
        let mut c = canvas(2, 1, ColorDepth::Bpp16);
        c.set_swap_bytes(true);
        c.push_image(0, 0, 2, 1, &[0x00F8, 0x1F00], None).unwrap();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::RED);
        assert_eq!(c.read_pixel(1, 0).unwrap(), Color::BLUE);
    }

    #[test]
    fn test_push_image_clipped_offsets_source() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        let image: Vec<u16> = (0..9).collect();
        c.push_image(-1, -1, 3, 3, &image, None).unwrap();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color(4));
        assert_eq!(c.read_pixel(1, 1).unwrap(), Color(8));
        assert_eq!(c.read_pixel(1, 0).unwrap(), Color(5));
    }

    #[test]
    fn test_window_streaming_wraps() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.set_window(1, 1, 2, 2).unwrap();
        c.push_pixels(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(c.read_pixel(1, 1).unwrap(), Color(5));
        assert_eq!(c.read_pixel(2, 1).unwrap(), Color(2));
        assert_eq!(c.read_pixel(1, 2).unwrap(), Color(3));
        assert_eq!(c.read_pixel(2, 2).unwrap(), Color(4));
        c.push_block(Color::WHITE, 2).unwrap();
        assert_eq!(c.read_pixel(2, 1).unwrap(), Color::WHITE);
        assert_eq!(c.read_pixel(1, 2).unwrap(), Color::WHITE);
    }

    #[test]
    fn test_scroll_moves_contents_and_fills() {
        let mut c = canvas(6, 6, ColorDepth::Bpp16);
        c.fill_sprite(Color::WHITE);
        c.set_scroll_rect(1, 1, 4, 4, Color::BLUE);
        c.draw_pixel(1, 1, Color::RED).unwrap();
        c.scroll(2, 1);
        assert_eq!(c.read_pixel(3, 2).unwrap(), Color::RED);
        assert_eq!(c.read_pixel(1, 1).unwrap(), Color::BLUE);
        assert_eq!(c.read_pixel(2, 4).unwrap(), Color::BLUE);
        assert_eq!(c.read_pixel(4, 1).unwrap(), Color::BLUE);
        assert_eq!(c.read_pixel(4, 4).unwrap(), Color::WHITE);
        // outside the scroll area
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::WHITE);
        assert_eq!(c.read_pixel(5, 5).unwrap(), Color::WHITE);
    }

    #[test]
    fn test_scroll_negative_and_oversized() {
        let mut c = canvas(4, 4, ColorDepth::Bpp8);
        c.set_scroll_rect(0, 0, 4, 4, Color::BLACK);
        c.draw_pixel(3, 3, Color::WHITE).unwrap();
        c.scroll(-1, -1);
        assert_eq!(c.read_pixel(2, 2).unwrap(), Color::WHITE);
        assert_eq!(c.read_pixel(3, 3).unwrap(), Color::BLACK);
        c.scroll(0, 4);
        assert_eq!(c.read_pixel(2, 2).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_extreme_offsets_are_clipped() {
        let mut c = canvas(4, 4, ColorDepth::Bpp16);
        c.fill_rect(1, 0, i32::MAX, 1, Color::RED).unwrap();
        assert_eq!(c.read_pixel(3, 0).unwrap(), Color::RED);
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::BLACK);

        c.set_scroll_rect(i32::MIN, i32::MIN, i32::MIN, 4, Color::BLUE);
        c.set_scroll_rect(0, 0, 4, 4, Color::BLUE);
        c.scroll(i32::MIN, 0);
        assert_eq!(c.read_pixel(3, 0).unwrap(), Color::BLUE);
        c.draw_pixel(1, 1, Color::RED).unwrap();
        c.scroll(0, i32::MIN);
        assert_eq!(c.read_pixel(1, 1).unwrap(), Color::BLUE);

        let image = [Color::WHITE.0; 4];
        c.push_image(i32::MAX, 0, i32::MAX, 2, &image, None).unwrap();
        c.push_image(-2, 1, i32::MAX, 2, &image, None).unwrap();
        assert_eq!(c.read_pixel(0, 2).unwrap(), Color::BLUE);

        let mut dst = canvas(4, 4, ColorDepth::Bpp16);
        c.push_region_to(&mut dst, i32::MAX, 0, i32::MIN, 0, 4, 4, None)
            .unwrap();
        assert_eq!(dst.read_pixel(0, 0).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_rotation_swaps_size_and_resets_viewport() {
        let mut c = canvas(8, 4, ColorDepth::Bpp16);
        c.set_viewport(1, 1, 2, 2, true);
        c.set_rotation(Rotation::Rotate90);
        assert_eq!((c.width(), c.height()), (4, 8));
        assert!(c.viewport().is_full());
        c.draw_pixel(0, 0, Color::RED).unwrap();
        assert_eq!(c.read_pixel(0, 0).unwrap(), Color::RED);
        c.set_rotation(Rotation::Rotate0);
        assert_eq!(c.read_pixel(7, 0).unwrap(), Color::RED);
    }

    #[test]
    fn test_pixels16_mut_only_at_16bpp() {
        let mut c = canvas(2, 2, ColorDepth::Bpp16);
        assert_eq!(c.pixels16_mut().map(|p| p.len()), Some(4));
        let mut c = canvas(2, 2, ColorDepth::Bpp8);
        assert!(c.pixels16_mut().is_none());
    }
}
