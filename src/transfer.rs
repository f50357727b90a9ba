//! Pixel transfer pipeline
//!
//! Bulk pixel movement on a [`Display`]: transaction bracketing, read-back and
//! the asynchronous (DMA) path.
//!
//! At most one asynchronous transfer is in flight. Its buffer is moved into
//! a [`Transfer`] guard that also borrows the display; the buffer comes back
//! from [`Transfer::wait`], and dropping the guard blocks until the bus is
//! done with it. Buffers lent to the bus are `&'static mut`, so a guard that
//! is leaked with [`core::mem::forget`] leaks its buffer with it and nothing
//! can touch the pixels while they are in flight. Every new transfer, and every
//! synchronous bus operation, first waits for the one in flight, so pixels
//! reach the panel strictly in the order they were submitted.
//!
//! Transfers larger than [`Config::dma_max_pixels`](crate::Config::dma_max_pixels)
//! are shortened by writing blocks of
//! [`Config::dma_chunk_pixels`](crate::Config::dma_chunk_pixels) synchronously
//! first; only the tail is started asynchronously.
//!
//! ## Example
//!
//! ```
//! use core::convert::Infallible;
//! use tft_render::{Builder, BusAdapter, Dimensions, Display};
//!
//! # struct NullBus;
//! # impl BusAdapter for NullBus {
//! #     type Error = Infallible;
//! #     fn open_window(&mut self, _: u16, _: u16, _: u16, _: u16) -> Result<(), Infallible> { Ok(()) }
//! #     fn write_pixel(&mut self, _: u16) -> Result<(), Infallible> { Ok(()) }
//! #     fn write_run(&mut self, _: &[u16]) -> Result<(), Infallible> { Ok(()) }
//! #     fn read_pixel(&mut self) -> Result<u16, Infallible> { Ok(0) }
//! # }
//! let dims = Dimensions::new(240, 240).unwrap();
//! let config = Builder::new().dimensions(dims).build().unwrap();
//! let mut display = Display::new(NullBus, config);
//!
//! // Without async support every transfer completes before returning
//! let async_enabled = display.init_dma();
//! assert!(!async_enabled);
//!
//! let frame: &'static mut [u16] = Box::leak(Box::new([0xF800u16; 64]));
//! let transfer = display.push_image_dma(0, 0, 8, 8, frame).unwrap();
//! // ... prepare the next frame here ...
//! let frame = transfer.wait().unwrap();
//! assert_eq!(frame.len(), 64);
//! ```

use crate::color::Color;
use crate::display::{Display, DisplayResult, TransferJob};
use crate::error::Error;
use crate::interface::BusAdapter;
use crate::surface::PixelSurface;
use crate::viewport::pixel_count;

/// An asynchronous transfer in flight
///
/// Holds the display and the lent buffer until the bus is done with them.
#[must_use = "dropping a Transfer blocks until its pixels are sent"]
pub struct Transfer<'a, B>
where
    B: BusAdapter,
{
    display: &'a mut Display<B>,
    buffer: Option<&'static mut [u16]>,
}

impl<'a, B> Transfer<'a, B>
where
    B: BusAdapter,
{
    fn new(display: &'a mut Display<B>, buffer: &'static mut [u16]) -> Self {
        Self {
            display,
            buffer: Some(buffer),
        }
    }

    /// Whether the bus is still sending
    pub fn is_busy(&mut self) -> DisplayResult<B, bool> {
        self.display.dma_busy()
    }

    /// Block until the transfer completes and take the buffer back
    ///
    /// The buffer may have been rewritten in place (compacted or byte
    /// swapped) by the call that started the transfer.
    pub fn wait(mut self) -> DisplayResult<B, &'static mut [u16]> {
        self.display.dma_wait()?;
        Ok(self.buffer.take().unwrap_or_default())
    }
}

impl<B> Drop for Transfer<'_, B>
where
    B: BusAdapter,
{
    fn drop(&mut self) {
        if let Err(e) = self.display.dma_wait() {
            log::warn!("transfer failed while its guard was dropped: {}", e);
        }
    }
}

impl<B> Display<B>
where
    B: BusAdapter,
{
    /// Hold the bus open across several drawing calls
    ///
    /// Internal operations inside the bracket skip their own begin and end.
    pub fn start_write(&mut self) -> DisplayResult<B> {
        if self.in_transaction {
            return Ok(());
        }
        self.dma_wait()?;
        self.bus.begin_transaction().map_err(Error::Bus)?;
        self.in_transaction = true;
        Ok(())
    }

    /// Close the bracket opened by [`start_write`](Self::start_write)
    ///
    /// Waits for the transfer in flight first.
    pub fn end_write(&mut self) -> DisplayResult<B> {
        self.dma_wait()?;
        if self.in_transaction {
            self.in_transaction = false;
            self.bus.end_transaction().map_err(Error::Bus)?;
        }
        Ok(())
    }

    /// Whether a [`start_write`](Self::start_write) bracket is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Read a `w` x `h` rectangle into `out`, row-major
    ///
    /// Pixels outside the viewport read as black. Values are byte swapped
    /// when the swap flag is set, so the result can be pushed straight back
    /// with [`push_rect`](Self::push_rect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] if `out` holds fewer than `w * h`
    /// pixels.
    pub fn read_rect(&mut self, x: i32, y: i32, w: i32, h: i32, out: &mut [u16]) -> DisplayResult<B> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let required = pixel_count(w, h);
        if out.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: out.len(),
            });
        }
        out[..required].fill(0);
        let Some(rect) = self.viewport().clip_addr_window(x, y, w, h) else {
            return Ok(());
        };

        self.begin()?;
        self.open_window(rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1)?;
        let swap = self.swap_bytes();
        for row in 0..rect.h {
            let start = ((rect.dy + row) * w + rect.dx) as usize;
            for slot in &mut out[start..start + rect.w as usize] {
                let pixel = self.bus.read_pixel().map_err(Error::Bus)?;
                *slot = if swap { pixel.swap_bytes() } else { pixel };
            }
        }
        self.end()
    }

    /// Read a `w` x `h` rectangle as RGB888, three bytes per pixel, row-major
    ///
    /// Pixels outside the viewport read as black. The swap flag does not
    /// apply, the bytes are always red, green, blue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] if `out` holds fewer than
    /// `3 * w * h` bytes.
    pub fn read_rect_rgb(&mut self, x: i32, y: i32, w: i32, h: i32, out: &mut [u8]) -> DisplayResult<B> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let required = pixel_count(w, h).saturating_mul(3);
        if out.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: out.len(),
            });
        }
        out[..required].fill(0);
        let Some(rect) = self.viewport().clip_addr_window(x, y, w, h) else {
            return Ok(());
        };

        self.begin()?;
        self.open_window(rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1)?;
        for row in 0..rect.h {
            let start = 3 * ((rect.dy + row) * w + rect.dx) as usize;
            let span = &mut out[start..start + 3 * rect.w as usize];
            for rgb in span.chunks_exact_mut(3) {
                let pixel = self.bus.read_pixel().map_err(Error::Bus)?;
                let [_, r, g, b] = Color(pixel).to_rgb888().to_be_bytes();
                rgb.copy_from_slice(&[r, g, b]);
            }
        }
        self.end()
    }

    /// Write a `w` x `h` rectangle of raw pixels, clipped to the viewport
    pub fn push_rect(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u16]) -> DisplayResult<B> {
        self.push_image(x, y, w, h, data, None)
    }

    /// Enable the asynchronous path if the bus supports it
    ///
    /// Returns whether transfers now run asynchronously. Without support
    /// every DMA call still works, completing before it returns.
    pub fn init_dma(&mut self) -> bool {
        self.dma_enabled = self.bus.supports_async();
        if self.dma_enabled {
            log::debug!("DMA enabled");
        } else {
            log::debug!("bus has no async engine, DMA transfers run synchronously");
        }
        self.dma_enabled
    }

    /// Wait for the transfer in flight and disable the asynchronous path
    pub fn deinit_dma(&mut self) -> DisplayResult<B> {
        self.dma_wait()?;
        if self.dma_enabled {
            log::debug!("DMA disabled");
        }
        self.dma_enabled = false;
        Ok(())
    }

    /// Whether the asynchronous path is enabled
    pub fn dma_enabled(&self) -> bool {
        self.dma_enabled
    }

    /// Whether a transfer is still in flight
    ///
    /// Polls the bus; a finished transfer is retired here.
    pub fn dma_busy(&mut self) -> DisplayResult<B, bool> {
        let Some(job) = self.job else {
            return Ok(false);
        };
        if self.bus.is_async_busy().map_err(Error::Bus)? {
            return Ok(true);
        }
        self.job = None;
        self.retire(job)?;
        Ok(false)
    }

    /// Block until the transfer in flight completes
    pub fn dma_wait(&mut self) -> DisplayResult<B> {
        let Some(job) = self.job.take() else {
            return Ok(());
        };
        self.bus.wait_async().map_err(Error::Bus)?;
        self.retire(job)
    }

    /// Stream `pixels` into the open window
    ///
    /// The buffer is byte swapped in place when the swap flag is set.
    pub fn push_pixels_dma(&mut self, pixels: &'static mut [u16]) -> DisplayResult<B, Transfer<'_, B>> {
        self.dma_wait()?;
        if self.swap_bytes() {
            swap_in_place(pixels);
        }
        self.start_transfer(None, pixels)?;
        Ok(Transfer::new(self, pixels))
    }

    /// Send a `w` x `h` image, clipped to the viewport
    ///
    /// When clipping cuts the image, the visible rows are compacted to the
    /// front of `image` so that only visible pixels are transmitted. The
    /// visible pixels are byte swapped in place when the swap flag is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] if `image` holds fewer than `w * h`
    /// pixels.
    pub fn push_image_dma(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        image: &'static mut [u16],
    ) -> DisplayResult<B, Transfer<'_, B>> {
        let Some(rect) = self.viewport().clip_addr_window(x, y, w, h) else {
            return Ok(Transfer::new(self, image));
        };
        let required = pixel_count(w, h);
        if image.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: image.len(),
            });
        }
        self.dma_wait()?;

        let (cw, ch) = (rect.w as usize, rect.h as usize);
        if rect.dx != 0 || rect.dy != 0 || rect.w != w {
            for row in 0..ch {
                let src = (rect.dy as usize + row) * w as usize + rect.dx as usize;
                image.copy_within(src..src + cw, row * cw);
            }
        }
        let visible = &mut image[..cw * ch];
        if self.swap_bytes() {
            swap_in_place(visible);
        }
        let window = (rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1);
        self.start_transfer(Some(window), visible)?;
        Ok(Transfer::new(self, image))
    }

    /// Send a `w` x `h` image through a scratch buffer
    ///
    /// The visible part of `image` is copied (and byte swapped when the flag
    /// is set) into `scratch`, so `image` is free again as soon as this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferTooSmall`] if `image` holds fewer than `w * h`
    /// pixels or `scratch` cannot hold the visible part.
    pub fn push_image_dma_buffered(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        image: &[u16],
        scratch: &'static mut [u16],
    ) -> DisplayResult<B, Transfer<'_, B>> {
        let Some(rect) = self.viewport().clip_addr_window(x, y, w, h) else {
            return Ok(Transfer::new(self, scratch));
        };
        let required = pixel_count(w, h);
        if image.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: image.len(),
            });
        }
        let (cw, ch) = (rect.w as usize, rect.h as usize);
        if scratch.len() < cw * ch {
            return Err(Error::BufferTooSmall {
                required: cw * ch,
                provided: scratch.len(),
            });
        }
        self.dma_wait()?;

        let swap = self.swap_bytes();
        for (row, dst) in scratch.chunks_exact_mut(cw).take(ch).enumerate() {
            let src = (rect.dy as usize + row) * w as usize + rect.dx as usize;
            dst.copy_from_slice(&image[src..src + cw]);
            if swap {
                swap_in_place(dst);
            }
        }
        let window = (rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1);
        self.start_transfer(Some(window), &scratch[..cw * ch])?;
        Ok(Transfer::new(self, scratch))
    }

    /// Send pixels, optionally into a new window, leaving the tail in flight
    fn start_transfer(&mut self, window: Option<(i32, i32, i32, i32)>, pixels: &[u16]) -> DisplayResult<B> {
        self.dma_wait()?;
        if pixels.is_empty() {
            return Ok(());
        }
        let owns_transaction = !self.in_transaction;
        if owns_transaction {
            self.bus.begin_transaction().map_err(Error::Bus)?;
        }
        if let Some((x0, y0, x1, y1)) = window {
            self.open_window(x0, y0, x1, y1)?;
        }

        if !self.dma_enabled {
            self.bus.write_run(pixels).map_err(Error::Bus)?;
            if owns_transaction {
                self.bus.end_transaction().map_err(Error::Bus)?;
            }
            return Ok(());
        }

        let max = self.config.dma_max_pixels;
        let chunk = self.config.dma_chunk_pixels;
        let mut rest = pixels;
        while rest.len() > max {
            let (head, tail) = rest.split_at(chunk);
            log::trace!("DMA chunk of {} pixels, {} left", head.len(), tail.len());
            self.bus.write_run(head).map_err(Error::Bus)?;
            rest = tail;
        }
        self.bus.start_async_write(rest).map_err(Error::Bus)?;
        self.job = Some(TransferJob {
            pixels: rest.len(),
            owns_transaction,
        });
        Ok(())
    }

    /// Close what a finished transfer opened
    fn retire(&mut self, job: TransferJob) -> DisplayResult<B> {
        log::trace!("DMA transfer of {} pixels complete", job.pixels);
        if job.owns_transaction && !self.in_transaction {
            self.bus.end_transaction().map_err(Error::Bus)?;
        }
        Ok(())
    }
}

fn swap_in_place(pixels: &mut [u16]) {
    for pixel in pixels {
        *pixel = pixel.swap_bytes();
    }
}
