//! Device surface
//!
//! [`Display`] owns the bus adapter and every piece of per-panel state: the
//! rotation, the viewport, the byte swap flag, the transaction bracket and the
//! outstanding asynchronous transfer. Drawing algorithms reach the panel
//! through its [`PixelSurface`] implementation; the block, image, read-back and
//! DMA calls live in [`transfer`](crate::transfer).

use crate::color::Color;
use crate::config::{Config, Rotation};
use crate::error::Error;
use crate::interface::BusAdapter;
use crate::surface::PixelSurface;
use crate::viewport::Viewport;

pub(crate) type DisplayResult<B, T = ()> = core::result::Result<T, Error<B>>;

/// Pixels staged on the stack per bus write
pub(crate) const BATCH_PIXELS: usize = 32;

/// The asynchronous transfer currently in flight
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TransferJob {
    /// Pixels handed to the async engine
    pub(crate) pixels: usize,
    /// Whether the transfer opened the bus transaction and must close it
    pub(crate) owns_transaction: bool,
}

/// Display driver context
///
/// Generic over the [`BusAdapter`] that carries pixels to the panel.
pub struct Display<B>
where
    B: BusAdapter,
{
    /// Bus adapter
    pub(crate) bus: B,
    /// Display configuration
    pub(crate) config: Config,
    /// Current rotation
    rotation: Rotation,
    /// Logical width in the current rotation
    width: i32,
    /// Logical height in the current rotation
    height: i32,
    /// Clip rectangle and datum
    viewport: Viewport,
    /// Pivot for rotated pushes
    pivot: (i32, i32),
    /// Byte swap flag for raw pixel data
    swap_bytes: bool,
    /// Whether the asynchronous path is enabled
    pub(crate) dma_enabled: bool,
    /// Transfer in flight
    pub(crate) job: Option<TransferJob>,
    /// Caller opened a transaction with `start_write`
    pub(crate) in_transaction: bool,
}

impl<B> Display<B>
where
    B: BusAdapter,
{
    /// Create a new Display instance
    ///
    /// Nothing is sent to the bus; call [`init`](Self::init) once the
    /// adapter has brought the panel up.
    pub fn new(bus: B, config: Config) -> Self {
        let dims = config.rotated_dimensions();
        let (width, height) = (i32::from(dims.width), i32::from(dims.height));
        Self {
            bus,
            rotation: config.rotation,
            width,
            height,
            viewport: Viewport::new(width, height),
            pivot: (width / 2, height / 2),
            swap_bytes: config.swap_bytes,
            dma_enabled: false,
            job: None,
            in_transaction: false,
            config,
        }
    }

    /// Program the configured rotation into the panel
    pub fn init(&mut self) -> DisplayResult<B> {
        self.set_rotation(self.rotation)
    }

    /// Change the rotation
    ///
    /// Waits for any transfer in flight, reprograms the panel scan direction
    /// and resets the viewport to the full rotated panel.
    pub fn set_rotation(&mut self, rotation: Rotation) -> DisplayResult<B> {
        self.begin()?;
        self.bus.set_rotation(rotation).map_err(Error::Bus)?;
        self.end()?;

        self.rotation = rotation;
        let dims = self.config.dimensions;
        let (w, h) = (i32::from(dims.width), i32::from(dims.height));
        (self.width, self.height) = if rotation.is_transposed() { (h, w) } else { (w, h) };
        self.viewport.resize(self.width, self.height);
        Ok(())
    }

    /// Current rotation
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Set the pivot used by rotated pushes onto this display
    pub fn set_pivot(&mut self, x: i32, y: i32) {
        self.pivot = (x, y);
    }

    /// Get the display configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrow the bus adapter
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Borrow the bus adapter mutably
    ///
    /// Waits for any transfer in flight first.
    pub fn bus_mut(&mut self) -> DisplayResult<B, &mut B> {
        self.dma_wait()?;
        Ok(&mut self.bus)
    }

    /// Tear down the context and give back the bus adapter
    ///
    /// Any transfer in flight is waited for; a failure while waiting is
    /// logged and the adapter is returned regardless.
    pub fn release(mut self) -> B {
        if let Err(e) = self.dma_wait() {
            log::warn!("transfer failed during release: {}", e);
        }
        if self.in_transaction {
            if let Err(e) = self.bus.end_transaction() {
                log::warn!("closing transaction during release failed: {:?}", e);
            }
        }
        self.bus
    }

    /// Open the bus for one internal operation
    ///
    /// Waits for the outstanding transfer. Inside a caller bracket the
    /// transaction is already open.
    pub(crate) fn begin(&mut self) -> DisplayResult<B> {
        self.dma_wait()?;
        if !self.in_transaction {
            self.bus.begin_transaction().map_err(Error::Bus)?;
        }
        Ok(())
    }

    /// Close the bus after one internal operation
    pub(crate) fn end(&mut self) -> DisplayResult<B> {
        if !self.in_transaction {
            self.bus.end_transaction().map_err(Error::Bus)?;
        }
        Ok(())
    }

    /// Address an inclusive window given in absolute logical coordinates
    ///
    /// The caller has clipped the window to the panel.
    pub(crate) fn open_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> DisplayResult<B> {
        self.bus
            .open_window(x0 as u16, y0 as u16, x1 as u16, y1 as u16)
            .map_err(Error::Bus)
    }

    /// Write `len` copies of a native colour in stack batches
    pub(crate) fn write_repeated(&mut self, color: u16, len: usize) -> DisplayResult<B> {
        let batch = [color; BATCH_PIXELS];
        let mut left = len;
        while left > 0 {
            let n = left.min(BATCH_PIXELS);
            self.bus.write_run(&batch[..n]).map_err(Error::Bus)?;
            left -= n;
        }
        Ok(())
    }

    /// Write caller pixels, undoing the byte swap when the flag is set
    pub(crate) fn write_raw(&mut self, pixels: &[u16]) -> DisplayResult<B> {
        if !self.swap_bytes {
            return self.bus.write_run(pixels).map_err(Error::Bus);
        }
        let mut batch = [0u16; BATCH_PIXELS];
        for chunk in pixels.chunks(BATCH_PIXELS) {
            for (out, pixel) in batch.iter_mut().zip(chunk) {
                *out = pixel.swap_bytes();
            }
            self.bus.write_run(&batch[..chunk.len()]).map_err(Error::Bus)?;
        }
        Ok(())
    }

    /// Clamp an absolute window to the panel, normalising corner order
    fn clamp_window(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(i32, i32, i32, i32)> {
        let (x0, x1) = if x0 > x1 { (x1, x0) } else { (x0, x1) };
        let (y0, y1) = if y0 > y1 { (y1, y0) } else { (y0, y1) };
        if x0 >= self.width || y0 >= self.height || x1 < 0 || y1 < 0 {
            return None;
        }
        Some((x0.max(0), y0.max(0), x1.min(self.width - 1), y1.min(self.height - 1)))
    }
}

impl<B> PixelSurface for Display<B>
where
    B: BusAdapter,
{
    type Error = Error<B>;

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
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

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) -> DisplayResult<B> {
        let Some((x, y)) = self.viewport.clip_point(x, y) else {
            return Ok(());
        };
        self.begin()?;
        self.open_window(x, y, x, y)?;
        self.bus.write_pixel(color.0).map_err(Error::Bus)?;
        self.end()
    }

    fn read_pixel(&mut self, x: i32, y: i32) -> DisplayResult<B, Color> {
        let Some((x, y)) = self.viewport.clip_point(x, y) else {
            return Ok(Color::BLACK);
        };
        self.begin()?;
        self.open_window(x, y, x, y)?;
        let pixel = self.bus.read_pixel().map_err(Error::Bus)?;
        self.end()?;
        Ok(Color(pixel))
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> DisplayResult<B> {
        let Some(rect) = self.viewport.clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        self.begin()?;
        self.open_window(rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1)?;
        self.write_repeated(color.0, (rect.w * rect.h) as usize)?;
        self.end()
    }

    fn push_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u16],
        transparent: Option<Color>,
    ) -> DisplayResult<B> {
        let Some(rect) = self.viewport.clip_addr_window(x, y, w, h) else {
            return Ok(());
        };
        let key = transparent.map(|color| if self.swap_bytes { color.0.swap_bytes() } else { color.0 });

        self.begin()?;
        if key.is_none() {
            self.open_window(rect.x, rect.y, rect.x + rect.w - 1, rect.y + rect.h - 1)?;
        }
        for row in 0..rect.h {
            let Some(start) = rect.source_offset(row, w) else {
                break;
            };
            let Some(src) = data.get(start..start + rect.w as usize) else {
                break;
            };
            let Some(key) = key else {
                self.write_raw(src)?;
                continue;
            };

            // Opaque runs get their own one-row window
            let mut col = 0;
            while col < src.len() {
                let Some(skip) = src[col..].iter().position(|&p| p != key) else {
                    break;
                };
                let run_start = col + skip;
                let run_len = src[run_start..]
                    .iter()
                    .position(|&p| p == key)
                    .unwrap_or(src.len() - run_start);
                let x0 = rect.x + run_start as i32;
                let y0 = rect.y + row;
                self.open_window(x0, y0, x0 + run_len as i32 - 1, y0)?;
                self.write_raw(&src[run_start..run_start + run_len])?;
                col = run_start + run_len;
            }
        }
        self.end()
    }

    fn set_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) -> DisplayResult<B> {
        let Some((x0, y0, x1, y1)) = self.clamp_window(x0, y0, x1, y1) else {
            return Ok(());
        };
        self.begin()?;
        self.open_window(x0, y0, x1, y1)?;
        self.end()
    }

    fn push_color(&mut self, color: Color) -> DisplayResult<B> {
        self.begin()?;
        self.bus.write_pixel(color.0).map_err(Error::Bus)?;
        self.end()
    }

    fn push_block(&mut self, color: Color, len: u32) -> DisplayResult<B> {
        if len == 0 {
            return Ok(());
        }
        self.begin()?;
        self.write_repeated(color.0, len as usize)?;
        self.end()
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> DisplayResult<B> {
        if pixels.is_empty() {
            return Ok(());
        }
        self.begin()?;
        self.write_raw(pixels)?;
        self.end()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Builder, Dimensions};
    use alloc::vec;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    /// Operations seen by [`RecordingBus`], in order
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Op {
        Begin,
        End,
        Window(u16, u16, u16, u16),
        Write(Vec<u16>),
        Read,
        Rotation(Rotation),
        AsyncStart(usize),
        AsyncWait,
    }

    /// Bus adapter backed by a frame buffer, logging every call
    ///
    /// Asynchronous writes land in the frame buffer immediately but report
    /// busy for `busy_polls` polls, or until `wait_async`.
    pub(crate) struct RecordingBus {
        pub(crate) ops: Vec<Op>,
        pub(crate) frame: Vec<u16>,
        pub(crate) width: usize,
        pub(crate) height: usize,
        pub(crate) async_capable: bool,
        pub(crate) busy_polls: u32,
        busy_left: u32,
        in_flight: bool,
        window: (usize, usize, usize, usize),
        cursor: (usize, usize),
    }

    impl RecordingBus {
        pub(crate) fn new(width: usize, height: usize) -> Self {
            Self {
                ops: Vec::new(),
                frame: vec![0; width * height],
                width,
                height,
                async_capable: false,
                busy_polls: 2,
                busy_left: 0,
                in_flight: false,
                window: (0, 0, width - 1, height - 1),
                cursor: (0, 0),
            }
        }

        pub(crate) fn with_async(width: usize, height: usize) -> Self {
            Self {
                async_capable: true,
                ..Self::new(width, height)
            }
        }

        pub(crate) fn pixel(&self, x: usize, y: usize) -> u16 {
            self.frame[y * self.width + x]
        }

        /// Pixels written synchronously, across all writes
        pub(crate) fn written(&self) -> Vec<u16> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Write(pixels) => Some(pixels.clone()),
                    _ => None,
                })
                .flatten()
                .collect()
        }

        fn advance(&mut self) {
            let (x0, _, x1, y1) = self.window;
            self.cursor.0 += 1;
            if self.cursor.0 > x1 {
                self.cursor.0 = x0;
                self.cursor.1 += 1;
                if self.cursor.1 > y1 {
                    self.cursor.1 = self.window.1;
                }
            }
        }

        fn store(&mut self, pixels: &[u16]) {
            for &pixel in pixels {
                let (x, y) = self.cursor;
                if x < self.width && y < self.height {
                    self.frame[y * self.width + x] = pixel;
                }
                self.advance();
            }
        }
    }

    impl BusAdapter for RecordingBus {
        type Error = Infallible;

        fn open_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Self::Error> {
            self.ops.push(Op::Window(x0, y0, x1, y1));
            self.window = (x0.into(), y0.into(), x1.into(), y1.into());
            self.cursor = (x0.into(), y0.into());
            Ok(())
        }

        fn write_pixel(&mut self, pixel: u16) -> Result<(), Self::Error> {
            self.write_run(&[pixel])
        }

        fn write_run(&mut self, pixels: &[u16]) -> Result<(), Self::Error> {
            self.ops.push(Op::Write(pixels.to_vec()));
            self.store(pixels);
            Ok(())
        }

        fn read_pixel(&mut self) -> Result<u16, Self::Error> {
            self.ops.push(Op::Read);
            let (x, y) = self.cursor;
            let pixel = if x < self.width && y < self.height {
                self.frame[y * self.width + x]
            } else {
                0
            };
            self.advance();
            Ok(pixel)
        }

        fn begin_transaction(&mut self) -> Result<(), Self::Error> {
            self.ops.push(Op::Begin);
            Ok(())
        }

        fn end_transaction(&mut self) -> Result<(), Self::Error> {
            self.ops.push(Op::End);
            Ok(())
        }

        fn set_rotation(&mut self, rotation: Rotation) -> Result<(), Self::Error> {
            self.ops.push(Op::Rotation(rotation));
            Ok(())
        }

        fn supports_async(&self) -> bool {
            self.async_capable
        }

        fn start_async_write(&mut self, pixels: &[u16]) -> Result<(), Self::Error> {
            assert!(!self.in_flight, "async write started while busy");
            self.ops.push(Op::AsyncStart(pixels.len()));
            self.store(pixels);
            self.in_flight = true;
            self.busy_left = self.busy_polls;
            Ok(())
        }

        fn is_async_busy(&mut self) -> Result<bool, Self::Error> {
            if self.busy_left > 0 {
                self.busy_left -= 1;
                return Ok(true);
            }
            self.in_flight = false;
            Ok(false)
        }

        fn wait_async(&mut self) -> Result<(), Self::Error> {
            if self.in_flight {
                self.ops.push(Op::AsyncWait);
                self.in_flight = false;
                self.busy_left = 0;
            }
            Ok(())
        }
    }

    pub(crate) fn config(width: u16, height: u16) -> Config {
        let dims = Dimensions::new(width, height).unwrap();
        Builder::new().dimensions(dims).build().unwrap()
    }

    pub(crate) fn test_display(width: u16, height: u16) -> Display<RecordingBus> {
        Display::new(RecordingBus::new(width.into(), height.into()), config(width, height))
    }

    #[test]
    fn test_new_uses_rotated_dimensions() {
        let dims = Dimensions::new(240, 320).unwrap();
        let config = Builder::new()
            .dimensions(dims)
            .rotation(Rotation::Rotate90)
            .build()
            .unwrap();
        let display = Display::new(RecordingBus::new(320, 240), config);
        assert_eq!((display.width(), display.height()), (320, 240));
        assert_eq!(display.pivot(), (160, 120));
        assert!(display.bus().ops.is_empty());
    }

    #[test]
    fn test_set_rotation_resets_viewport_and_size() {
        let mut display = test_display(20, 10);
        display.set_viewport(2, 2, 5, 5, true);
        display.set_rotation(Rotation::Rotate270).unwrap();
        assert_eq!((display.width(), display.height()), (10, 20));
        assert!(display.viewport().is_full());
        assert_eq!(display.rotation(), Rotation::Rotate270);
        assert_eq!(
            display.bus().ops,
            [Op::Begin, Op::Rotation(Rotation::Rotate270), Op::End]
        );
    }

    #[test]
    fn test_draw_and_read_pixel() {
        let mut display = test_display(8, 8);
        display.draw_pixel(3, 4, Color::RED).unwrap();
        assert_eq!(display.bus().pixel(3, 4), Color::RED.0);
        assert_eq!(display.read_pixel(3, 4).unwrap(), Color::RED);
        assert_eq!(display.read_pixel(-1, 4).unwrap(), Color::BLACK);
    }

    #[test]
    fn test_draw_pixel_outside_touches_nothing() {
        let mut display = test_display(8, 8);
        display.draw_pixel(8, 0, Color::RED).unwrap();
        display.fill_rect(-5, -5, 5, 5, Color::RED).unwrap();
        assert!(display.bus().ops.is_empty());
    }

    #[test]
    fn test_fill_rect_clips_and_batches() {
        let mut display = test_display(100, 4);
        display.fill_rect(-10, 1, 60, 2, Color::BLUE).unwrap();
        let bus = display.bus();
        assert_eq!(bus.ops[1], Op::Window(0, 1, 49, 2));
        assert_eq!(bus.written().len(), 100);
        assert!(bus.ops.iter().all(|op| match op {
            Op::Write(pixels) => pixels.len() <= BATCH_PIXELS,
            _ => true,
        }));
        assert_eq!(bus.pixel(49, 2), Color::BLUE.0);
        assert_eq!(bus.pixel(50, 2), 0);
    }

    #[test]
    fn test_viewport_datum_offsets_drawing() {
        let mut display = test_display(16, 16);
        display.set_viewport(4, 4, 8, 8, true);
        display.draw_pixel(0, 0, Color::GREEN).unwrap();
        display.draw_pixel(8, 0, Color::GREEN).unwrap();
        assert_eq!(display.bus().pixel(4, 4), Color::GREEN.0);
        assert_eq!(display.bus().pixel(12, 4), 0);
    }

    #[test]
    fn test_push_block_zero_is_noop() {
        let mut display = test_display(16, 16);
        display.set_window(0, 0, 15, 15).unwrap();
        display.push_block(Color::WHITE, 100).unwrap();
        let before = display.bus().ops.clone();
        display.push_block(Color::WHITE, 0).unwrap();
        assert_eq!(display.bus().ops, before);
        assert_eq!(display.bus().written().len(), 100);
    }

    #[test]
    fn test_push_pixels_undoes_swap() {
        let mut display = test_display(4, 1);
        display.set_swap_bytes(true);
        display.set_window(0, 0, 3, 0).unwrap();
        display.push_pixels(&[0x00F8, 0x1F00]).unwrap();
        assert_eq!(display.bus().written(), [0xF800, 0x001F]);
    }

    #[test]
    fn test_push_image_clipped_rows() {
        let mut display = test_display(4, 4);
        let image: Vec<u16> = (1..=9).collect();
        display.push_image(2, -1, 3, 3, &image, None).unwrap();
        let bus = display.bus();
        assert_eq!(bus.ops[1], Op::Window(2, 0, 3, 1));
        assert_eq!(bus.written(), [4, 5, 7, 8]);
        assert_eq!(bus.pixel(3, 1), 8);
    }

    #[test]
    fn test_push_image_transparent_runs() {
        let mut display = test_display(6, 1);
        let key = Color::TRANSPARENT.0;
        let row = [1, key, key, 4, 5, key];
        display
            .push_image(0, 0, 6, 1, &row, Some(Color::TRANSPARENT))
            .unwrap();
        let bus = display.bus();
        let windows: Vec<_> = bus
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Window(..)))
            .cloned()
            .collect();
        assert_eq!(windows, [Op::Window(0, 0, 0, 0), Op::Window(3, 0, 4, 0)]);
        assert_eq!(bus.written(), [1, 4, 5]);
    }

    #[test]
    fn test_set_window_clamps_and_orders() {
        let mut display = test_display(10, 10);
        display.set_window(12, 3, -2, 1).unwrap();
        assert_eq!(display.bus().ops[1], Op::Window(0, 1, 9, 3));
        display.bus.ops.clear();
        display.set_window(20, 20, 30, 30).unwrap();
        assert!(display.bus().ops.is_empty());
    }

    #[test]
    fn test_release_returns_bus() {
        let mut display = test_display(4, 4);
        display.draw_pixel(0, 0, Color::WHITE).unwrap();
        let bus = display.release();
        assert_eq!(bus.pixel(0, 0), 0xFFFF);
    }
}
