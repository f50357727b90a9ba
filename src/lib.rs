//! TFT Rendering and Pixel Transfer
//!
//! Offscreen canvases, an anti-aliased rasterizer and a DMA-assisted pixel
//! pipeline for small colour TFT panels driven over SPI.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - Canvases at 1, 4, 8 and 16 bits per pixel, with palettes and rotation
//! - Anti-aliased arcs, circles, rounded rectangles and wide lines
//! - Rotated sprite blits with exact bounding boxes
//! - Asynchronous transfers guarded by the borrow checker
//! - Streaming anti-aliased fonts
//! - `embedded-graphics` integration (with `graphics` feature)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal::spi::{Operation, SpiDevice};
//! use tft_render::{
//!     Builder, Canvas, Color, ColorDepth, Dimensions, Display, Rotation, Shapes, SmoothShapes,
//!     SpiInterface,
//! };
//!
//! # struct MockSpi;
//! # impl embedded_hal::spi::ErrorType for MockSpi { type Error = Infallible; }
//! # impl SpiDevice for MockSpi {
//! #     fn transaction(
//! #         &mut self,
//! #         _operations: &mut [Operation<'_, u8>],
//! #     ) -> Result<(), Self::Error> {
//! #         Ok(())
//! #     }
//! # }
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let mut delay = MockDelay;
//! let mut interface = SpiInterface::new(MockSpi, MockPin, MockPin);
//! let _ = interface.reset(&mut delay);
//! let _ = interface.init(&mut delay);
//!
//! let dims = match Dimensions::new(240, 320) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let config = match Builder::new().dimensions(dims).rotation(Rotation::Rotate90).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let mut display = Display::new(interface, config);
//! let _ = display.init();
//!
//! // Compose offscreen, then push in one window
//! let Ok(mut sprite) = Canvas::new(64, 64, ColorDepth::Bpp16, 1) else {
//!     return;
//! };
//! sprite.fill_sprite(Color::NAVY);
//! let _ = sprite.fill_smooth_circle(32, 32, 20, Color::ORANGE, Some(Color::NAVY));
//! let _ = sprite.draw_rect(0, 0, 64, 64, Color::WHITE);
//! let _ = sprite.push_to(&mut display, 10, 10, None);
//! ```

#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// RGB565 colours and blending
pub mod color;
/// MIPI DCS command definitions
pub mod command;
/// Display configuration types and builder
pub mod config;
/// Device surface and transaction handling
pub mod display;
/// Error types for the crate
pub mod error;
/// Hardware interface abstraction
pub mod interface;
/// Coordinate rotation utilities
pub mod rotation;
/// Integer drawing primitives
pub mod shapes;
/// Anti-aliased drawing primitives
pub mod smooth;
/// Pixel surface capability
pub mod surface;
/// Synchronous and DMA pixel transfers
pub mod transfer;
/// Viewport clipping
pub mod viewport;

/// Rotated canvas blits
#[cfg(any(test, feature = "alloc"))]
pub mod blit;
/// Offscreen canvases
#[cfg(any(test, feature = "alloc"))]
pub mod canvas;
/// Anti-aliased font glyph cache
#[cfg(any(test, feature = "alloc"))]
pub mod font;
/// Packed image payloads
pub mod image;
/// Packed frame storage
#[cfg(any(test, feature = "alloc"))]
pub mod pixmap;
/// Anti-aliased text
#[cfg(any(test, feature = "alloc"))]
pub mod text;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

pub use color::Color;
pub use config::{Builder, Config, Dimensions, Rotation};
pub use display::Display;
pub use error::{
    BuilderError, CanvasError, Error, FontError, ImageError, MAX_DIMENSION, TextError,
};
pub use image::{Image, Pixels};
pub use interface::{BusAdapter, InterfaceError, SpiInterface};
pub use shapes::Shapes;
pub use smooth::SmoothShapes;
pub use surface::PixelSurface;
pub use transfer::Transfer;
pub use viewport::Viewport;

#[cfg(any(test, feature = "alloc"))]
pub use blit::{Bounds, RotationState, rotated_bounds};
#[cfg(any(test, feature = "alloc"))]
pub use canvas::Canvas;
#[cfg(any(test, feature = "alloc"))]
pub use font::{FontMetrics, FontSource, Glyph, GlyphCache};
#[cfg(any(test, feature = "alloc"))]
pub use pixmap::{ColorDepth, PixelBuffer};
#[cfg(any(test, feature = "alloc"))]
pub use text::{TextCursor, TextDatum};

#[cfg(feature = "std")]
pub use font::ReaderSource;

#[cfg(feature = "graphics")]
pub use graphics::GraphicSurface;
