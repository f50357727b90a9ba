//! Error types for the engine
//!
//! Geometry that misses the surface is never an error; drawing calls simply do
//! nothing. The types here cover the failures that are reported to callers:
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`Error`] - Bus failures and undersized buffers on the device pipeline
//! - [`CanvasError`] - Canvas allocation and sizing failures
//! - [`FontError`] - Font loading and glyph streaming failures
//! - [`TextError`] - Surface or font failures while drawing text
//! - [`ImageError`] - Image payloads that do not match their size
//! - [`InterfaceError`](crate::interface::InterfaceError) - Low-level hardware communication errors
//!
//! ## Example
//!
//! ```
//! use tft_render::{Builder, BuilderError, Dimensions};
//!
//! // Missing dimensions
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingDimensions)));
//!
//! // Invalid dimensions
//! let result = Dimensions::new(0, 240);
//! assert!(result.is_err());
//! ```

use crate::interface::BusAdapter;

/// Largest panel or canvas side, in pixels
///
/// Keeps every coordinate representable in the 16-bit window commands.
pub const MAX_DIMENSION: u16 = 0x7FFF;

/// Errors that can occur when driving the display
///
/// Generic over the bus adapter to preserve the specific error type.
pub enum Error<B: BusAdapter> {
    /// Bus adapter error
    ///
    /// Fatal for the call that hit it; nothing is retried.
    Bus(B::Error),
    /// A caller-supplied buffer is too small
    BufferTooSmall {
        /// Required size in pixels
        required: usize,
        /// Provided size in pixels
        provided: usize,
    },
}

impl<B: BusAdapter> core::fmt::Debug for Error<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => f.debug_tuple("Bus").field(e).finish(),
            Self::BufferTooSmall { required, provided } => f
                .debug_struct("BufferTooSmall")
                .field("required", required)
                .field("provided", provided)
                .finish(),
        }
    }
}

impl<B: BusAdapter> core::fmt::Display for Error<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "Bus error: {e:?}"),
            Self::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "Buffer too small: required {required} pixels, provided {provided}"
                )
            }
        }
    }
}

impl<B: BusAdapter> core::error::Error for Error<B> {}

/// Errors that can occur when building configuration
#[derive(Debug)]
pub enum BuilderError {
    /// Dimensions were not specified
    ///
    /// [`Builder::dimensions()`](crate::config::Builder::dimensions) must be called before building.
    MissingDimensions,
    /// Invalid dimensions provided
    ///
    /// See [`Dimensions::new()`](crate::config::Dimensions::new) for constraints.
    InvalidDimensions {
        /// Width requested
        width: u16,
        /// Height requested
        height: u16,
    },
    /// DMA chunk size is zero or larger than the transfer limit
    InvalidDmaChunk {
        /// Chunk size requested
        chunk: usize,
        /// Transfer limit configured
        max: usize,
    },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingDimensions => write!(f, "Dimensions must be specified"),
            Self::InvalidDimensions { width, height } => write!(
                f,
                "Invalid dimensions {width}x{height} (each side must be 1..={MAX_DIMENSION})"
            ),
            Self::InvalidDmaChunk { chunk, max } => {
                write!(f, "Invalid DMA chunk {chunk} (must be 1..={max})")
            }
        }
    }
}

impl core::error::Error for BuilderError {}

/// Errors from canvas creation and depth changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasError {
    /// The pixel buffer could not be allocated
    OutOfMemory {
        /// Bytes requested
        bytes: usize,
    },
    /// Width or height is zero or above [`MAX_DIMENSION`]
    InvalidSize {
        /// Width requested
        width: i32,
        /// Height requested
        height: i32,
    },
    /// Only one or two frames are supported
    InvalidFrames(u8),
    /// The canvas has been deleted
    NotCreated,
}

impl core::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfMemory { bytes } => write!(f, "Out of memory allocating {bytes} bytes"),
            Self::InvalidSize { width, height } => {
                write!(f, "Invalid canvas size {width}x{height}")
            }
            Self::InvalidFrames(frames) => write!(f, "Invalid frame count {frames}"),
            Self::NotCreated => write!(f, "Canvas has no buffer"),
        }
    }
}

impl core::error::Error for CanvasError {}

/// Errors from loading a font or streaming glyph rows
///
/// Generic over the backing store error.
#[derive(Debug)]
pub enum FontError<E> {
    /// The backing store failed
    Source(E),
    /// The data ends before the header or glyph table does
    Truncated,
    /// The header describes an implausible font
    InvalidHeader,
    /// The glyph table could not be allocated
    OutOfMemory,
    /// No font is loaded
    NotLoaded,
}

impl<E: core::fmt::Debug> core::fmt::Display for FontError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Source(e) => write!(f, "Font source error: {e:?}"),
            Self::Truncated => write!(f, "Font data truncated"),
            Self::InvalidHeader => write!(f, "Invalid font header"),
            Self::OutOfMemory => write!(f, "Out of memory loading glyph table"),
            Self::NotLoaded => write!(f, "No font loaded"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for FontError<E> {}

/// Errors from drawing text
///
/// Generic over the surface error and the font backing store error.
#[derive(Debug)]
pub enum TextError<S, F> {
    /// The destination surface failed
    Surface(S),
    /// Streaming a glyph row failed
    Font(FontError<F>),
}

impl<S: core::fmt::Debug, F: core::fmt::Debug> core::fmt::Display for TextError<S, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "Surface error: {e:?}"),
            Self::Font(e) => write!(f, "{e}"),
        }
    }
}

impl<S: core::fmt::Debug, F: core::fmt::Debug> core::error::Error for TextError<S, F> {}

impl<S, F> From<FontError<F>> for TextError<S, F> {
    fn from(e: FontError<F>) -> Self {
        Self::Font(e)
    }
}

/// Errors from describing an image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// The data slice is shorter than the image needs
    BufferTooSmall {
        /// Required length in elements
        required: usize,
        /// Provided length in elements
        provided: usize,
    },
    /// Width or height is negative
    InvalidSize,
}

impl core::fmt::Display for ImageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall { required, provided } => write!(
                f,
                "Image data too small: required {required}, provided {provided}"
            ),
            Self::InvalidSize => write!(f, "Invalid image size"),
        }
    }
}

impl core::error::Error for ImageError {}
