//! Display configuration types and builder

pub use crate::error::{BuilderError, MAX_DIMENSION};

/// Largest transfer the DMA engine moves in one go, in pixels
pub const DEFAULT_DMA_MAX_PIXELS: usize = 0x7FFF;

/// Size of the blocking chunks sent ahead of an oversized DMA transfer
pub const DEFAULT_DMA_CHUNK_PIXELS: usize = 0x800;

/// Panel dimensions in the native (unrotated) orientation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
}

impl Dimensions {
    /// Create new dimensions with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidDimensions` if either side is zero or
    /// larger than [`MAX_DIMENSION`].
    pub fn new(width: u16, height: u16) -> Result<Self, BuilderError> {
        if width == 0 || width > MAX_DIMENSION || height == 0 || height > MAX_DIMENSION {
            return Err(BuilderError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of pixels on the panel
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Display rotation relative to native orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    /// No rotation
    #[default]
    Rotate0,
    /// Rotate 90 degrees clockwise
    Rotate90,
    /// Rotate 180 degrees
    Rotate180,
    /// Rotate 270 degrees clockwise
    Rotate270,
}

impl Rotation {
    /// Whether width and height trade places
    pub fn is_transposed(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }
}

/// Display configuration
///
/// Use `Builder` to create a Config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Panel dimensions
    pub dimensions: Dimensions,
    /// Initial rotation
    pub rotation: Rotation,
    /// Whether pixel data handed to the pipeline has its bytes swapped
    pub swap_bytes: bool,
    /// Largest pixel count started as a single asynchronous transfer
    pub dma_max_pixels: usize,
    /// Blocking chunk size used to shorten oversized transfers
    pub dma_chunk_pixels: usize,
}

impl Config {
    /// Get the rotated dimensions based on rotation setting
    pub fn rotated_dimensions(&self) -> Dimensions {
        if self.rotation.is_transposed() {
            Dimensions {
                width: self.dimensions.height,
                height: self.dimensions.width,
            }
        } else {
            self.dimensions
        }
    }
}

/// Builder for constructing display configuration
///
/// # Example
///
/// ```rust,no_run
/// use tft_render::{Builder, Dimensions, Rotation};
///
/// let dims = match Dimensions::new(240, 320) {
///     Ok(dims) => dims,
///     Err(_) => return,
/// };
/// let config = match Builder::new().dimensions(dims).rotation(Rotation::Rotate90).build() {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// let _ = config;
/// ```
#[must_use]
pub struct Builder {
    /// Panel dimensions (required)
    dimensions: Option<Dimensions>,
    /// Initial rotation
    rotation: Rotation,
    /// Byte swap flag
    swap_bytes: bool,
    /// Largest asynchronous transfer
    dma_max_pixels: usize,
    /// Blocking chunk size
    dma_chunk_pixels: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            dimensions: None,
            rotation: Rotation::Rotate0,
            swap_bytes: false,
            dma_max_pixels: DEFAULT_DMA_MAX_PIXELS,
            dma_chunk_pixels: DEFAULT_DMA_CHUNK_PIXELS,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set panel dimensions (required)
    pub fn dimensions(mut self, dims: Dimensions) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// Set initial rotation
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Swap the bytes of every pixel handed to the pipeline
    pub fn swap_bytes(mut self, swap: bool) -> Self {
        self.swap_bytes = swap;
        self
    }

    /// Set the largest single asynchronous transfer, in pixels
    pub fn dma_max_pixels(mut self, pixels: usize) -> Self {
        self.dma_max_pixels = pixels;
        self
    }

    /// Set the blocking chunk size for oversized transfers, in pixels
    pub fn dma_chunk_pixels(mut self, pixels: usize) -> Self {
        self.dma_chunk_pixels = pixels;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingDimensions` if dimensions were not set and
    /// `BuilderError::InvalidDmaChunk` if the chunk size is zero or above the
    /// transfer limit.
    pub fn build(self) -> Result<Config, BuilderError> {
        let dimensions = self.dimensions.ok_or(BuilderError::MissingDimensions)?;
        if self.dma_chunk_pixels == 0 || self.dma_chunk_pixels > self.dma_max_pixels {
            return Err(BuilderError::InvalidDmaChunk {
                chunk: self.dma_chunk_pixels,
                max: self.dma_max_pixels,
            });
        }
        Ok(Config {
            dimensions,
            rotation: self.rotation,
            swap_bytes: self.swap_bytes,
            dma_max_pixels: self.dma_max_pixels,
            dma_chunk_pixels: self.dma_chunk_pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_validation() {
        assert!(Dimensions::new(240, 320).is_ok());
        assert!(matches!(
            Dimensions::new(0, 320),
            Err(BuilderError::InvalidDimensions {
                width: 0,
                height: 320
            })
        ));
        assert!(Dimensions::new(240, MAX_DIMENSION + 1).is_err());
    }

    #[test]
    fn test_builder_requires_dimensions() {
        assert!(matches!(
            Builder::new().build(),
            Err(BuilderError::MissingDimensions)
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = Builder::new()
            .dimensions(Dimensions::new(240, 320).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.rotation, Rotation::Rotate0);
        assert!(!config.swap_bytes);
        assert_eq!(config.dma_max_pixels, DEFAULT_DMA_MAX_PIXELS);
        assert_eq!(config.dma_chunk_pixels, DEFAULT_DMA_CHUNK_PIXELS);
    }

    #[test]
    fn test_builder_rejects_chunk_above_max() {
        let result = Builder::new()
            .dimensions(Dimensions::new(240, 320).unwrap())
            .dma_max_pixels(100)
            .dma_chunk_pixels(200)
            .build();
        assert!(matches!(
            result,
            Err(BuilderError::InvalidDmaChunk {
                chunk: 200,
                max: 100
            })
        ));
    }

    #[test]
    fn test_rotated_dimensions() {
        let config = Builder::new()
            .dimensions(Dimensions::new(240, 320).unwrap())
            .rotation(Rotation::Rotate270)
            .build()
            .unwrap();
        assert_eq!(
            config.rotated_dimensions(),
            Dimensions {
                width: 320,
                height: 240
            }
        );
    }
}
