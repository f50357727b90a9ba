//! Packed pixel storage
//!
//! A [`PixelBuffer`] holds one frame of a canvas at a fixed depth. Each variant
//! owns its own addressing:
//!
//! - `Bitmap1`: one bit per pixel, rows padded to whole bytes, leftmost pixel in
//!   the most significant bit
//! - `Bitmap4`: two pixels per byte, rows padded to whole bytes, even columns in
//!   the high nibble
//! - `Bitmap8`: one RGB332 byte per pixel
//! - `Bitmap16`: one RGB565 word per pixel
//!
//! Values read and written here are raw native values (bit, palette index,
//! RGB332 byte or RGB565 word); colour conversion happens in the canvas.

use alloc::vec::Vec;

use crate::error::CanvasError;

/// Bits per pixel of a canvas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorDepth {
    /// Two colours, foreground and background
    Bpp1 = 1,
    /// Sixteen palette entries
    Bpp4 = 4,
    /// RGB332
    Bpp8 = 8,
    /// RGB565
    #[default]
    Bpp16 = 16,
}

impl ColorDepth {
    /// Bits per pixel
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Bytes needed for a `width` x `height` frame at this depth
    pub fn frame_bytes(self, width: usize, height: usize) -> usize {
        match self {
            Self::Bpp1 => width.div_ceil(8) * height,
            Self::Bpp4 => width.div_ceil(2) * height,
            Self::Bpp8 => width * height,
            Self::Bpp16 => width * height * 2,
        }
    }
}

impl TryFrom<u8> for ColorDepth {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::Bpp1),
            4 => Ok(Self::Bpp4),
            8 => Ok(Self::Bpp8),
            16 => Ok(Self::Bpp16),
            other => Err(other),
        }
    }
}

/// One frame of pixels at a fixed depth
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    /// 1 bpp, MSB first
    Bitmap1(Vec<u8>),
    /// 4 bpp palette indices, high nibble first
    Bitmap4(Vec<u8>),
    /// 8 bpp RGB332
    Bitmap8(Vec<u8>),
    /// 16 bpp RGB565
    Bitmap16(Vec<u16>),
}

fn try_zeroed<T: Clone + Default>(len: usize, bytes: usize) -> Result<Vec<T>, CanvasError> {
    let mut data = Vec::new();
    if data.try_reserve_exact(len).is_err() {
        log::warn!("canvas allocation of {} bytes failed", bytes);
        return Err(CanvasError::OutOfMemory { bytes });
    }
    data.resize(len, T::default());
    Ok(data)
}

impl PixelBuffer {
    /// Allocate a zeroed frame
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::OutOfMemory` if the heap cannot hold the frame.
    pub fn allocate(depth: ColorDepth, width: usize, height: usize) -> Result<Self, CanvasError> {
        let bytes = depth.frame_bytes(width, height);
        Ok(match depth {
            ColorDepth::Bpp1 => Self::Bitmap1(try_zeroed(bytes, bytes)?),
            ColorDepth::Bpp4 => Self::Bitmap4(try_zeroed(bytes, bytes)?),
            ColorDepth::Bpp8 => Self::Bitmap8(try_zeroed(bytes, bytes)?),
            ColorDepth::Bpp16 => Self::Bitmap16(try_zeroed(width * height, bytes)?),
        })
    }

    /// Depth of this frame
    pub fn depth(&self) -> ColorDepth {
        match self {
            Self::Bitmap1(_) => ColorDepth::Bpp1,
            Self::Bitmap4(_) => ColorDepth::Bpp4,
            Self::Bitmap8(_) => ColorDepth::Bpp8,
            Self::Bitmap16(_) => ColorDepth::Bpp16,
        }
    }

    /// Raw value at `(x, y)` in a frame `width` pixels wide
    ///
    /// Out of range reads return 0.
    pub fn get(&self, x: usize, y: usize, width: usize) -> u16 {
        match self {
            Self::Bitmap1(data) => {
                let index = y * width.div_ceil(8) + x / 8;
                data.get(index)
                    .map_or(0, |&byte| u16::from((byte >> (7 - (x & 7))) & 1))
            }
            Self::Bitmap4(data) => {
                let index = y * width.div_ceil(2) + x / 2;
                data.get(index).map_or(0, |&byte| {
                    if x & 1 == 0 {
                        u16::from(byte >> 4)
                    } else {
                        u16::from(byte & 0x0F)
                    }
                })
            }
            Self::Bitmap8(data) => data.get(y * width + x).map_or(0, |&byte| u16::from(byte)),
            Self::Bitmap16(data) => data.get(y * width + x).copied().unwrap_or(0),
        }
    }

    /// Store a raw value at `(x, y)`; out of range writes are dropped
    pub fn set(&mut self, x: usize, y: usize, width: usize, value: u16) {
        match self {
            Self::Bitmap1(data) => {
                let index = y * width.div_ceil(8) + x / 8;
                if let Some(byte) = data.get_mut(index) {
                    let mask = 0x80 >> (x & 7);
                    if value & 1 != 0 {
                        *byte |= mask;
                    } else {
                        *byte &= !mask;
                    }
                }
            }
            Self::Bitmap4(data) => {
                let index = y * width.div_ceil(2) + x / 2;
                if let Some(byte) = data.get_mut(index) {
                    let nibble = (value & 0x0F) as u8;
                    *byte = if x & 1 == 0 {
                        (*byte & 0x0F) | (nibble << 4)
                    } else {
                        (*byte & 0xF0) | nibble
                    };
                }
            }
            Self::Bitmap8(data) => {
                if let Some(byte) = data.get_mut(y * width + x) {
                    *byte = value as u8;
                }
            }
            Self::Bitmap16(data) => {
                if let Some(word) = data.get_mut(y * width + x) {
                    *word = value;
                }
            }
        }
    }

    /// Store `len` copies of a raw value along row `y` starting at `x`
    pub fn fill_span(&mut self, x: usize, y: usize, len: usize, width: usize, value: u16) {
        match self {
            Self::Bitmap8(data) => {
                let start = y * width + x;
                if let Some(span) = data.get_mut(start..start + len) {
                    span.fill(value as u8);
                }
            }
            Self::Bitmap16(data) => {
                let start = y * width + x;
                if let Some(span) = data.get_mut(start..start + len) {
                    span.fill(value);
                }
            }
            _ => {
                for offset in 0..len {
                    self.set(x + offset, y, width, value);
                }
            }
        }
    }

    /// Store one raw value in every pixel
    pub fn fill(&mut self, value: u16) {
        match self {
            Self::Bitmap1(data) => data.fill(if value & 1 != 0 { 0xFF } else { 0x00 }),
            Self::Bitmap4(data) => {
                let nibble = (value & 0x0F) as u8;
                data.fill((nibble << 4) | nibble);
            }
            Self::Bitmap8(data) => data.fill(value as u8),
            Self::Bitmap16(data) => data.fill(value),
        }
    }

    /// Size of the frame in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Bitmap1(data) | Self::Bitmap4(data) | Self::Bitmap8(data) => data.len(),
            Self::Bitmap16(data) => data.len() * 2,
        }
    }

    /// Packed bytes of a 1, 4 or 8 bpp frame
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bitmap1(data) | Self::Bitmap4(data) | Self::Bitmap8(data) => Some(data),
            Self::Bitmap16(_) => None,
        }
    }

    /// Words of a 16 bpp frame
    pub fn as_words(&self) -> Option<&[u16]> {
        match self {
            Self::Bitmap16(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable words of a 16 bpp frame
    pub fn as_words_mut(&mut self) -> Option<&mut [u16]> {
        match self {
            Self::Bitmap16(data) => Some(data),
            _ => None,
        }
    }
}
