//! MIPI DCS command definitions
//!
//! Command bytes shared by the common small TFT controllers (ST7789, ILI9341,
//! ILI9488, GC9A01 and friends). [`SpiInterface`](crate::interface::SpiInterface)
//! uses them to address the frame memory; they are public for callers that
//! need controller-specific setup beyond [`SpiInterface::init`](crate::interface::SpiInterface::init).
//!
//! ## Example
//!
//! ```
//! use tft_render::command::{madctl, MADCTL_BGR, MADCTL_MV, MADCTL_MX};
//! use tft_render::Rotation;
//!
//! assert_eq!(madctl(Rotation::Rotate90, false), MADCTL_MX | MADCTL_MV);
//! assert_eq!(madctl(Rotation::Rotate0, true), MADCTL_BGR);
//! ```

use crate::config::Rotation;

// System control commands

/// No operation
pub const NOP: u8 = 0x00;

/// Software reset
///
/// The controller needs 120ms before it accepts SLPOUT.
pub const SWRESET: u8 = 0x01;

/// Enter sleep mode
pub const SLPIN: u8 = 0x10;

/// Leave sleep mode
///
/// The controller needs 120ms before further commands.
pub const SLPOUT: u8 = 0x11;

/// Display inversion off
pub const INVOFF: u8 = 0x20;

/// Display inversion on
pub const INVON: u8 = 0x21;

/// Display off
pub const DISPOFF: u8 = 0x28;

/// Display on
pub const DISPON: u8 = 0x29;

// Frame memory commands

/// Column address set (start and end column, big-endian u16 each)
pub const CASET: u8 = 0x2A;

/// Row address set (start and end row, big-endian u16 each)
pub const RASET: u8 = 0x2B;

/// Memory write, starting at the window origin
pub const RAMWR: u8 = 0x2C;

/// Memory read, starting at the window origin
///
/// The first byte clocked out is a dummy; pixels follow as 3 bytes of 6-bit
/// red, green and blue in the top bits.
pub const RAMRD: u8 = 0x2E;

// Configuration commands

/// Memory data access control (scan direction and colour order)
pub const MADCTL: u8 = 0x36;

/// Interface pixel format
pub const COLMOD: u8 = 0x3A;

/// COLMOD value for 16 bits per pixel
pub const COLMOD_16BIT: u8 = 0x55;

// MADCTL bits

/// Row address order (mirror Y)
pub const MADCTL_MY: u8 = 0x80;

/// Column address order (mirror X)
pub const MADCTL_MX: u8 = 0x40;

/// Row/column exchange
pub const MADCTL_MV: u8 = 0x20;

/// Vertical refresh order
pub const MADCTL_ML: u8 = 0x10;

/// BGR colour filter order
pub const MADCTL_BGR: u8 = 0x08;

/// Horizontal refresh order
pub const MADCTL_MH: u8 = 0x04;

/// MADCTL value for a rotation
///
/// Rotations are clockwise; `bgr` selects panels wired blue-first.
pub const fn madctl(rotation: Rotation, bgr: bool) -> u8 {
    let scan = match rotation {
        Rotation::Rotate0 => 0,
        Rotation::Rotate90 => MADCTL_MX | MADCTL_MV,
        Rotation::Rotate180 => MADCTL_MX | MADCTL_MY,
        Rotation::Rotate270 => MADCTL_MV | MADCTL_MY,
    };
    if bgr { scan | MADCTL_BGR } else { scan }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_madctl_transposes_quarter_turns() {
        assert_eq!(madctl(Rotation::Rotate0, false), 0);
        assert_eq!(madctl(Rotation::Rotate90, false) & MADCTL_MV, MADCTL_MV);
        assert_eq!(madctl(Rotation::Rotate180, false) & MADCTL_MV, 0);
        assert_eq!(madctl(Rotation::Rotate270, false) & MADCTL_MV, MADCTL_MV);
    }

    #[test]
    fn test_madctl_bgr_bit() {
        for rotation in [
            Rotation::Rotate0,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ] {
            assert_eq!(madctl(rotation, true), madctl(rotation, false) | MADCTL_BGR);
        }
    }
}
