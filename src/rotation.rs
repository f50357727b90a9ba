//! Coordinate rotation utilities
//!
//! Canvases store pixels in their physical (unrotated) layout. Drawing calls
//! use logical coordinates, which this module maps onto the physical buffer
//! for each quarter-turn [`Rotation`].
//!
//! ## Rotation Modes
//!
//! - **Rotate0**: Native orientation
//! - **Rotate90**: 90° clockwise, width and height swapped
//! - **Rotate180**: 180° rotation, origin at bottom-right
//! - **Rotate270**: 270° clockwise (or 90° counter-clockwise)
//!
//! ## Example
//!
//! ```
//! use tft_render::{rotation::apply_rotation, Rotation};
//!
//! // 16x8 buffer; logical (0, 0) at 90° is the physical top-right corner
//! assert_eq!(apply_rotation(0, 0, 16, 8, Rotation::Rotate90), (15, 0));
//! assert_eq!(apply_rotation(0, 0, 16, 8, Rotation::Rotate180), (15, 7));
//! ```

use crate::config::Rotation;

/// Map a logical coordinate to the physical buffer
///
/// # Arguments
///
/// * `x` - Logical column
/// * `y` - Logical row
/// * `width` - Physical buffer width in pixels
/// * `height` - Physical buffer height in pixels
/// * `rotation` - Rotation mode
///
/// The caller guarantees the logical point lies inside the rotated bounds.
pub fn apply_rotation(x: u32, y: u32, width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    match rotation {
        Rotation::Rotate0 => (x, y),
        Rotation::Rotate90 => (width - 1 - y, x),
        Rotation::Rotate180 => (width - 1 - x, height - 1 - y),
        Rotation::Rotate270 => (y, height - 1 - x),
    }
}

/// Logical size of a physical `width` x `height` area under `rotation`
pub fn rotated_size(width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    match rotation {
        Rotation::Rotate0 | Rotation::Rotate180 => (width, height),
        Rotation::Rotate90 | Rotation::Rotate270 => (height, width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate0() {
        assert_eq!(apply_rotation(0, 0, 8, 4, Rotation::Rotate0), (0, 0));
        assert_eq!(apply_rotation(7, 3, 8, 4, Rotation::Rotate0), (7, 3));
    }

    #[test]
    fn test_rotate90() {
        // 8x4 physical is 4x8 logical; logical x runs down the physical buffer
        assert_eq!(apply_rotation(0, 0, 8, 4, Rotation::Rotate90), (7, 0));
        assert_eq!(apply_rotation(3, 0, 8, 4, Rotation::Rotate90), (7, 3));
        assert_eq!(apply_rotation(0, 7, 8, 4, Rotation::Rotate90), (0, 0));
    }

    #[test]
    fn test_rotate180() {
        assert_eq!(apply_rotation(0, 0, 8, 4, Rotation::Rotate180), (7, 3));
        assert_eq!(apply_rotation(7, 3, 8, 4, Rotation::Rotate180), (0, 0));
    }

    #[test]
    fn test_rotate270() {
        assert_eq!(apply_rotation(0, 0, 8, 4, Rotation::Rotate270), (0, 3));
        assert_eq!(apply_rotation(3, 7, 8, 4, Rotation::Rotate270), (7, 0));
    }

    #[test]
    fn test_rotations_are_bijective() {
        for rotation in [
            Rotation::Rotate0,
            Rotation::Rotate90,
            Rotation::Rotate180,
            Rotation::Rotate270,
        ] {
            let (lw, lh) = rotated_size(5, 3, rotation);
            let mut seen = [false; 15];
            for y in 0..lh {
                for x in 0..lw {
                    let (px, py) = apply_rotation(x, y, 5, 3, rotation);
                    assert!(px < 5 && py < 3);
                    seen[(py * 5 + px) as usize] = true;
                }
            }
            assert!(seen.iter().all(|hit| *hit));
        }
    }
}
