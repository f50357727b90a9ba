//! RGB565 colour model
//!
//! All drawing calls take a [`Color`], a packed 16-bit value with 5 bits of
//! red, 6 bits of green and 5 bits of blue. Canvases at lower depths convert
//! on the way in and out of their buffers:
//!
//! | Depth | Stored as             | Round trip            |
//! |-------|-----------------------|-----------------------|
//! | 16    | RGB565                | exact                 |
//! | 8     | RGB332                | lossy                 |
//! | 4     | palette index         | exact for palette hits|
//! | 1     | foreground/background | exact for the pair    |
//!
//! [`Color::TRANSPARENT`] is chosen so that it survives the RGB332 round trip,
//! which lets one sentinel mark transparent pixels at both 8 and 16 bits.
//!
//! ## Example
//!
//! ```
//! use tft_render::color::{alpha_blend, Color};
//!
//! let orange = Color::from_rgb(255, 180, 0);
//! assert_eq!(alpha_blend(255, orange, Color::BLACK), orange);
//! assert_eq!(alpha_blend(0, orange, Color::BLACK), Color::BLACK);
//!
//! let packed = Color::TRANSPARENT.to_rgb332();
//! assert_eq!(Color::from_rgb332(packed), Color::TRANSPARENT);
//! ```

/// Packed RGB565 colour
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(pub u16);

/// Blue channel expansion for the two RGB332 blue bits
const BLUE_2_TO_5: [u16; 4] = [0, 11, 21, 31];

impl Color {
    /// 0x0000
    pub const BLACK: Self = Self(0x0000);
    /// 0x000F
    pub const NAVY: Self = Self(0x000F);
    /// 0x03E0
    pub const DARKGREEN: Self = Self(0x03E0);
    /// 0x03EF
    pub const DARKCYAN: Self = Self(0x03EF);
    /// 0x7800
    pub const MAROON: Self = Self(0x7800);
    /// 0x780F
    pub const PURPLE: Self = Self(0x780F);
    /// 0x7BE0
    pub const OLIVE: Self = Self(0x7BE0);
    /// 0xD69A
    pub const LIGHTGREY: Self = Self(0xD69A);
    /// 0x7BEF
    pub const DARKGREY: Self = Self(0x7BEF);
    /// 0x001F
    pub const BLUE: Self = Self(0x001F);
    /// 0x07E0
    pub const GREEN: Self = Self(0x07E0);
    /// 0x07FF
    pub const CYAN: Self = Self(0x07FF);
    /// 0xF800
    pub const RED: Self = Self(0xF800);
    /// 0xF81F
    pub const MAGENTA: Self = Self(0xF81F);
    /// 0xFFE0
    pub const YELLOW: Self = Self(0xFFE0);
    /// 0xFFFF
    pub const WHITE: Self = Self(0xFFFF);
    /// 0xFDA0
    pub const ORANGE: Self = Self(0xFDA0);
    /// 0xB7E0
    pub const GREENYELLOW: Self = Self(0xB7E0);
    /// 0xFE19
    pub const PINK: Self = Self(0xFE19);
    /// 0x9A60
    pub const BROWN: Self = Self(0x9A60);
    /// 0xFEA0
    pub const GOLD: Self = Self(0xFEA0);
    /// 0xC618
    pub const SILVER: Self = Self(0xC618);
    /// 0x867D
    pub const SKYBLUE: Self = Self(0x867D);
    /// 0x915C
    pub const VIOLET: Self = Self(0x915C);

    /// Transparent sentinel
    ///
    /// Encodes to RGB332 `0x04` and decodes back to `0x0120`, so the same
    /// value marks transparency in 8-bit and 16-bit canvases.
    pub const TRANSPARENT: Self = Self(0x0120);

    /// Wrap a raw RGB565 value
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw RGB565 value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Pack 8-bit channels, dropping the low bits
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }

    /// Red channel, 0..=31
    pub const fn r5(self) -> u8 {
        (self.0 >> 11) as u8
    }

    /// Green channel, 0..=63
    pub const fn g6(self) -> u8 {
        ((self.0 >> 5) & 0x3F) as u8
    }

    /// Blue channel, 0..=31
    pub const fn b5(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    /// Lossy conversion to RGB332
    pub const fn to_rgb332(self) -> u8 {
        let c = self.0;
        (((c & 0xE000) >> 8) | ((c & 0x0700) >> 6) | ((c & 0x0018) >> 3)) as u8
    }

    /// Expand RGB332 to RGB565
    ///
    /// Red and green replicate their top bits; blue uses a four step ramp.
    pub const fn from_rgb332(c: u8) -> Self {
        let c = c as u16;
        Self(
            ((c & 0xE0) << 8)
                | ((c & 0xC0) << 5)
                | ((c & 0x1C) << 6)
                | ((c & 0x1C) << 3)
                | BLUE_2_TO_5[(c & 0x03) as usize],
        )
    }

    /// Expand to 0x00RRGGBB with bit replication
    pub const fn to_rgb888(self) -> u32 {
        let c = self.0 as u32;
        let r = ((c >> 8) & 0xF8) | (c >> 13);
        let g = ((c >> 3) & 0xFC) | ((c >> 9) & 0x03);
        let b = ((c << 3) & 0xF8) | ((c >> 2) & 0x07);
        (r << 16) | (g << 8) | b
    }

    /// Pack 0x00RRGGBB to RGB565
    pub const fn from_rgb888(c: u32) -> Self {
        Self((((c >> 8) & 0xF800) | ((c >> 5) & 0x07E0) | ((c >> 3) & 0x001F)) as u16)
    }

    /// Swap the two bytes of the raw value
    pub const fn swap_bytes(self) -> Self {
        Self(self.0.swap_bytes())
    }
}

impl From<u16> for Color {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Color> for u16 {
    fn from(color: Color) -> Self {
        color.0
    }
}

#[cfg(feature = "graphics")]
impl From<embedded_graphics_core::pixelcolor::Rgb565> for Color {
    fn from(color: embedded_graphics_core::pixelcolor::Rgb565) -> Self {
        use embedded_graphics_core::pixelcolor::IntoStorage;
        Self(color.into_storage())
    }
}

#[cfg(feature = "graphics")]
impl From<Color> for embedded_graphics_core::pixelcolor::Rgb565 {
    fn from(color: Color) -> Self {
        embedded_graphics_core::pixelcolor::raw::RawU16::new(color.0).into()
    }
}

/// Palette installed in new 4-bit canvases
pub const DEFAULT_4BIT_PALETTE: [Color; 16] = [
    Color::BLACK,
    Color::BROWN,
    Color::RED,
    Color::ORANGE,
    Color::YELLOW,
    Color::GREEN,
    Color::BLUE,
    Color::PURPLE,
    Color::DARKGREY,
    Color::WHITE,
    Color::CYAN,
    Color::MAGENTA,
    Color::MAROON,
    Color::DARKGREEN,
    Color::NAVY,
    Color::PINK,
];

const fn mix(fg: i32, bg: i32, weight: i32) -> i32 {
    bg + (((fg - bg) * weight) >> 8)
}

/// Blend `fg` over `bg` with coverage `alpha`
///
/// Each channel is blended at its own precision with an integer multiply and
/// shift. `alpha == 0` yields `bg` and `alpha == 255` yields `fg` exactly.
pub const fn alpha_blend(alpha: u8, fg: Color, bg: Color) -> Color {
    let weight = alpha as i32 + (alpha as i32 >> 7);
    let r = mix(fg.r5() as i32, bg.r5() as i32, weight);
    let g = mix(fg.g6() as i32, bg.g6() as i32, weight);
    let b = mix(fg.b5() as i32, bg.b5() as i32, weight);
    Color(((r as u16) << 11) | ((g as u16) << 5) | b as u16)
}

const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Blend with an ordered dither on the coverage
///
/// The coverage is perturbed by up to `dither` steps using a 4x4 Bayer
/// matrix indexed by the pixel position. Zero and full coverage are not
/// perturbed.
pub fn alpha_blend_dither(alpha: u8, fg: Color, bg: Color, dither: u8, x: i32, y: i32) -> Color {
    if dither == 0 || alpha == 0 || alpha == 255 {
        return alpha_blend(alpha, fg, bg);
    }
    let level = BAYER_4X4[(y & 3) as usize][(x & 3) as usize] as i32;
    let spread = 2 * dither as i32 + 1;
    let offset = level * spread / 16 - dither as i32;
    let alpha = (alpha as i32 + offset).clamp(0, 255) as u8;
    alpha_blend(alpha, fg, bg)
}

/// Blend two 0x00RRGGBB colours channel by channel
pub const fn alpha_blend24(alpha: u8, fg: u32, bg: u32) -> u32 {
    let weight = alpha as i32 + (alpha as i32 >> 7);
    let r = mix(((fg >> 16) & 0xFF) as i32, ((bg >> 16) & 0xFF) as i32, weight) as u32;
    let g = mix(((fg >> 8) & 0xFF) as i32, ((bg >> 8) & 0xFF) as i32, weight) as u32;
    let b = mix((fg & 0xFF) as i32, (bg & 0xFF) as i32, weight) as u32;
    (r << 16) | (g << 8) | b
}

/// Squared RGB distance, used for nearest palette lookups
pub(crate) fn distance(a: Color, b: Color) -> u32 {
    let dr = a.r5() as i32 - b.r5() as i32;
    let dg = a.g6() as i32 - b.g6() as i32;
    let db = a.b5() as i32 - b.b5() as i32;
    // Green carries one more bit; halve its step to weigh channels evenly.
    (4 * dr * dr + dg * dg + 4 * db * db) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_survives_rgb332() {
        assert_eq!(Color::TRANSPARENT.to_rgb332(), 0x04);
        assert_eq!(
            Color::from_rgb332(Color::TRANSPARENT.to_rgb332()),
            Color::TRANSPARENT
        );
    }

    #[test]
    fn test_rgb332_extremes() {
        assert_eq!(Color::WHITE.to_rgb332(), 0xFF);
        assert_eq!(Color::from_rgb332(0xFF), Color::WHITE);
        assert_eq!(Color::from_rgb332(0x00), Color::BLACK);
        assert_eq!(Color::RED.to_rgb332(), 0xE0);
        assert_eq!(Color::from_rgb332(0xE0), Color::RED);
    }

    #[test]
    fn test_rgb888_round_trip_is_exact_from_565() {
        for raw in [0x0000u16, 0xFFFF, 0xF800, 0x07E0, 0x001F, 0x1234, 0xBEEF] {
            let color = Color(raw);
            assert_eq!(Color::from_rgb888(color.to_rgb888()), color);
        }
        assert_eq!(Color::WHITE.to_rgb888(), 0x00FF_FFFF);
        assert_eq!(Color::RED.to_rgb888(), 0x00FF_0000);
    }

    #[test]
    fn test_from_rgb() {
        assert_eq!(Color::from_rgb(255, 0, 0), Color::RED);
        assert_eq!(Color::from_rgb(0, 255, 0), Color::GREEN);
        assert_eq!(Color::from_rgb(0, 0, 255), Color::BLUE);
        assert_eq!(Color::from_rgb(255, 255, 255), Color::WHITE);
    }

    #[test]
    fn test_alpha_blend_endpoints_are_exact() {
        let samples = [0x0000u16, 0xFFFF, 0xF800, 0x07E0, 0x001F, 0x8410, 0x1234, 0xFDA0];
        for &fg in &samples {
            for &bg in &samples {
                assert_eq!(alpha_blend(0, Color(fg), Color(bg)), Color(bg));
                assert_eq!(alpha_blend(255, Color(fg), Color(bg)), Color(fg));
            }
        }
    }

    #[test]
    fn test_alpha_blend_exhaustive_channel_endpoints() {
        // Every channel value pair at both extremes of coverage.
        for r in 0..32u16 {
            let fg = Color(r << 11 | (r * 2) << 5 | (31 - r));
            let bg = Color((31 - r) << 11 | (63 - r * 2) << 5 | r);
            assert_eq!(alpha_blend(255, fg, bg), fg);
            assert_eq!(alpha_blend(0, fg, bg), bg);
        }
    }

    #[test]
    fn test_alpha_blend_midpoint() {
        let mid = alpha_blend(128, Color::WHITE, Color::BLACK);
        assert_eq!(mid.r5(), 15);
        assert_eq!(mid.g6(), 31);
        assert_eq!(mid.b5(), 15);
    }

    #[test]
    fn test_alpha_blend_dither_stays_near_plain_blend() {
        let plain = alpha_blend(100, Color::WHITE, Color::BLACK);
        for y in 0..4 {
            for x in 0..4 {
                let dithered = alpha_blend_dither(100, Color::WHITE, Color::BLACK, 4, x, y);
                assert!((dithered.g6() as i32 - plain.g6() as i32).abs() <= 1);
            }
        }
        assert_eq!(
            alpha_blend_dither(255, Color::RED, Color::BLUE, 8, 1, 2),
            Color::RED
        );
        assert_eq!(
            alpha_blend_dither(0, Color::RED, Color::BLUE, 8, 1, 2),
            Color::BLUE
        );
    }

    #[test]
    fn test_alpha_blend24() {
        assert_eq!(alpha_blend24(255, 0x00FF_8000, 0x0000_00FF), 0x00FF_8000);
        assert_eq!(alpha_blend24(0, 0x00FF_8000, 0x0000_00FF), 0x0000_00FF);
        assert_eq!(alpha_blend24(128, 0x00FF_FFFF, 0), 0x0080_8080);
    }

    #[test]
    fn test_default_palette_order() {
        assert_eq!(DEFAULT_4BIT_PALETTE[0], Color::BLACK);
        assert_eq!(DEFAULT_4BIT_PALETTE[9], Color::WHITE);
        assert_eq!(DEFAULT_4BIT_PALETTE[15], Color::PINK);
    }

    #[cfg(feature = "graphics")]
    #[test]
    fn test_rgb565_conversion() {
        use embedded_graphics_core::pixelcolor::{Rgb565, RgbColor};
        assert_eq!(Color::from(Rgb565::RED), Color::RED);
        assert_eq!(Rgb565::from(Color::GREEN), Rgb565::GREEN);
    }
}
