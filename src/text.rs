//! Anti-aliased text
//!
//! Glyphs come from a [`GlyphCache`] and are streamed one coverage row at a
//! time. Fully covered pixels are drawn as horizontal runs; partial coverage
//! is blended against the cursor background, or against the pixel already on
//! the surface when no background is set.
//!
//! [`draw_string`] places a whole string by its [`TextDatum`], using the
//! measured width and the font's line metrics.
//!
//! ```
//! use tft_render::{Canvas, Color, ColorDepth, GlyphCache, TextCursor, text};
//!
//! # fn font() -> Vec<u8> {
//! #     let mut data = Vec::new();
//! #     for word in [1u32, 11, 12, 0, 8, 2, 65, 2, 2, 3, 2, 0, 0] {
//! #         data.extend_from_slice(&word.to_be_bytes());
//! #     }
//! #     data.extend([0xFF; 4]);
//! #     data
//! # }
//! let data = font();
//! let mut cache = GlyphCache::new();
//! cache.load_font(data.as_slice()).unwrap();
//!
//! let mut canvas = Canvas::new(32, 16, ColorDepth::Bpp16, 1).unwrap();
//! let mut cursor = TextCursor::new(0, 0, Color::WHITE);
//! text::draw_str(&mut canvas, &mut cache, &mut cursor, "AA").unwrap();
//! assert_eq!(cursor.x, 6);
//! ```

use embedded_hal::delay::DelayNs;

use crate::color::Color;
use crate::error::{FontError, TextError};
use crate::font::{FontSource, Glyph, GlyphCache};
use crate::shapes::Shapes;
use crate::smooth::SmoothShapes;
use crate::surface::PixelSurface;

/// Widest glyph row streamed per read
const ROW_BUFFER: usize = 256;

type TextResult<S, F, T = ()> = Result<T, TextError<<S as PixelSurface>::Error, <F as FontSource>::Error>>;

/// Reference point of a string placed with [`draw_string`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextDatum {
    /// Top of the line, left end
    #[default]
    TopLeft,
    /// Top of the line, centre
    TopCenter,
    /// Top of the line, right end
    TopRight,
    /// Half the line height, left end
    MiddleLeft,
    /// Half the line height, centre
    MiddleCenter,
    /// Half the line height, right end
    MiddleRight,
    /// Bottom of the line, left end
    BottomLeft,
    /// Bottom of the line, centre
    BottomCenter,
    /// Bottom of the line, right end
    BottomRight,
    /// Baseline, left end
    BaselineLeft,
    /// Baseline, centre
    BaselineCenter,
    /// Baseline, right end
    BaselineRight,
}

impl TextDatum {
    /// Offset from the top left of a `width` wide line to the datum
    ///
    /// `height` is the line advance and `baseline` the distance from the
    /// top of the line to the baseline.
    pub fn offset(self, width: i32, height: i32, baseline: i32) -> (i32, i32) {
        let x = match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft | Self::BaselineLeft => 0,
            Self::TopCenter | Self::MiddleCenter | Self::BottomCenter | Self::BaselineCenter => width / 2,
            Self::TopRight | Self::MiddleRight | Self::BottomRight | Self::BaselineRight => width,
        };
        let y = match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => 0,
            Self::MiddleLeft | Self::MiddleCenter | Self::MiddleRight => height / 2,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => height,
            Self::BaselineLeft | Self::BaselineCenter | Self::BaselineRight => baseline,
        };
        (x, y)
    }
}

/// Pen position and colours for text drawing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextCursor {
    /// Left edge of the next glyph cell
    pub x: i32,
    /// Top of the current line
    pub y: i32,
    /// Text colour
    pub fg: Color,
    /// Background for anti-aliasing; `None` blends against the surface
    pub bg: Option<Color>,
    /// Paint the glyph cell in `bg` before drawing
    pub fill_bg: bool,
    /// Move to the next line when a glyph would cross the right edge
    pub wrap_x: bool,
    /// Return to the top when a line would cross the bottom edge
    pub wrap_y: bool,
    /// Drawn in place of characters the font lacks
    pub fallback: Option<char>,
    /// Ordered dither applied to partial coverage, 0 for none
    pub dither: u8,
    /// Reference point used by [`draw_string`]
    pub datum: TextDatum,
}

impl TextCursor {
    /// Cursor at `(x, y)` drawing in `fg` with no background
    pub fn new(x: i32, y: i32, fg: Color) -> Self {
        Self {
            x,
            y,
            fg,
            bg: None,
            fill_bg: false,
            wrap_x: true,
            wrap_y: false,
            fallback: None,
            dither: 0,
            datum: TextDatum::TopLeft,
        }
    }
}

fn lookup<F: FontSource>(cache: &GlyphCache<F>, ch: char, fallback: Option<char>) -> Option<Glyph> {
    cache
        .get_glyph(u32::from(ch))
        .or_else(|| fallback.and_then(|f| cache.get_glyph(u32::from(f))))
        .copied()
}

/// Draw one character and advance the cursor
///
/// Control characters other than newline are ignored. A character missing
/// from the font draws the fallback glyph, or nothing.
pub fn draw_glyph<S, F>(surface: &mut S, cache: &mut GlyphCache<F>, cursor: &mut TextCursor, ch: char) -> TextResult<S, F>
where
    S: PixelSurface + ?Sized,
    F: FontSource,
{
    if !cache.is_loaded() {
        return Err(TextError::Font(FontError::NotLoaded));
    }
    let metrics = *cache.metrics();
    match ch {
        '\n' => {
            cursor.x = 0;
            cursor.y += i32::from(metrics.y_advance);
            return Ok(());
        }
        ' ' => {
            cursor.x += i32::from(metrics.space_width);
            return Ok(());
        }
        c if u32::from(c) < 0x20 => return Ok(()),
        _ => {}
    }
    let Some(glyph) = lookup(cache, ch, cursor.fallback) else {
        log::trace!("no glyph for {:?}", ch);
        return Ok(());
    };

    let y_advance = i32::from(metrics.y_advance);
    let dx = i32::from(glyph.dx);
    let width = i32::from(glyph.width);
    if cursor.wrap_x && cursor.x + width + dx > surface.viewport().datum_width() {
        cursor.y += y_advance;
        cursor.x = 0;
    }
    if cursor.wrap_y && cursor.y + y_advance >= surface.viewport().datum_height() {
        cursor.y = 0;
    }
    if cursor.x == 0 {
        cursor.x -= dx;
    }

    if let (true, Some(bg)) = (cursor.fill_bg, cursor.bg) {
        let cell = i32::from(glyph.x_advance).max(dx + width);
        surface
            .fill_rect(cursor.x, cursor.y, cell, y_advance, bg)
            .map_err(TextError::Surface)?;
    }

    render(surface, cache, &glyph, cursor)?;
    cursor.x += i32::from(glyph.x_advance);
    Ok(())
}

/// Draw the coverage map of `glyph` at the cursor, without moving it
fn render<S, F>(surface: &mut S, cache: &mut GlyphCache<F>, glyph: &Glyph, pen: &TextCursor) -> TextResult<S, F>
where
    S: PixelSurface + ?Sized,
    F: FontSource,
{
    let TextCursor {
        x, y, fg, bg, dither, ..
    } = *pen;
    let max_ascent = i32::from(cache.metrics().max_ascent);
    let left = x + i32::from(glyph.dx);
    let top = y + max_ascent - i32::from(glyph.dy);
    if !surface.check_viewport(left, top, i32::from(glyph.width), i32::from(glyph.height)) {
        return Ok(());
    }

    let mut row = [0u8; ROW_BUFFER];
    let width = usize::from(glyph.width).min(ROW_BUFFER);
    for line in 0..glyph.height {
        cache.read_row(glyph, line, &mut row[..width])?;
        let py = top + i32::from(line);
        let mut run = 0;
        for (col, &coverage) in row[..width].iter().enumerate() {
            let px = left + col as i32;
            if coverage == 0xFF {
                run += 1;
                continue;
            }
            if run > 0 {
                surface
                    .draw_fast_hline(px - run, py, run, fg)
                    .map_err(TextError::Surface)?;
                run = 0;
            }
            if coverage > 0 {
                surface
                    .draw_pixel_alpha_dither(px, py, fg, coverage, bg, dither)
                    .map_err(TextError::Surface)?;
            }
        }
        if run > 0 {
            surface
                .draw_fast_hline(left + width as i32 - run, py, run, fg)
                .map_err(TextError::Surface)?;
        }
    }
    Ok(())
}

/// Draw a string, advancing the cursor past it
pub fn draw_str<S, F>(surface: &mut S, cache: &mut GlyphCache<F>, cursor: &mut TextCursor, text: &str) -> TextResult<S, F>
where
    S: PixelSurface + ?Sized,
    F: FontSource,
{
    for ch in text.chars() {
        draw_glyph(surface, cache, cursor, ch)?;
    }
    Ok(())
}

/// Draw `text` with the cursor datum placed at `(x, y)`
///
/// The string is measured first and the cursor moved so that its
/// [`TextDatum`] lands on `(x, y)`; it is left after the last glyph.
/// Returns the measured width.
pub fn draw_string<S, F>(
    surface: &mut S,
    cache: &mut GlyphCache<F>,
    cursor: &mut TextCursor,
    text: &str,
    x: i32,
    y: i32,
) -> TextResult<S, F, i32>
where
    S: PixelSurface + ?Sized,
    F: FontSource,
{
    if !cache.is_loaded() {
        return Err(TextError::Font(FontError::NotLoaded));
    }
    let metrics = *cache.metrics();
    let width = text_width(cache, text, cursor.fallback);
    let (dx, dy) = cursor.datum.offset(
        width,
        i32::from(metrics.y_advance),
        i32::from(metrics.max_ascent),
    );
    cursor.x = x - dx;
    cursor.y = y - dy;
    draw_str(surface, cache, cursor, text)?;
    Ok(width)
}

/// Width in pixels `text` occupies on one line
///
/// Leading left bearing is included and the last glyph counts its ink
/// rather than its advance. Returns 0 with no font loaded.
pub fn text_width<F: FontSource>(cache: &GlyphCache<F>, text: &str, fallback: Option<char>) -> i32 {
    let space = i32::from(cache.metrics().space_width);
    let mut width = 0;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ' ' {
            width += space;
            continue;
        }
        let Some(glyph) = lookup(cache, ch, fallback) else {
            continue;
        };
        let dx = i32::from(glyph.dx);
        if width == 0 && dx < 0 {
            width -= dx;
        }
        if chars.peek().is_some() {
            width += i32::from(glyph.x_advance);
        } else {
            width += dx + i32::from(glyph.width);
        }
    }
    width
}

/// Page through every glyph in the font
///
/// Glyphs are laid out in codepoint order; each full page is shown for
/// `ms` milliseconds before the surface is cleared to the cursor background.
pub fn show_font<S, F, D>(
    surface: &mut S,
    cache: &mut GlyphCache<F>,
    cursor: &TextCursor,
    delay: &mut D,
    ms: u32,
) -> TextResult<S, F>
where
    S: PixelSurface + ?Sized,
    F: FontSource,
    D: DelayNs,
{
    if !cache.is_loaded() {
        return Err(TextError::Font(FontError::NotLoaded));
    }
    let metrics = *cache.metrics();
    let line = i32::from(metrics.y_advance);
    let cell = i32::from(metrics.max_ascent) + i32::from(metrics.max_descent);
    let width = surface.viewport().datum_width();
    let height = surface.viewport().datum_height();
    let bg = cursor.bg.unwrap_or(Color::BLACK);

    let (mut x, mut y) = (width, height);
    let mut wait = 0;
    surface.fill_screen(bg).map_err(TextError::Surface)?;
    for index in 0..cache.glyphs().len() {
        let glyph = cache.glyphs()[index];
        let dx = i32::from(glyph.dx);
        if x + dx + i32::from(glyph.width) >= width {
            x = -dx;
            y += line;
        }
        if y + cell >= height {
            x = -dx;
            y = 0;
            delay.delay_ms(wait);
            wait = ms;
            surface.fill_screen(bg).map_err(TextError::Surface)?;
        }
        let pen = TextCursor {
            x,
            y,
            bg: Some(bg),
            ..*cursor
        };
        render(surface, cache, &glyph, &pen)?;
        x += i32::from(glyph.x_advance);
    }
    delay.delay_ms(ms);
    surface.fill_screen(bg).map_err(TextError::Surface)?;
    log::debug!("font sweep done: {} glyphs", metrics.glyph_count);
    Ok(())
}
