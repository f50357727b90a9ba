//! Anti-aliased font glyph cache
//!
//! Fonts are greyscale `.vlw` files as produced by the Processing font tool.
//! All integers are big-endian `u32`:
//!
//! | Offset            | Contents                                                        |
//! |-------------------|-----------------------------------------------------------------|
//! | 0                 | glyph count, version, point size, (unused), ascent, descent     |
//! | 24                | per glyph: codepoint, height, width, x advance, dy, dx, padding |
//! | 24 + 28 * count   | coverage bitmaps, one byte per pixel, row-major, in table order |
//!
//! [`GlyphCache::load_font`] reads only the header and the metric table.
//! Bitmaps stay in the backing store and are streamed one row at a time with
//! [`GlyphCache::read_row`], so peak memory does not depend on glyph size.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::FontError;

/// Bytes in the font header
pub const HEADER_LEN: u32 = 24;

/// Bytes in one glyph metric record
pub const RECORD_LEN: u32 = 28;

/// Largest glyph count accepted
pub const MAX_GLYPHS: u32 = 0xFFFF;

/// Largest glyph width or height accepted
pub const MAX_GLYPH_SIDE: u32 = 255;

/// Random-access byte store holding a font
pub trait FontSource {
    /// Error type for reads
    type Error: Debug;

    /// Fill `buf` from `offset`, returning the number of bytes read
    ///
    /// A short count means the store ended.
    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl FontSource for &[u8] {
    type Error = core::convert::Infallible;

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(tail) = self.get(offset as usize..) else {
            return Ok(0);
        };
        let n = tail.len().min(buf.len());
        buf[..n].copy_from_slice(&tail[..n]);
        Ok(n)
    }
}

/// Font file behind any seekable reader
#[cfg(feature = "std")]
pub struct ReaderSource<R> {
    reader: R,
}

#[cfg(feature = "std")]
impl<R> ReaderSource<R>
where
    R: std::io::Read + std::io::Seek,
{
    /// Wrap a reader, typically a `std::fs::File`
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Give back the reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(feature = "std")]
impl<R> FontSource for ReaderSource<R>
where
    R: std::io::Read + std::io::Seek,
{
    type Error = std::io::Error;

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.reader.seek(std::io::SeekFrom::Start(u64::from(offset)))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// Metrics and bitmap location of one glyph
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Glyph {
    /// Unicode codepoint
    pub codepoint: u32,
    /// Bitmap width in pixels
    pub width: u16,
    /// Bitmap height in pixels
    pub height: u16,
    /// Cursor advance after drawing
    pub x_advance: u16,
    /// Offset of the bitmap left edge from the cursor
    pub dx: i16,
    /// Height of the bitmap top above the baseline
    pub dy: i16,
    /// Offset of the bitmap in the font data
    pub bitmap_offset: u32,
}

/// Whole-font metrics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FontMetrics {
    /// Glyphs in the font
    pub glyph_count: u16,
    /// Line advance
    pub y_advance: u16,
    /// Cursor advance for a space
    pub space_width: u16,
    /// Top of 'd' above the baseline
    pub ascent: i16,
    /// Bottom of 'p' below the baseline
    pub descent: i16,
    /// Largest ascent of any printable glyph
    pub max_ascent: u16,
    /// Largest descent of any printable glyph
    pub max_descent: u16,
}

/// Whether a codepoint takes part in the max ascent/descent scan
///
/// Control characters and the Latin-1 gap tend to carry odd metrics.
fn is_measured(codepoint: u32) -> bool {
    (codepoint > 0x20 && codepoint < 0x7F) || codepoint > 0xA0
}

fn be_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(word)
}

/// Glyph table of the loaded font, plus its backing store
pub struct GlyphCache<S> {
    source: Option<S>,
    glyphs: Vec<Glyph>,
    metrics: FontMetrics,
}

impl<S> Default for GlyphCache<S> {
    fn default() -> Self {
        Self {
            source: None,
            glyphs: Vec::new(),
            metrics: FontMetrics::default(),
        }
    }
}

impl<S> GlyphCache<S>
where
    S: FontSource,
{
    /// An empty cache with no font loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font, replacing the current one
    ///
    /// On error the cache is left unloaded and the source is dropped.
    pub fn load_font(&mut self, source: S) -> Result<(), FontError<S::Error>> {
        self.unload_font();
        let mut source = source;
        match Self::parse(&mut source) {
            Ok((glyphs, metrics)) => {
                log::debug!(
                    "font loaded: {} glyphs, y advance {}",
                    metrics.glyph_count,
                    metrics.y_advance
                );
                self.glyphs = glyphs;
                self.metrics = metrics;
                self.source = Some(source);
                Ok(())
            }
            Err(e) => {
                log::warn!("font rejected: {}", e);
                Err(e)
            }
        }
    }

    fn parse(source: &mut S) -> Result<(Vec<Glyph>, FontMetrics), FontError<S::Error>> {
        let mut header = [0u8; HEADER_LEN as usize];
        read_exact(source, 0, &mut header)?;
        let count = be_u32(&header[0..]);
        if count == 0 || count > MAX_GLYPHS {
            return Err(FontError::InvalidHeader);
        }

        let mut metrics = FontMetrics {
            glyph_count: count as u16,
            ascent: be_u32(&header[16..]) as i16,
            descent: be_u32(&header[20..]) as i16,
            ..FontMetrics::default()
        };

        let mut glyphs = Vec::new();
        if glyphs.try_reserve_exact(count as usize).is_err() {
            return Err(FontError::OutOfMemory);
        }

        let mut bitmap_offset = HEADER_LEN + count * RECORD_LEN;
        let mut record = [0u8; RECORD_LEN as usize];
        for index in 0..count {
            read_exact(source, HEADER_LEN + index * RECORD_LEN, &mut record)?;
            let height = be_u32(&record[4..]);
            let width = be_u32(&record[8..]);
            let x_advance = be_u32(&record[12..]);
            if height > MAX_GLYPH_SIDE || width > MAX_GLYPH_SIDE || x_advance > MAX_GLYPH_SIDE {
                return Err(FontError::InvalidHeader);
            }
            let glyph = Glyph {
                codepoint: be_u32(&record[0..]),
                height: height as u16,
                width: width as u16,
                x_advance: x_advance as u16,
                dy: be_u32(&record[16..]) as i16,
                dx: be_u32(&record[20..]) as i8 as i16,
                bitmap_offset,
            };

            if is_measured(glyph.codepoint) {
                let descent = i32::from(glyph.height) - i32::from(glyph.dy);
                metrics.max_ascent = metrics.max_ascent.max(glyph.dy.max(0) as u16);
                metrics.max_descent = metrics.max_descent.max(descent.max(0) as u16);
            }
            bitmap_offset = bitmap_offset
                .checked_add(width * height)
                .ok_or(FontError::InvalidHeader)?;
            glyphs.push(glyph);
        }

        glyphs.sort_by_key(|glyph| glyph.codepoint);
        metrics.y_advance = metrics.max_ascent + metrics.max_descent;
        let line = i32::from(metrics.ascent) + i32::from(metrics.descent);
        metrics.space_width = (line * 2 / 7).max(0) as u16;
        Ok((glyphs, metrics))
    }

    /// Drop the loaded font and give back its source
    ///
    /// Calling this with no font loaded does nothing.
    pub fn unload_font(&mut self) -> Option<S> {
        let source = self.source.take()?;
        self.glyphs = Vec::new();
        self.metrics = FontMetrics::default();
        log::debug!("font unloaded");
        Some(source)
    }

    /// Whether a font is loaded
    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    /// Metrics of the loaded font; all zero when none is loaded
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// Glyph table, sorted by codepoint
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Look up a codepoint
    pub fn get_glyph(&self, codepoint: u32) -> Option<&Glyph> {
        let index = self.glyphs.partition_point(|glyph| glyph.codepoint < codepoint);
        self.glyphs
            .get(index)
            .filter(|glyph| glyph.codepoint == codepoint)
    }

    /// Read coverage row `row` of `glyph` into `buf`
    ///
    /// Fills `min(buf.len(), glyph.width)` bytes; 0 is empty, 255 fully
    /// covered. Rows past the glyph height read nothing.
    pub fn read_row(&mut self, glyph: &Glyph, row: u16, buf: &mut [u8]) -> Result<(), FontError<S::Error>> {
        let source = self.source.as_mut().ok_or(FontError::NotLoaded)?;
        if row >= glyph.height {
            return Ok(());
        }
        let len = buf.len().min(usize::from(glyph.width));
        let offset = glyph.bitmap_offset + u32::from(row) * u32::from(glyph.width);
        read_exact(source, offset, &mut buf[..len])
    }
}

fn read_exact<S: FontSource>(source: &mut S, offset: u32, buf: &mut [u8]) -> Result<(), FontError<S::Error>> {
    let n = source.read_at(offset, buf).map_err(FontError::Source)?;
    if n < buf.len() {
        return Err(FontError::Truncated);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::vec;

    /// One glyph for [`build_font`]: codepoint, width, height, advance, dy, dx
    /// and a fill byte for every bitmap pixel
    pub(crate) struct TestGlyph {
        pub(crate) codepoint: u32,
        pub(crate) width: u32,
        pub(crate) height: u32,
        pub(crate) x_advance: u32,
        pub(crate) dy: i32,
        pub(crate) dx: i32,
        pub(crate) coverage: u8,
    }

    /// Assemble an in-memory font file
    pub(crate) fn build_font(ascent: u32, descent: u32, glyphs: &[TestGlyph]) -> Vec<u8> {
        let mut data = Vec::new();
        for word in [glyphs.len() as u32, 11, 12, 0, ascent, descent] {
            data.extend_from_slice(&word.to_be_bytes());
        }
        for glyph in glyphs {
            for word in [
                glyph.codepoint,
                glyph.height,
                glyph.width,
                glyph.x_advance,
                glyph.dy as u32,
                glyph.dx as u32,
                0,
            ] {
                data.extend_from_slice(&word.to_be_bytes());
            }
        }
        for glyph in glyphs {
            data.extend(vec![glyph.coverage; (glyph.width * glyph.height) as usize]);
        }
        data
    }

    pub(crate) fn abc_font() -> Vec<u8> {
        build_font(
            10,
            3,
            &[
                TestGlyph { codepoint: 66, width: 4, height: 9, x_advance: 6, dy: 9, dx: 1, coverage: 0xFF },
                TestGlyph { codepoint: 65, width: 5, height: 10, x_advance: 7, dy: 10, dx: 0, coverage: 0xFF },
                TestGlyph { codepoint: 67, width: 5, height: 12, x_advance: 6, dy: 9, dx: -1, coverage: 0x80 },
            ],
        )
    }

    #[test]
    fn test_load_and_lookup() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        assert!(cache.is_loaded());

        assert!(cache.get_glyph(68).is_none());
        let a = cache.get_glyph(65).unwrap();
        assert_eq!((a.width, a.height, a.x_advance), (5, 10, 7));
        let c = cache.get_glyph(67).unwrap();
        assert_eq!(c.dx, -1);

        let metrics = cache.metrics();
        assert_eq!(metrics.glyph_count, 3);
        assert_eq!(metrics.max_ascent, 10);
        assert_eq!(metrics.max_descent, 3);
        assert_eq!(metrics.y_advance, 13);
        assert_eq!(metrics.space_width, 3);
    }

    #[test]
    fn test_bitmap_offsets_follow_record_order() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        let base = HEADER_LEN + 3 * RECORD_LEN;
        assert_eq!(cache.get_glyph(66).unwrap().bitmap_offset, base);
        assert_eq!(cache.get_glyph(65).unwrap().bitmap_offset, base + 36);
        assert_eq!(cache.get_glyph(67).unwrap().bitmap_offset, base + 86);
    }

    #[test]
    fn test_read_row_streams_coverage() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        let glyph = *cache.get_glyph(67).unwrap();
        let mut row = [0u8; 8];
        cache.read_row(&glyph, 11, &mut row).unwrap();
        assert_eq!(row, [0x80, 0x80, 0x80, 0x80, 0x80, 0, 0, 0]);
    }

    #[test]
    fn test_duplicate_codepoint_first_record_wins() {
        let data = build_font(
            8,
            2,
            &[
                TestGlyph { codepoint: 65, width: 1, height: 1, x_advance: 3, dy: 1, dx: 0, coverage: 1 },
                TestGlyph { codepoint: 65, width: 2, height: 1, x_advance: 9, dy: 1, dx: 0, coverage: 2 },
            ],
        );
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        assert_eq!(cache.get_glyph(65).unwrap().x_advance, 3);
    }

    #[test]
    fn test_truncated_font_is_rejected() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        let short = &data[..40];
        assert!(matches!(cache.load_font(short), Err(FontError::Truncated)));
        assert!(!cache.is_loaded());
        assert!(cache.get_glyph(65).is_none());

        let empty = build_font(8, 2, &[]);
        assert!(matches!(
            cache.load_font(empty.as_slice()),
            Err(FontError::InvalidHeader)
        ));
    }

    #[test]
    fn test_oversized_glyph_is_rejected() {
        let data = build_font(
            8,
            2,
            &[TestGlyph { codepoint: 65, width: 300, height: 1, x_advance: 3, dy: 1, dx: 0, coverage: 0 }],
        );
        let mut cache = GlyphCache::new();
        assert!(matches!(
            cache.load_font(data.as_slice()),
            Err(FontError::InvalidHeader)
        ));
    }

    #[test]
    fn test_unload_twice_is_harmless() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        assert!(cache.unload_font().is_some());
        assert!(cache.unload_font().is_none());
        assert_eq!(cache.metrics(), &FontMetrics::default());

        let glyph = Glyph::default();
        let mut row = [0u8; 1];
        assert!(matches!(
            cache.read_row(&glyph, 0, &mut row),
            Err(FontError::NotLoaded)
        ));
    }

    #[test]
    fn test_read_row_past_end_of_data() {
        let mut data = abc_font();
        data.truncate(data.len() - 1);
        let mut cache = GlyphCache::new();
        cache.load_font(data.as_slice()).unwrap();
        let glyph = *cache.get_glyph(67).unwrap();
        let mut row = [0u8; 5];
        assert!(matches!(
            cache.read_row(&glyph, 11, &mut row),
            Err(FontError::Truncated)
        ));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_reader_source_matches_slice() {
        let data = abc_font();
        let mut cache = GlyphCache::new();
        cache
            .load_font(ReaderSource::new(std::io::Cursor::new(data)))
            .unwrap();
        let glyph = *cache.get_glyph(65).unwrap();
        let mut row = [0u8; 5];
        cache.read_row(&glyph, 0, &mut row).unwrap();
        assert_eq!(row, [0xFF; 5]);
    }
}
