//! Viewport clipping
//!
//! A [`Viewport`] is the clip rectangle every drawing call on a surface goes
//! through, plus the datum that caller coordinates are measured from. With a
//! relative datum, `(0, 0)` addresses the top-left corner of the viewport;
//! otherwise it addresses the top-left corner of the surface.
//!
//! Clip queries return absolute surface coordinates, or `None` when nothing
//! of the requested area is visible.
//!
//! ## Example
//!
//! ```
//! use tft_render::viewport::Viewport;
//!
//! let mut vp = Viewport::new(240, 320);
//! vp.set(10, 20, 100, 50, true);
//!
//! // (0, 0) is now the viewport corner
//! assert_eq!(vp.clip_point(0, 0), Some((10, 20)));
//! // outside the viewport
//! assert_eq!(vp.clip_point(100, 0), None);
//! ```

/// Inclusive window in absolute surface coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// Left column
    pub x0: i32,
    /// Top row
    pub y0: i32,
    /// Right column (inclusive)
    pub x1: i32,
    /// Bottom row (inclusive)
    pub y1: i32,
}

impl Window {
    /// Width in pixels
    pub fn width(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    /// Height in pixels
    pub fn height(&self) -> i32 {
        self.y1 - self.y0 + 1
    }
}

/// Visible part of a rectangle after clipping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRect {
    /// Absolute left column
    pub x: i32,
    /// Absolute top row
    pub y: i32,
    /// Visible width
    pub w: i32,
    /// Visible height
    pub h: i32,
    /// Columns skipped at the left of the requested rectangle
    pub dx: i32,
    /// Rows skipped at the top of the requested rectangle
    pub dy: i32,
}

impl ClipRect {
    /// Index of the first visible pixel of visible row `row` in a row-major
    /// source `stride` pixels wide
    ///
    /// `None` when the index does not fit in memory, which no slice can
    /// reach either.
    pub fn source_offset(&self, row: i32, stride: i32) -> Option<usize> {
        let line = usize::try_from(self.dy.checked_add(row)?).ok()?;
        let stride = usize::try_from(stride).ok()?;
        let skip = usize::try_from(self.dx).ok()?;
        line.checked_mul(stride)?.checked_add(skip)
    }
}

/// Pixel count of a `w` x `h` area, saturating; negative sides count as 0
pub(crate) fn pixel_count(w: i32, h: i32) -> usize {
    let side = |n: i32| usize::try_from(n).unwrap_or(0);
    side(w).saturating_mul(side(h))
}

/// Clip rectangle and coordinate datum of a surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    x_datum: i32,
    y_datum: i32,
    width: i32,
    height: i32,
    datum: bool,
    out_of_bounds: bool,
    surface_width: i32,
    surface_height: i32,
}

impl Viewport {
    /// Full-surface viewport for a surface of the given size
    pub fn new(surface_width: i32, surface_height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: surface_width,
            bottom: surface_height,
            x_datum: 0,
            y_datum: 0,
            width: surface_width,
            height: surface_height,
            datum: false,
            out_of_bounds: false,
            surface_width,
            surface_height,
        }
    }

    /// Replace the viewport
    ///
    /// The area is clamped to the surface. An area entirely off the surface
    /// marks the viewport out of bounds, which makes every clip query fail
    /// until the next [`set`](Self::set) or [`reset`](Self::reset).
    pub fn set(&mut self, x: i32, y: i32, w: i32, h: i32, datum: bool) {
        self.datum = datum;
        self.x_datum = x;
        self.y_datum = y;
        self.width = w;
        self.height = h;
        self.out_of_bounds = false;

        self.left = x.max(0);
        self.top = y.max(0);
        self.right = x.saturating_add(w).min(self.surface_width);
        self.bottom = y.saturating_add(h).min(self.surface_height);

        if self.left >= self.right || self.top >= self.bottom {
            self.reset();
            self.out_of_bounds = true;
            return;
        }

        if !datum {
            self.x_datum = 0;
            self.y_datum = 0;
            self.width = self.surface_width;
            self.height = self.surface_height;
        }
    }

    /// Restore the full surface with the datum at the surface corner
    pub fn reset(&mut self) {
        *self = Self::new(self.surface_width, self.surface_height);
    }

    /// Track a change of the surface size; resets the viewport
    pub fn resize(&mut self, surface_width: i32, surface_height: i32) {
        self.surface_width = surface_width;
        self.surface_height = surface_height;
        self.reset();
    }

    /// Move the datum without changing the clip area
    pub fn set_origin(&mut self, x: i32, y: i32) {
        self.x_datum = x;
        self.y_datum = y;
    }

    /// Current datum in surface coordinates
    pub fn origin(&self) -> (i32, i32) {
        (self.x_datum, self.y_datum)
    }

    /// Left edge of the clip area
    pub fn x(&self) -> i32 {
        self.left
    }

    /// Top edge of the clip area
    pub fn y(&self) -> i32 {
        self.top
    }

    /// Width of the clip area
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height of the clip area
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Logical width callers draw in (viewport width with a relative datum)
    pub fn datum_width(&self) -> i32 {
        self.width
    }

    /// Logical height callers draw in
    pub fn datum_height(&self) -> i32 {
        self.height
    }

    /// Whether coordinates are measured from the viewport corner
    pub fn datum(&self) -> bool {
        self.datum
    }

    /// Whether the last requested viewport missed the surface
    pub fn is_out_of_bounds(&self) -> bool {
        self.out_of_bounds
    }

    /// Whether the viewport covers the whole surface
    pub fn is_full(&self) -> bool {
        !self.out_of_bounds
            && self.left == 0
            && self.top == 0
            && self.right == self.surface_width
            && self.bottom == self.surface_height
    }

    /// Visible area in caller coordinates as `(x0, y0, x1, y1)`, right and
    /// bottom exclusive
    pub fn drawable(&self) -> Option<(i32, i32, i32, i32)> {
        if self.out_of_bounds {
            return None;
        }
        Some((
            self.left.saturating_sub(self.x_datum),
            self.top.saturating_sub(self.y_datum),
            self.right.saturating_sub(self.x_datum),
            self.bottom.saturating_sub(self.y_datum),
        ))
    }

    /// Whether any part of the area lies inside the viewport
    pub fn check(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        if self.out_of_bounds || w < 1 || h < 1 {
            return false;
        }
        let x = i64::from(x) + i64::from(self.x_datum);
        let y = i64::from(y) + i64::from(self.y_datum);
        x < i64::from(self.right)
            && y < i64::from(self.bottom)
            && x + i64::from(w) > i64::from(self.left)
            && y + i64::from(h) > i64::from(self.top)
    }

    /// Map a caller point to surface coordinates if it is visible
    pub fn clip_point(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        if self.out_of_bounds {
            return None;
        }
        let x = x.checked_add(self.x_datum)?;
        let y = y.checked_add(self.y_datum)?;
        if x < self.left || x >= self.right || y < self.top || y >= self.bottom {
            return None;
        }
        Some((x, y))
    }

    /// Clip a corner-form window (inclusive corners, `x0 <= x1`, `y0 <= y1`)
    pub fn clip_window(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<Window> {
        if self.out_of_bounds {
            return None;
        }
        let (x0, x1) = clip_span(x0, i64::from(x1), self.x_datum, self.left, self.right)?;
        let (y0, y1) = clip_span(y0, i64::from(y1), self.y_datum, self.top, self.bottom)?;
        Some(Window { x0, y0, x1, y1 })
    }

    /// Clip a size-form window
    pub fn clip_addr_window(&self, x: i32, y: i32, w: i32, h: i32) -> Option<ClipRect> {
        if self.out_of_bounds {
            return None;
        }
        if w < 1 || h < 1 {
            return None;
        }
        let last_x = i64::from(x) + i64::from(w) - 1;
        let last_y = i64::from(y) + i64::from(h) - 1;
        let (x0, x1) = clip_span(x, last_x, self.x_datum, self.left, self.right)?;
        let (y0, y1) = clip_span(y, last_y, self.y_datum, self.top, self.bottom)?;
        Some(ClipRect {
            x: x0,
            y: y0,
            w: x1 - x0 + 1,
            h: y1 - y0 + 1,
            dx: skipped(x, self.x_datum, x0)?,
            dy: skipped(y, self.y_datum, y0)?,
        })
    }
}

/// Clip the inclusive span `first..=last`, moved by `datum`, to `lo..hi`
///
/// Works in `i64` so that any `i32` geometry is clipped rather than
/// overflowing.
fn clip_span(first: i32, last: i64, datum: i32, lo: i32, hi: i32) -> Option<(i32, i32)> {
    let first = (i64::from(first) + i64::from(datum)).max(i64::from(lo));
    let last = (last + i64::from(datum)).min(i64::from(hi) - 1);
    if first > last {
        return None;
    }
    Some((i32::try_from(first).ok()?, i32::try_from(last).ok()?))
}

/// Pixels cut from the front of a span that started at `start + datum`
fn skipped(start: i32, datum: i32, clipped: i32) -> Option<i32> {
    i32::try_from(i64::from(clipped) - i64::from(start) - i64::from(datum)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_covers_surface() {
        let vp = Viewport::new(240, 320);
        assert!(vp.is_full());
        assert_eq!((vp.x(), vp.y(), vp.width(), vp.height()), (0, 0, 240, 320));
        assert_eq!(vp.origin(), (0, 0));
    }

    #[test]
    fn test_set_clamps_to_surface() {
        let mut vp = Viewport::new(100, 100);
        vp.set(-10, 90, 50, 50, false);
        assert_eq!((vp.x(), vp.y(), vp.width(), vp.height()), (0, 90, 40, 10));
        assert_eq!(vp.origin(), (0, 0));
        assert!(!vp.is_full());
    }

    #[test]
    fn test_set_off_surface_is_out_of_bounds() {
        let mut vp = Viewport::new(100, 100);
        vp.set(200, 0, 10, 10, true);
        assert!(vp.is_out_of_bounds());
        assert_eq!(vp.clip_point(0, 0), None);
        assert_eq!(vp.clip_addr_window(0, 0, 100, 100), None);
        vp.reset();
        assert!(!vp.is_out_of_bounds());
        assert_eq!(vp.clip_point(0, 0), Some((0, 0)));
    }

    #[test]
    fn test_clip_window_disjoint_returns_none() {
        let mut vp = Viewport::new(100, 100);
        vp.set(10, 10, 20, 20, false);
        assert_eq!(vp.clip_window(0, 0, 9, 9), None);
        assert_eq!(vp.clip_window(30, 30, 40, 40), None);
        assert_eq!(vp.clip_window(0, 15, 5, 20), None);
        assert_eq!(vp.clip_addr_window(0, 0, 10, 10), None);
        assert_eq!(vp.clip_addr_window(30, 10, 5, 5), None);
    }

    #[test]
    fn test_clip_window_inside_is_identity() {
        let mut vp = Viewport::new(100, 100);
        vp.set(10, 10, 50, 50, false);
        assert_eq!(
            vp.clip_window(12, 13, 40, 41),
            Some(Window {
                x0: 12,
                y0: 13,
                x1: 40,
                y1: 41
            })
        );
        assert_eq!(
            vp.clip_addr_window(12, 13, 20, 30),
            Some(ClipRect {
                x: 12,
                y: 13,
                w: 20,
                h: 30,
                dx: 0,
                dy: 0
            })
        );
    }

    #[test]
    fn test_clip_addr_window_partial_overlap() {
        let mut vp = Viewport::new(100, 100);
        vp.set(10, 10, 20, 20, false);
        let rect = vp.clip_addr_window(5, 25, 10, 10).unwrap();
        assert_eq!(
            rect,
            ClipRect {
                x: 10,
                y: 25,
                w: 5,
                h: 5,
                dx: 5,
                dy: 0
            }
        );
    }

    #[test]
    fn test_clip_window_partial_overlap() {
        let vp = Viewport::new(50, 50);
        let window = vp.clip_window(-5, -5, 60, 10).unwrap();
        assert_eq!(window.x0, 0);
        assert_eq!(window.y0, 0);
        assert_eq!(window.x1, 49);
        assert_eq!(window.y1, 10);
        assert_eq!(window.width(), 50);
        assert_eq!(window.height(), 11);
    }

    #[test]
    fn test_relative_datum_offsets_coordinates() {
        let mut vp = Viewport::new(100, 100);
        vp.set(20, 30, 10, 10, true);
        assert_eq!(vp.clip_point(0, 0), Some((20, 30)));
        assert_eq!(vp.clip_point(9, 9), Some((29, 39)));
        assert_eq!(vp.clip_point(10, 0), None);
        assert_eq!(vp.datum_width(), 10);
        assert_eq!(vp.drawable(), Some((0, 0, 10, 10)));
    }

    #[test]
    fn test_check() {
        let mut vp = Viewport::new(100, 100);
        vp.set(10, 10, 10, 10, false);
        assert!(vp.check(0, 0, 11, 11));
        assert!(!vp.check(0, 0, 10, 10));
        assert!(vp.check(19, 19, 5, 5));
        assert!(!vp.check(20, 19, 5, 5));
    }

    #[test]
    fn test_resize_resets() {
        let mut vp = Viewport::new(100, 50);
        vp.set(10, 10, 10, 10, true);
        vp.resize(50, 100);
        assert!(vp.is_full());
        assert_eq!((vp.width(), vp.height()), (50, 100));
    }

    #[test]
    fn test_set_origin_moves_datum() {
        let mut vp = Viewport::new(100, 100);
        vp.set_origin(50, 50);
        assert_eq!(vp.clip_point(-50, -50), Some((0, 0)));
        assert_eq!(vp.clip_point(50, 0), None);
    }

    #[test]
    fn test_extreme_geometry_clips_without_overflow() {
        let mut vp = Viewport::new(100, 100);
        let rect = vp.clip_addr_window(1, 0, i32::MAX, 1).unwrap();
        assert_eq!((rect.x, rect.w, rect.dx), (1, 99, 0));
        let rect = vp.clip_addr_window(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(rect, None);
        assert_eq!(vp.clip_addr_window(i32::MAX, 0, i32::MAX, 1), None);
        assert_eq!(
            vp.clip_window(i32::MIN, 5, i32::MAX, 5),
            Some(Window {
                x0: 0,
                y0: 5,
                x1: 99,
                y1: 5
            })
        );
        assert!(vp.check(-10, -10, i32::MAX, i32::MAX));

        vp.set(10, 10, 50, 50, true);
        vp.set_origin(i32::MAX, i32::MIN);
        assert_eq!(vp.clip_point(i32::MAX, 0), None);
        assert_eq!(vp.clip_addr_window(i32::MIN, i32::MAX, 5, 5), None);
        assert!(vp.drawable().is_some());
    }
}
