//! Exact (aliased) primitives
//!
//! [`Shapes`] is implemented for every [`PixelSurface`], so lines, circles,
//! rounded rectangles, ellipses, triangles and gradients work the same on the
//! display and on canvases. Everything is clipped by the surface viewport;
//! shapes that fall partly or wholly outside it are drawn partly or not at
//! all.

use crate::color::{Color, alpha_blend};
use crate::surface::PixelSurface;

/// Quarter selector for [`Shapes::draw_circle_helper`]: top left
pub const CORNER_TOP_LEFT: u8 = 0x1;
/// Quarter selector: top right
pub const CORNER_TOP_RIGHT: u8 = 0x2;
/// Quarter selector: bottom right
pub const CORNER_BOTTOM_RIGHT: u8 = 0x4;
/// Quarter selector: bottom left
pub const CORNER_BOTTOM_LEFT: u8 = 0x8;

/// Half selector for [`Shapes::fill_circle_helper`]: right half
pub const HALF_RIGHT: u8 = 0x1;
/// Half selector: left half
pub const HALF_LEFT: u8 = 0x2;

/// Integer midpoint circle stepper shared by the outline and fill helpers
struct CircleSteps {
    f: i32,
    ddf_x: i32,
    ddf_y: i32,
    x: i32,
    y: i32,
}

impl CircleSteps {
    fn new(r: i32) -> Self {
        Self {
            f: 1 - r,
            ddf_x: 1,
            ddf_y: -2 * r,
            x: 0,
            y: r,
        }
    }
}

impl Iterator for CircleSteps {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        if self.x >= self.y {
            return None;
        }
        if self.f >= 0 {
            self.y -= 1;
            self.ddf_y += 2;
            self.f += self.ddf_y;
        }
        self.x += 1;
        self.ddf_x += 2;
        self.f += self.ddf_x;
        Some((self.x, self.y))
    }
}

/// Drawing primitives available on every surface
pub trait Shapes: PixelSurface {
    /// Fill the viewport
    fn fill_screen(&mut self, color: Color) -> Result<(), Self::Error> {
        let (w, h) = (self.width(), self.height());
        self.fill_rect(0, 0, w, h, color)
    }

    /// Line between two inclusive end points
    ///
    /// Only the part inside the viewport is stepped, so end points far off
    /// the surface cost nothing.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) -> Result<(), Self::Error> {
        let Some((vx0, vy0, vx1, vy1)) = self.viewport().drawable() else {
            return Ok(());
        };
        if y0 == y1 {
            let left = x0.min(x1).max(vx0);
            let right = x0.max(x1).min(vx1 - 1);
            if left > right {
                return Ok(());
            }
            return self.draw_fast_hline(left, y0, right - left + 1, color);
        }
        if x0 == x1 {
            let top = y0.min(y1).max(vy0);
            let bottom = y0.max(y1).min(vy1 - 1);
            if top > bottom {
                return Ok(());
            }
            return self.draw_fast_vline(x0, top, bottom - top + 1, color);
        }

        let (x0, y0, x1, y1) = (i64::from(x0), i64::from(y0), i64::from(x1), i64::from(y1));
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        let (mut x0, mut y0, mut x1, mut y1) = if steep {
            (y0, x0, y1, x1)
        } else {
            (x0, y0, x1, y1)
        };
        if x0 > x1 {
            core::mem::swap(&mut x0, &mut x1);
            core::mem::swap(&mut y0, &mut y1);
        }
        let (lo, hi) = if steep { (vy0, vy1 - 1) } else { (vx0, vx1 - 1) };
        let first = x0.max(i64::from(lo));
        let last = x1.min(i64::from(hi));
        if first > last {
            return Ok(());
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let step = if y0 < y1 { 1 } else { -1 };
        // Jump the error term straight to the first visible column
        let skipped = i128::from(first - x0) * i128::from(dy);
        let half = i128::from(dx / 2);
        let minor_steps = -(half - skipped).div_euclid(i128::from(dx));
        let (Ok(mut err), Ok(steps)) = (
            i64::try_from(half - skipped + minor_steps * i128::from(dx)),
            i64::try_from(minor_steps),
        ) else {
            return Ok(());
        };
        let mut y = y0 + step * steps;
        for x in first..=last {
            if let (Ok(major), Ok(minor)) = (i32::try_from(x), i32::try_from(y)) {
                if steep {
                    self.draw_pixel(minor, major, color)?;
                } else {
                    self.draw_pixel(major, minor, color)?;
                }
            }
            err -= dy;
            if err < 0 {
                y += step;
                err += dx;
            }
        }
        Ok(())
    }

    /// One pixel wide rectangle outline
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<(), Self::Error> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let (right, bottom) = (x.saturating_add(w - 1), y.saturating_add(h - 1));
        self.draw_fast_hline(x, y, w, color)?;
        self.draw_fast_hline(x, bottom, w, color)?;
        self.draw_fast_vline(x, y.saturating_add(1), h - 2, color)?;
        self.draw_fast_vline(right, y.saturating_add(1), h - 2, color)
    }

    /// Circle outline centred on `(x0, y0)`
    fn draw_circle(&mut self, x0: i32, y0: i32, r: i32, color: Color) -> Result<(), Self::Error> {
        if r < 0 {
            return Ok(());
        }
        self.draw_pixel(x0, y0 + r, color)?;
        self.draw_pixel(x0, y0 - r, color)?;
        self.draw_pixel(x0 + r, y0, color)?;
        self.draw_pixel(x0 - r, y0, color)?;
        for (x, y) in CircleSteps::new(r) {
            self.draw_pixel(x0 + x, y0 + y, color)?;
            self.draw_pixel(x0 - x, y0 + y, color)?;
            self.draw_pixel(x0 + x, y0 - y, color)?;
            self.draw_pixel(x0 - x, y0 - y, color)?;
            self.draw_pixel(x0 + y, y0 + x, color)?;
            self.draw_pixel(x0 - y, y0 + x, color)?;
            self.draw_pixel(x0 + y, y0 - x, color)?;
            self.draw_pixel(x0 - y, y0 - x, color)?;
        }
        Ok(())
    }

    /// Quarter circle outlines selected by `corners` (`CORNER_*` bits)
    fn draw_circle_helper(&mut self, x0: i32, y0: i32, r: i32, corners: u8, color: Color) -> Result<(), Self::Error> {
        for (x, y) in CircleSteps::new(r) {
            if corners & CORNER_BOTTOM_RIGHT != 0 {
                self.draw_pixel(x0 + x, y0 + y, color)?;
                self.draw_pixel(x0 + y, y0 + x, color)?;
            }
            if corners & CORNER_TOP_RIGHT != 0 {
                self.draw_pixel(x0 + x, y0 - y, color)?;
                self.draw_pixel(x0 + y, y0 - x, color)?;
            }
            if corners & CORNER_BOTTOM_LEFT != 0 {
                self.draw_pixel(x0 - y, y0 + x, color)?;
                self.draw_pixel(x0 - x, y0 + y, color)?;
            }
            if corners & CORNER_TOP_LEFT != 0 {
                self.draw_pixel(x0 - y, y0 - x, color)?;
                self.draw_pixel(x0 - x, y0 - y, color)?;
            }
        }
        Ok(())
    }

    /// Filled circle
    fn fill_circle(&mut self, x0: i32, y0: i32, r: i32, color: Color) -> Result<(), Self::Error> {
        if r < 0 {
            return Ok(());
        }
        self.draw_fast_vline(x0, y0 - r, 2 * r + 1, color)?;
        self.fill_circle_helper(x0, y0, r, HALF_RIGHT | HALF_LEFT, 0, color)
    }

    /// Filled circle halves (`HALF_*` bits), stretched vertically by `delta`
    fn fill_circle_helper(
        &mut self,
        x0: i32,
        y0: i32,
        r: i32,
        halves: u8,
        delta: i32,
        color: Color,
    ) -> Result<(), Self::Error> {
        let delta = delta + 1;
        let (mut px, mut py) = (0, r);
        for (x, y) in CircleSteps::new(r) {
            if x < y + 1 {
                if halves & HALF_RIGHT != 0 {
                    self.draw_fast_vline(x0 + x, y0 - y, 2 * y + delta, color)?;
                }
                if halves & HALF_LEFT != 0 {
                    self.draw_fast_vline(x0 - x, y0 - y, 2 * y + delta, color)?;
                }
            }
            if y != py {
                if halves & HALF_RIGHT != 0 {
                    self.draw_fast_vline(x0 + py, y0 - px, 2 * px + delta, color)?;
                }
                if halves & HALF_LEFT != 0 {
                    self.draw_fast_vline(x0 - py, y0 - px, 2 * px + delta, color)?;
                }
                py = y;
            }
            px = x;
        }
        Ok(())
    }

    /// Rounded rectangle outline; `r` is capped at half the shorter side
    fn draw_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, color: Color) -> Result<(), Self::Error> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let r = r.clamp(0, w.min(h) / 2);
        let (right, bottom) = (x.saturating_add(w - 1), y.saturating_add(h - 1));
        let (left_c, top_c) = (x.saturating_add(r), y.saturating_add(r));
        self.draw_fast_hline(left_c, y, w - 2 * r, color)?;
        self.draw_fast_hline(left_c, bottom, w - 2 * r, color)?;
        self.draw_fast_vline(x, top_c, h - 2 * r, color)?;
        self.draw_fast_vline(right, top_c, h - 2 * r, color)?;
        self.draw_circle_helper(left_c, top_c, r, CORNER_TOP_LEFT, color)?;
        self.draw_circle_helper(right - r, top_c, r, CORNER_TOP_RIGHT, color)?;
        self.draw_circle_helper(right - r, bottom - r, r, CORNER_BOTTOM_RIGHT, color)?;
        self.draw_circle_helper(left_c, bottom - r, r, CORNER_BOTTOM_LEFT, color)
    }

    /// Filled rounded rectangle; `r` is capped at half the shorter side
    fn fill_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, color: Color) -> Result<(), Self::Error> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let r = r.clamp(0, w.min(h) / 2);
        let (left_c, top_c) = (x.saturating_add(r), y.saturating_add(r));
        let right_c = x.saturating_add(w - 1) - r;
        self.fill_rect(left_c, y, w - 2 * r, h, color)?;
        self.fill_circle_helper(right_c, top_c, r, HALF_RIGHT, h - 2 * r - 1, color)?;
        self.fill_circle_helper(left_c, top_c, r, HALF_LEFT, h - 2 * r - 1, color)
    }

    /// Ellipse outline; radii below 2 draw nothing
    fn draw_ellipse(&mut self, x0: i32, y0: i32, rx: i32, ry: i32, color: Color) -> Result<(), Self::Error> {
        if rx < 2 || ry < 2 {
            return Ok(());
        }
        let (rx2, ry2) = (rx * rx, ry * ry);
        let (fx2, fy2) = (4 * rx2, 4 * ry2);

        let (mut x, mut y) = (0, ry);
        let mut s = 2 * ry2 + rx2 * (1 - 2 * ry);
        while ry2 * x <= rx2 * y {
            self.draw_pixel(x0 + x, y0 + y, color)?;
            self.draw_pixel(x0 - x, y0 + y, color)?;
            self.draw_pixel(x0 - x, y0 - y, color)?;
            self.draw_pixel(x0 + x, y0 - y, color)?;
            if s >= 0 {
                s += fx2 * (1 - y);
                y -= 1;
            }
            s += ry2 * (4 * x + 6);
            x += 1;
        }

        let (mut x, mut y) = (rx, 0);
        let mut s = 2 * rx2 + ry2 * (1 - 2 * rx);
        while rx2 * y <= ry2 * x {
            self.draw_pixel(x0 + x, y0 + y, color)?;
            self.draw_pixel(x0 - x, y0 + y, color)?;
            self.draw_pixel(x0 - x, y0 - y, color)?;
            self.draw_pixel(x0 + x, y0 - y, color)?;
            if s >= 0 {
                s += fy2 * (1 - x);
                x -= 1;
            }
            s += rx2 * (4 * y + 6);
            y += 1;
        }
        Ok(())
    }

    /// Filled ellipse; radii below 2 draw nothing
    fn fill_ellipse(&mut self, x0: i32, y0: i32, rx: i32, ry: i32, color: Color) -> Result<(), Self::Error> {
        if rx < 2 || ry < 2 {
            return Ok(());
        }
        let (rx2, ry2) = (rx * rx, ry * ry);
        let (fx2, fy2) = (4 * rx2, 4 * ry2);

        let (mut x, mut y) = (0, ry);
        let mut s = 2 * ry2 + rx2 * (1 - 2 * ry);
        while ry2 * x <= rx2 * y {
            self.draw_fast_hline(x0 - x, y0 - y, 2 * x + 1, color)?;
            self.draw_fast_hline(x0 - x, y0 + y, 2 * x + 1, color)?;
            if s >= 0 {
                s += fx2 * (1 - y);
                y -= 1;
            }
            s += ry2 * (4 * x + 6);
            x += 1;
        }

        let (mut x, mut y) = (rx, 0);
        let mut s = 2 * rx2 + ry2 * (1 - 2 * rx);
        while rx2 * y <= ry2 * x {
            self.draw_fast_hline(x0 - x, y0 - y, 2 * x + 1, color)?;
            self.draw_fast_hline(x0 - x, y0 + y, 2 * x + 1, color)?;
            if s >= 0 {
                s += fy2 * (1 - x);
                x -= 1;
            }
            s += rx2 * (4 * y + 6);
            y += 1;
        }
        Ok(())
    }

    /// Triangle outline
    fn draw_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    ) -> Result<(), Self::Error> {
        self.draw_line(x0, y0, x1, y1, color)?;
        self.draw_line(x1, y1, x2, y2, color)?;
        self.draw_line(x2, y2, x0, y0, color)
    }

    /// Filled triangle, scanned top to bottom
    fn fill_triangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    ) -> Result<(), Self::Error> {
        let mut points = [(x0, y0), (x1, y1), (x2, y2)];
        points.sort_by_key(|&(_, y)| y);
        let [(x0, y0), (x1, y1), (x2, y2)] = points;

        if y0 == y2 {
            let left = x0.min(x1).min(x2);
            let right = x0.max(x1).max(x2);
            return self.draw_fast_hline(left, y0, right - left + 1, color);
        }

        let (dx01, dy01) = (x1 - x0, y1 - y0);
        let (dx02, dy02) = (x2 - x0, y2 - y0);
        let (dx12, dy12) = (x2 - x1, y2 - y1);

        // Upper part stops one row short of y1 unless the bottom edge is flat
        let last = if y1 == y2 { y1 } else { y1 - 1 };
        let (mut sa, mut sb) = (0, 0);
        let mut y = y0;
        while y <= last {
            let a = x0 + sa / dy01;
            let b = x0 + sb / dy02;
            sa += dx01;
            sb += dx02;
            let (a, b) = if a > b { (b, a) } else { (a, b) };
            self.draw_fast_hline(a, y, b - a + 1, color)?;
            y += 1;
        }

        let mut sa = dx12 * (y - y1);
        let mut sb = dx02 * (y - y0);
        while y <= y2 {
            let a = x1 + sa / dy12;
            let b = x0 + sb / dy02;
            sa += dx12;
            sb += dx02;
            let (a, b) = if a > b { (b, a) } else { (a, b) };
            self.draw_fast_hline(a, y, b - a + 1, color)?;
            y += 1;
        }
        Ok(())
    }

    /// Rectangle shaded from `left` to `right`
    fn fill_rect_h_gradient(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        left: Color,
        right: Color,
    ) -> Result<(), Self::Error> {
        for i in 0..w {
            let alpha = (255 - 255 * i / w) as u8;
            self.draw_fast_vline(x + i, y, h, alpha_blend(alpha, left, right))?;
        }
        Ok(())
    }

    /// Rectangle shaded from `top` to `bottom`
    fn fill_rect_v_gradient(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        top: Color,
        bottom: Color,
    ) -> Result<(), Self::Error> {
        for i in 0..h {
            let alpha = (255 - 255 * i / h) as u8;
            self.draw_fast_hline(x, y + i, w, alpha_blend(alpha, top, bottom))?;
        }
        Ok(())
    }

    /// 1 bpp bitmap, MSB first, rows padded to whole bytes
    ///
    /// Clear bits are painted with `bg` when given and skipped otherwise.
    fn draw_bitmap(
        &mut self,
        x: i32,
        y: i32,
        bitmap: &[u8],
        w: i32,
        h: i32,
        fg: Color,
        bg: Option<Color>,
    ) -> Result<(), Self::Error> {
        if w < 1 || h < 1 {
            return Ok(());
        }
        let stride = (w as usize).div_ceil(8);
        for row in 0..h {
            for col in 0..w {
                let index = row as usize * stride + col as usize / 8;
                let Some(&byte) = bitmap.get(index) else {
                    return Ok(());
                };
                if byte & (0x80 >> (col & 7)) != 0 {
                    self.draw_pixel(x + col, y + row, fg)?;
                } else if let Some(bg) = bg {
                    self.draw_pixel(x + col, y + row, bg)?;
                }
            }
        }
        Ok(())
    }

    /// Frame the viewport edge
    ///
    /// A positive `w` draws inside the viewport, a negative one draws
    /// outside it.
    fn frame_viewport(&mut self, color: Color, w: i32) -> Result<(), Self::Error> {
        let saved = *self.viewport();
        let (vx, vy, vw, vh) = (saved.x(), saved.y(), saved.width(), saved.height());
        if w > 0 {
            let (ox, oy) = saved.origin();
            let (x, y) = (vx - ox, vy - oy);
            self.fill_rect(x, y, vw, w, color)?;
            self.fill_rect(x, y + vh - w, vw, w, color)?;
            self.fill_rect(x, y + w, w, vh - 2 * w, color)?;
            return self.fill_rect(x + vw - w, y + w, w, vh - 2 * w, color);
        }

        self.viewport_mut().reset();
        let result = fill_outside(self, (vx, vy, vw, vh), -w, color);
        *self.viewport_mut() = saved;
        result
    }
}

/// Band of width `w` around an absolute rectangle
fn fill_outside<S>(surface: &mut S, rect: (i32, i32, i32, i32), w: i32, color: Color) -> Result<(), S::Error>
where
    S: PixelSurface + ?Sized,
{
    let (x, y, rw, rh) = rect;
    surface.fill_rect(x - w, y - w, rw + 2 * w, w, color)?;
    surface.fill_rect(x - w, y + rh, rw + 2 * w, w, color)?;
    surface.fill_rect(x - w, y, w, rh, color)?;
    surface.fill_rect(x + rw, y, w, rh, color)
}

impl<S: PixelSurface + ?Sized> Shapes for S {}
