//! Anti-aliased primitives
//!
//! Edge pixels are blended towards a background colour by their coverage.
//! Every call takes the background as `Option<Color>`: `Some` blends against
//! that colour, `None` reads each edge pixel back from the surface first
//! (slower, and only meaningful where the surface can be read).
//!
//! Arc angles are in degrees, measured clockwise from the 6 o'clock
//! position, so 90 is 9 o'clock and 180 is 12 o'clock.

use libm::{ceilf, cosf, fabsf, floorf, sinf, sqrtf};

use crate::color::{Color, alpha_blend_dither};
use crate::surface::PixelSurface;

/// Wedge pixels below this coverage are skipped
const LO_ALPHA_THRESHOLD: f32 = 1.0 / 32.0;
/// Wedge pixels above this coverage are drawn solid
const HI_ALPHA_THRESHOLD: f32 = 1.0 - LO_ALPHA_THRESHOLD;
const PIXEL_ALPHA_GAIN: f32 = 255.0;

/// Largest U16.16 arc end slope is about `0x8000_0000`
const MIN_DIVISOR: f32 = 1.0 / 32768.0;

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Fractional part of `sqrt(num)` scaled to 0..=255
///
/// Returns 0 for inputs above `0x4000_0000`.
pub fn sqrt_fraction(num: u32) -> u8 {
    if num > 0x4000_0000 {
        return 0;
    }
    let mut num = num;
    let mut bsh: u32 = 0x0000_4000;
    let mut fpr: u32 = 0;
    let mut osh = 0;

    // Scale from U8.8 up to U15.16 as needed
    while num > bsh {
        bsh <<= 2;
        osh += 1;
    }
    while bsh != 0 {
        let bod = bsh.wrapping_add(fpr);
        if num >= bod {
            num -= bod;
            fpr = bsh.wrapping_add(bod);
        }
        num <<= 1;
        bsh >>= 1;
    }
    (fpr >> osh) as u8
}

/// Distance of a point from a tapered segment, offset by the taper
fn wedge_distance(xpax: f32, ypay: f32, bax: f32, bay: f32, dr: f32) -> f32 {
    let h = ((xpax * bax + ypay * bay) / (bax * bax + bay * bay)).clamp(0.0, 1.0);
    let dx = xpax - bax * h;
    let dy = ypay - bay * h;
    sqrtf(dx * dx + dy * dy) + h * dr
}

struct Wedge {
    ax: f32,
    ay: f32,
    bax: f32,
    bay: f32,
    /// Start radius plus half a pixel
    ar: f32,
    /// Radius delta along the segment
    rdt: f32,
    /// Inclusive right edge of the scan box
    x1: i32,
    fg: Color,
    bg: Option<Color>,
}

impl Wedge {
    fn coverage(&self, xp: i32, yp: i32) -> f32 {
        self.ar - wedge_distance(xp as f32 - self.ax, yp as f32 - self.ay, self.bax, self.bay, self.rdt)
    }

    /// Plot one row from `*xs`, moving `*xs` to the first covered pixel
    fn scan_row<S>(&self, surface: &mut S, yp: i32, xs: &mut i32) -> Result<(), S::Error>
    where
        S: PixelSurface + ?Sized,
    {
        let mut started = false;
        for xp in *xs..=self.x1 {
            let alpha = self.coverage(xp, yp);
            if alpha <= LO_ALPHA_THRESHOLD {
                if started {
                    break;
                }
                continue;
            }
            if !started {
                started = true;
                *xs = xp;
            }
            if alpha > HI_ALPHA_THRESHOLD {
                surface.draw_pixel(xp, yp, self.fg)?;
            } else {
                surface.draw_pixel_alpha(xp, yp, self.fg, (alpha * PIXEL_ALPHA_GAIN) as u8, self.bg)?;
            }
        }
        Ok(())
    }
}

/// U16.16 slope of an arc end at `angle` degrees
fn end_slope(angle: u32) -> u32 {
    let radians = angle as f32 * DEG_TO_RAD;
    let abs_cos = fabsf(cosf(radians));
    let abs_sin = fabsf(sinf(radians));
    (abs_cos / (abs_sin + MIN_DIVISOR) * 65536.0) as u32
}

/// Anti-aliased drawing available on every surface
pub trait SmoothShapes: PixelSurface {
    /// Blend `color` over the background at one point
    ///
    /// Returns the colour written. With `bg` of `None` the existing pixel is
    /// read back as the background; points outside the viewport are neither
    /// read nor written and return `color` unchanged.
    fn draw_pixel_alpha(
        &mut self,
        x: i32,
        y: i32,
        color: Color,
        alpha: u8,
        bg: Option<Color>,
    ) -> Result<Color, Self::Error> {
        self.draw_pixel_alpha_dither(x, y, color, alpha, bg, 0)
    }

    /// [`draw_pixel_alpha`](Self::draw_pixel_alpha) with the coverage
    /// perturbed by an ordered dither of up to `dither` steps
    ///
    /// See [`alpha_blend_dither`]; a `dither` of 0 blends exactly.
    fn draw_pixel_alpha_dither(
        &mut self,
        x: i32,
        y: i32,
        color: Color,
        alpha: u8,
        bg: Option<Color>,
        dither: u8,
    ) -> Result<Color, Self::Error> {
        let bg = match bg {
            Some(bg) => bg,
            None => {
                if self.viewport().clip_point(x, y).is_none() {
                    return Ok(color);
                }
                self.read_pixel(x, y)?
            }
        };
        let blended = alpha_blend_dither(alpha, color, bg, dither, x, y);
        self.draw_pixel(x, y, blended)?;
        Ok(blended)
    }

    /// Arc of outer radius `r` and inner radius `ir` from `start` to `end`
    ///
    /// Angles above 360 are clamped; an `end` before `start` sweeps through
    /// 6 o'clock. `ir` of 0 draws a sector. With `smooth` the edges are
    /// anti-aliased against `bg`.
    fn draw_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start: u32,
        end: u32,
        fg: Color,
        bg: Option<Color>,
        smooth: bool,
    ) -> Result<(), Self::Error> {
        let end = end.min(360);
        let mut start = start.min(360);
        if self.viewport().is_out_of_bounds() || start == end {
            return Ok(());
        }
        let (mut r, mut ir) = if r < ir { (ir, r) } else { (r, ir) };
        if r <= 0 || ir < 0 {
            return Ok(());
        }

        if end < start {
            if start < 360 {
                self.draw_arc(x, y, r, ir, start, 360, fg, bg, smooth)?;
            }
            if end == 0 {
                return Ok(());
            }
            start = 0;
        }

        let r2 = r * r;
        if smooth {
            r += 1;
        }
        let r1 = r * r;
        let w = r - ir;
        let r3 = ir * ir;
        if smooth {
            ir -= 1;
        }
        let r4 = ir * ir;

        //     1 | 2
        //    ---+---
        //     0 | 3
        let mut start_slope: [u32; 4] = [0, 0, u32::MAX, 0];
        let mut end_slope_table: [u32; 4] = [0, u32::MAX, 0, 0];

        let slope = end_slope(start);
        if start <= 90 {
            start_slope[0] = slope;
        } else if start <= 180 {
            start_slope[1] = slope;
        } else if start <= 270 {
            start_slope[1] = u32::MAX;
            start_slope[2] = slope;
        } else {
            start_slope[1] = u32::MAX;
            start_slope[2] = 0;
            start_slope[3] = slope;
        }

        let slope = end_slope(end);
        if end <= 90 {
            end_slope_table[0] = slope;
            end_slope_table[1] = 0;
            start_slope[2] = 0;
        } else if end <= 180 {
            end_slope_table[1] = slope;
            start_slope[2] = 0;
        } else if end <= 270 {
            end_slope_table[2] = slope;
        } else {
            end_slope_table[3] = slope;
        }

        let in_quadrant = |q: usize, slope: u32| match q {
            0 | 2 => slope <= start_slope[q] && slope >= end_slope_table[q],
            _ => slope >= start_slope[q] && slope <= end_slope_table[q],
        };

        let mut xs = 0;
        for cy in (1..r).rev() {
            let mut len = [0i32; 4];
            let mut xst = [-1i32; 4];
            let dy2 = (r - cy) * (r - cy);

            while (r - xs) * (r - xs) + dy2 >= r1 {
                xs += 1;
            }

            for cx in xs..r {
                let hyp = (r - cx) * (r - cx) + dy2;
                let slope = (((r - cy) as u32) << 16) / (r - cx) as u32;

                let alpha = if hyp > r2 {
                    !sqrt_fraction(hyp as u32)
                } else if hyp >= r3 {
                    for q in 0..4 {
                        if in_quadrant(q, slope) {
                            xst[q] = cx;
                            len[q] += 1;
                        }
                    }
                    continue;
                } else {
                    if hyp <= r4 {
                        break;
                    }
                    sqrt_fraction(hyp as u32)
                };

                if alpha < 16 {
                    continue;
                }
                if in_quadrant(0, slope) {
                    self.draw_pixel_alpha(x + cx - r, y - cy + r, fg, alpha, bg)?;
                }
                if in_quadrant(1, slope) {
                    self.draw_pixel_alpha(x + cx - r, y + cy - r, fg, alpha, bg)?;
                }
                if in_quadrant(2, slope) {
                    self.draw_pixel_alpha(x - cx + r, y + cy - r, fg, alpha, bg)?;
                }
                if in_quadrant(3, slope) {
                    self.draw_pixel_alpha(x - cx + r, y - cy + r, fg, alpha, bg)?;
                }
            }

            if len[0] > 0 {
                self.draw_fast_hline(x + xst[0] - len[0] + 1 - r, y - cy + r, len[0], fg)?;
            }
            if len[1] > 0 {
                self.draw_fast_hline(x + xst[1] - len[1] + 1 - r, y + cy - r, len[1], fg)?;
            }
            if len[2] > 0 {
                self.draw_fast_hline(x - xst[2] + r, y + cy - r, len[2], fg)?;
            }
            if len[3] > 0 {
                self.draw_fast_hline(x - xst[3] + r, y - cy + r, len[3], fg)?;
            }
        }

        // Pixels on the axes are not covered by the quadrant scan
        if start == 0 || end == 360 {
            self.draw_fast_vline(x, y + r - w, w, fg)?;
        }
        if start <= 90 && end >= 90 {
            self.draw_fast_hline(x - r + 1, y, w, fg)?;
        }
        if start <= 180 && end >= 180 {
            self.draw_fast_vline(x, y - r + 1, w, fg)?;
        }
        if start <= 270 && end >= 270 {
            self.draw_fast_hline(x + r - w, y, w, fg)?;
        }
        Ok(())
    }

    /// Anti-aliased arc with square or round ends
    ///
    /// A full sweep (0 to 360) draws a ring with no end caps.
    fn draw_smooth_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start: u32,
        end: u32,
        fg: Color,
        bg: Option<Color>,
        round_ends: bool,
    ) -> Result<(), Self::Error> {
        if start == end || (start == 0 && end == 360) {
            return self.draw_arc(x, y, r, ir, 0, 360, fg, bg, true);
        }

        let point = |angle: u32, radius: f32| {
            let radians = angle as f32 * DEG_TO_RAD;
            (-sinf(radians) * radius + x as f32, cosf(radians) * radius + y as f32)
        };

        if round_ends {
            let mid = (r + ir) as f32 / 2.0;
            let spot = (r - ir) as f32 / 2.0;
            let (sx, sy) = point(start, mid);
            self.draw_spot(sx, sy, spot, fg, bg)?;
            let (ex, ey) = point(end, mid);
            self.draw_spot(ex, ey, spot, fg, bg)?;
        } else {
            for angle in [start, end] {
                let (ax, ay) = point(angle, ir as f32);
                let (bx, by) = point(angle, r as f32);
                self.draw_wedge_line(ax, ay, bx, by, 0.3, 0.3, fg, bg)?;
            }
        }

        self.draw_arc(x, y, r, ir, start, end, fg, bg, true)
    }

    /// Line from `(ax, ay)` with radius `ar` to `(bx, by)` with radius `br`
    ///
    /// Coverage is the distance from each pixel centre to the tapered
    /// segment. Negative radii draw nothing.
    fn draw_wedge_line(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        ar: f32,
        br: f32,
        fg: Color,
        bg: Option<Color>,
    ) -> Result<(), Self::Error> {
        if ar < 0.0 || br < 0.0 {
            return Ok(());
        }
        let mut bx = bx;
        if fabsf(ax - bx) < 0.01 && fabsf(ay - by) < 0.01 {
            bx += 0.01;
        }

        let x0 = floorf((ax - ar).min(bx - br)) as i32;
        let x1 = ceilf((ax + ar).max(bx + br)) as i32;
        let y0 = floorf((ay - ar).min(by - br)) as i32;
        let y1 = ceilf((ay + ar).max(by + br)) as i32;

        let Some((vx0, vy0, vx1, vy1)) = self.viewport().drawable() else {
            return Ok(());
        };
        let (x0, y0) = (x0.max(vx0), y0.max(vy0));
        let (x1, y1) = (x1.min(vx1 - 1), y1.min(vy1 - 1));
        if x0 > x1 || y0 > y1 {
            return Ok(());
        }

        // Start the scan at the end with the leftmost extent
        let ys = if ax - ar > bx - br { by as i32 } else { ay as i32 };

        let wedge = Wedge {
            ax,
            ay,
            bax: bx - ax,
            bay: by - ay,
            ar: ar + 0.5,
            rdt: ar - br,
            x1,
            fg,
            bg,
        };

        let mut xs = x0;
        for yp in ys.max(y0)..=y1 {
            wedge.scan_row(self, yp, &mut xs)?;
        }
        let mut xs = x0;
        for yp in (y0..ys.min(y1 + 1)).rev() {
            wedge.scan_row(self, yp, &mut xs)?;
        }
        Ok(())
    }

    /// Anti-aliased line of width `wd`
    fn draw_wide_line(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        wd: f32,
        fg: Color,
        bg: Option<Color>,
    ) -> Result<(), Self::Error> {
        self.draw_wedge_line(ax, ay, bx, by, wd / 2.0, wd / 2.0, fg, bg)
    }

    /// Anti-aliased filled circle at a fractional position
    fn draw_spot(&mut self, ax: f32, ay: f32, r: f32, fg: Color, bg: Option<Color>) -> Result<(), Self::Error> {
        self.draw_wedge_line(ax, ay, ax, ay, r, r, fg, bg)
    }

    /// Anti-aliased filled circle
    fn fill_smooth_circle(&mut self, x: i32, y: i32, r: i32, color: Color, bg: Option<Color>) -> Result<(), Self::Error> {
        if r <= 0 {
            return Ok(());
        }
        self.draw_fast_hline(x - r, y, 2 * r + 1, color)?;

        let r1 = r * r;
        let r = r + 1;
        let r2 = r * r;
        let mut xs = 1;
        for cy in (1..r).rev() {
            let dy2 = (r - cy) * (r - cy);
            let mut cx = xs;
            while cx < r {
                let hyp = (r - cx) * (r - cx) + dy2;
                if hyp <= r1 {
                    break;
                }
                if hyp >= r2 {
                    cx += 1;
                    continue;
                }
                let alpha = !sqrt_fraction(hyp as u32);
                if alpha > 246 {
                    break;
                }
                xs = cx;
                if alpha >= 9 {
                    self.draw_pixel_alpha(x + cx - r, y + cy - r, color, alpha, bg)?;
                    self.draw_pixel_alpha(x - cx + r, y + cy - r, color, alpha, bg)?;
                    self.draw_pixel_alpha(x - cx + r, y - cy + r, color, alpha, bg)?;
                    self.draw_pixel_alpha(x + cx - r, y - cy + r, color, alpha, bg)?;
                }
                cx += 1;
            }
            self.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1, color)?;
            self.draw_fast_hline(x + cx - r, y - cy + r, 2 * (r - cx) + 1, color)?;
        }
        Ok(())
    }

    /// Anti-aliased filled rounded rectangle
    ///
    /// `r` is capped at half the width and half the height.
    fn fill_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        r: i32,
        color: Color,
        bg: Option<Color>,
    ) -> Result<(), Self::Error> {
        let r = r.max(0).min(w / 2).min(h / 2);

        let y = y + r;
        let h = h - 2 * r;
        self.fill_rect(x, y, w, h, color)?;

        let h = h - 1;
        let x = x + r;
        let w = w - (2 * r + 1);

        let r1 = r * r;
        let r = r + 1;
        let r2 = r * r;
        let mut xs = 0;
        for cy in (1..r).rev() {
            let dy2 = (r - cy) * (r - cy);
            let mut cx = xs;
            while cx < r {
                let hyp = (r - cx) * (r - cx) + dy2;
                if hyp <= r1 {
                    break;
                }
                if hyp >= r2 {
                    cx += 1;
                    continue;
                }
                let alpha = !sqrt_fraction(hyp as u32);
                if alpha > 246 {
                    break;
                }
                xs = cx;
                if alpha >= 9 {
                    self.draw_pixel_alpha(x + cx - r, y + cy - r, color, alpha, bg)?;
                    self.draw_pixel_alpha(x - cx + r + w, y + cy - r, color, alpha, bg)?;
                    self.draw_pixel_alpha(x - cx + r + w, y - cy + r + h, color, alpha, bg)?;
                    self.draw_pixel_alpha(x + cx - r, y - cy + r + h, color, alpha, bg)?;
                }
                cx += 1;
            }
            self.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1 + w, color)?;
            self.draw_fast_hline(x + cx - r, y - cy + r + h, 2 * (r - cx) + 1 + w, color)?;
        }
        Ok(())
    }

    /// Anti-aliased rounded rectangle outline
    ///
    /// `(x, y)` is the top-left corner, `r` and `ir` the outer and inner
    /// corner radii, and `w` x `h` the size of the straight sections between
    /// the corners (so the overall size is `w + 2r` by `h + 2r`).
    /// `quadrants` selects corners with the `CORNER_*` bits; the straight
    /// sides are drawn only between two selected corners.
    fn draw_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        w: i32,
        h: i32,
        fg: Color,
        bg: Option<Color>,
        quadrants: u8,
    ) -> Result<(), Self::Error> {
        if self.viewport().is_out_of_bounds() {
            return Ok(());
        }
        let (r, ir) = if r < ir { (ir, r) } else { (r, ir) };
        if r <= 0 || ir < 0 {
            return Ok(());
        }

        let w = w.max(0);
        let h = h.max(0);
        let x = x + r;
        let y = y + r;
        let t = r - ir + 1;

        let r2 = r * r;
        let r = r + 1;
        let r1 = r * r;
        let r3 = ir * ir;
        let ir = ir - 1;
        let r4 = ir * ir;

        let mut xs = 0;
        for cy in (1..r).rev() {
            let mut len = 0;
            let mut rxst = 0;
            let dy2 = (r - cy) * (r - cy);

            while (r - xs) * (r - xs) + dy2 >= r1 {
                xs += 1;
            }

            for cx in xs..r {
                let hyp = (r - cx) * (r - cx) + dy2;
                let alpha = if hyp > r2 {
                    !sqrt_fraction(hyp as u32)
                } else if hyp >= r3 {
                    rxst = cx;
                    len += 1;
                    continue;
                } else {
                    if hyp <= r4 {
                        break;
                    }
                    sqrt_fraction(hyp as u32)
                };
                if alpha < 16 {
                    continue;
                }
                if quadrants & 0x8 != 0 {
                    self.draw_pixel_alpha(x + cx - r, y - cy + r + h, fg, alpha, bg)?;
                }
                if quadrants & 0x1 != 0 {
                    self.draw_pixel_alpha(x + cx - r, y + cy - r, fg, alpha, bg)?;
                }
                if quadrants & 0x2 != 0 {
                    self.draw_pixel_alpha(x - cx + r + w, y + cy - r, fg, alpha, bg)?;
                }
                if quadrants & 0x4 != 0 {
                    self.draw_pixel_alpha(x - cx + r + w, y - cy + r + h, fg, alpha, bg)?;
                }
            }

            if len > 0 {
                let lxst = rxst - len + 1;
                if quadrants & 0x8 != 0 {
                    self.draw_fast_hline(x + lxst - r, y - cy + r + h, len, fg)?;
                }
                if quadrants & 0x1 != 0 {
                    self.draw_fast_hline(x + lxst - r, y + cy - r, len, fg)?;
                }
                if quadrants & 0x2 != 0 {
                    self.draw_fast_hline(x - rxst + r + w, y + cy - r, len, fg)?;
                }
                if quadrants & 0x4 != 0 {
                    self.draw_fast_hline(x - rxst + r + w, y - cy + r + h, len, fg)?;
                }
            }
        }

        if quadrants & 0xC == 0xC {
            self.fill_rect(x, y + r - t + h, w + 1, t, fg)?;
        }
        if quadrants & 0x9 == 0x9 {
            self.fill_rect(x - r + 1, y, t, h + 1, fg)?;
        }
        if quadrants & 0x3 == 0x3 {
            self.fill_rect(x, y - r + 1, w + 1, t, fg)?;
        }
        if quadrants & 0x6 == 0x6 {
            self.fill_rect(x + r - t + w, y, t, h + 1, fg)?;
        }
        Ok(())
    }

    /// Anti-aliased one pixel wide circle
    fn draw_smooth_circle(&mut self, x: i32, y: i32, r: i32, fg: Color, bg: Option<Color>) -> Result<(), Self::Error> {
        self.draw_smooth_round_rect(x - r, y - r, r, r - 1, 0, 0, fg, bg, 0xF)
    }
}

impl<S: PixelSurface + ?Sized> SmoothShapes for S {}
