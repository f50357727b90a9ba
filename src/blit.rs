//! Rotated canvas pushes
//!
//! A canvas is rotated about its own pivot and drawn so that the pivot lands
//! on the destination's pivot. Destination pixels are mapped back into the
//! source with fixed-point sine and cosine (10 fractional bits) and sampled
//! nearest-neighbour; anything that maps outside the source is left alone.

use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::Rotation;
use crate::pixmap::PixelBuffer;
use crate::surface::{PixelSurface, with_native_order};

/// Fractional bits of the rotation coefficients
pub const FP_SCALE: u32 = 10;

const FP_HALF: i32 = 1 << (FP_SCALE - 1);

/// Pixels pushed per destination run
const RUN_CHUNK: usize = 64;

/// Fixed-point coefficients of one rotation angle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotationState {
    angle: i16,
    sin_fp: i32,
    cos_fp: i32,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            angle: 0,
            sin_fp: 0,
            cos_fp: 1 << FP_SCALE,
        }
    }
}

impl RotationState {
    /// Coefficients for a clockwise rotation in degrees
    pub fn new(angle: i16) -> Self {
        let angle = angle.rem_euclid(360);
        let radians = f32::from(angle).to_radians();
        let scale = (1 << FP_SCALE) as f32;
        Self {
            angle,
            sin_fp: libm::roundf(libm::sinf(radians) * scale) as i32,
            cos_fp: libm::roundf(libm::cosf(radians) * scale) as i32,
        }
    }

    /// Angle in degrees, normalised to 0..360
    pub fn angle(&self) -> i16 {
        self.angle
    }

    /// Sine scaled by `1 << FP_SCALE`
    pub fn sin_fp(&self) -> i32 {
        self.sin_fp
    }

    /// Cosine scaled by `1 << FP_SCALE`
    pub fn cos_fp(&self) -> i32 {
        self.cos_fp
    }
}

/// Inclusive bounding box
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    /// Left column
    pub min_x: i32,
    /// Top row
    pub min_y: i32,
    /// Right column
    pub max_x: i32,
    /// Bottom row
    pub max_y: i32,
}

impl Bounds {
    fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }
}

/// Box covering the pixels `[0, w-1] x [0, h-1]` rotated by `angle` about
/// `(px, py)`
///
/// The result is relative to the pivot. Rotated corners are rounded to the
/// nearest pixel, so an unrotated rectangle comes back unchanged.
pub fn rotated_bounds(angle: i16, w: i32, h: i32, px: i32, py: i32) -> Bounds {
    let state = RotationState::new(angle);
    let (sin, cos) = (state.sin_fp, state.cos_fp);
    let (x0, y0) = (-px, -py);
    let (x1, y1) = (w - 1 - px, h - 1 - py);
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];

    let mut bounds = Bounds {
        min_x: i32::MAX,
        min_y: i32::MAX,
        max_x: i32::MIN,
        max_y: i32::MIN,
    };
    for (x, y) in corners {
        let rx = (x * cos - y * sin + FP_HALF) >> FP_SCALE;
        let ry = (x * sin + y * cos + FP_HALF) >> FP_SCALE;
        bounds.min_x = bounds.min_x.min(rx);
        bounds.min_y = bounds.min_y.min(ry);
        bounds.max_x = bounds.max_x.max(rx);
        bounds.max_y = bounds.max_y.max(ry);
    }
    bounds
}

impl Canvas {
    /// Coefficients used by the last rotated push
    pub fn rotation_state(&self) -> RotationState {
        self.rotation_state
    }

    /// Area of `dst` a rotated push would scan, clipped to its viewport
    ///
    /// The rotated box is widened by one pixel on each side, since a pixel
    /// centre that rounds onto a corner can sample its neighbour. Returns
    /// `None` when the rotated canvas misses the destination.
    pub fn rotated_bounds_on<S>(&self, dst: &S, angle: i16) -> Option<Bounds>
    where
        S: PixelSurface + ?Sized,
    {
        let (w, h) = self.logical_size();
        let (px, py) = self.pivot();
        let (dx, dy) = dst.pivot();
        let bounds = rotated_bounds(angle, w, h, px, py).offset(dx - 1, dy - 1);
        let bounds = Bounds {
            max_x: bounds.max_x + 2,
            max_y: bounds.max_y + 2,
            ..bounds
        };

        let (x0, y0, x1, y1) = dst.viewport().drawable()?;
        let clipped = Bounds {
            min_x: bounds.min_x.max(x0),
            min_y: bounds.min_y.max(y0),
            max_x: bounds.max_x.min(x1 - 1),
            max_y: bounds.max_y.min(y1 - 1),
        };
        if clipped.min_x > clipped.max_x || clipped.min_y > clipped.max_y {
            return None;
        }
        Some(clipped)
    }

    /// Draw the canvas onto `dst` rotated clockwise by `angle` degrees
    ///
    /// The canvas pivot is placed on the destination pivot. Pixels whose
    /// stored value matches `transparent` are skipped. Returns false when the
    /// canvas has no buffer or nothing lands on the destination.
    pub fn push_rotated<S>(&mut self, dst: &mut S, angle: i16, transparent: Option<Color>) -> Result<bool, S::Error>
    where
        S: PixelSurface + ?Sized,
    {
        if !self.created() {
            return Ok(false);
        }
        self.rotation_state = RotationState::new(angle);
        let Some(bounds) = self.rotated_bounds_on(dst, angle) else {
            return Ok(false);
        };

        let this = &*self;
        let RotationState { sin_fp: sin, cos_fp: cos, .. } = this.rotation_state;
        let (w, h) = this.logical_size();
        let (px, py) = this.pivot();
        let (dpx, dpy) = dst.pivot();
        let (xe, ye) = (w << FP_SCALE, h << FP_SCALE);
        let key = transparent.map(|color| this.encode(color));
        // Unrotated 16 bpp storage is sampled straight from the frame
        let words = match this.rotation() {
            Rotation::Rotate0 => this.frame().and_then(PixelBuffer::as_words),
            _ => None,
        };
        let sample = |sx: i32, sy: i32| match words {
            Some(words) => words.get((sy * w + sx) as usize).copied().unwrap_or(0),
            None => this.get_raw(sx, sy),
        };

        with_native_order(dst, |dst: &mut S| -> Result<bool, S::Error> {
            let mut line = [0u16; RUN_CHUNK];
            for y in bounds.min_y..=bounds.max_y {
                let xt = bounds.min_x - dpx;
                let yt = y - dpy;
                let mut xs = cos * xt + sin * yt + (px << FP_SCALE) + FP_HALF;
                let mut ys = -sin * xt + cos * yt + (py << FP_SCALE) + FP_HALF;

                let mut run = 0usize;
                let mut run_x = bounds.min_x;
                for x in bounds.min_x..=bounds.max_x {
                    let inside = xs >= 0 && ys >= 0 && xs < xe && ys < ye;
                    let raw = inside
                        .then(|| sample(xs >> FP_SCALE, ys >> FP_SCALE))
                        .filter(|raw| Some(*raw) != key);
                    xs += cos;
                    ys -= sin;

                    match raw {
                        Some(raw) => {
                            if run == 0 {
                                run_x = x;
                            }
                            line[run] = this.decode(raw).0;
                            run += 1;
                            if run == RUN_CHUNK {
                                dst.push_image(run_x, y, run as i32, 1, &line, None)?;
                                run = 0;
                            }
                        }
                        None if run > 0 => {
                            dst.push_image(run_x, y, run as i32, 1, &line[..run], None)?;
                            run = 0;
                        }
                        None => {}
                    }
                }
                if run > 0 {
                    dst.push_image(run_x, y, run as i32, 1, &line[..run], None)?;
                }
            }
            Ok(true)
        })
    }
}
