//! Interpolation on uniformly sampled arrays
//!
//! Two families live here:
//!
//! - [`Interpolation`]: how contour queries interpolate between frames,
//!   skipping undefined (unvoiced) frames.
//! - [`interpolate_sinc`] and [`improve_maximum`]: band-limited interpolation
//!   of a correlation function and the refinement of its local maxima to
//!   sub-sample precision (Praat's `NUM_interpolate_sinc` and
//!   `NUMimproveMaximum`, 0-based).

use std::f64::consts::PI;

use crate::utils::minimize_brent;

/// Interpolation methods for contour queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest frame (no interpolation)
    Nearest,
    /// Linear interpolation between adjacent frames
    #[default]
    Linear,
}

impl Interpolation {
    /// Interpolate a value, skipping undefined (NaN) values
    ///
    /// `position` is fractional in frames (0.0 = first frame). Returns None
    /// outside `[0, n-1]` or when no defined neighbour exists.
    pub fn interpolate_with_undefined(self, samples: &[f64], position: f64) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len();
        let max_pos = (n - 1) as f64;

        if position < 0.0 || position > max_pos {
            return None;
        }

        match self {
            Interpolation::Nearest => {
                let idx = (position.round() as usize).min(n - 1);
                let val = samples[idx];
                if val.is_nan() {
                    None
                } else {
                    Some(val)
                }
            }

            Interpolation::Linear => {
                let idx = (position.floor() as usize).min(n - 1);
                let frac = position - idx as f64;

                let v0 = samples[idx];
                let v1 = if idx + 1 < n { samples[idx + 1] } else { v0 };

                match (v0.is_nan(), v1.is_nan()) {
                    (true, true) => None,
                    (true, false) => Some(v1),
                    (false, true) => Some(v0),
                    (false, false) => Some(lerp(v0, v1, frac)),
                }
            }
        }
    }
}

/// Linear interpolation between two values
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Sinc kernels for locating a maximum between samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakInterpolation {
    /// Windowed sinc with 70 samples per side
    Sinc70,
    /// Windowed sinc with 700 samples per side
    Sinc700,
}

impl PeakInterpolation {
    /// Interpolation depth passed to [`interpolate_sinc`]
    pub fn depth(self) -> usize {
        match self {
            PeakInterpolation::Sinc70 => 70,
            PeakInterpolation::Sinc700 => 700,
        }
    }
}

/// Windowed-sinc interpolation of `y` at fractional index `x`
///
/// Outside `[0, n-1]` the nearest end value is returned. `max_depth` is the
/// number of samples used on each side; it shrinks near the array ends.
/// Depth 0 is nearest-neighbour, 1 linear, 2 cubic.
pub fn interpolate_sinc(y: &[f64], x: f64, max_depth: usize) -> f64 {
    let n = y.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return y[0];
    }
    if x >= (n - 1) as f64 {
        return y[n - 1];
    }

    let midleft = x.floor() as usize;
    let midright = midleft + 1;
    if x == midleft as f64 {
        return y[midleft];
    }

    let max_depth = max_depth.min(midright).min(n - 1 - midleft);

    match max_depth {
        0 => return y[(x + 0.5).floor() as usize],
        1 => return lerp(y[midleft], y[midright], x - midleft as f64),
        2 => {
            let yl = y[midleft];
            let yr = y[midright];
            let dyl = 0.5 * (yr - y[midleft - 1]);
            let dyr = 0.5 * (y[midright + 1] - yl);
            let fil = x - midleft as f64;
            let fir = midright as f64 - x;
            return yl * fir + yr * fil
                - fil * fir * (0.5 * (dyr - dyl) + (fil - 0.5) * (dyl + dyr - 2.0 * (yr - yl)));
        }
        _ => {}
    }

    let left = midright - max_depth;
    let right = midleft + max_depth;
    let depth = max_depth as f64 + 0.5;
    let window_phase_step = PI / depth;
    let sin_window_phase_step = window_phase_step.sin();
    let cos_window_phase_step = window_phase_step.cos();

    let mut result = 0.0;

    // Left half: from midleft down to left
    {
        let mut left_phase = PI * (x - midleft as f64);
        let mut half_sin_left_phase = 0.5 * left_phase.sin();
        let window_phase = left_phase / depth;
        let mut sin_window_phase = window_phase.sin();
        let mut cos_window_phase = window_phase.cos();

        for ix in (left..=midleft).rev() {
            let sinc_times_window = half_sin_left_phase / left_phase * (1.0 + cos_window_phase);
            result += y[ix] * sinc_times_window;

            left_phase += PI;
            half_sin_left_phase = -half_sin_left_phase;

            let next_sin =
                cos_window_phase * sin_window_phase_step + sin_window_phase * cos_window_phase_step;
            let next_cos =
                cos_window_phase * cos_window_phase_step - sin_window_phase * sin_window_phase_step;
            sin_window_phase = next_sin;
            cos_window_phase = next_cos;
        }
    }

    // Right half: from midright up to right
    {
        let mut right_phase = PI * (midright as f64 - x);
        let mut half_sin_right_phase = 0.5 * right_phase.sin();
        let window_phase = right_phase / depth;
        let mut sin_window_phase = window_phase.sin();
        let mut cos_window_phase = window_phase.cos();

        for &value in &y[midright..=right] {
            let sinc_times_window = half_sin_right_phase / right_phase * (1.0 + cos_window_phase);
            result += value * sinc_times_window;

            right_phase += PI;
            half_sin_right_phase = -half_sin_right_phase;

            let next_sin =
                cos_window_phase * sin_window_phase_step + sin_window_phase * cos_window_phase_step;
            let next_cos =
                cos_window_phase * cos_window_phase_step - sin_window_phase * sin_window_phase_step;
            sin_window_phase = next_sin;
            cos_window_phase = next_cos;
        }
    }

    result
}

/// Refine the local maximum of `y` near sample `ixmid`
///
/// Returns the fractional index and the interpolated value there. The sinc
/// kernel is maximized with Brent's method on `[ixmid-1, ixmid+1]` to
/// absolute tolerance `tolerance`.
pub fn improve_maximum(
    y: &[f64],
    ixmid: usize,
    kind: PeakInterpolation,
    tolerance: f64,
) -> (f64, f64) {
    let n = y.len();
    if n == 0 {
        return (ixmid as f64, f64::NAN);
    }
    if ixmid == 0 {
        return (0.0, y[0]);
    }
    if ixmid >= n - 1 {
        return ((n - 1) as f64, y[n - 1]);
    }

    let depth = kind.depth();
    let (x, fx) = minimize_brent(
        |x| -interpolate_sinc(y, x, depth),
        ixmid as f64 - 1.0,
        ixmid as f64 + 1.0,
        tolerance,
    );
    (x, -fx)
}
