//! Analysis windows and their self-autocorrelation
//!
//! Windowing a frame before autocorrelation biases the result towards
//! smaller values at larger lags. Dividing the frame's normalized
//! autocorrelation by the window's own normalized autocorrelation removes
//! that bias (Boersma 1993, eq. 9). [`WindowTable`] holds both, computed once
//! per analysis run.

use std::f64::consts::PI;

use crate::utils::FftTable;
use crate::{PitchError, Result};

/// Window shapes used by the autocorrelation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowShape {
    /// Raised cosine, zero just outside both ends
    #[default]
    Hanning,
    /// Gaussian, shifted and scaled so it reaches zero at both ends
    Gaussian,
}

impl WindowShape {
    /// Generate a window of `size` samples
    ///
    /// Sample `i` (0-based) is evaluated at 1-based position `i + 1` of a
    /// window whose zeros lie at positions 0 and `size + 1`.
    pub fn generate(self, size: usize) -> Vec<f64> {
        let denom = (size + 1) as f64;
        match self {
            WindowShape::Hanning => (1..=size)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
                .collect(),
            WindowShape::Gaussian => {
                let imid = 0.5 * denom;
                let edge = (-12.0_f64).exp();
                (1..=size)
                    .map(|i| {
                        let diff = i as f64 - imid;
                        ((-48.0 * diff * diff / (denom * denom)).exp() - edge) / (1.0 - edge)
                    })
                    .collect()
            }
        }
    }
}

/// A window and its normalized autocorrelation
#[derive(Debug, Clone)]
pub struct WindowTable {
    window: Vec<f64>,
    /// Normalized autocorrelation, lag 0 (= 1.0) to `window.len() - 1`
    autocorrelation: Vec<f64>,
}

impl WindowTable {
    /// Compute the window and its autocorrelation with the run's FFT table
    ///
    /// The FFT length must be at least the window length; the caller picks
    /// it large enough that circular wrap-around does not reach the lags
    /// that are later divided out.
    pub fn new(shape: WindowShape, size: usize, fft: &FftTable) -> Result<Self> {
        if size < 2 {
            return Err(PitchError::InvalidParameter(format!(
                "window must have at least 2 samples, got {}",
                size
            )));
        }
        let window = shape.generate(size);
        let raw = fft.autocorrelation(&window)?;
        let r0 = raw[0];
        if !(r0 > 0.0) {
            return Err(PitchError::InvariantViolated(
                "window has no energy".to_string(),
            ));
        }
        let mut autocorrelation: Vec<f64> = raw[..size].iter().map(|&r| r / r0).collect();
        autocorrelation[0] = 1.0;

        Ok(Self {
            window,
            autocorrelation,
        })
    }

    /// Number of window samples
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Normalized window autocorrelation at `lag` (0 outside the window)
    #[inline]
    pub fn autocorrelation_at(&self, lag: usize) -> f64 {
        self.autocorrelation.get(lag).copied().unwrap_or(0.0)
    }
}
