//! FFT table for power-spectrum autocorrelation
//!
//! Wraps a pair of rustfft plans of one fixed power-of-two length. Plans are
//! shared immutably, so one table serves every analysis frame (and every
//! thread); each call works on its own buffer.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::{PitchError, Result};

/// Forward and inverse transforms of one fixed length
#[derive(Clone)]
pub struct FftTable {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for FftTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftTable").field("len", &self.len).finish()
    }
}

impl FftTable {
    /// Plan transforms of length `len`, which must be a power of two
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 || !len.is_power_of_two() {
            return Err(PitchError::InvalidParameter(format!(
                "FFT length must be a power of two, got {}",
                len
            )));
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        })
    }

    /// Transform length
    pub fn size(&self) -> usize {
        self.len
    }

    /// Circular autocorrelation of `input` zero-padded to the table length
    ///
    /// Forward transform, squared magnitude per bin (DC and Nyquist are
    /// purely real for real input, so they are simply squared), inverse
    /// transform. The result is not scaled by `1 / len`; callers normalize
    /// by the lag-0 value. Inputs longer than the table are an error.
    pub fn autocorrelation(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() > self.len {
            return Err(PitchError::InvariantViolated(format!(
                "frame of {} samples does not fit FFT length {}",
                input.len(),
                self.len
            )));
        }

        let mut buffer: Vec<Complex<f64>> = Vec::new();
        buffer.try_reserve_exact(self.len)?;
        buffer.extend(input.iter().map(|&x| Complex::new(x, 0.0)));
        buffer.resize(self.len, Complex::new(0.0, 0.0));

        self.forward.process(&mut buffer);
        for c in buffer.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);

        Ok(buffer.iter().map(|c| c.re).collect())
    }
}

/// Smallest power of two that is at least `n` (and at least 1)
pub fn next_power_of_two_at_least(n: f64) -> usize {
    let mut size = 1usize;
    while (size as f64) < n {
        size *= 2;
    }
    size
}
