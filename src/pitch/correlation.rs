//! Normalized correlation of one frame
//!
//! Two ways to the same kind of result, a symmetric correlation function
//! with `r[0] = 1`:
//!
//! - **Autocorrelation**: power spectrum of the windowed, zero-padded frame,
//!   transformed back, normalized by lag 0 and divided by the window's own
//!   normalized autocorrelation.
//! - **Forward cross-correlation**: direct dot products between the
//!   unwindowed signal at the frame and shifted copies of it, normalized by
//!   the energies of both spans. The energy of the shifted span is updated
//!   incrementally per lag.

use crate::pitch::frame::ExtractedFrame;
use crate::pitch::params::AnalysisSetup;
use crate::sound::SignalBuffer;
use crate::utils::FftTable;
use crate::window::WindowTable;
use crate::{PitchError, Result};

/// Correlation values for lags `-max_lag..=max_lag`
///
/// Stored as one array whose middle element is lag 0, so that interpolation
/// across lag 0 needs no special casing.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationBuffer {
    values: Vec<f64>,
    center: usize,
}

impl CorrelationBuffer {
    /// All-zero buffer with `r[0] = 1`
    pub fn new(max_lag: usize) -> Result<Self> {
        let len = 2 * max_lag + 1;
        let mut values = Vec::new();
        values.try_reserve_exact(len)?;
        values.resize(len, 0.0);
        values[max_lag] = 1.0;
        Ok(Self {
            values,
            center: max_lag,
        })
    }

    /// Buffer from the values at lags `0..`; lag 0 is forced to 1
    pub fn from_positive_lags(lags: &[f64]) -> Result<Self> {
        let max_lag = lags.len().saturating_sub(1);
        let mut buffer = Self::new(max_lag)?;
        for (lag, &value) in lags.iter().enumerate().skip(1) {
            buffer.set(lag, value);
        }
        Ok(buffer)
    }

    /// Set `r[lag]` and `r[-lag]`
    #[inline]
    pub fn set(&mut self, lag: usize, value: f64) {
        self.values[self.center + lag] = value;
        self.values[self.center - lag] = value;
    }

    /// Value at a (possibly negative) lag, 0 outside the buffer
    #[inline]
    pub fn value_at(&self, lag: isize) -> f64 {
        let index = self.center as isize + lag;
        if index < 0 {
            return 0.0;
        }
        self.values.get(index as usize).copied().unwrap_or(0.0)
    }

    /// Largest lag held
    pub fn max_lag(&self) -> usize {
        self.center
    }

    /// Array index of lag 0
    pub fn center(&self) -> usize {
        self.center
    }

    /// The whole array, lag `-max_lag` first
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

enum Mode {
    Auto { fft: FftTable, window: WindowTable },
    Cross,
}

/// Computes the correlation of extracted frames
pub struct CorrelationEngine<'a> {
    signal: SignalBuffer<'a>,
    setup: &'a AnalysisSetup,
    mode: Mode,
}

impl<'a> CorrelationEngine<'a> {
    /// Prepare the FFT plans and window table for the autocorrelation
    /// methods; cross-correlation needs neither.
    pub fn new(signal: SignalBuffer<'a>, setup: &'a AnalysisSetup) -> Result<Self> {
        let mode = match (setup.settings.window, setup.nsamp_fft) {
            (Some(shape), Some(nsamp_fft)) => {
                let fft = FftTable::new(nsamp_fft)?;
                let window = WindowTable::new(shape, setup.nsamp_window, &fft)?;
                Mode::Auto { fft, window }
            }
            (None, _) => Mode::Cross,
            (Some(_), None) => {
                return Err(PitchError::InvariantViolated(
                    "autocorrelation method without FFT length".to_string(),
                ))
            }
        };
        Ok(Self {
            signal,
            setup,
            mode,
        })
    }

    /// The analysis window, for the frame extractor
    pub fn window(&self) -> Option<&WindowTable> {
        match &self.mode {
            Mode::Auto { window, .. } => Some(window),
            Mode::Cross => None,
        }
    }

    /// Correlation of the frame centered at `t`
    pub fn correlate(&self, frame: &ExtractedFrame, t: f64) -> Result<CorrelationBuffer> {
        match &self.mode {
            Mode::Auto { fft, window } => self.autocorrelation(frame, fft, window),
            Mode::Cross => self.cross_correlation(t),
        }
    }

    fn autocorrelation(
        &self,
        frame: &ExtractedFrame,
        fft: &FftTable,
        window: &WindowTable,
    ) -> Result<CorrelationBuffer> {
        let brent_ixmax = self.setup.brent_ixmax;
        let mut r = CorrelationBuffer::new(brent_ixmax)?;

        let ac = fft.autocorrelation(&frame.samples)?;
        let r0 = ac[0];
        if !(r0 > 0.0) {
            return Ok(r);
        }
        for lag in 1..=brent_ixmax.min(ac.len() - 1) {
            r.set(lag, ac[lag] / (r0 * window.autocorrelation_at(lag)));
        }
        Ok(r)
    }

    fn cross_correlation(&self, t: f64) -> Result<CorrelationBuffer> {
        let setup = self.setup;
        let nsamp_window = setup.nsamp_window;
        let mut r = CorrelationBuffer::new(setup.brent_ixmax)?;

        let start_time = t - 0.5 * (1.0 / setup.pitch_floor + setup.window_duration);
        let start = self.signal.low_index(start_time).max(0) as usize;
        let available = self.signal.num_samples().saturating_sub(start);
        let local_span = (setup.maximum_lag + nsamp_window).min(available);
        let amp = self.signal.range(start, local_span).ok_or_else(|| {
            PitchError::InvariantViolated(format!(
                "correlation span at sample {} lies outside the signal",
                start
            ))
        })?;
        if local_span < nsamp_window {
            return Err(PitchError::InvariantViolated(format!(
                "correlation span of {} samples is shorter than the window of {}",
                local_span, nsamp_window
            )));
        }
        let local_maximum_lag = (local_span - nsamp_window).min(r.max_lag());

        let x = &amp[..nsamp_window];
        let sumx2: f64 = x.iter().map(|v| v * v).sum();
        let mut sumy2 = sumx2;

        for lag in 1..=local_maximum_lag {
            let y0 = amp[lag - 1];
            let y_z = amp[lag - 1 + nsamp_window];
            sumy2 += y_z * y_z - y0 * y0;
            let y = &amp[lag..lag + nsamp_window];
            let product: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
            let denominator = (sumx2 * sumy2).sqrt();
            let value = if denominator > 0.0 {
                product / denominator
            } else {
                0.0
            };
            r.set(lag, value);
        }
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::frame::FrameExtractor;
    use crate::pitch::params::{PitchMethod, PitchParameters};
    use crate::Sound;
    use approx::assert_relative_eq;

    /// Window length and correlation of the middle frame of a pure tone
    fn correlation_at_center(method: PitchMethod, frequency: f64) -> (usize, CorrelationBuffer) {
        let sound = Sound::create_tone(frequency, 0.5, 10000.0, 0.5, 0.0);
        let buffer = sound.as_buffer().unwrap();
        let params = match method {
            PitchMethod::CcNormal | PitchMethod::CcAccurate => {
                PitchParameters::cc(0.01, 75.0, 600.0).with_method(method)
            }
            _ => PitchParameters::ac(0.01, 75.0, 600.0).with_method(method),
        };
        let setup = AnalysisSetup::new(&params, &buffer).unwrap();
        let engine = CorrelationEngine::new(buffer, &setup).unwrap();
        let (_, peak) = buffer.mean_and_peak();
        let extractor = FrameExtractor::new(buffer, &setup, engine.window(), peak);
        let t = setup.grid.time(setup.num_frames() / 2);
        let frame = extractor.extract(t).unwrap();
        let r = engine.correlate(&frame, t).unwrap();
        (setup.nsamp_window, r)
    }

    #[test]
    fn test_buffer_symmetry() {
        let mut r = CorrelationBuffer::new(4).unwrap();
        r.set(3, 0.5);
        assert_eq!(r.value_at(0), 1.0);
        assert_eq!(r.value_at(3), 0.5);
        assert_eq!(r.value_at(-3), 0.5);
        assert_eq!(r.value_at(9), 0.0);
        assert_eq!(r.as_slice().len(), 9);
        assert_eq!(r.center(), 4);
    }

    #[test]
    fn test_autocorrelation_peaks_at_period() {
        // 200 Hz at 10 kHz: period of 50 samples
        let (_, r) = correlation_at_center(PitchMethod::AcHanning, 200.0);
        assert_eq!(r.value_at(0), 1.0);
        assert!(r.value_at(50) > 0.9);
        assert!(r.value_at(50) > r.value_at(45));
        assert!(r.value_at(50) > r.value_at(55));
        assert!(r.value_at(25) < 0.0);
    }

    #[test]
    fn test_cross_correlation_peaks_at_period() {
        let (nsamp_window, r) = correlation_at_center(PitchMethod::CcNormal, 200.0);
        assert_eq!(r.max_lag(), nsamp_window);
        // Whole and half periods of the raw signal
        assert_relative_eq!(r.value_at(50), 1.0, epsilon = 1e-3);
        assert_relative_eq!(r.value_at(25), -1.0, epsilon = 1e-2);
        assert_eq!(r.value_at(-50), r.value_at(50));
    }

    #[test]
    fn test_zero_energy_cross_correlation() {
        let sound = Sound::create_silence(0.5, 10000.0);
        let buffer = sound.as_buffer().unwrap();
        let setup = AnalysisSetup::new(&PitchParameters::cc(0.01, 75.0, 600.0), &buffer).unwrap();
        let engine = CorrelationEngine::new(buffer, &setup).unwrap();
        let frame = ExtractedFrame {
            samples: vec![0.0; setup.nsamp_window],
            local_mean: 0.0,
            local_peak: 0.0,
            intensity: 0.0,
        };
        let r = engine.correlate(&frame, setup.grid.time(0)).unwrap();
        assert!(r.as_slice().iter().all(|v| v.is_finite()));
        assert_eq!(r.value_at(10), 0.0);
    }
}
