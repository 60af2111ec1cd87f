//! Per-frame sample extraction
//!
//! For a frame centered at time `t` the extractor removes the local DC
//! offset (averaged over one longest period to each side), copies one
//! window of samples, shapes it with the analysis window when there is one,
//! and measures the local peak over half a longest period around the
//! center. All buffers are owned by the returned frame.

use crate::pitch::params::AnalysisSetup;
use crate::sound::SignalBuffer;
use crate::window::WindowTable;
use crate::{PitchError, Result};

/// Samples of one analysis frame, ready for correlation
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Demeaned (and windowed, for autocorrelation) samples, one window long
    pub samples: Vec<f64>,
    pub local_mean: f64,
    /// Largest absolute value near the frame center
    pub local_peak: f64,
    /// `local_peak / global_peak`, at most 1
    pub intensity: f64,
}

impl ExtractedFrame {
    /// Absolute silence around the center; no candidates are searched
    pub fn is_silent(&self) -> bool {
        self.local_peak == 0.0
    }
}

/// Cuts analysis frames out of a signal
#[derive(Debug, Clone, Copy)]
pub struct FrameExtractor<'a> {
    signal: SignalBuffer<'a>,
    setup: &'a AnalysisSetup,
    window: Option<&'a WindowTable>,
    global_peak: f64,
}

impl<'a> FrameExtractor<'a> {
    /// `window` is the shaping window for autocorrelation, None for
    /// cross-correlation. `global_peak` must be positive.
    pub fn new(
        signal: SignalBuffer<'a>,
        setup: &'a AnalysisSetup,
        window: Option<&'a WindowTable>,
        global_peak: f64,
    ) -> Self {
        Self {
            signal,
            setup,
            window,
            global_peak,
        }
    }

    /// Samples to the left and right of `t`
    fn center_samples(&self, t: f64) -> (isize, isize) {
        let left = self.signal.low_index(t);
        (left, left + 1)
    }

    /// Contiguous samples `[start, start + len)` or an invariant error
    fn span(&self, start: isize, len: usize, what: &str) -> Result<&'a [f64]> {
        let slice = if start < 0 {
            None
        } else {
            self.signal.range(start as usize, len)
        };
        slice.ok_or_else(|| {
            PitchError::InvariantViolated(format!(
                "{} span [{}, {}) lies outside the signal of {} samples",
                what,
                start,
                start + len as isize,
                self.signal.num_samples()
            ))
        })
    }

    /// Mean over one longest period to both sides of `t`
    pub fn local_mean(&self, t: f64) -> Result<f64> {
        let (left, right) = self.center_samples(t);
        let nsamp_period = self.setup.nsamp_period;
        let start = right - nsamp_period as isize;
        let len = (left + nsamp_period as isize - start + 1).max(0) as usize;
        let span = self.span(start, len, "local mean")?;
        Ok(span.iter().sum::<f64>() / (2 * nsamp_period) as f64)
    }

    /// Extract the frame centered at `t`
    pub fn extract(&self, t: f64) -> Result<ExtractedFrame> {
        let local_mean = self.local_mean(t)?;

        let (_, right) = self.center_samples(t);
        let setup = self.setup;
        let start = right - setup.halfnsamp_window as isize;
        let span = self.span(start, setup.nsamp_window, "frame")?;

        let mut samples = Vec::new();
        samples.try_reserve_exact(setup.nsamp_window)?;
        match self.window {
            Some(table) => samples.extend(
                span.iter()
                    .zip(table.window())
                    .map(|(&x, &w)| (x - local_mean) * w),
            ),
            None => samples.extend(span.iter().map(|&x| x - local_mean)),
        }

        let peak_start = setup.halfnsamp_window.saturating_sub(setup.halfnsamp_period);
        let peak_end = (setup.halfnsamp_window + setup.halfnsamp_period).min(setup.nsamp_window);
        let local_peak = samples[peak_start..peak_end]
            .iter()
            .fold(0.0_f64, |peak, &x| peak.max(x.abs()));

        let intensity = if local_peak > self.global_peak {
            1.0
        } else {
            local_peak / self.global_peak
        };

        Ok(ExtractedFrame {
            samples,
            local_mean,
            local_peak,
            intensity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::params::PitchParameters;
    use crate::utils::FftTable;
    use crate::window::WindowShape;
    use crate::Sound;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_mean_removes_offset() {
        let sound = Sound::from_samples_owned(
            Sound::create_tone(200.0, 0.5, 10000.0, 0.5, 0.0)
                .samples()
                .iter()
                .map(|x| x + 0.25)
                .collect(),
            10000.0,
        );
        let buffer = sound.as_buffer().unwrap();
        let setup = AnalysisSetup::new(&PitchParameters::default(), &buffer).unwrap();
        let extractor = FrameExtractor::new(buffer, &setup, None, 0.5);

        // 266 samples is not a whole number of 200 Hz cycles,
        // so allow a small residue
        let t = setup.grid.time(setup.num_frames() / 2);
        assert_relative_eq!(extractor.local_mean(t).unwrap(), 0.25, epsilon = 0.05);

        let frame = extractor.extract(t).unwrap();
        assert_eq!(frame.samples.len(), setup.nsamp_window);
        assert!(!frame.is_silent());
        assert!(frame.intensity > 0.85 && frame.intensity <= 1.0);
    }

    #[test]
    fn test_window_applied_for_autocorrelation() {
        let sound = Sound::from_samples_owned(vec![1.0; 5000], 10000.0);
        let buffer = sound.as_buffer().unwrap();
        let setup = AnalysisSetup::new(&PitchParameters::default(), &buffer).unwrap();
        let fft = FftTable::new(setup.nsamp_fft.unwrap()).unwrap();
        let table = WindowTable::new(WindowShape::Hanning, setup.nsamp_window, &fft).unwrap();
        let extractor = FrameExtractor::new(buffer, &setup, Some(&table), 1.0);

        // Constant signal: demeaned frame is all zero, hence silent
        let frame = extractor.extract(setup.grid.time(0)).unwrap();
        assert!(frame.is_silent());
        assert_eq!(frame.intensity, 0.0);
    }

    #[test]
    fn test_out_of_range_is_invariant_violation() {
        let sound = Sound::create_tone(200.0, 0.5, 10000.0, 0.5, 0.0);
        let buffer = sound.as_buffer().unwrap();
        let setup = AnalysisSetup::new(&PitchParameters::default(), &buffer).unwrap();
        let extractor = FrameExtractor::new(buffer, &setup, None, 0.5);

        let err = extractor.extract(-1.0).unwrap_err();
        assert!(matches!(err, PitchError::InvariantViolated(_)));
    }
}
