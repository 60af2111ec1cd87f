//! Sound type and the read-only sample view used by pitch analysis
//!
//! The Sound type owns mono audio samples. Analysis code never touches it
//! directly; it works through a [`SignalBuffer`], a borrowed view that knows
//! its sampling period and the time of its first sample.

use std::path::Path;

use crate::{PitchError, Result};

/// Audio samples with associated sample rate and timing information
#[derive(Debug, Clone)]
pub struct Sound {
    /// Audio samples (mono, normalized to [-1, 1] range)
    samples: Vec<f64>,
    /// Sample rate in Hz
    sample_rate: f64,
    /// Start time of the first sample (usually 0.0)
    start_time: f64,
}

impl Sound {
    /// Create a Sound from raw samples
    ///
    /// # Example
    /// ```
    /// use praat_pitch::Sound;
    ///
    /// let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5];
    /// let sound = Sound::from_samples(&samples, 44100.0);
    /// assert_eq!(sound.sample_rate(), 44100.0);
    /// ```
    pub fn from_samples(samples: &[f64], sample_rate: f64) -> Self {
        Self {
            samples: samples.to_vec(),
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Create a Sound from owned samples (avoids cloning)
    pub fn from_samples_owned(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Load a Sound from a WAV file
    ///
    /// Multi-channel files are converted to mono by averaging channels.
    /// Integer samples are normalized to the [-1, 1] range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let sample_rate = spec.sample_rate as f64;
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f64 / max_value))
                    .collect::<std::result::Result<Vec<f64>, hound::Error>>()?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<f64>, hound::Error>>()?,
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f64>() / channels as f64)
                .collect()
        };

        log::debug!(
            "Loaded {} samples at {} Hz ({} channel(s) mixed to mono)",
            samples.len(),
            sample_rate,
            channels
        );

        Ok(Self {
            samples,
            sample_rate,
            start_time: 0.0,
        })
    }

    /// Create a pure tone (sine wave)
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz
    /// * `duration` - Duration in seconds
    /// * `sample_rate` - Sample rate in Hz
    /// * `amplitude` - Peak amplitude (0.0 to 1.0)
    /// * `phase` - Initial phase in radians
    pub fn create_tone(
        frequency: f64,
        duration: f64,
        sample_rate: f64,
        amplitude: f64,
        phase: f64,
    ) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;

        let samples: Vec<f64> = (0..n_samples)
            .map(|i| amplitude * (omega * i as f64 + phase).sin())
            .collect();

        Sound {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Create silence
    pub fn create_silence(duration: f64, sample_rate: f64) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        Sound {
            samples: vec![0.0; n_samples],
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Set the time of the left edge of the first sample
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a reference to the audio samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Get the number of samples
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Get the start time (left edge of the first sample)
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Get the end time (right edge of the last sample)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Get the sample period. In Praat, this is called `dx`.
    pub fn dx(&self) -> f64 {
        1.0 / self.sample_rate
    }

    /// Get the time of the first sample center (`x1 = xmin + 0.5 * dx`)
    pub fn x1(&self) -> f64 {
        self.start_time + 0.5 * self.dx()
    }

    /// Borrow the samples as an analysis view
    pub fn as_buffer(&self) -> Result<SignalBuffer<'_>> {
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(PitchError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        SignalBuffer::new(&self.samples, self.dx(), self.x1())
    }
}

/// Read-only view over uniformly sampled values
///
/// Indices are 0-based. Sample `i` is centered at `x1 + i * dx`.
#[derive(Debug, Clone, Copy)]
pub struct SignalBuffer<'a> {
    samples: &'a [f64],
    dx: f64,
    x1: f64,
}

impl<'a> SignalBuffer<'a> {
    /// Create a view; the sampling period must be positive and finite
    pub fn new(samples: &'a [f64], dx: f64, x1: f64) -> Result<Self> {
        if !(dx > 0.0 && dx.is_finite()) {
            return Err(PitchError::InvalidParameter(format!(
                "sampling period must be positive, got {}",
                dx
            )));
        }
        Ok(Self { samples, dx, x1 })
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Sampling period in seconds
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Time of the first sample center
    pub fn x1(&self) -> f64 {
        self.x1
    }

    /// Total duration covered by the samples (`nx * dx`)
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 * self.dx
    }

    pub fn samples(&self) -> &'a [f64] {
        self.samples
    }

    /// Value of sample `index`, if it exists
    #[inline]
    pub fn value_at_sample(&self, index: usize) -> Option<f64> {
        self.samples.get(index).copied()
    }

    /// `len` consecutive samples starting at `start`, if they all exist
    pub fn range(&self, start: usize, len: usize) -> Option<&'a [f64]> {
        let end = start.checked_add(len)?;
        self.samples.get(start..end)
    }

    /// Index of the sample at or just left of time `t` (may be out of range)
    pub fn low_index(&self, t: f64) -> isize {
        ((t - self.x1) / self.dx).floor() as isize
    }

    /// Value of the sample nearest to time `t`, or None outside the signal
    pub fn value_nearest(&self, t: f64) -> Option<f64> {
        let index = ((t - self.x1) / self.dx).round();
        if index < 0.0 {
            return None;
        }
        self.value_at_sample(index as usize)
    }

    /// Signal-wide mean and maximum absolute deviation from it
    pub fn mean_and_peak(&self) -> (f64, f64) {
        if self.samples.is_empty() {
            return (0.0, 0.0);
        }
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        let peak = self
            .samples
            .iter()
            .map(|&s| (s - mean).abs())
            .fold(0.0, f64::max);
        (mean, peak)
    }
}

/// Placement of analysis frames fitted symmetrically into a signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGrid {
    pub num_frames: usize,
    pub first_time: f64,
    pub time_step: f64,
}

impl FrameGrid {
    /// Center time of frame `index` (0-based)
    pub fn time(&self, index: usize) -> f64 {
        self.first_time + index as f64 * self.time_step
    }
}

/// Fit as many frames of `window_duration` as possible symmetrically
/// into the signal (Praat's `Sampled_shortTermAnalysis`)
pub fn short_term_analysis(
    signal: &SignalBuffer<'_>,
    window_duration: f64,
    time_step: f64,
) -> Result<FrameGrid> {
    if !(window_duration > 0.0) || !(time_step > 0.0) {
        return Err(PitchError::InvalidParameter(format!(
            "window duration ({}) and time step ({}) must be positive",
            window_duration, time_step
        )));
    }
    let my_duration = signal.duration();
    if window_duration > my_duration {
        return Err(PitchError::SignalTooShort {
            duration: my_duration,
            window: window_duration,
        });
    }
    let num_frames = ((my_duration - window_duration) / time_step).floor() as usize + 1;
    let our_mid_time = signal.x1() - 0.5 * signal.dx() + 0.5 * my_duration;
    let thy_duration = num_frames as f64 * time_step;
    let first_time = our_mid_time - 0.5 * thy_duration + 0.5 * time_step;
    Ok(FrameGrid {
        num_frames,
        first_time,
        time_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_samples() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0];
        let sound = Sound::from_samples(&samples, 44100.0);

        assert_eq!(sound.sample_rate(), 44100.0);
        assert_eq!(sound.num_samples(), 5);
        assert_relative_eq!(sound.duration(), 5.0 / 44100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_pure_tone() {
        let sound = Sound::create_tone(440.0, 0.01, 44100.0, 1.0, 0.0);
        assert_relative_eq!(sound.samples()[0], 0.0, epsilon = 1e-10);
        assert_eq!(sound.num_samples(), 441);
    }

    #[test]
    fn test_buffer_rejects_bad_rate() {
        let sound = Sound::from_samples(&[0.0; 10], 0.0);
        assert!(matches!(sound.as_buffer(), Err(PitchError::InvalidParameter(_))));
    }

    #[test]
    fn test_buffer_time_queries() {
        let samples: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let sound = Sound::from_samples(&samples, 1000.0);
        let buffer = sound.as_buffer().unwrap();

        assert_relative_eq!(buffer.x1(), 0.0005, epsilon = 1e-12);
        assert_eq!(buffer.low_index(0.0005), 0);
        assert_eq!(buffer.low_index(0.0104), 9);
        assert_eq!(buffer.value_nearest(0.0104), Some(10.0));
        assert_eq!(buffer.value_nearest(-0.01), None);
        assert_eq!(buffer.value_nearest(1.0), None);
        assert_eq!(buffer.range(98, 2), Some(&samples[98..100]));
        assert_eq!(buffer.range(98, 3), None);
        assert_eq!(buffer.value_at_sample(99), Some(99.0));
        assert_eq!(buffer.value_at_sample(100), None);
    }

    #[test]
    fn test_mean_and_peak() {
        let sound = Sound::from_samples(&[1.0, 3.0, 1.0, 3.0, 7.0], 100.0);
        let (mean, peak) = sound.as_buffer().unwrap().mean_and_peak();
        assert_relative_eq!(mean, 3.0, epsilon = 1e-12);
        assert_relative_eq!(peak, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_term_analysis_centers_frames() {
        let sound = Sound::create_silence(1.0, 1000.0);
        let buffer = sound.as_buffer().unwrap();
        let grid = short_term_analysis(&buffer, 0.045, 0.01).unwrap();

        assert_eq!(grid.num_frames, 96);
        // Frames are symmetric around the middle of the signal
        let last = grid.time(grid.num_frames - 1);
        assert_relative_eq!(grid.first_time + last, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_term_analysis_too_short() {
        let sound = Sound::create_silence(0.01, 1000.0);
        let buffer = sound.as_buffer().unwrap();
        let err = short_term_analysis(&buffer, 0.04, 0.01).unwrap_err();
        assert!(matches!(err, PitchError::SignalTooShort { .. }));
    }
}
