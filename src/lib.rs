//! praat-pitch: short-term pitch candidate analysis after Praat's `Sound: To Pitch`
//!
//! The analysis follows Boersma (1993): "Accurate short-term analysis of the
//! fundamental frequency and the harmonics-to-noise ratio of a sampled sound."
//! Each analysis frame yields a bounded, unsorted set of pitch candidates
//! (frequency plus correlation strength), with the unvoiced candidate always in
//! the first slot. A path finder then picks one candidate per frame.
//!
//! # Core Types
//!
//! - [`Sound`] - Mono audio samples with sample rate
//! - [`SignalBuffer`] - Read-only sample view used by the analysis
//! - [`PitchParameters`] - Analysis settings and method selection
//! - [`PitchContour`] - Per-frame candidate sets and intensities
//! - [`Pitch`] - A contour together with its selected path
//!
//! # Example
//!
//! ```
//! use praat_pitch::Sound;
//!
//! let sound = Sound::create_tone(220.0, 0.5, 16000.0, 0.5, 0.0);
//! let pitch = sound.to_pitch(0.0, 75.0, 600.0).unwrap();
//! let mean = pitch.mean().unwrap();
//! assert!((mean - 220.0).abs() < 2.0);
//! ```

pub mod interpolation;
pub mod pitch;
pub mod progress;
pub mod sound;
pub mod window;

pub mod utils;

// Re-export main types at crate root
pub use interpolation::{Interpolation, PeakInterpolation};
pub use pitch::candidates::{PitchCandidate, PitchFrame};
pub use pitch::params::{PitchMethod, PitchParameters};
pub use pitch::path::{PathCosts, PathFinder, ViterbiPathFinder};
pub use pitch::{analyze, Pitch, PitchContour};
#[cfg(feature = "parallel")]
pub use pitch::analyze_parallel;
pub use progress::{CancelFlag, NoProgress, Progress};
pub use sound::{FrameGrid, SignalBuffer, Sound};
pub use window::{WindowShape, WindowTable};

use thiserror::Error;

/// Errors that can occur during pitch analysis
#[derive(Error, Debug)]
pub enum PitchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decoding error: {0}")]
    WavDecode(#[from] hound::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Signal of {duration} s is shorter than the analysis window of {window} s")]
    SignalTooShort { duration: f64, window: f64 },

    #[error("Resource error: {0}")]
    Resource(String),

    /// The progress sink asked to stop. Not a computation failure.
    #[error("Analysis cancelled by user")]
    Cancelled,

    #[error("Internal invariant violated: {0}")]
    InvariantViolated(String),
}

impl PitchError {
    /// Whether this is a user cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PitchError::Cancelled)
    }
}

impl From<std::collections::TryReserveError> for PitchError {
    fn from(err: std::collections::TryReserveError) -> Self {
        PitchError::Resource(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PitchError>;

/// Units for pitch values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchUnit {
    #[default]
    Hertz,
    Mel,
    Semitones,
    SemitonesRe100Hz,
    SemitonesRe200Hz,
    SemitonesRe440Hz,
    Erb,
}

impl PitchUnit {
    /// Convert a frequency in Hz to this unit
    pub fn from_hertz(self, hz: f64) -> f64 {
        match self {
            PitchUnit::Hertz => hz,
            PitchUnit::Mel => hz_to_mel(hz),
            PitchUnit::Semitones => hz_to_semitones(hz, 1.0),
            PitchUnit::SemitonesRe100Hz => hz_to_semitones(hz, 100.0),
            PitchUnit::SemitonesRe200Hz => hz_to_semitones(hz, 200.0),
            PitchUnit::SemitonesRe440Hz => hz_to_semitones(hz, 440.0),
            PitchUnit::Erb => hz_to_erb(hz),
        }
    }

    /// Convert from this unit to Hz
    pub fn to_hertz(self, value: f64) -> f64 {
        match self {
            PitchUnit::Hertz => value,
            PitchUnit::Mel => mel_to_hz(value),
            PitchUnit::Semitones => semitones_to_hz(value, 1.0),
            PitchUnit::SemitonesRe100Hz => semitones_to_hz(value, 100.0),
            PitchUnit::SemitonesRe200Hz => semitones_to_hz(value, 200.0),
            PitchUnit::SemitonesRe440Hz => semitones_to_hz(value, 440.0),
            PitchUnit::Erb => erb_to_hz(value),
        }
    }
}

// Frequency scale conversions (Praat's formulas)

fn hz_to_mel(hz: f64) -> f64 {
    550.0 * (1.0 + hz / 550.0).ln()
}

fn mel_to_hz(mel: f64) -> f64 {
    550.0 * ((mel / 550.0).exp() - 1.0)
}

fn hz_to_semitones(hz: f64, reference: f64) -> f64 {
    12.0 * (hz / reference).log2()
}

fn semitones_to_hz(semitones: f64, reference: f64) -> f64 {
    reference * 2.0_f64.powf(semitones / 12.0)
}

/// Glasberg & Moore (1990) ERB rate
fn hz_to_erb(hz: f64) -> f64 {
    21.4 * (0.00437 * hz + 1.0).log10()
}

fn erb_to_hz(erb: f64) -> f64 {
    (10.0_f64.powf(erb / 21.4) - 1.0) / 0.00437
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pitch_unit_roundtrip() {
        let units = [
            PitchUnit::Hertz,
            PitchUnit::Mel,
            PitchUnit::Semitones,
            PitchUnit::SemitonesRe100Hz,
            PitchUnit::SemitonesRe200Hz,
            PitchUnit::SemitonesRe440Hz,
            PitchUnit::Erb,
        ];
        for unit in units {
            for hz in [80.0, 220.0, 440.0] {
                assert_relative_eq!(unit.to_hertz(unit.from_hertz(hz)), hz, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_semitones_reference() {
        assert_relative_eq!(PitchUnit::SemitonesRe100Hz.from_hertz(200.0), 12.0, epsilon = 1e-12);
        assert_relative_eq!(PitchUnit::SemitonesRe440Hz.from_hertz(440.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cancelled_is_not_a_failure_kind() {
        assert!(PitchError::Cancelled.is_cancelled());
        assert!(!PitchError::InvalidParameter("x".into()).is_cancelled());
    }
}
