//! Analysis parameters and the quantities derived from them
//!
//! [`PitchParameters`] is what the caller asks for. [`AnalysisSetup`] is the
//! validated, signal-specific resolution of it: window and lag sizes in
//! samples, FFT length, interpolation breadth and the frame grid. It is
//! computed once per run and never changes afterwards.

use crate::interpolation::PeakInterpolation;
use crate::sound::{short_term_analysis, FrameGrid, SignalBuffer};
use crate::utils::fft::next_power_of_two_at_least;
use crate::window::WindowShape;
use crate::{PitchError, Result};

/// Pitch extraction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitchMethod {
    /// Autocorrelation with Hanning window
    #[default]
    AcHanning,
    /// Autocorrelation with Gaussian window
    AcGauss,
    /// Forward cross-correlation, normal accuracy
    CcNormal,
    /// Forward cross-correlation, high accuracy
    CcAccurate,
}

impl PitchMethod {
    pub fn is_cross_correlation(self) -> bool {
        matches!(self, PitchMethod::CcNormal | PitchMethod::CcAccurate)
    }

    /// Resolve the method into the settings it fixes together
    pub fn settings(self) -> MethodSettings {
        match self {
            PitchMethod::AcHanning => MethodSettings {
                window: Some(WindowShape::Hanning),
                periods_factor: 1.0,
                interpolation_depth: 0.5,
                peak_interpolation: PeakInterpolation::Sinc70,
                brent_accuracy: 1e-7,
            },
            // The Gaussian window is twice as long for the same resolution
            PitchMethod::AcGauss => MethodSettings {
                window: Some(WindowShape::Gaussian),
                periods_factor: 2.0,
                interpolation_depth: 0.25,
                peak_interpolation: PeakInterpolation::Sinc700,
                brent_accuracy: 1e-11,
            },
            PitchMethod::CcNormal => MethodSettings {
                window: None,
                periods_factor: 1.0,
                interpolation_depth: 1.0,
                peak_interpolation: PeakInterpolation::Sinc70,
                brent_accuracy: 1e-7,
            },
            PitchMethod::CcAccurate => MethodSettings {
                window: None,
                periods_factor: 1.0,
                interpolation_depth: 1.0,
                peak_interpolation: PeakInterpolation::Sinc700,
                brent_accuracy: 1e-11,
            },
        }
    }
}

/// Window, interpolation depth and peak-refinement kernel of one method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodSettings {
    /// Window applied before autocorrelation; None for cross-correlation
    pub window: Option<WindowShape>,
    /// Multiplier on the requested periods per window
    pub periods_factor: f64,
    /// Fraction of the window length over which lags are interpolated
    pub interpolation_depth: f64,
    /// Kernel used when refining candidates
    pub peak_interpolation: PeakInterpolation,
    /// Absolute tolerance (in lags) of the refinement search
    pub brent_accuracy: f64,
}

/// Parameters for pitch analysis
///
/// The defaults are those of Praat's `Sound: To Pitch (ac)...`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchParameters {
    /// Time between frame centers in seconds; 0 or less picks
    /// `periods_per_window / pitch_floor / 4`
    pub time_step: f64,
    /// Minimum pitch in Hz (default 75)
    pub pitch_floor: f64,
    /// Number of periods of the minimum pitch per window (default 3)
    pub periods_per_window: f64,
    /// Capacity of each frame's candidate set, unvoiced slot included (default 15)
    pub max_candidates: usize,
    pub method: PitchMethod,
    /// Default 0.03
    pub silence_threshold: f64,
    /// Default 0.45
    pub voicing_threshold: f64,
    /// Default 0.01
    pub octave_cost: f64,
    /// Default 0.35
    pub octave_jump_cost: f64,
    /// Default 0.14
    pub voiced_unvoiced_cost: f64,
    /// Maximum pitch in Hz, clamped to Nyquist (default 600)
    pub pitch_ceiling: f64,
}

impl Default for PitchParameters {
    fn default() -> Self {
        Self {
            time_step: 0.0,
            pitch_floor: 75.0,
            periods_per_window: 3.0,
            max_candidates: 15,
            method: PitchMethod::AcHanning,
            silence_threshold: 0.03,
            voicing_threshold: 0.45,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
            pitch_ceiling: 600.0,
        }
    }
}

impl PitchParameters {
    /// Autocorrelation defaults with the given time step, floor and ceiling
    pub fn ac(time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Self {
        Self {
            time_step,
            pitch_floor,
            pitch_ceiling,
            ..Self::default()
        }
    }

    /// Cross-correlation defaults (one period per window)
    pub fn cc(time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Self {
        Self {
            time_step,
            pitch_floor,
            pitch_ceiling,
            periods_per_window: 1.0,
            method: PitchMethod::CcNormal,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: PitchMethod) -> Self {
        self.method = method;
        self
    }

    /// Checks that do not depend on the signal
    pub fn validate(&self) -> Result<()> {
        if !(self.pitch_floor > 0.0 && self.pitch_floor.is_finite()) {
            return Err(PitchError::InvalidParameter(format!(
                "pitch floor must be positive, got {}",
                self.pitch_floor
            )));
        }
        if !(self.pitch_ceiling > 0.0 && self.pitch_ceiling.is_finite()) {
            return Err(PitchError::InvalidParameter(format!(
                "pitch ceiling must be positive and finite, got {}",
                self.pitch_ceiling
            )));
        }
        if !(self.periods_per_window > 0.0 && self.periods_per_window.is_finite()) {
            return Err(PitchError::InvalidParameter(format!(
                "periods per window must be positive, got {}",
                self.periods_per_window
            )));
        }
        if self.max_candidates < 2 {
            return Err(PitchError::InvalidParameter(format!(
                "maximum number of candidates must be at least 2, got {}",
                self.max_candidates
            )));
        }
        let finite = [
            ("time step", self.time_step),
            ("silence threshold", self.silence_threshold),
            ("voicing threshold", self.voicing_threshold),
            ("octave cost", self.octave_cost),
            ("octave-jump cost", self.octave_jump_cost),
            ("voiced/unvoiced cost", self.voiced_unvoiced_cost),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(PitchError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Validated, signal-specific analysis quantities
#[derive(Debug, Clone)]
pub struct AnalysisSetup {
    pub method: PitchMethod,
    pub settings: MethodSettings,
    /// Sampling period of the analyzed signal
    pub dx: f64,
    pub pitch_floor: f64,
    /// Ceiling after clamping to the Nyquist frequency
    pub pitch_ceiling: f64,
    /// Periods per window after the method's adjustment
    pub periods_per_window: f64,
    pub time_step: f64,
    /// Candidate capacity per frame after raising to `ceiling / floor`
    pub max_candidates: usize,
    pub voicing_threshold: f64,
    pub octave_cost: f64,
    /// Window duration in seconds
    pub window_duration: f64,
    /// Window length in samples (always even)
    pub nsamp_window: usize,
    pub halfnsamp_window: usize,
    /// Samples in the longest period
    pub nsamp_period: usize,
    pub halfnsamp_period: usize,
    pub minimum_lag: usize,
    pub maximum_lag: usize,
    /// FFT length for the autocorrelation methods
    pub nsamp_fft: Option<usize>,
    /// Largest lag kept in the correlation buffer and used by interpolation
    pub brent_ixmax: usize,
    pub grid: FrameGrid,
}

impl AnalysisSetup {
    pub fn new(params: &PitchParameters, signal: &SignalBuffer<'_>) -> Result<Self> {
        params.validate()?;

        let method = params.method;
        let settings = method.settings();
        let dx = signal.dx();
        let pitch_floor = params.pitch_floor;
        let periods_per_window = params.periods_per_window * settings.periods_factor;

        let ratio = params.pitch_ceiling / pitch_floor;
        let max_candidates = if (params.max_candidates as f64) < ratio {
            ratio.floor() as usize
        } else {
            params.max_candidates
        };

        let time_step = if params.time_step <= 0.0 {
            periods_per_window / pitch_floor / 4.0
        } else {
            params.time_step
        };

        let duration = signal.duration();
        if pitch_floor < periods_per_window / duration {
            return Err(PitchError::InvalidParameter(format!(
                "for this sound, the minimum pitch may not be less than {:.8} Hz",
                periods_per_window / duration
            )));
        }

        // Longest period: one to each side for the local mean,
        // half to each side for the local peak
        let nsamp_period = (1.0 / dx / pitch_floor).floor() as usize;
        let halfnsamp_period = nsamp_period / 2 + 1;

        let pitch_ceiling = params.pitch_ceiling.min(0.5 / dx);

        let window_duration = periods_per_window / pitch_floor;
        let nsamp_window_raw = (window_duration / dx).floor() as usize;
        let halfnsamp_window = (nsamp_window_raw / 2) as isize - 1;
        if halfnsamp_window < 2 {
            return Err(PitchError::InvalidParameter(
                "analysis window too short".to_string(),
            ));
        }
        let halfnsamp_window = halfnsamp_window as usize;
        let nsamp_window = halfnsamp_window * 2;

        let minimum_lag = ((1.0 / dx / pitch_ceiling).floor() as usize).max(2);
        let maximum_lag =
            ((nsamp_window as f64 / periods_per_window).floor() as usize + 2).min(nsamp_window);

        // Cross-correlation looks one longest period beyond the window
        let sizing_window = if method.is_cross_correlation() {
            1.0 / pitch_floor + window_duration
        } else {
            window_duration
        };
        let grid = short_term_analysis(signal, sizing_window, time_step)?;

        let nsamp_fft = settings.window.map(|_| {
            next_power_of_two_at_least(nsamp_window as f64 * (1.0 + settings.interpolation_depth))
        });
        let brent_ixmax = (nsamp_window as f64 * settings.interpolation_depth).floor() as usize;

        let setup = Self {
            method,
            settings,
            dx,
            pitch_floor,
            pitch_ceiling,
            periods_per_window,
            time_step,
            max_candidates,
            voicing_threshold: params.voicing_threshold,
            octave_cost: params.octave_cost,
            window_duration,
            nsamp_window,
            halfnsamp_window,
            nsamp_period,
            halfnsamp_period,
            minimum_lag,
            maximum_lag,
            nsamp_fft,
            brent_ixmax,
            grid,
        };

        log::debug!(
            "Pitch setup: method {:?}, {} frames from {:.6} s every {:.6} s, window {} samples, \
             lags {}..{}, fft {:?}, interpolation breadth {}, {} candidates",
            setup.method,
            setup.grid.num_frames,
            setup.grid.first_time,
            setup.time_step,
            setup.nsamp_window,
            setup.minimum_lag,
            setup.maximum_lag,
            setup.nsamp_fft,
            setup.brent_ixmax,
            setup.max_candidates
        );

        Ok(setup)
    }

    /// Number of analysis frames
    pub fn num_frames(&self) -> usize {
        self.grid.num_frames
    }
}
