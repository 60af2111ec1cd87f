//! Pitch (F0) analysis by autocorrelation or cross-correlation
//!
//! Implements the short-term analysis of Boersma (1993): "Accurate
//! short-term analysis of the fundamental frequency and the
//! harmonics-to-noise ratio of a sampled sound."
//!
//! Each frame is extracted, correlated and searched for candidate periods
//! independently ([`analyze`]). The resulting [`PitchContour`] holds every
//! candidate of every frame; a [`PathFinder`] then picks one candidate per
//! frame to form the final [`Pitch`] track.

pub mod candidates;
pub mod correlation;
pub mod frame;
pub mod params;
pub mod path;

use crate::interpolation::Interpolation;
use crate::progress::{NoProgress, Progress};
use crate::sound::SignalBuffer;
use crate::{PitchError, PitchUnit, Result, Sound};

use self::candidates::{CandidateSelector, PitchCandidate, PitchFrame};
use self::correlation::CorrelationEngine;
use self::frame::FrameExtractor;
use self::params::{AnalysisSetup, PitchParameters};
use self::path::{PathCosts, PathFinder, ViterbiPathFinder};

#[cfg(feature = "parallel")]
use crate::progress::CancelFlag;

/// All candidates of all frames, before path selection
#[derive(Debug, Clone, PartialEq)]
pub struct PitchContour {
    frames: Vec<PitchFrame>,
    /// Center time of the first frame
    start_time: f64,
    time_step: f64,
    pitch_floor: f64,
    /// Ceiling after clamping to the Nyquist frequency
    pitch_ceiling: f64,
    max_candidates: usize,
}

impl PitchContour {
    pub fn new(
        frames: Vec<PitchFrame>,
        start_time: f64,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
        max_candidates: usize,
    ) -> Self {
        Self {
            frames,
            start_time,
            time_step,
            pitch_floor,
            pitch_ceiling,
            max_candidates,
        }
    }

    fn from_setup(setup: &AnalysisSetup, frames: Vec<PitchFrame>) -> Self {
        Self::new(
            frames,
            setup.grid.first_time,
            setup.time_step,
            setup.pitch_floor,
            setup.pitch_ceiling,
            setup.max_candidates,
        )
    }

    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Center time of frame `index`
    pub fn frame_time(&self, index: usize) -> f64 {
        self.start_time + index as f64 * self.time_step
    }

    pub fn pitch_floor(&self) -> f64 {
        self.pitch_floor
    }

    pub fn pitch_ceiling(&self) -> f64 {
        self.pitch_ceiling
    }

    /// Capacity of each frame's candidate set
    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }
}

/// Everything needed to analyze any single frame
struct FrameAnalyzer<'a> {
    setup: &'a AnalysisSetup,
    extractor: FrameExtractor<'a>,
    engine: &'a CorrelationEngine<'a>,
    selector: CandidateSelector<'a>,
}

impl<'a> FrameAnalyzer<'a> {
    fn new(
        signal: SignalBuffer<'a>,
        setup: &'a AnalysisSetup,
        engine: &'a CorrelationEngine<'a>,
        global_peak: f64,
    ) -> Self {
        Self {
            setup,
            extractor: FrameExtractor::new(signal, setup, engine.window(), global_peak),
            engine,
            selector: CandidateSelector::new(setup),
        }
    }

    fn analyze_frame(&self, index: usize) -> Result<PitchFrame> {
        let t = self.setup.grid.time(index);
        let extracted = self.extractor.extract(t)?;
        if extracted.is_silent() {
            log::trace!("Frame {} at {:.4} s: silent", index, t);
            return Ok(PitchFrame::unvoiced(extracted.intensity));
        }
        let r = self.engine.correlate(&extracted, t)?;
        let frame = self.selector.select(extracted.intensity, &r);
        log::trace!(
            "Frame {} at {:.4} s: intensity {:.3}, {} candidates",
            index,
            t,
            frame.intensity,
            frame.num_candidates()
        );
        Ok(frame)
    }
}

fn frame_progress(frame: usize, num_frames: usize) -> f64 {
    0.1 + 0.8 * frame as f64 / (num_frames + 1) as f64
}

fn frame_message(frame: usize, num_frames: usize) -> String {
    format!("Sound to Pitch: analysis of frame {} out of {}", frame, num_frames)
}

/// Contour of a signal without any deviation from its mean
fn silent_contour(setup: &AnalysisSetup) -> Result<PitchContour> {
    let num_frames = setup.num_frames();
    log::debug!(
        "Sound to Pitch: signal is silent, {} unvoiced frames",
        num_frames
    );
    let mut frames = Vec::new();
    frames.try_reserve_exact(num_frames)?;
    frames.resize(num_frames, PitchFrame::unvoiced(0.0));
    Ok(PitchContour::from_setup(setup, frames))
}

/// Analyze all frames of `signal` in order
///
/// `progress` is told 0.0 at the start and, before each frame `k` of `n`
/// (1-based), `0.1 + 0.8 k / (n + 1)`. Answering `false` to a frame report
/// stops the run with [`PitchError::Cancelled`]; no later frame is analyzed.
pub fn analyze<P>(
    signal: &SignalBuffer<'_>,
    params: &PitchParameters,
    progress: &mut P,
) -> Result<PitchContour>
where
    P: Progress + ?Sized,
{
    let setup = AnalysisSetup::new(params, signal)?;
    progress.update(0.0, "Sound to Pitch...");

    let (_, global_peak) = signal.mean_and_peak();
    if global_peak == 0.0 {
        return silent_contour(&setup);
    }

    let engine = CorrelationEngine::new(*signal, &setup)?;
    let analyzer = FrameAnalyzer::new(*signal, &setup, &engine, global_peak);

    let num_frames = setup.num_frames();
    let mut frames = Vec::new();
    frames.try_reserve_exact(num_frames)?;
    for index in 0..num_frames {
        let k = index + 1;
        if !progress.update(frame_progress(k, num_frames), &frame_message(k, num_frames)) {
            log::info!("Sound to Pitch: cancelled before frame {} of {}", k, num_frames);
            return Err(PitchError::Cancelled);
        }
        frames.push(analyzer.analyze_frame(index)?);
    }

    Ok(PitchContour::from_setup(&setup, frames))
}

/// Analyze all frames of `signal` on the rayon thread pool
///
/// Produces the same contour as [`analyze`]. Every frame checks `cancel`
/// before it starts; a `false` answer from `progress` sets it. Reports
/// arrive in completion order, with `k` counting started frames.
#[cfg(feature = "parallel")]
pub fn analyze_parallel<F>(
    signal: &SignalBuffer<'_>,
    params: &PitchParameters,
    cancel: &CancelFlag,
    progress: F,
) -> Result<PitchContour>
where
    F: Fn(f64, &str) -> bool + Sync,
{
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let setup = AnalysisSetup::new(params, signal)?;
    progress(0.0, "Sound to Pitch...");

    let (_, global_peak) = signal.mean_and_peak();
    if global_peak == 0.0 {
        return silent_contour(&setup);
    }

    let engine = CorrelationEngine::new(*signal, &setup)?;
    let analyzer = FrameAnalyzer::new(*signal, &setup, &engine, global_peak);

    let num_frames = setup.num_frames();
    let started = AtomicUsize::new(0);
    let frames = (0..num_frames)
        .into_par_iter()
        .map(|index| {
            if cancel.is_cancelled() {
                return Err(PitchError::Cancelled);
            }
            let k = started.fetch_add(1, Ordering::SeqCst) + 1;
            if !progress(frame_progress(k, num_frames), &frame_message(k, num_frames)) {
                cancel.cancel();
                return Err(PitchError::Cancelled);
            }
            analyzer.analyze_frame(index)
        })
        .collect::<Result<Vec<PitchFrame>>>();

    match frames {
        Ok(frames) => Ok(PitchContour::from_setup(&setup, frames)),
        Err(err) => {
            if err.is_cancelled() {
                log::info!("Sound to Pitch: cancelled");
            }
            Err(err)
        }
    }
}

/// Pitch contour representing fundamental frequency over time
///
/// The candidate contour plus the candidate chosen in each frame.
#[derive(Debug, Clone)]
pub struct Pitch {
    contour: PitchContour,
    path: Vec<usize>,
}

impl Pitch {
    /// Combine a contour with a path; the path must name one existing
    /// candidate per frame
    pub fn new(contour: PitchContour, path: Vec<usize>) -> Result<Self> {
        if path.len() != contour.num_frames() {
            return Err(PitchError::InvariantViolated(format!(
                "path has {} entries for {} frames",
                path.len(),
                contour.num_frames()
            )));
        }
        if let Some((frame, &index)) = path
            .iter()
            .enumerate()
            .find(|&(frame, &index)| index >= contour.frames[frame].candidates.len())
        {
            return Err(PitchError::InvariantViolated(format!(
                "path selects candidate {} in frame {} which has {}",
                index,
                frame,
                contour.frames[frame].candidates.len()
            )));
        }
        Ok(Self { contour, path })
    }

    /// Run `finder` over `contour`
    pub fn from_contour<F>(contour: PitchContour, costs: &PathCosts, finder: &F) -> Result<Self>
    where
        F: PathFinder + ?Sized,
    {
        let path = finder.find_path(&contour, costs);
        Self::new(contour, path)
    }

    pub fn contour(&self) -> &PitchContour {
        &self.contour
    }

    /// Selected candidate index per frame
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// The candidate chosen in `frame`
    pub fn selected(&self, frame: usize) -> Option<&PitchCandidate> {
        let index = *self.path.get(frame)?;
        self.contour.frames.get(frame)?.candidates.get(index)
    }

    /// Frequency if the chosen candidate is voiced and below the ceiling
    fn voiced_frequency(&self, candidate: &PitchCandidate) -> Option<f64> {
        let freq = candidate.frequency;
        if freq > 0.0 && freq < self.contour.pitch_ceiling {
            Some(freq)
        } else {
            None
        }
    }

    fn voiced_values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_frames()).filter_map(move |i| self.get_value_at_frame(i))
    }

    /// Get pitch value at a specific time
    pub fn get_value_at_time(
        &self,
        time: f64,
        unit: PitchUnit,
        interpolation: Interpolation,
    ) -> Option<f64> {
        let n = self.num_frames();
        if n == 0 {
            return None;
        }

        let position = (time - self.contour.start_time) / self.contour.time_step;
        if position < -0.5 || position > n as f64 - 0.5 {
            return None;
        }

        let pitch_values: Vec<f64> = (0..n)
            .map(|i| self.get_value_at_frame(i).unwrap_or(f64::NAN))
            .collect();

        let hz = interpolation
            .interpolate_with_undefined(&pitch_values, position.clamp(0.0, (n - 1) as f64))?;
        Some(unit.from_hertz(hz))
    }

    /// Get the pitch value (Hz) at a specific frame
    pub fn get_value_at_frame(&self, frame: usize) -> Option<f64> {
        self.selected(frame)
            .and_then(|candidate| self.voiced_frequency(candidate))
    }

    /// Get the strength of the chosen candidate at a specific frame
    pub fn get_strength_at_frame(&self, frame: usize) -> Option<f64> {
        self.selected(frame).map(|candidate| candidate.strength)
    }

    /// Check if a frame is voiced
    pub fn is_voiced(&self, frame: usize) -> bool {
        self.get_value_at_frame(frame).is_some()
    }

    /// Get the time of a specific frame
    pub fn get_time_from_frame(&self, frame: usize) -> f64 {
        self.contour.frame_time(frame)
    }

    /// Get the frame index nearest to a specific time
    pub fn get_frame_from_time(&self, time: f64) -> usize {
        let position = (time - self.contour.start_time) / self.contour.time_step;
        let frame = position.round() as isize;
        frame.max(0).min(self.num_frames() as isize - 1).max(0) as usize
    }

    /// Per-frame values in `unit`, None for unvoiced frames
    pub fn values(&self, unit: PitchUnit) -> Vec<Option<f64>> {
        (0..self.num_frames())
            .map(|i| self.get_value_at_frame(i).map(|hz| unit.from_hertz(hz)))
            .collect()
    }

    pub fn num_frames(&self) -> usize {
        self.contour.num_frames()
    }

    pub fn time_step(&self) -> f64 {
        self.contour.time_step
    }

    /// Center time of the first frame
    pub fn start_time(&self) -> f64 {
        self.contour.start_time
    }

    /// Center time of the last frame
    pub fn end_time(&self) -> f64 {
        match self.num_frames() {
            0 => self.contour.start_time,
            n => self.contour.frame_time(n - 1),
        }
    }

    /// Minimum pitch over voiced frames
    pub fn min(&self) -> Option<f64> {
        self.voiced_values().reduce(f64::min)
    }

    /// Maximum pitch over voiced frames
    pub fn max(&self) -> Option<f64> {
        self.voiced_values().reduce(f64::max)
    }

    /// Mean pitch over voiced frames
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .voiced_values()
            .fold((0.0, 0usize), |(sum, count), f| (sum + f, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn count_voiced(&self) -> usize {
        self.voiced_values().count()
    }

    pub fn pitch_floor(&self) -> f64 {
        self.contour.pitch_floor
    }

    pub fn pitch_ceiling(&self) -> f64 {
        self.contour.pitch_ceiling
    }

    pub fn frames(&self) -> &[PitchFrame] {
        &self.contour.frames
    }
}

impl Sound {
    /// Pitch by autocorrelation (Hanning window) with standard settings
    pub fn to_pitch(&self, time_step: f64, pitch_floor: f64, pitch_ceiling: f64) -> Result<Pitch> {
        self.to_pitch_with_params(&PitchParameters::ac(time_step, pitch_floor, pitch_ceiling))
    }

    /// Pitch by forward cross-correlation with standard settings
    pub fn to_pitch_cc(
        &self,
        time_step: f64,
        pitch_floor: f64,
        pitch_ceiling: f64,
    ) -> Result<Pitch> {
        self.to_pitch_with_params(&PitchParameters::cc(time_step, pitch_floor, pitch_ceiling))
    }

    pub fn to_pitch_with_params(&self, params: &PitchParameters) -> Result<Pitch> {
        self.to_pitch_with(params, &mut NoProgress, &ViterbiPathFinder)
    }

    /// Full analysis with progress reporting and a custom path finder
    ///
    /// After the frame reports, `progress` sees 0.95 before path finding
    /// and 1.0 at the end; those two reports cannot cancel.
    pub fn to_pitch_with<P, F>(
        &self,
        params: &PitchParameters,
        progress: &mut P,
        finder: &F,
    ) -> Result<Pitch>
    where
        P: Progress + ?Sized,
        F: PathFinder + ?Sized,
    {
        let signal = self.as_buffer()?;
        let contour = analyze(&signal, params, progress)?;

        progress.update(0.95, "Sound to Pitch: path finder");
        let costs = PathCosts::from_parameters(params, contour.pitch_ceiling());
        let pitch = Pitch::from_contour(contour, &costs, finder)?;
        progress.update(1.0, "Sound to Pitch: done");
        Ok(pitch)
    }

    /// Like [`Sound::to_pitch_with_params`], analyzing frames in parallel
    #[cfg(feature = "parallel")]
    pub fn to_pitch_parallel(&self, params: &PitchParameters, cancel: &CancelFlag) -> Result<Pitch> {
        let signal = self.as_buffer()?;
        let contour = analyze_parallel(&signal, params, cancel, |_, _| true)?;
        let costs = PathCosts::from_parameters(params, contour.pitch_ceiling());
        Pitch::from_contour(contour, &costs, &ViterbiPathFinder)
    }
}
