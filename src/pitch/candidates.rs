//! Candidate search within one frame
//!
//! Local maxima of the correlation function above half the voicing
//! threshold become candidates. Each gets a parabolic first estimate of its
//! lag and a sinc-interpolated strength, then competes for a place in a
//! bounded candidate set. Survivors are refined by maximizing the
//! sinc-interpolated correlation around their peak.

use crate::interpolation::{improve_maximum, interpolate_sinc, PeakInterpolation};
use crate::pitch::correlation::CorrelationBuffer;
use crate::pitch::params::AnalysisSetup;

/// Depth of the sinc kernel for first strength estimates
const STRENGTH_INTERPOLATION_DEPTH: usize = 30;

/// A pitch candidate for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    /// Frequency in Hz (0.0 for unvoiced)
    pub frequency: f64,
    /// Strength (normalized correlation, at most 1)
    pub strength: f64,
}

impl PitchCandidate {
    /// The voiceless candidate every frame starts with
    pub const UNVOICED: PitchCandidate = PitchCandidate {
        frequency: 0.0,
        strength: 0.0,
    };

    pub fn is_unvoiced(&self) -> bool {
        self.frequency <= 0.0
    }
}

/// A single frame of pitch analysis
///
/// `candidates[0]` is always the unvoiced candidate. The others are in
/// arrival order, with evicted slots overwritten in place; they are not
/// sorted by strength.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchFrame {
    /// Local peak relative to the global peak, in `[0, 1]`
    pub intensity: f64,
    pub candidates: Vec<PitchCandidate>,
}

impl PitchFrame {
    /// A frame holding only the unvoiced candidate
    pub fn unvoiced(intensity: f64) -> Self {
        Self {
            intensity,
            candidates: vec![PitchCandidate::UNVOICED],
        }
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }
}

/// Reflect strengths above 1 (overshoot of the window correction) around 1
#[inline]
fn reflect_strength(strength: f64) -> f64 {
    if strength > 1.0 {
        1.0 / strength
    } else {
        strength
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    candidate: PitchCandidate,
    /// Lag of the correlation peak the candidate came from
    peak_lag: usize,
}

/// Fixed-capacity candidate set with octave-cost eviction
///
/// Slot 0 holds the unvoiced candidate and is never evicted. Once full, a
/// new candidate replaces the slot with the lowest octave-adjusted score,
/// but only if its own score is strictly higher.
///
/// Two peaks of the correlation are never on adjacent lags, so a scan of
/// lags below `max_lag` offers at most `max_lag / 2` candidates. Storage is
/// reserved for that many, however large the capacity.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    capacity: usize,
    pitch_floor: f64,
    octave_cost: f64,
    slots: Vec<Slot>,
}

impl CandidateSet {
    pub fn new(capacity: usize, max_lag: usize, pitch_floor: f64, octave_cost: f64) -> Self {
        let mut slots = Vec::with_capacity(capacity.min(max_lag / 2 + 1).max(1));
        slots.push(Slot {
            candidate: PitchCandidate::UNVOICED,
            peak_lag: 0,
        });
        Self {
            capacity,
            pitch_floor,
            octave_cost,
            slots,
        }
    }

    /// Strength with a bonus for high frequencies
    ///
    /// Favouring higher frequencies resolves a perfectly periodic signal to
    /// its true period rather than a multiple of it.
    pub fn octave_score(&self, candidate: &PitchCandidate) -> f64 {
        candidate.strength - self.octave_cost * (self.pitch_floor / candidate.frequency).log2()
    }

    /// Offer a voiced candidate; returns the slot it took, or None if rejected
    pub fn offer(&mut self, candidate: PitchCandidate, peak_lag: usize) -> Option<usize> {
        let slot = Slot {
            candidate,
            peak_lag,
        };
        if self.slots.len() < self.capacity {
            self.slots.push(slot);
            return Some(self.slots.len() - 1);
        }

        let mut weakest = f64::INFINITY;
        let mut place = None;
        for (index, existing) in self.slots.iter().enumerate().skip(1) {
            let score = self.octave_score(&existing.candidate);
            if score < weakest {
                weakest = score;
                place = Some(index);
            }
        }
        let place = place?;
        if self.octave_score(&candidate) <= weakest {
            return None;
        }
        self.slots[place] = slot;
        Some(place)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &PitchCandidate> {
        self.slots.iter().map(|slot| &slot.candidate)
    }

    pub fn into_frame(self, intensity: f64) -> PitchFrame {
        PitchFrame {
            intensity,
            candidates: self.slots.into_iter().map(|slot| slot.candidate).collect(),
        }
    }
}

/// Finds and refines the pitch candidates of a frame
#[derive(Debug, Clone, Copy)]
pub struct CandidateSelector<'a> {
    setup: &'a AnalysisSetup,
}

impl<'a> CandidateSelector<'a> {
    pub fn new(setup: &'a AnalysisSetup) -> Self {
        Self { setup }
    }

    /// Candidates of a non-silent frame with the given intensity
    pub fn select(&self, intensity: f64, r: &CorrelationBuffer) -> PitchFrame {
        let mut set = self.collect_peaks(r);
        self.refine(&mut set, r);
        set.into_frame(intensity)
    }

    /// First pass: local maxima with parabolic lag and sinc strength
    pub fn collect_peaks(&self, r: &CorrelationBuffer) -> CandidateSet {
        let setup = self.setup;
        let dx = setup.dx;
        let center = r.center() as f64;
        let threshold = 0.5 * setup.voicing_threshold;
        let last = setup.maximum_lag.min(setup.brent_ixmax).min(r.max_lag());
        let mut set = CandidateSet::new(
            setup.max_candidates,
            last,
            setup.pitch_floor,
            setup.octave_cost,
        );

        for i in 2..last {
            let lag = i as isize;
            let (prev, ri, next) = (r.value_at(lag - 1), r.value_at(lag), r.value_at(lag + 1));
            if !(ri > threshold && ri > prev && ri >= next) {
                continue;
            }
            let dr = 0.5 * (next - prev);
            let d2r = 2.0 * ri - prev - next;
            if !(d2r > 0.0) {
                continue;
            }
            let peak_lag = i as f64 + dr / d2r;
            let frequency = 1.0 / dx / peak_lag;
            let strength = interpolate_sinc(
                r.as_slice(),
                peak_lag + center,
                STRENGTH_INTERPOLATION_DEPTH,
            );
            set.offer(
                PitchCandidate {
                    frequency,
                    strength: reflect_strength(strength),
                },
                i,
            );
        }
        set
    }

    /// Kernel for refining a candidate first estimated at `frequency`
    ///
    /// Peaks within a few samples of lag zero need the long kernel whatever
    /// the method asks for.
    pub fn refinement_kernel(&self, frequency: f64) -> PeakInterpolation {
        if frequency > 0.3 / self.setup.dx {
            PeakInterpolation::Sinc700
        } else {
            self.setup.settings.peak_interpolation
        }
    }

    /// Second pass: maximize the interpolated correlation around each peak
    pub fn refine(&self, set: &mut CandidateSet, r: &CorrelationBuffer) {
        let setup = self.setup;
        let dx = setup.dx;
        let settings = &setup.settings;
        let center = r.center();

        for slot in set.slots.iter_mut().skip(1) {
            let kind = self.refinement_kernel(slot.candidate.frequency);
            let (x, y) = improve_maximum(
                r.as_slice(),
                slot.peak_lag + center,
                kind,
                settings.brent_accuracy,
            );
            let lag = x - center as f64;
            if lag > 0.0 {
                slot.candidate.frequency = 1.0 / dx / lag;
            }
            slot.candidate.strength = reflect_strength(y);
        }
    }
}
