//! Choosing one candidate per frame
//!
//! The frame analysis leaves several candidates per frame. A [`PathFinder`]
//! picks one per frame for the final track. [`ViterbiPathFinder`] is the
//! standard choice: dynamic programming over local candidate scores and
//! transition costs for octave jumps and voicing changes.

use crate::pitch::params::PitchParameters;
use crate::pitch::PitchContour;

/// Costs and thresholds the path search weighs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCosts {
    pub silence_threshold: f64,
    pub voicing_threshold: f64,
    pub octave_cost: f64,
    pub octave_jump_cost: f64,
    pub voiced_unvoiced_cost: f64,
    /// Candidates at or above this frequency count as voiceless
    pub ceiling: f64,
}

impl PathCosts {
    /// Costs from the analysis parameters, with the ceiling actually used
    pub fn from_parameters(params: &PitchParameters, ceiling: f64) -> Self {
        Self {
            silence_threshold: params.silence_threshold,
            voicing_threshold: params.voicing_threshold,
            octave_cost: params.octave_cost,
            octave_jump_cost: params.octave_jump_cost,
            voiced_unvoiced_cost: params.voiced_unvoiced_cost,
            ceiling,
        }
    }
}

/// Selects one candidate index per frame
pub trait PathFinder {
    /// Returns a vector with one entry per frame, each a valid index into
    /// that frame's candidates
    fn find_path(&self, contour: &PitchContour, costs: &PathCosts) -> Vec<usize>;
}

/// Viterbi search maximizing local strength minus transition costs
#[derive(Debug, Clone, Copy, Default)]
pub struct ViterbiPathFinder;

impl ViterbiPathFinder {
    fn is_voiceless(frequency: f64, ceiling: f64) -> bool {
        frequency <= 0.0 || frequency >= ceiling
    }
}

impl PathFinder for ViterbiPathFinder {
    fn find_path(&self, contour: &PitchContour, costs: &PathCosts) -> Vec<usize> {
        let frames = contour.frames();
        let num_frames = frames.len();
        if num_frames == 0 {
            return Vec::new();
        }

        let ceiling = costs.ceiling;
        let voicing_threshold = costs.voicing_threshold;

        // Costs are specified per 10 ms
        let time_step_correction = 0.01 / contour.time_step();
        let octave_jump_cost = costs.octave_jump_cost * time_step_correction;
        let voiced_unvoiced_cost = costs.voiced_unvoiced_cost * time_step_correction;

        // Local scores
        let mut delta: Vec<Vec<f64>> = frames
            .iter()
            .map(|frame| {
                let unvoiced_strength = if costs.silence_threshold <= 0.0 {
                    voicing_threshold
                } else {
                    let relative =
                        frame.intensity / (costs.silence_threshold / (1.0 + voicing_threshold));
                    voicing_threshold + (2.0 - relative).max(0.0)
                };
                frame
                    .candidates
                    .iter()
                    .map(|candidate| {
                        if Self::is_voiceless(candidate.frequency, ceiling) {
                            unvoiced_strength
                        } else {
                            candidate.strength
                                - costs.octave_cost * (ceiling / candidate.frequency).log2()
                        }
                    })
                    .collect()
            })
            .collect();
        let mut psi: Vec<Vec<usize>> = frames
            .iter()
            .map(|frame| vec![0; frame.candidates.len()])
            .collect();

        // Forward pass
        for iframe in 1..num_frames {
            let (done, rest) = delta.split_at_mut(iframe);
            let previous_delta = &done[iframe - 1];
            let current_delta = &mut rest[0];
            let previous = &frames[iframe - 1].candidates;
            let current = &frames[iframe].candidates;

            for (icand2, candidate2) in current.iter().enumerate() {
                let f2 = candidate2.frequency;
                let current_voiceless = Self::is_voiceless(f2, ceiling);

                let mut maximum = f64::NEG_INFINITY;
                let mut place = 0;
                for (icand1, candidate1) in previous.iter().enumerate() {
                    let f1 = candidate1.frequency;
                    let previous_voiceless = Self::is_voiceless(f1, ceiling);

                    let transition_cost = match (previous_voiceless, current_voiceless) {
                        (true, true) => 0.0,
                        (true, false) | (false, true) => voiced_unvoiced_cost,
                        (false, false) => octave_jump_cost * (f1 / f2).log2().abs(),
                    };

                    let value = previous_delta[icand1] - transition_cost;
                    if value > maximum {
                        maximum = value;
                        place = icand1;
                    }
                }

                current_delta[icand2] += maximum;
                psi[iframe][icand2] = place;
            }
        }

        // Best final state
        let last = &delta[num_frames - 1];
        let mut place = 0;
        let mut maximum = last.first().copied().unwrap_or(f64::NEG_INFINITY);
        for (icand, &score) in last.iter().enumerate() {
            if score > maximum {
                maximum = score;
                place = icand;
            }
        }

        // Backtrack
        let mut path = vec![0; num_frames];
        for iframe in (0..num_frames).rev() {
            path[iframe] = place;
            place = psi[iframe][place];
        }
        path
    }
}
