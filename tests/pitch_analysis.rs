//! Integration tests for pitch candidate analysis on synthetic signals
//!
//! Signals are generated in the tests (tones, harmonic complexes, silence,
//! and noise from a fixed linear congruential generator) so every run sees
//! identical input.

use approx::assert_relative_eq;
use praat_pitch::{
    analyze, Interpolation, PitchContour, PitchError, PitchMethod, PitchParameters, PitchUnit,
    Sound,
};
use std::f64::consts::PI;

const SAMPLE_RATE: f64 = 16000.0;

const ALL_METHODS: [PitchMethod; 4] = [
    PitchMethod::AcHanning,
    PitchMethod::AcGauss,
    PitchMethod::CcNormal,
    PitchMethod::CcAccurate,
];

fn params_for(method: PitchMethod) -> PitchParameters {
    match method {
        PitchMethod::CcNormal | PitchMethod::CcAccurate => {
            PitchParameters::cc(0.01, 75.0, 600.0).with_method(method)
        }
        _ => PitchParameters::ac(0.01, 75.0, 600.0).with_method(method),
    }
}

fn contour_of(sound: &Sound, params: &PitchParameters) -> PitchContour {
    let buffer = sound.as_buffer().unwrap();
    analyze(&buffer, params, &mut |_: f64, _: &str| true).unwrap()
}

/// Sum of the first `harmonics` harmonics of `f0` with 1/k amplitudes
fn harmonic_complex(f0: f64, harmonics: usize, duration: f64) -> Sound {
    let n = (duration * SAMPLE_RATE) as usize;
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (1..=harmonics)
                .map(|k| 0.3 / k as f64 * (2.0 * PI * f0 * k as f64 * t).sin())
                .sum()
        })
        .collect();
    Sound::from_samples_owned(samples, SAMPLE_RATE)
}

/// Uniform noise in [-0.5, 0.5) from a fixed-seed LCG
fn lcg_noise(duration: f64, seed: u64) -> Sound {
    let n = (duration * SAMPLE_RATE) as usize;
    let mut state = seed;
    let samples = (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        })
        .collect();
    Sound::from_samples_owned(samples, SAMPLE_RATE)
}

#[test]
fn test_frame_invariants_hold_for_all_methods() {
    let mut samples = harmonic_complex(140.0, 6, 0.6).samples().to_vec();
    let noise = lcg_noise(0.6, 7);
    for (s, n) in samples.iter_mut().zip(noise.samples()) {
        *s += 0.2 * n;
    }
    let sound = Sound::from_samples_owned(samples, SAMPLE_RATE);

    for method in ALL_METHODS {
        let contour = contour_of(&sound, &params_for(method));
        assert!(contour.num_frames() > 0, "{:?}", method);
        for frame in contour.frames() {
            assert!(!frame.candidates.is_empty());
            assert!(frame.candidates.len() <= contour.max_candidates());
            assert_eq!(frame.candidates[0].frequency, 0.0);
            assert_eq!(frame.candidates[0].strength, 0.0);
            assert!((0.0..=1.0).contains(&frame.intensity), "{:?}", method);
            for candidate in &frame.candidates {
                assert!(candidate.strength <= 1.0, "{:?}: {:?}", method, candidate);
            }
            for candidate in &frame.candidates[1..] {
                assert!(candidate.frequency > 0.0);
            }
        }
    }
}

#[test]
fn test_silence_gives_single_unvoiced_candidate() {
    let sound = Sound::create_silence(0.5, SAMPLE_RATE);
    for method in ALL_METHODS {
        let contour = contour_of(&sound, &params_for(method));
        assert!(contour.num_frames() > 0);
        for frame in contour.frames() {
            assert_eq!(frame.candidates.len(), 1);
            assert_eq!(frame.intensity, 0.0);
        }
    }
}

#[test]
fn test_sine_is_found_in_every_interior_frame() {
    let f0 = 180.0;
    let sound = Sound::create_tone(f0, 0.6, SAMPLE_RATE, 0.5, 0.0);

    for method in ALL_METHODS {
        let params = params_for(method);
        let contour = contour_of(&sound, &params);
        let n = contour.num_frames();
        for frame in &contour.frames()[1..n - 1] {
            let found = frame.candidates[1..].iter().any(|c| {
                (c.frequency - f0).abs() < 0.01 * f0 && c.strength > params.voicing_threshold
            });
            assert!(found, "{:?}: {:?}", method, frame.candidates);
        }
    }
}

#[test]
fn test_tone_near_nyquist_is_refined() {
    // At 1 kHz sampling a 350 Hz peak lies within three lags of zero
    let f0 = 350.0;
    let sound = Sound::create_tone(f0, 0.5, 1000.0, 0.5, 0.0);
    let params = PitchParameters::ac(0.01, 75.0, 500.0);
    let contour = contour_of(&sound, &params);
    let n = contour.num_frames();
    assert!(n > 2);
    for frame in &contour.frames()[1..n - 1] {
        for candidate in &frame.candidates {
            assert!(candidate.strength <= 1.0, "{:?}", candidate);
        }
        let found = frame.candidates[1..].iter().any(|c| {
            (c.frequency - f0).abs() < 0.01 * f0 && c.strength > params.voicing_threshold
        });
        assert!(found, "{:?}", frame.candidates);
    }
}

#[test]
fn test_infinite_ceiling_is_rejected() {
    let sound = Sound::create_tone(200.0, 0.5, SAMPLE_RATE, 0.5, 0.0);
    let params = PitchParameters::ac(0.01, 75.0, f64::INFINITY);
    let err = sound.to_pitch_with_params(&params).unwrap_err();
    assert!(matches!(err, PitchError::InvalidParameter(_)));
}

#[test]
fn test_huge_ceiling_keeps_frames_small() {
    let sound = Sound::create_tone(200.0, 0.3, SAMPLE_RATE, 0.5, 0.0);
    let contour = contour_of(&sound, &PitchParameters::ac(0.01, 75.0, 1e9));
    assert_eq!(contour.max_candidates(), 13_333_333);
    assert_relative_eq!(contour.pitch_ceiling(), 8000.0, epsilon = 1e-9);
    for frame in contour.frames() {
        assert!(frame.candidates.len() < 200);
        assert!(frame.candidates.capacity() < 200);
    }
}

#[test]
fn test_autocorrelation_and_cross_correlation_agree() {
    let sound = harmonic_complex(130.0, 4, 0.6);
    let ac = sound
        .to_pitch_with_params(&params_for(PitchMethod::AcHanning))
        .unwrap();
    let cc = sound
        .to_pitch_with_params(&params_for(PitchMethod::CcNormal))
        .unwrap();

    let ac_mean = ac.mean().unwrap();
    let cc_mean = cc.mean().unwrap();
    assert_relative_eq!(ac_mean, 130.0, epsilon = 1.3);
    assert_relative_eq!(cc_mean, 130.0, epsilon = 1.3);
    assert_relative_eq!(ac_mean, cc_mean, epsilon = 1.3);
}

#[test]
fn test_harmonic_complex_tracks_fundamental() {
    let sound = harmonic_complex(110.0, 8, 0.8);
    let pitch = sound.to_pitch(0.0, 75.0, 600.0).unwrap();

    assert!(pitch.count_voiced() >= pitch.num_frames() - 2);
    assert_relative_eq!(pitch.min().unwrap(), 110.0, epsilon = 1.5);
    assert_relative_eq!(pitch.max().unwrap(), 110.0, epsilon = 1.5);

    let semitones = pitch
        .get_value_at_time(0.4, PitchUnit::SemitonesRe100Hz, Interpolation::Linear)
        .unwrap();
    assert_relative_eq!(semitones, 12.0 * (1.1f64).log2(), epsilon = 0.25);
}

#[test]
fn test_noise_is_mostly_unvoiced() {
    let sound = lcg_noise(1.0, 42);
    let pitch = sound.to_pitch(0.0, 75.0, 600.0).unwrap();
    assert!(
        pitch.count_voiced() * 4 <= pitch.num_frames(),
        "{} of {} frames voiced",
        pitch.count_voiced(),
        pitch.num_frames()
    );
}

#[test]
fn test_repeated_runs_are_identical() {
    let sound = harmonic_complex(200.0, 5, 0.5);
    for method in ALL_METHODS {
        let params = params_for(method);
        assert_eq!(contour_of(&sound, &params), contour_of(&sound, &params));
    }
}

#[test]
fn test_cancel_after_k_frames() {
    let sound = Sound::create_tone(200.0, 0.5, SAMPLE_RATE, 0.5, 0.0);
    let buffer = sound.as_buffer().unwrap();
    let k = 5;

    let mut frame_reports = 0;
    let mut fractions = Vec::new();
    let mut sink = |fraction: f64, message: &str| {
        fractions.push(fraction);
        if message.starts_with("Sound to Pitch: analysis of frame") {
            frame_reports += 1;
            return frame_reports < k;
        }
        true
    };
    let result = analyze(&buffer, &PitchParameters::default(), &mut sink);

    assert!(matches!(result, Err(PitchError::Cancelled)));
    assert_eq!(frame_reports, k);
    assert_eq!(fractions[0], 0.0);
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_full_run_reports_completion() {
    let sound = Sound::create_tone(200.0, 0.3, SAMPLE_RATE, 0.5, 0.0);
    let mut last = (0.0, String::new());
    let mut sink = |fraction: f64, message: &str| {
        last = (fraction, message.to_string());
        true
    };
    let pitch = sound
        .to_pitch_with(
            &PitchParameters::default(),
            &mut sink,
            &praat_pitch::ViterbiPathFinder,
        )
        .unwrap();
    assert!(pitch.num_frames() > 0);
    assert_eq!(last.0, 1.0);
}

#[test]
fn test_configuration_errors() {
    let sound = Sound::create_tone(200.0, 0.5, SAMPLE_RATE, 0.5, 0.0);

    // 3 periods of 5 Hz do not fit into 0.5 s
    let err = sound.to_pitch(0.0, 5.0, 600.0).unwrap_err();
    assert!(matches!(err, PitchError::InvalidParameter(_)));

    let mut params = PitchParameters::default();
    params.max_candidates = 1;
    let err = sound.to_pitch_with_params(&params).unwrap_err();
    assert!(matches!(err, PitchError::InvalidParameter(_)));

    // At 100 Hz sampling a 40 ms window has 4 samples
    let coarse = Sound::create_tone(20.0, 0.5, 100.0, 0.5, 0.0);
    let err = coarse.to_pitch(0.0, 75.0, 600.0).unwrap_err();
    assert!(matches!(err, PitchError::InvalidParameter(_)));
}

#[test]
fn test_signal_shorter_than_cross_correlation_span() {
    // Long enough for the window itself but not for window plus one period
    let sound = Sound::create_tone(200.0, 0.025, SAMPLE_RATE, 0.5, 0.0);
    let err = sound.to_pitch_cc(0.0, 75.0, 600.0).unwrap_err();
    assert!(matches!(err, PitchError::SignalTooShort { .. }));
}

#[test]
fn test_wav_file_roundtrip() {
    let path = std::env::temp_dir().join(format!("praat_pitch_test_{}.wav", std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    {
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..8000 {
            let t = i as f64 / 16000.0;
            let value = 0.4 * (2.0 * PI * 220.0 * t).sin();
            writer.write_sample((value * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    let sound = Sound::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(sound.sample_rate(), 16000.0);
    assert_eq!(sound.num_samples(), 8000);
    let pitch = sound.to_pitch(0.0, 75.0, 600.0).unwrap();
    assert_relative_eq!(pitch.mean().unwrap(), 220.0, epsilon = 2.0);
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    use praat_pitch::{analyze_parallel, CancelFlag};

    let sound = harmonic_complex(160.0, 5, 0.6);
    let buffer = sound.as_buffer().unwrap();
    for method in ALL_METHODS {
        let params = params_for(method);
        let sequential = contour_of(&sound, &params);
        let parallel =
            analyze_parallel(&buffer, &params, &CancelFlag::new(), |_, _| true).unwrap();
        assert_eq!(sequential, parallel, "{:?}", method);
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_cancellation() {
    use praat_pitch::{analyze_parallel, CancelFlag};

    let sound = Sound::create_tone(200.0, 0.5, SAMPLE_RATE, 0.5, 0.0);
    let buffer = sound.as_buffer().unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = analyze_parallel(&buffer, &PitchParameters::default(), &cancel, |_, _| true);
    assert!(matches!(result, Err(PitchError::Cancelled)));
}
