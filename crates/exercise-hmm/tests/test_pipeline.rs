//! End-to-end tests for the fitting pipeline.
//!
//! All inputs are deterministic: noise comes from a fixed arithmetic pattern,
//! not from an RNG.

use exercise_hmm::config::HmmConfig;
use exercise_hmm::fit::{fit_emissions, fit_prior, fit_transitions};
use exercise_hmm::{
    fit_model, Corpus, FeatureVector, FitError, FrameLabel, GaussianHmm, Landmark, PoseFrame,
    NUM_FEATURES,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Small deterministic offset in roughly `[-0.014, 0.014]`.
fn wobble(i: usize, d: usize) -> f64 {
    ((i * 7 + d * 3) % 5) as f64 * 0.007 - 0.014
}

/// Vector near `center` with a per-frame, per-dimension wobble.
fn noisy(center: f64, i: usize) -> FeatureVector {
    let mut v = [0.0; NUM_FEATURES];
    for (d, x) in v.iter_mut().enumerate() {
        *x = center + wobble(i, d);
    }
    FeatureVector::new(v)
}

/// 20 extended frames near 0 and 20 flexed frames near 1, in blocks of 5
/// starting with extended. The flexed vectors are the extended ones shifted
/// by exactly 1, so both states share the same spread.
fn synthetic_corpus() -> Corpus {
    let mut corpus = Corpus::new();
    for block in 0..8 {
        for k in 0..5 {
            let i = (block / 2) * 5 + k;
            if block % 2 == 0 {
                corpus.push_labeled(noisy(0.0, i), FrameLabel::Extended);
            } else {
                corpus.push_labeled(noisy(1.0, i), FrameLabel::Flexed);
            }
        }
    }
    corpus
}

fn fitted_hmm(corpus: &Corpus, cfg: &HmmConfig) -> GaussianHmm {
    let emissions = fit_emissions(&corpus.by_label(), &cfg.fit).unwrap();
    let trans = fit_transitions(corpus.labels(), &cfg.fit);
    let prior = fit_prior(corpus.labels()[0], &cfg.fit);
    GaussianHmm::from_fitted(&prior, &trans, emissions)
}

/// A subject at `(ox, oy)` with body scale `scale`, both knees bent to
/// `knee_deg`.
fn pose(knee_deg: f64, ox: f64, oy: f64, scale: f64) -> PoseFrame {
    let rad = knee_deg.to_radians();
    let p = |x: f64, y: f64| Landmark::new(ox + x * scale, oy + y * scale, 0.95);
    let shin = (0.2 * rad.sin(), 0.2 * -rad.cos());
    PoseFrame {
        left_shoulder: p(-0.05, -0.45),
        right_shoulder: p(0.05, -0.45),
        left_hip: p(-0.04, -0.2),
        right_hip: p(0.04, -0.2),
        left_knee: p(-0.04, 0.0),
        right_knee: p(0.04, 0.0),
        left_ankle: p(-0.04 + shin.0, shin.1),
        right_ankle: p(0.04 + shin.0, shin.1),
    }
}

// ---------------------------------------------------------------------------
// Emission-level scenario
// ---------------------------------------------------------------------------

/// A held-out all-zero vector is more likely under the extended emission.
#[test]
fn held_out_zero_vector_prefers_extended() {
    let corpus = synthetic_corpus();
    assert_eq!(corpus.label_counts(), [20, 20]);

    let [extended, flexed] = fit_emissions(&corpus.by_label(), &HmmConfig::default().fit).unwrap();
    let x = FeatureVector::splat(0.0);
    assert!(extended.log_density(&x) > flexed.log_density(&x));
    assert!(extended.stds.iter().chain(&flexed.stds).all(|&s| s >= 1e-6));
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Zero-noise sequences at each fitted mean decode to that state at every
/// step, and the extended sequence (matching the prior) scores higher.
#[test]
fn decoder_self_consistency_on_fitted_model() {
    let cfg = HmmConfig::default();
    let hmm = fitted_hmm(&synthetic_corpus(), &cfg);

    let mut scores = Vec::new();
    for label in FrameLabel::ALL {
        let mean = FeatureVector::new(hmm.emissions[label.index()].means);
        let seq = vec![mean; 10];
        let decoded = hmm.decode(&seq).unwrap();
        assert!(
            decoded.path.iter().all(|&l| l == label),
            "{label}: {:?}",
            decoded.path
        );
        scores.push(decoded.log_likelihood);
    }
    assert!(scores[0] > scores[1], "extended {} vs flexed {}", scores[0], scores[1]);
}

/// Symmetric parameters give an all-extended path.
#[test]
fn decoder_tie_break_prefers_state_zero() {
    let corpus = synthetic_corpus();
    let cfg = HmmConfig::default();
    let mut hmm = fitted_hmm(&corpus, &cfg);
    hmm.log_prior = [0.5f64.ln(); 2];
    hmm.log_trans = [[0.5f64.ln(); 2]; 2];
    hmm.emissions[1] = hmm.emissions[0].clone();

    let decoded = hmm.decode(corpus.features()).unwrap();
    assert!(decoded.path.iter().all(|&l| l == FrameLabel::Extended));
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

/// Fitted parameters satisfy their probabilistic invariants.
#[test]
fn fitted_model_invariants() {
    let report = fit_model(&synthetic_corpus(), &HmmConfig::default()).unwrap();
    let m = &report.model;

    let prior: Vec<f64> = m.log_prior.iter().map(|l| l.exp()).collect();
    assert!((prior.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(prior[0] > prior[1], "first frame is extended");

    for row in m.log_trans {
        let probs: Vec<f64> = row.iter().map(|l| l.exp()).collect();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs.iter().all(|&p| p > 0.0));
    }

    // Blocks E F E F E F E F: three complete cycles.
    assert_eq!(report.repetitions.len(), 3);
    assert_eq!(report.log_likelihoods.len(), 3);
    assert!(m.std_log_likelihood >= 0.0);
    assert!((m.threshold_sigma - 2.0).abs() < f64::EPSILON);
}

/// Raw pose frames go through normalization, labeling, segmentation and
/// scoring; the subject drifts across the image and changes apparent size.
#[test]
fn raw_frames_to_model() {
    let cycle = [175.0, 175.0, 165.0, 140.0, 110.0, 85.0, 85.0, 110.0, 140.0, 165.0];
    let mut frames = Vec::new();
    for rep in 0..4 {
        for (k, &deg) in cycle.iter().enumerate() {
            let i = rep * cycle.len() + k;
            let drift = 0.002 * i as f64;
            let scale = 1.0 + 0.01 * (i % 4) as f64;
            frames.push(pose(deg + (i % 3) as f64, 0.5 + drift, 0.6, scale));
        }
    }
    frames.push(pose(178.0, 0.5, 0.6, 1.0));

    // An occluded frame is skipped, not fatal.
    let mut occluded = pose(175.0, 0.5, 0.6, 1.0);
    occluded.left_ankle.visibility = 0.05;
    frames.insert(3, occluded);

    let cfg = HmmConfig::default();
    let corpus = Corpus::from_frames(&frames, &cfg);
    assert_eq!(corpus.frames_skipped(), 1);
    assert_eq!(corpus.len(), frames.len() - 1);
    assert_eq!(corpus.labels()[0], FrameLabel::Extended);

    let report = fit_model(&corpus, &cfg).unwrap();
    assert_eq!(report.reps_detected(), 4);
    assert_eq!(report.frames_skipped, 1);
    for rep in &report.repetitions {
        let seq = &corpus.features()[rep.start..=rep.end];
        assert!(report.model.score_repetition(seq).unwrap().accepted);
    }
}

/// A clip where every frame is unusable aborts with `EmptyCorpus`.
#[test]
fn all_frames_unusable_is_fatal() {
    let mut frame = pose(175.0, 0.5, 0.5, 1.0);
    frame.right_hip.visibility = 0.0;
    let corpus = Corpus::from_frames(&[frame; 5], &HmmConfig::default());
    assert!(matches!(
        fit_model(&corpus, &HmmConfig::default()),
        Err(FitError::EmptyCorpus)
    ));
}

/// A clip that never bends the knees cannot fit a flexed emission.
#[test]
fn clip_without_flexion_is_fatal() {
    let frames: Vec<_> = (0..10).map(|i| pose(170.0 + i as f64, 0.5, 0.5, 1.0)).collect();
    let corpus = Corpus::from_frames(&frames, &HmmConfig::default());
    assert!(matches!(
        fit_model(&corpus, &HmmConfig::default()),
        Err(FitError::EmptyState { label: FrameLabel::Flexed })
    ));
}
