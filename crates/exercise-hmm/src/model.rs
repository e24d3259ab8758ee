//! Fitted model export and persistence.
//!
//! [`fit_model`] runs the fitting half of the pipeline over a complete
//! [`Corpus`]: emissions, transitions and prior are estimated, the label
//! sequence is segmented into repetitions, and every repetition is scored
//! with the Viterbi decoder. The per-repetition log-likelihoods define the
//! acceptance band stored alongside the parameters in [`ModelParameters`].
//!
//! The JSON layout uses camelCase keys:
//!
//! ```text
//! { "numStates": 2, "numFeatures": 16,
//!   "logPrior": [..2], "logTrans": [[..2], [..2]],
//!   "emissions": [{ "means": [..16], "stds": [..16] }, ..],
//!   "meanLogLikelihood": f, "stdLogLikelihood": f, "thresholdSigma": 2.0 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::config::HmmConfig;
use crate::corpus::Corpus;
use crate::error::{FitError, FitResult};
use crate::fit::{fit_emissions, fit_prior, fit_transitions, GaussianEmission};
use crate::segment::segment;
use crate::types::{FeatureVector, FrameLabel, Repetition, NUM_FEATURES, NUM_STATES};
use crate::viterbi::GaussianHmm;

// ---------------------------------------------------------------------------
// ModelParameters
// ---------------------------------------------------------------------------

/// Persisted model: log-domain HMM parameters plus the repetition
/// log-likelihood statistics used to flag anomalous repetitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParameters {
    /// Number of latent states; always 2.
    pub num_states: usize,
    /// Feature dimensionality; always 16.
    pub num_features: usize,
    /// Natural-log initial distribution.
    pub log_prior: [f64; NUM_STATES],
    /// Natural-log transition matrix, `[from][to]`.
    pub log_trans: [[f64; NUM_STATES]; NUM_STATES],
    /// Per-state emission densities.
    pub emissions: [GaussianEmission; NUM_STATES],
    /// Mean Viterbi log-likelihood over the training repetitions.
    pub mean_log_likelihood: f64,
    /// Population std of the training repetition log-likelihoods.
    pub std_log_likelihood: f64,
    /// Width of the acceptance band in standard deviations.
    pub threshold_sigma: f64,
}

/// Result of scoring one candidate repetition against a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RepetitionScore {
    /// Viterbi log-likelihood of the candidate.
    pub log_likelihood: f64,
    /// Signed distance from the training mean, in training standard
    /// deviations.
    pub z_score: f64,
    /// Whether the log-likelihood is at or above the acceptance threshold.
    pub accepted: bool,
}

impl ModelParameters {
    /// The decoder view of these parameters.
    #[must_use]
    pub fn hmm(&self) -> GaussianHmm {
        GaussianHmm {
            log_prior: self.log_prior,
            log_trans: self.log_trans,
            emissions: self.emissions.clone(),
        }
    }

    /// Log-likelihood below which a repetition is considered anomalous:
    /// `mean − threshold_sigma · std`.
    #[must_use]
    pub fn acceptance_threshold(&self) -> f64 {
        self.mean_log_likelihood - self.threshold_sigma * self.std_log_likelihood
    }

    /// Decode a candidate repetition and compare it with the band.
    ///
    /// # Errors
    ///
    /// [`FitError::EmptySequence`] if `seq` is empty.
    pub fn score_repetition(&self, seq: &[FeatureVector]) -> FitResult<RepetitionScore> {
        let ll = self.hmm().decode(seq)?.log_likelihood;
        let z_score = if self.std_log_likelihood > 0.0 {
            (ll - self.mean_log_likelihood) / self.std_log_likelihood
        } else {
            0.0
        };
        Ok(RepetitionScore {
            log_likelihood: ll,
            z_score,
            accepted: ll >= self.acceptance_threshold(),
        })
    }

    /// Check shape constants and that every number is usable.
    ///
    /// # Errors
    ///
    /// [`FitError::DimensionMismatch`] for wrong `numStates` / `numFeatures`,
    /// [`FitError::InvalidModel`] for non-finite values or non-positive
    /// standard deviations.
    pub fn validate(&self) -> FitResult<()> {
        if self.num_states != NUM_STATES {
            return Err(FitError::DimensionMismatch {
                expected: NUM_STATES,
                actual: self.num_states,
            });
        }
        if self.num_features != NUM_FEATURES {
            return Err(FitError::DimensionMismatch {
                expected: NUM_FEATURES,
                actual: self.num_features,
            });
        }

        // Fitted probabilities are floored, so every log is finite. JSON has
        // no encoding for infinities; -inf would be written as `null`.
        let bad_log = |v: &f64| !v.is_finite();
        if self.log_prior.iter().any(bad_log) || self.log_trans.iter().flatten().any(bad_log) {
            return Err(FitError::invalid_model("log probabilities must be finite"));
        }
        for (s, e) in self.emissions.iter().enumerate() {
            if e.means.iter().any(|m| !m.is_finite()) {
                return Err(FitError::invalid_model(format!("state {s} has a non-finite mean")));
            }
            if e.stds.iter().any(|sd| !(sd.is_finite() && *sd > 0.0)) {
                return Err(FitError::invalid_model(format!(
                    "state {s} has a non-positive standard deviation"
                )));
            }
        }
        for (name, v) in [
            ("meanLogLikelihood", self.mean_log_likelihood),
            ("stdLogLikelihood", self.std_log_likelihood),
            ("thresholdSigma", self.threshold_sigma),
        ] {
            if !v.is_finite() {
                return Err(FitError::invalid_model(format!("{name} must be finite, got {v}")));
            }
        }
        Ok(())
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`FitError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> FitResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a model from JSON text.
    ///
    /// # Errors
    ///
    /// [`FitError::Json`] for malformed input, or any error from
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> FitResult<Self> {
        let model: ModelParameters = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model as JSON, creating parent directories if necessary.
    ///
    /// # Errors
    ///
    /// [`FitError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> FitResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FitError::io(parent, e))?;
        }
        std::fs::write(path, self.to_json_string()?).map_err(|e| FitError::io(path, e))
    }

    /// Read and validate a model from a JSON file.
    ///
    /// # Errors
    ///
    /// [`FitError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: &Path) -> FitResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| FitError::io(path, e))?;
        Self::from_json_str(&json)
    }
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Everything produced by one [`fit_model`] run.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// The exported model.
    pub model: ModelParameters,
    /// Repetitions that were scored. When segmentation found none, this
    /// holds the single whole-clip fallback.
    pub repetitions: Vec<Repetition>,
    /// Viterbi log-likelihood per entry of `repetitions`.
    pub log_likelihoods: Vec<f64>,
    /// Whether the whole-clip fallback was used.
    pub used_fallback: bool,
    /// Usable frames per label.
    pub label_counts: [usize; NUM_STATES],
    /// Frames dropped during the forward pass.
    pub frames_skipped: usize,
}

impl FitReport {
    /// Number of repetitions detected by segmentation (0 if the fallback
    /// was used).
    #[must_use]
    pub fn reps_detected(&self) -> usize {
        if self.used_fallback {
            0
        } else {
            self.repetitions.len()
        }
    }
}

/// Mean and population standard deviation of `values`.
///
/// With fewer than two values the std is `fallback_std`; an empty slice
/// gives a mean of 0.
#[must_use]
pub fn log_likelihood_stats(values: &[f64], fallback_std: f64) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, fallback_std);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, fallback_std);
    }
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Viterbi log-likelihood of each repetition's feature sub-sequence
/// `features[start..=end]`.
///
/// # Errors
///
/// [`FitError::RepetitionOutOfBounds`] if a repetition does not fit in
/// `features`.
pub fn score_repetitions(
    hmm: &GaussianHmm,
    features: &[FeatureVector],
    repetitions: &[Repetition],
) -> FitResult<Vec<f64>> {
    repetitions
        .iter()
        .map(|rep| {
            if rep.is_empty() || rep.end >= features.len() {
                return Err(FitError::RepetitionOutOfBounds {
                    start: rep.start,
                    end: rep.end,
                    len: features.len(),
                });
            }
            Ok(hmm.decode(&features[rep.start..=rep.end])?.log_likelihood)
        })
        .collect()
}

/// Fit a model from a complete corpus.
///
/// # Errors
///
/// - [`FitError::Config`] if `cfg` fails validation.
/// - [`FitError::EmptyCorpus`] if the corpus has no usable frames.
/// - [`FitError::EmptyState`] if one label has no frames.
/// - [`FitError::InvalidModel`] if the fitted parameters are not finite.
pub fn fit_model(corpus: &Corpus, cfg: &HmmConfig) -> FitResult<FitReport> {
    cfg.validate()?;
    if corpus.is_empty() {
        return Err(FitError::EmptyCorpus);
    }
    let features = corpus.features();
    let labels = corpus.labels();

    let emissions = fit_emissions(&corpus.by_label(), &cfg.fit)?;
    let trans = fit_transitions(labels, &cfg.fit);
    let first = labels.first().copied().unwrap_or(FrameLabel::Extended);
    let prior = fit_prior(first, &cfg.fit);
    let hmm = GaussianHmm::from_fitted(&prior, &trans, emissions);

    let mut repetitions = segment(labels, &cfg.segmenter);
    let used_fallback = repetitions.is_empty();
    if used_fallback {
        warn!("No reps detected; treating whole clip as one rep");
        repetitions.push(Repetition::new(0, features.len() - 1));
    }

    let log_likelihoods = score_repetitions(&hmm, features, &repetitions)?;
    let (mean, std) = log_likelihood_stats(&log_likelihoods, cfg.fallback_std);
    info!(
        "Scored {} repetition(s): mean log-likelihood {:.2}, std {:.2}",
        repetitions.len(),
        mean,
        std
    );

    let GaussianHmm { log_prior, log_trans, emissions } = hmm;
    let model = ModelParameters {
        num_states: NUM_STATES,
        num_features: NUM_FEATURES,
        log_prior,
        log_trans,
        emissions,
        mean_log_likelihood: mean,
        std_log_likelihood: std,
        threshold_sigma: cfg.threshold_sigma,
    };
    model.validate()?;

    Ok(FitReport {
        model,
        repetitions,
        log_likelihoods,
        used_fallback,
        label_counts: corpus.label_counts(),
        frames_skipped: corpus.frames_skipped(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(bits: &[u8]) -> Corpus {
        let mut c = Corpus::new();
        for (i, &b) in bits.iter().enumerate() {
            let jitter = 0.01 * (i % 3) as f64;
            let (v, l) = if b == 0 {
                (jitter, FrameLabel::Extended)
            } else {
                (1.0 + jitter, FrameLabel::Flexed)
            };
            c.push_labeled(FeatureVector::splat(v), l);
        }
        c
    }

    #[test]
    fn stats_population_std_and_fallback() {
        let (m, s) = log_likelihood_stats(&[1.0, 3.0], 1.0);
        assert!((m - 2.0).abs() < 1e-12 && (s - 1.0).abs() < 1e-12);
        let (m, s) = log_likelihood_stats(&[-5.0], 1.0);
        assert!((m + 5.0).abs() < 1e-12 && (s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let err = fit_model(&Corpus::new(), &HmmConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::EmptyCorpus));
    }

    #[test]
    fn missing_flexed_frames_is_fatal() {
        let err = fit_model(&labeled(&[0, 0, 0]), &HmmConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::EmptyState { label: FrameLabel::Flexed }));
    }

    #[test]
    fn fit_reports_segmented_repetitions() {
        let report = fit_model(&labeled(&[0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 0]), &HmmConfig::default())
            .unwrap();
        assert!(!report.used_fallback);
        assert_eq!(report.repetitions, vec![Repetition::new(0, 5), Repetition::new(5, 10)]);
        assert_eq!(report.log_likelihoods.len(), 2);
        assert_eq!(report.reps_detected(), 2);
        assert_eq!(report.model.threshold_sigma, 2.0);
        report.model.validate().unwrap();
    }

    #[test]
    fn no_repetitions_falls_back_to_whole_clip() {
        let report = fit_model(&labeled(&[1, 1, 0, 0]), &HmmConfig::default()).unwrap();
        assert!(report.used_fallback);
        assert_eq!(report.repetitions, vec![Repetition::new(0, 3)]);
        assert_eq!(report.reps_detected(), 0);
        assert_eq!(report.model.std_log_likelihood, 1.0);
        assert_eq!(report.model.mean_log_likelihood, report.log_likelihoods[0]);
    }

    #[test]
    fn out_of_bounds_repetition_rejected() {
        let report = fit_model(&labeled(&[0, 1, 0]), &HmmConfig::default()).unwrap();
        let hmm = report.model.hmm();
        let err = score_repetitions(&hmm, &[FeatureVector::splat(0.0)], &[Repetition::new(0, 2)])
            .unwrap_err();
        assert!(matches!(err, FitError::RepetitionOutOfBounds { len: 1, .. }));
    }

    #[test]
    fn non_finite_input_is_skipped_and_model_stays_loadable() {
        let mut c = labeled(&[0, 1]);
        assert_eq!(c.push_labeled(FeatureVector::splat(f64::NAN), FrameLabel::Flexed), None);
        c.push_labeled(FeatureVector::splat(1.0), FrameLabel::Flexed);
        c.push_labeled(FeatureVector::splat(0.0), FrameLabel::Extended);

        let report = fit_model(&c, &HmmConfig::default()).unwrap();
        assert_eq!(report.frames_skipped, 1);
        assert_eq!(report.label_counts, [2, 2]);
        for e in &report.model.emissions {
            assert!(e.means.iter().chain(&e.stds).all(|v| v.is_finite()));
        }
        let json = report.model.to_json_string().unwrap();
        assert!(!json.contains("null"), "{json}");
        ModelParameters::from_json_str(&json).unwrap();
    }

    #[test]
    fn negative_infinite_log_probability_is_rejected() {
        let mut model = fit_model(&labeled(&[0, 1, 0]), &HmmConfig::default()).unwrap().model;
        model.log_prior[1] = f64::NEG_INFINITY;
        assert!(matches!(model.validate(), Err(FitError::InvalidModel(_))));

        let mut model = fit_model(&labeled(&[0, 1, 0]), &HmmConfig::default()).unwrap().model;
        model.log_trans[0][1] = f64::NEG_INFINITY;
        assert!(matches!(model.validate(), Err(FitError::InvalidModel(_))));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let report = fit_model(&labeled(&[0, 1, 0]), &HmmConfig::default()).unwrap();
        let json = report.model.to_json_string().unwrap();
        for key in [
            "numStates",
            "numFeatures",
            "logPrior",
            "logTrans",
            "emissions",
            "means",
            "stds",
            "meanLogLikelihood",
            "stdLogLikelihood",
            "thresholdSigma",
        ] {
            assert!(json.contains(&format!("\"{key}\"")), "missing {key}");
        }
    }

    #[test]
    fn wrong_state_count_rejected_on_load() {
        let report = fit_model(&labeled(&[0, 1, 0]), &HmmConfig::default()).unwrap();
        let mut model = report.model;
        model.num_states = 3;
        let json = serde_json::to_string(&model).unwrap();
        assert!(matches!(
            ModelParameters::from_json_str(&json),
            Err(FitError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn training_repetitions_are_accepted() {
        let corpus = labeled(&[0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0]);
        let report = fit_model(&corpus, &HmmConfig::default()).unwrap();
        for rep in &report.repetitions {
            let score = report
                .model
                .score_repetition(&corpus.features()[rep.start..=rep.end])
                .unwrap();
            assert!(score.accepted, "{rep:?} rejected: {score:?}");
        }
    }
}
