//! Maximum-likelihood parameter fitting from a labeled corpus.
//!
//! Because every frame carries a label, the HMM parameters are estimated
//! directly by counting rather than by Baum-Welch:
//!
//! - [`fit_emissions`]: per-label diagonal Gaussian over the feature vectors.
//! - [`fit_transitions`]: Laplace-smoothed label-to-label transition matrix.
//! - [`fit_prior`]: initial distribution concentrated on the first label.

use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::error::{FitError, FitResult};
use crate::types::{FeatureVector, FrameLabel, NUM_FEATURES, NUM_STATES};

// ---------------------------------------------------------------------------
// GaussianEmission
// ---------------------------------------------------------------------------

/// Diagonal-covariance Gaussian emission density for one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianEmission {
    /// Per-dimension mean.
    pub means: [f64; NUM_FEATURES],
    /// Per-dimension standard deviation, floored at a positive epsilon.
    pub stds: [f64; NUM_FEATURES],
}

impl GaussianEmission {
    /// Fit mean and population standard deviation over `vectors`.
    ///
    /// Returns `None` for an empty input.
    #[must_use]
    pub fn fit(vectors: &[FeatureVector], std_floor: f64) -> Option<Self> {
        if vectors.is_empty() {
            return None;
        }
        let n = vectors.len() as f64;

        let mut means = [0.0; NUM_FEATURES];
        for v in vectors {
            for (m, x) in means.iter_mut().zip(v.as_slice()) {
                *m += x;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut stds = [0.0; NUM_FEATURES];
        for v in vectors {
            for ((s, x), m) in stds.iter_mut().zip(v.as_slice()).zip(&means) {
                let d = x - m;
                *s += d * d;
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt().max(std_floor);
        }

        Some(Self { means, stds })
    }

    /// Normalising constant `-0.5 * Σ_d ln(2π σ_d²)`.
    #[must_use]
    pub fn log_norm(&self) -> f64 {
        -0.5 * self
            .stds
            .iter()
            .map(|s| (2.0 * std::f64::consts::PI * s * s).ln())
            .sum::<f64>()
    }

    /// Log density of `x` given a precomputed [`log_norm`](Self::log_norm).
    #[must_use]
    pub fn log_density_with_norm(&self, x: &FeatureVector, log_norm: f64) -> f64 {
        let quad: f64 = x
            .as_slice()
            .iter()
            .zip(&self.means)
            .zip(&self.stds)
            .map(|((x, m), s)| {
                let d = x - m;
                d * d / (2.0 * s * s)
            })
            .sum();
        log_norm - quad
    }

    /// Log density of `x` under this emission.
    #[must_use]
    pub fn log_density(&self, x: &FeatureVector) -> f64 {
        self.log_density_with_norm(x, self.log_norm())
    }
}

/// Fit one emission per label from feature vectors grouped by label.
///
/// `by_label[s]` holds the vectors labeled with state `s`.
///
/// # Errors
///
/// [`FitError::EmptyState`] if any label has no vectors.
pub fn fit_emissions(
    by_label: &[Vec<FeatureVector>; NUM_STATES],
    cfg: &FitConfig,
) -> FitResult<[GaussianEmission; NUM_STATES]> {
    let fit_one = |label: FrameLabel| {
        GaussianEmission::fit(&by_label[label.index()], cfg.std_floor)
            .ok_or(FitError::EmptyState { label })
    };
    Ok([fit_one(FrameLabel::Extended)?, fit_one(FrameLabel::Flexed)?])
}

// ---------------------------------------------------------------------------
// TransitionMatrix
// ---------------------------------------------------------------------------

/// Row-stochastic state transition matrix; `probs[from][to]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    /// Transition probabilities.
    pub probs: [[f64; NUM_STATES]; NUM_STATES],
}

impl TransitionMatrix {
    /// Element-wise natural log.
    #[must_use]
    pub fn log(&self) -> [[f64; NUM_STATES]; NUM_STATES] {
        self.probs.map(|row| row.map(f64::ln))
    }
}

/// Fit a transition matrix from a label sequence with additive smoothing.
///
/// Every cell starts at `cfg.transition_pseudocount`, so the result has no
/// zero entries even for an empty or single-frame sequence.
#[must_use]
pub fn fit_transitions(labels: &[FrameLabel], cfg: &FitConfig) -> TransitionMatrix {
    let mut counts = [[cfg.transition_pseudocount; NUM_STATES]; NUM_STATES];
    for pair in labels.windows(2) {
        counts[pair[0].index()][pair[1].index()] += 1.0;
    }
    for row in &mut counts {
        let total: f64 = row.iter().sum();
        row.iter_mut().for_each(|c| *c /= total);
    }
    TransitionMatrix { probs: counts }
}

// ---------------------------------------------------------------------------
// PriorDistribution
// ---------------------------------------------------------------------------

/// Initial state distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorDistribution {
    /// Per-state probability.
    pub probs: [f64; NUM_STATES],
}

impl PriorDistribution {
    /// Element-wise natural log.
    #[must_use]
    pub fn log(&self) -> [f64; NUM_STATES] {
        self.probs.map(f64::ln)
    }

    /// State with the largest probability (lowest index on ties).
    #[must_use]
    pub fn dominant(&self) -> FrameLabel {
        let idx = crate::viterbi::argmax_first(&self.probs);
        FrameLabel::from_index(idx).unwrap_or(FrameLabel::Extended)
    }
}

/// Build a prior that puts almost all mass on `first`.
#[must_use]
pub fn fit_prior(first: FrameLabel, cfg: &FitConfig) -> PriorDistribution {
    let mut probs = [cfg.prior_floor; NUM_STATES];
    probs[first.index()] = 1.0;
    let total: f64 = probs.iter().sum();
    probs.iter_mut().for_each(|p| *p /= total);
    PriorDistribution { probs }
}
