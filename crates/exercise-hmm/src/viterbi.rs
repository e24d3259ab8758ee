//! Log-domain Viterbi decoding for the two-state Gaussian HMM.
//!
//! Given a feature sub-sequence `x[0..T]`, the decoder fills
//!
//! ```text
//! dp[0, s] = log_prior[s] + log_emit[0, s]
//! dp[t, s] = max_{s'} (dp[t-1, s'] + log_trans[s', s]) + log_emit[t, s]
//! ```
//!
//! and backtracks from the best final state. Every argmax, in the recursion
//! and at termination, resolves ties to the lowest state index so the
//! decoded path is fully deterministic.

use ndarray::Array2;

use crate::error::{FitError, FitResult};
use crate::fit::{GaussianEmission, PriorDistribution, TransitionMatrix};
use crate::types::{FeatureVector, FrameLabel, NUM_STATES};

/// Index of the maximum element, choosing the first on ties.
///
/// Returns 0 for an empty slice.
#[must_use]
pub fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Output of [`GaussianHmm::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Most likely state for every frame.
    pub path: Vec<FrameLabel>,
    /// Joint log-likelihood of `path` and the observations (not normalized
    /// by sequence length).
    pub log_likelihood: f64,
}

/// Two-state HMM with diagonal Gaussian emissions, held in log form.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianHmm {
    /// Natural-log initial distribution.
    pub log_prior: [f64; NUM_STATES],
    /// Natural-log transition matrix, `[from][to]`.
    pub log_trans: [[f64; NUM_STATES]; NUM_STATES],
    /// Per-state emission densities.
    pub emissions: [GaussianEmission; NUM_STATES],
}

impl GaussianHmm {
    /// Assemble from fitted (linear-domain) parameters.
    #[must_use]
    pub fn from_fitted(
        prior: &PriorDistribution,
        trans: &TransitionMatrix,
        emissions: [GaussianEmission; NUM_STATES],
    ) -> Self {
        Self {
            log_prior: prior.log(),
            log_trans: trans.log(),
            emissions,
        }
    }

    /// `T × S` matrix of per-frame, per-state log emission densities.
    #[must_use]
    pub fn log_emissions(&self, seq: &[FeatureVector]) -> Array2<f64> {
        let norms: Vec<f64> = self.emissions.iter().map(GaussianEmission::log_norm).collect();
        Array2::from_shape_fn((seq.len(), NUM_STATES), |(t, s)| {
            self.emissions[s].log_density_with_norm(&seq[t], norms[s])
        })
    }

    /// Most likely state path for `seq` and its log-likelihood.
    ///
    /// # Errors
    ///
    /// [`FitError::EmptySequence`] if `seq` is empty.
    pub fn decode(&self, seq: &[FeatureVector]) -> FitResult<Decoded> {
        if seq.is_empty() {
            return Err(FitError::EmptySequence);
        }
        let t_len = seq.len();
        let log_emit = self.log_emissions(seq);

        let mut dp = Array2::<f64>::from_elem((t_len, NUM_STATES), f64::NEG_INFINITY);
        let mut back = Array2::<usize>::zeros((t_len, NUM_STATES));

        for s in 0..NUM_STATES {
            dp[[0, s]] = self.log_prior[s] + log_emit[[0, s]];
        }

        let mut candidates = [0.0; NUM_STATES];
        for t in 1..t_len {
            for s in 0..NUM_STATES {
                for (prev, c) in candidates.iter_mut().enumerate() {
                    *c = dp[[t - 1, prev]] + self.log_trans[prev][s];
                }
                let best_prev = argmax_first(&candidates);
                dp[[t, s]] = candidates[best_prev] + log_emit[[t, s]];
                back[[t, s]] = best_prev;
            }
        }

        let last_row: Vec<f64> = dp.row(t_len - 1).to_vec();
        let mut state = argmax_first(&last_row);
        let log_likelihood = last_row[state];

        let mut path = vec![FrameLabel::Extended; t_len];
        for t in (0..t_len).rev() {
            path[t] = FrameLabel::from_index(state).unwrap_or(FrameLabel::Extended);
            if t > 0 {
                state = back[[t, state]];
            }
        }

        Ok(Decoded { path, log_likelihood })
    }
}
