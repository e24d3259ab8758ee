//! In-memory training corpus built by one forward pass over a clip.
//!
//! Each incoming [`PoseFrame`] is normalized; frames that cannot be
//! normalized are counted and dropped. Surviving frames are labeled from
//! knee geometry and appended, so `features[i]` and `labels[i]` always refer
//! to the same frame.

use tracing::{debug, info};

use crate::config::HmmConfig;
use crate::error::{FitError, FitResult};
use crate::features::normalize;
use crate::labeler::label_frame;
use crate::types::{FeatureVector, FrameLabel, PoseFrame, NUM_STATES};

/// Per-frame feature vectors and labels for one clip.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    features: Vec<FeatureVector>,
    labels: Vec<FrameLabel>,
    frames_skipped: usize,
}

impl Corpus {
    /// An empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from already-labeled feature vectors.
    ///
    /// # Errors
    ///
    /// [`FitError::LengthMismatch`] if the two sequences differ in length,
    /// [`FitError::NonFiniteFeature`] if any vector holds NaN or infinity.
    pub fn from_labeled(features: Vec<FeatureVector>, labels: Vec<FrameLabel>) -> FitResult<Self> {
        if features.len() != labels.len() {
            return Err(FitError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if let Some(index) = features.iter().position(|fv| !fv.is_finite()) {
            return Err(FitError::NonFiniteFeature { index });
        }
        Ok(Self {
            features,
            labels,
            frames_skipped: 0,
        })
    }

    /// Run the forward pass over `frames`.
    pub fn from_frames<'a, I>(frames: I, cfg: &HmmConfig) -> Self
    where
        I: IntoIterator<Item = &'a PoseFrame>,
    {
        let mut corpus = Self::new();
        for frame in frames {
            corpus.push_frame(frame, cfg);
        }
        let [extended, flexed] = corpus.label_counts();
        info!(
            "Corpus built: {} usable frames ({} extended, {} flexed), {} skipped",
            corpus.len(),
            extended,
            flexed,
            corpus.frames_skipped
        );
        corpus
    }

    /// Normalize and label one frame.
    ///
    /// Returns the assigned label, or `None` if the frame was skipped.
    pub fn push_frame(&mut self, frame: &PoseFrame, cfg: &HmmConfig) -> Option<FrameLabel> {
        let Some(fv) = normalize(frame, &cfg.normalizer) else {
            debug!("Skipping frame {}: not normalizable", self.frames_seen());
            self.frames_skipped += 1;
            return None;
        };
        let label = label_frame(frame, &cfg.labeler);
        self.push_labeled(fv, label)
    }

    /// Append an already-computed feature vector and label.
    ///
    /// A vector with NaN or infinite components is counted as skipped and
    /// `None` is returned; otherwise the label is returned.
    pub fn push_labeled(&mut self, feature: FeatureVector, label: FrameLabel) -> Option<FrameLabel> {
        if !feature.is_finite() {
            debug!("Skipping frame {}: non-finite feature vector", self.frames_seen());
            self.frames_skipped += 1;
            return None;
        }
        self.features.push(feature);
        self.labels.push(label);
        Some(label)
    }

    /// Feature vectors, one per usable frame.
    #[must_use]
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    /// Labels, parallel to [`features`](Self::features).
    #[must_use]
    pub fn labels(&self) -> &[FrameLabel] {
        &self.labels
    }

    /// Number of usable frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no usable frame has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of frames dropped as unusable.
    #[must_use]
    pub fn frames_skipped(&self) -> usize {
        self.frames_skipped
    }

    /// Total frames offered, usable or not.
    #[must_use]
    pub fn frames_seen(&self) -> usize {
        self.features.len() + self.frames_skipped
    }

    /// Usable frame count per label, indexed by state.
    #[must_use]
    pub fn label_counts(&self) -> [usize; NUM_STATES] {
        let mut counts = [0; NUM_STATES];
        for l in &self.labels {
            counts[l.index()] += 1;
        }
        counts
    }

    /// Feature vectors grouped by label, indexed by state.
    #[must_use]
    pub fn by_label(&self) -> [Vec<FeatureVector>; NUM_STATES] {
        let mut groups: [Vec<FeatureVector>; NUM_STATES] = Default::default();
        for (fv, l) in self.features.iter().zip(&self.labels) {
            groups[l.index()].push(*fv);
        }
        groups
    }
}
