//! Fitting configuration.
//!
//! [`HmmConfig`] holds every threshold and epsilon used by the pipeline. It
//! is passed by reference into each stage instead of living in module-level
//! constants, so a different exercise can ship its own tuned thresholds.
//!
//! # Example
//!
//! ```rust
//! use exercise_hmm::config::HmmConfig;
//!
//! let cfg = HmmConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.normalizer.min_visibility, 0.3);
//! assert_eq!(cfg.threshold_sigma, 2.0);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Stage configs
// ---------------------------------------------------------------------------

/// Settings for [`crate::features::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Frames where any tracked joint has visibility below this are
    /// dropped. Default: **0.3**.
    pub min_visibility: f64,

    /// Smallest usable body scale (torso length, then hip width).
    /// Default: **1e-3**.
    pub min_scale: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.3,
            min_scale: 1e-3,
        }
    }
}

/// Settings for [`crate::labeler::label_frame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelerConfig {
    /// Mean knee angle at or above which a frame is extended. Default: **150°**.
    pub extended_min_deg: f64,

    /// Mean knee angle at or below which a frame is flexed. Default: **120°**.
    pub flexed_max_deg: f64,

    /// Limb segments shorter than this give a straight (180°) knee.
    /// Default: **1e-6**.
    pub min_segment_length: f64,
}

impl LabelerConfig {
    /// Midpoint of the ambiguous band between the two thresholds.
    #[must_use]
    pub fn midpoint_deg(&self) -> f64 {
        0.5 * (self.extended_min_deg + self.flexed_max_deg)
    }
}

impl Default for LabelerConfig {
    fn default() -> Self {
        Self {
            extended_min_deg: 150.0,
            flexed_max_deg: 120.0,
            min_segment_length: 1e-6,
        }
    }
}

/// Settings for the parameter fitters in [`crate::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Lower bound applied to every emission standard deviation.
    /// Default: **1e-6**.
    pub std_floor: f64,

    /// Probability mass given to the states not seen in the first frame,
    /// before renormalisation. Default: **1e-6**.
    pub prior_floor: f64,

    /// Count added to every transition cell before normalising (Laplace
    /// smoothing). Default: **1.0**.
    pub transition_pseudocount: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            std_floor: 1e-6,
            prior_floor: 1e-6,
            transition_pseudocount: 1.0,
        }
    }
}

/// What the segmenter does with a cycle still open when the clip ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingCycle {
    /// Drop it. Matches the behaviour the shipped models were fitted with.
    #[default]
    Drop,
    /// If the subject was seen flexing, close the cycle on the last frame.
    CloseAtEnd,
}

/// Settings for [`crate::segment::RepSegmenter`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Trailing partial-cycle policy. Default: [`TrailingCycle::Drop`].
    pub trailing_cycle: TrailingCycle,
}

// ---------------------------------------------------------------------------
// HmmConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one fitting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmConfig {
    /// Feature normalizer settings.
    pub normalizer: NormalizerConfig,

    /// Frame labeler settings.
    pub labeler: LabelerConfig,

    /// Emission / transition / prior fitter settings.
    pub fit: FitConfig,

    /// Repetition segmenter settings.
    pub segmenter: SegmenterConfig,

    /// Width of the acceptance band in standard deviations, written into the
    /// exported model. Default: **2.0**.
    pub threshold_sigma: f64,

    /// Log-likelihood std reported when fewer than two repetitions were
    /// scored. Default: **1.0**.
    pub fallback_std: f64,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            labeler: LabelerConfig::default(),
            fit: FitConfig::default(),
            segmenter: SegmenterConfig::default(),
            threshold_sigma: 2.0,
            fallback_std: 1.0,
        }
    }
}

impl HmmConfig {
    /// Load an [`HmmConfig`] from a JSON file and validate it.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileRead`] if the file cannot be read,
    /// [`ConfigError::ParseError`] if it is not valid JSON, or
    /// [`ConfigError::InvalidValue`] if validation fails.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: HmmConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this configuration as pretty-printed JSON, creating parent
    /// directories if necessary.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileRead`] if the directory or file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate all fields, returning the first problem found.
    ///
    /// # Validated invariants
    ///
    /// - `min_visibility` lies in `[0, 1]`.
    /// - All epsilons and floors are strictly positive and finite.
    /// - `flexed_max_deg < extended_min_deg`, both within `[0, 180]`.
    /// - `transition_pseudocount` is strictly positive.
    /// - `threshold_sigma` and `fallback_std` are strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = &self.normalizer;
        if !(0.0..=1.0).contains(&n.min_visibility) {
            return Err(ConfigError::invalid_value(
                "normalizer.min_visibility",
                format!("must be in [0, 1], got {}", n.min_visibility),
            ));
        }
        check_positive("normalizer.min_scale", n.min_scale)?;

        let l = &self.labeler;
        for (field, v) in [
            ("labeler.extended_min_deg", l.extended_min_deg),
            ("labeler.flexed_max_deg", l.flexed_max_deg),
        ] {
            if !(0.0..=180.0).contains(&v) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("must be in [0, 180] degrees, got {v}"),
                ));
            }
        }
        if l.flexed_max_deg >= l.extended_min_deg {
            return Err(ConfigError::invalid_value(
                "labeler.flexed_max_deg",
                format!(
                    "must be below extended_min_deg ({} >= {})",
                    l.flexed_max_deg, l.extended_min_deg
                ),
            ));
        }
        check_positive("labeler.min_segment_length", l.min_segment_length)?;

        let f = &self.fit;
        check_positive("fit.std_floor", f.std_floor)?;
        check_positive("fit.prior_floor", f.prior_floor)?;
        check_positive("fit.transition_pseudocount", f.transition_pseudocount)?;

        check_positive("threshold_sigma", self.threshold_sigma)?;
        check_positive("fallback_std", self.fallback_std)?;

        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(field, format!("must be finite and > 0, got {value}")))
    }
}
