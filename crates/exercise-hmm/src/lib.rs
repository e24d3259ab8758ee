//! # Exercise HMM
//!
//! Fits a two-state Gaussian hidden Markov model to a pose-tracked exercise
//! clip (squats) and uses it to score repetitions.
//!
//! ## Architecture
//!
//! ```text
//! PoseFrame ──► features::normalize ──► FeatureVector ─┐
//!     │                                                 ├─► Corpus
//!     └──────► labeler::label_frame ──► FrameLabel ─────┘
//!                                                          │
//!      fit::{fit_emissions, fit_transitions, fit_prior} ◄──┤
//!                         │                                │
//!                         ▼                                ▼
//!                viterbi::GaussianHmm ◄── segment::segment (repetitions)
//!                         │
//!                         ▼
//!           model::fit_model ──► ModelParameters (JSON)
//! ```
//!
//! Building the corpus is a single forward pass; fitting and decoding need
//! the complete corpus and run afterwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use exercise_hmm::{fit_model, Corpus, FeatureVector, FrameLabel, HmmConfig};
//!
//! let mut corpus = Corpus::new();
//! for (i, bit) in [0, 0, 1, 1, 0, 0, 1, 1, 0].into_iter().enumerate() {
//!     let wobble = 0.01 * (i % 2) as f64;
//!     let label = if bit == 0 { FrameLabel::Extended } else { FrameLabel::Flexed };
//!     corpus.push_labeled(FeatureVector::splat(bit as f64 + wobble), label);
//! }
//!
//! let report = fit_model(&corpus, &HmmConfig::default()).expect("fit succeeds");
//! assert_eq!(report.repetitions.len(), 2);
//! let json = report.model.to_json_string().unwrap();
//! assert!(json.contains("meanLogLikelihood"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod fit;
pub mod labeler;
pub mod model;
pub mod segment;
pub mod types;
pub mod viterbi;

// Convenient re-exports at the crate root.
pub use config::{HmmConfig, TrailingCycle};
pub use corpus::Corpus;
pub use error::{ConfigError, FitError, FitResult};
pub use fit::{GaussianEmission, PriorDistribution, TransitionMatrix};
pub use model::{fit_model, FitReport, ModelParameters, RepetitionScore};
pub use segment::{segment, RepSegmenter};
pub use types::{
    FeatureVector, FrameLabel, Joint, Landmark, PoseFrame, Repetition, NUM_FEATURES, NUM_STATES,
};
pub use viterbi::{Decoded, GaussianHmm};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
