//! Repetition segmentation over a label sequence.
//!
//! A repetition is an extended → flexed → extended cycle. The scan is a
//! three-state automaton fed one label at a time:
//!
//! ```text
//!            E                F                 E (emit, then re-seek)
//! SeekExtended ──► InExtendedRun ──► InFlexedRun ──────────────────────┐
//!    ▲  │ F           │ E                │ F                            │
//!    │  └─┘           └─┘                └─┘                            │
//!    └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The frame that returns to extended both closes one repetition (as its
//! `end`) and opens the next (as its `start`), so consecutive repetitions
//! share a boundary frame but never overlap otherwise. The cursor never
//! rewinds.
//!
//! A cycle still open when the input ends is handled by
//! [`TrailingCycle`]: dropped by default, or closed on the last frame if the
//! subject was already seen flexing.

use crate::config::{SegmenterConfig, TrailingCycle};
use crate::types::{FrameLabel, Repetition};

/// Automaton state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Skipping frames until the subject is extended.
    SeekExtended,
    /// Inside the extended run that opens a cycle.
    InExtendedRun {
        /// First extended frame of the cycle.
        start: usize,
    },
    /// Inside the flexed run. Entering this state consumes a flexed frame,
    /// so a cycle in this state has always seen flexion.
    InFlexedRun {
        /// First extended frame of the cycle.
        start: usize,
    },
}

/// Incremental repetition segmenter.
#[derive(Debug, Clone)]
pub struct RepSegmenter {
    state: SegmenterState,
    index: usize,
    trailing: TrailingCycle,
}

impl RepSegmenter {
    /// Create a segmenter positioned before the first frame.
    #[must_use]
    pub fn new(cfg: &SegmenterConfig) -> Self {
        Self {
            state: SegmenterState::SeekExtended,
            index: 0,
            trailing: cfg.trailing_cycle,
        }
    }

    /// Current automaton state.
    #[must_use]
    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Number of labels consumed so far.
    #[must_use]
    pub fn frames_seen(&self) -> usize {
        self.index
    }

    /// Feed the next label; returns a repetition when this frame closes one.
    pub fn push(&mut self, label: FrameLabel) -> Option<Repetition> {
        let i = self.index;
        self.index += 1;

        let (next, emitted) = match (self.state, label) {
            (SegmenterState::SeekExtended, _) => (Self::seek(i, label), None),
            (SegmenterState::InExtendedRun { start }, FrameLabel::Extended) => {
                (SegmenterState::InExtendedRun { start }, None)
            }
            (SegmenterState::InExtendedRun { start }, FrameLabel::Flexed)
            | (SegmenterState::InFlexedRun { start }, FrameLabel::Flexed) => {
                (SegmenterState::InFlexedRun { start }, None)
            }
            (SegmenterState::InFlexedRun { start }, FrameLabel::Extended) => {
                (Self::seek(i, label), Some(Repetition::new(start, i)))
            }
        };

        self.state = next;
        emitted
    }

    fn seek(i: usize, label: FrameLabel) -> SegmenterState {
        match label {
            FrameLabel::Extended => SegmenterState::InExtendedRun { start: i },
            FrameLabel::Flexed => SegmenterState::SeekExtended,
        }
    }

    /// Signal end of input and apply the trailing-cycle policy.
    #[must_use]
    pub fn finish(self) -> Option<Repetition> {
        match (self.state, self.trailing) {
            (SegmenterState::InFlexedRun { start }, TrailingCycle::CloseAtEnd) => {
                Some(Repetition::new(start, self.index - 1))
            }
            _ => None,
        }
    }
}

/// Segment a complete label sequence into repetitions, in order.
#[must_use]
pub fn segment(labels: &[FrameLabel], cfg: &SegmenterConfig) -> Vec<Repetition> {
    let mut seg = RepSegmenter::new(cfg);
    let mut reps: Vec<Repetition> = labels.iter().filter_map(|&l| seg.push(l)).collect();
    reps.extend(seg.finish());
    reps
}
