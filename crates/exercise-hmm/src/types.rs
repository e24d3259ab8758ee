//! Core domain types shared by every pipeline stage.
//!
//! - **Pose input**: [`Joint`], [`Landmark`], [`PoseFrame`]
//! - **Per-frame outputs**: [`FeatureVector`], [`FrameLabel`]
//! - **Segmentation**: [`Repetition`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Number of latent states (one per [`FrameLabel`]).
pub const NUM_STATES: usize = 2;

/// Number of tracked joints.
pub const NUM_JOINTS: usize = 8;

/// Dimensionality of a [`FeatureVector`]: (x, y) per tracked joint.
pub const NUM_FEATURES: usize = NUM_JOINTS * 2;

// ---------------------------------------------------------------------------
// Joints
// ---------------------------------------------------------------------------

/// The eight lower-body and torso joints tracked by the model.
///
/// Declaration order is the feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Left shoulder.
    LeftShoulder,
    /// Right shoulder.
    RightShoulder,
    /// Left hip.
    LeftHip,
    /// Right hip.
    RightHip,
    /// Left knee.
    LeftKnee,
    /// Right knee.
    RightKnee,
    /// Left ankle.
    LeftAnkle,
    /// Right ankle.
    RightAnkle,
}

impl Joint {
    /// All joints in feature-vector order.
    pub const ALL: [Joint; NUM_JOINTS] = [
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    /// Position of this joint in [`Joint::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name, matching the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Landmarks
// ---------------------------------------------------------------------------

/// A single 2D landmark as reported by the pose estimator.
///
/// Coordinates are image-relative, roughly in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Estimator visibility / confidence score in `[0, 1]`.
    pub visibility: f64,
}

impl Landmark {
    /// Create a landmark.
    #[must_use]
    pub const fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }

    /// The `(x, y)` position.
    #[must_use]
    pub const fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// One frame of pose-estimator output restricted to the tracked joints.
///
/// Serialized with one named field per joint, which is also the JSON Lines
/// record format accepted by the `exercise-hmm-fit` binary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Left shoulder.
    pub left_shoulder: Landmark,
    /// Right shoulder.
    pub right_shoulder: Landmark,
    /// Left hip.
    pub left_hip: Landmark,
    /// Right hip.
    pub right_hip: Landmark,
    /// Left knee.
    pub left_knee: Landmark,
    /// Right knee.
    pub right_knee: Landmark,
    /// Left ankle.
    pub left_ankle: Landmark,
    /// Right ankle.
    pub right_ankle: Landmark,
}

impl PoseFrame {
    /// Build a frame from landmarks given in [`Joint::ALL`] order.
    #[must_use]
    pub const fn from_landmarks(l: [Landmark; NUM_JOINTS]) -> Self {
        Self {
            left_shoulder: l[0],
            right_shoulder: l[1],
            left_hip: l[2],
            right_hip: l[3],
            left_knee: l[4],
            right_knee: l[5],
            left_ankle: l[6],
            right_ankle: l[7],
        }
    }

    /// Landmark for `joint`.
    #[must_use]
    pub const fn get(&self, joint: Joint) -> &Landmark {
        match joint {
            Joint::LeftShoulder => &self.left_shoulder,
            Joint::RightShoulder => &self.right_shoulder,
            Joint::LeftHip => &self.left_hip,
            Joint::RightHip => &self.right_hip,
            Joint::LeftKnee => &self.left_knee,
            Joint::RightKnee => &self.right_knee,
            Joint::LeftAnkle => &self.left_ankle,
            Joint::RightAnkle => &self.right_ankle,
        }
    }

    /// Iterate `(joint, landmark)` pairs in feature-vector order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &Landmark)> + '_ {
        Joint::ALL.iter().map(move |&j| (j, self.get(j)))
    }

    /// Apply `f` to every landmark position, keeping visibilities.
    #[must_use]
    pub fn map_points<F>(&self, f: F) -> Self
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        let mut out = [Landmark::default(); NUM_JOINTS];
        for (slot, (_, lm)) in out.iter_mut().zip(self.iter()) {
            let (x, y) = f(lm.x, lm.y);
            *slot = Landmark::new(x, y, lm.visibility);
        }
        Self::from_landmarks(out)
    }
}

// ---------------------------------------------------------------------------
// FeatureVector
// ---------------------------------------------------------------------------

/// A normalized 16-dimensional pose feature vector.
///
/// Layout: `[ls.x, ls.y, rs.x, rs.y, lh.x, lh.y, rh.x, rh.y,
///           lk.x, lk.y, rk.x, rk.y, la.x, la.y, ra.x, ra.y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    /// Wrap a raw array.
    #[must_use]
    pub const fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }

    /// A vector with every component equal to `value`.
    #[must_use]
    pub const fn splat(value: f64) -> Self {
        Self([value; NUM_FEATURES])
    }

    /// Build from a slice, checking its length.
    ///
    /// Returns `None` if `values.len() != NUM_FEATURES`.
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        <[f64; NUM_FEATURES]>::try_from(values).ok().map(Self)
    }

    /// Borrow the components.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, d: usize) -> &f64 {
        &self.0[d]
    }
}

// ---------------------------------------------------------------------------
// FrameLabel
// ---------------------------------------------------------------------------

/// Binary motion-phase label assigned to each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLabel {
    /// Legs straight (standing). Encoded as state 0.
    Extended = 0,
    /// Knees bent (bottom of the squat). Encoded as state 1.
    Flexed = 1,
}

impl FrameLabel {
    /// Both labels in state-index order.
    pub const ALL: [FrameLabel; NUM_STATES] = [FrameLabel::Extended, FrameLabel::Flexed];

    /// State index used by the HMM.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`FrameLabel::index`].
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(FrameLabel::Extended),
            1 => Some(FrameLabel::Flexed),
            _ => None,
        }
    }
}

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameLabel::Extended => write!(f, "0 (extended)"),
            FrameLabel::Flexed => write!(f, "1 (flexed)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Repetition
// ---------------------------------------------------------------------------

/// One extended → flexed → extended cycle, as a closed frame interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repetition {
    /// First frame of the cycle (first extended frame).
    pub start: usize,
    /// Frame at which the subject returns to extended, inclusive.
    pub end: usize,
}

impl Repetition {
    /// Create a repetition spanning `[start, end]`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of frames covered, counting both endpoints.
    ///
    /// An inverted interval (`start > end`) covers no frames.
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.start > self.end {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Whether the interval is inverted and covers no frames.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl From<(usize, usize)> for Repetition {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}
