//! Frame labeling from knee geometry.
//!
//! Each frame is labeled [`FrameLabel::Extended`] or [`FrameLabel::Flexed`]
//! from the mean interior knee angle. Labeling reads the raw landmarks and
//! applies no visibility gating; it is independent of the normalizer.

use crate::config::LabelerConfig;
use crate::types::{FrameLabel, PoseFrame};

/// Interior angle at `b` in the chain `a`–`b`–`c`, in degrees.
///
/// Returns 180° when either segment is shorter than `min_len`.
#[must_use]
pub fn joint_angle_deg(a: (f64, f64), b: (f64, f64), c: (f64, f64), min_len: f64) -> f64 {
    let v1 = (a.0 - b.0, a.1 - b.1);
    let v2 = (c.0 - b.0, c.1 - b.1);

    let n1 = v1.0.hypot(v1.1);
    let n2 = v2.0.hypot(v2.1);
    if n1 < min_len || n2 < min_len {
        return 180.0;
    }

    let cos = ((v1.0 / n1) * (v2.0 / n2) + (v1.1 / n1) * (v2.1 / n2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Mean of the left and right knee angles, in degrees.
#[must_use]
pub fn mean_knee_angle_deg(frame: &PoseFrame, cfg: &LabelerConfig) -> f64 {
    let left = joint_angle_deg(
        frame.left_hip.point(),
        frame.left_knee.point(),
        frame.left_ankle.point(),
        cfg.min_segment_length,
    );
    let right = joint_angle_deg(
        frame.right_hip.point(),
        frame.right_knee.point(),
        frame.right_ankle.point(),
        cfg.min_segment_length,
    );
    0.5 * (left + right)
}

/// Map a mean knee angle to a label.
///
/// Angles in the band between the two thresholds go to whichever side of
/// the band's midpoint they fall on, with the midpoint itself counted as
/// extended.
#[must_use]
pub fn label_angle(angle_deg: f64, cfg: &LabelerConfig) -> FrameLabel {
    if angle_deg >= cfg.extended_min_deg {
        FrameLabel::Extended
    } else if angle_deg <= cfg.flexed_max_deg {
        FrameLabel::Flexed
    } else if angle_deg >= cfg.midpoint_deg() {
        FrameLabel::Extended
    } else {
        FrameLabel::Flexed
    }
}

/// Label one frame.
#[must_use]
pub fn label_frame(frame: &PoseFrame, cfg: &LabelerConfig) -> FrameLabel {
    label_angle(mean_knee_angle_deg(frame, cfg), cfg)
}
