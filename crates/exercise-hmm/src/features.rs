//! Pose feature normalization.
//!
//! Converts the raw landmarks of one frame into a [`FeatureVector`] that is
//! independent of where the subject stands in the image and how large they
//! appear. The hip centre becomes the origin and all coordinates are divided
//! by the torso length (shoulder centre to hip centre), falling back to the
//! hip width when the torso is foreshortened to nothing.

use crate::config::NormalizerConfig;
use crate::types::{FeatureVector, Joint, PoseFrame, NUM_FEATURES};

/// Midpoint of two points.
fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Euclidean distance between two points.
fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Body scale used to normalize a frame, or `None` if both the torso length
/// and the hip width are below `min_scale`.
#[must_use]
pub fn body_scale(frame: &PoseFrame, cfg: &NormalizerConfig) -> Option<f64> {
    let lh = frame.left_hip.point();
    let rh = frame.right_hip.point();
    let hip_center = midpoint(lh, rh);
    let shoulder_center = midpoint(frame.left_shoulder.point(), frame.right_shoulder.point());

    let torso = distance(shoulder_center, hip_center);
    if torso >= cfg.min_scale {
        return Some(torso);
    }
    let hips = distance(lh, rh);
    (hips >= cfg.min_scale).then_some(hips)
}

/// Normalize one frame into a feature vector.
///
/// Returns `None` when the frame is unusable: a tracked joint is below the
/// visibility threshold, the body scale is degenerate, or the input holds
/// non-finite coordinates. None of these are errors; the caller simply
/// skips the frame.
#[must_use]
pub fn normalize(frame: &PoseFrame, cfg: &NormalizerConfig) -> Option<FeatureVector> {
    // Negated so that NaN visibility also fails the gate.
    if frame.iter().any(|(_, lm)| !(lm.visibility >= cfg.min_visibility)) {
        return None;
    }

    let origin = midpoint(frame.left_hip.point(), frame.right_hip.point());
    let scale = body_scale(frame, cfg)?;

    let mut out = [0.0; NUM_FEATURES];
    for joint in Joint::ALL {
        let (x, y) = frame.get(joint).point();
        let i = joint.index() * 2;
        out[i] = (x - origin.0) / scale;
        out[i + 1] = (y - origin.1) / scale;
    }

    let fv = FeatureVector::new(out);
    fv.is_finite().then_some(fv)
}
