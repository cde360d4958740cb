//! Pose comparison.
//!
//! Position is checked first. While the player is too far away no rotation
//! hints are produced at all, since "look left" is meaningless from the
//! wrong spot. There is no hysteresis: a pose sitting exactly on a threshold
//! can flip between aligned and unaligned from one tick to the next.

use serde::Serialize;
use viewfinder_common::{Vec3, ViewAngles};

use crate::pose::TargetPose;

/// Result of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    pub aligned: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Signed shortest rotation from `from` to `to`, in (-180, 180].
///
/// `shortest_angle(170.0, -170.0) == 20.0`
pub fn shortest_angle(from: f32, to: f32) -> f32 {
    let mut d = (to - from) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Compare the current pose against the target
pub fn evaluate(
    current_pos: Vec3,
    current_angles: ViewAngles,
    target: &TargetPose,
    pos_threshold: f32,
    rot_threshold: f32,
) -> Verdict {
    let distance = current_pos.distance(target.position);
    let in_range = distance <= pos_threshold;
    if !in_range {
        // NaN distance lands here too
        return Verdict::default();
    }

    let pitch_diff = shortest_angle(current_angles.pitch, target.angles.pitch);
    let yaw_diff = shortest_angle(current_angles.yaw, target.angles.yaw);

    let mut verdict = Verdict::default();
    if pitch_diff.abs() > rot_threshold {
        verdict.up = pitch_diff > 0.0;
        verdict.down = !verdict.up;
    }
    if yaw_diff.abs() > rot_threshold {
        verdict.left = yaw_diff > 0.0;
        verdict.right = !verdict.left;
    }
    verdict.aligned =
        in_range && pitch_diff.abs() <= rot_threshold && yaw_diff.abs() <= rot_threshold;
    verdict
}
