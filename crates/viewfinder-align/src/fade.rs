//! Confirmation fade.
//!
//! Alpha decays toward zero by `lerp(alpha, 0, rate * dt)` every tick, an
//! asymptotic curve rather than a fixed-length tween. Once it drops below
//! `epsilon` it snaps to exactly zero and the fade counts as finished.

use crate::error::{AlignError, Result};

/// Linear interpolation with `t` clamped to [0, 1]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct FadeSequencer {
    alpha: f32,
    rate: f32,
    epsilon: f32,
    finished: bool,
}

impl FadeSequencer {
    /// A zero or negative rate would never finish, so it is rejected here.
    pub fn new(rate: f32, epsilon: f32) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AlignError::InvalidFadeRate(rate));
        }
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(AlignError::InvalidFadeEpsilon(epsilon));
        }
        Ok(Self {
            alpha: 1.0,
            rate,
            epsilon,
            finished: false,
        })
    }

    /// Advance by `dt` seconds and return the new alpha
    pub fn tick(&mut self, dt: f32) -> f32 {
        if self.finished {
            return self.alpha;
        }
        self.alpha = lerp(self.alpha, 0.0, self.rate * dt.max(0.0));
        if self.alpha.abs() < self.epsilon {
            self.alpha = 0.0;
            self.finished = true;
        }
        self.alpha
    }

    /// Jump straight to the finished state
    pub fn finish(&mut self) {
        self.alpha = 0.0;
        self.finished = true;
    }

    /// Back to fully opaque
    pub fn reset(&mut self) {
        self.alpha = 1.0;
        self.finished = false;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
