//! # Sampler
//! Goal-biased uniform sampling of the workspace.
//!
use crate::common::Point;
use crate::rrt_error::{RRTError, RRTResult};
use crate::utils;
use geo::Rect;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    bounds: Rect<f64>,
    goal: Point,
    goal_bias: f64,
}

impl Sampler {
    pub fn new(bounds: Rect<f64>, goal: Point, goal_bias: f64) -> RRTResult<Self> {
        if !(0.0..=1.0).contains(&goal_bias) {
            return Err(RRTError::InvalidParams(format!(
                "goal bias must lie in [0, 1], got {}",
                goal_bias
            )));
        }
        let (w, h) = (bounds.width(), bounds.height());
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(RRTError::InvalidParams(format!(
                "workspace must have positive extent, got {} x {}",
                w, h
            )));
        }
        Ok(Self {
            bounds,
            goal,
            goal_bias,
        })
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Returns the goal with probability `goal_bias`, otherwise a uniform sample of the
    /// workspace.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        if rng.gen::<f64>() < self.goal_bias {
            return self.goal;
        }
        utils::sample_from_bbox(&self.bounds, rng)
    }
}
