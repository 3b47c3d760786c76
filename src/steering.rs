//! # Steering
//! Computes the bounded-step candidate configuration between a tree node and a sample.
//!
use crate::common::Point;
use crate::rrt_error::{RRTError, RRTResult};
use crate::utils;

pub trait Steering {
    fn step_size(&self) -> f64;

    /// Moves from `near` toward `sample`. Fails on a zero-length direction.
    fn steer(&self, near: &Point, sample: &Point) -> RRTResult<Point>;
}

/// Moves exactly `step_size` along the straight line from `near` to `sample`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightLineSteering {
    step_size: f64,
}

impl StraightLineSteering {
    pub fn new(step_size: f64) -> RRTResult<Self> {
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(RRTError::InvalidParams(format!(
                "step size must be positive and finite, got {}",
                step_size
            )));
        }
        Ok(Self { step_size })
    }
}

impl Steering for StraightLineSteering {
    fn step_size(&self) -> f64 {
        self.step_size
    }

    fn steer(&self, near: &Point, sample: &Point) -> RRTResult<Point> {
        let dist = utils::distance(sample, near);
        if dist == 0.0 {
            return Err(RRTError::ZeroLengthSteer);
        }
        Ok(near + (sample - near) * (self.step_size / dist))
    }
}

/// New candidate configuration for an extension step. A sample closer than one step to
/// `near` yields `near` itself rather than overshooting the sample.
pub fn new_config<S: Steering + ?Sized>(steering: &S, near: &Point, sample: &Point) -> RRTResult<Point> {
    if utils::distance(sample, near) < steering.step_size() {
        return Ok(*near);
    }
    steering.steer(near, sample)
}
