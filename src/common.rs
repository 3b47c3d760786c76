//! # Common types
//! Points, extension status and the planning result shared by the planner modules.
//!
use crate::rrt_error::{RRTError, RRTResult};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// A configuration in the 2D workspace.
pub type Point = Vector2<f64>;

pub fn point_from_array(p: [f64; 2]) -> RRTResult<Point> {
    if !p[0].is_finite() || !p[1].is_finite() {
        return Err(RRTError::NonFiniteCoordinate { x: p[0], y: p[1] });
    }
    Ok(Point::new(p[0], p[1]))
}

/// Outcome of a single extension step, or of a whole planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The goal was incorporated into the tree.
    Reached,
    /// A new, non-goal node was incorporated into the tree.
    Advanced,
    /// The candidate was rejected and the tree is unchanged.
    Trapped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RRTSolution {
    pub status: Status,
    /// Start-to-goal waypoints. Empty unless `status` is `Reached`.
    pub path: Vec<[f64; 2]>,
    pub cost: f64,
    pub num_iter: u64,
    pub num_nodes: usize,
    pub cancelled: bool,
}

impl RRTSolution {
    pub fn is_reached(&self) -> bool {
        self.status == Status::Reached
    }

    pub fn save_to_json<P: AsRef<Path>>(&self, filename: P) -> RRTResult<()> {
        serde_json::to_writer_pretty(File::create(filename)?, &self)?;
        Ok(())
    }

    pub fn load_from_json<P: AsRef<Path>>(filename: P) -> RRTResult<Self> {
        let solution_file = File::open(filename)?;
        let solution = serde_json::from_reader(solution_file)?;
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_array() {
        let p = point_from_array([1.0, 2.0]).unwrap();
        assert_eq!(p.x, 1.0);
        assert_eq!(p.y, 2.0);
        assert!(matches!(
            point_from_array([f64::NAN, 0.0]),
            Err(RRTError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn test_solution_json() -> anyhow::Result<()> {
        let soln = RRTSolution {
            status: Status::Reached,
            path: vec![[0.0, 0.0], [20.0, 0.0]],
            cost: 20.0,
            num_iter: 1,
            num_nodes: 3,
            cancelled: false,
        };
        let filename = std::env::temp_dir().join("rrt_rust_solution_test.json");
        soln.save_to_json(&filename)?;
        let loaded = RRTSolution::load_from_json(&filename)?;
        std::fs::remove_file(&filename)?;
        assert_eq!(loaded, soln);
        assert!(loaded.is_reached());
        Ok(())
    }
}
