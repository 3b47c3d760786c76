//! # Planning problem
//! Workspace, start, goal and obstacles of a planning run, as read from configuration.
//!
use crate::common::{point_from_array, Point};
use crate::obstacles::Obstacles;
use crate::rrt_error::RRTResult;
use crate::utils;
use config::Config;
use geo::Rect;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlanningProblem {
    pub width: f64,
    pub height: f64,
    pub start: [f64; 2],
    pub goal: [f64; 2],
    #[serde(default)]
    pub obstacles: Vec<Vec<[f64; 2]>>,
}

impl Default for PlanningProblem {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            start: [100.0, 20.0],
            goal: [500.0, 20.0],
            obstacles: vec![vec![
                [200.0, 0.0],
                [250.0, 0.0],
                [250.0, 400.0],
                [200.0, 400.0],
                [200.0, 0.0],
            ]],
        }
    }
}

impl PlanningProblem {
    pub fn from_json_value(json: serde_json::Value) -> RRTResult<Self> {
        let problem = serde_json::from_value(json)?;
        Ok(problem)
    }

    pub fn from_file(filename: &str) -> RRTResult<Self> {
        let problem = Config::builder()
            .add_source(config::File::with_name(filename))
            .build()?
            .try_deserialize::<PlanningProblem>()?;
        Ok(problem)
    }

    pub fn bounds(&self) -> Rect<f64> {
        utils::workspace_bbox(self.width, self.height)
    }

    pub fn start_point(&self) -> RRTResult<Point> {
        point_from_array(self.start)
    }

    pub fn goal_point(&self) -> RRTResult<Point> {
        point_from_array(self.goal)
    }

    /// Validated obstacle set. Fails on the first degenerate polygon.
    pub fn obstacle_set(&self) -> RRTResult<Obstacles> {
        Obstacles::from_coords(&self.obstacles)
    }
}
