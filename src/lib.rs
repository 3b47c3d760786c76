//! # RRT Rust
//! Implements a goal-biased Rapidly-exploring Random Tree (RRT) planner in Rust, finding a
//! feasible path between two points of a 2D workspace with polygonal obstacles.
//!
//! ## Usage
//! Build a [`PlanningProblem`] and [`RRTParams`] (in code or from config files), create an
//! [`RRT`] and either call [`RRT::grow_towards_goal`] or drive it one [`RRT::step`] at a time.
pub mod common;
pub mod obstacles;
pub mod problem;
pub mod rrt;
pub mod rrt_error;
pub mod sampler;
pub mod steering;
pub mod tree;
pub mod utils;

pub use common::{Point, RRTSolution, Status};
pub use obstacles::{point_inside_any_obstacle, Obstacles, Polygon};
pub use problem::PlanningProblem;
pub use rrt::{IterationReport, RRTParams, RRT};
pub use rrt_error::{RRTError, RRTResult};
pub use tree::{Node, Tree};
