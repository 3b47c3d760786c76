//! # RRT
//! Goal-biased RRT planner: sampling, extension protocol and planner loop.
//!
//! All planning state (tree, obstacles, random generator) lives in [`RRT`], so runs
//! are independent of each other and reproducible when the generator is seeded.
use crate::common::{Point, RRTSolution, Status};
use crate::obstacles::Obstacles;
use crate::problem::PlanningProblem;
use crate::rrt_error::{RRTError, RRTResult};
use crate::sampler::Sampler;
use crate::steering::{self, Steering, StraightLineSteering};
use crate::tree::{Node, Tree};
use crate::utils;
use config::Config;
use geo::Rect;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tracing::{debug, info, trace, warn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RRTParams {
    pub max_iter: u64,
    pub max_nodes: usize,
    pub step_size: f64,
    pub goal_bias: f64,
    /// Also reject candidates whose edge to the nearest node crosses an obstacle.
    pub check_segment_collision: bool,
    /// Mirror the tree in an R-tree for nearest-neighbour queries.
    pub use_spatial_index: bool,
    pub seed: Option<u64>,
}

impl Default for RRTParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            max_nodes: 100_000,
            step_size: 20.0,
            goal_bias: 0.1,
            check_segment_collision: false,
            use_spatial_index: false,
            seed: None,
        }
    }
}

impl RRTParams {
    pub fn from_json_value(json: serde_json::Value) -> RRTResult<Self> {
        let cfg = serde_json::from_value(json)?;
        Ok(cfg)
    }

    pub fn from_file(filename: &str) -> RRTResult<Self> {
        let cfg = Config::builder()
            .add_source(config::File::with_name(filename))
            .build()?
            .try_deserialize::<RRTParams>()?;
        Ok(cfg)
    }

    pub fn to_file(&self, filename: &str) -> RRTResult<()> {
        serde_json::to_writer_pretty(std::fs::File::create(filename)?, &self)?;
        Ok(())
    }

    pub fn validate(&self) -> RRTResult<()> {
        if self.max_iter == 0 {
            return Err(RRTError::InvalidParams(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if self.max_nodes < 2 {
            return Err(RRTError::InvalidParams(
                "max_nodes must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Snapshot handed to the observer after every iteration of the planner loop.
#[derive(Debug, Clone, Copy)]
pub struct IterationReport<'a> {
    pub iteration: u64,
    pub status: Status,
    pub tree: &'a Tree,
    pub obstacles: &'a Obstacles,
}

pub struct RRT<R: Rng = ChaChaRng> {
    params: RRTParams,
    sampler: Sampler,
    steering: StraightLineSteering,
    x_start: Point,
    x_goal: Point,
    obstacles: Obstacles,
    tree: Tree,
    rng: R,
    goal_index: Option<usize>,
    num_iter: u64,
}

impl RRT<ChaChaRng> {
    /// Planner for `problem`, seeded from `params.seed` or from entropy.
    pub fn new(params: RRTParams, problem: &PlanningProblem) -> RRTResult<Self> {
        let rng = match params.seed {
            Some(seed) => ChaChaRng::seed_from_u64(seed),
            None => ChaChaRng::from_entropy(),
        };
        Self::with_rng(params, problem, rng)
    }
}

impl<R: Rng> RRT<R> {
    pub fn with_rng(params: RRTParams, problem: &PlanningProblem, rng: R) -> RRTResult<Self> {
        Self::from_parts(
            params,
            problem.bounds(),
            problem.start_point()?,
            problem.goal_point()?,
            problem.obstacle_set()?,
            rng,
        )
    }

    pub fn from_parts(
        params: RRTParams,
        bounds: Rect<f64>,
        x_start: Point,
        x_goal: Point,
        obstacles: Obstacles,
        rng: R,
    ) -> RRTResult<Self> {
        params.validate()?;
        let steering = StraightLineSteering::new(params.step_size)?;
        let sampler = Sampler::new(bounds, x_goal, params.goal_bias)?;
        for (name, p) in [("start", &x_start), ("goal", &x_goal)] {
            if !p[0].is_finite() || !p[1].is_finite() {
                return Err(RRTError::NonFiniteCoordinate { x: p[0], y: p[1] });
            }
            if !utils::bbox_contains(&bounds, p) {
                return Err(RRTError::InvalidParams(format!(
                    "{} ({}, {}) lies outside the workspace",
                    name, p[0], p[1]
                )));
            }
            if obstacles.inside_obstacles(p) {
                return Err(RRTError::InvalidParams(format!(
                    "{} ({}, {}) lies inside an obstacle",
                    name, p[0], p[1]
                )));
            }
        }

        let tree = if params.use_spatial_index {
            Tree::with_spatial_index(x_start)
        } else {
            Tree::new(x_start)
        };
        info!(
            ?params,
            num_obstacles = obstacles.len(),
            "RRT initialized from ({}, {}) to ({}, {})",
            x_start[0],
            x_start[1],
            x_goal[0],
            x_goal[1]
        );
        Ok(Self {
            params,
            sampler,
            steering,
            x_start,
            x_goal,
            obstacles,
            tree,
            rng,
            goal_index: None,
            num_iter: 0,
        })
    }

    pub fn params(&self) -> &RRTParams {
        &self.params
    }

    pub fn start(&self) -> Point {
        self.x_start
    }

    pub fn goal(&self) -> Point {
        self.x_goal
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn obstacles(&self) -> &Obstacles {
        &self.obstacles
    }

    pub fn num_iter(&self) -> u64 {
        self.num_iter
    }

    pub fn is_reached(&self) -> bool {
        self.goal_index.is_some()
    }

    /// Index of the goal node, once the goal has been reached.
    pub fn goal_index(&self) -> Option<usize> {
        self.goal_index
    }

    pub fn sample(&mut self) -> Point {
        self.sampler.sample(&mut self.rng)
    }

    pub fn nearest(&self, x_rand: &Point) -> (usize, f64) {
        self.tree.nearest(x_rand)
    }

    pub fn steer(&self, x_near: &Point, x_rand: &Point) -> RRTResult<Point> {
        steering::new_config(&self.steering, x_near, x_rand)
    }

    pub fn is_collision_free(&self, x_near: &Point, x_new: &Point) -> bool {
        if self.obstacles.is_empty() {
            return true;
        }
        if self.obstacles.inside_obstacles(x_new) {
            return false;
        }
        !(self.params.check_segment_collision
            && self.obstacles.intersects_with_segment(x_near, x_new))
    }

    pub fn reached_goal(&self, x: &Point) -> bool {
        utils::distance(x, &self.x_goal) < self.steering.step_size()
    }

    /// One extension step toward `x_rand`. The tree grows by one node on `Advanced`,
    /// by one or two nodes on `Reached` and is left untouched on `Trapped`.
    pub fn extend(&mut self, x_rand: &Point) -> RRTResult<Status> {
        if !x_rand[0].is_finite() || !x_rand[1].is_finite() {
            return Err(RRTError::NonFiniteCoordinate {
                x: x_rand[0],
                y: x_rand[1],
            });
        }
        let (near_index, _) = self.nearest(x_rand);
        let x_near = self.tree.nodes()[near_index].pt;
        let x_new = self.steer(&x_near, x_rand)?;

        if !self.is_collision_free(&x_near, &x_new) {
            trace!("Inside obstacle: ({}, {})", x_new[0], x_new[1]);
            return Ok(Status::Trapped);
        }

        // Sample within one step of the nearest node: the candidate is that node.
        if x_new == x_near {
            if self.reached_goal(&x_near) && self.is_collision_free(&x_near, &self.x_goal) {
                self.insert_goal(near_index)?;
                return Ok(Status::Reached);
            }
            return Ok(Status::Trapped);
        }

        let new_index = self.tree.append(Node::new(x_new, near_index))?;
        if self.reached_goal(&x_new) && self.is_collision_free(&x_new, &self.x_goal) {
            self.insert_goal(new_index)?;
            return Ok(Status::Reached);
        }
        Ok(Status::Advanced)
    }

    fn insert_goal(&mut self, parent: usize) -> RRTResult<()> {
        let goal_index = self.tree.append(Node::new(self.x_goal, parent))?;
        if self.goal_index.is_none() {
            self.goal_index = Some(goal_index);
        }
        info!(
            num_iter = self.num_iter,
            num_nodes = self.tree.len(),
            "Reached goal"
        );
        Ok(())
    }

    /// Draws one sample and extends the tree toward it. Once the goal has been
    /// reached this returns `Reached` without touching the tree.
    pub fn step(&mut self) -> RRTResult<Status> {
        if self.is_reached() {
            return Ok(Status::Reached);
        }
        let x_rand = self.sample();
        let status = self.extend(&x_rand)?;
        self.num_iter += 1;
        debug!(
            iteration = self.num_iter,
            ?status,
            num_nodes = self.tree.len(),
            "RRT step"
        );
        Ok(status)
    }

    pub fn grow_towards_goal(&mut self) -> RRTResult<RRTSolution> {
        self.grow_towards_goal_with(|_| ControlFlow::Continue(()))
    }

    /// Runs the planner loop until the goal is reached, the iteration or node budget
    /// runs out, or `observer` breaks. The observer sees the tree after every
    /// iteration.
    pub fn grow_towards_goal_with<F>(&mut self, mut observer: F) -> RRTResult<RRTSolution>
    where
        F: FnMut(&IterationReport<'_>) -> ControlFlow<()>,
    {
        let mut cancelled = false;
        while !self.is_reached() && self.num_iter < self.params.max_iter {
            if self.tree.len() >= self.params.max_nodes {
                warn!(num_nodes = self.tree.len(), "Node budget exhausted");
                break;
            }
            let status = self.step()?;
            let report = IterationReport {
                iteration: self.num_iter,
                status,
                tree: &self.tree,
                obstacles: &self.obstacles,
            };
            if observer(&report).is_break() {
                cancelled = true;
                break;
            }
        }
        if !self.is_reached() && self.num_iter >= self.params.max_iter {
            warn!(
                max_iter = self.params.max_iter,
                num_nodes = self.tree.len(),
                "Iteration budget exhausted without reaching the goal"
            );
        }
        self.extract_solution(cancelled)
    }

    pub fn extract_solution(&self, cancelled: bool) -> RRTResult<RRTSolution> {
        let (status, path) = match self.goal_index {
            Some(goal_index) => {
                let mut path = self.tree.path_from_root(goal_index)?;
                path.dedup();
                (Status::Reached, path)
            }
            None => (Status::Trapped, Vec::new()),
        };
        Ok(RRTSolution {
            status,
            cost: utils::compute_path_length(&path),
            path: path.iter().map(|p| [p[0], p[1]]).collect(),
            num_iter: self.num_iter,
            num_nodes: self.tree.len(),
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn open_problem() -> PlanningProblem {
        PlanningProblem {
            width: 200.0,
            height: 200.0,
            start: [0.0, 0.0],
            goal: [100.0, 0.0],
            obstacles: vec![],
        }
    }

    /// A wall spanning the whole workspace height, thicker than one step.
    fn walled_problem() -> PlanningProblem {
        PlanningProblem {
            width: 200.0,
            height: 100.0,
            start: [20.0, 50.0],
            goal: [180.0, 50.0],
            obstacles: vec![vec![[90.0, -10.0], [115.0, -10.0], [115.0, 110.0], [90.0, 110.0]]],
        }
    }

    fn seeded(params: RRTParams, problem: &PlanningProblem, seed: u64) -> RRT {
        RRT::with_rng(params, problem, ChaChaRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = RRTParams::default();
        assert_eq!(params.max_iter, 1000);
        assert_eq!(params.step_size, 20.0);
        assert_eq!(params.goal_bias, 0.1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_from_json_value() -> anyhow::Result<()> {
        let params = RRTParams::from_json_value(json!({
            "max_iter": 50,
            "step_size": 5.0,
            "seed": 3,
        }))?;
        assert_eq!(params.max_iter, 50);
        assert_eq!(params.step_size, 5.0);
        assert_eq!(params.seed, Some(3));
        // unspecified fields keep their defaults
        assert_eq!(params.goal_bias, 0.1);
        Ok(())
    }

    #[test]
    fn test_params_from_file() -> anyhow::Result<()> {
        let rust_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let filename = rust_root.join("config/default_params.toml");
        let params = RRTParams::from_file(filename.to_str().unwrap())?;
        assert_eq!(params, RRTParams::default());

        let out = std::env::temp_dir().join("rrt_rust_params_test.json");
        let out = out.to_str().unwrap();
        params.to_file(out)?;
        let reloaded = RRTParams::from_file(out)?;
        std::fs::remove_file(out)?;
        assert_eq!(reloaded, params);
        Ok(())
    }

    #[test]
    fn test_invalid_setup() {
        let problem = open_problem();
        let params = RRTParams {
            step_size: 0.0,
            ..RRTParams::default()
        };
        assert!(matches!(
            RRT::new(params, &problem),
            Err(RRTError::InvalidParams(_))
        ));
        let params = RRTParams {
            goal_bias: 2.0,
            ..RRTParams::default()
        };
        assert!(RRT::new(params, &problem).is_err());
        let params = RRTParams {
            max_iter: 0,
            ..RRTParams::default()
        };
        assert!(RRT::new(params, &problem).is_err());

        let mut problem = walled_problem();
        problem.start = [100.0, 50.0];
        assert!(matches!(
            RRT::new(RRTParams::default(), &problem),
            Err(RRTError::InvalidParams(_))
        ));
        let mut problem = open_problem();
        problem.goal = [300.0, 0.0];
        assert!(RRT::new(RRTParams::default(), &problem).is_err());
    }

    #[test]
    fn test_straight_line_to_goal() -> anyhow::Result<()> {
        init_tracing();
        let params = RRTParams {
            step_size: 20.0,
            goal_bias: 1.0,
            ..RRTParams::default()
        };
        let mut rrt = seeded(params, &open_problem(), 0);

        assert_eq!(rrt.step()?, Status::Advanced);
        assert_eq!(rrt.tree().len(), 2);
        let first = rrt.tree().last();
        assert_eq!(first.parent, Some(0));
        assert_relative_eq!(first.pt, Point::new(20.0, 0.0));

        for _ in 0..3 {
            assert_eq!(rrt.step()?, Status::Advanced);
        }
        assert_eq!(rrt.step()?, Status::Reached);
        assert_eq!(rrt.num_iter(), 5);

        let soln = rrt.extract_solution(false)?;
        assert!(soln.is_reached());
        assert_eq!(soln.path.len(), 6);
        assert_eq!(soln.path.first(), Some(&[0.0, 0.0]));
        assert_eq!(soln.path.last(), Some(&[100.0, 0.0]));
        for w in soln.path.windows(2) {
            let d = utils::distance(&Point::new(w[0][0], w[0][1]), &Point::new(w[1][0], w[1][1]));
            assert_relative_eq!(d, 20.0, epsilon = 1e-9);
        }
        assert_relative_eq!(soln.cost, 100.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_separated_goal_is_trapped() -> anyhow::Result<()> {
        init_tracing();
        let params = RRTParams {
            max_iter: 300,
            ..RRTParams::default()
        };
        let mut rrt = seeded(params, &walled_problem(), 5);
        let soln = rrt.grow_towards_goal()?;
        assert_eq!(soln.status, Status::Trapped);
        assert!(!soln.cancelled);
        assert!(soln.path.is_empty());
        assert_eq!(soln.num_iter, 300);
        assert!(soln.num_nodes >= 1 && soln.num_nodes <= 301);
        for node in rrt.tree().iter() {
            assert!(node.pt[0] < 90.0);
        }
        Ok(())
    }

    #[test]
    fn test_sample_within_step_of_nearest() -> anyhow::Result<()> {
        let mut problem = open_problem();
        problem.goal = [150.0, 150.0];
        let mut rrt = seeded(RRTParams::default(), &problem, 0);
        let status = rrt.extend(&Point::new(5.0, 0.0))?;
        assert_eq!(status, Status::Trapped);
        assert_eq!(rrt.tree().len(), 1);
        // sampling the root itself must not fail on a zero-length steer
        assert_eq!(rrt.extend(&Point::new(0.0, 0.0))?, Status::Trapped);
        assert_eq!(rrt.tree().len(), 1);
        assert!(rrt.tree().is_well_formed());
        Ok(())
    }

    #[test]
    fn test_start_within_step_of_goal() -> anyhow::Result<()> {
        let mut problem = open_problem();
        problem.goal = [10.0, 0.0];
        let mut rrt = seeded(RRTParams::default(), &problem, 0);
        assert_eq!(rrt.extend(&Point::new(10.0, 0.0))?, Status::Reached);
        assert_eq!(rrt.tree().len(), 2);
        assert_eq!(rrt.tree().last().parent, Some(0));
        let soln = rrt.extract_solution(false)?;
        assert_eq!(soln.path, vec![[0.0, 0.0], [10.0, 0.0]]);
        Ok(())
    }

    #[test]
    fn test_tree_invariants_hold_every_iteration() -> anyhow::Result<()> {
        init_tracing();
        let problem = PlanningProblem::default();
        for seed in 0..5 {
            let params = RRTParams {
                max_iter: 400,
                ..RRTParams::default()
            };
            let mut rrt = seeded(params, &problem, seed);
            let mut prev_len = rrt.tree().len();
            rrt.grow_towards_goal_with(|report| {
                let len = report.tree.len();
                let growth = len - prev_len;
                match report.status {
                    Status::Trapped => assert_eq!(growth, 0),
                    Status::Advanced => assert_eq!(growth, 1),
                    Status::Reached => assert!(growth == 1 || growth == 2),
                }
                assert!(report.tree.is_well_formed());
                for node in report.tree.iter() {
                    assert!(!report.obstacles.inside_obstacles(&node.pt));
                }
                prev_len = len;
                ControlFlow::Continue(())
            })?;
        }
        Ok(())
    }

    #[test]
    fn test_default_problem_is_solved() -> anyhow::Result<()> {
        init_tracing();
        let problem = PlanningProblem::default();
        let params = RRTParams {
            max_iter: 20_000,
            use_spatial_index: true,
            seed: Some(1),
            ..RRTParams::default()
        };
        let mut rrt = RRT::new(params, &problem)?;
        let soln = rrt.grow_towards_goal()?;
        assert!(soln.is_reached());
        assert_eq!(soln.path.first(), Some(&problem.start));
        assert_eq!(soln.path.last(), Some(&problem.goal));
        for w in soln.path.windows(2) {
            let d = utils::distance(&Point::new(w[0][0], w[0][1]), &Point::new(w[1][0], w[1][1]));
            assert!(d <= 20.0 + 1e-9);
        }
        for p in soln.path.iter() {
            assert!(!rrt.obstacles().inside_obstacles(&Point::new(p[0], p[1])));
        }
        assert!(soln.cost >= 400.0);
        Ok(())
    }

    #[test]
    fn test_step_after_reached_is_noop() -> anyhow::Result<()> {
        let params = RRTParams {
            goal_bias: 1.0,
            ..RRTParams::default()
        };
        let mut rrt = seeded(params, &open_problem(), 0);
        let soln = rrt.grow_towards_goal()?;
        assert!(soln.is_reached());
        let len = rrt.tree().len();
        let num_iter = rrt.num_iter();
        assert_eq!(rrt.step()?, Status::Reached);
        assert_eq!(rrt.tree().len(), len);
        assert_eq!(rrt.num_iter(), num_iter);
        Ok(())
    }

    #[test]
    fn test_observer_cancels_run() -> anyhow::Result<()> {
        let mut rrt = seeded(RRTParams::default(), &PlanningProblem::default(), 2);
        let soln = rrt.grow_towards_goal_with(|report| {
            if report.iteration >= 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;
        assert!(soln.cancelled);
        assert_eq!(soln.num_iter, 3);
        assert!(rrt.tree().len() <= 1 + 2 * 3);
        Ok(())
    }

    #[test]
    fn test_node_budget() -> anyhow::Result<()> {
        let params = RRTParams {
            max_nodes: 10,
            max_iter: 5000,
            goal_bias: 0.0,
            ..RRTParams::default()
        };
        let mut rrt = seeded(params, &walled_problem(), 9);
        let soln = rrt.grow_towards_goal()?;
        assert_eq!(soln.status, Status::Trapped);
        assert_eq!(soln.num_nodes, 10);
        assert!(soln.num_iter < 5000);
        Ok(())
    }

    #[test]
    fn test_spatial_index_grows_identical_tree() -> anyhow::Result<()> {
        let problem = PlanningProblem::default();
        let params = RRTParams {
            max_iter: 500,
            ..RRTParams::default()
        };
        let indexed_params = RRTParams {
            use_spatial_index: true,
            ..params
        };
        let mut linear = seeded(params, &problem, 4);
        let mut indexed = seeded(indexed_params, &problem, 4);
        assert!(indexed.tree().has_spatial_index());
        let soln_linear = linear.grow_towards_goal()?;
        let soln_indexed = indexed.grow_towards_goal()?;
        assert_eq!(linear.tree().nodes(), indexed.tree().nodes());
        assert_eq!(soln_linear, soln_indexed);
        Ok(())
    }

    #[test]
    fn test_segment_collision_check() -> anyhow::Result<()> {
        // A wall thinner than one step: point checks alone could hop over it.
        let problem = PlanningProblem {
            width: 200.0,
            height: 100.0,
            start: [20.0, 50.0],
            goal: [180.0, 50.0],
            obstacles: vec![vec![[99.0, -10.0], [101.0, -10.0], [101.0, 110.0], [99.0, 110.0]]],
        };
        let params = RRTParams {
            max_iter: 500,
            check_segment_collision: true,
            ..RRTParams::default()
        };
        let mut rrt = seeded(params, &problem, 8);
        let soln = rrt.grow_towards_goal()?;
        assert_eq!(soln.status, Status::Trapped);
        for (child, parent) in rrt.tree().edges() {
            assert!(!rrt.obstacles().intersects_with_segment(&parent, &child));
        }
        Ok(())
    }

    #[test]
    fn test_same_seed_same_run() -> anyhow::Result<()> {
        let params = RRTParams {
            max_iter: 200,
            seed: Some(17),
            ..RRTParams::default()
        };
        let problem = PlanningProblem::default();
        let mut a = RRT::new(params, &problem)?;
        let mut b = RRT::new(params, &problem)?;
        assert_eq!(a.grow_towards_goal()?, b.grow_towards_goal()?);
        assert_eq!(a.tree().nodes(), b.tree().nodes());
        Ok(())
    }

    #[test]
    fn test_extend_rejects_non_finite_sample() {
        let mut rrt = seeded(RRTParams::default(), &open_problem(), 0);
        assert!(matches!(
            rrt.extend(&Point::new(f64::NAN, 0.0)),
            Err(RRTError::NonFiniteCoordinate { .. })
        ));
        assert_eq!(rrt.tree().len(), 1);
    }
}
