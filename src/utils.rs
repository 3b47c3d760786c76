//! # utils
//! Contains utility functions for the RRT algorithm
//!
use crate::common::Point;
use geo::{coord, Rect};
use rand::Rng;

/// Euclidean distance between two points.
pub fn distance(a: &Point, b: &Point) -> f64 {
    (a - b).norm()
}

pub fn distance_squared(a: &Point, b: &Point) -> f64 {
    (a - b).norm_squared()
}

pub fn bbox_from_corner_points(p1: &Point, p2: &Point, buffer: f64) -> Rect {
    let p_min = Point::new(p1[0].min(p2[0]) - buffer, p1[1].min(p2[1]) - buffer);
    let p_max = Point::new(p1[0].max(p2[0]) + buffer, p1[1].max(p2[1]) + buffer);
    Rect::new(
        coord! { x: p_min[0], y: p_min[1] },
        coord! { x: p_max[0], y: p_max[1]},
    )
}

/// Workspace spanning [0, width] x [0, height].
pub fn workspace_bbox(width: f64, height: f64) -> Rect {
    Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: width, y: height })
}

pub fn bbox_contains(bbox: &Rect, p: &Point) -> bool {
    p[0] >= bbox.min().x && p[0] <= bbox.max().x && p[1] >= bbox.min().y && p[1] <= bbox.max().y
}

/// Uniform sample, each coordinate drawn independently from the closed range of the box.
pub fn sample_from_bbox<R: Rng + ?Sized>(bbox: &Rect, rng: &mut R) -> Point {
    let x = rng.gen_range(bbox.min().x..=bbox.max().x);
    let y = rng.gen_range(bbox.min().y..=bbox.max().y);
    Point::new(x, y)
}

pub fn compute_path_length(path: &[Point]) -> f64 {
    path.iter()
        .zip(path.iter().skip(1))
        .map(|(p1, p2)| distance(p1, p2))
        .sum()
}
