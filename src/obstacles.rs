//! # Obstacles
//! Polygonal obstacles of the workspace and the collision queries run against them.
//!
//! Polygons are validated on construction, so a degenerate obstacle can never reach
//! the collision check and be silently reported as "outside".
use crate::common::{point_from_array, Point};
use crate::rrt_error::{RRTError, RRTResult};
use geo::{coord, BoundingRect, Coord, Intersects, Line, LineString, Rect};

/// A simple, closed obstacle polygon with at least 3 distinct vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    geometry: geo::Polygon<f64>,
    bbox: Rect<f64>,
}

impl Polygon {
    /// Builds a closed polygon from its vertices. The ring is closed automatically if
    /// the last vertex does not repeat the first one.
    pub fn new(vertices: &[Point]) -> RRTResult<Self> {
        let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
        for v in vertices {
            if !v[0].is_finite() || !v[1].is_finite() {
                return Err(RRTError::NonFiniteCoordinate { x: v[0], y: v[1] });
            }
            let c = coord! { x: v[0], y: v[1] };
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }
        if distinct.len() < 3 {
            return Err(RRTError::DegeneratePolygon {
                num_vertices: distinct.len(),
            });
        }

        let exterior: Vec<Coord<f64>> = vertices.iter().map(|v| coord! { x: v[0], y: v[1] }).collect();
        let geometry = geo::Polygon::new(LineString(exterior), vec![]);
        let bbox = geometry
            .bounding_rect()
            .ok_or(RRTError::DegeneratePolygon { num_vertices: 0 })?;
        Ok(Self { geometry, bbox })
    }

    pub fn from_coords(coords: &[[f64; 2]]) -> RRTResult<Self> {
        let vertices = coords
            .iter()
            .map(|c| point_from_array(*c))
            .collect::<RRTResult<Vec<Point>>>()?;
        Self::new(&vertices)
    }

    /// Number of points in the closed boundary, first point repeated last.
    pub fn num_points(&self) -> usize {
        self.geometry.exterior().0.len()
    }

    /// The closed boundary, first point repeated last.
    pub fn points(&self) -> Vec<Point> {
        self.geometry
            .exterior()
            .0
            .iter()
            .map(|c| Point::new(c.x, c.y))
            .collect()
    }

    pub fn geometry(&self) -> &geo::Polygon<f64> {
        &self.geometry
    }

    pub fn bbox(&self) -> Rect<f64> {
        self.bbox
    }

    /// Point-in-polygon test. Points on the boundary count as inside.
    pub fn contains_point(&self, p: &Point) -> bool {
        let c = coord! { x: p[0], y: p[1] };
        if c.x < self.bbox.min().x
            || c.x > self.bbox.max().x
            || c.y < self.bbox.min().y
            || c.y > self.bbox.max().y
        {
            return false;
        }
        self.geometry.intersects(&c)
    }

    pub fn intersects_with_segment(&self, p1: &Point, p2: &Point) -> bool {
        let line = Line::new(coord! { x: p1[0], y: p1[1] }, coord! { x: p2[0], y: p2[1] });
        self.geometry.intersects(&line)
    }
}

/// The obstacle set of a planning run. Fixed once the run starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obstacles {
    polygons: Vec<Polygon>,
    bbox: Option<Rect<f64>>,
}

impl Obstacles {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let bbox = polygons.iter().map(|p| p.bbox()).reduce(|acc, r| {
            Rect::new(
                coord! { x: acc.min().x.min(r.min().x), y: acc.min().y.min(r.min().y) },
                coord! { x: acc.max().x.max(r.max().x), y: acc.max().y.max(r.max().y) },
            )
        });
        Self { polygons, bbox }
    }

    pub fn from_coords(obstacles: &[Vec<[f64; 2]>]) -> RRTResult<Self> {
        let polygons = obstacles
            .iter()
            .map(|coords| Polygon::from_coords(coords))
            .collect::<RRTResult<Vec<Polygon>>>()?;
        Ok(Self::new(polygons))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    /// Bounding box of all obstacles, `None` when the set is empty.
    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    /// Check if a point is inside (or on the boundary of) any obstacle
    pub fn inside_obstacles(&self, p: &Point) -> bool {
        self.polygons.iter().any(|poly| poly.contains_point(p))
    }

    pub fn intersects_with_segment(&self, p1: &Point, p2: &Point) -> bool {
        self.polygons
            .iter()
            .any(|poly| poly.intersects_with_segment(p1, p2))
    }
}

impl<'a> IntoIterator for &'a Obstacles {
    type Item = &'a Polygon;
    type IntoIter = std::slice::Iter<'a, Polygon>;

    fn into_iter(self) -> Self::IntoIter {
        self.polygons.iter()
    }
}

pub fn point_inside_any_obstacle(point: &Point, obstacles: &Obstacles) -> bool {
    obstacles.inside_obstacles(point)
}
