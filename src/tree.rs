//! # Tree
//! Append-only RRT tree store.
//!
//! Nodes are owned by the tree and refer to their parent by its insertion index, so a
//! parent is always a node inserted earlier and the parent relation cannot form a cycle.
//! Nearest-neighbour queries scan every node. When built with a spatial index the nodes
//! are mirrored in an `RTree`, which answers the same queries exactly, including the
//! tie-break on the earliest inserted node.
use crate::common::Point;
use crate::rrt_error::{RRTError, RRTResult};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub pt: Point,
    /// Insertion index of the parent node. `None` only for the root.
    pub parent: Option<usize>,
}

impl Node {
    pub fn root(pt: Point) -> Self {
        Self { pt, parent: None }
    }

    pub fn new(pt: Point, parent: usize) -> Self {
        Self {
            pt,
            parent: Some(parent),
        }
    }

    pub fn point(&self) -> [f64; 2] {
        [self.pt[0], self.pt[1]]
    }
}

fn distance_2(p: &[f64; 2], q: &[f64; 2]) -> f64 {
    let x = p[0] - q[0];
    let y = p[1] - q[1];
    x * x + y * y
}

/// Entry of the spatial index, pointing back into the node storage.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedPoint {
    index: usize,
    point: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        distance_2(&self.point, point)
    }
}

#[derive(Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    rtree: Option<RTree<IndexedPoint>>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes)
            .field("spatial_index", &self.rtree.is_some())
            .finish()
    }
}

impl Tree {
    /// Creates a tree holding only the root node.
    pub fn new(root: Point) -> Self {
        Self {
            nodes: vec![Node::root(root)],
            rtree: None,
        }
    }

    pub fn with_spatial_index(root: Point) -> Self {
        let mut rtree = RTree::new();
        rtree.insert(IndexedPoint {
            index: 0,
            point: [root[0], root[1]],
        });
        Self {
            nodes: vec![Node::root(root)],
            rtree: Some(rtree),
        }
    }

    pub fn has_spatial_index(&self) -> bool {
        self.rtree.is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn last(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Appends `node` as the last element and returns its index. The parent must
    /// already be in the tree.
    pub fn append(&mut self, node: Node) -> RRTResult<usize> {
        let parent = node.parent.ok_or_else(|| {
            RRTError::InvalidParams("only the root node may lack a parent".to_string())
        })?;
        if parent >= self.nodes.len() {
            return Err(RRTError::NodeIndexOutOfRange {
                index: parent,
                len: self.nodes.len(),
            });
        }
        self.nodes.try_reserve(1)?;
        let index = self.nodes.len();
        self.nodes.push(node);
        if let Some(rtree) = self.rtree.as_mut() {
            rtree.insert(IndexedPoint {
                index,
                point: node.point(),
            });
        }
        Ok(index)
    }

    /// Index of the node closest to `query` and its distance. Ties go to the node
    /// inserted first.
    pub fn nearest(&self, query: &Point) -> (usize, f64) {
        let (index, dist_2) = match &self.rtree {
            Some(rtree) => Self::nearest_indexed(rtree, query).unwrap_or((0, f64::INFINITY)),
            None => self.nearest_linear(query),
        };
        (index, dist_2.sqrt())
    }

    fn nearest_linear(&self, query: &Point) -> (usize, f64) {
        let q = [query[0], query[1]];
        let mut nearest = (0, f64::INFINITY);
        for (i, node) in self.nodes.iter().enumerate() {
            let d2 = distance_2(&node.point(), &q);
            if d2 < nearest.1 {
                nearest = (i, d2);
            }
        }
        nearest
    }

    fn nearest_indexed(rtree: &RTree<IndexedPoint>, query: &Point) -> Option<(usize, f64)> {
        let q = [query[0], query[1]];
        let mut candidates = rtree.nearest_neighbor_iter_with_distance_2(&q);
        let (first, best_d2) = candidates.next()?;
        let index = candidates
            .take_while(|(_, d2)| *d2 == best_d2)
            .fold(first.index, |acc, (p, _)| acc.min(p.index));
        Some((index, best_d2))
    }

    /// Points from the node at `index` back to the root, root last.
    pub fn path_to_root(&self, index: usize) -> RRTResult<Vec<Point>> {
        if index >= self.nodes.len() {
            return Err(RRTError::NodeIndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        let mut path = vec![self.nodes[index].pt];
        let mut current = index;
        while let Some(parent) = self.nodes[current].parent {
            path.push(self.nodes[parent].pt);
            current = parent;
        }
        Ok(path)
    }

    /// Points from the root to the node at `index`.
    pub fn path_from_root(&self, index: usize) -> RRTResult<Vec<Point>> {
        let mut path = self.path_to_root(index)?;
        path.reverse();
        Ok(path)
    }

    /// (child, parent) point pairs of every edge, in insertion order of the child.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.nodes
            .iter()
            .filter_map(|node| node.parent.map(|parent| (node.pt, self.nodes[parent].pt)))
    }

    /// Checks that the root is the only parentless node and that every other node
    /// points to a node inserted before it.
    pub fn is_well_formed(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, node)| match node.parent {
            None => i == 0,
            Some(parent) => parent < i,
        })
    }
}
