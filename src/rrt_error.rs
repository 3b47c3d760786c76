//! Custom error for the RRT library.
//!
//! Precondition violations (degenerate obstacles, zero-length steering) are kept
//! apart from planning failure, which is reported as [`crate::common::Status::Trapped`]
//! and never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RRTError {
    #[error("degenerate polygon: expected at least 3 distinct vertices, got {num_vertices}")]
    DegeneratePolygon { num_vertices: usize },

    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("cannot steer along a zero-length vector")]
    ZeroLengthSteer,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("node index {index} out of range for tree of {len} nodes")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("tree storage exhausted")]
    OutOfMemory(#[from] std::collections::TryReserveError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RRTResult<T> = std::result::Result<T, RRTError>;
