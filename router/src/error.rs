use gr_common::geom::coord::GridCoord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("negative capacity {capacity} on layer {layer} at ({x}, {y})")]
    NegativeCapacity {
        layer: usize,
        x: i32,
        y: i32,
        capacity: f64,
    },
    #[error("demand dropped to {demand} on layer {layer} at ({x}, {y})")]
    NegativeDemand {
        layer: usize,
        x: i32,
        y: i32,
        demand: f64,
    },
    #[error("via count dropped below zero at ({x}, {y})")]
    NegativeViaCount { x: i32, y: i32 },
    #[error("invalid fixed layer interval [{low}, {high}] at ({x}, {y})")]
    InvalidFixedLayers {
        low: usize,
        high: usize,
        x: i32,
        y: i32,
    },
    #[error("net '{net}': access point {point} is outside the routing grid")]
    AccessPointOutOfGrid { net: String, point: GridCoord },
    #[error("net '{net}': path {from:?} -> {to:?} is not rectilinear")]
    NonRectilinearPath {
        net: String,
        from: (i32, i32),
        to: (i32, i32),
    },
    #[error("routing tree edge {from} -> {to} is neither a run nor a via")]
    MalformedTree { from: GridCoord, to: GridCoord },
    #[error("net '{net}': no feasible layer assignment")]
    NoFeasibleLayer { net: String },
    #[error("net '{net}': {step} called before {requires}")]
    InvalidStage {
        net: String,
        step: &'static str,
        requires: &'static str,
    },
    #[error("net '{net}': access point ({x}, {y}) is unreachable on the sparse grid")]
    MazeUnreachable { net: String, x: i32, y: i32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("steiner engine lock poisoned")]
    LockPoisoned,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
