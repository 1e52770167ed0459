use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O Error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid number {value:?} in {}", .path.display())]
    Parse { path: PathBuf, value: String },

    #[error("Found {found} distance values for NUMA node {node}, expected {expected}")]
    DistanceCount {
        node: u32,
        found: usize,
        expected: usize,
    },

    #[error("Unknown NUMA node: {0}")]
    UnknownNode(u32),

    #[error("Invalid node list: {0}")]
    InvalidList(String),

    #[error("Refusing to materialize a tree rooted at {0:?}")]
    InvalidRoot(String),
}

impl TopologyError {
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }
}

// A convenient alias
pub type TopologyResult<T> = Result<T, TopologyError>;
