use std::env;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::TopologyResult;
use crate::utils;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys";
pub const SYSFS_ROOT_ENV: &str = "TOPOLOGYINFO_SYSFS_ROOT";

/// Subpath holding one `node<N>` directory per NUMA node, plus the `online` list.
pub const PATH_DEVICES_SYSTEM_NODE: &str = "devices/system/node";

/// A sysfs-like tree rooted somewhere on the filesystem.
#[derive(Debug, Clone)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `TOPOLOGYINFO_SYSFS_ROOT` when set, `/sys` otherwise.
    #[must_use]
    pub fn from_env() -> Self {
        let root = env::var_os(SYSFS_ROOT_ENV)
            .filter(|v| !v.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_SYSFS_ROOT), PathBuf::from);
        debug!("sysfs root: {}", root.display());
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn nodes_dir(&self) -> PathBuf {
        self.root.join(PATH_DEVICES_SYSTEM_NODE)
    }

    #[must_use]
    pub fn for_node(&self, node: u32) -> NodeDir {
        NodeDir {
            path: self.nodes_dir().join(format!("node{node}")),
        }
    }
}

/// The `node<N>` directory of a single NUMA node.
#[derive(Debug, Clone)]
pub struct NodeDir {
    path: PathBuf,
}

impl NodeDir {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads one attribute of this node, trailing newline removed.
    ///
    /// # Errors
    /// Fails if the file is missing or unreadable.
    pub fn read_file(&self, name: &str) -> TopologyResult<String> {
        utils::read_trimmed(&self.path.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn node_paths_follow_kernel_layout() {
        let sys = Sysfs::new("/fake");
        assert_eq!(
            sys.for_node(3).path(),
            Path::new("/fake/devices/system/node/node3")
        );
    }

    #[test]
    fn read_file_trims_newline() {
        let dir = TempDir::new().unwrap();
        let sys = Sysfs::new(dir.path());
        let node = sys.for_node(0);
        fs::create_dir_all(node.path()).unwrap();
        fs::write(node.path().join("distance"), "10 20\n").unwrap();
        assert_eq!(node.read_file("distance").unwrap(), "10 20");
    }

    #[test]
    fn read_file_missing_fails() {
        let dir = TempDir::new().unwrap();
        let sys = Sysfs::new(dir.path());
        assert!(sys.for_node(1).read_file("distance").is_err());
    }
}
