pub mod distances;

use std::path::Path;

use crate::error::TopologyResult;
use crate::sysfs::Sysfs;
use crate::utils;

pub use distances::Distances;

/// Supplies the online NUMA nodes of a machine and the per-node pseudo-files.
pub trait NodeSource {
    /// Online node IDs, in enumeration order.
    ///
    /// # Errors
    /// Fails if the node list cannot be read or parsed.
    fn online_nodes(&self, root: &Path) -> TopologyResult<Vec<u32>>;

    /// Content of the attribute `name` of `node`, trailing newline removed.
    ///
    /// # Errors
    /// Fails if the attribute cannot be read.
    fn read_node_file(&self, root: &Path, node: u32, name: &str) -> TopologyResult<String>;
}

/// Reads nodes from `devices/system/node` under a sysfs root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsNodes;

impl NodeSource for SysfsNodes {
    fn online_nodes(&self, root: &Path) -> TopologyResult<Vec<u32>> {
        let online = Sysfs::new(root).nodes_dir().join("online");
        utils::parse_list_format(&utils::read_trimmed(&online)?)
    }

    fn read_node_file(&self, root: &Path, node: u32, name: &str) -> TopologyResult<String> {
        Sysfs::new(root).for_node(node).read_file(name)
    }
}
