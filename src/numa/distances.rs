use std::path::Path;

use log::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::numa::{NodeSource, SysfsNodes};
use crate::sysfs::Sysfs;

const DISTANCE_FILE: &str = "distance";
const DISTANCE_SEPARATOR: char = ' ';

#[derive(Debug, Clone)]
struct NodeDistances {
    values: Vec<u32>,
}

impl NodeDistances {
    fn parse(node: u32, num_nodes: usize, path: &Path, data: &str) -> TopologyResult<Self> {
        let dists: Vec<&str> = data.split(DISTANCE_SEPARATOR).collect();
        if dists.len() != num_nodes {
            return Err(TopologyError::DistanceCount {
                node,
                found: dists.len(),
                expected: num_nodes,
            });
        }
        let values = dists
            .into_iter()
            .map(|d| {
                d.parse::<u32>().map_err(|_| TopologyError::Parse {
                    path: path.to_path_buf(),
                    value: d.to_string(),
                })
            })
            .collect::<TopologyResult<Vec<_>>>()?;
        Ok(Self { values })
    }
}

/// Relative memory-access cost between every pair of online NUMA nodes.
///
/// Row `i` belongs to the `i`-th online node in enumeration order, and so does
/// column `j`. The table is taken as reported, never checked for symmetry.
#[derive(Debug, Clone)]
pub struct Distances {
    online_nodes: Vec<u32>,
    by_node: Vec<NodeDistances>,
}

impl Distances {
    /// Reads the distance table of the machine whose sysfs is mounted at `sysfs_path`.
    ///
    /// # Errors
    /// Fails if the online nodes cannot be enumerated, if a `distance` file is
    /// unreadable, holds a non-numeric value, or does not have one value per
    /// online node.
    pub fn from_sysfs(sysfs_path: &Path) -> TopologyResult<Self> {
        Self::from_source(&SysfsNodes, sysfs_path)
    }

    /// Same as [`from_sysfs`](Self::from_sysfs), reading through `source`.
    ///
    /// # Errors
    /// See [`from_sysfs`](Self::from_sysfs).
    pub fn from_source<S: NodeSource + ?Sized>(
        source: &S,
        sysfs_path: &Path,
    ) -> TopologyResult<Self> {
        let online_nodes = source.online_nodes(sysfs_path)?;
        let sys = Sysfs::new(sysfs_path);

        let mut by_node = Vec::with_capacity(online_nodes.len());
        for &node in &online_nodes {
            let data = source.read_node_file(sysfs_path, node, DISTANCE_FILE)?;
            let path = sys.for_node(node).path().join(DISTANCE_FILE);
            let dist = NodeDistances::parse(node, online_nodes.len(), &path, &data)?;
            debug!("numa node {node} distances: {:?}", dist.values);
            by_node.push(dist);
        }

        Ok(Self {
            online_nodes,
            by_node,
        })
    }

    /// Online node IDs, in the order the rows are stored.
    #[must_use]
    pub fn online_nodes(&self) -> &[u32] {
        &self.online_nodes
    }

    fn position(&self, node: u32) -> TopologyResult<usize> {
        self.online_nodes
            .iter()
            .position(|&n| n == node)
            .ok_or(TopologyError::UnknownNode(node))
    }

    /// Cost of accessing `to`'s memory from `from`.
    ///
    /// # Errors
    /// Returns [`TopologyError::UnknownNode`] if either node is not online.
    pub fn between_nodes(&self, from: u32, to: u32) -> TopologyResult<u32> {
        let row = self.position(from)?;
        let col = self.position(to)?;
        Ok(self.by_node[row].values[col])
    }

    /// The whole row of `from`, in online-node order.
    ///
    /// # Errors
    /// Returns [`TopologyError::UnknownNode`] if `from` is not online.
    pub fn from_node(&self, from: u32) -> TopologyResult<&[u32]> {
        let row = self.position(from)?;
        Ok(&self.by_node[row].values)
    }
}
