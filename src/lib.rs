//! Hardware topology of a machine as exposed through sysfs: PCI(-express)
//! devices with their SRIOV relationships, and NUMA node distances.

pub mod error;
pub mod fakesysfs;
pub mod numa;
pub mod pcidev;
pub mod sysfs;
mod utils;

pub use error::{TopologyError, TopologyResult};
pub use numa::Distances;
pub use pcidev::{PciDeviceInfo, PciDevices};
