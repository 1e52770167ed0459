use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::utils;

/// Subpath holding one directory per PCI(-express) device.
pub const PATH_BUS_PCI_DEVICES: &str = "bus/pci/devices/";

/// Reported by firmware that does not know the node of a device.
pub const NUMA_NODE_UNKNOWN: i32 = -1;

pub const DEV_CLASS_NETWORK: u32 = 0x0200;

const ATTR_SRIOV_NUMVFS: &str = "sriov_numvfs";
const ATTR_PHYSFN: &str = "physfn";
const ATTR_NUMA_NODE: &str = "numa_node";
const ATTR_CLASS: &str = "class";
const ATTR_VENDOR: &str = "vendor";
const ATTR_DEVICE: &str = "device";

// ===============================================================================================
// Device Info
// ===============================================================================================

/// A single PCI(-express) device, with its SRIOV role if it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDeviceInfo {
    /// True if this device is a SRIOV Physical Function.
    pub is_phys_fn: bool,
    /// Number of configured Virtual Functions. Meaningless unless `is_phys_fn`.
    pub num_vfs: u32,
    /// True if this device is a SRIOV Virtual Function.
    pub is_vfn: bool,
    /// Address of the parent Physical Function. Meaningless unless `is_vfn`.
    /// Resolve it with [`PciDevices::find_by_address`].
    pub parent_fn: String,
    address: String,
    numa_node: i32,
    dev_class: u32,
    vendor: u16,
    device: u16,
    sysfs_path: PathBuf,
}

impl PciDeviceInfo {
    /// Full address (`bus_id:device_id`) of the device.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn bus_address(&self) -> &str {
        self.address
            .split_once(':')
            .map_or(self.address.as_str(), |(bus, _)| bus)
    }

    /// Address of the device on its bus, empty if the address has no `:`.
    #[must_use]
    pub fn dev_address(&self) -> &str {
        self.address.split_once(':').map_or("", |(_, dev)| dev)
    }

    /// Device class with the programming interface byte dropped, as pciutils does.
    #[must_use]
    pub const fn dev_class(&self) -> u32 {
        self.dev_class
    }

    #[must_use]
    pub const fn vendor(&self) -> u16 {
        self.vendor
    }

    #[must_use]
    pub const fn device(&self) -> u16 {
        self.device
    }

    /// NUMA node the device is attached to, [`NUMA_NODE_UNKNOWN`] if firmware didn't say.
    #[must_use]
    pub const fn numa_node(&self) -> i32 {
        self.numa_node
    }

    #[must_use]
    pub fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    #[must_use]
    pub const fn is_network(&self) -> bool {
        self.dev_class == DEV_CLASS_NETWORK
    }

    fn from_sysfs(address: &str, dev_path: PathBuf) -> TopologyResult<Self> {
        let mut is_phys_fn = false;
        let mut num_vfs = 0;
        let numvfs_path = dev_path.join(ATTR_SRIOV_NUMVFS);
        if exists(&numvfs_path)? {
            is_phys_fn = true;
            num_vfs = utils::read_int(&numvfs_path).unwrap_or_else(|e| {
                warn!("pci@{address}: ignoring unreadable VF count: {e}");
                0
            });
        }

        let mut is_vfn = false;
        let mut parent_fn = String::new();
        let physfn_path = dev_path.join(ATTR_PHYSFN);
        if exists(&physfn_path)? {
            is_vfn = true;
            if let Ok(dest) = fs::read_link(&physfn_path)
                && let Some(name) = dest.file_name()
            {
                parent_fn = name.to_string_lossy().into_owned();
            }
        }

        // -1 is legal here: firmware often fails to report the node
        let numa_node = utils::read_int(&dev_path.join(ATTR_NUMA_NODE))?;

        let dev_class = utils::read_hex_u32(&dev_path.join(ATTR_CLASS))? >> 8;
        let vendor = read_hex_u16(&dev_path.join(ATTR_VENDOR))?;
        let device = read_hex_u16(&dev_path.join(ATTR_DEVICE))?;

        Ok(Self {
            is_phys_fn,
            num_vfs,
            is_vfn,
            parent_fn,
            address: address.to_string(),
            numa_node,
            dev_class,
            vendor,
            device,
            sysfs_path: dev_path,
        })
    }
}

impl fmt::Display for PciDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pci@{} {:x}:{:x} numa_node={} physfn={} vfn={}",
            self.address, self.vendor, self.device, self.numa_node, self.is_phys_fn, self.is_vfn
        )
    }
}

/// Checks for an optional attribute, following symlinks: a dangling link is absent.
/// Only "not found" means absent, anything else is fatal.
fn exists(path: &Path) -> TopologyResult<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(TopologyError::io_at(path, e)),
    }
}

fn read_hex_u16(path: &Path) -> TopologyResult<u16> {
    let val = utils::read_hex_u32(path)?;
    u16::try_from(val).map_err(|_| TopologyError::Parse {
        path: path.to_path_buf(),
        value: format!("{val:#x}"),
    })
}

// ===============================================================================================
// Device Collection
// ===============================================================================================

/// All the PCI(-express) devices found in a system, in directory-listing order.
#[derive(Debug, Clone, Default)]
pub struct PciDevices {
    pub items: Vec<PciDeviceInfo>,
}

impl PciDevices {
    /// Reads every device under `bus/pci/devices/` of the sysfs mounted at `sysfs`.
    ///
    /// Directory entries are visited sorted by name, so the result is stable.
    ///
    /// # Errors
    /// Fails, without returning any device, if the device directory cannot be
    /// listed or if any device lacks a readable and well-formed `numa_node`,
    /// `class`, `vendor` or `device` attribute.
    pub fn from_sysfs(sysfs: &Path) -> TopologyResult<Self> {
        let devices_path = sysfs.join(PATH_BUS_PCI_DEVICES);

        let mut names = fs::read_dir(&devices_path)
            .map_err(|e| TopologyError::io_at(&devices_path, e))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| TopologyError::io_at(&devices_path, e))?;
        names.sort_unstable();

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let dev_path = devices_path.join(&name);
            let info = PciDeviceInfo::from_sysfs(&name, dev_path)?;
            debug!("{info}");
            items.push(info);
        }

        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PciDeviceInfo> {
        self.items.iter()
    }

    /// First device with the given address.
    #[must_use]
    pub fn find_by_address(&self, addr: &str) -> Option<&PciDeviceInfo> {
        self.items.iter().find(|d| d.address() == addr)
    }

    /// Virtual functions whose parent is the device at `pf_addr`.
    #[must_use]
    pub fn virtual_functions_of(&self, pf_addr: &str) -> Vec<&PciDeviceInfo> {
        self.items
            .iter()
            .filter(|d| d.is_vfn && d.parent_fn == pf_addr)
            .collect()
    }

    /// Devices grouped by NUMA node. [`NUMA_NODE_UNKNOWN`] is a group like any other.
    #[must_use]
    pub fn per_numa(&self) -> BTreeMap<i32, Vec<&PciDeviceInfo>> {
        let mut groups: BTreeMap<i32, Vec<&PciDeviceInfo>> = BTreeMap::new();
        for dev in &self.items {
            groups.entry(dev.numa_node()).or_default().push(dev);
        }
        groups
    }
}

impl<'a> IntoIterator for &'a PciDevices {
    type Item = &'a PciDeviceInfo;
    type IntoIter = std::slice::Iter<'a, PciDeviceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
