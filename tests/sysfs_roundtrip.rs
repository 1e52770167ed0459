use std::collections::BTreeMap;

use tempfile::TempDir;
use topologyinfo_rs::fakesysfs::{FakeSysfs, attrs};
use topologyinfo_rs::pcidev::NUMA_NODE_UNKNOWN;
use topologyinfo_rs::{Distances, PciDevices, TopologyError};

struct Dev {
    addr: &'static str,
    numa_node: &'static str,
    class: &'static str,
    vendor: &'static str,
    device: &'static str,
    numvfs: Option<&'static str>,
    physfn: Option<&'static str>,
}

const DEVS: &[Dev] = &[
    Dev {
        addr: "0000:00:1f.6",
        numa_node: "0\n",
        class: "0x020000\n",
        vendor: "0x8086\n",
        device: "0x15bb\n",
        numvfs: None,
        physfn: None,
    },
    Dev {
        addr: "0000:3b:00.0",
        numa_node: "-1\n",
        class: "0x020000\n",
        vendor: "0x15b3\n",
        device: "0x1017\n",
        numvfs: Some("4\n"),
        physfn: None,
    },
    Dev {
        addr: "0000:3b:00.2",
        numa_node: "-1\n",
        class: "0x020000\n",
        vendor: "0x15b3\n",
        device: "0x1018\n",
        numvfs: None,
        physfn: Some("../0000:3b:00.0"),
    },
    Dev {
        addr: "0000:af:00.0",
        numa_node: "1\n",
        class: "0x030200\n",
        vendor: "0x10de\n",
        device: "0x20b0\n",
        numvfs: None,
        physfn: None,
    },
];

fn build_machine(base: &TempDir) -> FakeSysfs {
    let mut fake = FakeSysfs::new(base.path());

    let devices = fake.add_tree(&["bus", "pci", "devices"]);
    for dev in DEVS {
        let mut files = attrs([
            ("numa_node", dev.numa_node),
            ("class", dev.class),
            ("vendor", dev.vendor),
            ("device", dev.device),
        ]);
        if let Some(numvfs) = dev.numvfs {
            files.insert("sriov_numvfs".to_string(), numvfs.to_string());
        }
        let node = devices.add(dev.addr, Some(files));
        if let Some(target) = dev.physfn {
            node.add_symlink("physfn", target);
        }
    }

    let nodes = fake
        .add_tree(&["devices", "system"])
        .add("node", Some(attrs([("online", "0-1\n")])));
    nodes.add("node0", Some(attrs([("distance", "10 20\n")])));
    nodes.add("node1", Some(attrs([("distance", "20 10\n")])));

    fake.setup().unwrap();
    fake
}

fn hex(s: &str) -> u32 {
    u32::from_str_radix(s.trim().trim_start_matches("0x"), 16).unwrap()
}

#[test]
fn test_discovery_reproduces_fixture() {
    let base = TempDir::new().unwrap();
    let fake = build_machine(&base);

    let devs = PciDevices::from_sysfs(fake.base()).unwrap();
    assert_eq!(devs.len(), DEVS.len());

    for (want, got) in DEVS.iter().zip(&devs) {
        assert_eq!(got.address(), want.addr);
        assert_eq!(got.numa_node(), want.numa_node.trim().parse::<i32>().unwrap());
        assert_eq!(got.dev_class(), hex(want.class) >> 8);
        assert_eq!(u32::from(got.vendor()), hex(want.vendor));
        assert_eq!(u32::from(got.device()), hex(want.device));
        assert_eq!(got.is_phys_fn, want.numvfs.is_some());
        assert_eq!(got.is_vfn, want.physfn.is_some());
        assert!(got.sysfs_path().starts_with(fake.base()));
    }
}

#[test]
fn test_sriov_pf_on_unknown_node() {
    let base = TempDir::new().unwrap();
    let fake = build_machine(&base);

    let devs = PciDevices::from_sysfs(fake.base()).unwrap();
    let pf = devs.find_by_address("0000:3b:00.0").unwrap();
    assert!(pf.is_phys_fn);
    assert_eq!(pf.num_vfs, 4);
    assert_eq!(pf.numa_node(), NUMA_NODE_UNKNOWN);

    let vf = devs.find_by_address("0000:3b:00.2").unwrap();
    assert_eq!(vf.parent_fn, pf.address());
}

#[test]
fn test_per_numa_group_sizes() {
    let base = TempDir::new().unwrap();
    let fake = build_machine(&base);

    let devs = PciDevices::from_sysfs(fake.base()).unwrap();
    let sizes: BTreeMap<i32, usize> = devs
        .per_numa()
        .into_iter()
        .map(|(node, group)| (node, group.len()))
        .collect();
    assert_eq!(sizes, BTreeMap::from([(-1, 2), (0, 1), (1, 1)]));
}

#[test]
fn test_distances_from_fixture() {
    let base = TempDir::new().unwrap();
    let fake = build_machine(&base);

    let dist = Distances::from_sysfs(fake.base()).unwrap();
    assert_eq!(dist.between_nodes(0, 1).unwrap(), 20);
    assert_eq!(dist.between_nodes(1, 0).unwrap(), 20);
    assert!(matches!(
        dist.between_nodes(0, 3),
        Err(TopologyError::UnknownNode(3))
    ));
}

#[test]
fn test_teardown_then_discovery_fails() {
    let base = TempDir::new().unwrap();
    let fake = build_machine(&base);
    fake.teardown().unwrap();

    assert!(PciDevices::from_sysfs(fake.base()).is_err());
    assert!(Distances::from_sysfs(fake.base()).is_err());
}
