use topologyinfo_rs::sysfs::Sysfs;
use topologyinfo_rs::{Distances, PciDevices, TopologyResult};

fn main() -> TopologyResult<()> {
    env_logger::init();

    println!("============================================================");
    println!("                  PCI / NUMA Topology Report                ");
    println!("============================================================");

    let sys = Sysfs::from_env();
    println!("[+] Reading sysfs at {}", sys.root().display());

    // 1. PCI devices
    let devices = match PciDevices::from_sysfs(sys.root()) {
        Ok(devs) => devs,
        Err(e) => {
            eprintln!("[-] PCI discovery failed: {e}");
            return Err(e);
        }
    };
    println!("    PCI Devices:   {}", devices.len());

    for (node, devs) in devices.per_numa() {
        println!("\n------------------------------------------------------------");
        if node < 0 {
            println!(" NUMA Node ? (not reported by firmware)");
        } else {
            println!(" NUMA Node {node}");
        }
        println!("------------------------------------------------------------");

        for dev in devs {
            let role = if dev.is_phys_fn {
                format!("PF, {} VFs", dev.num_vfs)
            } else if dev.is_vfn {
                format!("VF of {}", dev.parent_fn)
            } else {
                String::new()
            };
            println!(
                "    {:<14} class {:04x}  {:04x}:{:04x}  {}",
                dev.address(),
                dev.dev_class(),
                dev.vendor(),
                dev.device(),
                role
            );
        }
    }

    // 2. NUMA distances
    println!("\n[+] NUMA Distances...");
    match Distances::from_sysfs(sys.root()) {
        Ok(dist) => {
            let nodes = dist.online_nodes();
            print!("    {:>6}", "");
            for to in nodes {
                print!("{to:>6}");
            }
            println!();
            for &from in nodes {
                print!("    {from:>6}");
                for &to in nodes {
                    print!("{:>6}", dist.between_nodes(from, to)?);
                }
                println!();
            }
        }
        Err(e) => println!("    [-] Could not read distances: {e}"),
    }

    Ok(())
}
