// src/core/inventory.rs

use crate::core::project::ProjectContext;
use crate::models::{ClusterSettings, Machine};
use std::fmt::Write as _;
use std::fs;
use std::net::ToSocketAddrs;
use std::path::PathBuf;

/// Renders the Ansible inventory for the cluster.
///
/// Each member gets a host line pointing at its resolved address (or its
/// fully qualified name when DNS has no answer), followed by the fixed group
/// layout the playbooks expect: the first member is the master, the second
/// carries etcd, and every member past the first is a node.
pub fn render_hosts<F>(members: &[Machine], settings: &ClusterSettings, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut hosts = String::new();
    for machine in members {
        let fqdn = machine.address(&settings.domain);
        let address = resolve(&fqdn).unwrap_or(fqdn);
        writeln!(
            hosts,
            "{} ansible_ssh_host={} ansible_ssh_port=22",
            machine.name, address
        )
        .ok();
    }

    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    push_group(&mut hosts, "masters", names.first().copied());
    push_group(&mut hosts, "etcd", names.get(1).copied());
    push_group(&mut hosts, "nodes", names.iter().skip(1).copied());
    push_group(&mut hosts, "all", names.iter().copied());
    push_group(
        &mut hosts,
        "all_groups:children",
        ["masters", "etcd", "nodes"],
    );
    push_group(&mut hosts, "coreos", names.iter().copied());

    writeln!(hosts).ok();
    writeln!(hosts, "[coreos:vars]").ok();
    writeln!(hosts, "ansible_ssh_user={}", settings.ssh_user).ok();
    writeln!(
        hosts,
        "ansible_python_interpreter=\"PATH=/home/{}/bin:$PATH python\"",
        settings.ssh_user
    )
    .ok();
    hosts
}

fn push_group<'a>(out: &mut String, header: &str, names: impl IntoIterator<Item = &'a str>) {
    writeln!(out).ok();
    writeln!(out, "[{header}]").ok();
    for name in names {
        writeln!(out, "{name}").ok();
    }
}

/// Renders and writes the inventory file into the project root.
pub fn write_inventory(ctx: &ProjectContext, members: &[Machine]) -> std::io::Result<PathBuf> {
    let content = render_hosts(members, ctx.settings(), resolve_host_address);
    let path = ctx.inventory_path();
    fs::write(&path, content)?;
    Ok(path)
}

/// First address DNS offers for the name, if any.
fn resolve_host_address(fqdn: &str) -> Option<String> {
    let mut addrs = (fqdn, 22u16).to_socket_addrs().ok()?;
    addrs.next().map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PROJECT_DESCRIPTOR;
    use tempfile::TempDir;

    fn members(names: &[&str]) -> Vec<Machine> {
        names.iter().map(|name| Machine::named(*name)).collect()
    }

    #[test]
    fn test_three_member_inventory_layout() {
        // --- Setup ---
        let members = members(&["core1", "core2", "core3"]);
        let settings = ClusterSettings::default();

        // --- Execute ---
        let hosts = render_hosts(&members, &settings, |_| None);

        // --- Assert ---
        let expected = "\
core1 ansible_ssh_host=core1.a8.nl ansible_ssh_port=22
core2 ansible_ssh_host=core2.a8.nl ansible_ssh_port=22
core3 ansible_ssh_host=core3.a8.nl ansible_ssh_port=22

[masters]
core1

[etcd]
core2

[nodes]
core2
core3

[all]
core1
core2
core3

[all_groups:children]
masters
etcd
nodes

[coreos]
core1
core2
core3

[coreos:vars]
ansible_ssh_user=core
ansible_python_interpreter=\"PATH=/home/core/bin:$PATH python\"
";
        assert_eq!(hosts, expected);
    }

    #[test]
    fn test_single_member_leaves_etcd_and_nodes_empty() {
        // --- Setup ---
        let members = members(&["node1"]);
        let settings = ClusterSettings::default();

        // --- Execute ---
        let hosts = render_hosts(&members, &settings, |_| None);

        // --- Assert ---
        assert!(hosts.contains("[masters]\nnode1\n"));
        assert!(hosts.contains("[etcd]\n\n[nodes]\n\n[all]\n"));
    }

    #[test]
    fn test_two_member_cluster_shares_the_second_member() {
        // --- Setup ---
        let members = members(&["core1", "core2"]);
        let settings = ClusterSettings::default();

        // --- Execute ---
        let hosts = render_hosts(&members, &settings, |_| None);

        // --- Assert ---
        // The second member carries etcd and is also a node.
        assert!(hosts.contains("[etcd]\ncore2\n"));
        assert!(hosts.contains("[nodes]\ncore2\n"));
        assert!(hosts.contains("[masters]\ncore1\n"));
    }

    #[test]
    fn test_resolved_addresses_replace_fqdns() {
        // --- Setup ---
        let members = members(&["core1"]);
        let settings = ClusterSettings::default();

        // --- Execute ---
        let hosts = render_hosts(&members, &settings, |fqdn| {
            assert_eq!(fqdn, "core1.a8.nl");
            Some("10.0.0.11".to_string())
        });

        // --- Assert ---
        assert!(hosts.contains("core1 ansible_ssh_host=10.0.0.11 ansible_ssh_port=22"));
    }

    #[test]
    fn test_write_inventory_lands_in_project_root() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_DESCRIPTOR), "$num_instances = 1\n").unwrap();
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();
        let members = members(&["core1"]);

        // --- Execute ---
        let path = write_inventory(&ctx, &members).unwrap();

        // --- Assert ---
        assert_eq!(path, dir.path().join("hosts"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("[coreos:vars]"));
    }
}
