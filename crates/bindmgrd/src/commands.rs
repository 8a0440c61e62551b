//! Switch configuration commands and their NX-OS CLI rendering.

use std::fmt;

use torfabric_common::InterfaceType;

/// NVE interface number used for all VXLAN member configuration.
pub const NVE_INT_NUM: u16 = 1;

/// One idempotent configuration command addressed to a single switch.
///
/// Commands to the same switch must be applied in the order the reconciler
/// issues them (create before trunk, disable after last remove).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchCommand {
    /// Create a VLAN with its derived name.
    CreateVlan { vlan_id: u16, name: String },
    /// Delete a VLAN.
    DeleteVlan { vlan_id: u16 },
    /// Allow a VLAN on an interface trunk.
    TrunkVlan {
        intf_type: InterfaceType,
        port: String,
        vlan_id: u16,
    },
    /// Remove a VLAN from an interface trunk.
    UntrunkVlan {
        intf_type: InterfaceType,
        port: String,
        vlan_id: u16,
    },
    /// Enable the VXLAN feature set and bring up the NVE interface.
    EnableVxlanFeature { nve_intf: u16, src_intf: String },
    /// Disable the VXLAN feature set.
    DisableVxlanFeature,
    /// Add a VNI member with its multicast group on the NVE interface.
    AddNveMember {
        nve_intf: u16,
        vni: u32,
        mcast_group: String,
    },
    /// Remove a VNI member from the NVE interface.
    RemoveNveMember { nve_intf: u16, vni: u32 },
}

impl SwitchCommand {
    /// Renders the NX-OS configuration lines for this command.
    pub fn cli_lines(&self) -> Vec<String> {
        match self {
            SwitchCommand::CreateVlan { vlan_id, name } => vec![
                format!("vlan {}", vlan_id),
                format!("name {}", name),
                "exit".to_string(),
            ],
            SwitchCommand::DeleteVlan { vlan_id } => {
                vec![format!("no vlan {}", vlan_id)]
            }
            SwitchCommand::TrunkVlan {
                intf_type,
                port,
                vlan_id,
            } => vec![
                format!("interface {} {}", intf_type.as_str(), port),
                format!("switchport trunk allowed vlan add {}", vlan_id),
                "exit".to_string(),
            ],
            SwitchCommand::UntrunkVlan {
                intf_type,
                port,
                vlan_id,
            } => vec![
                format!("interface {} {}", intf_type.as_str(), port),
                format!("switchport trunk allowed vlan remove {}", vlan_id),
                "exit".to_string(),
            ],
            SwitchCommand::EnableVxlanFeature { nve_intf, src_intf } => vec![
                "feature nv overlay".to_string(),
                "feature vn-segment-vlan-based".to_string(),
                format!("interface nve {}", nve_intf),
                "no shutdown".to_string(),
                format!("source-interface loopback {}", src_intf),
                "exit".to_string(),
            ],
            SwitchCommand::DisableVxlanFeature => vec![
                "no feature nv overlay".to_string(),
                "no feature vn-segment-vlan-based".to_string(),
            ],
            SwitchCommand::AddNveMember {
                nve_intf,
                vni,
                mcast_group,
            } => vec![
                format!("interface nve {}", nve_intf),
                format!("member vni {} mcast-group {}", vni, mcast_group),
                "exit".to_string(),
            ],
            SwitchCommand::RemoveNveMember { nve_intf, vni } => vec![
                format!("interface nve {}", nve_intf),
                format!("no member vni {}", vni),
                "exit".to_string(),
            ],
        }
    }
}

impl fmt::Display for SwitchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchCommand::CreateVlan { vlan_id, name } => {
                write!(f, "create-vlan {} ({})", vlan_id, name)
            }
            SwitchCommand::DeleteVlan { vlan_id } => write!(f, "delete-vlan {}", vlan_id),
            SwitchCommand::TrunkVlan {
                intf_type,
                port,
                vlan_id,
            } => write!(f, "trunk-vlan {} on {} {}", vlan_id, intf_type, port),
            SwitchCommand::UntrunkVlan {
                intf_type,
                port,
                vlan_id,
            } => write!(f, "untrunk-vlan {} on {} {}", vlan_id, intf_type, port),
            SwitchCommand::EnableVxlanFeature { nve_intf, src_intf } => {
                write!(f, "enable-vxlan nve {} loopback {}", nve_intf, src_intf)
            }
            SwitchCommand::DisableVxlanFeature => write!(f, "disable-vxlan"),
            SwitchCommand::AddNveMember {
                nve_intf,
                vni,
                mcast_group,
            } => write!(f, "add-nve-member nve {} vni {} {}", nve_intf, vni, mcast_group),
            SwitchCommand::RemoveNveMember { nve_intf, vni } => {
                write!(f, "remove-nve-member nve {} vni {}", nve_intf, vni)
            }
        }
    }
}
