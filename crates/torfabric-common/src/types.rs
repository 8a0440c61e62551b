//! Core domain types shared by the store and the reconciler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Device owner prefix identifying compute-attached ports.
pub const COMPUTE_OWNER_PREFIX: &str = "compute";

/// Operational status of a logical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortStatus {
    /// Port is bound and traffic-ready.
    Active,
    /// Port is being wired up.
    Build,
    /// Port is administratively or operationally down.
    Down,
    /// Port is in an error state.
    Error,
}

/// Network type carried by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    /// 802.1Q VLAN segment.
    Vlan,
    /// VXLAN overlay segment.
    Vxlan,
}

/// A network segment as handed down by the port lifecycle framework.
///
/// For VLAN segments `segmentation_id` is the VLAN id; for VXLAN segments it
/// is the VNI and `physical_network` carries the multicast group used for
/// BUM replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The segment's network type.
    pub network_type: NetworkType,
    /// Physical network tag (VLAN) or multicast group (VXLAN).
    pub physical_network: Option<String>,
    /// VLAN id or VNI.
    pub segmentation_id: Option<u32>,
}

impl Segment {
    /// Creates a VLAN segment.
    pub fn vlan(vlan_id: u16, physical_network: impl Into<String>) -> Self {
        Self {
            network_type: NetworkType::Vlan,
            physical_network: Some(physical_network.into()),
            segmentation_id: Some(u32::from(vlan_id)),
        }
    }

    /// Creates a VXLAN segment with the given VNI and multicast group.
    pub fn vxlan(vni: u32, mcast_group: impl Into<String>) -> Self {
        Self {
            network_type: NetworkType::Vxlan,
            physical_network: Some(mcast_group.into()),
            segmentation_id: Some(vni),
        }
    }

    /// Returns the VLAN id when this is a VLAN segment on a managed physical
    /// network (or when no physical-network filter is configured).
    pub fn vlan_id(&self, managed_physical_network: Option<&str>) -> Option<u16> {
        if self.network_type != NetworkType::Vlan {
            return None;
        }
        if let Some(managed) = managed_physical_network {
            if self.physical_network.as_deref() != Some(managed) {
                return None;
            }
        }
        self.segmentation_id.and_then(|id| u16::try_from(id).ok())
    }

    /// Returns the VNI for a VXLAN segment.
    pub fn vni(&self) -> Option<u32> {
        match self.network_type {
            NetworkType::Vxlan => self.segmentation_id,
            NetworkType::Vlan => None,
        }
    }

    /// Returns the multicast group for a VXLAN segment.
    pub fn mcast_group(&self) -> Option<&str> {
        match self.network_type {
            NetworkType::Vxlan => self.physical_network.as_deref(),
            NetworkType::Vlan => None,
        }
    }
}

/// Switch interface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceType {
    /// Physical ethernet interface.
    Ethernet,
    /// Port-channel (LAG) interface.
    PortChannel,
}

impl InterfaceType {
    /// Returns the interface type as it appears in port keys and CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceType::Ethernet => "ethernet",
            InterfaceType::PortChannel => "port-channel",
        }
    }
}

impl FromStr for InterfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethernet" => Ok(InterfaceType::Ethernet),
            "port-channel" | "portchannel" => Ok(InterfaceType::PortChannel),
            other => Err(format!("unknown interface type '{}'", other)),
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical connection from a host to a switch interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchConnection {
    /// Switch identifier (management address or name).
    pub switch_id: String,
    /// Interface type on the switch side.
    pub intf_type: InterfaceType,
    /// Interface id, e.g. "1/1" for ethernet or "10" for a port-channel.
    pub port: String,
}

impl SwitchConnection {
    /// Creates a connection entry.
    pub fn new(
        switch_id: impl Into<String>,
        intf_type: InterfaceType,
        port: impl Into<String>,
    ) -> Self {
        Self {
            switch_id: switch_id.into(),
            intf_type,
            port: port.into(),
        }
    }

    /// Returns the `"<type>:<port>"` key stored in port binding rows.
    pub fn port_key(&self) -> String {
        format!("{}:{}", self.intf_type.as_str(), self.port)
    }
}

/// Snapshot of a logical port as seen at one lifecycle callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Owning device (VM instance) id.
    pub device_id: Option<String>,
    /// Hosting compute node id.
    pub host_id: Option<String>,
    /// Device owner tag, e.g. "compute:nova".
    pub device_owner: String,
    /// Operational status.
    pub status: PortStatus,
    /// Bound VLAN segment, if any.
    pub vlan_segment: Option<Segment>,
    /// Bound VXLAN segment, if any.
    pub vxlan_segment: Option<Segment>,
}

impl PortInfo {
    /// Returns true when the port is attached to a compute instance.
    pub fn is_compute_owned(&self) -> bool {
        self.device_owner.starts_with(COMPUTE_OWNER_PREFIX)
    }

    /// Returns true when the port is traffic-ready.
    pub fn is_active(&self) -> bool {
        self.status == PortStatus::Active
    }
}

/// A port lifecycle event: the current snapshot plus, for updates, the
/// snapshot before the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEvent {
    /// Port state after the change.
    pub current: PortInfo,
    /// Port state before the change (update events only).
    pub original: Option<PortInfo>,
}

impl PortEvent {
    /// Creates an event with no original snapshot (create/delete paths).
    pub fn of(current: PortInfo) -> Self {
        Self {
            current,
            original: None,
        }
    }

    /// Creates an update event with both snapshots.
    pub fn update(current: PortInfo, original: PortInfo) -> Self {
        Self {
            current,
            original: Some(original),
        }
    }

    /// Detects a VM migration: the current update carries no VLAN segment
    /// while the original had one, and the hosting node changed.
    pub fn is_vm_migration(&self) -> bool {
        let Some(original) = &self.original else {
            return false;
        };
        self.current.vlan_segment.is_none()
            && original.vlan_segment.is_some()
            && self.current.host_id != original.host_id
    }
}
