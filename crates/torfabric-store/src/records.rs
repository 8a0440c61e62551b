//! Binding row types.

use serde::{Deserialize, Serialize};

/// VNI value meaning "no overlay" on a port binding row.
pub const NO_VNI: u32 = 0;

/// One row per (switch, interface, VLAN, device) in active use.
///
/// Rows are never updated in place; replacement is delete + insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Interface key, `"<type>:<port>"` (e.g. "ethernet:1/1").
    pub port_id: String,
    /// VLAN id trunked for this device on the interface.
    pub vlan_id: u16,
    /// VXLAN VNI mapped onto the VLAN, or [`NO_VNI`].
    pub vni: u32,
    /// Switch identifier.
    pub switch_id: String,
    /// Owning device (VM instance) id.
    pub device_id: String,
}

impl PortBinding {
    /// Creates a port binding row.
    pub fn new(
        port_id: impl Into<String>,
        vlan_id: u16,
        vni: u32,
        switch_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            port_id: port_id.into(),
            vlan_id,
            vni,
            switch_id: switch_id.into(),
            device_id: device_id.into(),
        }
    }

    /// Returns true when this row carries a VXLAN overlay mapping.
    pub fn has_vni(&self) -> bool {
        self.vni != NO_VNI
    }
}

/// One row per (switch, VNI): a VXLAN member currently configured on the
/// switch's NVE interface, regardless of how many ports use it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NveBinding {
    /// VXLAN network identifier.
    pub vni: u32,
    /// Switch identifier.
    pub switch_id: String,
    /// Multicast group for BUM replication.
    pub mcast_group: String,
}

impl NveBinding {
    /// Creates an NVE binding row.
    pub fn new(vni: u32, switch_id: impl Into<String>, mcast_group: impl Into<String>) -> Self {
        Self {
            vni,
            switch_id: switch_id.into(),
            mcast_group: mcast_group.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_binding_has_vni() {
        let plain = PortBinding::new("ethernet:1/1", 100, NO_VNI, "s1", "d1");
        assert!(!plain.has_vni());

        let overlay = PortBinding::new("ethernet:1/1", 100, 5000, "s1", "d1");
        assert!(overlay.has_vni());
    }
}
