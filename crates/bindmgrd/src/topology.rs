//! Static switch topology configuration.
//!
//! The topology maps compute hosts to the switch interfaces they are cabled
//! to, plus per-switch attributes (NVE source interface, physical network
//! tag). It is loaded once at startup and immutable during reconciliation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use torfabric_common::{FabricError, FabricResult, InterfaceType, SwitchConnection};

/// Default VLAN name prefix when the config omits one.
pub const DEFAULT_VLAN_NAME_PREFIX: &str = "vlan-";

/// Default NVE source interface number.
pub const DEFAULT_NVE_SRC_INTF: &str = "0";

/// One switch stanza in the topology file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Switch identifier (management address or name).
    pub switch_id: String,
    /// Loopback interface number terminating VXLAN tunnels.
    #[serde(default)]
    pub nve_src_intf: Option<String>,
    /// Physical network this switch serves.
    #[serde(default)]
    pub physnet: Option<String>,
    /// host id -> comma-separated interface list. Entries are either
    /// `"type:port"` or a bare port id, which defaults to ethernet.
    #[serde(default)]
    pub hosts: HashMap<String, String>,
}

/// Top-level topology file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Prefix for derived VLAN names on the switch.
    #[serde(default)]
    pub vlan_name_prefix: Option<String>,
    /// When set, only VLAN segments on this physical network are managed.
    #[serde(default)]
    pub managed_physical_network: Option<String>,
    /// Switch inventory.
    pub switches: Vec<SwitchConfig>,
}

/// Resolved, validated topology.
#[derive(Debug, Clone)]
pub struct Topology {
    vlan_name_prefix: String,
    managed_physical_network: Option<String>,
    host_connections: HashMap<String, Vec<SwitchConnection>>,
    nve_src_intfs: HashMap<String, String>,
    physnets: HashMap<String, String>,
}

impl Topology {
    /// Validates a parsed config into a resolved topology.
    pub fn from_config(config: TopologyConfig) -> FabricResult<Self> {
        let mut host_connections: HashMap<String, Vec<SwitchConnection>> = HashMap::new();
        let mut nve_src_intfs = HashMap::new();
        let mut physnets = HashMap::new();

        for switch in &config.switches {
            if let Some(intf) = &switch.nve_src_intf {
                nve_src_intfs.insert(switch.switch_id.clone(), intf.clone());
            }
            if let Some(physnet) = &switch.physnet {
                physnets.insert(switch.switch_id.clone(), physnet.clone());
            }

            for (host, port_list) in &switch.hosts {
                for entry in port_list.split(',') {
                    let entry = entry.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    let connection = parse_port_entry(&switch.switch_id, entry)?;
                    host_connections
                        .entry(host.clone())
                        .or_default()
                        .push(connection);
                }
            }
        }

        debug!(
            hosts = host_connections.len(),
            switches = config.switches.len(),
            "Topology resolved"
        );

        Ok(Self {
            vlan_name_prefix: config
                .vlan_name_prefix
                .unwrap_or_else(|| DEFAULT_VLAN_NAME_PREFIX.to_string()),
            managed_physical_network: config.managed_physical_network,
            host_connections,
            nve_src_intfs,
            physnets,
        })
    }

    /// Parses and validates a YAML topology document.
    pub fn from_yaml(yaml: &str) -> FabricResult<Self> {
        let config: TopologyConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FabricError::invalid_config("topology", e.to_string()))?;
        Self::from_config(config)
    }

    /// All switch connections for a host.
    ///
    /// A host with no registered connection is an error, not an empty list.
    pub fn host_connections(&self, host_id: &str) -> FabricResult<Vec<SwitchConnection>> {
        match self.host_connections.get(host_id) {
            Some(connections) if !connections.is_empty() => Ok(connections.clone()),
            _ => Err(FabricError::host_not_configured(host_id)),
        }
    }

    /// NVE source interface for a switch, defaulting to "0".
    pub fn nve_src_intf(&self, switch_id: &str) -> &str {
        self.nve_src_intfs
            .get(switch_id)
            .map(String::as_str)
            .unwrap_or(DEFAULT_NVE_SRC_INTF)
    }

    /// Physical network tag for a switch, if configured.
    pub fn physnet(&self, switch_id: &str) -> Option<&str> {
        self.physnets.get(switch_id).map(String::as_str)
    }

    /// The managed physical network filter, if configured.
    pub fn managed_physical_network(&self) -> Option<&str> {
        self.managed_physical_network.as_deref()
    }

    /// Derived switch-side name for a VLAN.
    pub fn vlan_name(&self, vlan_id: u16) -> String {
        format!("{}{}", self.vlan_name_prefix, vlan_id)
    }
}

/// Parses one `"type:port"` or bare-port entry into a connection.
fn parse_port_entry(switch_id: &str, entry: &str) -> FabricResult<SwitchConnection> {
    let (intf_type, port) = match entry.split_once(':') {
        Some((type_str, port)) => {
            let intf_type = type_str
                .parse::<InterfaceType>()
                .map_err(|e| FabricError::invalid_config("hosts", e))?;
            (intf_type, port)
        }
        None => (InterfaceType::Ethernet, entry),
    };
    if port.is_empty() {
        return Err(FabricError::invalid_config(
            "hosts",
            format!("empty port id in entry '{}'", entry),
        ));
    }
    Ok(SwitchConnection::new(switch_id, intf_type, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
vlan_name_prefix: "vlan-"
switches:
  - switch_id: "10.0.0.1"
    nve_src_intf: "1"
    physnet: "physnet1"
    hosts:
      host-1: "1/1"
      host-2: "ethernet:1/2,port-channel:10"
  - switch_id: "10.0.0.2"
    hosts:
      host-2: "1/5"
"#;

    #[test]
    fn test_parse_sample_topology() {
        let topo = Topology::from_yaml(SAMPLE).unwrap();

        let conns = topo.host_connections("host-1").unwrap();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].switch_id, "10.0.0.1");
        assert_eq!(conns[0].port_key(), "ethernet:1/1");

        let conns = topo.host_connections("host-2").unwrap();
        assert_eq!(conns.len(), 3);
        assert!(conns.iter().any(|c| c.port_key() == "port-channel:10"));
        assert!(conns.iter().any(|c| c.switch_id == "10.0.0.2"));
    }

    #[test]
    fn test_unknown_host_is_error() {
        let topo = Topology::from_yaml(SAMPLE).unwrap();
        let err = topo.host_connections("host-99").unwrap_err();
        assert!(matches!(err, FabricError::HostNotConfigured { .. }));
    }

    #[test]
    fn test_switch_attributes() {
        let topo = Topology::from_yaml(SAMPLE).unwrap();
        assert_eq!(topo.nve_src_intf("10.0.0.1"), "1");
        assert_eq!(topo.nve_src_intf("10.0.0.2"), "0");
        assert_eq!(topo.physnet("10.0.0.1"), Some("physnet1"));
        assert_eq!(topo.physnet("10.0.0.2"), None);
    }

    #[test]
    fn test_vlan_name_prefix() {
        let topo = Topology::from_yaml(SAMPLE).unwrap();
        assert_eq!(topo.vlan_name(100), "vlan-100");

        let topo = Topology::from_yaml("switches: []").unwrap();
        assert_eq!(topo.vlan_name(7), "vlan-7");
    }

    #[test]
    fn test_bad_interface_type_rejected() {
        let yaml = r#"
switches:
  - switch_id: "10.0.0.1"
    hosts:
      host-1: "fddi:1/1"
"#;
        let err = Topology::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FabricError::InvalidConfig { .. }));
    }

    #[test]
    fn test_empty_port_rejected() {
        let yaml = r#"
switches:
  - switch_id: "10.0.0.1"
    hosts:
      host-1: "ethernet:"
"#;
        assert!(Topology::from_yaml(yaml).is_err());
    }
}
