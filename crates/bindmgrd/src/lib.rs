//! bindmgrd - switch binding reconciler daemon for torfabric
//!
//! Translates port lifecycle events (bind/update/delete, each carrying a
//! VLAN and/or VXLAN segment) into the minimal ordered set of switch
//! commands and binding-store mutations needed to converge top-of-rack
//! switch state, sharing VLANs and VXLAN NVE members across hosts and ports.

mod commands;
mod reconciler;
mod topology;
mod transport;

pub use commands::{SwitchCommand, NVE_INT_NUM};
pub use reconciler::BindingReconciler;
pub use topology::{SwitchConfig, Topology, TopologyConfig, DEFAULT_VLAN_NAME_PREFIX};
pub use transport::{RecordingTransport, SwitchTransport};
