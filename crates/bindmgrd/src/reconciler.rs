//! BindingReconciler - the core VLAN/VXLAN decision engine.
//!
//! Each port lifecycle event is translated into the minimal ordered set of
//! binding-store mutations (precommit) and switch commands (postcommit)
//! needed to converge switch state with the desired logical state, while
//! sharing VLANs and VXLAN members across hosts and ports.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use torfabric_common::{
    FabricResult, PortEvent, PortEventHandler, PortInfo, SwitchConnection,
};
use torfabric_store::{BindingStore, NveBinding, PortBinding, NO_VNI};

use crate::commands::{SwitchCommand, NVE_INT_NUM};
use crate::topology::Topology;
use crate::transport::SwitchTransport;

/// Validated VXLAN parameters for one event.
#[derive(Debug, Clone)]
struct VxlanParams {
    vni: u32,
    mcast_group: String,
}

/// A fully validated port event: all required fields present and the host
/// resolved to its switch connections. Built before any mutation.
#[derive(Debug)]
struct ValidatedEvent {
    vlan_id: u16,
    device_id: String,
    connections: Vec<SwitchConnection>,
    vxlan: Option<VxlanParams>,
}

impl ValidatedEvent {
    /// VNI recorded on port binding rows ([`NO_VNI`] without an overlay).
    fn vni(&self) -> u32 {
        self.vxlan.as_ref().map(|v| v.vni).unwrap_or(NO_VNI)
    }

    /// Distinct switches in connection order.
    fn distinct_switches(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.connections
            .iter()
            .filter(|c| seen.insert(c.switch_id.clone()))
            .map(|c| c.switch_id.clone())
            .collect()
    }
}

/// The switch binding reconciler.
///
/// Invoked synchronously from the port lifecycle framework's precommit and
/// postcommit hooks; precommit phases touch only the binding store, postcommit
/// phases only the switch transport. Validation runs before either.
pub struct BindingReconciler {
    topology: Topology,
    store: Arc<dyn BindingStore>,
    transport: Arc<dyn SwitchTransport>,

    /// (device_id, vlan_id) pairs whose rows a precommit teardown removed,
    /// consumed by the matching postcommit. A deactivation that found the
    /// store already empty leaves no marker and issues no switch commands.
    pending_teardown: Mutex<HashSet<(String, u16)>>,

    /// Switches whose NVE table went from zero to one binding in a precommit,
    /// consumed by the matching postcommit to fire the feature-enable step
    /// exactly once per transition.
    pending_vxlan_enable: Mutex<HashSet<String>>,
}

impl BindingReconciler {
    /// Creates a reconciler over the given topology, store and transport.
    pub fn new(
        topology: Topology,
        store: Arc<dyn BindingStore>,
        transport: Arc<dyn SwitchTransport>,
    ) -> Self {
        info!("BindingReconciler initialized");
        Self {
            topology,
            store,
            transport,
            pending_teardown: Mutex::new(HashSet::new()),
            pending_vxlan_enable: Mutex::new(HashSet::new()),
        }
    }

    /// Validates an event: VXLAN fields first, then VLAN fields, then host
    /// resolution. Fails with zero side effects.
    fn validate(&self, port: &PortInfo) -> FabricResult<ValidatedEvent> {
        let vxlan = match &port.vxlan_segment {
            Some(segment) => {
                let vni = segment.vni().filter(|v| *v != 0);
                let mcast_group = segment.mcast_group().filter(|m| !m.is_empty());
                let host_id = port.host_id.as_deref().filter(|h| !h.is_empty());

                let mut missing = Vec::new();
                if vni.is_none() {
                    missing.push("vni");
                }
                if mcast_group.is_none() {
                    missing.push("mcast_group");
                }
                if host_id.is_none() {
                    missing.push("host_id");
                }
                if !missing.is_empty() {
                    return Err(torfabric_common::FabricError::missing_fields(&missing));
                }

                Some(VxlanParams {
                    vni: vni.unwrap_or_default(),
                    mcast_group: mcast_group.unwrap_or_default().to_string(),
                })
            }
            None => None,
        };

        let vlan_id = port
            .vlan_segment
            .as_ref()
            .and_then(|s| s.vlan_id(self.topology.managed_physical_network()))
            .filter(|v| *v != 0);
        let device_id = port.device_id.as_deref().filter(|d| !d.is_empty());
        let host_id = port.host_id.as_deref().filter(|h| !h.is_empty());

        let mut missing = Vec::new();
        if vlan_id.is_none() {
            missing.push("vlan_id");
        }
        if device_id.is_none() {
            missing.push("device_id");
        }
        if host_id.is_none() {
            missing.push("host_id");
        }
        if !missing.is_empty() {
            return Err(torfabric_common::FabricError::missing_fields(&missing));
        }

        let connections = self
            .topology
            .host_connections(host_id.unwrap_or_default())?;

        Ok(ValidatedEvent {
            vlan_id: vlan_id.unwrap_or_default(),
            device_id: device_id.unwrap_or_default().to_string(),
            connections,
            vxlan,
        })
    }

    /// Activation database phase: NVE rows per distinct switch, one port
    /// binding row per (switch, interface).
    async fn activate_precommit(&self, port: &PortInfo) -> FabricResult<()> {
        let event = self.validate(port)?;

        if let Some(vxlan) = &event.vxlan {
            for switch_id in event.distinct_switches() {
                let first_on_switch = self.store.nve_bindings(&switch_id).await?.is_empty();
                self.store
                    .insert_nve_binding(NveBinding::new(
                        vxlan.vni,
                        &switch_id,
                        &vxlan.mcast_group,
                    ))
                    .await?;
                if first_on_switch {
                    self.pending_vxlan_enable
                        .lock()
                        .expect("enable mutex poisoned")
                        .insert(switch_id);
                }
            }
        }

        let vni = event.vni();
        for connection in &event.connections {
            self.store
                .insert_binding(PortBinding::new(
                    connection.port_key(),
                    event.vlan_id,
                    vni,
                    &connection.switch_id,
                    &event.device_id,
                ))
                .await?;
        }

        debug!(
            vlan = event.vlan_id,
            device = %event.device_id,
            "Activation bindings recorded"
        );
        Ok(())
    }

    /// Activation switch-command phase.
    async fn activate_postcommit(&self, port: &PortInfo) -> FabricResult<()> {
        let event = self.validate(port)?;

        if let Some(vxlan) = &event.vxlan {
            for switch_id in event.distinct_switches() {
                // The enable step fires only on the transition from zero to
                // one NVE binding on the switch, recorded by the precommit
                // that inserted the first row. The marker is consumed only
                // after the command succeeds, so a transport failure leaves
                // it in place for the retry.
                let first_on_switch = self
                    .pending_vxlan_enable
                    .lock()
                    .expect("enable mutex poisoned")
                    .contains(&switch_id);
                if first_on_switch {
                    let src_intf = self.topology.nve_src_intf(&switch_id).to_string();
                    debug!(switch = %switch_id, "Enabling VXLAN feature");
                    self.transport
                        .execute(
                            &switch_id,
                            &SwitchCommand::EnableVxlanFeature {
                                nve_intf: NVE_INT_NUM,
                                src_intf,
                            },
                        )
                        .await?;
                    self.pending_vxlan_enable
                        .lock()
                        .expect("enable mutex poisoned")
                        .remove(&switch_id);
                }
                self.transport
                    .execute(
                        &switch_id,
                        &SwitchCommand::AddNveMember {
                            nve_intf: NVE_INT_NUM,
                            vni: vxlan.vni,
                            mcast_group: vxlan.mcast_group.clone(),
                        },
                    )
                    .await?;
            }
        }

        let vlan_name = self.topology.vlan_name(event.vlan_id);

        // A host may have several interfaces on one switch; the VLAN is
        // created at most once per switch per call, later interfaces only
        // trunk.
        let mut vlan_already_created: Vec<String> = Vec::new();
        for connection in &event.connections {
            // The VLAN must be created unless another device already holds a
            // binding for it on this switch.
            let all_bindings = self
                .store
                .vlan_bindings(event.vlan_id, &connection.switch_id)
                .await?;
            let has_previous = all_bindings
                .iter()
                .any(|b| b.device_id != event.device_id);

            if has_previous || vlan_already_created.contains(&connection.switch_id) {
                debug!(switch = %connection.switch_id, vlan = event.vlan_id, "Trunk vlan");
            } else {
                vlan_already_created.push(connection.switch_id.clone());
                debug!(switch = %connection.switch_id, vlan = event.vlan_id, "Create and trunk vlan");
                self.transport
                    .execute(
                        &connection.switch_id,
                        &SwitchCommand::CreateVlan {
                            vlan_id: event.vlan_id,
                            name: vlan_name.clone(),
                        },
                    )
                    .await?;
            }

            self.transport
                .execute(
                    &connection.switch_id,
                    &SwitchCommand::TrunkVlan {
                        intf_type: connection.intf_type,
                        port: connection.port.clone(),
                        vlan_id: event.vlan_id,
                    },
                )
                .await?;
        }

        Ok(())
    }

    /// Teardown database phase: remove the device's rows for this VLAN, then
    /// drop NVE rows that lost their last user on each switch.
    async fn deactivate_precommit(&self, port: &PortInfo) -> FabricResult<()> {
        let event = self.validate(port)?;

        let rows = self
            .store
            .device_bindings(event.vlan_id, &event.device_id)
            .await?;
        if rows.is_empty() {
            debug!(
                vlan = event.vlan_id,
                device = %event.device_id,
                "No bindings to remove, already converged"
            );
        } else {
            for row in &rows {
                self.store.delete_binding(row).await?;
            }
            self.pending_teardown
                .lock()
                .expect("teardown mutex poisoned")
                .insert((event.device_id.clone(), event.vlan_id));
        }

        if let Some(vxlan) = &event.vxlan {
            for switch_id in event.distinct_switches() {
                let remaining = self.store.vni_port_bindings(vxlan.vni, &switch_id).await?;
                if remaining.is_empty() {
                    self.store.delete_nve_binding(vxlan.vni, &switch_id).await?;
                }
            }
        }

        Ok(())
    }

    /// Teardown switch-command phase: untrunk interfaces with no remaining
    /// binding, delete VLANs with no users on a switch, and unwind VXLAN
    /// members whose last user is gone.
    async fn deactivate_postcommit(&self, port: &PortInfo) -> FabricResult<()> {
        let event = self.validate(port)?;

        // The marker stays until every teardown command has succeeded; a
        // transport failure mid-sequence leaves it set, so a retried
        // postcommit (or a retry of the whole event) reissues the remaining
        // idempotent commands instead of going silent.
        let teardown_key = (event.device_id.clone(), event.vlan_id);
        let torn_down = self
            .pending_teardown
            .lock()
            .expect("teardown mutex poisoned")
            .contains(&teardown_key);
        if !torn_down {
            debug!(
                vlan = event.vlan_id,
                device = %event.device_id,
                "Nothing torn down in precommit, no switch changes"
            );
            return Ok(());
        }

        // VLAN deletion happens once per switch even when checked from
        // several interfaces.
        let mut vlan_already_removed: Vec<String> = Vec::new();
        for connection in &event.connections {
            let interface_rows = self
                .store
                .port_vlan_bindings(&connection.port_key(), event.vlan_id, &connection.switch_id)
                .await?;
            if !interface_rows.is_empty() {
                continue;
            }

            self.transport
                .execute(
                    &connection.switch_id,
                    &SwitchCommand::UntrunkVlan {
                        intf_type: connection.intf_type,
                        port: connection.port.clone(),
                        vlan_id: event.vlan_id,
                    },
                )
                .await?;

            let switch_rows = self
                .store
                .vlan_bindings(event.vlan_id, &connection.switch_id)
                .await?;
            if switch_rows.is_empty() && !vlan_already_removed.contains(&connection.switch_id) {
                vlan_already_removed.push(connection.switch_id.clone());
                self.transport
                    .execute(
                        &connection.switch_id,
                        &SwitchCommand::DeleteVlan {
                            vlan_id: event.vlan_id,
                        },
                    )
                    .await?;
            }
        }

        if let Some(vxlan) = &event.vxlan {
            for switch_id in event.distinct_switches() {
                let remaining = self.store.vni_port_bindings(vxlan.vni, &switch_id).await?;
                if !remaining.is_empty() {
                    continue;
                }

                self.transport
                    .execute(
                        &switch_id,
                        &SwitchCommand::RemoveNveMember {
                            nve_intf: NVE_INT_NUM,
                            vni: vxlan.vni,
                        },
                    )
                    .await?;

                if self.store.nve_bindings(&switch_id).await?.is_empty() {
                    self.transport
                        .execute(&switch_id, &SwitchCommand::DisableVxlanFeature)
                        .await?;
                }
            }
        }

        self.pending_teardown
            .lock()
            .expect("teardown mutex poisoned")
            .remove(&teardown_key);
        Ok(())
    }
}

#[async_trait]
impl PortEventHandler for BindingReconciler {
    async fn update_port_precommit(&self, event: &PortEvent) -> FabricResult<()> {
        if event.is_vm_migration() {
            // Migration: tear down the binding on the old host; activation
            // on the new host arrives as its own update event.
            let Some(original) = &event.original else {
                return Ok(());
            };
            info!("VM migration detected, removing bindings for previous host");
            self.deactivate_precommit(original).await
        } else if event.current.is_compute_owned() && event.current.is_active() {
            self.activate_precommit(&event.current).await
        } else {
            Ok(())
        }
    }

    async fn update_port_postcommit(&self, event: &PortEvent) -> FabricResult<()> {
        if event.is_vm_migration() {
            let Some(original) = &event.original else {
                return Ok(());
            };
            self.deactivate_postcommit(original).await
        } else if event.current.is_compute_owned() && event.current.is_active() {
            self.activate_postcommit(&event.current).await
        } else {
            Ok(())
        }
    }

    async fn delete_port_precommit(&self, event: &PortEvent) -> FabricResult<()> {
        if event.current.is_compute_owned() {
            self.deactivate_precommit(&event.current).await
        } else {
            Ok(())
        }
    }

    async fn delete_port_postcommit(&self, event: &PortEvent) -> FabricResult<()> {
        if event.current.is_compute_owned() {
            self.deactivate_postcommit(&event.current).await
        } else {
            Ok(())
        }
    }
}
