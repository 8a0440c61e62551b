//! End-to-end reconciliation scenarios driving the reconciler through the
//! same precommit/postcommit sequence the port lifecycle framework uses.

use std::sync::Arc;

use torfabric_bindmgrd::{BindingReconciler, RecordingTransport, SwitchCommand, Topology};
use torfabric_common::{
    FabricError, InterfaceType, PortEvent, PortEventHandler, PortInfo, PortStatus, Segment,
};
use torfabric_store::{BindingStore, MemoryBindingStore};

const TOPOLOGY: &str = r#"
vlan_name_prefix: "vlan-"
switches:
  - switch_id: "S1"
    nve_src_intf: "1"
    hosts:
      h1: "1/1"
      h2: "1/2"
  - switch_id: "S2"
    hosts:
      h1: "port-channel:10"
"#;

struct Fabric {
    reconciler: BindingReconciler,
    store: Arc<MemoryBindingStore>,
    transport: Arc<RecordingTransport>,
}

impl Fabric {
    fn new() -> Self {
        let topology = Topology::from_yaml(TOPOLOGY).unwrap();
        let store = Arc::new(MemoryBindingStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let reconciler =
            BindingReconciler::new(topology, store.clone(), transport.clone());
        Self {
            reconciler,
            store,
            transport,
        }
    }

    async fn activate(&self, port: &PortInfo) {
        let event = PortEvent::of(port.clone());
        self.reconciler.update_port_precommit(&event).await.unwrap();
        self.reconciler
            .update_port_postcommit(&event)
            .await
            .unwrap();
    }

    async fn deactivate(&self, port: &PortInfo) {
        let event = PortEvent::of(port.clone());
        self.reconciler.delete_port_precommit(&event).await.unwrap();
        self.reconciler
            .delete_port_postcommit(&event)
            .await
            .unwrap();
    }
}

fn compute_port(device: &str, host: &str, vlan: u16) -> PortInfo {
    PortInfo {
        device_id: Some(device.to_string()),
        host_id: Some(host.to_string()),
        device_owner: "compute:nova".to_string(),
        status: PortStatus::Active,
        vlan_segment: Some(Segment::vlan(vlan, "physnet1")),
        vxlan_segment: None,
    }
}

fn overlay_port(device: &str, host: &str, vlan: u16, vni: u32) -> PortInfo {
    let mut port = compute_port(device, host, vlan);
    port.vxlan_segment = Some(Segment::vxlan(vni, "239.1.1.1"));
    port
}

#[tokio::test]
async fn vlan_lifecycle_on_single_switch() {
    let fabric = Fabric::new();

    // h2 only touches S1; keep the scenario to one switch.
    let p1 = compute_port("d1", "h2", 100);
    fabric.activate(&p1).await;

    let cmds = fabric.transport.issued_for("S1");
    assert_eq!(
        cmds,
        vec![
            SwitchCommand::CreateVlan {
                vlan_id: 100,
                name: "vlan-100".to_string()
            },
            SwitchCommand::TrunkVlan {
                intf_type: InterfaceType::Ethernet,
                port: "1/2".to_string(),
                vlan_id: 100
            },
        ]
    );

    let rows = fabric.store.vlan_bindings(100, "S1").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device_id, "d1");

    // Second device on the same interface: trunk only.
    let p2 = compute_port("d2", "h2", 100);
    fabric.transport.clear();
    fabric.activate(&p2).await;
    let cmds = fabric.transport.issued_for("S1");
    assert_eq!(cmds.len(), 1);
    assert!(matches!(cmds[0], SwitchCommand::TrunkVlan { .. }));

    // Deactivating d1 leaves d2's binding: no switch-side removal yet.
    fabric.transport.clear();
    fabric.deactivate(&p1).await;
    assert!(fabric.transport.issued().is_empty());

    // Deactivating d2 unwinds the interface and the VLAN.
    fabric.deactivate(&p2).await;
    let cmds = fabric.transport.issued_for("S1");
    assert_eq!(cmds.len(), 2);
    assert!(matches!(cmds[0], SwitchCommand::UntrunkVlan { .. }));
    assert!(matches!(cmds[1], SwitchCommand::DeleteVlan { vlan_id: 100 }));
    assert_eq!(fabric.store.port_binding_count(), 0);
}

#[tokio::test]
async fn multi_switch_host_fans_out() {
    let fabric = Fabric::new();

    // h1 is dual-homed to S1 (ethernet) and S2 (port-channel).
    let p1 = compute_port("d1", "h1", 200);
    fabric.activate(&p1).await;

    for switch in ["S1", "S2"] {
        let cmds = fabric.transport.issued_for(switch);
        assert_eq!(cmds.len(), 2, "switch {}", switch);
        assert!(matches!(cmds[0], SwitchCommand::CreateVlan { .. }));
        assert!(matches!(cmds[1], SwitchCommand::TrunkVlan { .. }));
    }
    let s2_cmds = fabric.transport.issued_for("S2");
    assert!(matches!(
        &s2_cmds[1],
        SwitchCommand::TrunkVlan {
            intf_type: InterfaceType::PortChannel,
            port,
            ..
        } if port == "10"
    ));

    fabric.transport.clear();
    fabric.deactivate(&p1).await;
    for switch in ["S1", "S2"] {
        let cmds = fabric.transport.issued_for(switch);
        assert_eq!(cmds.len(), 2, "switch {}", switch);
        assert!(matches!(cmds[1], SwitchCommand::DeleteVlan { .. }));
    }
}

#[tokio::test]
async fn vxlan_members_coalesce_per_switch() {
    let fabric = Fabric::new();

    let p1 = overlay_port("d1", "h2", 300, 5000);
    let p2 = overlay_port("d2", "h2", 300, 5000);
    fabric.activate(&p1).await;
    fabric.activate(&p2).await;

    assert_eq!(
        fabric
            .transport
            .count_matching(|_, c| matches!(c, SwitchCommand::EnableVxlanFeature { .. })),
        1
    );
    assert_eq!(
        fabric
            .transport
            .count_matching(|_, c| matches!(c, SwitchCommand::AddNveMember { vni: 5000, .. })),
        2
    );
    assert_eq!(fabric.store.nve_binding_count(), 1);

    fabric.transport.clear();
    fabric.deactivate(&p1).await;
    assert_eq!(fabric.store.nve_binding_count(), 1);
    assert!(fabric.transport.issued().is_empty());

    fabric.deactivate(&p2).await;
    assert_eq!(
        fabric
            .transport
            .count_matching(|_, c| matches!(c, SwitchCommand::RemoveNveMember { vni: 5000, .. })),
        1
    );
    assert_eq!(
        fabric
            .transport
            .count_matching(|_, c| matches!(c, SwitchCommand::DisableVxlanFeature)),
        1
    );
    assert_eq!(fabric.store.nve_binding_count(), 0);
}

#[tokio::test]
async fn migration_moves_bindings_between_hosts() {
    let fabric = Fabric::new();

    let on_h2 = compute_port("d1", "h2", 400);
    fabric.activate(&on_h2).await;
    fabric.transport.clear();

    // Migration update: VLAN segment dropped, host changed to h1.
    let mut in_flight = compute_port("d1", "h1", 400);
    in_flight.vlan_segment = None;
    let event = PortEvent::update(in_flight, on_h2);

    fabric.reconciler.update_port_precommit(&event).await.unwrap();
    fabric
        .reconciler
        .update_port_postcommit(&event)
        .await
        .unwrap();

    // Old host's switch state is unwound.
    let cmds = fabric.transport.issued_for("S1");
    assert!(matches!(cmds[0], SwitchCommand::UntrunkVlan { .. }));
    assert!(matches!(cmds[1], SwitchCommand::DeleteVlan { .. }));
    assert_eq!(fabric.store.port_binding_count(), 0);

    // The re-bind on the new host arrives as a fresh activation.
    fabric.transport.clear();
    fabric.activate(&compute_port("d1", "h1", 400)).await;
    assert_eq!(fabric.store.port_binding_count(), 2); // S1 + S2 interfaces
    assert_eq!(
        fabric
            .transport
            .count_matching(|s, c| s == "S2" && matches!(c, SwitchCommand::CreateVlan { .. })),
        1
    );
}

#[tokio::test]
async fn validation_failures_leave_no_trace() {
    let fabric = Fabric::new();

    let ghost = compute_port("d1", "nowhere", 100);
    let event = PortEvent::of(ghost);
    let err = fabric
        .reconciler
        .update_port_precommit(&event)
        .await
        .unwrap_err();
    assert!(matches!(err, FabricError::HostNotConfigured { .. }));

    let mut incomplete = compute_port("d1", "h1", 100);
    incomplete.vlan_segment = None;
    incomplete.device_id = None;
    let event = PortEvent::of(incomplete);
    let err = fabric
        .reconciler
        .update_port_precommit(&event)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required port fields: vlan_id device_id"
    );

    assert_eq!(fabric.store.port_binding_count(), 0);
    assert!(fabric.transport.issued().is_empty());
}
