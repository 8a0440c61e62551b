//! The binding store trait and its in-memory implementation.

use std::sync::Mutex;

use async_trait::async_trait;

use torfabric_common::FabricResult;

use crate::records::{NveBinding, PortBinding};

/// Persistent table of port bindings and NVE bindings.
///
/// Each call is one atomic operation against the store. Implementations must
/// serialize concurrent read-then-write sequences on the same (switch, VLAN)
/// so that two simultaneous "first" activations cannot both observe an empty
/// binding set (first-committer-wins); a SQL backend needs unique constraints
/// on (switch, port, vlan, device) and (switch, vni) plus at least
/// repeatable-read isolation. Inserts are idempotent on those keys, so a
/// duplicated decision never produces a duplicate row.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// All port bindings for a VLAN on a switch.
    async fn vlan_bindings(&self, vlan_id: u16, switch_id: &str) -> FabricResult<Vec<PortBinding>>;

    /// All port bindings for a (VLAN, device) pair, across switches.
    async fn device_bindings(
        &self,
        vlan_id: u16,
        device_id: &str,
    ) -> FabricResult<Vec<PortBinding>>;

    /// Port bindings for one (interface, VLAN, switch) triple.
    async fn port_vlan_bindings(
        &self,
        port_id: &str,
        vlan_id: u16,
        switch_id: &str,
    ) -> FabricResult<Vec<PortBinding>>;

    /// Port bindings still referencing a VNI on a switch.
    async fn vni_port_bindings(&self, vni: u32, switch_id: &str)
        -> FabricResult<Vec<PortBinding>>;

    /// Inserts a port binding; a row identical on (switch, port, vlan,
    /// device) is left untouched.
    async fn insert_binding(&self, binding: PortBinding) -> FabricResult<()>;

    /// Deletes a port binding row. Returns false when no matching row
    /// existed (already converged).
    async fn delete_binding(&self, binding: &PortBinding) -> FabricResult<bool>;

    /// All NVE bindings configured on a switch.
    async fn nve_bindings(&self, switch_id: &str) -> FabricResult<Vec<NveBinding>>;

    /// All NVE bindings for a VNI, across switches.
    async fn vni_bindings(&self, vni: u32) -> FabricResult<Vec<NveBinding>>;

    /// Inserts an NVE binding; idempotent on (switch, vni).
    async fn insert_nve_binding(&self, binding: NveBinding) -> FabricResult<()>;

    /// Deletes the NVE binding for (vni, switch). Returns false when no
    /// matching row existed.
    async fn delete_nve_binding(&self, vni: u32, switch_id: &str) -> FabricResult<bool>;
}

#[derive(Debug, Default)]
struct StoreInner {
    port_bindings: Vec<PortBinding>,
    nve_bindings: Vec<NveBinding>,
}

/// In-memory binding store.
///
/// A single mutex guards both tables, so every trait call is one critical
/// section and calls from concurrent events are serialized in arrival order.
#[derive(Debug, Default)]
pub struct MemoryBindingStore {
    inner: Mutex<StoreInner>,
}

impl MemoryBindingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of port binding rows (test/introspection helper).
    pub fn port_binding_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").port_bindings.len()
    }

    /// Total number of NVE binding rows (test/introspection helper).
    pub fn nve_binding_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").nve_bindings.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn vlan_bindings(&self, vlan_id: u16, switch_id: &str) -> FabricResult<Vec<PortBinding>> {
        let inner = self.lock();
        Ok(inner
            .port_bindings
            .iter()
            .filter(|b| b.vlan_id == vlan_id && b.switch_id == switch_id)
            .cloned()
            .collect())
    }

    async fn device_bindings(
        &self,
        vlan_id: u16,
        device_id: &str,
    ) -> FabricResult<Vec<PortBinding>> {
        let inner = self.lock();
        Ok(inner
            .port_bindings
            .iter()
            .filter(|b| b.vlan_id == vlan_id && b.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn port_vlan_bindings(
        &self,
        port_id: &str,
        vlan_id: u16,
        switch_id: &str,
    ) -> FabricResult<Vec<PortBinding>> {
        let inner = self.lock();
        Ok(inner
            .port_bindings
            .iter()
            .filter(|b| b.port_id == port_id && b.vlan_id == vlan_id && b.switch_id == switch_id)
            .cloned()
            .collect())
    }

    async fn vni_port_bindings(
        &self,
        vni: u32,
        switch_id: &str,
    ) -> FabricResult<Vec<PortBinding>> {
        let inner = self.lock();
        Ok(inner
            .port_bindings
            .iter()
            .filter(|b| b.vni == vni && b.switch_id == switch_id)
            .cloned()
            .collect())
    }

    async fn insert_binding(&self, binding: PortBinding) -> FabricResult<()> {
        let mut inner = self.lock();
        let duplicate = inner.port_bindings.iter().any(|b| {
            b.switch_id == binding.switch_id
                && b.port_id == binding.port_id
                && b.vlan_id == binding.vlan_id
                && b.device_id == binding.device_id
        });
        if !duplicate {
            inner.port_bindings.push(binding);
        }
        Ok(())
    }

    async fn delete_binding(&self, binding: &PortBinding) -> FabricResult<bool> {
        let mut inner = self.lock();
        let before = inner.port_bindings.len();
        inner.port_bindings.retain(|b| b != binding);
        Ok(inner.port_bindings.len() != before)
    }

    async fn nve_bindings(&self, switch_id: &str) -> FabricResult<Vec<NveBinding>> {
        let inner = self.lock();
        Ok(inner
            .nve_bindings
            .iter()
            .filter(|b| b.switch_id == switch_id)
            .cloned()
            .collect())
    }

    async fn vni_bindings(&self, vni: u32) -> FabricResult<Vec<NveBinding>> {
        let inner = self.lock();
        Ok(inner
            .nve_bindings
            .iter()
            .filter(|b| b.vni == vni)
            .cloned()
            .collect())
    }

    async fn insert_nve_binding(&self, binding: NveBinding) -> FabricResult<()> {
        let mut inner = self.lock();
        let duplicate = inner
            .nve_bindings
            .iter()
            .any(|b| b.switch_id == binding.switch_id && b.vni == binding.vni);
        if !duplicate {
            inner.nve_bindings.push(binding);
        }
        Ok(())
    }

    async fn delete_nve_binding(&self, vni: u32, switch_id: &str) -> FabricResult<bool> {
        let mut inner = self.lock();
        let before = inner.nve_bindings.len();
        inner
            .nve_bindings
            .retain(|b| !(b.vni == vni && b.switch_id == switch_id));
        Ok(inner.nve_bindings.len() != before)
    }
}
