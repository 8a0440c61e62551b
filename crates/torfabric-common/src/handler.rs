//! Port lifecycle entry points.

use async_trait::async_trait;

use crate::error::FabricResult;
use crate::types::PortEvent;

/// Entry points the port lifecycle framework drives for each port event.
///
/// Precommit phases run inside the caller's database transaction and must
/// touch only the binding store; postcommit phases run after the transaction
/// is durable and issue switch commands. For one event the framework calls
/// precommit, commits, then calls postcommit; precommit failure aborts the
/// event with no switch commands issued.
///
/// # Ordering
///
/// Precommit phases for concurrent events on the same (switch, VLAN) are
/// serialized by the binding store; DESIGN.md records the isolation contract
/// a persistent store must provide.
#[async_trait]
pub trait PortEventHandler: Send + Sync {
    /// Update-port database phase.
    async fn update_port_precommit(&self, event: &PortEvent) -> FabricResult<()>;

    /// Update-port switch-command phase.
    async fn update_port_postcommit(&self, event: &PortEvent) -> FabricResult<()>;

    /// Delete-port database phase.
    async fn delete_port_precommit(&self, event: &PortEvent) -> FabricResult<()>;

    /// Delete-port switch-command phase.
    async fn delete_port_postcommit(&self, event: &PortEvent) -> FabricResult<()>;
}
