//! Switch transport seam.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use torfabric_common::FabricResult;

use crate::commands::SwitchCommand;

/// Applies configuration commands to physical switches.
///
/// Commands addressed to different switches are independent; commands to the
/// same switch must be applied in call order. Failures propagate unmodified
/// as `FabricError::Transport`; the reconciler performs no retry or rollback.
#[async_trait]
pub trait SwitchTransport: Send + Sync {
    /// Applies one command on the addressed switch.
    async fn execute(&self, switch_id: &str, command: &SwitchCommand) -> FabricResult<()>;
}

/// Transport that records every command instead of touching hardware.
///
/// Used by the test suites and by the daemon's dry-run mode; each command is
/// also logged with its rendered CLI lines.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    issued: Mutex<Vec<(String, SwitchCommand)>>,
}

impl RecordingTransport {
    /// Creates an empty recording transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands issued so far, as (switch_id, command) pairs.
    pub fn issued(&self) -> Vec<(String, SwitchCommand)> {
        self.issued.lock().expect("transport mutex poisoned").clone()
    }

    /// Commands issued to one switch.
    pub fn issued_for(&self, switch_id: &str) -> Vec<SwitchCommand> {
        self.issued()
            .into_iter()
            .filter(|(s, _)| s == switch_id)
            .map(|(_, c)| c)
            .collect()
    }

    /// Number of issued commands matching a predicate.
    pub fn count_matching(&self, predicate: impl Fn(&str, &SwitchCommand) -> bool) -> usize {
        self.issued()
            .iter()
            .filter(|(s, c)| predicate(s, c))
            .count()
    }

    /// Drops all recorded commands.
    pub fn clear(&self) {
        self.issued.lock().expect("transport mutex poisoned").clear();
    }
}

#[async_trait]
impl SwitchTransport for RecordingTransport {
    async fn execute(&self, switch_id: &str, command: &SwitchCommand) -> FabricResult<()> {
        info!(switch = %switch_id, %command, "Switch command");
        for line in command.cli_lines() {
            info!(switch = %switch_id, "  {}", line);
        }
        self.issued
            .lock()
            .expect("transport mutex poisoned")
            .push((switch_id.to_string(), command.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_transport_orders_commands() {
        let transport = RecordingTransport::new();
        transport
            .execute(
                "s1",
                &SwitchCommand::CreateVlan {
                    vlan_id: 100,
                    name: "vlan-100".to_string(),
                },
            )
            .await
            .unwrap();
        transport
            .execute("s1", &SwitchCommand::DeleteVlan { vlan_id: 100 })
            .await
            .unwrap();
        transport
            .execute("s2", &SwitchCommand::DeleteVlan { vlan_id: 100 })
            .await
            .unwrap();

        let s1 = transport.issued_for("s1");
        assert_eq!(s1.len(), 2);
        assert!(matches!(s1[0], SwitchCommand::CreateVlan { .. }));
        assert!(matches!(s1[1], SwitchCommand::DeleteVlan { .. }));

        assert_eq!(
            transport.count_matching(|_, c| matches!(c, SwitchCommand::DeleteVlan { .. })),
            2
        );

        transport.clear();
        assert!(transport.issued().is_empty());
    }
}
