//! bindmgrd - Switch Binding Reconciler Daemon
//!
//! Entry point for the bindmgrd daemon.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use torfabric_bindmgrd::{BindingReconciler, RecordingTransport, Topology};
use torfabric_store::MemoryBindingStore;

/// Initializes tracing/logging subsystem
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn load_topology() -> anyhow::Result<Topology> {
    let path = std::env::args()
        .nth(1)
        .context("usage: bindmgrd <topology.yaml>")?;
    let yaml = std::fs::read_to_string(&path)
        .with_context(|| format!("reading topology file {}", path))?;
    Topology::from_yaml(&yaml).with_context(|| format!("parsing topology file {}", path))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting bindmgrd ---");

    let topology = match load_topology() {
        Ok(topology) => topology,
        Err(e) => {
            error!("Failed to load topology: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(MemoryBindingStore::new());
    let transport = Arc::new(RecordingTransport::new());
    let _reconciler = BindingReconciler::new(topology, store, transport);

    // TODO: wire the port lifecycle event feed (message bus consumer) to the
    // PortEventHandler entry points; until then the daemon validates config
    // and exits.

    info!("bindmgrd initialization complete (dry-run transport)");

    ExitCode::SUCCESS
}
