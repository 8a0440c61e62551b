//! Shared infrastructure for the torfabric binding reconciler.
//!
//! This crate provides the pieces every torfabric crate needs:
//!
//! - [`error`]: the [`FabricError`] taxonomy and [`FabricResult`] alias
//! - [`types`]: port events, segments and switch connections
//! - [`handler`]: the [`PortEventHandler`] trait the lifecycle framework
//!   drives
//!
//! # Architecture
//!
//! A port lifecycle event flows through four phases (precommit/postcommit ×
//! update/delete). Precommit phases mutate only the binding store; postcommit
//! phases issue switch commands. The reconciler in `bindmgrd` implements
//! [`PortEventHandler`] over a `torfabric-store` backend and an injected
//! switch transport.

pub mod error;
pub mod handler;
pub mod types;

pub use error::{FabricError, FabricResult};
pub use handler::PortEventHandler;
pub use types::{
    InterfaceType, NetworkType, PortEvent, PortInfo, PortStatus, Segment, SwitchConnection,
};
