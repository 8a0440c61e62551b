//! Binding store for the torfabric reconciler.
//!
//! Two tables back the reconciler's decisions:
//!
//! - [`PortBinding`]: one row per (switch, interface, VLAN, device) in use
//! - [`NveBinding`]: one row per (switch, VNI) configured on the switch's
//!   NVE interface
//!
//! [`BindingStore`] is the narrow repository seam the reconciler queries and
//! mutates; [`MemoryBindingStore`] is the bundled in-process implementation.

mod records;
mod store;

pub use records::{NveBinding, PortBinding, NO_VNI};
pub use store::{BindingStore, MemoryBindingStore};
