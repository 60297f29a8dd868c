//! Worker-side private network discovery and VPN route convergence
//!
//! The reconcile cycle learns each tenant node's private management CIDR
//! from the cloud API (cached in a node annotation), aggregates the fleet
//! into a canonical comma-joined set, records it on the Infrastructure
//! status, and propagates it into the VPN routing workload's environment.
//! Every write is idempotent so concurrent actors self-heal at the next
//! cycle instead of needing coordination.

pub mod cidr;
pub mod controller;
pub mod kube_access;
pub mod node_cache;
pub mod provider_id;
pub mod resolver;
pub mod status;
pub mod vpn;

pub use controller::{error_policy, reconcile, Context};
pub use kube_access::{WorkerKube, WorkerKubeImpl};
