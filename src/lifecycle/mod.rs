//! Replica lifecycle
//!
//! The per-replica state machine and the rule that collapses an object's
//! replicas into one overall status.

mod error;
mod resolver;
mod state_machine;

pub use error::{LifecycleError, LifecycleResult};
pub use resolver::{resolve, ReplicaSet};
pub use state_machine::{sort_for_display, ReplicaBatch, ReplicaEvent, ReplicaLifecycle};
