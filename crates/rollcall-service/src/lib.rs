//! Rollcall operations surface.
//!
//! Everything the pre-authorized command collaborator may invoke lives
//! here: identity admin operations with the confirmed bulk wipe, the
//! platform event dispatcher, and environment/tracing bootstrap helpers.
//! Authorization itself happens before a call reaches this crate.

pub mod bootstrap;
pub mod dispatch;
pub mod ops;
pub mod service;

pub use bootstrap::{init_tracing, ServiceConfig};
pub use dispatch::run_dispatcher;
pub use ops::{IdentityOps, OpsError};
pub use service::RollcallService;
