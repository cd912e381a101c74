//! Shared foundation for the prizepool workspace: configuration, the error
//! taxonomy, the entitlement policy tables, and plain domain types.
//!
//! Zero knowledge of Postgres schemas or the messaging platform — those live
//! in `prizepool-store` and behind the `Platform` trait in
//! `prizepool-engine`.

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::Config;
pub use error::{PrizepoolError, Result};
pub use policy::EntitlementPolicy;
pub use types::{EventKind, EventState};
