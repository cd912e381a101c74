//! Durable event/entry rows in Postgres. The single source of truth.
//!
//! All mutations are single upsert/update/select-and-flip statements —
//! never multi-step application transactions. The engine crate consumes
//! this through its `EventStore` trait seam.

pub mod store;
pub mod types;

pub use store::PgStore;
pub use types::{EntryRow, EventRow, NewEvent, TicketReservation};
