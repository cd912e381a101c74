//! Fulfillment engine for time-boxed community events.
//!
//! Two event kinds share one lifecycle: giveaways (free, toggleable,
//! weighted entries) and lotteries (purchased tickets, one ticket = one
//! unit of weight). A background poller claims due events atomically and
//! finalizes them by weighted sampling without replacement.
//!
//! The engine talks to the outside world through two traits: [`EventStore`]
//! for persistence and [`Platform`] for the messaging surface. Production
//! binds `PgStore`; tests bind the doubles in [`testing`].

pub mod admin;
pub mod finalize;
pub mod hooks;
pub mod ledger;
pub mod platform;
pub mod poller;
pub mod recovery;
pub mod resolver;
pub mod selector;
pub mod testing;
pub mod traits;

pub use admin::{CreateEvent, EventAdmin, EventRef};
pub use finalize::finalize_event;
pub use hooks::EntitlementHooks;
pub use ledger::{JoinOutcome, Ledger, PurchaseOutcome};
pub use platform::LogPlatform;
pub use poller::CompletionPoller;
pub use recovery::restore_surfaces;
pub use resolver::EntitlementResolver;
pub use selector::{pick_winners, pick_winners_with, Winner};
pub use traits::{EventStore, Platform};
