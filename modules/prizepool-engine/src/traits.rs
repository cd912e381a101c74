// Trait abstractions for the engine's two external collaborators.
//
// EventStore — the durable event/entry rows. Implemented by PgStore
//   (postgres) and MemoryStore (tests). Every mutation is a single atomic
//   statement; the store serializes them, which is the only mutual
//   exclusion between competing finalize attempts.
// Platform — the messaging surface: interactive messages, threads,
//   announcements, entitlement lookups. Implemented by a real platform
//   binding, LogPlatform (daemon without a binding), and MockPlatform
//   (tests).
//
// These enable deterministic testing with MemoryStore and MockPlatform:
// no network, no database, no Docker. `cargo test` in seconds.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prizepool_common::types::{EntitlementId, EventState, ParticipantId};
use prizepool_common::Result;
use prizepool_store::{EntryRow, EventRow, NewEvent, PgStore, TicketReservation};

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow>;
    async fn set_message(&self, event_id: i64, message_id: i64) -> Result<()>;
    async fn set_thread(&self, event_id: i64, thread_id: i64) -> Result<()>;

    async fn event_by_id(&self, event_id: i64) -> Result<Option<EventRow>>;
    async fn event_by_message(&self, message_id: i64) -> Result<Option<EventRow>>;
    async fn active_events(&self) -> Result<Vec<EventRow>>;

    /// Select-and-flip every due active event to `ended` in one statement.
    /// Each returned row was flipped by this call and by no other.
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<EventRow>>;

    /// Claim one event into a terminal state. `None` = not active anymore.
    async fn claim(&self, event_id: i64, to: EventState) -> Result<Option<EventRow>>;

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Giveaway join toggle, gated on the event still being active.
    /// `Some(entered_afterwards)`, or `None` when the event is no longer
    /// open (lost a race against a claim).
    async fn toggle_entry(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        weight: i64,
    ) -> Result<Option<bool>>;

    /// Add tickets to a lottery entry; `bonus` lands only if this creates
    /// the entry. Returns (new total, was first purchase).
    async fn add_tickets(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        tickets: i64,
        bonus: i64,
    ) -> Result<(i64, bool)>;

    /// Reserve tickets against the event-level cap. `None` = not active.
    async fn reserve_tickets(
        &self,
        event_id: i64,
        requested: i64,
    ) -> Result<Option<TicketReservation>>;

    async fn adjust_weight(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<()>;

    /// Delta-adjust every open-giveaway entry the participant holds.
    /// Returns (event_id, new_weight) per affected row.
    async fn adjust_open_giveaway_weights(
        &self,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<Vec<(i64, i64)>>;

    /// Evict the participant from every open giveaway; returns event ids.
    async fn delete_open_giveaway_entries(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<i64>>;

    async fn delete_entry(&self, event_id: i64, participant_id: ParticipantId) -> Result<bool>;
    async fn entries_for(&self, event_id: i64) -> Result<Vec<EntryRow>>;
    async fn entry_for(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
    ) -> Result<Option<EntryRow>>;
    async fn open_giveaway_entries_for(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<EntryRow>>;
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow> {
        PgStore::insert_event(self, event).await
    }

    async fn set_message(&self, event_id: i64, message_id: i64) -> Result<()> {
        PgStore::set_message(self, event_id, message_id).await
    }

    async fn set_thread(&self, event_id: i64, thread_id: i64) -> Result<()> {
        PgStore::set_thread(self, event_id, thread_id).await
    }

    async fn event_by_id(&self, event_id: i64) -> Result<Option<EventRow>> {
        PgStore::event_by_id(self, event_id).await
    }

    async fn event_by_message(&self, message_id: i64) -> Result<Option<EventRow>> {
        PgStore::event_by_message(self, message_id).await
    }

    async fn active_events(&self) -> Result<Vec<EventRow>> {
        PgStore::active_events(self).await
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<EventRow>> {
        PgStore::claim_due(self, now).await
    }

    async fn claim(&self, event_id: i64, to: EventState) -> Result<Option<EventRow>> {
        PgStore::claim(self, event_id, to).await
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        PgStore::purge_finished_before(self, cutoff).await
    }

    async fn toggle_entry(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        weight: i64,
    ) -> Result<Option<bool>> {
        PgStore::toggle_entry(self, event_id, participant_id, display_name, weight).await
    }

    async fn add_tickets(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        tickets: i64,
        bonus: i64,
    ) -> Result<(i64, bool)> {
        PgStore::add_tickets(self, event_id, participant_id, display_name, tickets, bonus).await
    }

    async fn reserve_tickets(
        &self,
        event_id: i64,
        requested: i64,
    ) -> Result<Option<TicketReservation>> {
        PgStore::reserve_tickets(self, event_id, requested).await
    }

    async fn adjust_weight(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<()> {
        PgStore::adjust_weight(self, event_id, participant_id, delta).await
    }

    async fn adjust_open_giveaway_weights(
        &self,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<Vec<(i64, i64)>> {
        PgStore::adjust_open_giveaway_weights(self, participant_id, delta).await
    }

    async fn delete_open_giveaway_entries(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<i64>> {
        PgStore::delete_open_giveaway_entries(self, participant_id).await
    }

    async fn delete_entry(&self, event_id: i64, participant_id: ParticipantId) -> Result<bool> {
        PgStore::delete_entry(self, event_id, participant_id).await
    }

    async fn entries_for(&self, event_id: i64) -> Result<Vec<EntryRow>> {
        PgStore::entries_for(self, event_id).await
    }

    async fn entry_for(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
    ) -> Result<Option<EntryRow>> {
        PgStore::entry_for(self, event_id, participant_id).await
    }

    async fn open_giveaway_entries_for(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<EntryRow>> {
        PgStore::open_giveaway_entries_for(self, participant_id).await
    }
}

// ---------------------------------------------------------------------------
// Platform — the messaging collaborator
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Platform: Send + Sync {
    /// Post the interactive event message. Returns the message id.
    async fn post_event_message(&self, event: &EventRow) -> Result<i64>;

    /// Rewrite the event message (ended/cancelled surface).
    async fn edit_event_message(
        &self,
        channel_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<()>;

    /// Strip the interactive components so stale buttons stop working.
    async fn disable_components(&self, channel_id: i64, message_id: i64) -> Result<()>;

    /// Send an announcement, optionally as a reply to the event message.
    async fn announce(&self, channel_id: i64, reply_to: Option<i64>, content: &str) -> Result<()>;

    /// Create a discussion thread bound to a message. Returns the thread id.
    async fn create_thread(&self, channel_id: i64, message_id: i64, name: &str) -> Result<i64>;

    /// Lock a thread and rename it.
    async fn lock_thread(&self, thread_id: i64, name: &str) -> Result<()>;

    /// The participant's current entitlement set.
    async fn entitlements_of(&self, participant_id: ParticipantId)
        -> Result<HashSet<EntitlementId>>;

    /// Out-of-band notice to one participant (eviction, bonus changes).
    async fn notify_participant(&self, participant_id: ParticipantId, content: &str) -> Result<()>;

    /// Re-bind the interactive handler for a still-open event message.
    /// Errors when the message can no longer be resolved.
    async fn register_handler(&self, message_id: i64, event_id: i64) -> Result<()>;
}
