// Test doubles for the engine's two trait boundaries:
// - MemoryStore (EventStore) — stateful in-memory tables with the same
//   linearization guarantees the SQL statements give (every method takes
//   the one lock for its whole critical section).
// - MockPlatform (Platform) — records outbound surface operations,
//   serves configured entitlement sets, can be told to fail handler
//   re-binding for specific messages.
//
// No network, no database, no Docker. `cargo test` in seconds.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prizepool_common::types::{EntitlementId, EventState, ParticipantId};
use prizepool_common::{PrizepoolError, Result};
use prizepool_store::{EntryRow, EventRow, NewEvent, TicketReservation};

use crate::traits::{EventStore, Platform};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    events: BTreeMap<i64, EventRow>,
    entries: BTreeMap<(i64, ParticipantId), EntryRow>,
    broken_events: HashSet<i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entry rows currently stored (assertion helper).
    pub fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Make `entries_for` fail for this event, as a database error would.
    pub fn break_entries_for(&self, event_id: i64) {
        self.inner.lock().unwrap().broken_events.insert(event_id);
    }
}

fn row_from_new(id: i64, event: &NewEvent) -> EventRow {
    EventRow {
        id,
        kind: event.kind.as_str().to_string(),
        prize: event.prize.clone(),
        host_id: event.host_id,
        host_name: event.host_name.clone(),
        channel_id: event.channel_id,
        thread_id: None,
        message_id: None,
        ends_at: event.ends_at,
        max_winners: event.max_winners,
        ticket_price: event.ticket_price,
        max_tickets: event.max_tickets,
        tickets_sold: 0,
        image_url: event.image_url.clone(),
        state: EventState::Active.as_str().to_string(),
        created_at: Utc::now(),
        ended_at: None,
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        let row = row_from_new(id, event);
        inner.events.insert(id, row.clone());
        Ok(row)
    }

    async fn set_message(&self, event_id: i64, message_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(event) = inner.events.get_mut(&event_id) {
            event.message_id = Some(message_id);
        }
        Ok(())
    }

    async fn set_thread(&self, event_id: i64, thread_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(event) = inner.events.get_mut(&event_id) {
            event.thread_id = Some(thread_id);
        }
        Ok(())
    }

    async fn event_by_id(&self, event_id: i64) -> Result<Option<EventRow>> {
        Ok(self.inner.lock().unwrap().events.get(&event_id).cloned())
    }

    async fn event_by_message(&self, message_id: i64) -> Result<Option<EventRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .values()
            .find(|e| e.message_id == Some(message_id))
            .cloned())
    }

    async fn active_events(&self) -> Result<Vec<EventRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .values()
            .filter(|e| e.state() == EventState::Active)
            .cloned()
            .collect())
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<EventRow>> {
        let mut inner = self.inner.lock().unwrap();
        let mut claimed = Vec::new();
        for event in inner.events.values_mut() {
            if event.state() == EventState::Active && event.ends_at <= now {
                event.state = EventState::Ended.as_str().to_string();
                event.ended_at = Some(now);
                claimed.push(event.clone());
            }
        }
        Ok(claimed)
    }

    async fn claim(&self, event_id: i64, to: EventState) -> Result<Option<EventRow>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.events.get_mut(&event_id) {
            Some(event) if event.state() == EventState::Active => {
                event.state = to.as_str().to_string();
                event.ended_at = Some(Utc::now());
                Ok(Some(event.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let doomed: Vec<i64> = inner
            .events
            .values()
            .filter(|e| e.state().is_terminal() && e.ended_at.is_some_and(|t| t <= cutoff))
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            inner.events.remove(id);
            inner.entries.retain(|(event_id, _), _| event_id != id);
        }
        Ok(doomed.len() as u64)
    }

    async fn toggle_entry(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        weight: i64,
    ) -> Result<Option<bool>> {
        let mut inner = self.inner.lock().unwrap();
        let open = inner
            .events
            .get(&event_id)
            .is_some_and(|e| e.state() == EventState::Active);
        if !open {
            return Ok(None);
        }
        let key = (event_id, participant_id);
        if inner.entries.remove(&key).is_some() {
            return Ok(Some(false));
        }
        inner.entries.insert(
            key,
            EntryRow {
                event_id,
                participant_id,
                display_name: display_name.to_string(),
                weight,
                joined_at: Utc::now(),
            },
        );
        Ok(Some(true))
    }

    async fn add_tickets(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        tickets: i64,
        bonus: i64,
    ) -> Result<(i64, bool)> {
        let mut inner = self.inner.lock().unwrap();
        let key = (event_id, participant_id);
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.weight += tickets;
            entry.display_name = display_name.to_string();
            Ok((entry.weight, false))
        } else {
            let weight = tickets + bonus;
            inner.entries.insert(
                key,
                EntryRow {
                    event_id,
                    participant_id,
                    display_name: display_name.to_string(),
                    weight,
                    joined_at: Utc::now(),
                },
            );
            Ok((weight, true))
        }
    }

    async fn reserve_tickets(
        &self,
        event_id: i64,
        requested: i64,
    ) -> Result<Option<TicketReservation>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.events.get_mut(&event_id) {
            Some(event) if event.state() == EventState::Active => {
                let prev = event.tickets_sold;
                event.tickets_sold = if event.max_tickets > 0 {
                    (prev + requested).min(event.max_tickets)
                } else {
                    prev + requested
                };
                Ok(Some(TicketReservation {
                    granted: event.tickets_sold - prev,
                    total_sold: event.tickets_sold,
                    max_tickets: event.max_tickets,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn adjust_weight(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(&(event_id, participant_id)) {
            entry.weight = (entry.weight + delta).max(0);
        }
        Ok(())
    }

    async fn adjust_open_giveaway_weights(
        &self,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<Vec<(i64, i64)>> {
        let mut inner = self.inner.lock().unwrap();
        let open_giveaways: HashSet<i64> = inner
            .events
            .values()
            .filter(|e| e.state() == EventState::Active && e.kind == "giveaway")
            .map(|e| e.id)
            .collect();
        let mut updated = Vec::new();
        for ((event_id, pid), entry) in inner.entries.iter_mut() {
            if *pid == participant_id && open_giveaways.contains(event_id) {
                entry.weight = (entry.weight + delta).max(0);
                updated.push((*event_id, entry.weight));
            }
        }
        Ok(updated)
    }

    async fn delete_open_giveaway_entries(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<i64>> {
        let mut inner = self.inner.lock().unwrap();
        let open_giveaways: HashSet<i64> = inner
            .events
            .values()
            .filter(|e| e.state() == EventState::Active && e.kind == "giveaway")
            .map(|e| e.id)
            .collect();
        let doomed: Vec<i64> = inner
            .entries
            .keys()
            .filter(|(event_id, pid)| *pid == participant_id && open_giveaways.contains(event_id))
            .map(|(event_id, _)| *event_id)
            .collect();
        for event_id in &doomed {
            inner.entries.remove(&(*event_id, participant_id));
        }
        Ok(doomed)
    }

    async fn delete_entry(&self, event_id: i64, participant_id: ParticipantId) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entries
            .remove(&(event_id, participant_id))
            .is_some())
    }

    async fn entries_for(&self, event_id: i64) -> Result<Vec<EntryRow>> {
        let inner = self.inner.lock().unwrap();
        if inner.broken_events.contains(&event_id) {
            return Err(PrizepoolError::Other(anyhow::anyhow!(
                "injected entries_for failure for event {event_id}"
            )));
        }
        Ok(inner
            .entries
            .values()
            .filter(|e| e.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn entry_for(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
    ) -> Result<Option<EntryRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entries
            .get(&(event_id, participant_id))
            .cloned())
    }

    async fn open_giveaway_entries_for(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<EntryRow>> {
        let inner = self.inner.lock().unwrap();
        let open_giveaways: HashSet<i64> = inner
            .events
            .values()
            .filter(|e| e.state() == EventState::Active && e.kind == "giveaway")
            .map(|e| e.id)
            .collect();
        Ok(inner
            .entries
            .values()
            .filter(|e| e.participant_id == participant_id && open_giveaways.contains(&e.event_id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockPlatform
// ---------------------------------------------------------------------------

/// Records every outbound surface operation. Builder pattern:
/// `.with_entitlements()`, `.with_unresolvable_message()`.
#[derive(Default)]
pub struct MockPlatform {
    next_id: AtomicI64,
    entitlements: Mutex<HashMap<ParticipantId, HashSet<EntitlementId>>>,
    unresolvable: Mutex<HashSet<i64>>,

    announcements: Mutex<Vec<(i64, String)>>,
    edits: Mutex<Vec<(i64, String)>>,
    notices: Mutex<Vec<(ParticipantId, String)>>,
    handlers: Mutex<Vec<(i64, i64)>>,
    locked_threads: Mutex<Vec<(i64, String)>>,
    disabled_messages: Mutex<Vec<i64>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    pub fn with_entitlements(
        self,
        participant_id: ParticipantId,
        held: impl IntoIterator<Item = EntitlementId>,
    ) -> Self {
        self.set_entitlements(participant_id, held);
        self
    }

    /// Handler re-binding for this message id will fail (deleted message).
    pub fn with_unresolvable_message(self, message_id: i64) -> Self {
        self.unresolvable.lock().unwrap().insert(message_id);
        self
    }

    /// Replace a participant's entitlement set mid-test.
    pub fn set_entitlements(
        &self,
        participant_id: ParticipantId,
        held: impl IntoIterator<Item = EntitlementId>,
    ) {
        self.entitlements
            .lock()
            .unwrap()
            .insert(participant_id, held.into_iter().collect());
    }

    pub fn announcements(&self) -> Vec<(i64, String)> {
        self.announcements.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(i64, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<(ParticipantId, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn handlers(&self) -> Vec<(i64, i64)> {
        self.handlers.lock().unwrap().clone()
    }

    pub fn locked_threads(&self) -> Vec<(i64, String)> {
        self.locked_threads.lock().unwrap().clone()
    }

    pub fn disabled_messages(&self) -> Vec<i64> {
        self.disabled_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn post_event_message(&self, _event: &EventRow) -> Result<i64> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn edit_event_message(
        &self,
        _channel_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<()> {
        self.edits
            .lock()
            .unwrap()
            .push((message_id, content.to_string()));
        Ok(())
    }

    async fn disable_components(&self, _channel_id: i64, message_id: i64) -> Result<()> {
        self.disabled_messages.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn announce(
        &self,
        channel_id: i64,
        _reply_to: Option<i64>,
        content: &str,
    ) -> Result<()> {
        self.announcements
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn create_thread(&self, _channel_id: i64, _message_id: i64, _name: &str) -> Result<i64> {
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn lock_thread(&self, thread_id: i64, name: &str) -> Result<()> {
        self.locked_threads
            .lock()
            .unwrap()
            .push((thread_id, name.to_string()));
        Ok(())
    }

    async fn entitlements_of(
        &self,
        participant_id: ParticipantId,
    ) -> Result<HashSet<EntitlementId>> {
        Ok(self
            .entitlements
            .lock()
            .unwrap()
            .get(&participant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn notify_participant(&self, participant_id: ParticipantId, content: &str) -> Result<()> {
        self.notices
            .lock()
            .unwrap()
            .push((participant_id, content.to_string()));
        Ok(())
    }

    async fn register_handler(&self, message_id: i64, event_id: i64) -> Result<()> {
        if self.unresolvable.lock().unwrap().contains(&message_id) {
            return Err(PrizepoolError::NotFound(format!("message {message_id}")));
        }
        self.handlers.lock().unwrap().push((message_id, event_id));
        Ok(())
    }
}
