//! Administrative operations: create, manual end, cancel, reroll, and
//! participant removal. End and cancel route through the same atomic claim
//! the poller uses, so a race resolves to exactly one winner announcement
//! and one `AlreadyFinalized` no-op.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use prizepool_common::types::{EventKind, EventState, ParticipantId};
use prizepool_common::{PrizepoolError, Result};
use prizepool_store::{EventRow, NewEvent};

use crate::finalize::{announce_outcome, finalize_event, Outcome};
use crate::resolver::EntitlementResolver;
use crate::selector::{pick_winners, Winner};
use crate::traits::{EventStore, Platform};

/// How callers address an existing event: by event id or by the id of its
/// interactive message (chat commands tend to hold the latter).
#[derive(Debug, Clone, Copy)]
pub enum EventRef {
    Id(i64),
    Message(i64),
}

impl std::fmt::Display for EventRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventRef::Id(id) => write!(f, "event {id}"),
            EventRef::Message(id) => write!(f, "message {id}"),
        }
    }
}

/// Parameters for creating an event.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub kind: EventKind,
    pub prize: String,
    pub host_id: i64,
    pub host_name: String,
    pub channel_id: i64,
    pub duration: Duration,
    /// Giveaways only.
    pub max_winners: i32,
    /// Lotteries only.
    pub ticket_price: i64,
    /// Lotteries only; 0 = uncapped.
    pub max_tickets: i64,
    pub image_url: Option<String>,
}

pub struct EventAdmin {
    store: Arc<dyn EventStore>,
    platform: Arc<dyn Platform>,
    resolver: Arc<EntitlementResolver>,
}

impl EventAdmin {
    pub fn new(
        store: Arc<dyn EventStore>,
        platform: Arc<dyn Platform>,
        resolver: Arc<EntitlementResolver>,
    ) -> Self {
        Self {
            store,
            platform,
            resolver,
        }
    }

    /// Validate, persist, and surface a new event: post the interactive
    /// message, create its discussion thread, store both ids.
    pub async fn create(&self, params: CreateEvent) -> Result<EventRow> {
        validate(&params)?;

        let held = self.platform.entitlements_of(params.host_id).await?;
        self.resolver.check_host(&held)?;

        let new_event = NewEvent {
            kind: params.kind,
            prize: params.prize,
            host_id: params.host_id,
            host_name: params.host_name,
            channel_id: params.channel_id,
            ends_at: Utc::now() + params.duration,
            max_winners: params.max_winners,
            ticket_price: params.ticket_price,
            max_tickets: params.max_tickets,
            image_url: params.image_url,
        };
        let mut event = self.store.insert_event(&new_event).await?;

        let message_id = self.platform.post_event_message(&event).await?;
        self.store.set_message(event.id, message_id).await?;
        event.message_id = Some(message_id);

        let thread_name = open_thread_name(&event);
        match self
            .platform
            .create_thread(event.channel_id, message_id, &thread_name)
            .await
        {
            Ok(thread_id) => {
                self.store.set_thread(event.id, thread_id).await?;
                event.thread_id = Some(thread_id);
            }
            Err(e) => {
                // The event works without its thread; the surface lags.
                warn!(event_id = event.id, error = %e, "Failed to create event thread");
            }
        }

        info!(
            event_id = event.id,
            kind = %event.kind(),
            ends_at = %event.ends_at,
            "Created event"
        );
        Ok(event)
    }

    /// Manual end. Wins the claim or surfaces `AlreadyFinalized`.
    pub async fn end(&self, event_ref: EventRef) -> Result<Vec<Winner>> {
        let event = self.resolve(event_ref).await?;
        let claimed = self
            .store
            .claim(event.id, EventState::Ended)
            .await?
            .ok_or(PrizepoolError::AlreadyFinalized)?;

        info!(event_id = claimed.id, "Event ended manually");
        finalize_event(self.store.as_ref(), self.platform.as_ref(), &claimed).await
    }

    /// Cancel: claim into `cancelled`, no winner selection.
    pub async fn cancel(&self, event_ref: EventRef) -> Result<()> {
        let event = self.resolve(event_ref).await?;
        let claimed = self
            .store
            .claim(event.id, EventState::Cancelled)
            .await?
            .ok_or(PrizepoolError::AlreadyFinalized)?;

        if let Some(message_id) = claimed.message_id {
            if let Err(e) = self
                .platform
                .disable_components(claimed.channel_id, message_id)
                .await
            {
                warn!(event_id = claimed.id, error = %e, "Failed to disable components");
            }
            let body = format!(
                "{} — Cancelled\nPrize: {}",
                claimed.kind().to_string().to_uppercase(),
                claimed.prize
            );
            if let Err(e) = self
                .platform
                .edit_event_message(claimed.channel_id, message_id, &body)
                .await
            {
                warn!(event_id = claimed.id, error = %e, "Failed to edit cancelled message");
            }
        }
        if let Some(thread_id) = claimed.thread_id {
            let name = format!("🔒 ID #{} | Cancelled", claimed.id);
            if let Err(e) = self.platform.lock_thread(thread_id, &name).await {
                warn!(event_id = claimed.id, thread_id, error = %e, "Failed to lock thread");
            }
        }

        info!(event_id = claimed.id, "Event cancelled");
        Ok(())
    }

    /// Reroll winners over the remaining entries of an ended event. Also
    /// the recovery path for an event that was claimed but crashed before
    /// selection.
    pub async fn reroll(&self, event_ref: EventRef, count: usize) -> Result<Vec<Winner>> {
        if count == 0 {
            return Err(PrizepoolError::Validation(
                "Reroll count must be at least 1".to_string(),
            ));
        }
        let event = self.resolve(event_ref).await?;
        match event.state() {
            EventState::Ended => {}
            EventState::Active => {
                return Err(PrizepoolError::Validation(
                    "This event is still running, end it first".to_string(),
                ));
            }
            EventState::Cancelled => {
                return Err(PrizepoolError::Validation(
                    "Cancelled events cannot be rerolled".to_string(),
                ));
            }
        }

        let entries = self.store.entries_for(event.id).await?;
        let winners = pick_winners(self.store.as_ref(), event.id, &entries, count).await?;
        announce_outcome(
            self.platform.as_ref(),
            &event,
            &winners,
            Outcome::Rerolled,
        )
        .await;

        info!(
            event_id = event.id,
            winners = winners.len(),
            "Event rerolled"
        );
        Ok(winners)
    }

    /// Host/moderator removal of a single participant from an open event.
    pub async fn remove_participant(
        &self,
        event_ref: EventRef,
        participant_id: ParticipantId,
    ) -> Result<bool> {
        let event = self.resolve(event_ref).await?;
        if event.state() != EventState::Active {
            return Err(PrizepoolError::AlreadyFinalized);
        }
        let removed = self.store.delete_entry(event.id, participant_id).await?;
        if removed {
            info!(event_id = event.id, participant_id, "Removed participant");
        }
        Ok(removed)
    }

    async fn resolve(&self, event_ref: EventRef) -> Result<EventRow> {
        let found = match event_ref {
            EventRef::Id(id) => self.store.event_by_id(id).await?,
            EventRef::Message(id) => self.store.event_by_message(id).await?,
        };
        found.ok_or_else(|| PrizepoolError::NotFound(event_ref.to_string()))
    }
}

fn validate(params: &CreateEvent) -> Result<()> {
    if params.prize.trim().is_empty() {
        return Err(PrizepoolError::Validation("Prize must not be empty".into()));
    }
    if params.duration <= Duration::zero() {
        return Err(PrizepoolError::Validation(
            "Duration must be positive".into(),
        ));
    }
    match params.kind {
        EventKind::Giveaway => {
            if params.max_winners < 1 {
                return Err(PrizepoolError::Validation(
                    "A giveaway needs at least one winner".into(),
                ));
            }
        }
        EventKind::Lottery => {
            if params.ticket_price <= 0 {
                return Err(PrizepoolError::Validation(
                    "Ticket price must be positive".into(),
                ));
            }
            if params.max_tickets < 0 {
                return Err(PrizepoolError::Validation(
                    "Max tickets must not be negative".into(),
                ));
            }
        }
    }
    Ok(())
}

fn open_thread_name(event: &EventRow) -> String {
    match event.kind() {
        EventKind::Giveaway => format!("🎉 ID #{} | {} GA", event.id, event.host_name),
        EventKind::Lottery => format!("🎟️ ID #{} | Lottery", event.id),
    }
}
