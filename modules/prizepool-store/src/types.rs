//! Row types for the events and entries tables.

use chrono::{DateTime, Utc};
use prizepool_common::types::{EventKind, EventState, ParticipantId};

/// An event as stored in Postgres. Returned by all read methods.
///
/// `kind` and `state` stay as the raw column strings (the schema CHECK
/// constraints bound the value space); the typed accessors convert.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub kind: String,
    pub prize: String,
    pub host_id: i64,
    pub host_name: String,
    pub channel_id: i64,
    pub thread_id: Option<i64>,
    pub message_id: Option<i64>,
    pub ends_at: DateTime<Utc>,
    pub max_winners: i32,
    pub ticket_price: i64,
    pub max_tickets: i64,
    pub tickets_sold: i64,
    pub image_url: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl EventRow {
    pub fn kind(&self) -> EventKind {
        EventKind::from_db(&self.kind)
    }

    pub fn state(&self) -> EventState {
        EventState::from_db(&self.state)
    }

    /// Lottery only. `max_tickets == 0` means uncapped.
    pub fn is_sold_out(&self) -> bool {
        self.max_tickets > 0 && self.tickets_sold >= self.max_tickets
    }
}

/// A participant's stake in one event: entry weight for giveaways, ticket
/// count for lotteries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub event_id: i64,
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub weight: i64,
    pub joined_at: DateTime<Utc>,
}

/// Parameters for inserting a new event. The store assigns id/created_at.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: EventKind,
    pub prize: String,
    pub host_id: i64,
    pub host_name: String,
    pub channel_id: i64,
    pub ends_at: DateTime<Utc>,
    pub max_winners: i32,
    pub ticket_price: i64,
    pub max_tickets: i64,
    pub image_url: Option<String>,
}

impl NewEvent {
    pub fn giveaway(
        prize: impl Into<String>,
        host_id: i64,
        host_name: impl Into<String>,
        channel_id: i64,
        ends_at: DateTime<Utc>,
        max_winners: i32,
    ) -> Self {
        Self {
            kind: EventKind::Giveaway,
            prize: prize.into(),
            host_id,
            host_name: host_name.into(),
            channel_id,
            ends_at,
            max_winners,
            ticket_price: 0,
            max_tickets: 0,
            image_url: None,
        }
    }

    pub fn lottery(
        prize: impl Into<String>,
        host_id: i64,
        host_name: impl Into<String>,
        channel_id: i64,
        ends_at: DateTime<Utc>,
        ticket_price: i64,
        max_tickets: i64,
    ) -> Self {
        Self {
            kind: EventKind::Lottery,
            prize: prize.into(),
            host_id,
            host_name: host_name.into(),
            channel_id,
            ends_at,
            max_winners: 1,
            ticket_price,
            max_tickets,
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Outcome of the event-level ticket reservation statement.
#[derive(Debug, Clone, Copy)]
pub struct TicketReservation {
    /// Tickets actually granted by this call (post-cap).
    pub granted: i64,
    /// Total sold after this call.
    pub total_sold: i64,
    /// Cap at reservation time (0 = uncapped).
    pub max_tickets: i64,
}
