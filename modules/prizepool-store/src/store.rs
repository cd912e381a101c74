//! Postgres persistence. Every mutation is a single SQL statement; the
//! database serializes them, so the application never does
//! read-modify-write on weights, ticket counts, or event state.

use chrono::{DateTime, Utc};
use prizepool_common::types::{EventState, ParticipantId};
use prizepool_common::Result;
use sqlx::PgPool;

use crate::types::{EntryRow, EventRow, NewEvent, TicketReservation};

/// Handle to the events/entries tables. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    pub async fn insert_event(&self, event: &NewEvent) -> Result<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events
                (kind, prize, host_id, host_name, channel_id, ends_at,
                 max_winners, ticket_price, max_tickets, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(event.kind.as_str())
        .bind(&event.prize)
        .bind(event.host_id)
        .bind(&event.host_name)
        .bind(event.channel_id)
        .bind(event.ends_at)
        .bind(event.max_winners)
        .bind(event.ticket_price)
        .bind(event.max_tickets)
        .bind(&event.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_message(&self, event_id: i64, message_id: i64) -> Result<()> {
        sqlx::query("UPDATE events SET message_id = $2 WHERE id = $1")
            .bind(event_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_thread(&self, event_id: i64, thread_id: i64) -> Result<()> {
        sqlx::query("UPDATE events SET thread_id = $2 WHERE id = $1")
            .bind(event_id)
            .bind(thread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn event_by_id(&self, event_id: i64) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn event_by_message(&self, message_id: i64) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE message_id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// All events still open. Used by surface recovery at startup.
    pub async fn active_events(&self) -> Result<Vec<EventRow>> {
        let rows =
            sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE state = 'active' ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// The atomic claim: select every due active event AND flip it to
    /// `ended` in one statement. Each row is returned to exactly one
    /// caller — a racing tick or a manual /end can flip it at most once.
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE events
            SET state = 'ended', ended_at = $1
            WHERE state = 'active' AND ends_at <= $1
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Claim one event into a terminal state. `None` means the row was not
    /// active (already claimed elsewhere, or missing).
    pub async fn claim(&self, event_id: i64, to: EventState) -> Result<Option<EventRow>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE events
            SET state = $2, ended_at = now()
            WHERE id = $1 AND state = 'active'
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Housekeeping: drop finished events older than the retention cutoff.
    /// Entries cascade.
    pub async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM events
            WHERE state IN ('ended', 'cancelled') AND ended_at <= $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------

    /// Giveaway join toggle in one statement: delete the entry if present,
    /// otherwise insert it with the resolved weight. Both arms are gated
    /// on the event still being `active`, so a toggle racing a claim can
    /// never touch the entries of a finalized event. Returns
    /// `Some(entered_afterwards)`, or `None` when the event is no longer
    /// open. Concurrent calls from the same participant linearize on the
    /// primary key — no double insert.
    pub async fn toggle_entry(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        weight: i64,
    ) -> Result<Option<bool>> {
        let (open, joined) = sqlx::query_as::<_, (bool, bool)>(
            r#"
            WITH open_event AS (
                SELECT id FROM events WHERE id = $1 AND state = 'active'
            ), removed AS (
                DELETE FROM entries
                WHERE event_id = $1 AND participant_id = $2
                  AND EXISTS (SELECT 1 FROM open_event)
                RETURNING participant_id
            ), inserted AS (
                INSERT INTO entries (event_id, participant_id, display_name, weight)
                SELECT $1, $2, $3, $4
                FROM open_event
                WHERE NOT EXISTS (SELECT 1 FROM removed)
                ON CONFLICT (event_id, participant_id) DO NOTHING
                RETURNING participant_id
            )
            SELECT EXISTS (SELECT 1 FROM open_event),
                   EXISTS (SELECT 1 FROM inserted)
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(display_name)
        .bind(weight)
        .fetch_one(&self.pool)
        .await?;
        Ok(if open { Some(joined) } else { None })
    }

    /// Lottery ticket accumulation. The entitlement bonus lands exactly
    /// once: it is part of the inserted weight but not of the conflict
    /// delta. Returns the new total and whether this was a first purchase
    /// (`xmax = 0` on a freshly inserted row).
    pub async fn add_tickets(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
        tickets: i64,
        bonus: i64,
    ) -> Result<(i64, bool)> {
        let (total, first) = sqlx::query_as::<_, (i64, bool)>(
            r#"
            INSERT INTO entries (event_id, participant_id, display_name, weight)
            VALUES ($1, $2, $3, $4 + $5)
            ON CONFLICT (event_id, participant_id) DO UPDATE
            SET weight = entries.weight + $4,
                display_name = EXCLUDED.display_name
            RETURNING weight, (xmax = 0)
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(display_name)
        .bind(tickets)
        .bind(bonus)
        .fetch_one(&self.pool)
        .await?;
        Ok((total, first))
    }

    /// Reserve tickets against the event-level cap. The `FOR UPDATE`
    /// pre-read row-locks the event, so racing purchases queue up and each
    /// sees the counter its predecessor committed; pre/post values in the
    /// returned pair are always consistent. `None` means the event is not
    /// active (or missing).
    pub async fn reserve_tickets(
        &self,
        event_id: i64,
        requested: i64,
    ) -> Result<Option<TicketReservation>> {
        let row = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            WITH locked AS (
                SELECT tickets_sold, max_tickets FROM events
                WHERE id = $1 AND state = 'active'
                FOR UPDATE
            )
            UPDATE events e
            SET tickets_sold = CASE
                WHEN locked.max_tickets > 0
                    THEN LEAST(locked.tickets_sold + $2, locked.max_tickets)
                ELSE locked.tickets_sold + $2
            END
            FROM locked
            WHERE e.id = $1
            RETURNING locked.tickets_sold, e.tickets_sold, e.max_tickets
            "#,
        )
        .bind(event_id)
        .bind(requested)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(prev, total_sold, max_tickets)| TicketReservation {
            granted: total_sold - prev,
            total_sold,
            max_tickets,
        }))
    }

    /// Adjust one entry's weight by a delta, clamped at zero.
    pub async fn adjust_weight(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE entries
            SET weight = GREATEST(weight + $3, 0)
            WHERE event_id = $1 AND participant_id = $2
            "#,
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply a bonus delta to every open-giveaway entry the participant
    /// holds, in one statement. Returns (event_id, new_weight) per row.
    pub async fn adjust_open_giveaway_weights(
        &self,
        participant_id: ParticipantId,
        delta: i64,
    ) -> Result<Vec<(i64, i64)>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            UPDATE entries
            SET weight = GREATEST(entries.weight + $2, 0)
            FROM events
            WHERE entries.event_id = events.id
              AND entries.participant_id = $1
              AND events.kind = 'giveaway'
              AND events.state = 'active'
            RETURNING entries.event_id, entries.weight
            "#,
        )
        .bind(participant_id)
        .bind(delta)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Evict a participant from every open giveaway. Returns the affected
    /// event ids (for the out-of-band notice).
    pub async fn delete_open_giveaway_entries(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<i64>> {
        let rows = sqlx::query_scalar::<_, i64>(
            r#"
            DELETE FROM entries
            USING events
            WHERE entries.event_id = events.id
              AND entries.participant_id = $1
              AND events.kind = 'giveaway'
              AND events.state = 'active'
            RETURNING entries.event_id
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete one entry. Winner acceptance runs through here.
    pub async fn delete_entry(&self, event_id: i64, participant_id: ParticipantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE event_id = $1 AND participant_id = $2")
            .bind(event_id)
            .bind(participant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn entries_for(&self, event_id: i64) -> Result<Vec<EntryRow>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT * FROM entries WHERE event_id = $1 ORDER BY joined_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn entry_for(
        &self,
        event_id: i64,
        participant_id: ParticipantId,
    ) -> Result<Option<EntryRow>> {
        let row = sqlx::query_as::<_, EntryRow>(
            "SELECT * FROM entries WHERE event_id = $1 AND participant_id = $2",
        )
        .bind(event_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The participant's entries across all open giveaways. Feeds the
    /// entitlement-change hooks.
    pub async fn open_giveaway_entries_for(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<EntryRow>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT entries.*
            FROM entries
            JOIN events ON events.id = entries.event_id
            WHERE entries.participant_id = $1
              AND events.kind = 'giveaway'
              AND events.state = 'active'
            ORDER BY entries.event_id
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
