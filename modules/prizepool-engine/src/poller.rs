//! The completion poller: a fixed-interval loop that finds due events,
//! atomically claims them, and drives selection and announcement.
//!
//! State machine per event: ACTIVE → (due) → claimed durably as ENDED →
//! finalized. The durable flip happens before selection, so a crash in
//! between leaves an `ended` event with entries intact — the reroll path
//! recovers those.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use prizepool_common::Result;

use crate::finalize::finalize_event;
use crate::traits::{EventStore, Platform};

/// What one tick did.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickStats {
    pub purged: u64,
    pub claimed: usize,
    pub finalized: usize,
    pub failed: usize,
}

impl std::fmt::Display for TickStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "purged={} claimed={} finalized={} failed={}",
            self.purged, self.claimed, self.finalized, self.failed
        )
    }
}

pub struct CompletionPoller {
    store: Arc<dyn EventStore>,
    platform: Arc<dyn Platform>,
    poll_interval: Duration,
    retention: chrono::Duration,
    /// Re-entrancy guard for events currently being finalized by this
    /// process. Best-effort and in-memory only — the durable claim in
    /// `claim_due` is the real mutual exclusion.
    in_flight: Mutex<HashSet<i64>>,
}

impl CompletionPoller {
    pub fn new(
        store: Arc<dyn EventStore>,
        platform: Arc<dyn Platform>,
        poll_interval: Duration,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            platform,
            poll_interval,
            retention: chrono::Duration::days(retention_days),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// One poller pass: purge old finished events, claim everything due,
    /// finalize each claimed event. A failure on one event never blocks
    /// the rest of the tick.
    pub async fn tick(&self) -> Result<TickStats> {
        let mut stats = TickStats::default();
        let now = Utc::now();

        match self.store.purge_finished_before(now - self.retention).await {
            Ok(purged) => stats.purged = purged,
            Err(e) => warn!(error = %e, "Failed to purge old events"),
        }

        let due = self.store.claim_due(now).await?;
        stats.claimed = due.len();

        for event in &due {
            if !self.in_flight.lock().unwrap().insert(event.id) {
                // Already finalizing in this process; the claim stays
                // durable, nothing to redo here.
                continue;
            }

            let result = finalize_event(self.store.as_ref(), self.platform.as_ref(), event).await;
            self.in_flight.lock().unwrap().remove(&event.id);

            match result {
                Ok(_) => stats.finalized += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(event_id = event.id, error = %e, "Failed to finalize event");
                }
            }
        }

        Ok(stats)
    }

    /// Run forever on the fixed interval. Nothing is permitted to
    /// terminate this loop; tick failures are logged and retried next
    /// interval. Cancel the task to stop it.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Completion poller started"
        );
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match self.tick().await {
                Ok(stats) if stats.claimed > 0 || stats.purged > 0 => {
                    info!(%stats, "Poller tick complete");
                }
                Ok(_) => debug!("Poller tick: nothing due"),
                Err(e) => error!(error = %e, "Poller tick failed"),
            }
        }
    }
}
