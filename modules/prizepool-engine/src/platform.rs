//! Fallback platform backend: logs every outbound surface operation
//! instead of talking to a messaging platform. Lets the daemon run (and be
//! soak-tested against a real database) before a platform binding is
//! wired in.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tracing::info;

use prizepool_common::types::{EntitlementId, ParticipantId};
use prizepool_common::Result;
use prizepool_store::EventRow;

use crate::traits::Platform;

pub struct LogPlatform {
    next_id: AtomicI64,
}

impl LogPlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }

    fn fresh_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for LogPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for LogPlatform {
    async fn post_event_message(&self, event: &EventRow) -> Result<i64> {
        let message_id = self.fresh_id();
        info!(event_id = event.id, message_id, "log-platform: post message");
        Ok(message_id)
    }

    async fn edit_event_message(
        &self,
        channel_id: i64,
        message_id: i64,
        content: &str,
    ) -> Result<()> {
        info!(channel_id, message_id, content, "log-platform: edit message");
        Ok(())
    }

    async fn disable_components(&self, channel_id: i64, message_id: i64) -> Result<()> {
        info!(channel_id, message_id, "log-platform: disable components");
        Ok(())
    }

    async fn announce(&self, channel_id: i64, reply_to: Option<i64>, content: &str) -> Result<()> {
        info!(channel_id, ?reply_to, content, "log-platform: announce");
        Ok(())
    }

    async fn create_thread(&self, channel_id: i64, message_id: i64, name: &str) -> Result<i64> {
        let thread_id = self.fresh_id();
        info!(channel_id, message_id, thread_id, name, "log-platform: create thread");
        Ok(thread_id)
    }

    async fn lock_thread(&self, thread_id: i64, name: &str) -> Result<()> {
        info!(thread_id, name, "log-platform: lock thread");
        Ok(())
    }

    async fn entitlements_of(
        &self,
        _participant_id: ParticipantId,
    ) -> Result<HashSet<EntitlementId>> {
        Ok(HashSet::new())
    }

    async fn notify_participant(&self, participant_id: ParticipantId, content: &str) -> Result<()> {
        info!(participant_id, content, "log-platform: notify participant");
        Ok(())
    }

    async fn register_handler(&self, message_id: i64, event_id: i64) -> Result<()> {
        info!(message_id, event_id, "log-platform: register handler");
        Ok(())
    }
}
