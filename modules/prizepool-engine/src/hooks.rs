//! Entitlement-change hooks: keep open-giveaway entries honest when a
//! participant's entitlements change mid-event.
//!
//! Adjustments are always deltas, never full recomputes — a recompute
//! would clobber weight history that bonuses alone don't explain. Lottery
//! tickets already purchased are never touched, and neither are closed
//! events (the store statements filter on active giveaways).

use std::sync::Arc;

use tracing::{info, warn};

use prizepool_common::types::{EntitlementId, ParticipantId};
use prizepool_common::Result;

use crate::finalize::mention;
use crate::resolver::EntitlementResolver;
use crate::traits::{EventStore, Platform};

pub struct EntitlementHooks {
    store: Arc<dyn EventStore>,
    platform: Arc<dyn Platform>,
    resolver: Arc<EntitlementResolver>,
}

impl EntitlementHooks {
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

    /// A participant gained an entitlement while possibly entered in open
    /// events.
    pub async fn entitlement_gained(
        &self,
        participant_id: ParticipantId,
        entitlement: EntitlementId,
    ) -> Result<()> {
        if self.resolver.is_blacklisted(entitlement) {
            return self
                .evict(participant_id, "you received a disqualifying role")
                .await;
        }

        if let Some(bonus) = self.resolver.giveaway_bonus_of(entitlement) {
            let updated = self
                .store
                .adjust_open_giveaway_weights(participant_id, bonus)
                .await?;
            if !updated.is_empty() {
                info!(
                    participant_id,
                    entitlement,
                    bonus,
                    events = updated.len(),
                    "Applied bonus gain to open giveaway entries"
                );
                self.notify_adjusted(participant_id, bonus, &updated).await;
            }
        }
        Ok(())
    }

    /// A participant lost an entitlement while possibly entered in open
    /// events.
    pub async fn entitlement_lost(
        &self,
        participant_id: ParticipantId,
        entitlement: EntitlementId,
    ) -> Result<()> {
        if self.resolver.is_join_requirement(entitlement) {
            return self
                .evict(participant_id, "you lost the membership it requires")
                .await;
        }

        if let Some(bonus) = self.resolver.giveaway_bonus_of(entitlement) {
            let updated = self
                .store
                .adjust_open_giveaway_weights(participant_id, -bonus)
                .await?;
            if !updated.is_empty() {
                info!(
                    participant_id,
                    entitlement,
                    bonus,
                    events = updated.len(),
                    "Applied bonus loss to open giveaway entries"
                );
                self.notify_adjusted(participant_id, -bonus, &updated).await;
            }
        }
        Ok(())
    }

    async fn evict(&self, participant_id: ParticipantId, reason: &str) -> Result<()> {
        let event_ids = self
            .store
            .delete_open_giveaway_entries(participant_id)
            .await?;
        if event_ids.is_empty() {
            return Ok(());
        }

        info!(
            participant_id,
            events = event_ids.len(),
            "Evicted participant from open giveaways"
        );
        let listed = event_ids
            .iter()
            .map(|id| format!("#{id}"))
            .collect::<Vec<_>>()
            .join(", ");
        let notice = format!(
            "{}, you were removed from giveaway(s) {listed} because {reason}. \
             Contact the staff team if you believe this is a mistake.",
            mention(participant_id)
        );
        if let Err(e) = self.platform.notify_participant(participant_id, &notice).await {
            warn!(participant_id, error = %e, "Failed to send eviction notice");
        }
        Ok(())
    }

    async fn notify_adjusted(
        &self,
        participant_id: ParticipantId,
        delta: i64,
        updated: &[(i64, i64)],
    ) {
        let lines = updated
            .iter()
            .map(|(event_id, weight)| format!("giveaway #{event_id}: now {weight} entries"))
            .collect::<Vec<_>>()
            .join("\n");
        let verb = if delta >= 0 { "gained" } else { "lost" };
        let notice = format!(
            "Your giveaway entries changed because you {verb} a bonus role:\n{lines}"
        );
        if let Err(e) = self.platform.notify_participant(participant_id, &notice).await {
            warn!(participant_id, error = %e, "Failed to send adjustment notice");
        }
    }
}
