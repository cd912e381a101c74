//! The entry ledger: giveaway join/leave toggling and lottery ticket
//! accumulation.
//!
//! The two models are deliberately asymmetric. Giveaway joins toggle (a
//! second press leaves); lottery purchases only ever accumulate. Both are
//! expressed through single atomic store statements.

use std::sync::Arc;

use tracing::info;

use prizepool_common::types::{EventKind, EventState, ParticipantId};
use prizepool_common::{PrizepoolError, Result};
use prizepool_store::EventRow;

use crate::resolver::EntitlementResolver;
use crate::traits::{EventStore, Platform};

/// Result of a giveaway join toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Entered with this resolved weight.
    Joined { weight: i64 },
    /// Was entered; the toggle removed the entry.
    Left,
}

/// Result of a lottery ticket purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseOutcome {
    /// Tickets recorded by this purchase (post-cap).
    pub tickets_granted: i64,
    /// The participant's ticket total after the purchase (incl. bonus).
    pub total_tickets: i64,
    /// Entitlement bonus tickets applied (first purchase only).
    pub bonus_applied: i64,
    /// Amount to refund manually: whole tickets that did not fit the cap.
    pub refund_due: i64,
    /// Sub-price remainder of the paid amount. Not convertible into a
    /// ticket and not flagged for refund.
    pub remainder: i64,
    /// The cap was already reached before this purchase.
    pub sold_out: bool,
}

pub struct Ledger {
    store: Arc<dyn EventStore>,
    platform: Arc<dyn Platform>,
    resolver: Arc<EntitlementResolver>,
}

impl Ledger {
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

    /// Giveaway join toggle, addressed by the interactive message id.
    pub async fn join_by_message(
        &self,
        message_id: i64,
        participant_id: ParticipantId,
        display_name: &str,
    ) -> Result<JoinOutcome> {
        let event = self
            .store
            .event_by_message(message_id)
            .await?
            .ok_or_else(|| PrizepoolError::NotFound(format!("message {message_id}")))?;
        self.join(&event, participant_id, display_name).await
    }

    /// Giveaway join toggle: first call enters with the resolved weight,
    /// second call leaves.
    pub async fn join(
        &self,
        event: &EventRow,
        participant_id: ParticipantId,
        display_name: &str,
    ) -> Result<JoinOutcome> {
        require_open(event, EventKind::Giveaway)?;

        let held = self.platform.entitlements_of(participant_id).await?;
        self.resolver.check_join(&held)?;
        let weight = self.resolver.weight(EventKind::Giveaway, &held);

        // The statement re-checks the event state, so a stale `active`
        // row in hand cannot slip an entry into a claimed event.
        let joined = self
            .store
            .toggle_entry(event.id, participant_id, display_name, weight)
            .await?
            .ok_or(PrizepoolError::AlreadyFinalized)?;

        if joined {
            info!(event_id = event.id, participant_id, weight, "Joined giveaway");
            Ok(JoinOutcome::Joined { weight })
        } else {
            info!(event_id = event.id, participant_id, "Left giveaway");
            Ok(JoinOutcome::Left)
        }
    }

    /// Lottery ticket purchase for a paid amount.
    ///
    /// Tickets = amount / ticket_price; granted tickets respect the
    /// event-level cap; the entitlement bonus applies once, on the first
    /// purchase only.
    pub async fn purchase(
        &self,
        event: &EventRow,
        participant_id: ParticipantId,
        display_name: &str,
        amount: i64,
    ) -> Result<PurchaseOutcome> {
        require_open(event, EventKind::Lottery)?;
        if amount <= 0 {
            return Err(PrizepoolError::Validation(
                "Purchase amount must be positive".to_string(),
            ));
        }
        if event.ticket_price <= 0 {
            return Err(PrizepoolError::Validation(
                "This lottery has no ticket price set".to_string(),
            ));
        }

        let held = self.platform.entitlements_of(participant_id).await?;
        self.resolver.check_join(&held)?;

        let tickets = amount / event.ticket_price;
        let remainder = amount % event.ticket_price;
        if tickets == 0 {
            return Ok(PurchaseOutcome {
                tickets_granted: 0,
                total_tickets: self.current_tickets(event.id, participant_id).await?,
                bonus_applied: 0,
                refund_due: 0,
                remainder,
                sold_out: false,
            });
        }

        let reservation = self
            .store
            .reserve_tickets(event.id, tickets)
            .await?
            .ok_or(PrizepoolError::AlreadyFinalized)?;

        let granted = reservation.granted;
        let refund_due = (tickets - granted) * event.ticket_price;

        if granted == 0 {
            info!(
                event_id = event.id,
                participant_id, refund_due, "Lottery sold out, purchase refunded"
            );
            return Ok(PurchaseOutcome {
                tickets_granted: 0,
                total_tickets: self.current_tickets(event.id, participant_id).await?,
                bonus_applied: 0,
                refund_due,
                remainder,
                sold_out: true,
            });
        }

        let bonus = self.resolver.bonus(EventKind::Lottery, &held);
        let (total, first_purchase) = self
            .store
            .add_tickets(event.id, participant_id, display_name, granted, bonus)
            .await?;

        info!(
            event_id = event.id,
            participant_id,
            granted,
            total,
            refund_due,
            "Recorded lottery ticket purchase"
        );

        Ok(PurchaseOutcome {
            tickets_granted: granted,
            total_tickets: total,
            bonus_applied: if first_purchase { bonus } else { 0 },
            refund_due,
            remainder,
            sold_out: false,
        })
    }

    async fn current_tickets(&self, event_id: i64, participant_id: ParticipantId) -> Result<i64> {
        Ok(self
            .store
            .entry_for(event_id, participant_id)
            .await?
            .map(|e| e.weight)
            .unwrap_or(0))
    }
}

/// The event must be open and of the expected kind.
fn require_open(event: &EventRow, kind: EventKind) -> Result<()> {
    if event.kind() != kind {
        return Err(PrizepoolError::Validation(format!(
            "Event {} is a {}, not a {kind}",
            event.id,
            event.kind()
        )));
    }
    if event.state() != EventState::Active {
        return Err(PrizepoolError::AlreadyFinalized);
    }
    Ok(())
}
