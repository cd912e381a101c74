//! The shared finalize path: selection plus the surface updates that make
//! an ended event look ended. Used by the completion poller and by manual
//! /end — both arrive here only after winning the atomic claim.
//!
//! Platform failures are logged and swallowed: the durable claim already
//! committed, the surface merely lags.

use tracing::{info, warn};

use prizepool_common::types::EventKind;
use prizepool_common::Result;
use prizepool_store::EventRow;

use crate::selector::{pick_winners, Winner};
use crate::traits::{EventStore, Platform};

/// What the announcement is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ended,
    Rerolled,
}

/// Select winners for a claimed event and update the messaging surface.
/// The caller must already hold the claim (the durable `ended` flip).
pub async fn finalize_event(
    store: &dyn EventStore,
    platform: &dyn Platform,
    event: &EventRow,
) -> Result<Vec<Winner>> {
    let entries = store.entries_for(event.id).await?;
    let winners = pick_winners(store, event.id, &entries, event.max_winners.max(1) as usize).await?;

    announce_outcome(platform, event, &winners, Outcome::Ended).await;

    if winners.is_empty() {
        info!(event_id = event.id, "Event ended with no entries");
    } else {
        info!(
            event_id = event.id,
            winners = winners.len(),
            "Event finalized"
        );
    }
    Ok(winners)
}

/// Surface updates for a finalize or reroll. Never fails the caller.
pub async fn announce_outcome(
    platform: &dyn Platform,
    event: &EventRow,
    winners: &[Winner],
    outcome: Outcome,
) {
    let Some(message_id) = event.message_id else {
        warn!(event_id = event.id, "Event has no message to update");
        return;
    };

    if outcome == Outcome::Ended {
        if let Err(e) = platform.disable_components(event.channel_id, message_id).await {
            warn!(event_id = event.id, error = %e, "Failed to disable event components");
        }
        let body = ended_message(event, winners);
        if let Err(e) = platform
            .edit_event_message(event.channel_id, message_id, &body)
            .await
        {
            warn!(event_id = event.id, error = %e, "Failed to edit event message");
        }
    }

    let announcement = announcement_text(event, winners, outcome);
    if let Err(e) = platform
        .announce(event.channel_id, Some(message_id), &announcement)
        .await
    {
        warn!(event_id = event.id, error = %e, "Failed to send announcement");
    }

    if outcome == Outcome::Ended {
        if let Some(thread_id) = event.thread_id {
            let name = locked_thread_name(event);
            if let Err(e) = platform.lock_thread(thread_id, &name).await {
                warn!(event_id = event.id, thread_id, error = %e, "Failed to lock event thread");
            }
        }
    }
}

pub fn mention(participant_id: i64) -> String {
    format!("<@{participant_id}>")
}

/// One line listing the winners, or the no-entries message.
pub fn winners_line(winners: &[Winner]) -> String {
    if winners.is_empty() {
        return "No one entered".to_string();
    }
    winners
        .iter()
        .map(|w| mention(w.participant_id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ended_message(event: &EventRow, winners: &[Winner]) -> String {
    format!(
        "{} — Ended\nPrize: {}\nWinners: {}",
        event.kind().to_string().to_uppercase(),
        event.prize,
        winners_line(winners)
    )
}

fn announcement_text(event: &EventRow, winners: &[Winner], outcome: Outcome) -> String {
    let host = mention(event.host_id);
    match (outcome, winners.is_empty()) {
        (Outcome::Ended, true) => {
            format!("{host}, unfortunately no one entered your event.")
        }
        (Outcome::Ended, false) => format!(
            "Congratulations {} for winning {host}'s {} of {}!",
            winners_line(winners),
            event.kind(),
            event.prize
        ),
        (Outcome::Rerolled, true) => "Reroll found no remaining entries.".to_string(),
        (Outcome::Rerolled, false) => format!(
            "Rerolled! Congratulations {} — you won {}!",
            winners_line(winners),
            event.prize
        ),
    }
}

fn locked_thread_name(event: &EventRow) -> String {
    match event.kind() {
        EventKind::Giveaway => format!("🔒 ID #{} | {} GA", event.id, event.host_name),
        EventKind::Lottery => format!("🔒 ID #{} | Lottery", event.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winners_line_formats() {
        assert_eq!(winners_line(&[]), "No one entered");
        let winners = vec![
            Winner {
                participant_id: 1,
                display_name: "a".into(),
                weight: 1,
            },
            Winner {
                participant_id: 2,
                display_name: "b".into(),
                weight: 3,
            },
        ];
        assert_eq!(winners_line(&winners), "<@1>, <@2>");
    }
}
