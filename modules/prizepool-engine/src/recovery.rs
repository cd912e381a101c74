//! Interactive surface recovery: after a restart, re-bind the handlers for
//! every event that is still open so buttons rendered before the restart
//! keep working.

use tracing::{info, warn};

use prizepool_common::Result;

use crate::traits::{EventStore, Platform};

/// Re-register the interactive handler for every active event, keyed by
/// its persisted message id. An event whose message can no longer be
/// resolved is logged and skipped — never fatal to startup.
pub async fn restore_surfaces(store: &dyn EventStore, platform: &dyn Platform) -> Result<usize> {
    let events = store.active_events().await?;
    let total = events.len();
    let mut restored = 0;

    for event in &events {
        let Some(message_id) = event.message_id else {
            warn!(
                event_id = event.id,
                "Active event has no message id; skipping"
            );
            continue;
        };
        match platform.register_handler(message_id, event.id).await {
            Ok(()) => restored += 1,
            Err(e) => {
                warn!(
                    event_id = event.id,
                    message_id,
                    error = %e,
                    "Could not restore interactive surface"
                );
            }
        }
    }

    info!(restored, total, "Interactive surface recovery complete");
    Ok(restored)
}
