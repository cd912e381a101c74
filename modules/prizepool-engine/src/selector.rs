//! Weighted winner selection without replacement.
//!
//! Entries expand into a weighted multiset (one slot per entry weight);
//! draws are uniform over the remaining slots. Accepting a winner deletes
//! the durable entry and purges every remaining slot of that participant,
//! so no participant can win twice in one pass and the remaining total
//! weight strictly decreases.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use prizepool_common::types::ParticipantId;
use prizepool_common::Result;
use prizepool_store::EntryRow;

use crate::traits::EventStore;

/// An accepted winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub participant_id: ParticipantId,
    pub display_name: String,
    /// The weight the entry held when it won.
    pub weight: i64,
}

/// Draw up to `count` distinct winners from `entries`, deleting each
/// accepted winner's entry from the store. Fewer winners than requested is
/// valid — zero entries simply yields zero winners.
pub async fn pick_winners(
    store: &dyn EventStore,
    event_id: i64,
    entries: &[EntryRow],
    count: usize,
) -> Result<Vec<Winner>> {
    let mut rng = StdRng::from_os_rng();
    pick_winners_with(store, &mut rng, event_id, entries, count).await
}

/// Selection with a caller-supplied RNG, so tests can seed it.
pub async fn pick_winners_with<R: Rng + Send>(
    store: &dyn EventStore,
    rng: &mut R,
    event_id: i64,
    entries: &[EntryRow],
    count: usize,
) -> Result<Vec<Winner>> {
    // One slot per unit of weight, pointing back at its entry.
    let mut pool: Vec<usize> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        for _ in 0..entry.weight.max(0) {
            pool.push(idx);
        }
    }

    let mut winners = Vec::new();
    while winners.len() < count && !pool.is_empty() {
        let drawn = pool[rng.random_range(0..pool.len())];
        let entry = &entries[drawn];

        // Acceptance deletes the durable entry before the slots purge, so
        // a crash mid-pass never leaves a winner still holding an entry.
        store.delete_entry(event_id, entry.participant_id).await?;
        pool.retain(|&idx| idx != drawn);

        winners.push(Winner {
            participant_id: entry.participant_id,
            display_name: entry.display_name.clone(),
            weight: entry.weight,
        });
    }

    Ok(winners)
}
