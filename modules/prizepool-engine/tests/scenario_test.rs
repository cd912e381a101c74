//! End-to-end lifecycle scenarios: create, enter, poll, finalize, recover.
//! Everything runs against the in-memory doubles.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use prizepool_common::policy::EntitlementPolicy;
use prizepool_common::types::{EventKind, EventState};
use prizepool_common::PrizepoolError;
use prizepool_engine::testing::{MemoryStore, MockPlatform};
use prizepool_engine::{
    CompletionPoller, CreateEvent, EntitlementResolver, EventAdmin, EventRef, EventStore,
    JoinOutcome, Ledger, restore_surfaces,
};

struct World {
    store: Arc<MemoryStore>,
    platform: Arc<MockPlatform>,
    admin: EventAdmin,
    ledger: Ledger,
    poller: CompletionPoller,
}

fn world_with(platform: MockPlatform, policy: EntitlementPolicy) -> World {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(platform);
    let resolver = Arc::new(EntitlementResolver::new(policy));
    World {
        admin: EventAdmin::new(store.clone(), platform.clone(), resolver.clone()),
        ledger: Ledger::new(store.clone(), platform.clone(), resolver),
        poller: CompletionPoller::new(
            store.clone(),
            platform.clone(),
            StdDuration::from_secs(60),
            7,
        ),
        store,
        platform,
    }
}

fn world() -> World {
    world_with(MockPlatform::new(), EntitlementPolicy::default())
}

fn giveaway_params(duration: Duration) -> CreateEvent {
    CreateEvent {
        kind: EventKind::Giveaway,
        prize: "Gift card".to_string(),
        host_id: 1,
        host_name: "host".to_string(),
        channel_id: 10,
        duration,
        max_winners: 1,
        ticket_price: 0,
        max_tickets: 0,
        image_url: None,
    }
}

fn lottery_params(duration: Duration, ticket_price: i64, max_tickets: i64) -> CreateEvent {
    CreateEvent {
        kind: EventKind::Lottery,
        prize: "The pot".to_string(),
        host_id: 1,
        host_name: "host".to_string(),
        channel_id: 10,
        duration,
        max_winners: 1,
        ticket_price,
        max_tickets,
        image_url: None,
    }
}

// ---------------------------------------------------------------------------
// Full lifecycle
// ---------------------------------------------------------------------------

/// Shortest duration create() accepts; pair with [`let_elapse`].
fn blink() -> Duration {
    Duration::milliseconds(5)
}

async fn let_elapse() {
    tokio::time::sleep(StdDuration::from_millis(50)).await;
}

#[tokio::test]
async fn giveaway_runs_from_creation_to_announced_winner() {
    let w = world();

    let event = w.admin.create(giveaway_params(blink())).await.unwrap();
    let message_id = event.message_id.unwrap();
    assert!(event.thread_id.is_some());

    w.ledger
        .join_by_message(message_id, 42, "alice")
        .await
        .unwrap();

    let_elapse().await;
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.claimed, 1);
    assert_eq!(stats.finalized, 1);
    assert_eq!(stats.failed, 0);

    // Durable state: ended, winner's entry consumed.
    let stored = w.store.event_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), EventState::Ended);
    assert!(w.store.entry_for(event.id, 42).await.unwrap().is_none());

    // Surface: components off, message edited, winner announced, thread
    // locked.
    assert_eq!(w.platform.disabled_messages(), vec![message_id]);
    assert_eq!(w.platform.edits().len(), 1);
    let announcements = w.platform.announcements();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].1.contains("<@42>"));
    assert_eq!(w.platform.locked_threads().len(), 1);

    // The next tick has nothing left to do.
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.claimed, 0);
}

#[tokio::test]
async fn lottery_winner_comes_from_ticket_holders() {
    let w = world();

    let event = w.admin.create(lottery_params(blink(), 100, 0)).await.unwrap();
    w.ledger.purchase(&event, 42, "alice", 300).await.unwrap();
    w.ledger.purchase(&event, 43, "bob", 100).await.unwrap();

    let_elapse().await;
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.finalized, 1);

    let announcements = w.platform.announcements();
    assert_eq!(announcements.len(), 1);
    assert!(
        announcements[0].1.contains("<@42>") || announcements[0].1.contains("<@43>"),
        "announcement names no ticket holder: {}",
        announcements[0].1
    );
}

#[tokio::test]
async fn ending_with_no_entries_still_announces() {
    let w = world();
    w.admin.create(giveaway_params(blink())).await.unwrap();

    let_elapse().await;
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.finalized, 1);

    let announcements = w.platform.announcements();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].1.contains("no one entered"));
}

#[tokio::test]
async fn one_failing_finalize_does_not_sink_the_tick() {
    let w = world();
    let broken = w.admin.create(giveaway_params(blink())).await.unwrap();
    let healthy = w.admin.create(giveaway_params(blink())).await.unwrap();
    w.store.toggle_entry(healthy.id, 42, "alice", 1).await.unwrap();
    w.store.break_entries_for(broken.id);

    let_elapse().await;
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.claimed, 2);
    assert_eq!(stats.finalized, 1);
    assert_eq!(stats.failed, 1);

    // The healthy event still got its winner announced.
    let announcements = w.platform.announcements();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].1.contains("<@42>"));

    // The broken one stays ended with its entries intact, ready for a
    // manual reroll once the fault clears.
    let stored = w.store.event_by_id(broken.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), EventState::Ended);
}

// ---------------------------------------------------------------------------
// Manual admin paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_end_races_cleanly_with_itself() {
    let w = world();
    let event = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();

    w.admin.end(EventRef::Id(event.id)).await.unwrap();
    let err = w.admin.end(EventRef::Id(event.id)).await.unwrap_err();
    assert!(matches!(err, PrizepoolError::AlreadyFinalized));

    // Exactly one announcement despite two attempts.
    assert_eq!(w.platform.announcements().len(), 1);
}

#[tokio::test]
async fn cancel_selects_no_winner() {
    let w = world();
    let event = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    w.ledger
        .join_by_message(event.message_id.unwrap(), 42, "alice")
        .await
        .unwrap();

    w.admin.cancel(EventRef::Id(event.id)).await.unwrap();

    let stored = w.store.event_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), EventState::Cancelled);
    // No selection ran; the entry is still there for the audit trail.
    assert!(w.store.entry_for(event.id, 42).await.unwrap().is_some());
    assert!(w.platform.announcements().is_empty());
    assert_eq!(w.platform.edits().len(), 1);
    assert!(w.platform.edits()[0].1.contains("Cancelled"));

    // A due cancelled event is never re-claimed by the poller.
    let stats = w.poller.tick().await.unwrap();
    assert_eq!(stats.claimed, 0);
}

#[tokio::test]
async fn reroll_draws_from_entries_left_behind() {
    let w = world();
    let event = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    w.store.toggle_entry(event.id, 42, "alice", 1).await.unwrap();
    w.store.toggle_entry(event.id, 43, "bob", 1).await.unwrap();

    // Simulate a crash between the claim and selection: the event is
    // ended but both entries survive.
    w.store.claim(event.id, EventState::Ended).await.unwrap();

    let winners = w.admin.reroll(EventRef::Id(event.id), 1).await.unwrap();
    assert_eq!(winners.len(), 1);

    let announcements = w.platform.announcements();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].1.contains("Rerolled"));

    // The reroll consumed the winning entry; one remains for the next one.
    assert_eq!(w.store.entry_count(), 1);
}

#[tokio::test]
async fn reroll_refuses_running_and_cancelled_events() {
    let w = world();
    let running = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    assert!(matches!(
        w.admin.reroll(EventRef::Id(running.id), 1).await.unwrap_err(),
        PrizepoolError::Validation(_)
    ));

    w.admin.cancel(EventRef::Id(running.id)).await.unwrap();
    assert!(matches!(
        w.admin.reroll(EventRef::Id(running.id), 1).await.unwrap_err(),
        PrizepoolError::Validation(_)
    ));
}

#[tokio::test]
async fn admin_paths_resolve_by_message_reference() {
    let w = world();
    let event = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    let message_id = event.message_id.unwrap();

    w.admin.end(EventRef::Message(message_id)).await.unwrap();
    let err = w.admin.end(EventRef::Message(999_999)).await.unwrap_err();
    assert!(matches!(err, PrizepoolError::NotFound(_)));
}

#[tokio::test]
async fn remove_participant_only_while_running() {
    let w = world();
    let event = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    w.store.toggle_entry(event.id, 42, "alice", 1).await.unwrap();

    assert!(w
        .admin
        .remove_participant(EventRef::Id(event.id), 42)
        .await
        .unwrap());
    assert!(w.store.entry_for(event.id, 42).await.unwrap().is_none());

    w.admin.end(EventRef::Id(event.id)).await.unwrap();
    let err = w
        .admin
        .remove_participant(EventRef::Id(event.id), 42)
        .await
        .unwrap_err();
    assert!(matches!(err, PrizepoolError::AlreadyFinalized));
}

#[tokio::test]
async fn hosting_gate_blocks_unentitled_hosts() {
    let policy = EntitlementPolicy {
        hosts: vec![500],
        ..Default::default()
    };
    let w = world_with(MockPlatform::new().with_entitlements(2, [500]), policy);

    // Host 1 holds nothing.
    let err = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap_err();
    assert!(matches!(err, PrizepoolError::Validation(_)));

    let mut create_params = giveaway_params(Duration::hours(1));
    create_params.host_id = 2;
    assert!(w.admin.create(create_params).await.is_ok());
}

// ---------------------------------------------------------------------------
// Restart recovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recovery_rebinds_live_surfaces_and_skips_dead_ones() {
    let w = world();
    let alive = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    let dead = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    let done = w.admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    w.admin.end(EventRef::Id(done.id)).await.unwrap();

    // "Restart": fresh platform with the same store; one message is gone.
    let platform = MockPlatform::new().with_unresolvable_message(dead.message_id.unwrap());
    let restored = restore_surfaces(w.store.as_ref(), &platform).await.unwrap();

    assert_eq!(restored, 1);
    assert_eq!(
        platform.handlers(),
        vec![(alive.message_id.unwrap(), alive.id)]
    );

    // The restored surface is live: a join through it works.
    let resolver = Arc::new(EntitlementResolver::new(EntitlementPolicy::default()));
    let ledger = Ledger::new(w.store.clone(), Arc::new(platform), resolver);
    assert_eq!(
        ledger
            .join_by_message(alive.message_id.unwrap(), 42, "alice")
            .await
            .unwrap(),
        JoinOutcome::Joined { weight: 1 }
    );
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poller_purges_events_past_retention() {
    let store = Arc::new(MemoryStore::new());
    let platform = Arc::new(MockPlatform::new());
    // Zero-day retention: anything finished before this tick goes.
    let poller = CompletionPoller::new(
        store.clone(),
        platform.clone(),
        StdDuration::from_secs(60),
        0,
    );

    let resolver = Arc::new(EntitlementResolver::new(EntitlementPolicy::default()));
    let admin = EventAdmin::new(store.clone(), platform, resolver);
    let event = admin.create(giveaway_params(Duration::hours(1))).await.unwrap();
    admin.end(EventRef::Id(event.id)).await.unwrap();

    let stats = poller.tick().await.unwrap();
    assert_eq!(stats.purged, 1);
    assert!(store.event_by_id(event.id).await.unwrap().is_none());
}
