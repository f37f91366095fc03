//! Placement scenarios against the in-memory organization
//!
//! Each test tells one story of an operator managing where an account lives:
//!
//! - moving an account into a unit and back out again
//! - an account vanishing or being suspended behind our back
//! - several placements racing for the move lock
//! - a control plane that never shows a move, and shutting down through it

use std::sync::Arc;
use std::time::Duration;

use orgmove_common::{
    AccountStatus, InMemoryOrganization, PlacementError, PlacementKey, PollConfig,
    ReconcilerConfig, TraversalPolicy,
};
use orgmove_placement::{DesiredPlacement, PlacementState, Reconciler};

const DEV: &str = "111111111111";
const OPS: &str = "333333333333";

fn organization(lag: u32) -> Arc<InMemoryOrganization> {
    let org = InMemoryOrganization::new("r-root", "Root")
        .with_page_size(2)
        .with_move_lag(lag);
    org.add_unit("ou-root-aaa", "Sandbox", "r-root")
        .add_unit("ou-root-bbb", "Workloads", "r-root")
        .add_unit("ou-root-ccc", "Quarantine", "r-root")
        .add_unit("ou-bbb-prod", "Prod", "ou-root-bbb")
        .add_account("100000000001", "filler-one", "ou-root-bbb")
        .add_account("100000000002", "filler-two", "ou-root-bbb")
        .add_account(DEV, "dev", "ou-root-aaa")
        .add_account(OPS, "ops", "ou-root-aaa");
    Arc::new(org)
}

fn fast(max_attempts: u32) -> ReconcilerConfig {
    ReconcilerConfig {
        poll: PollConfig::with_max_attempts(max_attempts).interval(Duration::from_millis(1)),
        traversal: TraversalPolicy::Strict,
    }
}

fn unbounded() -> ReconcilerConfig {
    fast(0)
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn story_place_account_then_move_again_then_revert() {
    let org = organization(3);
    let rec = Reconciler::new(org.clone(), unbounded());

    // Sandbox → Workloads. Workloads already holds two accounts, so with a
    // page size of two the new member only ever shows up on page two.
    let state = rec
        .create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
        .await
        .unwrap();
    assert_eq!(state.id, "111111111111/ou-root-aaa/ou-root-bbb");

    let (unit_id, unit_name) = rec.resolve(DEV).await.unwrap();
    assert_eq!(unit_id, "ou-root-bbb");
    assert_eq!(unit_name, "Workloads");

    // Retarget to Quarantine: the move starts from where the account is now
    let state = rec
        .update(&state, &DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-ccc"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.id, "111111111111/ou-root-aaa/ou-root-ccc");
    assert_eq!(rec.resolve(DEV).await.unwrap().0, "ou-root-ccc");

    // Dropping the declaration puts the account back in Sandbox
    rec.delete(&state).await.unwrap();
    assert_eq!(rec.resolve(DEV).await.unwrap().0, "ou-root-aaa");

    let moves: Vec<(String, String)> = org
        .move_log()
        .into_iter()
        .map(|m| (m.request.source_parent_id, m.request.destination_parent_id))
        .collect();
    assert_eq!(
        moves,
        vec![
            ("ou-root-aaa".to_string(), "ou-root-bbb".to_string()),
            ("ou-root-bbb".to_string(), "ou-root-ccc".to_string()),
            ("ou-root-ccc".to_string(), "ou-root-aaa".to_string()),
        ]
    );
}

#[tokio::test]
async fn story_import_existing_placement() {
    let org = organization(0);
    let rec = Reconciler::new(org.clone(), unbounded());

    let state = rec.import("111111111111/ou-root-aaa/ou-root-bbb").await.unwrap();
    assert_eq!(
        state,
        PlacementState::from_key(&PlacementKey::new(DEV, "ou-root-aaa", "ou-root-bbb"))
    );
    // Import reads, it never moves
    assert!(org.move_log().is_empty());
}

// =========================================================================
// Drift
// =========================================================================

#[tokio::test]
async fn story_suspended_account_drops_out_of_state() {
    let org = organization(0);
    let rec = Reconciler::new(org.clone(), unbounded());
    let state = rec
        .create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
        .await
        .unwrap();

    org.set_account_status(DEV, AccountStatus::Suspended);
    assert_eq!(rec.read(&state, false).await.unwrap(), None);

    // A fresh record is different: the caller has to hear about it
    let err = rec.read(&state, true).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn story_delete_refuses_when_account_wandered_off() {
    let org = organization(0);
    let rec = Reconciler::new(org.clone(), fast(3));
    let state = rec
        .create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
        .await
        .unwrap();

    // Someone moved it to Prod by hand
    let other = Reconciler::new(org.clone(), fast(3));
    other
        .create(&DesiredPlacement::new(DEV, "ou-root-bbb", "ou-bbb-prod"))
        .await
        .unwrap();

    let err = rec.delete(&state).await.unwrap_err();
    assert!(err
        .to_string()
        .starts_with("account 111111111111 not in correct ou, ou-root-bbb"));

    // Nothing was moved back
    assert_eq!(org.move_log().len(), 2);
    assert_eq!(org.parent_of(DEV).as_deref(), Some("ou-bbb-prod"));
}

// =========================================================================
// Serialization of moves
// =========================================================================

#[tokio::test]
async fn story_concurrent_placements_never_overlap() {
    let org = organization(4);
    let rec = Reconciler::new(org.clone(), unbounded());

    let a = rec.clone();
    let b = rec.clone();
    let (first, second) = tokio::join!(
        async move {
            a.create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
                .await
        },
        async move {
            b.create(&DesiredPlacement::new(OPS, "ou-root-aaa", "ou-root-ccc"))
                .await
        },
    );
    first.unwrap();
    second.unwrap();

    let mut log = org.move_log();
    assert_eq!(log.len(), 2);
    log.sort_by_key(|m| m.issued_at);

    // The second move is only issued after the first was seen in its target
    let observed = log[0].observed_at.expect("first move confirmed");
    assert!(observed <= log[1].issued_at);
    assert!(log[1].observed_at.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn story_create_update_delete_race_without_overlap() {
    const NEW: &str = "555555555555";

    let org = organization(3);
    org.add_account(NEW, "new", "ou-root-aaa");
    let rec = Reconciler::new(org.clone(), unbounded());

    let dev = rec
        .create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
        .await
        .unwrap();
    let ops = rec
        .create(&DesiredPlacement::new(OPS, "ou-root-aaa", "ou-root-bbb"))
        .await
        .unwrap();

    let deleting = {
        let rec = rec.clone();
        tokio::spawn(async move { rec.delete(&dev).await })
    };
    let updating = {
        let rec = rec.clone();
        tokio::spawn(async move {
            rec.update(&ops, &DesiredPlacement::new(OPS, "ou-root-aaa", "ou-root-ccc"))
                .await
        })
    };
    let creating = {
        let rec = rec.clone();
        tokio::spawn(async move {
            rec.create(&DesiredPlacement::new(NEW, "ou-root-aaa", "ou-root-ccc"))
                .await
        })
    };

    deleting.await.unwrap().unwrap();
    updating.await.unwrap().unwrap().unwrap();
    creating.await.unwrap().unwrap();

    assert_eq!(org.parent_of(DEV).as_deref(), Some("ou-root-aaa"));
    assert_eq!(org.parent_of(OPS).as_deref(), Some("ou-root-ccc"));
    assert_eq!(org.parent_of(NEW).as_deref(), Some("ou-root-ccc"));

    let mut log = org.move_log();
    assert_eq!(log.len(), 5);
    log.sort_by_key(|m| m.issued_at);

    // Every move was seen in its target before the next one was issued
    for pair in log.windows(2) {
        let observed = pair[0].observed_at.expect("move confirmed");
        assert!(
            observed <= pair[1].issued_at,
            "{} overlapped {}",
            pair[0].request,
            pair[1].request
        );
    }
    assert!(log[4].observed_at.is_some());
}

#[tokio::test]
async fn story_stuck_move_blocks_others_until_shutdown() {
    let org = organization(u32::MAX);
    let rec = Reconciler::new(org.clone(), unbounded());

    let stuck = {
        let rec = rec.clone();
        tokio::spawn(async move {
            rec.create(&DesiredPlacement::new(DEV, "ou-root-aaa", "ou-root-bbb"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // An unrelated placement cannot get its move in
    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        rec.create(&DesiredPlacement::new(OPS, "ou-root-aaa", "ou-root-ccc")),
    )
    .await;
    assert!(blocked.is_err());
    assert_eq!(org.move_log().len(), 1);

    rec.shutdown();
    let err = stuck.await.unwrap().unwrap_err();
    assert!(matches!(err, PlacementError::Cancelled));
}

// =========================================================================
// Resolution
// =========================================================================

#[tokio::test]
async fn story_resolve_through_broken_subtree() {
    let org = organization(0);
    org.add_unit("ou-aaa-team", "Team", "ou-root-aaa")
        .add_unit("ou-team-deep", "Deep", "ou-aaa-team")
        .add_account("444444444444", "deep", "ou-team-deep");
    org.fail_unit_listing("ou-bbb-prod");

    let strict = Reconciler::new(org.clone(), unbounded());
    assert!(strict.resolve("444444444444").await.is_err());

    let lenient = Reconciler::new(
        org.clone(),
        ReconcilerConfig {
            traversal: TraversalPolicy::Lenient,
            ..unbounded()
        },
    );
    let (unit_id, unit_name) = lenient.resolve("444444444444").await.unwrap();
    assert_eq!(unit_id, "ou-team-deep");
    assert_eq!(unit_name, "Deep");
}
