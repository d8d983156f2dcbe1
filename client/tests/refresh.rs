mod common;

use common::{eventually, within, Harness, SOL};
use fixed_term_client::mirror::InMemoryMirror;
use fixed_term_client::refresh::{RefreshTrigger, RefreshWorker, Source};
use fixed_term_client::MirrorStore;
use fixed_term_staking::constants::PLAN_A_DURATION;
use fixed_term_staking::state::PositionStatus;

#[tokio::test]
async fn test_triggers_during_refresh_coalesce_into_one_follow_up() {
    let h = Harness::new().await;
    h.mirror.hold_reads();

    let worker = RefreshWorker::spawn(h.chain.clone(), h.mirror.clone(), h.user, 10);
    let handle = worker.handle();
    let snapshots = worker.snapshots();

    handle.request(RefreshTrigger::Manual);
    eventually(|| h.mirror.position_reads() == 1).await;

    for _ in 0..5 {
        handle.request(RefreshTrigger::Mutation);
    }
    h.mirror.release_reads();

    eventually(|| handle.completed() == 2).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(handle.requested(), 6);
    assert_eq!(handle.completed(), 2);
    assert_eq!(h.mirror.position_reads(), 2);
    assert_eq!(snapshots.borrow().generation, 2);
}

#[tokio::test]
async fn test_mirror_changes_trigger_refresh() {
    let h = Harness::new().await;
    let mut worker = RefreshWorker::spawn(h.chain.clone(), h.mirror.clone(), h.user, 10);
    worker.follow_mirror(h.mirror.as_ref(), &h.user).await.unwrap();
    let mut snapshots = worker.snapshots();

    let session = h.connect().await;
    session.stake(0, SOL).await.unwrap();

    within(async {
        loop {
            snapshots.changed().await.unwrap();
            if snapshots.borrow_and_update().positions.len() == 1 {
                break;
            }
        }
    })
    .await;
    assert!(worker.handle().requested() >= 1);
}

#[tokio::test]
async fn test_dashboard_falls_back_when_server_functions_fail() {
    let h = Harness::with_mirror(InMemoryMirror::without_server_functions()).await;
    let session = h.connect().await;
    let mut snapshots = session.snapshots();

    session.stake(0, SOL).await.unwrap();
    session.stake(1, 2 * SOL).await.unwrap();
    h.sim.advance_time(PLAN_A_DURATION).await;
    session.request_refresh();

    let snapshot = within(async {
        loop {
            snapshots.changed().await.unwrap();
            let snapshot = snapshots.borrow_and_update().clone();
            let promoted = snapshot
                .positions
                .iter()
                .any(|p| p.status == PositionStatus::Matured);
            if snapshot.positions.len() == 2 && promoted {
                break snapshot;
            }
        }
    })
    .await;

    assert_eq!(snapshot.stats_source, Source::Local);
    assert_eq!(snapshot.maturities_source, Source::Local);
    assert_eq!(snapshot.stats.total_staked, 2 * SOL);
    assert_eq!(snapshot.stats.total_returns, 1_200_000_000);
    assert_eq!(snapshot.stats.active_positions, 1);
    assert_eq!(snapshot.stats.active_balance, 2 * SOL + 1_200_000_000);
    assert_eq!(snapshot.maturities.len(), 1);
    assert_eq!(snapshot.maturities[0].position_index, 1);
    assert_eq!(snapshot.pool.unwrap().total_principal_locked, 3 * SOL);

    let rows = h.mirror.positions(&h.user).await.unwrap();
    let matured = rows.iter().find(|p| p.position_index == 0).unwrap();
    assert_eq!(matured.status, PositionStatus::Matured);
}

#[tokio::test]
async fn test_snapshot_generations_increase_across_mutations() {
    let h = Harness::new().await;
    let session = h.connect().await;
    let mut snapshots = session.snapshots();

    let mut seen = Vec::new();
    for _ in 0..3 {
        session.stake(0, SOL).await.unwrap();
        within(snapshots.changed()).await.unwrap();
        seen.push(snapshots.borrow_and_update().generation);
    }

    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
}
