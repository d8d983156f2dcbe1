mod common;

use anchor_lang::error::ERROR_CODE_OFFSET;
use anchor_lang::prelude::Pubkey;
use common::{config, within, Harness, SOL, START};
use fixed_term_client::records::ActivityKind;
use fixed_term_client::{
    ClientError, Cluster, MirrorStore, MirrorSync, PendingJournal, Session, StakingChain,
};
use fixed_term_staking::constants::{PLAN_A_DURATION, PLAN_B_DURATION};
use fixed_term_staking::error::StakingError;
use fixed_term_staking::state::PositionStatus;

#[tokio::test]
async fn test_stake_writes_mirror_row_and_activity() {
    let h = Harness::new().await;
    let session = h.connect().await;

    let receipt = session.stake(1, 2 * SOL).await.unwrap();
    assert_eq!(receipt.mirror, MirrorSync::Synced);
    assert_eq!(receipt.position.position_index(), 0);
    assert_eq!(receipt.position.bonus_amount(), SOL);
    assert_eq!(receipt.position.unlock_at(), START + PLAN_B_DURATION);

    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].principal_amount, 2 * SOL);
    assert_eq!(rows[0].status, PositionStatus::Active);

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::StakeAdded);
    assert_eq!(log[0].metadata["signature"], receipt.signature.0.as_str());
    assert!(log.iter().any(|a| a.event_type == ActivityKind::WalletConnected));

    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());
    assert_eq!(h.sim.balance(&h.user).await, 8 * SOL);

    let second = session.stake(0, SOL).await.unwrap();
    assert_eq!(second.position.position_index(), 1);
}

#[tokio::test]
async fn test_stake_rejects_bad_input_before_submitting() {
    let h = Harness::new().await;
    let session = h.connect().await;

    assert_eq!(session.stake(3, SOL).await.unwrap_err(), ClientError::InvalidPlan(3));
    assert!(matches!(
        session.stake(0, 0).await.unwrap_err(),
        ClientError::InvalidAmount(_)
    ));
    assert!(h.sim.positions_of(&h.user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_withdraw_requires_maturity_then_pays_bonus() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(0, SOL).await.unwrap();

    let err = session.withdraw(0).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Chain { code: Some(code), .. }
            if code == StakingError::LockPeriodNotEnded as u32 + ERROR_CODE_OFFSET
    ));
    assert_eq!(session.recover_pending().await.unwrap().dropped, 1);
    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());

    h.sim.advance_time(PLAN_A_DURATION).await;
    let before = h.sim.balance(&h.user).await;
    let receipt = session.withdraw(0).await.unwrap();

    assert_eq!(receipt.payout, Some(1_200_000_000));
    assert!(receipt.mirror.is_synced());
    assert_eq!(h.sim.balance(&h.user).await - before, 1_200_000_000);

    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows[0].status, PositionStatus::Withdrawn);
    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::RewardClaimed);
    assert_eq!(log[0].metadata["payout"], 1_200_000_000u64);
}

#[tokio::test]
async fn test_emergency_withdraw_pays_principal_only() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(1, 2 * SOL).await.unwrap();

    let before = h.sim.balance(&h.user).await;
    let receipt = session.emergency_withdraw(0).await.unwrap();

    assert_eq!(h.sim.balance(&h.user).await - before, 2 * SOL);
    assert_eq!(receipt.payout, Some(2 * SOL));

    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows[0].status, PositionStatus::Withdrawn);
    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::EmergencyWithdrawn);

    let totals = session.pool_totals().await.unwrap();
    assert_eq!(totals.total_principal_locked, 0);
    assert_eq!(totals.rewards_pool, 100 * SOL);

    let err = session.emergency_withdraw(0).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Chain { code: Some(code), .. }
            if code == StakingError::AlreadyWithdrawn as u32 + ERROR_CODE_OFFSET
    ));
}

#[tokio::test]
async fn test_second_mutation_while_one_is_in_flight_is_busy() {
    let h = Harness::new().await;
    let session = h.connect().await;
    h.chain.hold_submits();

    let first = session.stake(0, SOL);
    let second = async {
        h.chain.submission_parked().await;
        let result = session.stake(1, SOL).await;
        h.chain.release_submits();
        result
    };
    let (first, second) = within(async { tokio::join!(first, second) }).await;

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), ClientError::Busy);
    assert_eq!(session.recover_pending().await.unwrap().reconciled, 0);
}

#[tokio::test]
async fn test_connect_checks_wallet_and_cluster() {
    let h = Harness::new().await;

    let err = Session::connect(config(), &[], h.backends()).await.err().unwrap();
    assert_eq!(err, ClientError::NoWallet);

    let mut devnet = config();
    devnet.cluster = Cluster::Devnet;
    let err = Session::connect(devnet, &[h.user], h.backends())
        .await
        .err()
        .unwrap();
    assert_eq!(
        err,
        ClientError::WrongCluster {
            expected: Cluster::Devnet,
            actual: Cluster::Localnet,
        }
    );
}

#[tokio::test]
async fn test_disconnect_stops_session_and_logs_activity() {
    let h = Harness::new().await;
    let mut session = h.connect().await;
    let mut snapshots = session.snapshots();

    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();

    assert!(!session.is_connected());
    assert_eq!(session.stake(0, SOL).await.unwrap_err(), ClientError::Disconnected);
    while within(snapshots.changed()).await.is_ok() {}

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    let disconnects = log
        .iter()
        .filter(|a| a.event_type == ActivityKind::WalletDisconnected)
        .count();
    assert_eq!(disconnects, 1);
}

#[tokio::test]
async fn test_switch_account_reconnects_as_new_wallet() {
    let h = Harness::new().await;
    let session = h.connect().await;
    let other = Pubkey::new_unique();

    let switched = session.switch_account(&[other]).await.unwrap().unwrap();
    assert_eq!(*switched.wallet(), other);
    assert!(switched.is_connected());

    let log = h.mirror.activities(&other, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::WalletConnected);
    let old = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(old[0].event_type, ActivityKind::WalletDisconnected);

    assert!(switched.switch_account(&[]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_chain_views_resolve_against_cluster_time() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(2, SOL).await.unwrap();

    assert_eq!(session.plan_info(2).await.unwrap().bonus_bps, 10_000);
    assert_eq!(session.time_to_unlock(0).await.unwrap(), 259_200);

    let positions = session.chain_positions().await.unwrap();
    assert_eq!(positions.len(), 1);
    assert!(!positions[0].is_matured);
    assert_eq!(positions[0].status, PositionStatus::Active);

    h.sim.advance_time(259_200).await;
    let positions = session.chain_positions().await.unwrap();
    assert!(positions[0].is_matured);
    assert_eq!(positions[0].status, PositionStatus::Matured);

    let payout = session.pending_payout(0).await.unwrap();
    assert_eq!(payout.principal + payout.bonus, 2 * SOL);
    assert!(payout.matured);
}
