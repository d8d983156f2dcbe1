mod common;

use common::{config, Harness, SOL, START};
use fixed_term_client::journal::{PendingEntry, PendingOp};
use fixed_term_client::records::ActivityKind;
use fixed_term_client::{
    Backends, ClientError, FileJournal, MirrorStore, MirrorSync, PendingJournal, Session,
};
use fixed_term_staking::constants::PLAN_B_DURATION;
use fixed_term_staking::state::PositionStatus;

#[tokio::test]
async fn test_mirror_outage_after_stake_is_journaled_and_recovered() {
    let h = Harness::new().await;
    let session = h.connect().await;

    h.mirror.fail_writes(true);
    let receipt = session.stake(1, 2 * SOL).await.unwrap();
    assert!(matches!(receipt.mirror, MirrorSync::Pending { .. }));

    let pending = h.journal.entries(&h.user).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].signature, Some(receipt.signature.clone()));
    assert_eq!(
        pending[0].op,
        PendingOp::Stake {
            plan_id: 1,
            amount: 2 * SOL
        }
    );
    assert!(h.mirror.positions(&h.user).await.unwrap().is_empty());

    let report = session.recover_pending().await.unwrap();
    assert_eq!(report.remaining, 1);
    assert_eq!(h.journal.entries(&h.user).await.unwrap().len(), 1);

    h.mirror.fail_writes(false);
    let report = session.recover_pending().await.unwrap();
    assert_eq!(report.reconciled, 1);
    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());

    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].principal_amount, 2 * SOL);
    assert_eq!(rows[0].bonus_amount, SOL);
    assert_eq!(rows[0].unlock_at, START + PLAN_B_DURATION);

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::StakeAdded);
    assert_eq!(log[0].metadata["signature"], receipt.signature.0.as_str());
}

#[tokio::test]
async fn test_stake_recovery_does_not_log_twice() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(1, 2 * SOL).await.unwrap();

    // Left behind when clearing the entry failed
    h.journal
        .record(PendingEntry::new(
            h.user,
            0,
            PendingOp::Stake {
                plan_id: 1,
                amount: 2 * SOL,
            },
            START,
        ))
        .await
        .unwrap();

    assert_eq!(session.recover_pending().await.unwrap().reconciled, 1);
    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());
    assert_eq!(h.mirror.positions(&h.user).await.unwrap().len(), 1);

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    let stakes = log
        .iter()
        .filter(|a| a.event_type == ActivityKind::StakeAdded)
        .count();
    assert_eq!(stakes, 1);
}

#[tokio::test]
async fn test_rejected_submission_is_dropped_by_recovery() {
    let h = Harness::new().await;
    let session = h.connect().await;

    h.sim.reject_next_submission().await;
    assert_eq!(session.stake(0, SOL).await.unwrap_err(), ClientError::Rejected);

    let pending = h.journal.entries(&h.user).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].signature.is_none());

    let report = session.recover_pending().await.unwrap();
    assert_eq!(report.dropped, 1);
    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());
    assert!(h.mirror.positions(&h.user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unconfirmed_stake_is_rebuilt_from_chain() {
    let h = Harness::new().await;
    let session = h.connect().await;

    h.sim.drop_confirmations(true).await;
    let err = session.stake(2, SOL).await.unwrap_err();
    assert!(matches!(err, ClientError::Confirmation(_)));

    let pending = h.journal.entries(&h.user).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].is_confirmed());

    h.sim.drop_confirmations(false).await;
    let report = session.recover_pending().await.unwrap();
    assert_eq!(report.reconciled, 1);

    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bonus_amount, SOL);
    let log = h.mirror.activities(&h.user, 1).await.unwrap();
    assert!(log[0].metadata["signature"].is_null());
}

#[tokio::test]
async fn test_entry_for_transaction_that_never_landed_is_dropped() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(0, SOL).await.unwrap();

    // Recorded, then the process died before submitting
    h.journal
        .record(PendingEntry::new(
            h.user,
            0,
            PendingOp::Withdraw { emergency: true },
            START,
        ))
        .await
        .unwrap();

    let report = session.recover_pending().await.unwrap();
    assert_eq!(report.dropped, 1);
    assert_eq!(report.reconciled, 0);
    assert!(h.journal.entries(&h.user).await.unwrap().is_empty());
    assert_eq!(
        h.mirror.positions(&h.user).await.unwrap()[0].status,
        PositionStatus::Active
    );
}

#[tokio::test]
async fn test_withdrawal_mirror_write_is_recovered_and_idempotent() {
    let h = Harness::new().await;
    let session = h.connect().await;
    session.stake(1, 2 * SOL).await.unwrap();

    h.mirror.fail_writes(true);
    let receipt = session.emergency_withdraw(0).await.unwrap();
    assert!(!receipt.mirror.is_synced());
    assert_eq!(
        h.mirror.positions(&h.user).await.unwrap()[0].status,
        PositionStatus::Active
    );

    h.mirror.fail_writes(false);
    assert_eq!(session.recover_pending().await.unwrap().reconciled, 1);
    assert_eq!(
        h.mirror.positions(&h.user).await.unwrap()[0].status,
        PositionStatus::Withdrawn
    );

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    assert_eq!(log[0].event_type, ActivityKind::EmergencyWithdrawn);

    h.journal
        .record(PendingEntry::new(
            h.user,
            0,
            PendingOp::Withdraw { emergency: true },
            START,
        ))
        .await
        .unwrap();
    assert_eq!(session.recover_pending().await.unwrap().reconciled, 1);

    let log = h.mirror.activities(&h.user, 10).await.unwrap();
    let withdrawals = log
        .iter()
        .filter(|a| a.event_type == ActivityKind::EmergencyWithdrawn)
        .count();
    assert_eq!(withdrawals, 1);
}

#[tokio::test]
async fn test_file_journal_is_replayed_on_next_connect() {
    let h = Harness::new().await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = config();
    config.journal_path = Some(dir.path().join("pending.json"));
    let backends = || Backends::new(h.chain.clone(), h.mirror.clone(), &config);

    let mut session = Session::connect(config.clone(), &[h.user], backends())
        .await
        .unwrap();
    h.mirror.fail_writes(true);
    let receipt = session.stake(0, 3 * SOL).await.unwrap();
    assert!(!receipt.mirror.is_synced());
    session.disconnect().await.unwrap();
    drop(session);

    let journal = FileJournal::new(dir.path().join("pending.json"));
    assert_eq!(journal.entries(&h.user).await.unwrap().len(), 1);

    h.mirror.fail_writes(false);
    let session = Session::connect(config.clone(), &[h.user], backends())
        .await
        .unwrap();

    assert!(journal.entries(&h.user).await.unwrap().is_empty());
    let rows = h.mirror.positions(&h.user).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].principal_amount, 3 * SOL);
    assert!(session.is_connected());
}
