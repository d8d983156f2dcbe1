#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use fixed_term_client::chain::{Confirmation, StakingChain, StakingInstruction, TxSignature};
use fixed_term_client::mirror::{ChangeFeed, InMemoryMirror, MirrorStore};
use fixed_term_client::records::{ActivityRecord, MirrorTable, NewActivity, NewPosition, PositionRecord};
use fixed_term_client::stats::{Maturity, UserStats};
use fixed_term_client::{
    Backends, ClientConfig, ClientError, Cluster, MemoryJournal, Result, Session, SimulatedChain,
};
use fixed_term_staking::constants::LAMPORTS_PER_SOL;
use fixed_term_staking::plans::PlanInfo;
use fixed_term_staking::state::{PendingPayout, PoolTotals, Position, PositionStatus};
use tokio::sync::{Notify, Semaphore};

pub const SOL: u64 = LAMPORTS_PER_SOL;
pub const START: i64 = 1_700_000_000;

/// Mirror that can be told to fail writes or to stall position reads.
pub struct FlakyMirror {
    inner: InMemoryMirror,
    fail_writes: AtomicBool,
    hold_reads: AtomicBool,
    read_gate: Semaphore,
    position_reads: AtomicUsize,
}

impl FlakyMirror {
    pub fn new(inner: InMemoryMirror) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            hold_reads: AtomicBool::new(false),
            read_gate: Semaphore::new(0),
            position_reads: AtomicUsize::new(0),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn hold_reads(&self) {
        self.hold_reads.store(true, Ordering::SeqCst);
    }

    pub fn release_reads(&self) {
        self.hold_reads.store(false, Ordering::SeqCst);
        self.read_gate.add_permits(1_000);
    }

    pub fn position_reads(&self) -> usize {
        self.position_reads.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ClientError::Mirror("service unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MirrorStore for FlakyMirror {
    async fn upsert_position(&self, position: NewPosition) -> Result<(PositionRecord, bool)> {
        self.check_write()?;
        self.inner.upsert_position(position).await
    }

    async fn update_position_status(
        &self,
        wallet: &Pubkey,
        position_index: u64,
        status: PositionStatus,
    ) -> Result<PositionRecord> {
        self.check_write()?;
        self.inner
            .update_position_status(wallet, position_index, status)
            .await
    }

    async fn positions(&self, wallet: &Pubkey) -> Result<Vec<PositionRecord>> {
        self.position_reads.fetch_add(1, Ordering::SeqCst);
        if self.hold_reads.load(Ordering::SeqCst) {
            self.read_gate.acquire().await.unwrap().forget();
        }
        self.inner.positions(wallet).await
    }

    async fn user_stats(&self, wallet: &Pubkey) -> Result<UserStats> {
        self.inner.user_stats(wallet).await
    }

    async fn upcoming_maturities(&self, wallet: &Pubkey, now: i64) -> Result<Vec<Maturity>> {
        self.inner.upcoming_maturities(wallet, now).await
    }

    async fn insert_activity(&self, activity: NewActivity) -> Result<ActivityRecord> {
        self.check_write()?;
        self.inner.insert_activity(activity).await
    }

    async fn activities(&self, wallet: &Pubkey, limit: usize) -> Result<Vec<ActivityRecord>> {
        self.inner.activities(wallet, limit).await
    }

    async fn subscribe(&self, table: MirrorTable, wallet: &Pubkey) -> Result<ChangeFeed> {
        self.inner.subscribe(table, wallet).await
    }
}

/// Chain whose submissions can be parked until released.
pub struct GatedChain {
    inner: Arc<SimulatedChain>,
    hold_submits: AtomicBool,
    entered: Notify,
    gate: Semaphore,
}

impl GatedChain {
    pub fn new(inner: Arc<SimulatedChain>) -> Self {
        Self {
            inner,
            hold_submits: AtomicBool::new(false),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    pub fn hold_submits(&self) {
        self.hold_submits.store(true, Ordering::SeqCst);
    }

    /// Resolves once a submission is parked at the gate.
    pub async fn submission_parked(&self) {
        self.entered.notified().await;
    }

    pub fn release_submits(&self) {
        self.hold_submits.store(false, Ordering::SeqCst);
        self.gate.add_permits(1_000);
    }
}

#[async_trait]
impl StakingChain for GatedChain {
    async fn cluster(&self) -> Result<Cluster> {
        self.inner.cluster().await
    }

    async fn unix_timestamp(&self) -> Result<i64> {
        self.inner.unix_timestamp().await
    }

    async fn next_position_index(&self, owner: &Pubkey) -> Result<u64> {
        self.inner.next_position_index(owner).await
    }

    async fn submit(&self, signer: &Pubkey, instruction: StakingInstruction) -> Result<TxSignature> {
        if self.hold_submits.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.acquire().await.unwrap().forget();
        }
        self.inner.submit(signer, instruction).await
    }

    async fn confirm(&self, signature: &TxSignature) -> Result<Confirmation> {
        self.inner.confirm(signature).await
    }

    async fn positions_of(&self, owner: &Pubkey) -> Result<Vec<Position>> {
        self.inner.positions_of(owner).await
    }

    async fn plan_info(&self, plan_id: u8) -> Result<PlanInfo> {
        self.inner.plan_info(plan_id).await
    }

    async fn pending_payout(&self, owner: &Pubkey, position_index: u64) -> Result<PendingPayout> {
        self.inner.pending_payout(owner, position_index).await
    }

    async fn time_to_unlock(&self, owner: &Pubkey, position_index: u64) -> Result<u64> {
        self.inner.time_to_unlock(owner, position_index).await
    }

    async fn pool_totals(&self) -> Result<PoolTotals> {
        self.inner.pool_totals().await
    }
}

pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new("http://127.0.0.1:54321", "anon-key");
    config.cluster = Cluster::Localnet;
    config
}

/// A funded program, one funded user and a healthy mirror.
pub struct Harness {
    pub sim: Arc<SimulatedChain>,
    pub chain: Arc<GatedChain>,
    pub mirror: Arc<FlakyMirror>,
    pub journal: Arc<MemoryJournal>,
    pub user: Pubkey,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_mirror(InMemoryMirror::new()).await
    }

    pub async fn with_mirror(mirror: InMemoryMirror) -> Self {
        let admin = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        let sim = Arc::new(SimulatedChain::new(Cluster::Localnet, admin, START));
        sim.airdrop(&admin, 100 * SOL).await;
        sim.fund_rewards(&admin, 100 * SOL).await.unwrap();
        sim.airdrop(&user, 10 * SOL).await;

        Self {
            chain: Arc::new(GatedChain::new(Arc::clone(&sim))),
            sim,
            mirror: Arc::new(FlakyMirror::new(mirror)),
            journal: Arc::new(MemoryJournal::new()),
            user,
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            chain: self.chain.clone(),
            mirror: self.mirror.clone(),
            journal: self.journal.clone(),
        }
    }

    pub async fn connect(&self) -> Session {
        Session::connect(config(), &[self.user], self.backends())
            .await
            .unwrap()
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Awaits `future`, failing the test after five seconds.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}
