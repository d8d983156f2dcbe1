//! Dashboard refresh.
//!
//! One worker task owns the snapshot. Triggers (connect, timer, mirror push
//! notifications, completed mutations) only wake it; any number of wakeups
//! that arrive while a refresh is running collapse into a single follow-up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use fixed_term_staking::state::{PoolTotals, PositionStatus};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::StakingChain;
use crate::error::{ClientError, Result};
use crate::mirror::MirrorStore;
use crate::records::{ActivityRecord, MirrorTable, NewActivity, PositionRecord};
use crate::stats::{upcoming_maturities, Maturity, UserStats};

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Connect,
    Interval,
    MirrorChange(MirrorTable),
    Mutation,
    Manual,
}

/// Where a derived figure came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Source {
    /// Server-side mirror function
    #[default]
    Mirror,
    /// Computed locally from the position list
    Local,
}

/// Everything the dashboard shows, fetched together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// Zero until the first refresh completes, then strictly increasing
    pub generation: u64,
    pub positions: Vec<PositionRecord>,
    pub stats: UserStats,
    pub stats_source: Source,
    pub activities: Vec<ActivityRecord>,
    pub maturities: Vec<Maturity>,
    pub maturities_source: Source,
    /// `None` when the program could not be read
    pub pool: Option<PoolTotals>,
    /// Cluster time the snapshot was taken at
    pub as_of: i64,
}

/// Fetches one snapshot for `wallet`.
///
/// The five reads run concurrently. Only a failed position query fails the
/// refresh; statistics and maturities fall back to local computation, and
/// activities or pool totals are left empty.
pub async fn load_snapshot(
    chain: &dyn StakingChain,
    mirror: &dyn MirrorStore,
    wallet: &Pubkey,
    activity_limit: usize,
) -> Result<DashboardSnapshot> {
    let now = chain.unix_timestamp().await?;

    let (positions, mut stats, activities, mut maturities, pool) = tokio::join!(
        mirror.positions(wallet),
        mirror.user_stats(wallet),
        mirror.activities(wallet, activity_limit),
        mirror.upcoming_maturities(wallet, now),
        chain.pool_totals(),
    );

    let mut positions = positions?;
    if promote_matured(mirror, &mut positions, now).await {
        // Server aggregates were read before the promotion
        (stats, maturities) = tokio::join!(
            mirror.user_stats(wallet),
            mirror.upcoming_maturities(wallet, now),
        );
    }

    let (stats, stats_source) = match stats {
        Ok(stats) => (stats, Source::Mirror),
        Err(e) => {
            warn!("User stats unavailable, computing locally: {}", e);
            (UserStats::from_positions(&positions), Source::Local)
        }
    };

    let (maturities, maturities_source) = match maturities {
        Ok(maturities) => (maturities, Source::Mirror),
        Err(e) => {
            warn!("Upcoming maturities unavailable, computing locally: {}", e);
            (upcoming_maturities(&positions, now), Source::Local)
        }
    };

    let activities = activities.unwrap_or_else(|e| {
        warn!("Failed to load activities: {}", e);
        Vec::new()
    });

    let pool = match pool {
        Ok(totals) => Some(totals),
        Err(e) => {
            warn!("Failed to read pool totals: {}", e);
            None
        }
    };

    Ok(DashboardSnapshot {
        generation: 0,
        positions,
        stats,
        stats_source,
        activities,
        maturities,
        maturities_source,
        pool,
        as_of: now,
    })
}

/// Marks Active rows whose unlock time has passed as Matured and logs a
/// `positionMatured` activity for each. Failures leave the row Active for the
/// next refresh.
///
/// Returns whether any row changed.
async fn promote_matured(mirror: &dyn MirrorStore, positions: &mut [PositionRecord], now: i64) -> bool {
    let mut promoted = false;
    for record in positions
        .iter_mut()
        .filter(|p| p.status == PositionStatus::Active && p.is_unlocked(now))
    {
        match mirror
            .update_position_status(&record.wallet_address, record.position_index, PositionStatus::Matured)
            .await
        {
            Ok(updated) => {
                *record = updated;
                promoted = true;
                info!("Position {} matured", record.position_index);
                if let Err(e) = mirror
                    .insert_activity(NewActivity::position_matured(record, now))
                    .await
                {
                    warn!("Failed to log maturity of position {}: {}", record.position_index, e);
                }
            }
            Err(ClientError::InvalidStatusTransition { .. }) => {
                debug!("Position {} already closed", record.position_index);
            }
            Err(e) => warn!("Failed to mark position {} matured: {}", record.position_index, e),
        }
    }
    promoted
}

#[derive(Default)]
struct RefreshQueue {
    wake: Notify,
    requested: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Cheap handle for requesting refreshes and reading the worker's counters.
#[derive(Clone)]
pub struct RefreshHandle {
    queue: Arc<RefreshQueue>,
}

impl RefreshHandle {
    pub fn request(&self, trigger: RefreshTrigger) {
        debug!("Refresh requested: {:?}", trigger);
        self.queue.requested.fetch_add(1, Ordering::Relaxed);
        self.queue.wake.notify_one();
    }

    /// Triggers received so far.
    pub fn requested(&self) -> u64 {
        self.queue.requested.load(Ordering::Relaxed)
    }

    /// Refreshes run to completion, including failed ones.
    pub fn completed(&self) -> u64 {
        self.queue.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.queue.failed.load(Ordering::Relaxed)
    }
}

/// The refresh worker and its feeder tasks for one wallet.
///
/// Dropping it, or calling [`RefreshWorker::shutdown`], aborts every task so
/// no snapshot is published afterwards.
pub struct RefreshWorker {
    handle: RefreshHandle,
    snapshots: watch::Receiver<DashboardSnapshot>,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshWorker {
    /// Starts the worker. Nothing is fetched until the first request.
    pub fn spawn(
        chain: Arc<dyn StakingChain>,
        mirror: Arc<dyn MirrorStore>,
        wallet: Pubkey,
        activity_limit: usize,
    ) -> Self {
        let queue = Arc::new(RefreshQueue::default());
        let (tx, rx) = watch::channel(DashboardSnapshot::default());

        let worker_queue = Arc::clone(&queue);
        let worker = tokio::spawn(async move {
            let mut generation = 0u64;
            loop {
                worker_queue.wake.notified().await;

                match load_snapshot(chain.as_ref(), mirror.as_ref(), &wallet, activity_limit).await {
                    Ok(mut snapshot) => {
                        generation += 1;
                        snapshot.generation = generation;
                        debug!(
                            "Snapshot {} for {}: {} positions",
                            generation,
                            wallet,
                            snapshot.positions.len()
                        );
                        tx.send_replace(snapshot);
                    }
                    Err(e) => {
                        worker_queue.failed.fetch_add(1, Ordering::Relaxed);
                        warn!("Refresh for {} failed: {}", wallet, e);
                    }
                }

                worker_queue.completed.fetch_add(1, Ordering::Release);
            }
        });

        Self {
            handle: RefreshHandle { queue },
            snapshots: rx,
            tasks: vec![worker],
        }
    }

    /// Requests a refresh every `period`, starting one period from now.
    pub fn with_interval(mut self, period: Duration) -> Self {
        let handle = self.handle.clone();
        self.tasks.push(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                handle.request(RefreshTrigger::Interval);
            }
        }));
        self
    }

    /// Subscribes to `positions` and `activities` changes for `wallet` and
    /// turns each notification into a refresh request.
    pub async fn follow_mirror(&mut self, mirror: &dyn MirrorStore, wallet: &Pubkey) -> Result<()> {
        for table in [MirrorTable::Positions, MirrorTable::Activities] {
            let mut feed = mirror.subscribe(table, wallet).await?;
            let handle = self.handle.clone();
            self.tasks.push(tokio::spawn(async move {
                while let Some(change) = feed.recv().await {
                    handle.request(RefreshTrigger::MirrorChange(change.table));
                }
                debug!("Change feed for {:?} closed", table);
            }));
        }
        Ok(())
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    pub fn request(&self, trigger: RefreshTrigger) {
        self.handle.request(trigger);
    }

    pub fn snapshots(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
