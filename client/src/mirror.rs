//! The off-chain mirror: `positions` and `activities` tables in a hosted
//! database, used only to make the dashboard responsive.
//!
//! The chain stays authoritative. Nothing here moves funds, and every row can
//! be rebuilt from program accounts.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use fixed_term_staking::state::PositionStatus;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::records::{ActivityRecord, MirrorTable, NewActivity, NewPosition, PositionRecord};
use crate::stats::{upcoming_maturities, Maturity, UserStats};

/// What happened to a mirrored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// Push notification for a row change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorChange {
    pub table: MirrorTable,
    pub wallet: Pubkey,
    pub kind: ChangeKind,
}

/// Stream of changes for one table and wallet. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<MirrorChange>,
}

impl ChangeFeed {
    pub fn new(rx: mpsc::UnboundedReceiver<MirrorChange>) -> Self {
        Self { rx }
    }

    /// Next change, or `None` once the store has gone away.
    pub async fn recv(&mut self) -> Option<MirrorChange> {
        self.rx.recv().await
    }
}

/// Query client for the hosted database.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Inserts a position row. If a row already exists for the same wallet
    /// and position index, that row is returned unchanged.
    ///
    /// The flag is `true` only when this call inserted the row.
    async fn upsert_position(&self, position: NewPosition) -> Result<(PositionRecord, bool)>;

    /// Sets the status of the row addressed by wallet and position index.
    ///
    /// Rows only move forward. Setting the current status is a no-op, and a
    /// backwards change fails with `InvalidStatusTransition`.
    async fn update_position_status(
        &self,
        wallet: &Pubkey,
        position_index: u64,
        status: PositionStatus,
    ) -> Result<PositionRecord>;

    /// All rows for `wallet`, newest first.
    async fn positions(&self, wallet: &Pubkey) -> Result<Vec<PositionRecord>>;

    /// Server-side aggregation (`get_user_stats`).
    async fn user_stats(&self, wallet: &Pubkey) -> Result<UserStats>;

    /// Server-side maturity listing (`get_upcoming_maturities`).
    async fn upcoming_maturities(&self, wallet: &Pubkey, now: i64) -> Result<Vec<Maturity>>;

    async fn insert_activity(&self, activity: NewActivity) -> Result<ActivityRecord>;

    /// Most recent `limit` activities for `wallet`, newest first.
    async fn activities(&self, wallet: &Pubkey, limit: usize) -> Result<Vec<ActivityRecord>>;

    /// Change notifications for `table`, filtered to `wallet`.
    async fn subscribe(&self, table: MirrorTable, wallet: &Pubkey) -> Result<ChangeFeed>;
}

struct Subscriber {
    table: MirrorTable,
    wallet: Pubkey,
    tx: mpsc::UnboundedSender<MirrorChange>,
}

#[derive(Default)]
struct Tables {
    positions: Vec<PositionRecord>,
    activities: Vec<ActivityRecord>,
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn notify(&mut self, table: MirrorTable, wallet: Pubkey, kind: ChangeKind) {
        self.subscribers.retain(|s| !s.tx.is_closed());
        for subscriber in self
            .subscribers
            .iter()
            .filter(|s| s.table == table && s.wallet == wallet)
        {
            let _ = subscriber.tx.send(MirrorChange {
                table,
                wallet,
                kind,
            });
        }
    }
}

/// Process-local mirror with the same query semantics as the hosted tables.
///
/// Used for offline sessions and tests.
pub struct InMemoryMirror {
    tables: Mutex<Tables>,
    server_functions: bool,
}

impl Default for InMemoryMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            server_functions: true,
        }
    }

    /// A mirror whose `get_user_stats`/`get_upcoming_maturities` functions
    /// are not deployed, so callers must fall back to local computation.
    pub fn without_server_functions() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            server_functions: false,
        }
    }

    fn require_server_functions(&self, name: &str) -> Result<()> {
        if self.server_functions {
            Ok(())
        } else {
            Err(ClientError::Mirror(format!("function {} does not exist", name)))
        }
    }
}

#[async_trait]
impl MirrorStore for InMemoryMirror {
    async fn upsert_position(&self, position: NewPosition) -> Result<(PositionRecord, bool)> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.positions.iter().find(|p| {
            p.wallet_address == *position.wallet_address()
                && p.position_index == position.position_index()
        }) {
            debug!(
                "position {} for {} already mirrored",
                existing.position_index, existing.wallet_address
            );
            return Ok((existing.clone(), false));
        }

        let id = tables.allocate_id();
        let record = position.into_record(id);
        tables.positions.push(record.clone());
        tables.notify(MirrorTable::Positions, record.wallet_address, ChangeKind::Insert);
        Ok((record, true))
    }

    async fn update_position_status(
        &self,
        wallet: &Pubkey,
        position_index: u64,
        status: PositionStatus,
    ) -> Result<PositionRecord> {
        let mut tables = self.tables.lock().await;

        let record = tables
            .positions
            .iter_mut()
            .find(|p| p.wallet_address == *wallet && p.position_index == position_index)
            .ok_or_else(|| {
                ClientError::NotFound(format!("position {} for {}", position_index, wallet))
            })?;
        if !record.check_transition(status)? {
            return Ok(record.clone());
        }
        record.status = status;
        let updated = record.clone();

        tables.notify(MirrorTable::Positions, *wallet, ChangeKind::Update);
        Ok(updated)
    }

    async fn positions(&self, wallet: &Pubkey) -> Result<Vec<PositionRecord>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<PositionRecord> = tables
            .positions
            .iter()
            .filter(|p| p.wallet_address == *wallet)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn user_stats(&self, wallet: &Pubkey) -> Result<UserStats> {
        self.require_server_functions("get_user_stats")?;
        let rows = self.positions(wallet).await?;
        Ok(UserStats::from_positions(&rows))
    }

    async fn upcoming_maturities(&self, wallet: &Pubkey, now: i64) -> Result<Vec<Maturity>> {
        self.require_server_functions("get_upcoming_maturities")?;
        let rows = self.positions(wallet).await?;
        Ok(upcoming_maturities(&rows, now))
    }

    async fn insert_activity(&self, activity: NewActivity) -> Result<ActivityRecord> {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        let record = activity.into_record(id);
        tables.activities.push(record.clone());
        tables.notify(MirrorTable::Activities, record.wallet_address, ChangeKind::Insert);
        Ok(record)
    }

    async fn activities(&self, wallet: &Pubkey, limit: usize) -> Result<Vec<ActivityRecord>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<ActivityRecord> = tables
            .activities
            .iter()
            .filter(|a| a.wallet_address == *wallet)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn subscribe(&self, table: MirrorTable, wallet: &Pubkey) -> Result<ChangeFeed> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tables.lock().await.subscribers.push(Subscriber {
            table,
            wallet: *wallet,
            tx,
        });
        Ok(ChangeFeed::new(rx))
    }
}
