//! Reconciliation journal for mirror writes owed after chain transactions.
//!
//! Every mutation records an entry before it is submitted, attaches the
//! signature once confirmed, and clears the entry only after the mirror has
//! been written. Whatever survives a crash or a mirror outage is replayed by
//! `Session::recover_pending`.

use std::path::{Path, PathBuf};

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::chain::TxSignature;
use crate::error::{ClientError, Result};
use crate::records::pubkey_str;

/// The mirror write a pending entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PendingOp {
    /// Insert the position row and a `stakeAdded` activity
    Stake { plan_id: u8, amount: u64 },
    /// Mark the row Withdrawn and log the payout activity
    Withdraw { emergency: bool },
}

impl PendingOp {
    pub fn name(&self) -> &'static str {
        match self {
            PendingOp::Stake { .. } => "stake",
            PendingOp::Withdraw { emergency: false } => "withdraw",
            PendingOp::Withdraw { emergency: true } => "emergency_withdraw",
        }
    }
}

/// Identifies one entry. A wallet has at most one entry per position and op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingKey {
    pub wallet: Pubkey,
    pub position_index: u64,
    pub op: PendingOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    #[serde(with = "pubkey_str")]
    pub wallet: Pubkey,
    pub position_index: u64,
    pub op: PendingOp,
    /// Set once the transaction is confirmed
    pub signature: Option<TxSignature>,
    pub confirmed_at: Option<i64>,
    pub recorded_at: i64,
}

impl PendingEntry {
    pub fn new(wallet: Pubkey, position_index: u64, op: PendingOp, recorded_at: i64) -> Self {
        Self {
            wallet,
            position_index,
            op,
            signature: None,
            confirmed_at: None,
            recorded_at,
        }
    }

    pub fn key(&self) -> PendingKey {
        PendingKey {
            wallet: self.wallet,
            position_index: self.position_index,
            op: self.op,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Durable store of pending entries.
#[async_trait]
pub trait PendingJournal: Send + Sync {
    /// Adds `entry`, replacing any entry with the same key.
    async fn record(&self, entry: PendingEntry) -> Result<()>;

    /// Marks the entry as confirmed by `signature` at `confirmed_at`.
    async fn attach_signature(
        &self,
        key: &PendingKey,
        signature: &TxSignature,
        confirmed_at: i64,
    ) -> Result<()>;

    /// Removes the entry. Clearing a missing key is not an error.
    async fn clear(&self, key: &PendingKey) -> Result<()>;

    /// Entries for `wallet`, oldest first.
    async fn entries(&self, wallet: &Pubkey) -> Result<Vec<PendingEntry>>;
}

fn upsert(entries: &mut Vec<PendingEntry>, entry: PendingEntry) {
    let key = entry.key();
    entries.retain(|e| e.key() != key);
    entries.push(entry);
}

fn attach(
    entries: &mut [PendingEntry],
    key: &PendingKey,
    signature: &TxSignature,
    confirmed_at: i64,
) -> Result<()> {
    let entry = entries
        .iter_mut()
        .find(|e| e.key() == *key)
        .ok_or_else(|| {
            ClientError::Journal(format!(
                "no pending {} for position {}",
                key.op.name(),
                key.position_index
            ))
        })?;
    entry.signature = Some(signature.clone());
    entry.confirmed_at = Some(confirmed_at);
    Ok(())
}

fn for_wallet(entries: &[PendingEntry], wallet: &Pubkey) -> Vec<PendingEntry> {
    let mut found: Vec<PendingEntry> = entries
        .iter()
        .filter(|e| e.wallet == *wallet)
        .cloned()
        .collect();
    found.sort_by_key(|e| (e.recorded_at, e.position_index));
    found
}

/// Journal that lives only as long as the process.
#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<PendingEntry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingJournal for MemoryJournal {
    async fn record(&self, entry: PendingEntry) -> Result<()> {
        upsert(&mut *self.entries.lock().await, entry);
        Ok(())
    }

    async fn attach_signature(
        &self,
        key: &PendingKey,
        signature: &TxSignature,
        confirmed_at: i64,
    ) -> Result<()> {
        attach(&mut self.entries.lock().await, key, signature, confirmed_at)
    }

    async fn clear(&self, key: &PendingKey) -> Result<()> {
        self.entries.lock().await.retain(|e| e.key() != *key);
        Ok(())
    }

    async fn entries(&self, wallet: &Pubkey) -> Result<Vec<PendingEntry>> {
        Ok(for_wallet(&self.entries.lock().await, wallet))
    }
}

/// Journal persisted as a JSON array.
///
/// Each change rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new contents.
pub struct FileJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PendingEntry>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(Vec::new()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                warn!("Failed to read journal {}: {}", self.path.display(), e);
                Err(e.into())
            }
        }
    }

    async fn store(&self, entries: &[PendingEntry]) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!(
            "Journal saved: {} pending entries at {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl PendingJournal for FileJournal {
    async fn record(&self, entry: PendingEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        upsert(&mut entries, entry);
        self.store(&entries).await
    }

    async fn attach_signature(
        &self,
        key: &PendingKey,
        signature: &TxSignature,
        confirmed_at: i64,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        attach(&mut entries, key, signature, confirmed_at)?;
        self.store(&entries).await
    }

    async fn clear(&self, key: &PendingKey) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.key() != *key);
        if entries.len() == before {
            return Ok(());
        }
        self.store(&entries).await
    }

    async fn entries(&self, wallet: &Pubkey) -> Result<Vec<PendingEntry>> {
        let _guard = self.lock.lock().await;
        Ok(for_wallet(&self.load().await?, wallet))
    }
}
