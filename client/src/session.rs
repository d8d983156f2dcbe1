//! A connected wallet session.
//!
//! ## Mutations
//!
//! `stake`, `withdraw` and `emergency_withdraw` follow the same sequence:
//!
//! 1. Take the session operation lock (`Busy` if another mutation holds it)
//! 2. Record a pending entry in the journal
//! 3. Submit and confirm the transaction; attach the signature to the entry
//! 4. Write the mirror, then clear the entry
//! 5. Request a refresh
//!
//! A chain failure aborts and surfaces the error, leaving the entry for
//! [`Session::recover_pending`] to settle. A mirror failure after the
//! transaction confirmed is not an error: the receipt reports
//! [`MirrorSync::Pending`] and [`Session::recover_pending`] finishes the write
//! later from chain state.

use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use fixed_term_staking::plans::{Plan, PlanInfo};
use fixed_term_staking::state::{PendingPayout, PoolTotals, PositionStatus};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::chain::{ChainPosition, StakingChain, StakingInstruction, TxSignature};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::journal::{FileJournal, MemoryJournal, PendingEntry, PendingJournal, PendingKey, PendingOp};
use crate::mirror::MirrorStore;
use crate::records::{NewActivity, NewPosition};
use crate::refresh::{DashboardSnapshot, RefreshHandle, RefreshTrigger, RefreshWorker};

/// The services a session talks to.
#[derive(Clone)]
pub struct Backends {
    pub chain: Arc<dyn StakingChain>,
    pub mirror: Arc<dyn MirrorStore>,
    pub journal: Arc<dyn PendingJournal>,
}

impl Backends {
    /// Uses a [`FileJournal`] at `config.journal_path`, or an in-memory
    /// journal when no path is configured.
    pub fn new(
        chain: Arc<dyn StakingChain>,
        mirror: Arc<dyn MirrorStore>,
        config: &ClientConfig,
    ) -> Self {
        let journal: Arc<dyn PendingJournal> = match &config.journal_path {
            Some(path) => Arc::new(FileJournal::new(path.clone())),
            None => Arc::new(MemoryJournal::new()),
        };
        Self {
            chain,
            mirror,
            journal,
        }
    }
}

/// Whether the mirror caught up with a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorSync {
    Synced,
    /// The write is journaled and will be retried by `recover_pending`
    Pending { reason: String },
}

impl MirrorSync {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => MirrorSync::Synced,
            Err(e) => MirrorSync::Pending {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, MirrorSync::Synced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeReceipt {
    pub signature: TxSignature,
    pub position: NewPosition,
    pub mirror: MirrorSync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub signature: TxSignature,
    pub position_index: u64,
    /// Lamports the program reported as owed just before submission
    pub payout: Option<u64>,
    pub mirror: MirrorSync,
}

/// Outcome of a [`Session::recover_pending`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Entries whose mirror write completed
    pub reconciled: usize,
    /// Entries whose transaction never landed
    pub dropped: usize,
    /// Entries still pending
    pub remaining: usize,
}

pub struct Session {
    wallet: Pubkey,
    config: ClientConfig,
    backends: Backends,
    op_lock: Mutex<()>,
    refresh: RefreshWorker,
    connected: bool,
}

impl Session {
    /// Connects the first of `accounts` on the configured cluster.
    ///
    /// Logs a `walletConnected` activity, starts the refresh worker (timer and
    /// mirror subscriptions) and replays any journaled writes.
    pub async fn connect(
        config: ClientConfig,
        accounts: &[Pubkey],
        backends: Backends,
    ) -> Result<Session> {
        config.validate()?;
        let wallet = *accounts.first().ok_or(ClientError::NoWallet)?;

        let actual = backends.chain.cluster().await?;
        if actual != config.cluster {
            return Err(ClientError::WrongCluster {
                expected: config.cluster,
                actual,
            });
        }

        let now = backends.chain.unix_timestamp().await?;
        if let Err(e) = backends
            .mirror
            .insert_activity(NewActivity::wallet_connected(wallet, now))
            .await
        {
            warn!("Failed to log connection of {}: {}", wallet, e);
        }

        let mut refresh = RefreshWorker::spawn(
            Arc::clone(&backends.chain),
            Arc::clone(&backends.mirror),
            wallet,
            config.activity_limit,
        )
        .with_interval(config.refresh_interval());
        if let Err(e) = refresh.follow_mirror(backends.mirror.as_ref(), &wallet).await {
            warn!("Mirror change subscriptions unavailable: {}", e);
        }

        let session = Session {
            wallet,
            config,
            backends,
            op_lock: Mutex::new(()),
            refresh,
            connected: true,
        };
        info!("Wallet {} connected on {}", wallet, session.config.cluster);

        match session.recover_pending().await {
            Ok(report) if report != RecoveryReport::default() => {
                info!(
                    "Recovered journal: {} reconciled, {} dropped, {} remaining",
                    report.reconciled, report.dropped, report.remaining
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Journal recovery failed: {}", e),
        }

        session.refresh.request(RefreshTrigger::Connect);
        Ok(session)
    }

    /// Logs a `walletDisconnected` activity and stops the refresh worker.
    /// Calling it again is a no-op.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.refresh.shutdown();
        self.connected = false;

        let now = self.backends.chain.unix_timestamp().await?;
        if let Err(e) = self
            .backends
            .mirror
            .insert_activity(NewActivity::wallet_disconnected(self.wallet, now))
            .await
        {
            warn!("Failed to log disconnection of {}: {}", self.wallet, e);
        }

        info!("Wallet {} disconnected", self.wallet);
        Ok(())
    }

    /// Handles a wallet account change: disconnects this session and connects
    /// the new first account. An empty list just disconnects.
    pub async fn switch_account(mut self, accounts: &[Pubkey]) -> Result<Option<Session>> {
        self.disconnect().await?;
        if accounts.is_empty() {
            return Ok(None);
        }
        let config = self.config.clone();
        let backends = self.backends.clone();
        Session::connect(config, accounts, backends).await.map(Some)
    }

    pub fn wallet(&self) -> &Pubkey {
        &self.wallet
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::Disconnected)
        }
    }

    // ---- mutations ----

    /// Stakes `amount` lamports in `plan_id`.
    pub async fn stake(&self, plan_id: u8, amount: u64) -> Result<StakeReceipt> {
        let _op = self.op_lock.try_lock().map_err(|_| ClientError::Busy)?;
        self.ensure_connected()?;

        Plan::lookup(plan_id).ok_or(ClientError::InvalidPlan(plan_id))?;
        if amount == 0 {
            return Err(ClientError::InvalidAmount("stake amount must be positive".into()));
        }

        let chain = &self.backends.chain;
        let position_index = chain.next_position_index(&self.wallet).await?;
        let entry = PendingEntry::new(
            self.wallet,
            position_index,
            PendingOp::Stake { plan_id, amount },
            chain.unix_timestamp().await?,
        );
        let key = entry.key();
        self.backends.journal.record(entry).await?;

        let instruction = StakingInstruction::Stake {
            plan_id,
            amount,
            position_index,
        };
        let (signature, confirmed_at) = self.submit_journaled(&key, instruction).await?;

        let position = NewPosition::derive(self.wallet, plan_id, amount, position_index, confirmed_at)?;
        let mirror = MirrorSync::from_result(self.mirror_stake(&position, Some(&signature)).await);
        self.settle_journal(&key, &mirror).await;

        info!(
            "Staked {} lamports in plan {} as position {} ({})",
            amount, plan_id, position_index, signature
        );
        self.refresh.request(RefreshTrigger::Mutation);

        Ok(StakeReceipt {
            signature,
            position,
            mirror,
        })
    }

    /// Withdraws a matured position: principal plus bonus.
    pub async fn withdraw(&self, position_index: u64) -> Result<WithdrawReceipt> {
        self.close_position(position_index, false).await
    }

    /// Exits a position before unlock: principal only.
    pub async fn emergency_withdraw(&self, position_index: u64) -> Result<WithdrawReceipt> {
        self.close_position(position_index, true).await
    }

    async fn close_position(&self, position_index: u64, emergency: bool) -> Result<WithdrawReceipt> {
        let _op = self.op_lock.try_lock().map_err(|_| ClientError::Busy)?;
        self.ensure_connected()?;

        let chain = &self.backends.chain;
        let payout = match chain.pending_payout(&self.wallet, position_index).await {
            Ok(quote) if emergency => Some(quote.principal),
            Ok(quote) => quote.principal.checked_add(quote.bonus),
            Err(e) => {
                debug!("No payout quote for position {}: {}", position_index, e);
                None
            }
        };

        let entry = PendingEntry::new(
            self.wallet,
            position_index,
            PendingOp::Withdraw { emergency },
            chain.unix_timestamp().await?,
        );
        let key = entry.key();
        self.backends.journal.record(entry).await?;

        let instruction = if emergency {
            StakingInstruction::EmergencyWithdraw { position_index }
        } else {
            StakingInstruction::Withdraw { position_index }
        };
        let (signature, confirmed_at) = self.submit_journaled(&key, instruction).await?;

        let mirror = MirrorSync::from_result(
            self.mirror_withdrawal(position_index, emergency, payout, Some(&signature), confirmed_at)
                .await,
        );
        self.settle_journal(&key, &mirror).await;

        info!(
            "{} position {} ({})",
            if emergency { "Emergency withdrew" } else { "Withdrew" },
            position_index,
            signature
        );
        self.refresh.request(RefreshTrigger::Mutation);

        Ok(WithdrawReceipt {
            signature,
            position_index,
            payout,
            mirror,
        })
    }

    /// Submits and confirms `instruction` for a journaled entry.
    ///
    /// On any failure the entry stays in the journal. A failed submission may
    /// still have been broadcast, so `recover_pending` decides from chain
    /// state whether to finish the write or drop the entry.
    async fn submit_journaled(
        &self,
        key: &PendingKey,
        instruction: StakingInstruction,
    ) -> Result<(TxSignature, i64)> {
        let chain = &self.backends.chain;

        let signature = match chain.submit(&self.wallet, instruction).await {
            Ok(signature) => signature,
            Err(e) => {
                warn!(
                    "{} for position {} failed, left in journal: {}",
                    instruction.name(),
                    key.position_index,
                    e
                );
                return Err(e);
            }
        };

        let confirmation = chain.confirm(&signature).await.map_err(|e| {
            warn!("{} not confirmed, left in journal: {}", signature, e);
            e
        })?;

        if let Err(e) = self
            .backends
            .journal
            .attach_signature(key, &signature, confirmation.block_time)
            .await
        {
            warn!("Failed to journal signature {}: {}", signature, e);
        }

        Ok((signature, confirmation.block_time))
    }

    async fn settle_journal(&self, key: &PendingKey, mirror: &MirrorSync) {
        match mirror {
            MirrorSync::Synced => {
                if let Err(e) = self.backends.journal.clear(key).await {
                    warn!("Failed to clear journal entry: {}", e);
                }
            }
            MirrorSync::Pending { reason } => {
                warn!(
                    "Mirror write for {} of position {} pending: {}",
                    key.op.name(),
                    key.position_index,
                    reason
                );
            }
        }
    }

    /// Writes the position row and, if this call inserted it, the
    /// `stakeAdded` activity.
    async fn mirror_stake(&self, position: &NewPosition, signature: Option<&TxSignature>) -> Result<()> {
        let mirror = &self.backends.mirror;
        let (_, inserted) = mirror.upsert_position(position.clone()).await?;
        if !inserted {
            debug!("Position {} already mirrored", position.position_index());
            return Ok(());
        }
        mirror
            .insert_activity(NewActivity::stake_added(
                position,
                signature.map(|s| s.0.as_str()),
            ))
            .await?;
        Ok(())
    }

    /// Marks the mirrored row Withdrawn and logs the payout. A row that is
    /// already Withdrawn is left alone.
    async fn mirror_withdrawal(
        &self,
        position_index: u64,
        emergency: bool,
        payout: Option<u64>,
        signature: Option<&TxSignature>,
        now: i64,
    ) -> Result<()> {
        let mirror = &self.backends.mirror;
        let record = mirror
            .positions(&self.wallet)
            .await?
            .into_iter()
            .find(|p| p.position_index == position_index)
            .ok_or_else(|| ClientError::NotFound(format!("mirror row for position {}", position_index)))?;

        if !record.check_transition(PositionStatus::Withdrawn)? {
            debug!("Position {} already withdrawn in mirror", position_index);
            return Ok(());
        }

        mirror
            .update_position_status(&self.wallet, position_index, PositionStatus::Withdrawn)
            .await?;

        let signature = signature.map(|s| s.0.as_str());
        let activity = if emergency {
            NewActivity::emergency_withdrawn(self.wallet, position_index, payout, signature, now)
        } else {
            NewActivity::reward_claimed(self.wallet, position_index, payout, signature, now)
        };
        mirror.insert_activity(activity).await?;
        Ok(())
    }

    /// Replays journaled mirror writes against current chain state.
    ///
    /// Entries whose transaction landed are written from the on-chain
    /// position; entries whose transaction never landed are dropped.
    pub async fn recover_pending(&self) -> Result<RecoveryReport> {
        let _op = self.op_lock.try_lock().map_err(|_| ClientError::Busy)?;
        self.ensure_connected()?;

        let entries = self.backends.journal.entries(&self.wallet).await?;
        if entries.is_empty() {
            return Ok(RecoveryReport::default());
        }

        let on_chain = self.backends.chain.positions_of(&self.wallet).await?;
        let mut report = RecoveryReport::default();

        for entry in entries {
            let key = entry.key();
            let landed = on_chain.iter().find(|p| p.index == entry.position_index);
            let signature = entry.signature.as_ref();

            let result = match (entry.op, landed) {
                (PendingOp::Stake { .. }, Some(position)) => {
                    match NewPosition::derive(
                        self.wallet,
                        position.plan_id,
                        position.principal,
                        position.index,
                        position.start,
                    ) {
                        Ok(row) => self.mirror_stake(&row, signature).await,
                        Err(e) => Err(e),
                    }
                }
                (PendingOp::Withdraw { .. }, Some(position)) if position.withdrawn => {
                    let now = entry.confirmed_at.unwrap_or(entry.recorded_at);
                    self.mirror_withdrawal(position.index, position.forfeited, None, signature, now)
                        .await
                }
                _ if entry.is_confirmed() => Err(ClientError::NotFound(format!(
                    "confirmed {} of position {} not visible on chain",
                    entry.op.name(),
                    entry.position_index
                ))),
                _ => {
                    debug!(
                        "Dropping {} of position {}: transaction never landed",
                        entry.op.name(),
                        entry.position_index
                    );
                    self.backends.journal.clear(&key).await?;
                    report.dropped += 1;
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    self.backends.journal.clear(&key).await?;
                    report.reconciled += 1;
                }
                Err(e) => {
                    warn!(
                        "Recovery of {} for position {} failed: {}",
                        entry.op.name(),
                        entry.position_index,
                        e
                    );
                    report.remaining += 1;
                }
            }
        }

        if report.reconciled > 0 {
            self.refresh.request(RefreshTrigger::Mutation);
        }
        Ok(report)
    }

    // ---- reads ----

    pub async fn plan_info(&self, plan_id: u8) -> Result<PlanInfo> {
        self.backends.chain.plan_info(plan_id).await
    }

    pub async fn pending_payout(&self, position_index: u64) -> Result<PendingPayout> {
        self.backends
            .chain
            .pending_payout(&self.wallet, position_index)
            .await
    }

    pub async fn time_to_unlock(&self, position_index: u64) -> Result<u64> {
        self.backends
            .chain
            .time_to_unlock(&self.wallet, position_index)
            .await
    }

    /// The wallet's on-chain positions with status resolved at cluster time.
    pub async fn chain_positions(&self) -> Result<Vec<ChainPosition>> {
        let chain = &self.backends.chain;
        let now = chain.unix_timestamp().await?;
        Ok(chain
            .positions_of(&self.wallet)
            .await?
            .into_iter()
            .map(|position| ChainPosition::resolve(position, now))
            .collect())
    }

    pub async fn pool_totals(&self) -> Result<PoolTotals> {
        self.backends.chain.pool_totals().await
    }

    /// Receiver for dashboard snapshots. Closed after disconnect.
    pub fn snapshots(&self) -> watch::Receiver<DashboardSnapshot> {
        self.refresh.snapshots()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.refresh.snapshots().borrow().clone()
    }

    pub fn request_refresh(&self) {
        self.refresh.request(RefreshTrigger::Manual);
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.handle()
    }
}
