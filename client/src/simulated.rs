//! In-process execution of the staking program for development and tests.
//!
//! `SimulatedChain` runs every instruction through the program's own state
//! methods (`StakingConfig::reserve_stake`, `Position::settle_withdraw`, ...)
//! against in-memory accounts and a clock that only moves when told to. It
//! stands in for a local validator when exercising a `Session`.

use std::collections::{BTreeMap, HashMap};

use anchor_lang::error::{Error as AnchorError, ErrorCode as AnchorErrorCode};
use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use fixed_term_staking::error::StakingError;
use fixed_term_staking::plans::{Plan, PlanInfo};
use fixed_term_staking::state::{PendingPayout, PoolTotals, Position, StakingConfig};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chain::{Confirmation, StakingChain, StakingInstruction, TxSignature};
use crate::config::Cluster;
use crate::error::{ClientError, Result};

/// Rent-exempt minimum for a zero-data system account.
pub const VAULT_RENT_FLOOR: u64 = 890_880;

fn program_error(err: StakingError) -> ClientError {
    AnchorError::from(err).into()
}

fn missing_account() -> ClientError {
    AnchorError::from(AnchorErrorCode::AccountNotInitialized).into()
}

struct Ledger {
    clock: i64,
    slot: u64,
    config: StakingConfig,
    vault: u64,
    balances: HashMap<Pubkey, u64>,
    positions: BTreeMap<(Pubkey, u64), Position>,
    next_index: HashMap<Pubkey, u64>,
    landed: HashMap<TxSignature, Confirmation>,
    signatures: u64,
    reject_next: bool,
    drop_confirmations: bool,
}

impl Ledger {
    fn debit(&mut self, wallet: &Pubkey, amount: u64) -> Result<()> {
        let balance = self.balances.entry(*wallet).or_insert(0);
        if *balance < amount {
            return Err(ClientError::Chain {
                code: None,
                message: format!("insufficient lamports {}, need {}", balance, amount),
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&mut self, wallet: &Pubkey, amount: u64) {
        let balance = self.balances.entry(*wallet).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn pay_out(&mut self, owner: &Pubkey, amount: u64) -> Result<()> {
        let available = self.vault.saturating_sub(VAULT_RENT_FLOOR);
        if available < amount {
            return Err(program_error(StakingError::InsufficientVaultBalance));
        }
        self.vault -= amount;
        self.credit(owner, amount);
        Ok(())
    }

    fn execute(&mut self, signer: &Pubkey, instruction: StakingInstruction) -> Result<()> {
        let now = self.clock;

        match instruction {
            StakingInstruction::Stake {
                plan_id,
                amount,
                position_index,
            } => {
                let plan = Plan::from_id(plan_id)?;
                let expected = self.next_index.get(signer).copied().unwrap_or(0);
                if position_index != expected {
                    return Err(program_error(StakingError::PositionIndexMismatch));
                }

                let mut config = self.config.clone();
                config.reserve_stake(plan, amount, now)?;

                let mut position = Position::default();
                position.open(*signer, position_index, plan, amount, now, 0)?;

                self.debit(signer, amount)?;
                self.vault = self.vault.saturating_add(amount);
                self.config = config;
                self.positions.insert((*signer, position_index), position);
                self.next_index.insert(*signer, expected + 1);
            }
            StakingInstruction::Withdraw { position_index } => {
                let mut position = self
                    .positions
                    .get(&(*signer, position_index))
                    .cloned()
                    .ok_or_else(missing_account)?;
                let payout = position.settle_withdraw(now)?;

                let mut config = self.config.clone();
                config.release_matured(position.principal, position.bonus, now)?;

                self.pay_out(signer, payout)?;
                self.config = config;
                self.positions.insert((*signer, position_index), position);
            }
            StakingInstruction::EmergencyWithdraw { position_index } => {
                let mut position = self
                    .positions
                    .get(&(*signer, position_index))
                    .cloned()
                    .ok_or_else(missing_account)?;
                let payout = position.settle_emergency(now)?;

                let mut config = self.config.clone();
                config.release_forfeited(position.principal, position.bonus, now)?;

                self.pay_out(signer, payout)?;
                self.config = config;
                self.positions.insert((*signer, position_index), position);
            }
        }

        Ok(())
    }

    fn position(&self, owner: &Pubkey, position_index: u64) -> Result<&Position> {
        self.positions
            .get(&(*owner, position_index))
            .ok_or_else(missing_account)
    }
}

/// The staking program running in memory.
pub struct SimulatedChain {
    cluster: Cluster,
    ledger: Mutex<Ledger>,
}

impl SimulatedChain {
    /// An initialized program owned by `authority`, with the clock at `now`.
    pub fn new(cluster: Cluster, authority: Pubkey, now: i64) -> Self {
        let config = StakingConfig {
            authority,
            created_at: now,
            last_updated: now,
            ..StakingConfig::default()
        };

        Self {
            cluster,
            ledger: Mutex::new(Ledger {
                clock: now,
                slot: 1,
                config,
                vault: VAULT_RENT_FLOOR,
                balances: HashMap::new(),
                positions: BTreeMap::new(),
                next_index: HashMap::new(),
                landed: HashMap::new(),
                signatures: 0,
                reject_next: false,
                drop_confirmations: false,
            }),
        }
    }

    /// Credits `lamports` to `wallet`.
    pub async fn airdrop(&self, wallet: &Pubkey, lamports: u64) {
        self.ledger.lock().await.credit(wallet, lamports);
    }

    pub async fn balance(&self, wallet: &Pubkey) -> u64 {
        self.ledger
            .lock()
            .await
            .balances
            .get(wallet)
            .copied()
            .unwrap_or(0)
    }

    pub async fn vault_balance(&self) -> u64 {
        self.ledger.lock().await.vault
    }

    /// Moves cluster time forward by `secs`.
    pub async fn advance_time(&self, secs: i64) -> i64 {
        let mut ledger = self.ledger.lock().await;
        ledger.clock = ledger.clock.saturating_add(secs);
        debug!("Simulated clock advanced {}s to {}", secs, ledger.clock);
        ledger.clock
    }

    /// Permissionless top-up of the rewards pool from `funder`.
    pub async fn fund_rewards(&self, funder: &Pubkey, amount: u64) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        let now = ledger.clock;

        let mut config = ledger.config.clone();
        config.add_rewards(amount, now)?;
        ledger.debit(funder, amount)?;
        ledger.vault = ledger.vault.saturating_add(amount);
        ledger.config = config;

        info!("Rewards pool funded with {} lamports", amount);
        Ok(())
    }

    pub async fn set_paused(&self, authority: &Pubkey, paused: bool) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        if ledger.config.authority != *authority {
            return Err(program_error(StakingError::Unauthorized));
        }
        ledger.config.paused = paused;
        ledger.config.last_updated = ledger.clock;
        Ok(())
    }

    pub async fn transfer_authority(&self, authority: &Pubkey, new_authority: Pubkey) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        if ledger.config.authority != *authority {
            return Err(program_error(StakingError::Unauthorized));
        }
        let now = ledger.clock;
        ledger.config.transfer_authority(new_authority, now)?;
        Ok(())
    }

    pub async fn config(&self) -> StakingConfig {
        self.ledger.lock().await.config.clone()
    }

    /// The next submission fails as if the user declined to sign.
    pub async fn reject_next_submission(&self) {
        self.ledger.lock().await.reject_next = true;
    }

    /// While set, transactions still land but confirmation never arrives.
    pub async fn drop_confirmations(&self, drop: bool) {
        self.ledger.lock().await.drop_confirmations = drop;
    }
}

#[async_trait]
impl StakingChain for SimulatedChain {
    async fn cluster(&self) -> Result<Cluster> {
        Ok(self.cluster)
    }

    async fn unix_timestamp(&self) -> Result<i64> {
        Ok(self.ledger.lock().await.clock)
    }

    async fn next_position_index(&self, owner: &Pubkey) -> Result<u64> {
        Ok(self
            .ledger
            .lock()
            .await
            .next_index
            .get(owner)
            .copied()
            .unwrap_or(0))
    }

    async fn submit(&self, signer: &Pubkey, instruction: StakingInstruction) -> Result<TxSignature> {
        let mut ledger = self.ledger.lock().await;
        if ledger.reject_next {
            ledger.reject_next = false;
            return Err(ClientError::Rejected);
        }

        ledger.execute(signer, instruction)?;

        ledger.signatures += 1;
        ledger.slot += 1;
        let signature = TxSignature(format!("sim{:016x}", ledger.signatures));
        let confirmation = Confirmation {
            signature: signature.clone(),
            slot: ledger.slot,
            block_time: ledger.clock,
        };
        ledger.landed.insert(signature.clone(), confirmation);

        debug!(
            "Simulated {} for position {} landed as {}",
            instruction.name(),
            instruction.position_index(),
            signature
        );
        Ok(signature)
    }

    async fn confirm(&self, signature: &TxSignature) -> Result<Confirmation> {
        let ledger = self.ledger.lock().await;
        if ledger.drop_confirmations {
            return Err(ClientError::Confirmation(format!(
                "timed out waiting for {}",
                signature
            )));
        }
        ledger
            .landed
            .get(signature)
            .cloned()
            .ok_or_else(|| ClientError::Confirmation(format!("unknown signature {}", signature)))
    }

    async fn positions_of(&self, owner: &Pubkey) -> Result<Vec<Position>> {
        Ok(self
            .ledger
            .lock()
            .await
            .positions
            .iter()
            .filter(|((key, _), _)| key == owner)
            .map(|(_, position)| position.clone())
            .collect())
    }

    async fn plan_info(&self, plan_id: u8) -> Result<PlanInfo> {
        Ok(Plan::from_id(plan_id)?.info())
    }

    async fn pending_payout(&self, owner: &Pubkey, position_index: u64) -> Result<PendingPayout> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.position(owner, position_index)?.pending_payout(ledger.clock))
    }

    async fn time_to_unlock(&self, owner: &Pubkey, position_index: u64) -> Result<u64> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.position(owner, position_index)?.time_to_unlock(ledger.clock))
    }

    async fn pool_totals(&self) -> Result<PoolTotals> {
        Ok(self.ledger.lock().await.config.totals())
    }
}
