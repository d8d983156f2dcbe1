//! The seam between a session and the staking program.
//!
//! Implementations wrap an RPC connection and a wallet signer. Submission and
//! confirmation are separate steps so callers can record a signature before
//! waiting on it.

use std::fmt;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use fixed_term_staking::plans::PlanInfo;
use fixed_term_staking::state::{PendingPayout, PoolTotals, Position, PositionStatus};
use serde::{Deserialize, Serialize};

use crate::config::Cluster;
use crate::error::Result;

/// Transaction signature as returned by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSignature(pub String);

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mutating program instruction, signed by the session wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingInstruction {
    Stake {
        plan_id: u8,
        amount: u64,
        position_index: u64,
    },
    Withdraw {
        position_index: u64,
    },
    EmergencyWithdraw {
        position_index: u64,
    },
}

impl StakingInstruction {
    pub fn position_index(&self) -> u64 {
        match self {
            StakingInstruction::Stake { position_index, .. }
            | StakingInstruction::Withdraw { position_index }
            | StakingInstruction::EmergencyWithdraw { position_index } => *position_index,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StakingInstruction::Stake { .. } => "stake",
            StakingInstruction::Withdraw { .. } => "withdraw",
            StakingInstruction::EmergencyWithdraw { .. } => "emergency_withdraw",
        }
    }
}

/// A confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub signature: TxSignature,
    pub slot: u64,
    /// Cluster time of the block that included the transaction
    pub block_time: i64,
}

/// An on-chain position with its status resolved against cluster time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPosition {
    pub position: Position,
    pub status: PositionStatus,
    pub is_matured: bool,
}

impl ChainPosition {
    pub fn resolve(position: Position, now: i64) -> Self {
        Self {
            status: position.status(now),
            is_matured: position.is_matured(now),
            position,
        }
    }
}

/// Access to the staking program for one wallet connection.
#[async_trait]
pub trait StakingChain: Send + Sync {
    /// Cluster the connection is attached to.
    async fn cluster(&self) -> Result<Cluster>;

    /// Current cluster time (latest block), unix seconds.
    async fn unix_timestamp(&self) -> Result<i64>;

    /// Index the next stake by `owner` must use.
    async fn next_position_index(&self, owner: &Pubkey) -> Result<u64>;

    /// Signs and submits `instruction` as `signer`. Fails if the wallet
    /// rejects, preflight fails or the RPC call errors. A transport error may
    /// come after the transaction was broadcast.
    async fn submit(&self, signer: &Pubkey, instruction: StakingInstruction) -> Result<TxSignature>;

    /// Waits until `signature` is confirmed.
    async fn confirm(&self, signature: &TxSignature) -> Result<Confirmation>;

    /// All positions owned by `owner`, ordered by index.
    async fn positions_of(&self, owner: &Pubkey) -> Result<Vec<Position>>;

    async fn plan_info(&self, plan_id: u8) -> Result<PlanInfo>;

    async fn pending_payout(&self, owner: &Pubkey, position_index: u64) -> Result<PendingPayout>;

    async fn time_to_unlock(&self, owner: &Pubkey, position_index: u64) -> Result<u64>;

    async fn pool_totals(&self) -> Result<PoolTotals>;
}
