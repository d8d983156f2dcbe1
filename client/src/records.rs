//! Rows of the mirror's `positions` and `activities` tables.
//!
//! Column names follow the hosted schema (`wallet_address`, `plan_id`,
//! `principal_amount`, ...). Amounts are lamports, timestamps unix seconds.

use std::fmt;

use anchor_lang::prelude::Pubkey;
use fixed_term_staking::plans::Plan;
use fixed_term_staking::state::PositionStatus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ClientError, Result};

/// Mirror tables that support change subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorTable {
    Positions,
    Activities,
}

/// Activity log event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    WalletConnected,
    WalletDisconnected,
    StakeAdded,
    PositionMatured,
    RewardClaimed,
    EmergencyWithdrawn,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::WalletConnected => "walletConnected",
            ActivityKind::WalletDisconnected => "walletDisconnected",
            ActivityKind::StakeAdded => "stakeAdded",
            ActivityKind::PositionMatured => "positionMatured",
            ActivityKind::RewardClaimed => "rewardClaimed",
            ActivityKind::EmergencyWithdrawn => "emergencyWithdrawn",
        };
        f.write_str(name)
    }
}

/// A mirrored position as stored in the `positions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: u64,
    #[serde(with = "pubkey_str")]
    pub wallet_address: Pubkey,
    pub plan_id: u8,
    pub principal_amount: u64,
    pub bonus_amount: u64,
    pub unlock_at: i64,
    #[serde(with = "status_str")]
    pub status: PositionStatus,
    pub position_index: u64,
    pub created_at: i64,
}

impl PositionRecord {
    /// Checks a status change for this row.
    ///
    /// `Ok(false)` when the row already has `next`, an error when `next` would
    /// move it backwards.
    pub fn check_transition(&self, next: PositionStatus) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(ClientError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(true)
    }

    /// Principal plus bonus; what this position returns if held to maturity.
    pub fn gross_amount(&self) -> u64 {
        self.principal_amount.saturating_add(self.bonus_amount)
    }

    pub fn is_unlocked(&self, now: i64) -> bool {
        now >= self.unlock_at
    }
}

/// Insert payload for the `positions` table.
///
/// Only constructible through [`NewPosition::derive`], so bonus and unlock
/// always come from the plan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPosition {
    #[serde(with = "pubkey_str")]
    wallet_address: Pubkey,
    plan_id: u8,
    principal_amount: u64,
    bonus_amount: u64,
    unlock_at: i64,
    position_index: u64,
    created_at: i64,
}

impl NewPosition {
    /// Builds the mirror row for a stake confirmed at `created_at`.
    pub fn derive(
        wallet: Pubkey,
        plan_id: u8,
        principal: u64,
        position_index: u64,
        created_at: i64,
    ) -> Result<Self> {
        let plan = Plan::lookup(plan_id).ok_or(ClientError::InvalidPlan(plan_id))?;
        if principal == 0 {
            return Err(ClientError::InvalidAmount("principal must be positive".into()));
        }

        Ok(Self {
            wallet_address: wallet,
            plan_id,
            principal_amount: principal,
            bonus_amount: plan.bonus_for(principal)?,
            unlock_at: plan.unlock_at(created_at)?,
            position_index,
            created_at,
        })
    }

    pub fn wallet_address(&self) -> &Pubkey {
        &self.wallet_address
    }

    pub fn plan_id(&self) -> u8 {
        self.plan_id
    }

    pub fn principal_amount(&self) -> u64 {
        self.principal_amount
    }

    pub fn bonus_amount(&self) -> u64 {
        self.bonus_amount
    }

    pub fn unlock_at(&self) -> i64 {
        self.unlock_at
    }

    pub fn position_index(&self) -> u64 {
        self.position_index
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// The stored row, once the store has assigned an id. New rows are Active.
    pub fn into_record(self, id: u64) -> PositionRecord {
        PositionRecord {
            id,
            wallet_address: self.wallet_address,
            plan_id: self.plan_id,
            principal_amount: self.principal_amount,
            bonus_amount: self.bonus_amount,
            unlock_at: self.unlock_at,
            status: PositionStatus::Active,
            position_index: self.position_index,
            created_at: self.created_at,
        }
    }
}

/// A row of the append-only `activities` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: u64,
    #[serde(with = "pubkey_str")]
    pub wallet_address: Pubkey,
    pub event_type: ActivityKind,
    pub metadata: Value,
    pub created_at: i64,
}

/// Insert payload for the `activities` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    #[serde(with = "pubkey_str")]
    pub wallet_address: Pubkey,
    pub event_type: ActivityKind,
    pub metadata: Value,
    pub created_at: i64,
}

impl NewActivity {
    pub fn new(wallet: Pubkey, kind: ActivityKind, metadata: Value, created_at: i64) -> Self {
        Self {
            wallet_address: wallet,
            event_type: kind,
            metadata,
            created_at,
        }
    }

    pub fn wallet_connected(wallet: Pubkey, now: i64) -> Self {
        Self::new(wallet, ActivityKind::WalletConnected, json!({ "connected_at": now }), now)
    }

    pub fn wallet_disconnected(wallet: Pubkey, now: i64) -> Self {
        Self::new(
            wallet,
            ActivityKind::WalletDisconnected,
            json!({ "disconnected_at": now }),
            now,
        )
    }

    /// `signature` is `None` when the row is rebuilt from chain state alone.
    pub fn stake_added(position: &NewPosition, signature: Option<&str>) -> Self {
        Self::new(
            position.wallet_address,
            ActivityKind::StakeAdded,
            json!({
                "position_index": position.position_index,
                "plan_id": position.plan_id,
                "principal_amount": position.principal_amount,
                "bonus_amount": position.bonus_amount,
                "unlock_at": position.unlock_at,
                "signature": signature,
            }),
            position.created_at,
        )
    }

    pub fn position_matured(record: &PositionRecord, now: i64) -> Self {
        Self::new(
            record.wallet_address,
            ActivityKind::PositionMatured,
            json!({
                "position_index": record.position_index,
                "unlock_at": record.unlock_at,
            }),
            now,
        )
    }

    /// A normal withdrawal paid principal and bonus.
    pub fn reward_claimed(
        wallet: Pubkey,
        position_index: u64,
        payout: Option<u64>,
        signature: Option<&str>,
        now: i64,
    ) -> Self {
        Self::new(
            wallet,
            ActivityKind::RewardClaimed,
            json!({
                "position_index": position_index,
                "payout": payout,
                "signature": signature,
            }),
            now,
        )
    }

    pub fn emergency_withdrawn(
        wallet: Pubkey,
        position_index: u64,
        payout: Option<u64>,
        signature: Option<&str>,
        now: i64,
    ) -> Self {
        Self::new(
            wallet,
            ActivityKind::EmergencyWithdrawn,
            json!({
                "position_index": position_index,
                "payout": payout,
                "signature": signature,
            }),
            now,
        )
    }

    pub fn into_record(self, id: u64) -> ActivityRecord {
        ActivityRecord {
            id,
            wallet_address: self.wallet_address,
            event_type: self.event_type,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

/// Serializes a `Pubkey` as its base58 string.
pub(crate) mod pubkey_str {
    use std::str::FromStr;

    use anchor_lang::prelude::Pubkey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let value = String::deserialize(deserializer)?;
        Pubkey::from_str(&value).map_err(D::Error::custom)
    }
}

/// Serializes a `PositionStatus` as `active`/`matured`/`withdrawn`.
pub(crate) mod status_str {
    use fixed_term_staking::state::PositionStatus;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        status: &PositionStatus,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(status.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PositionStatus, D::Error> {
        let value = String::deserialize(deserializer)?;
        PositionStatus::parse(&value)
            .ok_or_else(|| D::Error::custom(format!("unknown position status '{}'", value)))
    }
}
