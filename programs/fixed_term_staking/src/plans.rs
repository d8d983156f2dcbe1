//! The fixed plan table.
//!
//! Bonus rates are stored in basis points, the only unit the program and the
//! client compute with. Whole percentages exist for display only
//! ([`Plan::bonus_percent`]).

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::error::StakingError;
use crate::math;

/// A lock-up duration paired with a fixed bonus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan {
    pub id: u8,
    pub name: &'static str,
    /// Lock period in seconds
    pub duration: i64,
    pub bonus_bps: u16,
}

/// Plan parameters as returned by the `plan_info` instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanInfo {
    pub duration: i64,
    pub bonus_bps: u16,
}

pub const PLANS: [Plan; 3] = [
    Plan {
        id: plan::A,
        name: "Plan A",
        duration: PLAN_A_DURATION,
        bonus_bps: PLAN_A_BONUS_BPS,
    },
    Plan {
        id: plan::B,
        name: "Plan B",
        duration: PLAN_B_DURATION,
        bonus_bps: PLAN_B_BONUS_BPS,
    },
    Plan {
        id: plan::C,
        name: "Plan C",
        duration: PLAN_C_DURATION,
        bonus_bps: PLAN_C_BONUS_BPS,
    },
];

impl Plan {
    /// Looks up a plan by id, returning `None` for unknown ids.
    pub fn lookup(id: u8) -> Option<&'static Plan> {
        PLANS.iter().find(|plan| plan.id == id)
    }

    /// Looks up a plan by id, failing with [`StakingError::InvalidPlan`].
    pub fn from_id(id: u8) -> Result<&'static Plan> {
        Self::lookup(id).ok_or(error!(StakingError::InvalidPlan))
    }

    /// Looks up a plan by its display percentage (20, 50 or 100).
    pub fn from_bonus_percent(percent: u16) -> Option<&'static Plan> {
        PLANS
            .iter()
            .find(|plan| plan.bonus_percent() == percent)
    }

    pub fn bonus_percent(&self) -> u16 {
        self.bonus_bps / BPS_PER_PERCENT
    }

    /// Bonus owed at maturity for `principal`. Fixed at stake time.
    pub fn bonus_for(&self, principal: u64) -> Result<u64> {
        math::bps_of(principal, self.bonus_bps)
    }

    /// Unlock timestamp for a position opened at `start`.
    pub fn unlock_at(&self, start: i64) -> Result<i64> {
        start
            .checked_add(self.duration)
            .ok_or(error!(StakingError::InvalidTimestamp))
    }

    /// Principal plus bonus.
    pub fn payout_at_maturity(&self, principal: u64) -> Result<u64> {
        math::mature_payout(principal, self.bonus_for(principal)?)
    }

    pub fn info(&self) -> PlanInfo {
        PlanInfo {
            duration: self.duration,
            bonus_bps: self.bonus_bps,
        }
    }
}
