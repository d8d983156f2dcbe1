use anchor_lang::prelude::*;

use crate::error::StakingError;
use crate::math;
use crate::plans::Plan;

/// Lifecycle of a position. Ordered: a position only ever moves to a later
/// variant.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum PositionStatus {
    Active,
    Matured,
    Withdrawn,
}

impl PositionStatus {
    pub fn can_transition_to(self, next: PositionStatus) -> bool {
        next > self
    }

    /// Moves to `next`, rejecting anything that is not strictly forward.
    pub fn transition(self, next: PositionStatus) -> Result<PositionStatus> {
        require!(
            self.can_transition_to(next),
            StakingError::InvalidStatusTransition
        );
        Ok(next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Active => "active",
            PositionStatus::Matured => "matured",
            PositionStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(value: &str) -> Option<PositionStatus> {
        match value {
            "active" => Some(PositionStatus::Active),
            "matured" => Some(PositionStatus::Matured),
            "withdrawn" => Some(PositionStatus::Withdrawn),
            _ => None,
        }
    }
}

/// Result of the `pending_payout` instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingPayout {
    pub principal: u64,
    pub bonus: u64,
    pub matured: bool,
}

#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Kept first so owner lookups can memcmp at [`Position::OWNER_OFFSET`].
    pub owner: Pubkey,
    pub index: u64,
    pub plan_id: u8,

    pub principal: u64,
    pub bonus: u64,

    pub start: i64,
    pub unlock: i64,

    pub withdrawn: bool,
    /// Set when the position exited early and its bonus went back to the pool.
    pub forfeited: bool,
    pub bump: u8,
}

impl Position {
    pub const LEN: usize = 8 + 32 + 8 + 1 + 8 + 8 + 8 + 8 + 1 + 1 + 1;

    /// Byte offset of `owner` in account data (after the discriminator).
    pub const OWNER_OFFSET: usize = 8;

    /// Fills a freshly created position. Bonus and unlock derive from the plan only.
    pub fn open(
        &mut self,
        owner: Pubkey,
        index: u64,
        plan: &Plan,
        principal: u64,
        now: i64,
        bump: u8,
    ) -> Result<()> {
        self.owner = owner;
        self.index = index;
        self.plan_id = plan.id;
        self.principal = principal;
        self.bonus = plan.bonus_for(principal)?;
        self.start = now;
        self.unlock = plan.unlock_at(now)?;
        self.withdrawn = false;
        self.forfeited = false;
        self.bump = bump;
        Ok(())
    }

    pub fn is_matured(&self, now: i64) -> bool {
        now >= self.unlock
    }

    pub fn status(&self, now: i64) -> PositionStatus {
        if self.withdrawn {
            PositionStatus::Withdrawn
        } else if self.is_matured(now) {
            PositionStatus::Matured
        } else {
            PositionStatus::Active
        }
    }

    /// Seconds until unlock, zero once matured.
    pub fn time_to_unlock(&self, now: i64) -> u64 {
        self.unlock.saturating_sub(now).max(0) as u64
    }

    /// What a withdrawal would pay right now. Withdrawn positions owe nothing.
    pub fn pending_payout(&self, now: i64) -> PendingPayout {
        if self.withdrawn {
            return PendingPayout {
                principal: 0,
                bonus: 0,
                matured: true,
            };
        }

        PendingPayout {
            principal: self.principal,
            bonus: self.bonus,
            matured: self.is_matured(now),
        }
    }

    /// Closes a matured position and returns principal + bonus.
    pub fn settle_withdraw(&mut self, now: i64) -> Result<u64> {
        require!(!self.withdrawn, StakingError::AlreadyWithdrawn);
        require!(self.is_matured(now), StakingError::LockPeriodNotEnded);

        let payout = math::mature_payout(self.principal, self.bonus)?;
        self.withdrawn = true;
        Ok(payout)
    }

    /// Closes a position before unlock and returns principal only.
    pub fn settle_emergency(&mut self, now: i64) -> Result<u64> {
        require!(!self.withdrawn, StakingError::AlreadyWithdrawn);
        require!(!self.is_matured(now), StakingError::PositionMatured);

        self.withdrawn = true;
        self.forfeited = true;
        Ok(self.principal)
    }
}
