use anchor_lang::prelude::*;

use crate::error::StakingError;
use crate::math::{checked_add_u64, checked_sub_u64};
use crate::plans::Plan;

#[account]
#[derive(Debug, Default)]
pub struct StakingConfig {
    pub authority: Pubkey,
    pub vault: Pubkey,

    pub total_principal_locked: u64,
    pub total_bonus_liability: u64,
    /// Unreserved reward lamports. Bonuses are moved out of here into
    /// `total_bonus_liability` when a position opens.
    pub rewards_pool: u64,
    pub position_count: u64,

    pub paused: bool,

    pub created_at: i64,
    pub last_updated: i64,

    pub vault_bump: u8,
    pub bump: u8,
}

/// Aggregate accessors returned by the `pool_totals` instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolTotals {
    pub total_principal_locked: u64,
    pub total_bonus_liability: u64,
    pub rewards_pool: u64,
    pub paused: bool,
}

impl StakingConfig {
    pub const LEN: usize = 8
        + (32 * 2)
        + (8 * 4)
        + 1
        + (8 * 2)
        + 2;

    /// Books a new stake: reserves its bonus from the rewards pool and locks
    /// the principal. Returns the reserved bonus.
    pub fn reserve_stake(&mut self, plan: &Plan, amount: u64, now: i64) -> Result<u64> {
        require!(!self.paused, StakingError::StakingPaused);
        require!(amount > 0, StakingError::ZeroAmount);

        let bonus = plan.bonus_for(amount)?;
        require!(
            self.rewards_pool >= bonus,
            StakingError::InsufficientRewardsPool
        );

        self.rewards_pool = checked_sub_u64(self.rewards_pool, bonus)?;
        self.total_bonus_liability = checked_add_u64(self.total_bonus_liability, bonus)?;
        self.total_principal_locked = checked_add_u64(self.total_principal_locked, amount)?;
        self.position_count = checked_add_u64(self.position_count, 1)?;
        self.last_updated = now;

        Ok(bonus)
    }

    /// Releases a matured position: principal and bonus both leave the vault.
    pub fn release_matured(&mut self, principal: u64, bonus: u64, now: i64) -> Result<()> {
        self.total_principal_locked = checked_sub_u64(self.total_principal_locked, principal)?;
        self.total_bonus_liability = checked_sub_u64(self.total_bonus_liability, bonus)?;
        self.last_updated = now;
        Ok(())
    }

    /// Releases an early exit: principal leaves, the bonus returns to the pool.
    pub fn release_forfeited(&mut self, principal: u64, bonus: u64, now: i64) -> Result<()> {
        self.total_principal_locked = checked_sub_u64(self.total_principal_locked, principal)?;
        self.total_bonus_liability = checked_sub_u64(self.total_bonus_liability, bonus)?;
        self.rewards_pool = checked_add_u64(self.rewards_pool, bonus)?;
        self.last_updated = now;
        Ok(())
    }

    pub fn add_rewards(&mut self, amount: u64, now: i64) -> Result<()> {
        require!(amount > 0, StakingError::ZeroAmount);
        self.rewards_pool = checked_add_u64(self.rewards_pool, amount)?;
        self.last_updated = now;
        Ok(())
    }

    /// Hands the config to `new_authority`. Returns the previous authority.
    pub fn transfer_authority(&mut self, new_authority: Pubkey, now: i64) -> Result<Pubkey> {
        require!(
            new_authority != Pubkey::default(),
            StakingError::Unauthorized
        );
        let previous = self.authority;
        self.authority = new_authority;
        self.last_updated = now;
        Ok(previous)
    }

    pub fn totals(&self) -> PoolTotals {
        PoolTotals {
            total_principal_locked: self.total_principal_locked,
            total_bonus_liability: self.total_bonus_liability,
            rewards_pool: self.rewards_pool,
            paused: self.paused,
        }
    }
}
