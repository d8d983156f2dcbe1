//! # Fixed-Term Staking Program
//!
//! Lock native lamports for a fixed period and collect a fixed bonus at
//! maturity. Three plans are available:
//!
//! - **Plan A**: 1-day lock, +20%
//! - **Plan B**: 2-day lock, +50%
//! - **Plan C**: 3-day lock, +100%
//!
//! ## Features
//! - Bonus reserved from a funded rewards pool when the position opens
//! - Withdraw after unlock pays principal + bonus
//! - Emergency withdraw before unlock pays principal only; the bonus goes
//!   back to the pool
//! - Read-only instructions for plan parameters, pending payouts, time to
//!   unlock and pool totals
//! - Admin pause for new stakes
//! - Safe math with overflow protection

use anchor_lang::prelude::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod math;
pub mod plans;
pub mod state;


use instructions::*;
use plans::PlanInfo;
use state::{PendingPayout, PoolTotals};

#[program]
pub mod fixed_term_staking {
    use super::*;

    /// Creates the staking config and seeds the vault.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for initialization
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        instructions::initialize::handler(ctx)
    }

    /// Adds lamports to the rewards pool that backs bonuses.
    ///
    /// # Arguments
    /// * `ctx` - The context containing funding accounts
    /// * `amount` - Lamports to fund
    ///
    /// # Errors
    /// Returns an error if amount is zero or the funder cannot pay.
    pub fn fund_rewards(ctx: Context<FundRewards>, amount: u64) -> Result<()> {
        instructions::fund_rewards::handler(ctx, amount)
    }

    /// Opens a position in the specified plan.
    ///
    /// # Arguments
    /// * `ctx` - The context containing all accounts needed for staking
    /// * `plan_id` - Plan (0 = Plan A, 1 = Plan B, 2 = Plan C)
    /// * `amount` - Principal in lamports
    /// * `position_index` - The staker's next position index
    ///
    /// # Errors
    /// Returns an error if:
    /// - Staking is paused
    /// - Amount is zero
    /// - Invalid plan specified
    /// - Position index is not the staker's next index
    /// - The rewards pool cannot cover the bonus
    pub fn stake(
        ctx: Context<Stake>,
        plan_id: u8,
        amount: u64,
        position_index: u64,
    ) -> Result<()> {
        instructions::stake::handler(ctx, plan_id, amount, position_index)
    }

    /// Closes a matured position, paying principal plus bonus.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Lock period has not ended
    /// - Position was already withdrawn
    pub fn withdraw(ctx: Context<Withdraw>, position_index: u64) -> Result<()> {
        instructions::withdraw::withdraw_handler(ctx, position_index)
    }

    /// Closes a position before unlock, paying principal only.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Position has already matured
    /// - Position was already withdrawn
    pub fn emergency_withdraw(ctx: Context<Withdraw>, position_index: u64) -> Result<()> {
        instructions::withdraw::emergency_withdraw_handler(ctx, position_index)
    }

    /// Returns the duration and bonus basis points of a plan.
    pub fn plan_info(ctx: Context<ReadConfig>, plan_id: u8) -> Result<PlanInfo> {
        instructions::views::plan_info_handler(ctx, plan_id)
    }

    /// Returns the principal, bonus and maturity flag a withdrawal would use.
    pub fn pending_payout(ctx: Context<ReadPosition>, position_index: u64) -> Result<PendingPayout> {
        instructions::views::pending_payout_handler(ctx, position_index)
    }

    /// Returns seconds until the position unlocks (zero once matured).
    pub fn time_to_unlock(ctx: Context<ReadPosition>, position_index: u64) -> Result<u64> {
        instructions::views::time_to_unlock_handler(ctx, position_index)
    }

    /// Returns total principal locked, bonus liability, rewards pool and pause state.
    pub fn pool_totals(ctx: Context<ReadConfig>) -> Result<PoolTotals> {
        instructions::views::pool_totals_handler(ctx)
    }

    /// Admin function to pause or unpause new stakes.
    ///
    /// # Errors
    /// Returns an error if caller is not the admin.
    pub fn set_paused(ctx: Context<AdminControl>, paused: bool) -> Result<()> {
        instructions::admin::set_paused_handler(ctx, paused)
    }

    /// Admin function to transfer authority to a new address.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Caller is not the current admin
    /// - New authority is zero address
    pub fn transfer_authority(ctx: Context<AdminControl>, new_authority: Pubkey) -> Result<()> {
        instructions::admin::transfer_authority_handler(ctx, new_authority)
    }
}
