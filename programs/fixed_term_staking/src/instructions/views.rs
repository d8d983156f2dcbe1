//! Read-only instructions.
//!
//! Each returns its result through Anchor return data so clients can simulate
//! the instruction instead of decoding accounts themselves.

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::error::StakingError;
use crate::plans::{Plan, PlanInfo};
use crate::state::{PendingPayout, PoolTotals, Position, StakingConfig};

/// Accounts for config-level reads.
#[derive(Accounts)]
pub struct ReadConfig<'info> {
    #[account(seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, StakingConfig>,
}

/// Accounts for position-level reads.
#[derive(Accounts)]
#[instruction(position_index: u64)]
pub struct ReadPosition<'info> {
    /// CHECK: only used as a PDA seed and matched against position.owner
    pub owner: UncheckedAccount<'info>,

    #[account(
        seeds = [POSITION_SEED, owner.key().as_ref(), position_index.to_le_bytes().as_ref()],
        bump = position.bump,
        has_one = owner @ StakingError::InvalidPositionOwner
    )]
    pub position: Account<'info, Position>,
}

pub fn plan_info_handler(_ctx: Context<ReadConfig>, plan_id: u8) -> Result<PlanInfo> {
    Ok(Plan::from_id(plan_id)?.info())
}

pub fn pool_totals_handler(ctx: Context<ReadConfig>) -> Result<PoolTotals> {
    Ok(ctx.accounts.config.totals())
}

pub fn pending_payout_handler(
    ctx: Context<ReadPosition>,
    _position_index: u64,
) -> Result<PendingPayout> {
    let clock = Clock::get()?;
    Ok(ctx.accounts.position.pending_payout(clock.unix_timestamp))
}

pub fn time_to_unlock_handler(ctx: Context<ReadPosition>, _position_index: u64) -> Result<u64> {
    let clock = Clock::get()?;
    Ok(ctx.accounts.position.time_to_unlock(clock.unix_timestamp))
}
