//! Stake instruction handler.
//!
//! Opens a new fixed-term position for the signer.

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};

use crate::constants::*;
use crate::error::StakingError;
use crate::events::Staked;
use crate::plans::Plan;
use crate::state::{Position, StakerAccount, StakingConfig};

/// Accounts required for staking.
#[derive(Accounts)]
#[instruction(plan_id: u8, amount: u64, position_index: u64)]
pub struct Stake<'info> {
    /// The wallet staking lamports.
    #[account(mut)]
    pub owner: Signer<'info>,

    /// The staking config.
    #[account(
        mut,
        seeds = [CONFIG_SEED],
        bump = config.bump,
        has_one = vault @ StakingError::VaultMismatch
    )]
    pub config: Account<'info, StakingConfig>,

    /// Vault receiving the principal.
    #[account(
        mut,
        seeds = [VAULT_SEED, config.key().as_ref()],
        bump = config.vault_bump
    )]
    pub vault: SystemAccount<'info>,

    /// Staker account (created on first stake).
    #[account(
        init_if_needed,
        payer = owner,
        space = StakerAccount::LEN,
        seeds = [STAKER_SEED, owner.key().as_ref()],
        bump
    )]
    pub staker: Account<'info, StakerAccount>,

    /// The new position, addressed by the staker's next index.
    #[account(
        init,
        payer = owner,
        space = Position::LEN,
        seeds = [POSITION_SEED, owner.key().as_ref(), position_index.to_le_bytes().as_ref()],
        bump
    )]
    pub position: Account<'info, Position>,

    /// System program.
    pub system_program: Program<'info, System>,
}

/// Stake lamports into a plan.
///
/// # Arguments
/// * `ctx` - Stake accounts context
/// * `plan_id` - Plan (0=Plan A, 1=Plan B, 2=Plan C)
/// * `amount` - Principal in lamports
/// * `position_index` - Must equal the staker's next index
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<Stake>, plan_id: u8, amount: u64, position_index: u64) -> Result<()> {
    let plan = Plan::from_id(plan_id)?;
    let owner_key = ctx.accounts.owner.key();
    let clock = Clock::get()?;

    // First stake for this wallet
    let staker = &mut ctx.accounts.staker;
    if staker.owner == Pubkey::default() {
        staker.owner = owner_key;
        staker.position_count = 0;
        staker.bump = ctx.bumps.staker;
    }
    require!(staker.owner == owner_key, StakingError::StakerMismatch);
    require!(
        position_index == staker.next_index(),
        StakingError::PositionIndexMismatch
    );

    // Validates pause state, amount and rewards coverage before funds move
    let bonus = ctx
        .accounts
        .config
        .reserve_stake(plan, amount, clock.unix_timestamp)?;

    // Transfer principal from owner to vault
    let cpi_accounts = Transfer {
        from: ctx.accounts.owner.to_account_info(),
        to: ctx.accounts.vault.to_account_info(),
    };
    let cpi_program = ctx.accounts.system_program.to_account_info();
    system_program::transfer(CpiContext::new(cpi_program, cpi_accounts), amount)?;

    let position = &mut ctx.accounts.position;
    position.open(
        owner_key,
        position_index,
        plan,
        amount,
        clock.unix_timestamp,
        ctx.bumps.position,
    )?;

    let staker = &mut ctx.accounts.staker;
    staker.position_count = staker
        .position_count
        .checked_add(1)
        .ok_or(StakingError::MathOverflow)?;

    emit!(Staked {
        owner: owner_key,
        position_index,
        plan_id,
        principal: amount,
        bonus,
        unlock: position.unlock,
    });

    msg!("Staked {} lamports in {} (position {})", amount, plan.name, position_index);
    msg!("Bonus reserved: {}, unlocks at {}", bonus, position.unlock);

    Ok(())
}
