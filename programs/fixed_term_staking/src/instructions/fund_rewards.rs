/// Fund rewards instruction handler.
///
/// Handles depositing lamports into the rewards pool.
///
/// ## Security Guarantees
/// - Vault validation ensures the correct PDA
/// - Anyone can fund (no admin restriction)

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};

use crate::constants::*;
use crate::error::StakingError;
use crate::events::RewardsFunded;
use crate::state::StakingConfig;

/// Accounts required for funding the rewards pool.
#[derive(Accounts)]
pub struct FundRewards<'info> {
    /// The funder (anyone can fund - no admin restriction).
    #[account(mut)]
    pub funder: Signer<'info>,

    /// The staking config.
    /// SECURITY: PDA + has_one validations.
    #[account(
        mut,
        seeds = [CONFIG_SEED],
        bump = config.bump,
        has_one = vault @ StakingError::VaultMismatch
    )]
    pub config: Account<'info, StakingConfig>,

    /// The vault holding the rewards pool.
    #[account(
        mut,
        seeds = [VAULT_SEED, config.key().as_ref()],
        bump = config.vault_bump
    )]
    pub vault: SystemAccount<'info>,

    /// System program.
    pub system_program: Program<'info, System>,
}

/// Fund the rewards pool.
///
/// # Arguments
/// * `ctx` - FundRewards accounts context
/// * `amount` - Lamports to add to the pool
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<FundRewards>, amount: u64) -> Result<()> {
    // === INPUT VALIDATION ===

    require!(amount > 0, StakingError::ZeroAmount);

    // === TRANSFER ===

    let cpi_accounts = Transfer {
        from: ctx.accounts.funder.to_account_info(),
        to: ctx.accounts.vault.to_account_info(),
    };
    let cpi_program = ctx.accounts.system_program.to_account_info();
    system_program::transfer(CpiContext::new(cpi_program, cpi_accounts), amount)?;

    // === STATE UPDATE ===

    let clock = Clock::get()?;
    let config = &mut ctx.accounts.config;
    config.add_rewards(amount, clock.unix_timestamp)?;

    emit!(RewardsFunded {
        funder: ctx.accounts.funder.key(),
        amount,
        rewards_pool: config.rewards_pool,
    });

    msg!("Rewards pool funded with {} lamports", amount);
    msg!("New rewards pool: {}", config.rewards_pool);
    msg!("Funder: {}", ctx.accounts.funder.key());

    Ok(())
}
