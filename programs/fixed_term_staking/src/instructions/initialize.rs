/// Initialize instruction handler.
///
/// Creates the staking config and seeds the lamport vault.
///
/// ## Security Guarantees
/// - The vault is a system-owned PDA only the program can sign for
/// - The vault address is locked to config state permanently
/// - The vault starts rent-exempt so payouts never strand it below the minimum

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};

use crate::constants::*;
use crate::state::StakingConfig;

/// Accounts required for initialization.
///
/// ## Security Notes
/// - `config` is the singleton PDA derived from CONFIG_SEED
/// - `vault` is derived from VAULT_SEED + config and cannot be swapped
#[derive(Accounts)]
pub struct Initialize<'info> {
    /// The admin authority that will control pausing.
    /// SECURITY: This becomes the admin stored in config state.
    #[account(mut)]
    pub authority: Signer<'info>,

    /// The staking config account to be created.
    #[account(
        init,
        payer = authority,
        space = StakingConfig::LEN,
        seeds = [CONFIG_SEED],
        bump
    )]
    pub config: Account<'info, StakingConfig>,

    /// The vault that will hold principal and the rewards pool.
    #[account(
        mut,
        seeds = [VAULT_SEED, config.key().as_ref()],
        bump
    )]
    pub vault: SystemAccount<'info>,

    /// System program for account creation and the rent seed transfer.
    pub system_program: Program<'info, System>,
}

/// Initialize the staking config.
///
/// # Arguments
/// * `ctx` - Initialize accounts context
///
/// # Returns
/// Result indicating success or error
pub fn handler(ctx: Context<Initialize>) -> Result<()> {
    let clock = Clock::get()?;

    // Seed the vault with its rent-exempt minimum
    let rent_floor = Rent::get()?.minimum_balance(0);
    let shortfall = rent_floor.saturating_sub(ctx.accounts.vault.to_account_info().lamports());
    if shortfall > 0 {
        let cpi_accounts = Transfer {
            from: ctx.accounts.authority.to_account_info(),
            to: ctx.accounts.vault.to_account_info(),
        };
        let cpi_program = ctx.accounts.system_program.to_account_info();
        system_program::transfer(CpiContext::new(cpi_program, cpi_accounts), shortfall)?;
    }

    let config = &mut ctx.accounts.config;

    config.authority = ctx.accounts.authority.key();
    config.vault = ctx.accounts.vault.key(); // LOCKED - PDA reference
    config.total_principal_locked = 0;
    config.total_bonus_liability = 0;
    config.rewards_pool = 0;
    config.position_count = 0;
    config.paused = false;
    config.created_at = clock.unix_timestamp;
    config.last_updated = clock.unix_timestamp;

    // Store bumps for PDA verification in future instructions
    config.bump = ctx.bumps.config;
    config.vault_bump = ctx.bumps.vault;

    msg!("Fixed-term staking initialized");
    msg!("Admin: {}", config.authority);
    msg!("Vault: {}", config.vault);

    Ok(())
}
