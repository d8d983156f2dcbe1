//! Withdraw and emergency withdraw instruction handlers.
//!
//! Both close a position and pay out of the vault; they differ in whether the
//! lock must have ended and whether the bonus is paid.

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Transfer};

use crate::constants::*;
use crate::error::StakingError;
use crate::events::{EmergencyWithdrawn, Withdrawn};
use crate::state::{Position, StakingConfig};

/// Accounts required for closing a position.
#[derive(Accounts)]
#[instruction(position_index: u64)]
pub struct Withdraw<'info> {
    /// The position owner receiving the payout.
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

    /// Vault paying out.
    #[account(
        mut,
        seeds = [VAULT_SEED, config.key().as_ref()],
        bump = config.vault_bump
    )]
    pub vault: SystemAccount<'info>,

    /// The position being closed.
    #[account(
        mut,
        seeds = [POSITION_SEED, owner.key().as_ref(), position_index.to_le_bytes().as_ref()],
        bump = position.bump,
        has_one = owner @ StakingError::InvalidPositionOwner
    )]
    pub position: Account<'info, Position>,

    /// System program.
    pub system_program: Program<'info, System>,
}

impl<'info> Withdraw<'info> {
    /// Moves `amount` lamports from the vault to the owner, signing as the vault PDA.
    fn pay_out(&self, amount: u64) -> Result<()> {
        let rent_floor = Rent::get()?.minimum_balance(0);
        let available = self.vault.to_account_info().lamports().saturating_sub(rent_floor);
        require!(available >= amount, StakingError::InsufficientVaultBalance);

        let config_key = self.config.key();
        let seeds = &[
            VAULT_SEED,
            config_key.as_ref(),
            &[self.config.vault_bump],
        ];
        let signer_seeds = &[&seeds[..]];

        let cpi_accounts = Transfer {
            from: self.vault.to_account_info(),
            to: self.owner.to_account_info(),
        };
        let cpi_program = self.system_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);
        system_program::transfer(cpi_ctx, amount)
    }
}

/// Withdraw a matured position.
///
/// Pays principal plus bonus. Fails before the unlock time.
///
/// # Arguments
/// * `ctx` - Withdraw accounts context
/// * `position_index` - Index of the position to close
///
/// # Returns
/// Result indicating success or error
pub fn withdraw_handler(ctx: Context<Withdraw>, position_index: u64) -> Result<()> {
    let clock = Clock::get()?;

    let position = &mut ctx.accounts.position;
    let (principal, bonus) = (position.principal, position.bonus);
    let payout = position.settle_withdraw(clock.unix_timestamp)?;

    ctx.accounts
        .config
        .release_matured(principal, bonus, clock.unix_timestamp)?;
    ctx.accounts.pay_out(payout)?;

    emit!(Withdrawn {
        owner: ctx.accounts.owner.key(),
        position_index,
        payout,
    });

    msg!("Withdrew position {}: {} lamports", position_index, payout);
    msg!("Principal locked: {}", ctx.accounts.config.total_principal_locked);

    Ok(())
}

/// Exit a position before its unlock time.
///
/// Pays principal only; the reserved bonus returns to the rewards pool.
///
/// # Arguments
/// * `ctx` - Withdraw accounts context
/// * `position_index` - Index of the position to close
///
/// # Returns
/// Result indicating success or error
pub fn emergency_withdraw_handler(ctx: Context<Withdraw>, position_index: u64) -> Result<()> {
    let clock = Clock::get()?;

    let position = &mut ctx.accounts.position;
    let (principal, bonus) = (position.principal, position.bonus);
    let payout = position.settle_emergency(clock.unix_timestamp)?;

    ctx.accounts
        .config
        .release_forfeited(principal, bonus, clock.unix_timestamp)?;
    ctx.accounts.pay_out(payout)?;

    emit!(EmergencyWithdrawn {
        owner: ctx.accounts.owner.key(),
        position_index,
        payout,
        forfeited_bonus: bonus,
    });

    msg!("Emergency withdrew position {}: {} lamports", position_index, payout);
    msg!("Bonus {} returned to rewards pool", bonus);

    Ok(())
}
