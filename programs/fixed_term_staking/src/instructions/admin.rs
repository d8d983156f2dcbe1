/// Admin instruction handlers.
///
/// Handles admin-only operations on the staking config.
///
/// ## Security Guarantees
/// - All admin functions require signer == config.authority
/// - PDA validation ensures the correct config

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::error::StakingError;
use crate::events::{AuthorityTransferred, PauseChanged};
use crate::state::StakingConfig;

/// Accounts required for admin operations.
///
/// ## Security Notes
/// - Authority must be signer
/// - Authority must match config.authority (has_one constraint)
#[derive(Accounts)]
pub struct AdminControl<'info> {
    /// The admin authority.
    /// SECURITY: Must be signer AND match config.authority.
    #[account(mut)]
    pub authority: Signer<'info>,

    /// The staking config to modify.
    #[account(
        mut,
        seeds = [CONFIG_SEED],
        bump = config.bump,
        has_one = authority @ StakingError::Unauthorized
    )]
    pub config: Account<'info, StakingConfig>,
}

/// Set the paused state.
///
/// # Security
/// - Only config.authority can call this
/// - When paused, new stakes are blocked
/// - Withdrawals remain available (user funds never locked by a pause)
///
/// # Arguments
/// * `ctx` - AdminControl accounts context
/// * `paused` - True to pause, false to unpause
///
/// # Returns
/// Result indicating success or error
pub fn set_paused_handler(ctx: Context<AdminControl>, paused: bool) -> Result<()> {
    let config = &mut ctx.accounts.config;
    let clock = Clock::get()?;

    let previous_state = config.paused;
    config.paused = paused;
    config.last_updated = clock.unix_timestamp;

    emit!(PauseChanged {
        authority: ctx.accounts.authority.key(),
        paused,
    });

    msg!(
        "Staking {} (was {})",
        if paused { "PAUSED" } else { "RESUMED" },
        if previous_state { "paused" } else { "active" }
    );
    msg!("Admin: {}", ctx.accounts.authority.key());

    Ok(())
}

/// Transfer admin authority to a new address.
///
/// # Security
/// - Only current authority can call this
/// - New authority must be a valid pubkey (non-zero)
///
/// # Arguments
/// * `ctx` - AdminControl accounts context
/// * `new_authority` - New admin pubkey
///
/// # Returns
/// Result indicating success or error
pub fn transfer_authority_handler(
    ctx: Context<AdminControl>,
    new_authority: Pubkey,
) -> Result<()> {
    let config = &mut ctx.accounts.config;
    let clock = Clock::get()?;

    let previous_authority = config.transfer_authority(new_authority, clock.unix_timestamp)?;

    emit!(AuthorityTransferred {
        previous_authority,
        new_authority,
    });

    msg!("Authority transferred: {} -> {}", previous_authority, new_authority);

    Ok(())
}
