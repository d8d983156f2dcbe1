//! Error types for the Fixed-Term Staking program.
//!
//! This module defines all custom error codes that can be returned by the program.
//! Each error has a unique code and descriptive message.
//!
//! ## Error Code Ranges
//! - 6000-6009: Input validation errors
//! - 6010-6019: State/balance errors
//! - 6020-6029: Time/lock errors
//! - 6030-6039: Math/overflow errors
//! - 6040-6049: Authorization errors
//! - 6050-6059: Account validation errors

use anchor_lang::prelude::*;

/// Custom error codes for the Fixed-Term Staking program.
///
/// Error codes start at 6000 (Anchor's custom error offset).
#[error_code]
pub enum StakingError {
    // ========== Input Validation Errors (6000-6009) ==========

    /// [6000] Staking operations are currently paused by admin.
    #[msg("Staking is currently paused")]
    StakingPaused,

    /// [6001] The specified plan is not valid (must be 0, 1, or 2).
    #[msg("Invalid plan specified (must be 0=Plan A, 1=Plan B, 2=Plan C)")]
    InvalidPlan,

    /// [6002] Cannot stake or fund with zero amount.
    #[msg("Amount must be greater than zero")]
    ZeroAmount,

    /// [6003] Position index does not match the staker's next index.
    #[msg("Position index does not match the next position for this staker")]
    PositionIndexMismatch,

    // ========== State/Balance Errors (6010-6019) ==========

    /// [6010] The unreserved rewards pool cannot cover the bonus for this stake.
    #[msg("Rewards pool cannot cover the bonus for this stake")]
    InsufficientRewardsPool,

    /// [6011] Position was already withdrawn.
    #[msg("Position has already been withdrawn")]
    AlreadyWithdrawn,

    /// [6012] The vault does not hold enough lamports for the payout.
    #[msg("Vault balance is insufficient for this payout")]
    InsufficientVaultBalance,

    /// [6013] Requested status change would move a position backwards.
    #[msg("Position status can only move forward")]
    InvalidStatusTransition,

    // ========== Time/Lock Errors (6020-6029) ==========

    /// [6020] The lock period has not yet ended for this position.
    #[msg("Lock period has not ended - use emergency withdraw to exit early")]
    LockPeriodNotEnded,

    /// [6021] The position has matured; emergency withdraw would forfeit a payable bonus.
    #[msg("Position has matured - use withdraw instead")]
    PositionMatured,

    /// [6022] Invalid timestamp detected (clock skew or manipulation).
    #[msg("Invalid timestamp detected")]
    InvalidTimestamp,

    // ========== Math/Overflow Errors (6030-6039) ==========

    /// [6030] Arithmetic overflow occurred during calculation.
    #[msg("Arithmetic overflow occurred during calculation")]
    MathOverflow,

    /// [6031] Arithmetic underflow occurred during calculation.
    #[msg("Arithmetic underflow occurred during calculation")]
    MathUnderflow,

    /// [6032] Integer conversion failed (value out of range).
    #[msg("Integer conversion failed - value out of range")]
    ConversionOverflow,

    // ========== Authorization Errors (6040-6049) ==========

    /// [6040] Unauthorized - caller is not the admin.
    #[msg("Unauthorized: caller is not the staking authority")]
    Unauthorized,

    /// [6041] Unauthorized - signer does not own the position.
    #[msg("Unauthorized: signer does not own this position")]
    InvalidPositionOwner,

    // ========== Account Validation Errors (6050-6059) ==========

    /// [6050] The provided vault does not match the config's vault.
    #[msg("Vault address mismatch")]
    VaultMismatch,

    /// [6051] Staker account does not belong to the signer.
    #[msg("Staker account does not belong to this wallet")]
    StakerMismatch,
}
