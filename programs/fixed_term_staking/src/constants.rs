//! Program constants for the Fixed-Term Staking program.
//!
//! This module defines all constant values used throughout the staking program,
//! including PDA seeds, plan durations and bonus rates.

/// Seed for deriving the staking config PDA
pub const CONFIG_SEED: &[u8] = b"config";

/// Seed for deriving the lamport vault PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed for deriving per-wallet staker account PDAs
pub const STAKER_SEED: &[u8] = b"staker";

/// Seed for deriving position account PDAs
pub const POSITION_SEED: &[u8] = b"position";

/// Number of seconds in a day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Lock period for Plan A in seconds (1 day)
pub const PLAN_A_DURATION: i64 = SECONDS_PER_DAY;

/// Lock period for Plan B in seconds (2 days)
pub const PLAN_B_DURATION: i64 = 2 * SECONDS_PER_DAY;

/// Lock period for Plan C in seconds (3 days)
pub const PLAN_C_DURATION: i64 = 3 * SECONDS_PER_DAY;

/// Bonus for Plan A (20% = 2000 basis points)
pub const PLAN_A_BONUS_BPS: u16 = 2_000;

/// Bonus for Plan B (50% = 5000 basis points)
pub const PLAN_B_BONUS_BPS: u16 = 5_000;

/// Bonus for Plan C (100% = 10000 basis points)
pub const PLAN_C_BONUS_BPS: u16 = 10_000;

/// Basis points denominator (100% = 10000 basis points)
pub const BASIS_POINTS_DENOMINATOR: u64 = 10_000;

/// Basis points per whole percent
pub const BPS_PER_PERCENT: u16 = 100;

/// Lamports per SOL, used by display helpers
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Plan id values
pub mod plan {
    /// Plan A - 1 day lock, +20%
    pub const A: u8 = 0;
    /// Plan B - 2 day lock, +50%
    pub const B: u8 = 1;
    /// Plan C - 3 day lock, +100%
    pub const C: u8 = 2;
}
