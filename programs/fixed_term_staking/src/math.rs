//! Checked arithmetic helpers for bonus and payout accounting.

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::error::StakingError;
use crate::plans::Plan;

/// `amount * bps / 10_000`, floored, with u128 intermediates.
pub fn bps_of(amount: u64, bps: u16) -> Result<u64> {
    let scaled = (amount as u128)
        .checked_mul(bps as u128)
        .ok_or(StakingError::MathOverflow)?
        .checked_div(BASIS_POINTS_DENOMINATOR as u128)
        .ok_or(StakingError::MathOverflow)?;

    u64::try_from(scaled).map_err(|_| error!(StakingError::ConversionOverflow))
}

/// Principal plus bonus, the amount released by a matured withdrawal.
pub fn mature_payout(principal: u64, bonus: u64) -> Result<u64> {
    principal
        .checked_add(bonus)
        .ok_or(error!(StakingError::MathOverflow))
}

/// Projected payout at maturity for a bonus given in whole percent.
///
/// Only the percentages of the three plans are recognized; anything else
/// (including a missing plan) yields zero.
pub fn payout_for_percent(principal: u64, bonus_percent: u16) -> u64 {
    Plan::from_bonus_percent(bonus_percent)
        .and_then(|plan| plan.payout_at_maturity(principal).ok())
        .unwrap_or(0)
}

/// `lhs - rhs`, failing instead of wrapping.
pub fn checked_sub_u64(lhs: u64, rhs: u64) -> Result<u64> {
    lhs.checked_sub(rhs)
        .ok_or(error!(StakingError::MathUnderflow))
}

/// `lhs + rhs`, failing instead of wrapping.
pub fn checked_add_u64(lhs: u64, rhs: u64) -> Result<u64> {
    lhs.checked_add(rhs)
        .ok_or(error!(StakingError::MathOverflow))
}
