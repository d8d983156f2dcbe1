//! Lamport/SOL conversion and the projected-return helper.

use fixed_term_staking::constants::LAMPORTS_PER_SOL;
use fixed_term_staking::plans::Plan;

use crate::error::{ClientError, Result};

const SOL_DECIMALS: usize = 9;

/// Formats lamports as a SOL decimal string, trimming trailing zeros.
///
/// `1_500_000_000` becomes `"1.5"`, `2_000_000_000` becomes `"2"`.
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    if frac == 0 {
        return whole.to_string();
    }

    let digits = format!("{:0width$}", frac, width = SOL_DECIMALS);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parses a SOL decimal string into lamports. At most nine fractional digits.
pub fn parse_sol(value: &str) -> Result<u64> {
    let value = value.trim();
    let invalid = || ClientError::InvalidAmount(value.to_string());

    let (whole, frac) = match value.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (value, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > SOL_DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = SOL_DECIMALS)
            .parse()
            .map_err(|_| invalid())?
    };

    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|lamports| lamports.checked_add(frac))
        .ok_or_else(invalid)
}

/// Total returned at maturity for `amount` staked in `plan_id`.
///
/// A missing or unknown plan projects zero, matching an empty plan selector.
pub fn projected_payout(amount: u64, plan_id: Option<u8>) -> u64 {
    plan_id
        .and_then(Plan::lookup)
        .and_then(|plan| plan.payout_at_maturity(amount).ok())
        .unwrap_or(0)
}

/// Display label such as `"Plan B - +50% Bonus (2 days)"`.
pub fn plan_label(plan: &Plan) -> String {
    let days = plan.duration / fixed_term_staking::constants::SECONDS_PER_DAY;
    format!(
        "{} - +{}% Bonus ({} day{})",
        plan.name,
        plan.bonus_percent(),
        days,
        if days == 1 { "" } else { "s" }
    )
}
