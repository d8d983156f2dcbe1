//! Aggregate statistics and upcoming maturities computed from mirror rows.
//!
//! The mirror exposes server-side functions for both; these are the local
//! fallbacks used whenever those functions fail.

use fixed_term_staking::state::PositionStatus;
use serde::{Deserialize, Serialize};

use crate::records::PositionRecord;

/// Per-wallet totals shown on the dashboard. All amounts in lamports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Principal of Active positions
    pub total_staked: u64,
    /// Principal + bonus of Matured and Withdrawn positions
    pub total_returns: u64,
    pub active_positions: u64,
    /// Principal of Active plus principal + bonus of Matured
    pub active_balance: u64,
}

impl UserStats {
    /// Sums the position list.
    ///
    /// - Active: principal to `total_staked` and `active_balance`
    /// - Matured: principal + bonus to `total_returns` and `active_balance`
    /// - Withdrawn: principal + bonus to `total_returns`
    pub fn from_positions<'a, I>(positions: I) -> Self
    where
        I: IntoIterator<Item = &'a PositionRecord>,
    {
        positions
            .into_iter()
            .fold(UserStats::default(), |mut stats, position| {
                match position.status {
                    PositionStatus::Active => {
                        stats.total_staked =
                            stats.total_staked.saturating_add(position.principal_amount);
                        stats.active_balance =
                            stats.active_balance.saturating_add(position.principal_amount);
                        stats.active_positions += 1;
                    }
                    PositionStatus::Matured => {
                        stats.total_returns =
                            stats.total_returns.saturating_add(position.gross_amount());
                        stats.active_balance =
                            stats.active_balance.saturating_add(position.gross_amount());
                    }
                    PositionStatus::Withdrawn => {
                        stats.total_returns =
                            stats.total_returns.saturating_add(position.gross_amount());
                    }
                }
                stats
            })
    }
}

/// An Active position that has not unlocked yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maturity {
    pub position_index: u64,
    pub unlock_at: i64,
    pub remaining_secs: u64,
    pub plan_id: u8,
    pub principal_amount: u64,
    pub bonus_amount: u64,
}

/// Active positions with `unlock_at > now`, soonest first.
pub fn upcoming_maturities<'a, I>(positions: I, now: i64) -> Vec<Maturity>
where
    I: IntoIterator<Item = &'a PositionRecord>,
{
    let mut upcoming: Vec<Maturity> = positions
        .into_iter()
        .filter(|p| p.status == PositionStatus::Active && p.unlock_at > now)
        .map(|p| Maturity {
            position_index: p.position_index,
            unlock_at: p.unlock_at,
            remaining_secs: p.unlock_at.saturating_sub(now).max(0) as u64,
            plan_id: p.plan_id,
            principal_amount: p.principal_amount,
            bonus_amount: p.bonus_amount,
        })
        .collect();

    upcoming.sort_by_key(|m| (m.unlock_at, m.position_index));
    upcoming
}
