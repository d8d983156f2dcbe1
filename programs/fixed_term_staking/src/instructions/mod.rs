//! Instruction handlers for the Fixed-Term Staking program.
//!
//! This module contains all instruction implementations.

pub mod admin;
pub mod fund_rewards;
pub mod initialize;
pub mod stake;
pub mod views;
pub mod withdraw;

pub use admin::*;
pub use fund_rewards::*;
pub use initialize::*;
pub use stake::*;
pub use views::*;
pub use withdraw::*;
