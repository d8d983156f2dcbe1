//! State structures for the Fixed-Term Staking program.
//!
//! This module defines all account structures used to store program state.

pub mod config;
pub mod position;
pub mod staker;

pub use config::*;
pub use position::*;
pub use staker::*;
