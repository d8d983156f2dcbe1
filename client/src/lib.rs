//! # Fixed-Term Staking Client
//!
//! Off-chain side of the fixed-term staking dashboard.
//!
//! - [`session::Session`]: wallet connection lifecycle and the stake,
//!   withdraw and emergency withdraw flows
//! - [`mirror::MirrorStore`]: the hosted `positions`/`activities` tables that
//!   make the dashboard fast to load
//! - [`journal::PendingJournal`]: mirror writes still owed after confirmed
//!   transactions
//! - [`refresh::RefreshWorker`]: coalescing dashboard refresh with local
//!   fallbacks for statistics and maturities
//! - [`simulated::SimulatedChain`]: the program executed in memory with a
//!   controllable clock
//!
//! The chain is authoritative for funds and position state. The mirror is a
//! display copy that can always be rebuilt from program accounts.

pub mod amounts;
pub mod chain;
pub mod config;
pub mod error;
pub mod journal;
pub mod mirror;
pub mod records;
pub mod refresh;
pub mod session;
pub mod simulated;
pub mod stats;

pub use chain::{ChainPosition, StakingChain, StakingInstruction, TxSignature};
pub use config::{ClientConfig, Cluster};
pub use error::{ClientError, Result};
pub use journal::{FileJournal, MemoryJournal, PendingJournal};
pub use mirror::{InMemoryMirror, MirrorStore};
pub use refresh::{DashboardSnapshot, RefreshTrigger};
pub use session::{Backends, MirrorSync, Session};
pub use simulated::SimulatedChain;
pub use stats::UserStats;
