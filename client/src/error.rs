//! Error types for the staking client.
//!
//! One taxonomy for everything a session can surface:
//! - Wallet/network problems (no wallet, wrong cluster, user rejection)
//! - Chain failures (reverted or unconfirmed transactions)
//! - Mirror failures (hosted database unreachable or rejecting a write)
//! - Local input and lifecycle errors

use anchor_lang::error::Error as AnchorError;
use thiserror::Error;

use crate::config::Cluster;

/// Client error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No wallet account is available to connect
    #[error("No wallet available to connect")]
    NoWallet,

    /// Wallet is on a different cluster than the session expects
    #[error("Wrong network: expected {expected}, wallet is on {actual}")]
    WrongCluster { expected: Cluster, actual: Cluster },

    /// The user declined to sign
    #[error("Transaction rejected by wallet")]
    Rejected,

    /// Program or runtime rejected the transaction
    #[error("Transaction failed: {message}")]
    Chain { code: Option<u32>, message: String },

    /// Transaction was submitted but never confirmed
    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    /// Hosted database error
    #[error("Mirror error: {0}")]
    Mirror(String),

    /// Plan id outside the plan table
    #[error("Invalid plan: {0}")]
    InvalidPlan(u8),

    /// Amount was zero or unparsable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Mirror status change that would move backwards
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Record or position does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A mutating operation is already in flight for this session
    #[error("Another operation is in progress")]
    Busy,

    /// Session was disconnected
    #[error("Session is disconnected")]
    Disconnected,

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reconciliation journal could not be read or written
    #[error("Journal error: {0}")]
    Journal(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// True for errors raised by the mirror rather than the chain or wallet.
    pub fn is_mirror(&self) -> bool {
        matches!(self, ClientError::Mirror(_))
    }
}

impl From<AnchorError> for ClientError {
    fn from(err: AnchorError) -> Self {
        match err {
            AnchorError::AnchorError(e) => ClientError::Chain {
                code: Some(e.error_code_number),
                message: e.error_msg.clone(),
            },
            AnchorError::ProgramError(e) => ClientError::Chain {
                code: None,
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Journal(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Journal(err.to_string())
    }
}
