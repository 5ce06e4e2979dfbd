//! Error types for the transaction client

use ethers::types::H256;
use std::fmt;
use thiserror::Error;

/// Step of the transaction lifecycle that talked to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Nonce,
    Balance,
    GasPrice,
    EstimateGas,
    Submit,
    Lookup,
    Receipt,
    Call,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Nonce => "nonce query",
            Stage::Balance => "balance query",
            Stage::GasPrice => "gas price query",
            Stage::EstimateGas => "gas estimation",
            Stage::Submit => "submission",
            Stage::Lookup => "transaction lookup",
            Stage::Receipt => "receipt fetch",
            Stage::Call => "contract call",
        };
        f.write_str(name)
    }
}

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Peer unavailable during {stage}: {message}")]
    PeerUnavailable { stage: Stage, message: String },

    #[error("Gas estimation error: {reason}")]
    GasEstimation { reason: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Transaction {hash:?} rejected by peer: {reason}")]
    RejectedByPeer { hash: H256, reason: String },

    #[error("Poll for {hash:?} failed: {message}")]
    TransientPoll { hash: H256, message: String },

    #[error("Transaction {hash:?} reverted in block {block_number}")]
    ExecutionReverted { hash: H256, block_number: u64 },

    #[error("Receipt for {hash:?} not found")]
    ReceiptMissing { hash: H256 },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Confirmation of {hash:?} cancelled")]
    Cancelled { hash: H256 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract error: {0}")]
    Contract(String),
}

impl ClientError {
    /// Stage that failed, for errors raised by a peer round-trip
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ClientError::PeerUnavailable { stage, .. } => Some(*stage),
            ClientError::GasEstimation { .. } => Some(Stage::EstimateGas),
            ClientError::RejectedByPeer { .. } => Some(Stage::Submit),
            ClientError::TransientPoll { .. } => Some(Stage::Lookup),
            ClientError::ReceiptMissing { .. } => Some(Stage::Receipt),
            _ => None,
        }
    }

    /// Hash of the transaction the error refers to, when one exists
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            ClientError::RejectedByPeer { hash, .. }
            | ClientError::TransientPoll { hash, .. }
            | ClientError::ExecutionReverted { hash, .. }
            | ClientError::ReceiptMissing { hash }
            | ClientError::Cancelled { hash } => Some(*hash),
            _ => None,
        }
    }

    /// Whether the transaction reached a final on-chain outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientError::ExecutionReverted { .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
