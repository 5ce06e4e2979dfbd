//! The remote peer seam
//!
//! Everything the client needs from a JSON-RPC node goes through
//! [`RemotePeer`], so the transaction lifecycle can run against a real node
//! or an in-memory double.

use super::types::{CallRequest, Receipt, TxLookup};
use crate::error::{ClientError, Stage};

use async_trait::async_trait;
use ethers::types::{Address, BlockNumber, Bytes, H256, U256};
use thiserror::Error;

/// Failure talking to the peer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// The peer could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer answered with a JSON-RPC error
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl PeerError {
    /// Report as peer unavailability at `stage`
    pub fn at(self, stage: Stage) -> ClientError {
        ClientError::PeerUnavailable {
            stage,
            message: self.to_string(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PeerError::Transport(_))
    }
}

pub type PeerResult<T> = Result<T, PeerError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemotePeer: Send + Sync {
    /// Sequence number of `address` at `block` (latest when `None`)
    async fn nonce_at(&self, address: Address, block: Option<BlockNumber>) -> PeerResult<u64>;

    async fn balance_at(&self, address: Address, block: Option<BlockNumber>) -> PeerResult<U256>;

    async fn suggest_gas_price(&self) -> PeerResult<U256>;

    async fn estimate_gas(&self, call: &CallRequest) -> PeerResult<U256>;

    /// Submit an RLP-encoded signed transaction
    async fn send_raw_transaction(&self, raw: Bytes) -> PeerResult<H256>;

    /// `None` when the peer does not know the hash
    async fn transaction_by_hash(&self, hash: H256) -> PeerResult<Option<TxLookup>>;

    async fn transaction_receipt(&self, hash: H256) -> PeerResult<Option<Receipt>>;

    /// Read-only execution against latest state
    async fn call(&self, call: &CallRequest) -> PeerResult<Bytes>;
}
