//! JSON-RPC backed peer built on an ethers middleware stack

use super::peer::{PeerError, PeerResult, RemotePeer};
use super::types::{CallRequest, Receipt, TxLookup};
use crate::error::{ClientError, ClientResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, MiddlewareError, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Peer that forwards every query to an ethers [`Middleware`]
pub struct EthersPeer<M> {
    client: Arc<M>,
}

impl EthersPeer<Provider<Http>> {
    /// Connect to an HTTP JSON-RPC endpoint
    pub fn connect(url: &str, poll_interval: Duration) -> ClientResult<Self> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| ClientError::Config(format!("Invalid RPC URL {}: {}", url, e)))?
            .interval(poll_interval);

        debug!("Created HTTP peer for {}", url);
        Ok(Self::new(Arc::new(provider)))
    }
}

impl<M: Middleware> EthersPeer<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

/// Separate answered JSON-RPC errors from transport failures
fn classify<E: MiddlewareError>(err: E) -> PeerError {
    match err.as_error_response() {
        Some(resp) => PeerError::Rpc {
            code: resp.code,
            message: resp.message.clone(),
        },
        None => PeerError::Transport(err.to_string()),
    }
}

#[async_trait]
impl<M> RemotePeer for EthersPeer<M>
where
    M: Middleware + 'static,
{
    async fn nonce_at(&self, address: Address, block: Option<BlockNumber>) -> PeerResult<u64> {
        let nonce = self
            .client
            .get_transaction_count(address, block.map(BlockId::from))
            .await
            .map_err(classify)?;
        u64::try_from(nonce).map_err(|_| PeerError::Rpc {
            code: -32603,
            message: format!("nonce {} for {:?} out of range", nonce, address),
        })
    }

    async fn balance_at(&self, address: Address, block: Option<BlockNumber>) -> PeerResult<U256> {
        self.client
            .get_balance(address, block.map(BlockId::from))
            .await
            .map_err(classify)
    }

    async fn suggest_gas_price(&self) -> PeerResult<U256> {
        self.client.get_gas_price().await.map_err(classify)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> PeerResult<U256> {
        self.client
            .estimate_gas(&call.to_typed(), None)
            .await
            .map_err(classify)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> PeerResult<H256> {
        let pending = self
            .client
            .send_raw_transaction(raw)
            .await
            .map_err(classify)?;
        Ok(pending.tx_hash())
    }

    async fn transaction_by_hash(&self, hash: H256) -> PeerResult<Option<TxLookup>> {
        let tx = self.client.get_transaction(hash).await.map_err(classify)?;
        Ok(tx.map(|tx| match tx.block_number {
            Some(block) => TxLookup::Included {
                block_number: block.as_u64(),
            },
            None => TxLookup::Pending,
        }))
    }

    async fn transaction_receipt(&self, hash: H256) -> PeerResult<Option<Receipt>> {
        let receipt = self
            .client
            .get_transaction_receipt(hash)
            .await
            .map_err(classify)?;
        Ok(receipt.map(Receipt::from))
    }

    async fn call(&self, call: &CallRequest) -> PeerResult<Bytes> {
        self.client
            .call(&call.to_typed(), None)
            .await
            .map_err(classify)
    }
}
