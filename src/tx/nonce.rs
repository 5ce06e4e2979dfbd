//! Nonce sequencing for one signing identity
//!
//! The counter starts from the peer's reported nonce and only ever moves
//! forward: a reserved nonce is consumed even if the transaction using it
//! is never built or accepted.

use crate::chain::RemotePeer;
use crate::error::{ClientResult, Stage};

use ethers::types::Address;
use tokio::sync::Mutex;
use tracing::debug;

/// Hands out strictly increasing nonces to concurrent callers
#[derive(Debug)]
pub struct NonceSequencer {
    address: Address,
    /// Next nonce to hand out
    current: Mutex<u64>,
}

impl NonceSequencer {
    /// Initialize from the peer's latest nonce for `address`
    pub async fn init(address: Address, peer: &dyn RemotePeer) -> ClientResult<Self> {
        let on_chain_nonce = peer
            .nonce_at(address, None)
            .await
            .map_err(|e| e.at(Stage::Nonce))?;

        debug!("Initialized nonce for {:?}: {}", address, on_chain_nonce);
        Ok(Self::starting_at(address, on_chain_nonce))
    }

    pub fn starting_at(address: Address, initial: u64) -> Self {
        Self {
            address,
            current: Mutex::new(initial),
        }
    }

    /// Reserve the next nonce
    pub async fn reserve_next(&self) -> u64 {
        let mut current = self.current.lock().await;
        let nonce = *current;
        *current += 1;

        debug!("Allocated nonce {} for {:?}", nonce, self.address);
        nonce
    }

    /// Nonce the next reservation will return
    pub async fn peek(&self) -> u64 {
        *self.current.lock().await
    }
}
