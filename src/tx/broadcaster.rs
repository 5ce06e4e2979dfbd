//! Submission of signed transactions to the peer

use super::transaction::SignedTransaction;
use crate::chain::{PeerError, RemotePeer};
use crate::error::{ClientError, ClientResult, Stage};

use ethers::types::H256;
use std::sync::Arc;
use tracing::{info, warn};

/// Stateless submitter; the returned hash is always the locally computed one
pub struct Broadcaster {
    peer: Arc<dyn RemotePeer>,
    chain_id: u64,
}

impl Broadcaster {
    pub fn new(peer: Arc<dyn RemotePeer>, chain_id: u64) -> Self {
        Self { peer, chain_id }
    }

    pub async fn submit(&self, signed: &SignedTransaction) -> ClientResult<H256> {
        let hash = signed.hash();

        match self.peer.send_raw_transaction(signed.raw().clone()).await {
            Ok(reported) => {
                if reported != hash {
                    warn!(
                        "Peer reported hash {:?} for transaction {:?}",
                        reported, hash
                    );
                }
                info!("Transaction sent: {:?} (nonce {})", hash, signed.nonce());
                crate::metrics::record_tx_submitted(self.chain_id);
                Ok(hash)
            }
            Err(PeerError::Rpc { message, .. }) => {
                warn!("Transaction {:?} rejected: {}", hash, message);
                crate::metrics::record_tx_rejected(self.chain_id);
                Err(ClientError::RejectedByPeer {
                    hash,
                    reason: message,
                })
            }
            Err(transport) => Err(transport.at(Stage::Submit)),
        }
    }
}
