//! Confirmation tracking for submitted transactions
//!
//! A submitted transaction is polled at a fixed interval until the peer no
//! longer reports it as pending, then its receipt is fetched and checked:
//! - lookup failures and unknown hashes are logged and polled again
//! - status 0 is a terminal [`ClientError::ExecutionReverted`]
//! - an optional deadline and shutdown signal bound the wait

use crate::chain::{Receipt, RemotePeer, TxLookup};
use crate::error::{ClientError, ClientResult, Stage};

use ethers::types::H256;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Waits for transactions to leave the pending pool and validates receipts
pub struct ConfirmationTracker {
    peer: Arc<dyn RemotePeer>,
    chain_id: u64,
    poll_interval: Duration,
    /// Overall bound on a single wait; `None` waits until cancelled
    max_wait: Option<Duration>,
    /// Set to `true` to cancel every wait in progress
    shutdown: Option<watch::Receiver<bool>>,
}

impl ConfirmationTracker {
    pub fn new(peer: Arc<dyn RemotePeer>, chain_id: u64, poll_interval: Duration) -> Self {
        Self {
            peer,
            chain_id,
            poll_interval,
            max_wait: None,
            shutdown: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Block until `hash` is final and return its successful receipt
    pub async fn await_final(&self, hash: H256) -> ClientResult<Receipt> {
        let started = Instant::now();

        let receipt = match self.max_wait {
            Some(limit) => timeout(limit, self.poll_until_final(hash))
                .await
                .map_err(|_| ClientError::Timeout {
                    operation: format!("confirmation of {:?}", hash),
                })??,
            None => self.poll_until_final(hash).await?,
        };

        crate::metrics::record_tx_latency(self.chain_id, started.elapsed().as_secs_f64());
        self.validate(hash, receipt)
    }

    async fn poll_until_final(&self, hash: H256) -> ClientResult<Receipt> {
        let mut shutdown = self.shutdown.clone();

        loop {
            self.pause(&mut shutdown, hash).await?;

            match self.peer.transaction_by_hash(hash).await {
                Ok(Some(TxLookup::Included { block_number })) => {
                    debug!("Transaction {:?} included in block {}", hash, block_number);
                }
                Ok(Some(TxLookup::Pending)) => {
                    debug!("Transaction {:?} still pending", hash);
                    continue;
                }
                Ok(None) => {
                    debug!("Transaction {:?} not known to peer yet", hash);
                    continue;
                }
                Err(e) => {
                    let err = ClientError::TransientPoll {
                        hash,
                        message: e.to_string(),
                    };
                    warn!("{}", err);
                    continue;
                }
            }

            match self.peer.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {
                    debug!("Receipt for {:?} not available yet", hash);
                }
                Err(e) => return Err(e.at(Stage::Receipt)),
            }
        }
    }

    /// Sleep one poll interval, returning early if shutdown is signalled
    async fn pause(
        &self,
        shutdown: &mut Option<watch::Receiver<bool>>,
        hash: H256,
    ) -> ClientResult<()> {
        let Some(rx) = shutdown.as_mut() else {
            sleep(self.poll_interval).await;
            return Ok(());
        };

        if *rx.borrow() {
            return Err(ClientError::Cancelled { hash });
        }

        let mut sender_gone = false;
        tokio::select! {
            _ = sleep(self.poll_interval) => {}
            stopped = rx.wait_for(|stop| *stop) => {
                if stopped.is_ok() {
                    return Err(ClientError::Cancelled { hash });
                }
                sender_gone = true;
            }
        }

        // Nobody can cancel any more
        if sender_gone {
            *shutdown = None;
        }
        Ok(())
    }

    fn validate(&self, hash: H256, receipt: Receipt) -> ClientResult<Receipt> {
        if !receipt.succeeded() {
            warn!(
                "Transaction {:?} reverted in block {}",
                hash, receipt.block_number
            );
            crate::metrics::record_tx_reverted(self.chain_id);
            return Err(ClientError::ExecutionReverted {
                hash,
                block_number: receipt.block_number,
            });
        }

        info!("txhash {:?}, block height {}", hash, receipt.block_number);
        for event in &receipt.logs {
            info!("eventlog address {:?}", event.address);
            info!("eventlog data 0x{}", hex::encode(&event.data));
            for (i, topic) in event.topics.iter().enumerate() {
                info!("eventlog topic[{}] {:?}", i, topic);
            }
        }

        crate::metrics::record_tx_finalized(self.chain_id);
        Ok(receipt)
    }
}
