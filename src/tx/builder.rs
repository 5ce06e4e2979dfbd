//! Transaction construction: nonce, gas price, gas limit, signature

use super::gas::{CallKind, GasEstimator};
use super::nonce::NonceSequencer;
use super::signer::SignerIdentity;
use super::transaction::{SignedTransaction, UnsignedTransaction};
use crate::chain::{CallRequest, RemotePeer};
use crate::error::{ClientError, ClientResult};

use ethers::types::{Address, Bytes, U256};
use std::sync::Arc;
use tracing::debug;

/// Builds signed transactions for one peer
pub struct TransactionBuilder {
    peer: Arc<dyn RemotePeer>,
    gas: GasEstimator,
}

impl TransactionBuilder {
    pub fn new(peer: Arc<dyn RemotePeer>, gas: GasEstimator) -> Self {
        Self { peer, gas }
    }

    pub fn gas(&self) -> &GasEstimator {
        &self.gas
    }

    /// Reserve a nonce, price and size the call, then sign it.
    ///
    /// The nonce stays consumed when any later step fails.
    pub async fn build(
        &self,
        identity: &SignerIdentity,
        nonces: &NonceSequencer,
        kind: CallKind,
        to: Option<Address>,
        value: U256,
        data: Option<Bytes>,
    ) -> ClientResult<SignedTransaction> {
        match (kind, to) {
            (CallKind::CreateContract { .. }, Some(to)) => {
                return Err(ClientError::Contract(format!(
                    "Contract creation cannot target {:?}",
                    to
                )));
            }
            (CallKind::FixedMethodInvocation { .. }, None) => {
                return Err(ClientError::Contract(
                    "Method invocation needs a contract address".to_string(),
                ));
            }
            _ => {}
        }

        let nonce = nonces.reserve_next().await;
        let gas_price = self.gas.gas_price(self.peer.as_ref()).await?;

        let call = CallRequest {
            from: identity.address(),
            to,
            value,
            data: data.clone(),
            gas_price: Some(gas_price),
        };
        let gas_limit = self
            .gas
            .gas_limit(self.peer.as_ref(), kind, &call)
            .await?;

        let unsigned = UnsignedTransaction {
            nonce,
            to,
            value,
            data,
            gas_price,
            gas_limit,
            chain_id: identity.chain_id(),
        };
        let signed = identity.sign(unsigned)?;

        debug!(
            "Built transaction {:?} (nonce {}, gas {} @ {})",
            signed.hash(),
            nonce,
            gas_limit,
            gas_price
        );
        Ok(signed)
    }
}
