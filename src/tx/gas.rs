//! Gas price and gas limit policies per call kind

use crate::chain::{CallRequest, PeerError, RemotePeer};
use crate::config::GasConfig;
use crate::error::{ClientError, ClientResult, Stage};

use ethers::types::U256;
use tracing::debug;

const GWEI: u64 = 1_000_000_000;

/// Shape of the call being built; each kind carries its own gas-limit policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Contract creation. Estimation is unreliable here, so a fixed limit is used.
    CreateContract { gas_limit: u64 },
    /// A single fixed-signature method. The call is still simulated so a
    /// revert surfaces before submission, and the limit is capped at `ceiling`.
    FixedMethodInvocation { ceiling: u64 },
    /// Fresh estimation plus a safety margin
    GenericEstimate { margin_percent: u64 },
}

/// Gas estimator for transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    /// Buffer percentage for gas limit on generic estimates (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
    /// Buffer percentage for gas price
    gas_price_buffer_percent: u64,
    /// Upper bound for the buffered gas price
    max_gas_price: Option<U256>,
    create_gas_limit: u64,
    invoke_gas_ceiling: u64,
}

impl GasEstimator {
    pub fn new(config: &GasConfig) -> Self {
        Self {
            gas_limit_buffer_percent: config.limit_buffer_percent,
            gas_price_buffer_percent: config.price_buffer_percent,
            max_gas_price: config
                .max_gas_price_gwei
                .map(|gwei| U256::from(gwei) * U256::from(GWEI)),
            create_gas_limit: config.create_gas_limit,
            invoke_gas_ceiling: config.invoke_gas_ceiling,
        }
    }

    pub fn create(&self) -> CallKind {
        CallKind::CreateContract {
            gas_limit: self.create_gas_limit,
        }
    }

    pub fn invocation(&self) -> CallKind {
        CallKind::FixedMethodInvocation {
            ceiling: self.invoke_gas_ceiling,
        }
    }

    pub fn generic(&self) -> CallKind {
        CallKind::GenericEstimate {
            margin_percent: self.gas_limit_buffer_percent,
        }
    }

    /// Suggested gas price with buffer, capped at the configured maximum
    pub async fn gas_price(&self, peer: &dyn RemotePeer) -> ClientResult<U256> {
        let suggested = peer
            .suggest_gas_price()
            .await
            .map_err(|e| e.at(Stage::GasPrice))?;

        let buffered = with_margin(suggested, self.gas_price_buffer_percent).ok_or_else(|| {
            ClientError::GasEstimation {
                reason: format!("suggested gas price {} out of range", suggested),
            }
        })?;
        let price = match self.max_gas_price {
            Some(max) => std::cmp::min(buffered, max),
            None => buffered,
        };

        debug!("Gas price: suggested {}, using {}", suggested, price);
        Ok(price)
    }

    /// Gas limit for `call` under the policy of `kind`
    pub async fn gas_limit(
        &self,
        peer: &dyn RemotePeer,
        kind: CallKind,
        call: &CallRequest,
    ) -> ClientResult<U256> {
        let limit = match kind {
            CallKind::CreateContract { gas_limit } => U256::from(gas_limit),
            CallKind::FixedMethodInvocation { ceiling } => {
                let estimate = estimate(peer, call).await?;
                std::cmp::min(estimate, U256::from(ceiling))
            }
            CallKind::GenericEstimate { margin_percent } => {
                let estimate = estimate(peer, call).await?;
                with_margin(estimate, margin_percent).ok_or_else(|| ClientError::GasEstimation {
                    reason: format!("gas estimate {} out of range", estimate),
                })?
            }
        };

        debug!("Gas limit for {:?}: {}", kind, limit);
        Ok(limit)
    }
}

/// `value` plus `percent`%, or `None` on overflow
fn with_margin(value: U256, percent: u64) -> Option<U256> {
    let extra = value.checked_mul(U256::from(percent))? / 100;
    value.checked_add(extra)
}

async fn estimate(peer: &dyn RemotePeer, call: &CallRequest) -> ClientResult<U256> {
    peer.estimate_gas(call).await.map_err(|e| match e {
        PeerError::Rpc { message, .. } => ClientError::GasEstimation { reason: message },
        transport => transport.at(Stage::EstimateGas),
    })
}
