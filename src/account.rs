//! Account facade: the public transfer / deploy / invoke operations
//!
//! Every operation reserves a fresh nonce, builds and signs, submits, and
//! optionally waits for a successful receipt. The first failure in that chain
//! is returned as is; nothing is retried here, since a retry needs a new nonce.

use crate::chain::{CallRequest, PeerError, Receipt, RemotePeer};
use crate::config::{ChainConfig, GasConfig};
use crate::error::{ClientError, ClientResult, Stage};
use crate::tx::{
    Broadcaster, CallKind, ConfirmationTracker, GasEstimator, NonceSequencer, SignedTransaction,
    SignerIdentity, TransactionBuilder,
};

use ethers::types::{Address, BlockNumber, Bytes, H256, U256};
use ethers::utils::get_contract_address;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A signing identity bound to a peer, with its own nonce sequence
pub struct Account {
    identity: SignerIdentity,
    nonces: NonceSequencer,
    peer: Arc<dyn RemotePeer>,
    builder: TransactionBuilder,
    broadcaster: Broadcaster,
    tracker: ConfirmationTracker,
}

impl Account {
    /// Load a pre-funded identity from its hex secret key
    pub async fn master(
        peer: Arc<dyn RemotePeer>,
        hex_key: &str,
        chain: &ChainConfig,
        gas: &GasConfig,
    ) -> ClientResult<Self> {
        let identity = SignerIdentity::from_hex(hex_key, chain.chain_id)?;
        Self::with_identity(peer, identity, chain, gas).await
    }

    /// Create a throwaway identity with a random key
    pub async fn fresh(
        peer: Arc<dyn RemotePeer>,
        chain: &ChainConfig,
        gas: &GasConfig,
    ) -> ClientResult<Self> {
        let identity = SignerIdentity::generate(chain.chain_id);
        Self::with_identity(peer, identity, chain, gas).await
    }

    pub async fn with_identity(
        peer: Arc<dyn RemotePeer>,
        identity: SignerIdentity,
        chain: &ChainConfig,
        gas: &GasConfig,
    ) -> ClientResult<Self> {
        let nonces = NonceSequencer::init(identity.address(), peer.as_ref()).await?;
        let builder = TransactionBuilder::new(peer.clone(), GasEstimator::new(gas));
        let broadcaster = Broadcaster::new(peer.clone(), chain.chain_id);
        let tracker = ConfirmationTracker::new(peer.clone(), chain.chain_id, chain.poll_interval())
            .with_max_wait(chain.confirmation_timeout());

        debug!(
            "Account {:?} ready on chain {}",
            identity.address(),
            chain.chain_id
        );

        Ok(Self {
            identity,
            nonces,
            peer,
            builder,
            broadcaster,
            tracker,
        })
    }

    /// Cancel confirmation waits once `shutdown` turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.tracker = self.tracker.with_shutdown(shutdown);
        self
    }

    pub fn address(&self) -> Address {
        self.identity.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.identity.chain_id()
    }

    /// Nonce the next transaction will use
    pub async fn next_nonce(&self) -> u64 {
        self.nonces.peek().await
    }

    pub fn gas(&self) -> &GasEstimator {
        self.builder.gas()
    }

    /// Own balance at `block` (latest when `None`)
    pub async fn balance(&self, block: Option<BlockNumber>) -> ClientResult<U256> {
        self.balance_of(self.address(), block).await
    }

    pub async fn balance_of(&self, address: Address, block: Option<BlockNumber>) -> ClientResult<U256> {
        self.peer
            .balance_at(address, block)
            .await
            .map_err(|e| e.at(Stage::Balance))
    }

    /// Build and sign without submitting
    pub async fn build(
        &self,
        kind: CallKind,
        to: Option<Address>,
        value: U256,
        data: Option<Bytes>,
    ) -> ClientResult<SignedTransaction> {
        self.builder
            .build(&self.identity, &self.nonces, kind, to, value, data)
            .await
    }

    /// Submit an already signed transaction
    pub async fn send(&self, signed: &SignedTransaction) -> ClientResult<H256> {
        self.broadcaster.submit(signed).await
    }

    /// Block until `hash` is final with a successful receipt
    pub async fn wait(&self, hash: H256) -> ClientResult<Receipt> {
        self.tracker.await_final(hash).await
    }

    /// Fetch the receipt of `hash` without waiting
    pub async fn receipt(&self, hash: H256) -> ClientResult<Receipt> {
        self.peer
            .transaction_receipt(hash)
            .await
            .map_err(|e| e.at(Stage::Receipt))?
            .ok_or(ClientError::ReceiptMissing { hash })
    }

    pub async fn transfer(&self, to: Address, amount: U256) -> ClientResult<H256> {
        let signed = self
            .build(self.gas().generic(), Some(to), amount, None)
            .await?;
        self.send(&signed).await
    }

    pub async fn transfer_and_confirm(&self, to: Address, amount: U256) -> ClientResult<H256> {
        let hash = self.transfer(to, amount).await?;
        self.wait(hash).await?;
        Ok(hash)
    }

    /// Deploy `payload` (creation bytecode plus constructor arguments) and
    /// return the created contract's address
    pub async fn deploy_contract(&self, payload: Bytes) -> ClientResult<Address> {
        let signed = self
            .build(self.gas().create(), None, U256::zero(), Some(payload))
            .await?;
        let derived = get_contract_address(self.address(), signed.nonce());

        let hash = self.send(&signed).await?;
        let receipt = self.wait(hash).await?;

        let address = match receipt.contract_address {
            Some(address) => {
                if address != derived {
                    warn!(
                        "Receipt reports contract {:?}, expected {:?} from nonce {}",
                        address,
                        derived,
                        signed.nonce()
                    );
                }
                address
            }
            None => derived,
        };

        info!("Contract deployed at {:?} (tx {:?})", address, hash);
        Ok(address)
    }

    /// Invoke a fixed-signature method on `contract`; returns once submitted
    pub async fn invoke(&self, contract: Address, payload: Bytes) -> ClientResult<H256> {
        let signed = self
            .build(
                self.gas().invocation(),
                Some(contract),
                U256::zero(),
                Some(payload),
            )
            .await?;
        self.send(&signed).await
    }

    /// Invoke an arbitrary payload with value and wait for a successful receipt
    pub async fn invoke_and_confirm(
        &self,
        contract: Address,
        payload: Bytes,
        value: U256,
    ) -> ClientResult<H256> {
        let signed = self
            .build(self.gas().generic(), Some(contract), value, Some(payload))
            .await?;
        let hash = self.send(&signed).await?;
        self.wait(hash).await?;
        Ok(hash)
    }

    /// Read-only call against latest state
    pub async fn call(&self, contract: Address, payload: Bytes) -> ClientResult<Bytes> {
        let call = CallRequest {
            from: self.address(),
            to: Some(contract),
            data: Some(payload),
            ..Default::default()
        };

        self.peer.call(&call).await.map_err(|e| match e {
            PeerError::Rpc { message, .. } => {
                ClientError::Contract(format!("Call to {:?} failed: {}", contract, message))
            }
            transport => transport.at(Stage::Call),
        })
    }
}
