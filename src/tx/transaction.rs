//! Unsigned and signed legacy transactions

use crate::error::{ClientError, ClientResult};

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Signature, TransactionRequest, H256, U256};
use ethers::utils::keccak256;

/// A transaction ready to be signed, built fresh per submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: u64,
    /// Absent for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub data: Option<Bytes>,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
}

impl UnsignedTransaction {
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// EIP-155 legacy encoding of this transaction
    pub fn to_typed(&self) -> TypedTransaction {
        let mut tx = TransactionRequest::new()
            .nonce(self.nonce)
            .value(self.value)
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .chain_id(self.chain_id);
        if let Some(to) = self.to {
            tx = tx.to(to);
        }
        if let Some(data) = &self.data {
            tx = tx.data(data.clone());
        }
        TypedTransaction::Legacy(tx)
    }
}

/// An immutable signed transaction, identified by the keccak hash of its
/// RLP encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    unsigned: UnsignedTransaction,
    signature: Signature,
    raw: Bytes,
    hash: H256,
}

impl SignedTransaction {
    pub(crate) fn new(unsigned: UnsignedTransaction, signature: Signature) -> Self {
        let raw = unsigned.to_typed().rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));
        Self {
            unsigned,
            signature,
            raw,
            hash,
        }
    }

    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.unsigned.nonce
    }

    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.unsigned
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Wire encoding submitted to the peer
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Recover the signer's address from the signature
    pub fn recover_sender(&self) -> ClientResult<Address> {
        let sighash = self.unsigned.to_typed().sighash();
        self.signature
            .recover(sighash)
            .map_err(|e| ClientError::Signing(format!("Signature recovery failed: {}", e)))
    }
}
