//! Signing identity: a private key, its address and the chain it signs for

use super::transaction::{SignedTransaction, UnsignedTransaction};
use crate::error::{ClientError, ClientResult};

use ethers::core::rand::thread_rng;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;

/// Holds the secret key exclusively; the address is always derived from it
pub struct SignerIdentity {
    wallet: LocalWallet,
}

impl SignerIdentity {
    /// Load an existing hex-encoded secret key
    pub fn from_hex(hex_key: &str, chain_id: u64) -> ClientResult<Self> {
        let key = hex_key.trim().trim_start_matches("0x");
        let wallet = key
            .parse::<LocalWallet>()
            .map_err(|e| ClientError::Signing(format!("Invalid private key: {}", e)))?;

        Ok(Self {
            wallet: wallet.with_chain_id(chain_id),
        })
    }

    /// Generate a fresh random secret key
    pub fn generate(chain_id: u64) -> Self {
        let wallet = LocalWallet::new(&mut thread_rng());
        Self {
            wallet: wallet.with_chain_id(chain_id),
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    /// Sign `unsigned`, producing an immutable [`SignedTransaction`]
    pub fn sign(&self, unsigned: UnsignedTransaction) -> ClientResult<SignedTransaction> {
        if unsigned.chain_id != self.chain_id() {
            return Err(ClientError::Signing(format!(
                "Transaction for chain {} cannot be signed by identity on chain {}",
                unsigned.chain_id,
                self.chain_id()
            )));
        }

        let signature = self
            .wallet
            .sign_transaction_sync(&unsigned.to_typed())
            .map_err(|e| ClientError::Signing(e.to_string()))?;

        Ok(SignedTransaction::new(unsigned, signature))
    }
}

impl fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerIdentity")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_KEY;
    use ethers::types::{Bytes, U256};

    fn unsigned(nonce: u64) -> UnsignedTransaction {
        UnsignedTransaction {
            nonce,
            to: Some(Address::repeat_byte(0xbb)),
            value: U256::exp10(18),
            data: None,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: U256::from(21_000),
            chain_id: 1337,
        }
    }

    #[test]
    fn test_address_is_derived_from_key() {
        let a = SignerIdentity::from_hex(TEST_KEY, 1337).unwrap();
        let b = SignerIdentity::from_hex(&format!("0x{}", TEST_KEY), 1337).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(
            a.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_generated_identities_differ() {
        let a = SignerIdentity::generate(1337);
        let b = SignerIdentity::generate(1337);
        assert_ne!(a.address(), b.address());
        assert_eq!(a.chain_id(), 1337);
    }

    #[test]
    fn test_invalid_key_is_signing_error() {
        let err = SignerIdentity::from_hex("zz-not-hex", 1).unwrap_err();
        assert!(matches!(err, ClientError::Signing(_)));
    }

    #[test]
    fn test_signature_recovers_identity() {
        let identity = SignerIdentity::generate(1337);
        let signed = identity.sign(unsigned(0)).unwrap();
        assert_eq!(signed.recover_sender().unwrap(), identity.address());
    }

    #[test]
    fn test_hash_is_pure_function_of_contents() {
        let identity = SignerIdentity::from_hex(TEST_KEY, 1337).unwrap();
        let first = identity.sign(unsigned(3)).unwrap();
        let second = identity.sign(unsigned(3)).unwrap();
        assert_eq!(first.hash(), second.hash());
        assert_eq!(first.raw(), second.raw());

        let other_nonce = identity.sign(unsigned(4)).unwrap();
        assert_ne!(first.hash(), other_nonce.hash());

        let mut tx = unsigned(3);
        tx.value = U256::from(1);
        assert_ne!(first.hash(), identity.sign(tx).unwrap().hash());

        let mut tx = unsigned(3);
        tx.data = Some(Bytes::from(vec![0x4f, 0x2b, 0xe9, 0x1f]));
        assert_ne!(first.hash(), identity.sign(tx).unwrap().hash());
    }

    #[test]
    fn test_chain_mismatch_is_rejected() {
        let identity = SignerIdentity::generate(1);
        let err = identity.sign(unsigned(0)).unwrap_err();
        assert!(matches!(err, ClientError::Signing(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let identity = SignerIdentity::from_hex(TEST_KEY, 1337).unwrap();
        let printed = format!("{:?}", identity);
        assert!(!printed.contains(TEST_KEY));
    }
}
