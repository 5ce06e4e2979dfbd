//! Call encoding for the counter ("stat") contract driven by the meter
//!
//! Every method is addressed by a fixed signature; arguments are ABI-encoded
//! after the 4-byte selector.

use crate::error::{ClientError, ClientResult};

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Bytes, U256};
use ethers::utils::id;
use std::path::Path;

/// A call to one fixed-signature method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub signature: &'static str,
    pub args: Vec<Token>,
}

impl MethodCall {
    pub fn new(signature: &'static str, args: Vec<Token>) -> Self {
        Self { signature, args }
    }

    pub fn selector(&self) -> [u8; 4] {
        id(self.signature)
    }

    pub fn encode(&self) -> Bytes {
        let mut data = self.selector().to_vec();
        data.extend(abi::encode(&self.args));
        Bytes::from(data)
    }
}

/// Counter contract: `constructor(uint64 startTime)`, `add()`, `txNum()`
pub struct StatContract;

impl StatContract {
    pub const ADD: &'static str = "add()";
    pub const TX_NUM: &'static str = "txNum()";

    /// Creation payload: bytecode followed by the encoded constructor argument
    pub fn deploy_payload(bytecode: &Bytes, start_time: u64) -> Bytes {
        let mut data = bytecode.to_vec();
        data.extend(abi::encode(&[Token::Uint(U256::from(start_time))]));
        Bytes::from(data)
    }

    pub fn add() -> Bytes {
        MethodCall::new(Self::ADD, vec![]).encode()
    }

    pub fn tx_num() -> Bytes {
        MethodCall::new(Self::TX_NUM, vec![]).encode()
    }

    pub fn decode_tx_num(output: &[u8]) -> ClientResult<U256> {
        let tokens = abi::decode(&[ParamType::Uint(256)], output)
            .map_err(|e| ClientError::Contract(format!("Cannot decode txNum output: {}", e)))?;

        tokens
            .into_iter()
            .next()
            .and_then(Token::into_uint)
            .ok_or_else(|| ClientError::Contract("txNum returned no integer".to_string()))
    }

    /// Read hex-encoded creation bytecode from disk
    pub fn load_bytecode(path: &Path) -> ClientResult<Bytes> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Contract(format!("Cannot read {:?}: {}", path, e)))?;
        let code = hex::decode(text.trim().trim_start_matches("0x"))
            .map_err(|e| ClientError::Contract(format!("Invalid bytecode in {:?}: {}", path, e)))?;

        if code.is_empty() {
            return Err(ClientError::Contract(format!("Empty bytecode in {:?}", path)));
        }
        Ok(Bytes::from(code))
    }
}
