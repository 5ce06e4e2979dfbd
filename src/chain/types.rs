//! Data exchanged with the remote peer

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, TransactionRequest, H256, U256};

/// A call to simulate or execute read-only against the peer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    /// Absent for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub data: Option<Bytes>,
    pub gas_price: Option<U256>,
}

impl CallRequest {
    pub fn to_typed(&self) -> TypedTransaction {
        let mut tx = TransactionRequest::new().from(self.from).value(self.value);
        if let Some(to) = self.to {
            tx = tx.to(to);
        }
        if let Some(data) = &self.data {
            tx = tx.data(data.clone());
        }
        if let Some(price) = self.gas_price {
            tx = tx.gas_price(price);
        }
        TypedTransaction::Legacy(tx)
    }
}

/// Result of looking a transaction up by hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxLookup {
    Pending,
    Included { block_number: u64 },
}

/// A log entry emitted during execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl From<Log> for LogEntry {
    fn from(log: Log) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
        }
    }
}

/// The peer's record of a finalized transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: H256,
    /// 0 = failed, nonzero = success
    pub status: u64,
    pub block_number: u64,
    /// In on-chain emission order
    pub logs: Vec<LogEntry>,
    pub contract_address: Option<Address>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status != 0
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            // Missing status reads as failure
            status: receipt.status.map(|s| s.as_u64()).unwrap_or(0),
            block_number: receipt.block_number.map(|b| b.as_u64()).unwrap_or(0),
            logs: receipt.logs.into_iter().map(LogEntry::from).collect(),
            contract_address: receipt.contract_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U64;

    #[test]
    fn test_receipt_conversion_keeps_log_order() {
        let logs = (0u8..3)
            .map(|i| Log {
                address: Address::repeat_byte(i + 1),
                topics: vec![H256::repeat_byte(i)],
                data: Bytes::from(vec![i]),
                ..Default::default()
            })
            .collect();
        let raw = TransactionReceipt {
            transaction_hash: H256::repeat_byte(9),
            status: Some(U64::from(1)),
            block_number: Some(U64::from(42)),
            logs,
            ..Default::default()
        };

        let receipt = Receipt::from(raw);
        assert!(receipt.succeeded());
        assert_eq!(receipt.block_number, 42);
        let emitters: Vec<_> = receipt.logs.iter().map(|l| l.address).collect();
        assert_eq!(
            emitters,
            vec![
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                Address::repeat_byte(3)
            ]
        );
    }

    #[test]
    fn test_missing_status_is_failure() {
        let receipt = Receipt::from(TransactionReceipt::default());
        assert!(!receipt.succeeded());
    }

    #[test]
    fn test_creation_call_has_no_destination() {
        let call = CallRequest {
            from: Address::repeat_byte(1),
            data: Some(Bytes::from(vec![0x60, 0x80])),
            ..Default::default()
        };
        let typed = call.to_typed();
        assert!(typed.to().is_none());
        assert_eq!(typed.from(), Some(&Address::repeat_byte(1)));
    }
}
