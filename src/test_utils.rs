//! In-memory peer for exercising the transaction lifecycle without a node

use crate::chain::{CallRequest, LogEntry, PeerError, PeerResult, Receipt, RemotePeer, TxLookup};

use async_trait::async_trait;
use ethers::types::{Address, BlockNumber, Bytes, Transaction, H256, U256};
use ethers::utils::{keccak256, rlp};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Well-known development key (address 0xf39F...2266)
pub const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const TEST_CHAIN_ID: u64 = 1337;

struct FakeState {
    nonces: HashMap<Address, u64>,
    balances: HashMap<Address, U256>,
    gas_price: U256,
    gas_price_delays: VecDeque<Duration>,
    estimate: U256,
    estimate_error: Option<PeerError>,
    send_error: Option<PeerError>,
    receipt_error: Option<PeerError>,
    sent: Vec<Transaction>,
    /// hash -> lookups answered so far
    known: HashMap<H256, u32>,
    unknown_polls: u32,
    pending_polls: u32,
    lookup_failures: u32,
    lookups: u32,
    receipt_status: u64,
    block_number: u64,
    contract_address: Option<Address>,
    logs: Vec<LogEntry>,
    call_output: Bytes,
    calls: Vec<CallRequest>,
}

impl FakeState {
    fn is_final(&self, hash: &H256) -> bool {
        self.known
            .get(hash)
            .map(|seen| *seen > self.unknown_polls.saturating_add(self.pending_polls))
            .unwrap_or(false)
    }
}

/// Scriptable peer; every transaction it accepts is mined once it has been
/// looked up `unknown_polls + pending_polls` times
pub struct FakePeer {
    state: Mutex<FakeState>,
}

impl FakePeer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                nonces: HashMap::new(),
                balances: HashMap::new(),
                gas_price: U256::from(1_000_000_000u64),
                gas_price_delays: VecDeque::new(),
                estimate: U256::from(21_000),
                estimate_error: None,
                send_error: None,
                receipt_error: None,
                sent: Vec::new(),
                known: HashMap::new(),
                unknown_polls: 0,
                pending_polls: 0,
                lookup_failures: 0,
                lookups: 0,
                receipt_status: 1,
                block_number: 100,
                contract_address: None,
                logs: Vec::new(),
                call_output: Bytes::default(),
                calls: Vec::new(),
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.with_state(|s| s.nonces.insert(address, nonce));
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.with_state(|s| s.balances.insert(address, balance));
    }

    pub fn set_estimate(&self, gas: u64) {
        self.with_state(|s| s.estimate = U256::from(gas));
    }

    pub fn set_estimate_error(&self, err: PeerError) {
        self.with_state(|s| s.estimate_error = Some(err));
    }

    pub fn set_send_error(&self, err: PeerError) {
        self.with_state(|s| s.send_error = Some(err));
    }

    pub fn set_receipt_error(&self, err: PeerError) {
        self.with_state(|s| s.receipt_error = Some(err));
    }

    /// Delay successive gas price answers, in call order
    pub fn delay_gas_price(&self, delays: Vec<Duration>) {
        self.with_state(|s| s.gas_price_delays = delays.into());
    }

    pub fn set_unknown_polls(&self, polls: u32) {
        self.with_state(|s| s.unknown_polls = polls);
    }

    pub fn set_pending_polls(&self, polls: u32) {
        self.with_state(|s| s.pending_polls = polls);
    }

    /// Fail the next `count` lookups with a transport error
    pub fn fail_lookups(&self, count: u32) {
        self.with_state(|s| s.lookup_failures = count);
    }

    pub fn set_receipt_status(&self, status: u64) {
        self.with_state(|s| s.receipt_status = status);
    }

    pub fn set_contract_address(&self, address: Address) {
        self.with_state(|s| s.contract_address = Some(address));
    }

    pub fn set_logs(&self, logs: Vec<LogEntry>) {
        self.with_state(|s| s.logs = logs);
    }

    pub fn set_call_output(&self, output: Bytes) {
        self.with_state(|s| s.call_output = output);
    }

    /// Make the peer aware of a hash without a submission
    pub fn track(&self, hash: H256) {
        self.with_state(|s| s.known.insert(hash, 0));
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn lookups(&self) -> u32 {
        self.with_state(|s| s.lookups)
    }

    pub fn block_number(&self) -> u64 {
        self.with_state(|s| s.block_number)
    }
}

impl Default for FakePeer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemotePeer for FakePeer {
    async fn nonce_at(&self, address: Address, _block: Option<BlockNumber>) -> PeerResult<u64> {
        Ok(self.with_state(|s| s.nonces.get(&address).copied().unwrap_or(0)))
    }

    async fn balance_at(&self, address: Address, _block: Option<BlockNumber>) -> PeerResult<U256> {
        Ok(self.with_state(|s| s.balances.get(&address).copied().unwrap_or_default()))
    }

    async fn suggest_gas_price(&self) -> PeerResult<U256> {
        let (delay, price) = self.with_state(|s| (s.gas_price_delays.pop_front(), s.gas_price));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(price)
    }

    async fn estimate_gas(&self, _call: &CallRequest) -> PeerResult<U256> {
        self.with_state(|s| match &s.estimate_error {
            Some(err) => Err(err.clone()),
            None => Ok(s.estimate),
        })
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> PeerResult<H256> {
        let tx: Transaction = rlp::decode(&raw).map_err(|e| PeerError::Rpc {
            code: -32602,
            message: format!("rlp: {}", e),
        })?;
        let hash = H256::from(keccak256(&raw));

        self.with_state(|s| {
            if let Some(err) = &s.send_error {
                return Err(err.clone());
            }
            s.known.insert(hash, 0);
            s.sent.push(tx);
            Ok(hash)
        })
    }

    async fn transaction_by_hash(&self, hash: H256) -> PeerResult<Option<TxLookup>> {
        self.with_state(|s| {
            s.lookups += 1;
            if s.lookup_failures > 0 {
                s.lookup_failures -= 1;
                return Err(PeerError::Transport("poll failed".to_string()));
            }

            let unknown = s.unknown_polls;
            let pending = s.pending_polls;
            let block_number = s.block_number;
            let Some(seen) = s.known.get_mut(&hash) else {
                return Ok(None);
            };
            *seen = seen.saturating_add(1);

            if *seen <= unknown {
                Ok(None)
            } else if *seen <= unknown.saturating_add(pending) {
                Ok(Some(TxLookup::Pending))
            } else {
                Ok(Some(TxLookup::Included { block_number }))
            }
        })
    }

    async fn transaction_receipt(&self, hash: H256) -> PeerResult<Option<Receipt>> {
        self.with_state(|s| {
            if let Some(err) = &s.receipt_error {
                return Err(err.clone());
            }
            if !s.is_final(&hash) {
                return Ok(None);
            }
            Ok(Some(Receipt {
                transaction_hash: hash,
                status: s.receipt_status,
                block_number: s.block_number,
                logs: s.logs.clone(),
                contract_address: s.contract_address,
            }))
        })
    }

    async fn call(&self, call: &CallRequest) -> PeerResult<Bytes> {
        Ok(self.with_state(|s| {
            s.calls.push(call.clone());
            s.call_output.clone()
        }))
    }
}
