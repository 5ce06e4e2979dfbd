//! Throughput meter: deploy a counter contract, fund fresh accounts and
//! drive `add()` calls from all of them concurrently

use crate::account::Account;
use crate::chain::RemotePeer;
use crate::config::{ChainConfig, GasConfig, MeterConfig, Settings};
use crate::contract::StatContract;
use crate::error::{ClientError, ClientResult};

use ethers::types::{Address, H256, U256};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Outcome of one meter run
#[derive(Debug, Clone)]
pub struct MeterReport {
    pub contract: Address,
    /// Invocations accepted by the peer
    pub sent: usize,
    /// Invocations that failed to build or submit
    pub failed: usize,
    /// Counter value read back from the contract
    pub counted: U256,
    pub elapsed: Duration,
}

impl MeterReport {
    pub fn tps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.counted.low_u64() as f64 / secs
    }
}

#[derive(Debug, Default)]
struct DriveOutcome {
    sent: usize,
    failed: usize,
}

pub struct Meter {
    peer: Arc<dyn RemotePeer>,
    master: Account,
    chain: ChainConfig,
    gas: GasConfig,
    config: MeterConfig,
    shutdown: watch::Receiver<bool>,
}

impl Meter {
    pub fn new(
        peer: Arc<dyn RemotePeer>,
        master: Account,
        settings: &Settings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            peer,
            master,
            chain: settings.chain.clone(),
            gas: settings.gas.clone(),
            config: settings.meter.clone(),
            shutdown,
        }
    }

    pub async fn run(&self) -> ClientResult<MeterReport> {
        let contract = self.deploy().await?;
        let accounts = self.prepare_accounts().await?;

        info!(
            "Driving {} accounts x {} calls against {:?}",
            accounts.len(),
            self.config.txs_per_account,
            contract
        );
        let started = Instant::now();

        let handles: Vec<_> = accounts
            .into_iter()
            .map(|account| {
                let calls = self.config.txs_per_account;
                tokio::spawn(async move { drive(account, contract, calls).await })
            })
            .collect();

        let mut sent = 0;
        let mut failed = 0;
        for handle in join_all(handles).await {
            match handle {
                Ok(outcome) => {
                    sent += outcome.sent;
                    failed += outcome.failed;
                }
                Err(e) => error!("Meter task failed: {}", e),
            }
        }
        let elapsed = started.elapsed();

        let counted = self.tx_num(contract).await?;
        let report = MeterReport {
            contract,
            sent,
            failed,
            counted,
            elapsed,
        };
        info!(
            "Meter done: {} sent, {} failed, {} counted in {:?} ({:.2} tx/s)",
            report.sent,
            report.failed,
            report.counted,
            report.elapsed,
            report.tps()
        );
        Ok(report)
    }

    async fn deploy(&self) -> ClientResult<Address> {
        let bytecode = StatContract::load_bytecode(&self.config.contract_bytecode_path)?;
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        self.master
            .deploy_contract(StatContract::deploy_payload(&bytecode, start_time))
            .await
    }

    /// Create fresh accounts and fund them from the master account
    async fn prepare_accounts(&self) -> ClientResult<Vec<Arc<Account>>> {
        let amount = self
            .config
            .fund_amount()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        let mut accounts = Vec::with_capacity(self.config.accounts);
        let mut funding = Vec::with_capacity(self.config.accounts);
        for _ in 0..self.config.accounts {
            let account = Account::fresh(self.peer.clone(), &self.chain, &self.gas)
                .await?
                .with_shutdown(self.shutdown.clone());
            funding.push(self.master.transfer(account.address(), amount).await?);
            accounts.push(Arc::new(account));
        }

        for result in join_all(funding.iter().map(|hash| self.master.wait(*hash))).await {
            result?;
        }

        info!("Funded {} accounts with {} wei each", accounts.len(), amount);
        Ok(accounts)
    }

    async fn tx_num(&self, contract: Address) -> ClientResult<U256> {
        let output = self.master.call(contract, StatContract::tx_num()).await?;
        StatContract::decode_tx_num(&output)
    }
}

/// Send `calls` invocations from one account and wait for the last one.
/// Stops at the first failure since later nonces would never be mined.
async fn drive(account: Arc<Account>, contract: Address, calls: usize) -> DriveOutcome {
    let mut outcome = DriveOutcome::default();
    let mut last: Option<H256> = None;

    for _ in 0..calls {
        match account.invoke(contract, StatContract::add()).await {
            Ok(hash) => {
                outcome.sent += 1;
                last = Some(hash);
            }
            Err(e) => {
                warn!("Account {:?} stopped: {}", account.address(), e);
                outcome.failed += 1;
                break;
            }
        }
    }

    if let Some(hash) = last {
        if let Err(e) = account.wait(hash).await {
            error!("Last call {:?} from {:?} failed: {}", hash, account.address(), e);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakePeer, TEST_KEY};
    use ethers::abi::{self, Token};
    use ethers::types::Bytes;
    use std::io::Write;

    fn settings(bytecode_path: &std::path::Path, accounts: usize, calls: usize) -> Settings {
        Settings::parse(&format!(
            r#"
            [chain]
            chain_id = 1337
            rpc_url = "http://localhost:8545"
            poll_interval_ms = 1

            [wallet]
            private_key_env = "TX_METER_UNUSED"

            [meter]
            accounts = {}
            txs_per_account = {}
            fund_amount_wei = "1000000000000000000"
            contract_bytecode_path = "{}"
            "#,
            accounts,
            calls,
            bytecode_path.display()
        ))
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_meter_run() {
        let mut bytecode = tempfile::NamedTempFile::new().unwrap();
        writeln!(bytecode, "0x60806040").unwrap();
        let settings = settings(bytecode.path(), 2, 3);

        let peer = Arc::new(FakePeer::new());
        peer.set_contract_address(Address::repeat_byte(0xcc));
        peer.set_call_output(Bytes::from(abi::encode(&[Token::Uint(U256::from(6))])));

        let master = Account::master(peer.clone(), TEST_KEY, &settings.chain, &settings.gas)
            .await
            .unwrap();
        let (_tx, rx) = watch::channel(false);
        let meter = Meter::new(peer.clone(), master, &settings, rx);

        let report = meter.run().await.unwrap();
        assert_eq!(report.contract, Address::repeat_byte(0xcc));
        assert_eq!(report.sent, 6);
        assert_eq!(report.failed, 0);
        assert_eq!(report.counted, U256::from(6));

        // deploy + 2 fundings + 6 calls
        let sent = peer.sent();
        assert_eq!(sent.len(), 9);
        assert!(sent[0].to.is_none());
        assert_eq!(sent[1].value, U256::exp10(18));
    }

    #[tokio::test]
    async fn test_missing_bytecode_fails_before_sending() {
        let settings = settings(std::path::Path::new("/nonexistent/stat.hex"), 1, 1);
        let peer = Arc::new(FakePeer::new());
        let master = Account::master(peer.clone(), TEST_KEY, &settings.chain, &settings.gas)
            .await
            .unwrap();
        let (_tx, rx) = watch::channel(false);

        let err = Meter::new(peer.clone(), master, &settings, rx)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Contract(_)));
        assert!(peer.sent().is_empty());
    }

    #[test]
    fn test_tps() {
        let report = MeterReport {
            contract: Address::zero(),
            sent: 10,
            failed: 0,
            counted: U256::from(10),
            elapsed: Duration::from_secs(4),
        };
        assert_eq!(report.tps(), 2.5);
    }
}
