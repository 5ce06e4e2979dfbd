//! Configuration management for the meter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::U256;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chain: ChainConfig,
    #[serde(default)]
    pub gas: GasConfig,
    pub wallet: WalletConfig,
    pub meter: MeterConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on each confirmation wait; unbounded when absent
    pub confirmation_timeout_secs: Option<u64>,
}

impl ChainConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GasConfig {
    pub price_buffer_percent: u64,
    pub limit_buffer_percent: u64,
    pub max_gas_price_gwei: Option<u64>,
    pub create_gas_limit: u64,
    pub invoke_gas_ceiling: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_buffer_percent: 0,
            limit_buffer_percent: 20,
            max_gas_price_gwei: None,
            create_gas_limit: 10_000_000,
            invoke_gas_ceiling: 50_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding the master key as hex
    pub private_key_env: String,
}

impl WalletConfig {
    pub fn private_key(&self) -> Result<String> {
        env::var(&self.private_key_env).with_context(|| {
            format!(
                "No master key configured. Set {} to a hex private key",
                self.private_key_env
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    pub accounts: usize,
    pub txs_per_account: usize,
    /// Decimal wei amount sent to each fresh account
    pub fund_amount_wei: String,
    /// Hex-encoded creation bytecode of the counter contract
    pub contract_bytecode_path: PathBuf,
}

impl MeterConfig {
    pub fn fund_amount(&self) -> Result<U256> {
        U256::from_dec_str(&self.fund_amount_wei)
            .with_context(|| format!("Invalid fund amount: {}", self.fund_amount_wei))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9100,
        }
    }
}

impl Settings {
    /// Load settings from the file named by `TX_METER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("TX_METER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse and validate a TOML document
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }
        if self.chain.rpc_url.is_empty() {
            anyhow::bail!("No RPC URL configured");
        }
        if self.chain.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be non-zero");
        }
        if self.gas.invoke_gas_ceiling > self.gas.create_gas_limit {
            anyhow::bail!(
                "Invocation gas ceiling {} exceeds creation gas limit {}",
                self.gas.invoke_gas_ceiling,
                self.gas.create_gas_limit
            );
        }
        if self.meter.accounts == 0 {
            anyhow::bail!("Meter needs at least one account");
        }
        self.meter.fund_amount()?;

        Ok(())
    }
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
