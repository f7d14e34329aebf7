//! Exporter command line.
//!
//! Every flag maps onto a field of [`collector::ExporterConfig`]; the API key
//! and upstream URL can also come from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use collector::config::DEFAULT_PORT;
use collector::{
    Address, ConfigurationError, EnabledFacts, ExporterConfig, Network, NetworkConfig,
};

/// Prometheus exporter for Etherscan.
#[derive(Parser, Debug)]
#[command(name = "exporter", version, about, long_about = None)]
pub struct Cli {
    /// Etherscan API key.
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Address the /metrics endpoint binds to.
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)).to_string())]
    pub listen: String,

    /// Comma-separated networks to scrape, in order.
    #[arg(long, value_delimiter = ',', default_value = "mainnet")]
    pub networks: Vec<Network>,

    /// Collect the latest block number.
    #[arg(long)]
    pub latest_block: bool,

    /// Collect the current gas price.
    #[arg(long)]
    pub gas_price: bool,

    /// Collect the balance of each network's configured address.
    #[arg(long)]
    pub account_balance: bool,

    /// Collect the total ether supply.
    #[arg(long)]
    pub ether_supply: bool,

    /// Collect the last ether price.
    #[arg(long)]
    pub last_price: bool,

    /// Collect the chain size reported for geth and parity.
    #[arg(long)]
    pub chain_size: bool,

    /// Account whose balance is tracked on mainnet.
    #[arg(long, value_name = "ADDRESS")]
    pub mainnet_address: Option<String>,

    /// Account whose balance is tracked on ropsten.
    #[arg(long, value_name = "ADDRESS")]
    pub ropsten_address: Option<String>,

    /// Account whose balance is tracked on kovan.
    #[arg(long, value_name = "ADDRESS")]
    pub kovan_address: Option<String>,

    /// Account whose balance is tracked on rinkeby.
    #[arg(long, value_name = "ADDRESS")]
    pub rinkeby_address: Option<String>,

    /// Account whose balance is tracked on goerli.
    #[arg(long, value_name = "ADDRESS")]
    pub goerli_address: Option<String>,

    /// Per-request upstream timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Base URL used for every network instead of the public Etherscan hosts.
    #[arg(long, env = "ETHERSCAN_API_URL")]
    pub api_url: Option<String>,
}

impl Cli {
    fn address_flag(&self, network: Network) -> Option<&str> {
        let flag = match network {
            Network::Mainnet => &self.mainnet_address,
            Network::Ropsten => &self.ropsten_address,
            Network::Kovan => &self.kovan_address,
            Network::Rinkeby => &self.rinkeby_address,
            Network::Goerli => &self.goerli_address,
        };
        flag.as_deref()
    }

    fn enabled_facts(&self) -> EnabledFacts {
        EnabledFacts {
            latest_block: self.latest_block,
            gas_price: self.gas_price,
            account_balance: self.account_balance,
            ether_supply: self.ether_supply,
            last_price: self.last_price,
            chain_size: self.chain_size,
        }
    }

    /// Converts the parsed flags into a validated [`ExporterConfig`].
    pub fn into_config(self) -> Result<ExporterConfig, ConfigurationError> {
        let mut networks = Vec::with_capacity(self.networks.len());
        for network in &self.networks {
            let mut entry = NetworkConfig::new(*network);
            if let Some(raw) = self.address_flag(*network) {
                entry = entry.with_address(raw.parse::<Address>()?);
            }
            networks.push(entry);
        }

        for network in Network::ALL {
            if let Some(raw) = self.address_flag(network) {
                // Validate even when unused so typos are caught at startup.
                raw.parse::<Address>()?;
                if !self.networks.contains(&network) {
                    tracing::warn!(%network, "address configured for a network that is not scraped");
                }
            }
        }

        let mut cfg = ExporterConfig::new(self.api_key.clone());
        cfg.listen_addr = self
            .listen
            .parse::<SocketAddr>()
            .map_err(|_| ConfigurationError::InvalidListenAddr(self.listen.clone()))?;
        cfg.collector.facts = self.enabled_facts();
        cfg.collector.networks = networks;
        cfg.client.timeout = Duration::from_secs(self.timeout_secs);
        cfg.client.base_url = self.api_url.clone();

        cfg.validate()?;
        Ok(cfg)
    }
}
