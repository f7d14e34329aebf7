//! Top-level configuration for the exporter.
//!
//! This module aggregates configuration for:
//!
//! - which facts to collect and for which networks (`CollectorConfig`),
//! - the upstream HTTP client (timeout + optional base URL override),
//! - the rate governor (ceiling + pause length),
//! - the metrics listener (`listen_addr`).
//!
//! Everything here is built once at startup, validated with
//! [`ExporterConfig::validate`], and never mutated afterwards.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::types::{Address, Fact, Network};

/// Port the `/metrics` endpoint listens on unless overridden.
pub const DEFAULT_PORT: u16 = 8000;

/// Upstream ceiling, in requests per second.
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: usize = 5;

/// Invalid startup configuration. Always fatal: the process must not serve.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("an Etherscan API key is required")]
    MissingApiKey,

    #[error("invalid account address {0:?}: expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    #[error("unknown network {0:?}")]
    UnknownNetwork(String),

    #[error("network {0} is configured more than once")]
    DuplicateNetwork(Network),

    #[error("at least one network must be configured")]
    NoNetworks,

    #[error("upstream timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Which facts are collected. Disabled facts are never queried.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EnabledFacts {
    pub latest_block: bool,
    pub gas_price: bool,
    pub account_balance: bool,
    pub ether_supply: bool,
    pub last_price: bool,
    pub chain_size: bool,
}

impl EnabledFacts {
    /// Every fact disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every fact enabled.
    pub fn all() -> Self {
        Self {
            latest_block: true,
            gas_price: true,
            account_balance: true,
            ether_supply: true,
            last_price: true,
            chain_size: true,
        }
    }

    pub fn is_enabled(&self, fact: Fact) -> bool {
        match fact {
            Fact::LatestBlock => self.latest_block,
            Fact::GasPrice => self.gas_price,
            Fact::AccountBalance => self.account_balance,
            Fact::EtherSupply => self.ether_supply,
            Fact::LastPrice => self.last_price,
            Fact::ChainSize => self.chain_size,
        }
    }

    /// Enabled facts in collection order.
    pub fn iter(&self) -> impl Iterator<Item = Fact> + '_ {
        Fact::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }
}

/// One network to scrape, plus the optional address whose balance is tracked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkConfig {
    pub network: Network,
    pub address: Option<Address>,
}

impl NetworkConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            address: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }
}

/// Collection settings handed to the orchestrator at construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectorConfig {
    pub facts: EnabledFacts,
    /// Networks in scrape order.
    pub networks: Vec<NetworkConfig>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            facts: EnabledFacts::none(),
            networks: vec![NetworkConfig::new(Network::Mainnet)],
        }
    }
}

impl CollectorConfig {
    /// Rejects empty and duplicated network lists.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.networks.is_empty() {
            return Err(ConfigurationError::NoNetworks);
        }

        let mut seen = HashSet::new();
        for entry in &self.networks {
            if !seen.insert(entry.network) {
                return Err(ConfigurationError::DuplicateNetwork(entry.network));
            }
        }

        Ok(())
    }
}

/// Configuration for the upstream HTTP client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Per-request timeout. A stalled network surfaces as a timeout instead
    /// of stalling the whole scrape.
    pub timeout: Duration,
    /// Base URL used for every network instead of the public Etherscan hosts,
    /// e.g. a caching proxy.
    pub base_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            base_url: None,
        }
    }
}

/// Configuration for the rate governor.
#[derive(Clone, Debug)]
pub struct GovernorConfig {
    /// Requests per second the upstream tolerates.
    pub max_requests_per_second: usize,
    /// Length of one pause.
    pub pause: Duration,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            pause: Duration::from_secs(1),
        }
    }
}

/// Top-level configuration for the exporter process.
#[derive(Clone, Debug)]
pub struct ExporterConfig {
    pub api_key: String,
    /// Address the `/metrics` HTTP server binds to.
    pub listen_addr: SocketAddr,
    pub collector: CollectorConfig,
    pub client: ClientConfig,
    pub governor: GovernorConfig,
}

impl ExporterConfig {
    /// Builds a configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            collector: CollectorConfig::default(),
            client: ClientConfig::default(),
            governor: GovernorConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }
        if self.client.timeout.is_zero() {
            return Err(ConfigurationError::ZeroTimeout);
        }
        self.collector.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae".parse().unwrap()
    }

    #[test]
    fn defaults_listen_on_documented_port() {
        let cfg = ExporterConfig::new("key");
        assert_eq!(cfg.listen_addr.port(), DEFAULT_PORT);
        assert_eq!(cfg.governor.max_requests_per_second, 5);
        assert_eq!(cfg.collector.networks, vec![NetworkConfig::new(Network::Mainnet)]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let cfg = ExporterConfig::new("   ");
        assert!(matches!(cfg.validate(), Err(ConfigurationError::MissingApiKey)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = ExporterConfig::new("key");
        cfg.client.timeout = Duration::ZERO;
        assert!(matches!(cfg.validate(), Err(ConfigurationError::ZeroTimeout)));
    }

    #[test]
    fn duplicate_networks_are_rejected() {
        let mut cfg = ExporterConfig::new("key");
        cfg.collector.networks = vec![
            NetworkConfig::new(Network::Kovan),
            NetworkConfig::new(Network::Kovan).with_address(address()),
        ];
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateNetwork(Network::Kovan)));
    }

    #[test]
    fn empty_network_list_is_rejected() {
        let mut cfg = ExporterConfig::new("key");
        cfg.collector.networks.clear();
        assert!(matches!(cfg.validate(), Err(ConfigurationError::NoNetworks)));
    }

    #[test]
    fn enabled_facts_iterate_in_collection_order() {
        let facts = EnabledFacts {
            chain_size: true,
            latest_block: true,
            ..EnabledFacts::none()
        };
        let got: Vec<Fact> = facts.iter().collect();
        assert_eq!(got, vec![Fact::LatestBlock, Fact::ChainSize]);
        assert_eq!(EnabledFacts::all().iter().count(), Fact::ALL.len());
        assert_eq!(EnabledFacts::none().iter().count(), 0);
    }
}
