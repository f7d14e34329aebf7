//! Core domain types used by the collector.
//!
//! This module defines the networks we know how to query, validated account
//! addresses, the catalog of collectible facts, and the typed values the
//! upstream client hands back. The goal is to avoid "naked" strings in public
//! APIs and instead use domain-specific enums and newtypes.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigurationError;

/// Length in bytes of an Ethereum account address.
pub const ADDRESS_LEN: usize = 20;

/// Ethereum network served by the upstream API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Network {
    Mainnet,
    Ropsten,
    Kovan,
    Rinkeby,
    Goerli,
}

impl Network {
    /// Every supported network, in the order flags are documented.
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Ropsten,
        Network::Kovan,
        Network::Rinkeby,
        Network::Goerli,
    ];

    /// Lowercase name used in flags and in the `network` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Ropsten => "ropsten",
            Network::Kovan => "kovan",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
        }
    }

    /// Default upstream base URL for this network (without a trailing slash).
    pub fn api_base(&self) -> String {
        match self {
            Network::Mainnet => "https://api.etherscan.io".to_string(),
            other => format!("https://api-{}.etherscan.io", other.as_str()),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.as_str() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownNetwork(s.to_string()))
    }
}

/// Validated Ethereum account address.
///
/// Always `0x` followed by 40 lowercase hex digits. Upstream responses may
/// echo addresses in checksummed (mixed) case, so both sides are normalized
/// before comparison.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Address(String);

impl Address {
    /// Returns the normalized `0x`-prefixed representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ConfigurationError::InvalidAddress(s.to_string()))?;

        let bytes =
            hex::decode(digits).map_err(|_| ConfigurationError::InvalidAddress(s.to_string()))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(ConfigurationError::InvalidAddress(s.to_string()));
        }

        Ok(Address(format!("0x{}", hex::encode(bytes))))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One category of on-chain measurement exposed as a metric family.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Fact {
    LatestBlock,
    GasPrice,
    AccountBalance,
    EtherSupply,
    LastPrice,
    ChainSize,
}

impl Fact {
    /// Every fact, in collection order.
    pub const ALL: [Fact; 6] = [
        Fact::LatestBlock,
        Fact::GasPrice,
        Fact::AccountBalance,
        Fact::EtherSupply,
        Fact::LastPrice,
        Fact::ChainSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Fact::LatestBlock => "latest_block",
            Fact::GasPrice => "gas_price",
            Fact::AccountBalance => "account_balance",
            Fact::EtherSupply => "ether_supply",
            Fact::LastPrice => "last_price",
            Fact::ChainSize => "chain_size",
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ethereum client implementation the chain size statistics are reported for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ClientType {
    Geth,
    Parity,
}

impl ClientType {
    pub const ALL: [ClientType; 2] = [ClientType::Geth, ClientType::Parity];

    /// Name the upstream expects in `clienttype`, also used as the `client` label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Geth => "geth",
            ClientType::Parity => "parity",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spot price of ether against BTC and USD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EthPrice {
    pub ethbtc: f64,
    pub ethusd: f64,
}

/// Size of a fully synced chain at a given block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainSizePoint {
    pub block_number: u64,
    /// Size on disk in bytes.
    pub chain_size: u64,
}
