//! Clients for the upstream blockchain-data API.
//!
//! The orchestrator only sees the [`ChainDataSource`] trait: one method per
//! [`crate::types::Fact`], each returning a typed value or an
//! [`UpstreamError`]. [`http::EtherscanClient`] is the production
//! implementation; tests plug in stubs.

pub mod http;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{Address, ChainSizePoint, ClientType, EthPrice, Network};

pub use http::EtherscanClient;

/// Maximum number of addresses the upstream accepts in one balance call.
pub const MAX_ADDRESSES_PER_CALL: usize = 20;

/// Any failure talking to or parsing the upstream API.
///
/// These are recovered per fact and network: the affected sample is dropped
/// and the scrape carries on.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The per-call timeout elapsed.
    #[error("{0} request timed out")]
    Timeout(String),

    /// Connection-level failure (DNS, TLS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP response.
    #[error("upstream returned HTTP status {0}")]
    Status(u16),

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The upstream answered with an error payload (bad key, rate limit, ...).
    #[error("upstream reported an error: {0}")]
    Api(String),

    /// More addresses than the upstream accepts in a single call.
    #[error("{count} addresses requested, at most {max} allowed per call")]
    TooManyAddresses { count: usize, max: usize },
}

/// Source of the facts the orchestrator collects.
///
/// Every call is synchronous and maps to one logical upstream request.
pub trait ChainDataSource: Send + Sync {
    /// Number of the most recent block.
    fn latest_block_number(&self, network: Network) -> Result<u64, UpstreamError>;

    /// Current gas price in wei.
    fn gas_price(&self, network: Network) -> Result<u128, UpstreamError>;

    /// Balances in wei, keyed by address. At most [`MAX_ADDRESSES_PER_CALL`]
    /// addresses per call.
    fn account_balances(
        &self,
        network: Network,
        addresses: &[Address],
    ) -> Result<BTreeMap<Address, u128>, UpstreamError>;

    /// Total ether supply in wei.
    fn ether_supply(&self, network: Network) -> Result<u128, UpstreamError>;

    /// Last ether spot price.
    fn last_price(&self, network: Network) -> Result<EthPrice, UpstreamError>;

    /// Chain size points between `start` and `end` (inclusive), most recent
    /// block first. May be empty.
    fn chain_size(
        &self,
        network: Network,
        client: ClientType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChainSizePoint>, UpstreamError>;
}
