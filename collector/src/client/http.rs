//! HTTP client for the Etherscan API.
//!
//! Every request is a `GET <base>/api` with `module`, `action` and `apikey`
//! query parameters. Responses share one envelope:
//!
//! ```json
//! { "status": "1", "message": "OK", "result": ... }
//! ```
//!
//! while the `proxy` module answers JSON-RPC style:
//!
//! ```json
//! { "jsonrpc": "2.0", "id": 83, "result": "0x10d4f" }
//! { "jsonrpc": "2.0", "id": 83, "error": { "code": -32000, "message": "..." } }
//! ```
//!
//! Both shapes are folded into `Result<Value, UpstreamError>` by
//! [`extract_result`] before the per-fact parsers run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{ChainDataSource, MAX_ADDRESSES_PER_CALL, UpstreamError};
use crate::config::{ClientConfig, ConfigurationError};
use crate::types::{Address, ChainSizePoint, ClientType, EthPrice, Network};

/// Date format of the `startdate` / `enddate` parameters.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Blocking Etherscan client.
///
/// Thread-safe (`Send + Sync`); the orchestrator drives it from a single
/// blocking thread per scrape. Must not be dropped from inside an async
/// context, as the blocking `reqwest` client owns its own runtime.
pub struct EtherscanClient {
    api_key: String,
    base_url: Option<String>,
    client: Client,
}

impl EtherscanClient {
    /// Builds a client that authenticates with `api_key`.
    pub fn new(api_key: impl Into<String>, cfg: &ClientConfig) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: cfg.base_url.clone(),
            client,
        })
    }

    fn endpoint(&self, network: Network) -> String {
        let base = match &self.base_url {
            Some(url) => url.clone(),
            None => network.api_base(),
        };
        format!("{}/api", base.trim_end_matches('/'))
    }

    fn query(
        &self,
        network: Network,
        module: &str,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let url = self.endpoint(network);

        let mut query: Vec<(&str, &str)> = vec![("module", module), ("action", action)];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
        query.push(("apikey", self.api_key.as_str()));

        tracing::debug!(%network, module, action, "querying upstream");

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|e| transport_error(action, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = resp.json::<Value>().map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(action.to_string())
            } else {
                UpstreamError::Malformed(format!("{action}: {}", e.without_url()))
            }
        })?;

        extract_result(body)
    }
}

/// Maps a `reqwest` error without leaking the URL, which carries the API key.
fn transport_error(action: &str, err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(action.to_string())
    } else {
        UpstreamError::Transport(format!("{action}: {}", err.without_url()))
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: Option<String>,
    message: Option<String>,
    result: Option<Value>,
    error: Option<Value>,
}

/// Unwraps the `result` member of a response body, turning every error
/// shape the upstream uses into an [`UpstreamError`].
fn extract_result(body: Value) -> Result<Value, UpstreamError> {
    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| UpstreamError::Malformed(format!("unexpected response envelope: {e}")))?;

    if let Some(error) = envelope.error {
        let msg = match error.get("message").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => error.to_string(),
        };
        return Err(UpstreamError::Api(msg));
    }

    let result = envelope
        .result
        .ok_or_else(|| UpstreamError::Malformed("response has no result".to_string()))?;

    if envelope.status.as_deref() == Some("0") {
        // "No records found" style answers carry an empty list.
        if result.is_array() {
            return Ok(result);
        }
        let message = envelope.message.unwrap_or_default();
        return Err(UpstreamError::Api(format!("{message}: {}", display_value(&result))));
    }

    // Error text can hide in any result shape, not only in plain strings.
    let rendered = display_value(&result);
    if rendered.to_ascii_lowercase().contains("error") {
        return Err(UpstreamError::Api(rendered));
    }

    Ok(result)
}

fn display_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn expect_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, UpstreamError> {
    value
        .as_str()
        .ok_or_else(|| UpstreamError::Malformed(format!("{what}: expected a string, got {value}")))
}

/// Parses a `0x`-prefixed hex quantity, as returned by the `proxy` module.
pub fn parse_hex_quantity(raw: &str) -> Result<u128, UpstreamError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| UpstreamError::Malformed(format!("expected hex quantity, got {raw:?}")))?;

    u128::from_str_radix(digits, 16)
        .map_err(|e| UpstreamError::Malformed(format!("invalid hex quantity {raw:?}: {e}")))
}

fn parse_decimal<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, UpstreamError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| UpstreamError::Malformed(format!("{what}: invalid number {raw:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    account: String,
    balance: String,
}

fn parse_balances(result: Value) -> Result<BTreeMap<Address, u128>, UpstreamError> {
    let entries: Vec<BalanceEntry> = serde_json::from_value(result)
        .map_err(|e| UpstreamError::Malformed(format!("balancemulti: {e}")))?;

    entries
        .into_iter()
        .map(|entry| -> Result<(Address, u128), UpstreamError> {
            let address = entry.account.parse::<Address>().map_err(|_| {
                UpstreamError::Malformed(format!("balancemulti: bad account {:?}", entry.account))
            })?;
            let balance = parse_decimal(&entry.balance, "balancemulti")?;
            Ok((address, balance))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PriceResult {
    ethbtc: String,
    ethusd: String,
}

fn parse_price(result: Value) -> Result<EthPrice, UpstreamError> {
    let price: PriceResult = serde_json::from_value(result)
        .map_err(|e| UpstreamError::Malformed(format!("ethprice: {e}")))?;

    Ok(EthPrice {
        ethbtc: parse_decimal(&price.ethbtc, "ethbtc")?,
        ethusd: parse_decimal(&price.ethusd, "ethusd")?,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainSizeEntry {
    block_number: String,
    chain_size: String,
}

fn parse_chain_size(result: Value) -> Result<Vec<ChainSizePoint>, UpstreamError> {
    let entries: Vec<ChainSizeEntry> = serde_json::from_value(result)
        .map_err(|e| UpstreamError::Malformed(format!("chainsize: {e}")))?;

    let mut points = entries
        .iter()
        .map(|entry| -> Result<ChainSizePoint, UpstreamError> {
            Ok(ChainSizePoint {
                block_number: parse_decimal(&entry.block_number, "chainsize blockNumber")?,
                chain_size: parse_decimal(&entry.chain_size, "chainsize chainSize")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    points.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    Ok(points)
}

impl ChainDataSource for EtherscanClient {
    fn latest_block_number(&self, network: Network) -> Result<u64, UpstreamError> {
        let result = self.query(network, "proxy", "eth_blockNumber", &[])?;
        let height = parse_hex_quantity(expect_str(&result, "eth_blockNumber")?)?;
        u64::try_from(height)
            .map_err(|_| UpstreamError::Malformed(format!("block number {height} out of range")))
    }

    fn gas_price(&self, network: Network) -> Result<u128, UpstreamError> {
        let result = self.query(network, "proxy", "eth_gasPrice", &[])?;
        parse_hex_quantity(expect_str(&result, "eth_gasPrice")?)
    }

    fn account_balances(
        &self,
        network: Network,
        addresses: &[Address],
    ) -> Result<BTreeMap<Address, u128>, UpstreamError> {
        if addresses.len() > MAX_ADDRESSES_PER_CALL {
            return Err(UpstreamError::TooManyAddresses {
                count: addresses.len(),
                max: MAX_ADDRESSES_PER_CALL,
            });
        }
        if addresses.is_empty() {
            return Ok(BTreeMap::new());
        }

        let joined = addresses
            .iter()
            .map(Address::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let result = self.query(
            network,
            "account",
            "balancemulti",
            &[("address", joined), ("tag", "latest".to_string())],
        )?;
        parse_balances(result)
    }

    fn ether_supply(&self, network: Network) -> Result<u128, UpstreamError> {
        let result = self.query(network, "stats", "ethsupply", &[])?;
        parse_decimal(expect_str(&result, "ethsupply")?, "ethsupply")
    }

    fn last_price(&self, network: Network) -> Result<EthPrice, UpstreamError> {
        let result = self.query(network, "stats", "ethprice", &[])?;
        parse_price(result)
    }

    fn chain_size(
        &self,
        network: Network,
        client: ClientType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ChainSizePoint>, UpstreamError> {
        let result = self.query(
            network,
            "stats",
            "chainsize",
            &[
                ("startdate", start.format(DATE_FORMAT).to_string()),
                ("enddate", end.format(DATE_FORMAT).to_string()),
                ("clienttype", client.as_str().to_string()),
                ("syncmode", "default".to_string()),
                ("sort", "desc".to_string()),
            ],
        )?;
        parse_chain_size(result)
    }
}
