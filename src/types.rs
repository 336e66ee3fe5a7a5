//! Core types used throughout LlamaPull
//!
//! Value records materialized from API responses. Everything here is an
//! immutable snapshot: created by a fetch, discarded when the caller is done.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One historical TVL snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    /// Snapshot time (UTC, decoded from epoch seconds)
    pub timestamp: DateTime<Utc>,
    /// Total value locked in USD
    pub tvl: f64,
}

/// Current TVL of one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTvl {
    /// Chain name (e.g. "Ethereum")
    pub chain: String,
    /// Native token symbol, if the chain has one
    pub token: Option<String>,
    /// Current TVL in USD
    pub tvl: f64,
}

/// One row of a protocol's per-chain TVL breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTvlRow {
    /// Chain name or breakdown bucket (e.g. "Ethereum", "borrowed")
    pub chain: String,
    /// TVL on that chain in USD
    pub tvl: f64,
}

/// Current price of one token, keyed by (chain, address)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Quote time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Token symbol reported by the price service
    pub symbol: String,
    /// Price in USD
    pub price: f64,
    /// Confidence score (0.0 - 1.0); absent for some sources
    pub confidence: Option<f64>,
    /// Chain part of the compound key (or "coingecko")
    pub chain: String,
    /// Address part of the compound key (or a coingecko id)
    pub token_address: String,
    /// Token decimals; absent for coingecko-sourced quotes
    pub decimals: Option<u32>,
}

/// Historical snapshot price of one token
///
/// Same shape as [`PricePoint`] minus the confidence score, which the
/// historical endpoint does not report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPricePoint {
    /// Snapshot time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Token symbol
    pub symbol: String,
    /// Price in USD at the snapshot
    pub price: f64,
    /// Chain part of the compound key
    pub chain: String,
    /// Address part of the compound key
    pub token_address: String,
    /// Token decimals, if known
    pub decimals: Option<u32>,
}

/// Fundamentals snapshot of one protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFundamentals {
    /// Protocol name
    pub name: String,
    /// Token symbol ("-" when the protocol has no token)
    pub symbol: Option<String>,
    /// Primary chain
    pub chain: String,
    /// Category (e.g. "Lending", "Dexes")
    pub category: Option<String>,
    /// All chains the protocol is deployed on
    pub chains: Vec<String>,
    /// Current TVL in USD
    pub tvl: Option<f64>,
    /// 1-day TVL change in percent
    pub change_1d: Option<f64>,
    /// 7-day TVL change in percent
    pub change_7d: Option<f64>,
    /// Fully diluted valuation
    pub fdv: Option<f64>,
    /// Market cap
    pub mcap: Option<f64>,
    /// Protocols this one was forked from
    pub forked_from: Option<Vec<String>>,
}

/// Block nearest to a requested timestamp on a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosestBlock {
    /// Chain the block belongs to
    pub chain: String,
    /// Block height
    pub height: u64,
    /// Block time (UTC)
    pub timestamp: DateTime<Utc>,
}

/// How a token is addressed in a price request
///
/// Replaces the loose address-to-chain map of older tooling with an explicit
/// ordered record: callers pass a `&[TokenKey]` and the request preserves
/// their order. Coingecko-listed assets use their listing id instead of a
/// contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKey {
    /// On-chain token contract
    Contract {
        /// Chain the contract lives on (e.g. "ethereum")
        chain: String,
        /// Contract address
        address: String,
    },
    /// Asset priced via its coingecko listing
    Coingecko {
        /// Coingecko id (e.g. "ethereum")
        id: String,
    },
}

impl TokenKey {
    /// On-chain contract key
    pub fn contract(chain: impl Into<String>, address: impl Into<String>) -> Self {
        TokenKey::Contract {
            chain: chain.into(),
            address: address.into(),
        }
    }

    /// Coingecko listing key
    pub fn coingecko(id: impl Into<String>) -> Self {
        TokenKey::Coingecko { id: id.into() }
    }

    /// Wire form used in price endpoint paths: `chain:address`
    pub fn wire_key(&self) -> String {
        match self {
            TokenKey::Contract { chain, address } => format!("{}:{}", chain, address),
            TokenKey::Coingecko { id } => format!("coingecko:{}", id),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_key())
    }
}

/// Join token keys into the comma-separated path segment the price
/// endpoints expect, preserving caller order.
pub fn join_token_keys(keys: &[TokenKey]) -> String {
    keys.iter()
        .map(TokenKey::wire_key)
        .collect::<Vec<_>>()
        .join(",")
}

/// Circulating amounts for one stablecoin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StablecoinCirculating {
    /// Stablecoin id as used by the stablecoin service (USDT is 1, USDC 2)
    pub id: i64,
    /// Name (e.g. "Tether")
    pub name: String,
    /// Symbol (e.g. "USDT")
    pub symbol: String,
    /// Coingecko id, if listed
    pub gecko_id: Option<String>,
    /// Peg type (e.g. "peggedUSD")
    pub peg_type: String,
    /// Peg mechanism (e.g. "fiat-backed")
    pub peg_mechanism: Option<String>,
    /// Circulating amount per peg type
    pub circulating: BTreeMap<String, f64>,
    /// Current price, when the service reports one
    pub price: Option<f64>,
}

/// One historical market-cap snapshot of a stablecoin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StablecoinMcapPoint {
    /// Snapshot time (UTC, decoded from epoch seconds)
    pub timestamp: DateTime<Utc>,
    /// Circulating amount per peg type
    pub circulating: BTreeMap<String, f64>,
    /// Circulating value in USD per peg type
    pub circulating_usd: BTreeMap<String, f64>,
}

/// Circulating amounts of one stablecoin on one chain, one row per
/// (chain, peg type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StablecoinChainCirculating {
    /// Chain name
    pub chain: String,
    /// Peg type (e.g. "peggedUSD")
    pub peg_type: String,
    /// Current circulating amount
    pub current: Option<f64>,
    /// Circulating amount one day earlier
    pub prev_day: Option<f64>,
    /// Circulating amount one week earlier
    pub prev_week: Option<f64>,
    /// Circulating amount one month earlier
    pub prev_month: Option<f64>,
}

/// Historical price of one stablecoin on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StablecoinPricePoint {
    /// Snapshot time (UTC, decoded from epoch seconds)
    pub timestamp: DateTime<Utc>,
    /// Stablecoin coingecko id (e.g. "tether")
    pub stablecoin: String,
    /// Price in USD
    pub price: f64,
}

/// Current stablecoin market cap on one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStablecoinMcap {
    /// Chain name
    pub chain: String,
    /// Circulating value in USD per peg type
    pub circulating_usd: BTreeMap<String, f64>,
}

/// Latest data for one yield pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolYield {
    /// Pool id, usable with the historical APY endpoint
    pub pool: String,
    /// Chain the pool is on
    pub chain: String,
    /// Project running the pool
    pub project: String,
    /// Pool symbol (e.g. "USDC-WETH")
    pub symbol: String,
    /// Pool TVL in USD
    pub tvl_usd: f64,
    /// Total APY in percent
    pub apy: Option<f64>,
    /// Base APY (fees) in percent
    pub apy_base: Option<f64>,
    /// Reward APY (incentives) in percent
    pub apy_reward: Option<f64>,
    /// 30-day APY change in percentage points
    pub apy_pct_30d: Option<f64>,
    /// Whether the pool is stablecoin-only
    pub stablecoin: bool,
    /// Impermanent-loss risk label ("yes"/"no")
    pub il_risk: Option<String>,
    /// Predicted APY direction class (e.g. "Stable/Up")
    pub predicted_class: Option<String>,
    /// Probability of the predicted class in percent
    pub predicted_probability: Option<f64>,
    /// Binned confidence level of the prediction
    pub binned_confidence: Option<f64>,
}

/// Daily average APY and TVL of one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolApyPoint {
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Mean TVL in USD over the day's samples
    pub tvl_usd: f64,
    /// Mean total APY in percent
    pub apy: Option<f64>,
    /// Mean base APY in percent
    pub apy_base: Option<f64>,
    /// Mean reward APY in percent
    pub apy_reward: Option<f64>,
}
