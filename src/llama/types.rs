//! Wire types for DeFi Llama responses
//!
//! Raw serde shapes as the services emit them. The normalize module turns
//! these into the row records in `crate::types`.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Accept an integer that some endpoints serialize as a JSON number and
/// others as a quoted string (`/charts` dates, stablecoin ids).
pub(crate) fn de_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(f64),
        Text(String),
    }

    match NumOrText::deserialize(deserializer)? {
        NumOrText::Num(n) => Ok(n as i64),
        NumOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(|n| n as i64)
            .map_err(serde::de::Error::custom),
    }
}

/// One row of a historical TVL series: `{date, totalLiquidityUSD}`
#[derive(Debug, Clone, Deserialize)]
pub struct RawTvlRow {
    /// Epoch seconds; `/charts` quotes these as strings
    #[serde(deserialize_with = "de_lenient_i64")]
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

/// One row of `/chains`
#[derive(Debug, Clone, Deserialize)]
pub struct RawChainTvl {
    pub name: String,
    #[serde(rename = "tokenSymbol")]
    pub token_symbol: Option<String>,
    pub tvl: f64,
}

/// Envelope of the price endpoints: `{"coins": {"chain:address": {...}}}`
///
/// A `BTreeMap` keeps row order deterministic (sorted by compound key).
#[derive(Debug, Clone, Deserialize)]
pub struct PriceResponse {
    #[serde(default)]
    pub coins: BTreeMap<String, CoinQuote>,
}

/// Value object of one price key
#[derive(Debug, Clone, Deserialize)]
pub struct CoinQuote {
    pub price: f64,
    pub symbol: String,
    #[serde(deserialize_with = "de_lenient_i64")]
    pub timestamp: i64,
    pub decimals: Option<u32>,
    pub confidence: Option<f64>,
}

/// One record of `/protocols`
#[derive(Debug, Clone, Deserialize)]
pub struct Protocol {
    pub name: String,
    pub slug: Option<String>,
    pub symbol: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub chain: String,
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    pub gecko_id: Option<String>,
    pub tvl: Option<f64>,
    pub change_1d: Option<f64>,
    pub change_7d: Option<f64>,
    pub fdv: Option<f64>,
    pub mcap: Option<f64>,
    #[serde(rename = "forkedFrom")]
    pub forked_from: Option<Vec<String>>,
}

/// `/protocol/{protocol}` detail with per-chain breakdowns
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolDetail {
    pub name: String,
    /// Current TVL per chain, including non-canonical buckets like "staking"
    #[serde(rename = "currentChainTvls", default)]
    pub current_chain_tvls: BTreeMap<String, f64>,
    /// Historical TVL series per chain
    #[serde(rename = "chainTvls", default)]
    pub chain_tvls: BTreeMap<String, ChainTvlSeries>,
}

/// Per-chain slice of a protocol detail
#[derive(Debug, Clone, Deserialize)]
pub struct ChainTvlSeries {
    #[serde(default)]
    pub tvl: Vec<RawTvlRow>,
}

/// `/block/{chain}/{timestamp}` response
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub height: u64,
    #[serde(deserialize_with = "de_lenient_i64")]
    pub timestamp: i64,
}

/// Envelope of `/stablecoins`
#[derive(Debug, Clone, Deserialize)]
pub struct StablecoinsResponse {
    #[serde(rename = "peggedAssets", default)]
    pub pegged_assets: Vec<RawStablecoin>,
}

/// One pegged asset of `/stablecoins`
#[derive(Debug, Clone, Deserialize)]
pub struct RawStablecoin {
    /// Quoted in the response ("1" for USDT)
    #[serde(deserialize_with = "de_lenient_i64")]
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub gecko_id: Option<String>,
    #[serde(rename = "pegType")]
    pub peg_type: String,
    #[serde(rename = "pegMechanism")]
    pub peg_mechanism: Option<String>,
    #[serde(default)]
    pub circulating: BTreeMap<String, f64>,
    /// Per-chain nesting, used only by the by-chain breakdown
    #[serde(rename = "chainCirculating", default)]
    pub chain_circulating: BTreeMap<String, RawChainCirculating>,
    pub price: Option<f64>,
}

/// Circulating snapshots of one stablecoin on one chain, keyed by peg type
#[derive(Debug, Clone, Deserialize)]
pub struct RawChainCirculating {
    #[serde(default)]
    pub current: BTreeMap<String, f64>,
    #[serde(rename = "circulatingPrevDay", default)]
    pub circulating_prev_day: BTreeMap<String, f64>,
    #[serde(rename = "circulatingPrevWeek", default)]
    pub circulating_prev_week: BTreeMap<String, f64>,
    #[serde(rename = "circulatingPrevMonth", default)]
    pub circulating_prev_month: BTreeMap<String, f64>,
}

/// One row of `/stablecoincharts/{all|chain}`
#[derive(Debug, Clone, Deserialize)]
pub struct RawStablecoinMcapRow {
    #[serde(deserialize_with = "de_lenient_i64")]
    pub date: i64,
    #[serde(rename = "totalCirculating", default)]
    pub total_circulating: BTreeMap<String, f64>,
    #[serde(rename = "totalCirculatingUSD", default)]
    pub total_circulating_usd: BTreeMap<String, f64>,
}

///// One row of `/stablecoinprices`: a date with the prices of every
/// stablecoin on that day, keyed by coingecko id
#[derive(Debug, Clone, Deserialize)]
pub struct RawStablecoinPriceRow {
    #[serde(deserialize_with = "de_lenient_i64")]
    pub date: i64,
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
}

/// One row of `/stablecoinchains`
#[derive(Debug, Clone, Deserialize)]
pub struct RawChainStablecoinMcap {
    pub name: String,
    #[serde(rename = "totalCirculatingUSD", default)]
    pub total_circulating_usd: BTreeMap<String, f64>,
}

/// Envelope of the yields `/pools` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PoolsResponse {
    #[serde(default)]
    pub data: Vec<RawPool>,
}

/// One pool of `/pools`
#[derive(Debug, Clone, Deserialize)]
pub struct RawPool {
    pub pool: String,
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(rename = "tvlUsd")]
    pub tvl_usd: f64,
    pub apy: Option<f64>,
    #[serde(rename = "apyBase")]
    pub apy_base: Option<f64>,
    #[serde(rename = "apyReward")]
    pub apy_reward: Option<f64>,
    #[serde(rename = "apyPct30D")]
    pub apy_pct_30d: Option<f64>,
    #[serde(default)]
    pub stablecoin: bool,
    #[serde(rename = "ilRisk")]
    pub il_risk: Option<String>,
    pub predictions: Option<RawPoolPredictions>,
}

/// Nested prediction object of `/pools`, flattened into the output row
#[derive(Debug, Clone, Deserialize)]
pub struct RawPoolPredictions {
    #[serde(rename = "predictedClass")]
    pub predicted_class: Option<String>,
    #[serde(rename = "predictedProbability")]
    pub predicted_probability: Option<f64>,
    #[serde(rename = "binnedConfidence")]
    pub binned_confidence: Option<f64>,
}

/// Envelope of the yields `/chart/{pool}` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PoolChartResponse {
    #[serde(default)]
    pub data: Vec<RawPoolApyRow>,
}

/// One sample of `/chart/{pool}`; timestamps are RFC 3339 strings here,
/// unlike the epoch-second TVL series
#[derive(Debug, Clone, Deserialize)]
pub struct RawPoolApyRow {
    pub timestamp: String,
    #[serde(rename = "tvlUsd")]
    pub tvl_usd: Option<f64>,
    pub apy: Option<f64>,
    #[serde(rename = "apyBase")]
    pub apy_base: Option<f64>,
    #[serde(rename = "apyReward")]
    pub apy_reward: Option<f64>,
}
