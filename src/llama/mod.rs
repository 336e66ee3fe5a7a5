//! DeFi Llama API client
//!
//! One client for the five Llama services (TVL, coin prices, stablecoins,
//! yields, ABI decoder), each behind its own base URL. Every operation is a
//! single GET plus a reshape; there are no retries, caching or rate limits.
//!
//! API documentation: https://defillama.com/docs/api

pub mod types;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use self::types::{
    PoolChartResponse, PoolsResponse, PriceResponse, Protocol, ProtocolDetail, RawBlock,
    RawChainStablecoinMcap, RawChainTvl, RawStablecoinMcapRow, RawStablecoinPriceRow, RawTvlRow,
    StablecoinsResponse,
};
use crate::error::Error;
use crate::normalize::{
    block_lookup, chain_breakdown, fundamentals_from_protocols, historical_price_rows,
    tidy_chain_stablecoin_mcaps, tidy_pool_apy, tidy_pools, tidy_price_response,
    tidy_stablecoin_chain_circulating, tidy_stablecoin_mcap_series, tidy_stablecoin_prices,
    tidy_stablecoins, tidy_tvl_series, StakingPolicy, TailPolicy,
};
use crate::types::{
    join_token_keys, ChainStablecoinMcap, ChainTvl, ChainTvlRow, ClosestBlock,
    HistoricalPricePoint, PoolApyPoint, PoolYield, PricePoint, ProtocolFundamentals,
    StablecoinChainCirculating, StablecoinCirculating, StablecoinMcapPoint, StablecoinPricePoint,
    TokenKey, TvlPoint,
};

const TVL_BASE_URL: &str = "https://api.llama.fi";
const COINS_BASE_URL: &str = "https://coins.llama.fi";
const STABLECOINS_BASE_URL: &str = "https://stablecoins.llama.fi";
const YIELDS_BASE_URL: &str = "https://yields.llama.fi";
const ABI_DECODER_BASE_URL: &str = "https://abi-decoder.llama.fi";

/// Per-request timeout
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The fixed set of Llama services
///
/// Closed enum: an endpoint is always dispatched to exactly the service it
/// names, and parsing a tag string fails loudly instead of falling back to
/// an arbitrary base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    Tvl,
    Coins,
    Stablecoins,
    Yields,
    AbiDecoder,
}

impl Api {
    /// Base URL the service answers on
    pub fn base_url(&self) -> &'static str {
        match self {
            Api::Tvl => TVL_BASE_URL,
            Api::Coins => COINS_BASE_URL,
            Api::Stablecoins => STABLECOINS_BASE_URL,
            Api::Yields => YIELDS_BASE_URL,
            Api::AbiDecoder => ABI_DECODER_BASE_URL,
        }
    }
}

impl FromStr for Api {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TVL" => Ok(Api::Tvl),
            "COINS" => Ok(Api::Coins),
            "STABLECOINS" => Ok(Api::Stablecoins),
            "YIELDS" => Ok(Api::Yields),
            "ABI_DECODER" => Ok(Api::AbiDecoder),
            other => Err(Error::UnknownApiCategory(other.to_string())),
        }
    }
}

/// Client for the DeFi Llama services
///
/// Holds one `reqwest::Client`, so the connection pool is reused across
/// calls. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LlamaClient {
    client: Client,
}

impl LlamaClient {
    /// Client with the default 30 s timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Client with a caller-chosen timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Raw GET returning the parsed JSON body, for endpoints without a
    /// typed wrapper.
    pub async fn get_json(
        &self,
        api: Api,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        self.get_with_params(api, endpoint, params).await
    }

    async fn get<T: DeserializeOwned>(&self, api: Api, endpoint: &str) -> Result<T> {
        self.get_with_params(api, endpoint, &[]).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        api: Api,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", api.base_url(), endpoint);
        debug!(url = %url, "GET");

        let mut request = self.client.get(&url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        if !response.status().is_success() {
            bail!("{} returned HTTP {}", url, response.status());
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Current TVL of a protocol in USD
    pub async fn protocol_current_tvl(&self, protocol: &str) -> Result<f64> {
        let value: serde_json::Value = self
            .get(Api::Tvl, &format!("/tvl/{}", protocol))
            .await?;
        // The endpoint returns a bare number.
        value
            .as_f64()
            .ok_or(Error::MissingField("tvl"))
            .map_err(Into::into)
    }

    /// Current TVL of every chain
    pub async fn chains_current_tvl(&self) -> Result<Vec<ChainTvl>> {
        let rows: Vec<RawChainTvl> = self.get(Api::Tvl, "/chains").await?;
        Ok(rows
            .into_iter()
            .map(|r| ChainTvl {
                chain: r.name,
                token: r.token_symbol,
                tvl: r.tvl,
            })
            .collect())
    }

    /// Historical TVL of DeFi across all chains
    pub async fn defi_historical_tvl(&self, tail: TailPolicy) -> Result<Vec<TvlPoint>> {
        let rows: Vec<RawTvlRow> = self.get(Api::Tvl, "/charts").await?;
        Ok(tidy_tvl_series(rows, tail)?)
    }

    /// Historical TVL of one chain
    pub async fn chain_historical_tvl(
        &self,
        chain: &str,
        tail: TailPolicy,
    ) -> Result<Vec<TvlPoint>> {
        let rows: Vec<RawTvlRow> = self.get(Api::Tvl, &format!("/charts/{}", chain)).await?;
        Ok(tidy_tvl_series(rows, tail)?)
    }

    /// Full records of every listed protocol
    pub async fn protocols(&self) -> Result<Vec<Protocol>> {
        let protocols: Vec<Protocol> = self.get(Api::Tvl, "/protocols").await?;
        debug!(count = protocols.len(), "Fetched protocol list");
        Ok(protocols)
    }

    /// TVL, mcap, FDV and 1d/7d TVL change of every protocol
    pub async fn protocols_fundamentals(&self) -> Result<Vec<ProtocolFundamentals>> {
        Ok(fundamentals_from_protocols(self.protocols().await?))
    }

    /// Detailed info on one protocol with per-token and per-chain breakdowns
    pub async fn protocol(&self, protocol: &str) -> Result<ProtocolDetail> {
        self.get(Api::Tvl, &format!("/protocol/{}", protocol)).await
    }

    /// Current TVL of a protocol broken down by chain
    pub async fn protocol_current_tvl_by_chain(
        &self,
        protocol: &str,
        staking: StakingPolicy,
    ) -> Result<Vec<ChainTvlRow>> {
        let detail = self.protocol(protocol).await?;
        Ok(chain_breakdown(detail.current_chain_tvls, staking))
    }

    /// Historical TVL of a protocol, one series per chain
    pub async fn protocol_historical_tvl_by_chain(
        &self,
        protocol: &str,
        staking: StakingPolicy,
        tail: TailPolicy,
    ) -> Result<BTreeMap<String, Vec<TvlPoint>>> {
        let detail = self.protocol(protocol).await?;
        let ProtocolDetail {
            current_chain_tvls,
            mut chain_tvls,
            ..
        } = detail;

        let mut series = BTreeMap::new();
        for row in chain_breakdown(current_chain_tvls, staking) {
            if let Some(slice) = chain_tvls.remove(&row.chain) {
                series.insert(row.chain, tidy_tvl_series(slice.tvl, tail)?);
            }
        }
        Ok(series)
    }

    /// Current prices of tokens, one row per requested key
    ///
    /// An empty key list returns an empty table without touching the
    /// network.
    pub async fn token_current_prices(&self, keys: &[TokenKey]) -> Result<Vec<PricePoint>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let resp: PriceResponse = self
            .get(
                Api::Coins,
                &format!("/prices/current/{}", join_token_keys(keys)),
            )
            .await?;
        Ok(tidy_price_response(resp)?)
    }

    /// Snapshot prices of tokens at a point in time
    pub async fn token_historical_prices(
        &self,
        keys: &[TokenKey],
        at: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPricePoint>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let resp: PriceResponse = self
            .get(
                Api::Coins,
                &format!(
                    "/prices/historical/{}/{}",
                    at.timestamp(),
                    join_token_keys(keys)
                ),
            )
            .await?;
        Ok(historical_price_rows(tidy_price_response(resp)?))
    }

    /// Block on a chain closest to a point in time
    pub async fn closest_block(&self, chain: &str, at: DateTime<Utc>) -> Result<ClosestBlock> {
        let raw: RawBlock = self
            .get(
                Api::Coins,
                &format!("/block/{}/{}", chain, at.timestamp()),
            )
            .await?;
        Ok(block_lookup(chain, raw)?)
    }

    /// Circulating amounts of every stablecoin
    ///
    /// `include_prices` is forwarded verbatim; the upstream service appears
    /// to ignore it.
    pub async fn stablecoins_circulating(
        &self,
        include_prices: bool,
    ) -> Result<Vec<StablecoinCirculating>> {
        let resp: StablecoinsResponse = self
            .get_with_params(
                Api::Stablecoins,
                "/stablecoins",
                &[("includePrices", include_prices.to_string())],
            )
            .await?;
        Ok(tidy_stablecoins(resp.pegged_assets))
    }

    /// Circulating amounts of every stablecoin broken down by chain,
    /// one table per stablecoin symbol
    pub async fn stablecoins_circulating_by_chain(
        &self,
        include_prices: bool,
    ) -> Result<BTreeMap<String, Vec<StablecoinChainCirculating>>> {
        let resp: StablecoinsResponse = self
            .get_with_params(
                Api::Stablecoins,
                "/stablecoins",
                &[("includePrices", include_prices.to_string())],
            )
            .await?;
        Ok(tidy_stablecoin_chain_circulating(resp.pegged_assets))
    }

    /// Historical prices of every stablecoin, one row per (day, coin)
    pub async fn stablecoins_prices(&self, tail: TailPolicy) -> Result<Vec<StablecoinPricePoint>> {
        let rows: Vec<RawStablecoinPriceRow> =
            self.get(Api::Stablecoins, "/stablecoinprices").await?;
        Ok(tidy_stablecoin_prices(rows, tail)?)
    }

    /// Historical market cap of one stablecoin across all chains
    pub async fn stablecoin_historical_mcap(
        &self,
        id: i64,
        tail: TailPolicy,
    ) -> Result<Vec<StablecoinMcapPoint>> {
        let rows: Vec<RawStablecoinMcapRow> = self
            .get_with_params(
                Api::Stablecoins,
                "/stablecoincharts/all",
                &[("stablecoin", id.to_string())],
            )
            .await?;
        Ok(tidy_stablecoin_mcap_series(rows, tail)?)
    }

    /// Historical market cap of one stablecoin on one chain
    pub async fn stablecoin_historical_mcap_on_chain(
        &self,
        id: i64,
        chain: &str,
        tail: TailPolicy,
    ) -> Result<Vec<StablecoinMcapPoint>> {
        let rows: Vec<RawStablecoinMcapRow> = self
            .get_with_params(
                Api::Stablecoins,
                &format!("/stablecoincharts/{}", chain),
                &[("stablecoin", id.to_string())],
            )
            .await?;
        Ok(tidy_stablecoin_mcap_series(rows, tail)?)
    }

    /// Current stablecoin market cap per chain
    pub async fn stablecoins_current_mcap_by_chain(
        &self,
    ) -> Result<Vec<ChainStablecoinMcap>> {
        let rows: Vec<RawChainStablecoinMcap> =
            self.get(Api::Stablecoins, "/stablecoinchains").await?;
        Ok(tidy_chain_stablecoin_mcaps(rows))
    }

    /// Latest data for all yield pools, predictions included
    pub async fn pool_yields(&self) -> Result<Vec<PoolYield>> {
        let resp: PoolsResponse = self.get(Api::Yields, "/pools").await?;
        debug!(count = resp.data.len(), "Fetched yield pools");
        Ok(tidy_pools(resp.data))
    }

    /// Historical APY and TVL of one pool, averaged per day
    pub async fn pool_historical_apy(&self, pool_id: &str) -> Result<Vec<PoolApyPoint>> {
        let resp: PoolChartResponse = self
            .get(Api::Yields, &format!("/chart/{}", pool_id))
            .await?;
        Ok(tidy_pool_apy(resp.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_urls() {
        assert_eq!(Api::Tvl.base_url(), "https://api.llama.fi");
        assert_eq!(Api::Coins.base_url(), "https://coins.llama.fi");
        assert_eq!(Api::Stablecoins.base_url(), "https://stablecoins.llama.fi");
        assert_eq!(Api::Yields.base_url(), "https://yields.llama.fi");
        assert_eq!(Api::AbiDecoder.base_url(), "https://abi-decoder.llama.fi");
    }

    #[test]
    fn test_api_tag_parsing() {
        assert_eq!("TVL".parse::<Api>().unwrap(), Api::Tvl);
        assert_eq!("coins".parse::<Api>().unwrap(), Api::Coins);
        assert_eq!("abi_decoder".parse::<Api>().unwrap(), Api::AbiDecoder);
    }

    #[test]
    fn test_unknown_api_tag_is_an_error() {
        let err = "BRIDGES".parse::<Api>().unwrap_err();
        assert!(matches!(err, Error::UnknownApiCategory(_)));
        assert!(err.to_string().contains("BRIDGES"));
    }

    #[tokio::test]
    async fn test_empty_key_list_short_circuits() {
        let client = LlamaClient::new().unwrap();
        // No request goes out for an empty key list, so this must succeed
        // offline and return an empty table.
        assert!(client.token_current_prices(&[]).await.unwrap().is_empty());
        assert!(client
            .token_historical_prices(&[], Utc::now())
            .await
            .unwrap()
            .is_empty());
    }
}
