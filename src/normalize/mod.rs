//! Response normalization
//!
//! Pure single-pass transforms from the wire shapes in `llama::types` into
//! the row records in `crate::types`: epoch decoding, key splitting, column
//! renaming and pruning. No state, no I/O.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::error::Error;
use crate::llama::types::{
    CoinQuote, PriceResponse, Protocol, RawBlock, RawChainStablecoinMcap, RawPool, RawPoolApyRow,
    RawStablecoin, RawStablecoinMcapRow, RawStablecoinPriceRow, RawTvlRow,
};
use crate::types::{
    ChainStablecoinMcap, ChainTvlRow, ClosestBlock, HistoricalPricePoint, PoolApyPoint, PoolYield,
    PricePoint, ProtocolFundamentals, StablecoinChainCirculating, StablecoinCirculating,
    StablecoinMcapPoint, StablecoinPricePoint, TvlPoint,
};

/// What to do with the final row of a historical series.
///
/// The last snapshot of a full series may cover a partial day at fetch
/// time; `DropLast` trims it. Callers that know the series is complete
/// (or want the partial value anyway) pass `Keep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Drop the final row
    #[default]
    DropLast,
    /// Keep every row
    Keep,
}

/// Whether a protocol's "staking" bucket counts as TVL.
///
/// The breakdown endpoints report staked governance tokens as a pseudo-chain
/// named `staking`; it is not canonical TVL and is excluded by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StakingPolicy {
    /// Drop the `staking` bucket
    #[default]
    Exclude,
    /// Keep it as a row
    Include,
}

/// Key of the staking bucket in breakdown responses
const STAKING_BUCKET: &str = "staking";

/// Decode epoch seconds to a UTC timestamp.
///
/// `1625097600` maps to `2021-07-01T00:00:00Z`.
pub fn epoch_to_utc(secs: i64) -> Result<DateTime<Utc>, Error> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(Error::EpochOutOfRange(secs))
}

/// Apply a [`TailPolicy`] to an already-reshaped series.
pub fn apply_tail<T>(mut rows: Vec<T>, tail: TailPolicy) -> Vec<T> {
    if tail == TailPolicy::DropLast {
        rows.pop();
    }
    rows
}

/// Reshape a `{date, totalLiquidityUSD}` series into [`TvlPoint`] rows.
///
/// Decodes the epoch-second `date` and renames the value column to `tvl`.
/// Row order follows the input, which the TVL endpoints emit ascending.
pub fn tidy_tvl_series(rows: Vec<RawTvlRow>, tail: TailPolicy) -> Result<Vec<TvlPoint>, Error> {
    let points = rows
        .into_iter()
        .map(|row| {
            Ok(TvlPoint {
                timestamp: epoch_to_utc(row.date)?,
                tvl: row.total_liquidity_usd,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(apply_tail(points, tail))
}

fn split_coin_key(key: &str) -> Result<(String, String), Error> {
    // Addresses may themselves contain colons (e.g. Cosmos denoms), so only
    // the first one splits.
    key.split_once(':')
        .map(|(chain, address)| (chain.to_string(), address.to_string()))
        .ok_or_else(|| Error::MalformedCoinKey(key.to_string()))
}

fn price_row(key: &str, quote: CoinQuote) -> Result<PricePoint, Error> {
    let (chain, token_address) = split_coin_key(key)?;
    Ok(PricePoint {
        timestamp: epoch_to_utc(quote.timestamp)?,
        symbol: quote.symbol,
        price: quote.price,
        confidence: quote.confidence,
        chain,
        token_address,
        decimals: quote.decimals,
    })
}

/// Reshape a price response into one [`PricePoint`] per compound key.
///
/// Each `"chain:address"` key is split on its first colon and joined with
/// the value object. An empty `coins` map yields an empty table.
pub fn tidy_price_response(resp: PriceResponse) -> Result<Vec<PricePoint>, Error> {
    resp.coins
        .into_iter()
        .map(|(key, quote)| price_row(&key, quote))
        .collect()
}

/// Prune a current-price table down to the historical-snapshot columns.
///
/// The historical endpoint reports no confidence score, so the column is
/// dropped rather than carried as always-empty.
pub fn historical_price_rows(rows: Vec<PricePoint>) -> Vec<HistoricalPricePoint> {
    rows.into_iter()
        .map(|row| HistoricalPricePoint {
            timestamp: row.timestamp,
            symbol: row.symbol,
            price: row.price,
            chain: row.chain,
            token_address: row.token_address,
            decimals: row.decimals,
        })
        .collect()
}

/// Reshape a chain-name → TVL map into rows, one per remaining chain.
pub fn chain_breakdown(
    mut map: BTreeMap<String, f64>,
    staking: StakingPolicy,
) -> Vec<ChainTvlRow> {
    if staking == StakingPolicy::Exclude {
        map.remove(STAKING_BUCKET);
    }
    map.into_iter()
        .map(|(chain, tvl)| ChainTvlRow { chain, tvl })
        .collect()
}

/// Wrap a nearest-block response into a single typed row.
pub fn block_lookup(chain: &str, raw: RawBlock) -> Result<ClosestBlock, Error> {
    Ok(ClosestBlock {
        chain: chain.to_string(),
        height: raw.height,
        timestamp: epoch_to_utc(raw.timestamp)?,
    })
}

/// Select the fundamentals columns from full `/protocols` records.
///
/// Fixed column order: name, symbol, chain, category, chains, tvl,
/// change_1d, change_7d, fdv, mcap, forked_from (`forkedFrom` renamed).
pub fn fundamentals_from_protocols(protocols: Vec<Protocol>) -> Vec<ProtocolFundamentals> {
    protocols
        .into_iter()
        .map(|p| ProtocolFundamentals {
            name: p.name,
            symbol: p.symbol,
            chain: p.chain,
            category: p.category,
            chains: p.chains,
            tvl: p.tvl,
            change_1d: p.change_1d,
            change_7d: p.change_7d,
            fdv: p.fdv,
            mcap: p.mcap,
            forked_from: p.forked_from,
        })
        .collect()
}

/// Flatten pegged-asset records, discarding the per-chain nesting the
/// circulating endpoint carries alongside the totals.
pub fn tidy_stablecoins(assets: Vec<RawStablecoin>) -> Vec<StablecoinCirculating> {
    assets
        .into_iter()
        .map(|a| StablecoinCirculating {
            id: a.id,
            name: a.name,
            symbol: a.symbol,
            gecko_id: a.gecko_id,
            peg_type: a.peg_type,
            peg_mechanism: a.peg_mechanism,
            circulating: a.circulating,
            price: a.price,
        })
        .collect()
}

/// Reshape a stablecoin market-cap chart into dated rows.
pub fn tidy_stablecoin_mcap_series(
    rows: Vec<RawStablecoinMcapRow>,
    tail: TailPolicy,
) -> Result<Vec<StablecoinMcapPoint>, Error> {
    let points = rows
        .into_iter()
        .map(|row| {
            Ok(StablecoinMcapPoint {
                timestamp: epoch_to_utc(row.date)?,
                circulating: row.total_circulating,
                circulating_usd: row.total_circulating_usd,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(apply_tail(points, tail))
}

/// Break the `chainCirculating` nesting of pegged-asset records into one
/// row per (chain, peg type), keyed by stablecoin symbol.
pub fn tidy_stablecoin_chain_circulating(
    assets: Vec<RawStablecoin>,
) -> BTreeMap<String, Vec<StablecoinChainCirculating>> {
    let mut out = BTreeMap::new();
    for asset in assets {
        let mut rows = Vec::new();
        for (chain, snapshots) in asset.chain_circulating {
            // Peg types may differ between the snapshot columns, so rows
            // cover the union of keys.
            let mut peg_types: Vec<&String> = snapshots
                .current
                .keys()
                .chain(snapshots.circulating_prev_day.keys())
                .chain(snapshots.circulating_prev_week.keys())
                .chain(snapshots.circulating_prev_month.keys())
                .collect();
            peg_types.sort();
            peg_types.dedup();

            for peg_type in peg_types {
                rows.push(StablecoinChainCirculating {
                    chain: chain.clone(),
                    peg_type: peg_type.clone(),
                    current: snapshots.current.get(peg_type).copied(),
                    prev_day: snapshots.circulating_prev_day.get(peg_type).copied(),
                    prev_week: snapshots.circulating_prev_week.get(peg_type).copied(),
                    prev_month: snapshots.circulating_prev_month.get(peg_type).copied(),
                });
            }
        }
        out.insert(asset.symbol, rows);
    }
    out
}

/// Flatten the `/stablecoinprices` history into one row per
/// (day, stablecoin), dates decoded from epoch seconds.
pub fn tidy_stablecoin_prices(
    rows: Vec<RawStablecoinPriceRow>,
    tail: TailPolicy,
) -> Result<Vec<StablecoinPricePoint>, Error> {
    let mut points = Vec::new();
    for row in apply_tail(rows, tail) {
        let timestamp = epoch_to_utc(row.date)?;
        for (stablecoin, price) in row.prices {
            points.push(StablecoinPricePoint {
                timestamp,
                stablecoin,
                price,
            });
        }
    }
    Ok(points)
}

/// Rename `/stablecoinchains` rows into per-chain mcap records.
pub fn tidy_chain_stablecoin_mcaps(rows: Vec<RawChainStablecoinMcap>) -> Vec<ChainStablecoinMcap> {
    rows.into_iter()
        .map(|row| ChainStablecoinMcap {
            chain: row.name,
            circulating_usd: row.total_circulating_usd,
        })
        .collect()
}

/// Flatten pool records, hoisting the nested prediction object into
/// top-level columns.
pub fn tidy_pools(pools: Vec<RawPool>) -> Vec<PoolYield> {
    pools
        .into_iter()
        .map(|p| {
            let predictions = p.predictions;
            PoolYield {
                pool: p.pool,
                chain: p.chain,
                project: p.project,
                symbol: p.symbol,
                tvl_usd: p.tvl_usd,
                apy: p.apy,
                apy_base: p.apy_base,
                apy_reward: p.apy_reward,
                apy_pct_30d: p.apy_pct_30d,
                stablecoin: p.stablecoin,
                il_risk: p.il_risk,
                predicted_class: predictions.as_ref().and_then(|x| x.predicted_class.clone()),
                predicted_probability: predictions
                    .as_ref()
                    .and_then(|x| x.predicted_probability),
                binned_confidence: predictions.as_ref().and_then(|x| x.binned_confidence),
            }
        })
        .collect()
}

#[derive(Default)]
struct MeanAcc {
    sum: f64,
    n: usize,
}

impl MeanAcc {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

#[derive(Default)]
struct DayAcc {
    tvl: MeanAcc,
    apy: MeanAcc,
    apy_base: MeanAcc,
    apy_reward: MeanAcc,
}

/// Average intraday APY samples of a pool down to one row per calendar day.
///
/// Sample timestamps arrive as RFC 3339 strings; the time of day is
/// discarded and all samples of a day are mean-aggregated. Output is
/// ordered by date.
pub fn tidy_pool_apy(rows: Vec<RawPoolApyRow>) -> Result<Vec<PoolApyPoint>, Error> {
    let mut days: BTreeMap<NaiveDate, DayAcc> = BTreeMap::new();

    for row in rows {
        let date = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|_| Error::BadDate(row.timestamp.clone()))?
            .date_naive();
        let acc = days.entry(date).or_default();
        acc.tvl.push(row.tvl_usd);
        acc.apy.push(row.apy);
        acc.apy_base.push(row.apy_base);
        acc.apy_reward.push(row.apy_reward);
    }

    Ok(days
        .into_iter()
        .map(|(date, acc)| PoolApyPoint {
            date,
            tvl_usd: acc.tvl.mean().unwrap_or(0.0),
            apy: acc.apy.mean(),
            apy_base: acc.apy_base.mean(),
            apy_reward: acc.apy_reward.mean(),
        })
        .collect())
}
