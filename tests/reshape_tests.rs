//! End-to-end reshape tests over realistic response fixtures

use chrono::NaiveDate;
use serde_json::json;

use llamapull::dune::{extract_table, DuneRow};
use llamapull::format::{human_format, human_format_dollar};
use llamapull::llama::types::{PoolsResponse, PriceResponse, Protocol, ProtocolDetail, RawTvlRow};
use llamapull::normalize::{
    chain_breakdown, fundamentals_from_protocols, tidy_pools, tidy_price_response,
    tidy_tvl_series, StakingPolicy, TailPolicy,
};
use llamapull::types::{join_token_keys, TokenKey};

/// Route reshape tracing through the test harness; safe to call from every
/// test, only the first call installs the subscriber.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// TVL series
// ============================================================================

#[test]
fn test_tvl_series_has_n_minus_one_rows_for_any_length() {
    init_tracing();
    for n in 1..=6 {
        let rows: Vec<RawTvlRow> = serde_json::from_value(serde_json::Value::Array(
            (0..n)
                .map(|i| {
                    json!({
                        "date": (1625097600 + i * 86400).to_string(),
                        "totalLiquidityUSD": 1.0e9 + i as f64,
                    })
                })
                .collect(),
        ))
        .unwrap();

        let points = tidy_tvl_series(rows, TailPolicy::DropLast).unwrap();
        assert_eq!(points.len(), n as usize - 1);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}

#[test]
fn test_epoch_column_decodes_to_utc() {
    let rows: Vec<RawTvlRow> = serde_json::from_value(json!([
        {"date": 1625097600i64, "totalLiquidityUSD": 1.0},
    ]))
    .unwrap();
    let points = tidy_tvl_series(rows, TailPolicy::Keep).unwrap();
    assert_eq!(
        points[0].timestamp.to_rfc3339(),
        "2021-07-01T00:00:00+00:00"
    );
}

// ============================================================================
// Price responses
// ============================================================================

#[test]
fn test_price_pipeline_reconstructs_compound_keys() {
    init_tracing();
    let resp: PriceResponse = serde_json::from_value(json!({
        "coins": {
            "ethereum:0xdF574c24545E5FfEcb9a659c229253D4111d87e1": {
                "decimals": 8,
                "price": 1.0,
                "symbol": "HUSD",
                "timestamp": 1625097600,
                "confidence": 0.99
            },
            "coingecko:ethereum": {
                "price": 1900.5,
                "symbol": "ETH",
                "timestamp": 1625097600
            }
        }
    }))
    .unwrap();

    let rows = tidy_price_response(resp).unwrap();
    assert_eq!(rows.len(), 2);

    let husd = rows.iter().find(|r| r.symbol == "HUSD").unwrap();
    assert_eq!(husd.chain, "ethereum");
    assert_eq!(
        husd.token_address,
        "0xdF574c24545E5FfEcb9a659c229253D4111d87e1"
    );
    assert_eq!(husd.decimals, Some(8));

    let eth = rows.iter().find(|r| r.symbol == "ETH").unwrap();
    assert_eq!(eth.chain, "coingecko");
    assert_eq!(eth.token_address, "ethereum");
    assert_eq!(eth.confidence, None);
}

#[test]
fn test_token_keys_render_request_path_segment() {
    let keys = vec![
        TokenKey::contract("ethereum", "0xdF574c24545E5FfEcb9a659c229253D4111d87e1"),
        TokenKey::coingecko("ethereum"),
    ];
    assert_eq!(
        join_token_keys(&keys),
        "ethereum:0xdF574c24545E5FfEcb9a659c229253D4111d87e1,coingecko:ethereum"
    );
}

// ============================================================================
// Protocol breakdowns and fundamentals
// ============================================================================

#[test]
fn test_protocol_detail_breakdown_drops_staking() {
    let detail: ProtocolDetail = serde_json::from_value(json!({
        "name": "Aave",
        "currentChainTvls": {
            "Ethereum": 6.0e9,
            "Polygon": 4.0e8,
            "staking": 3.0e8,
            "borrowed": 2.0e9
        },
        "chainTvls": {}
    }))
    .unwrap();

    let rows = chain_breakdown(detail.current_chain_tvls, StakingPolicy::Exclude);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.chain != "staking"));
    assert!(rows.iter().any(|r| r.chain == "borrowed"));
}

#[test]
fn test_fundamentals_use_snake_case_fork_column() {
    let protocols: Vec<Protocol> = serde_json::from_value(json!([{
        "name": "SushiSwap",
        "symbol": "SUSHI",
        "chain": "Ethereum",
        "category": "Dexes",
        "chains": ["Ethereum"],
        "tvl": 1.0e9,
        "forkedFrom": ["Uniswap"]
    }]))
    .unwrap();

    let rows = fundamentals_from_protocols(protocols);
    let serialized = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(serialized["forked_from"], json!(["Uniswap"]));
    assert!(serialized.get("forkedFrom").is_none());
    // every requested column is present even when the response omitted it
    for col in [
        "name", "symbol", "chain", "category", "chains", "tvl", "change_1d", "change_7d",
        "fdv", "mcap", "forked_from",
    ] {
        assert!(serialized.get(col).is_some(), "missing column {}", col);
    }
}

// ============================================================================
// Yield pools
// ============================================================================

#[test]
fn test_pool_predictions_flatten_into_columns() {
    let resp: PoolsResponse = serde_json::from_value(json!({
        "status": "success",
        "data": [{
            "pool": "747c1d2a-c668-4682-b9f9-296708a3dd90",
            "chain": "Ethereum",
            "project": "lido",
            "symbol": "STETH",
            "tvlUsd": 1.4e10,
            "apy": 3.9,
            "apyBase": 3.9,
            "stablecoin": false,
            "ilRisk": "no",
            "predictions": {
                "predictedClass": "Stable/Up",
                "predictedProbability": 75.0,
                "binnedConfidence": 3.0
            }
        }]
    }))
    .unwrap();

    let pools = tidy_pools(resp.data);
    assert_eq!(pools[0].predicted_class.as_deref(), Some("Stable/Up"));
    assert_eq!(pools[0].predicted_probability, Some(75.0));
    assert_eq!(pools[0].apy_reward, None);
}

// ============================================================================
// Dune extraction
// ============================================================================

#[test]
fn test_dune_table_is_sorted_and_trimmed() {
    let payload = json!({
        "data": {
            "get_result_by_result_id": [
                {"data": {"day": "2023-02-02T00:00:00+00:00", "fees": 2.0, "users": 20}},
                {"data": {"day": "2023-02-03T00:00:00+00:00", "fees": 3.0, "users": 30}},
                {"data": {"day": "2023-02-01T00:00:00+00:00", "fees": 1.0, "users": 10}}
            ]
        }
    });

    let rows: Vec<DuneRow> = extract_table(&payload, "day", TailPolicy::DropLast).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
    assert_eq!(rows[0].values["fees"], 1.0);
    assert_eq!(rows[1].values["users"], 20);
}

// ============================================================================
// Label formatting
// ============================================================================

#[test]
fn test_axis_labels() {
    assert_eq!(human_format(867.0, 0), "867");
    assert_eq!(human_format(45_300_000.0, 1), "45.3M");
    assert_eq!(human_format_dollar(1_240_000_000.0, 1), "$1.2B");
}
