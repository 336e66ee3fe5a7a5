//! Dune Analytics client
//!
//! Explicit client object with a construct → login → token → query
//! lifecycle, instead of a process-wide session established at startup.
//! The wire flow mirrors the unofficial Dune client: csrf cookie, form
//! login, session token, then GraphQL result-by-id lookups.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::normalize::{apply_tail, TailPolicy};

const DUNE_BASE_URL: &str = "https://dune.com";
const DUNE_GRAPH_URL: &str = "https://core-hsr.dune.com/v1/graphql";

const REQUEST_TIMEOUT_SECS: u64 = 30;

const FIND_RESULT_QUERY: &str = "query FindResultDataByResult($result_id: uuid!) { \
    query_results(where: {result_id: {_eq: $result_id}}) { id job_id error runtime generated_at columns } \
    get_result_by_result_id(args: {want_result_id: $result_id}) { data } }";

/// Login credentials for Dune
///
/// Consumed once when the client is constructed; nothing else reads the
/// environment.
#[derive(Debug, Clone)]
pub struct DuneCredentials {
    pub username: String,
    pub password: String,
}

impl DuneCredentials {
    /// Read `DUNE_USERNAME` / `DUNE_PASSWORD` from the environment
    /// (after `.env` loading, see `config`).
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("DUNE_USERNAME")
            .context("DUNE_USERNAME not set; required for Dune access")?;
        let password = std::env::var("DUNE_PASSWORD")
            .context("DUNE_PASSWORD not set; required for Dune access")?;
        Ok(Self { username, password })
    }
}

/// One flattened row of a Dune query result
#[derive(Debug, Clone, PartialEq)]
pub struct DuneRow {
    /// Calendar day parsed from the result's date column
    pub date: NaiveDate,
    /// Remaining columns of the row, date column removed
    pub values: Map<String, Value>,
}

/// Client for the Dune query platform
///
/// Lifecycle: [`DuneClient::new`] → [`login`](DuneClient::login) →
/// [`fetch_auth_token`](DuneClient::fetch_auth_token) →
/// [`query_result`](DuneClient::query_result), then drop.
pub struct DuneClient {
    client: Client,
    credentials: DuneCredentials,
    cookies: Vec<String>,
    token: Option<String>,
}

impl DuneClient {
    pub fn new(credentials: DuneCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            credentials,
            cookies: Vec::new(),
            token: None,
        })
    }

    fn collect_cookies(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                if let Some(pair) = raw.split(';').next() {
                    self.cookies.push(pair.to_string());
                }
            }
        }
    }

    fn cookie_header(&self) -> String {
        self.cookies.join("; ")
    }

    /// Obtain a csrf cookie and log in with the stored credentials.
    pub async fn login(&mut self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/auth/csrf", DUNE_BASE_URL))
            .send()
            .await
            .context("Failed to request csrf token from Dune")?;
        if !response.status().is_success() {
            bail!("Dune csrf endpoint returned HTTP {}", response.status());
        }
        self.collect_cookies(&response);
        let body: Value = response
            .json()
            .await
            .context("Failed to parse csrf response")?;
        let csrf = body
            .get("csrf")
            .and_then(Value::as_str)
            .context("csrf token missing from response")?
            .to_string();

        let form = [
            ("action", "login"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
            ("csrf", csrf.as_str()),
            ("next", DUNE_BASE_URL),
        ];
        let response = self
            .client
            .post(format!("{}/api/auth/login", DUNE_BASE_URL))
            .header(COOKIE, self.cookie_header())
            .form(&form)
            .send()
            .await
            .context("Dune login request failed")?;
        if !response.status().is_success() {
            bail!("Dune login returned HTTP {}", response.status());
        }
        self.collect_cookies(&response);
        info!("Logged in to Dune");
        Ok(())
    }

    /// Exchange the login session for a bearer token used on the GraphQL
    /// endpoint. Must be called after [`login`](DuneClient::login).
    pub async fn fetch_auth_token(&mut self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/auth/session", DUNE_BASE_URL))
            .header(COOKIE, self.cookie_header())
            .send()
            .await
            .context("Dune session request failed")?;
        if !response.status().is_success() {
            bail!("Dune session endpoint returned HTTP {}", response.status());
        }
        let body: Value = response
            .json()
            .await
            .context("Failed to parse session response")?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .context("auth token missing from session response")?;
        self.token = Some(token.to_string());
        debug!("Fetched Dune auth token");
        Ok(())
    }

    /// Fetch the raw result data of an executed query by result id.
    pub async fn query_result(&self, result_id: &str) -> Result<Value> {
        let token = self
            .token
            .as_deref()
            .context("fetch_auth_token must be called before querying")?;

        let body = json!({
            "operationName": "FindResultDataByResult",
            "variables": { "result_id": result_id },
            "query": FIND_RESULT_QUERY,
        });

        let response = self
            .client
            .post(DUNE_GRAPH_URL)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Dune result query {} failed", result_id))?;
        if !response.status().is_success() {
            bail!("Dune GraphQL endpoint returned HTTP {}", response.status());
        }
        response
            .json()
            .await
            .context("Failed to parse Dune result payload")
    }

    /// Fetch a result and reshape it into dated rows in one call.
    pub async fn query_table(
        &self,
        result_id: &str,
        date_col: &str,
        tail: TailPolicy,
    ) -> Result<Vec<DuneRow>> {
        let raw = self.query_result(result_id).await?;
        extract_table(&raw, date_col, tail)
    }
}

/// Reshape a Dune result payload into one row per record.
///
/// Takes the objects under `data.get_result_by_result_id[*].data`, parses
/// `date_col` (RFC 3339 or plain date; time of day is discarded), removes
/// it from the value columns, sorts ascending by date and applies the tail
/// policy. `TailPolicy::DropLast` is the usual choice here because the
/// final day of a live query is typically incomplete.
pub fn extract_table(payload: &Value, date_col: &str, tail: TailPolicy) -> Result<Vec<DuneRow>> {
    let records = payload
        .pointer("/data/get_result_by_result_id")
        .and_then(Value::as_array)
        .context("missing `data.get_result_by_result_id` in Dune payload")?;

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let data = record
            .get("data")
            .and_then(Value::as_object)
            .context("Dune record without a `data` object")?;
        let mut values = data.clone();
        let raw_date = values
            .remove(date_col)
            .with_context(|| format!("date column `{}` missing from Dune row", date_col))?;
        let text = raw_date
            .as_str()
            .with_context(|| format!("date column `{}` is not a string", date_col))?;
        rows.push(DuneRow {
            date: parse_day(text)?,
            values,
        });
    }

    rows.sort_by_key(|row| row.date);
    Ok(apply_tail(rows, tail))
}

/// Parse the day part of a date string, tolerating a trailing time
/// component (`2023-01-05T00:00:00+00:00` and `2023-01-05` both work).
fn parse_day(text: &str) -> Result<NaiveDate> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("unparseable date value `{}`", text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Value {
        json!({
            "data": {
                "get_result_by_result_id": [
                    {"data": {"day": "2023-01-03T00:00:00+00:00", "volume": 30.0}},
                    {"data": {"day": "2023-01-01T00:00:00+00:00", "volume": 10.0}},
                    {"data": {"day": "2023-01-02T00:00:00+00:00", "volume": 20.0}}
                ]
            }
        })
    }

    #[test]
    fn test_extract_sorts_and_drops_last() {
        let rows = extract_table(&payload(), "day", TailPolicy::DropLast).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(rows[1].values["volume"], 20.0);
        // the date column itself no longer appears among the values
        assert!(!rows[0].values.contains_key("day"));
    }

    #[test]
    fn test_extract_keep_policy() {
        let rows = extract_table(&payload(), "day", TailPolicy::Keep).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
    }

    #[test]
    fn test_extract_missing_date_column() {
        assert!(extract_table(&payload(), "date", TailPolicy::Keep).is_err());
    }

    #[test]
    fn test_extract_missing_result_path() {
        let payload = json!({"data": {}});
        assert!(extract_table(&payload, "day", TailPolicy::Keep).is_err());
    }

    #[test]
    fn test_parse_day_accepts_plain_dates() {
        assert_eq!(
            parse_day("2021-07-01").unwrap(),
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()
        );
    }

    #[test]
    fn test_token_required_before_query() {
        let client = DuneClient::new(DuneCredentials {
            username: "user".into(),
            password: "pass".into(),
        })
        .unwrap();
        let err = tokio_test::block_on(client.query_result("abc")).unwrap_err();
        assert!(err.to_string().contains("fetch_auth_token"));
    }
}
