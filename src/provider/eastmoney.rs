//! East Money quote API provider.
//!
//! Default implementation of [`MarketDataProvider`] backed by the public
//! East Money quote endpoints (kline history, open-fund valuation, and
//! the list endpoint for index/futures boards). Quote pages throttle
//! unattributed traffic, so requests rotate browser User-Agents and retry
//! with exponential backoff plus jitter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ProviderConfig;

use super::{MarketDataProvider, Period, ProviderContent, ProviderError, ProviderResult};

/// Kline (candlestick) history endpoint.
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Board list endpoint, shared by index and futures lookups.
const CLIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";

/// Open-fund intraday valuation endpoint (JSONP).
const FUND_VALUATION_URL: &str = "https://fundgz.1234567.com.cn/js";

/// Browser User-Agents rotated across requests.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Maximum history rows returned to the client.
const HISTORY_ROW_LIMIT: usize = 20;

/// Maximum futures contracts returned when no symbol filter is given.
const FUTURES_ROW_LIMIT: usize = 10;

// =============================================================================
// Internal API response types (serde)
// =============================================================================

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClistResponse {
    data: Option<ClistData>,
}

#[derive(Debug, Deserialize)]
struct ClistData {
    #[serde(default)]
    diff: Vec<QuoteRow>,
}

/// One row of a board listing. Halted instruments report `"-"` for
/// numeric fields, so everything numeric stays a raw [`Value`].
#[derive(Debug, Deserialize)]
struct QuoteRow {
    #[serde(rename = "f12", default)]
    code: String,
    #[serde(rename = "f14", default)]
    name: String,
    #[serde(rename = "f2", default)]
    latest: Value,
    #[serde(rename = "f3", default)]
    pct_change: Value,
    #[serde(rename = "f4", default)]
    change: Value,
    #[serde(rename = "f5", default)]
    volume: Value,
    #[serde(rename = "f6", default)]
    amount: Value,
    #[serde(rename = "f15", default)]
    high: Value,
    #[serde(rename = "f16", default)]
    low: Value,
    #[serde(rename = "f17", default)]
    open: Value,
    #[serde(rename = "f18", default)]
    prev_close: Value,
    #[serde(rename = "f108", default)]
    open_interest: Value,
    #[serde(rename = "f28", default)]
    prev_settlement: Value,
}

/// One parsed kline bar.
struct Bar {
    date: String,
    open: String,
    close: String,
    high: String,
    low: String,
    volume: String,
    amount: String,
    amplitude: String,
    pct_change: String,
    change: String,
    turnover: String,
}

/// Parses a comma-separated kline line (fields f51..f61).
fn parse_bar(line: &str) -> Option<Bar> {
    let mut parts = line.split(',');
    Some(Bar {
        date: parts.next()?.to_string(),
        open: parts.next()?.to_string(),
        close: parts.next()?.to_string(),
        high: parts.next()?.to_string(),
        low: parts.next()?.to_string(),
        volume: parts.next()?.to_string(),
        amount: parts.next()?.to_string(),
        amplitude: parts.next()?.to_string(),
        pct_change: parts.next()?.to_string(),
        change: parts.next()?.to_string(),
        turnover: parts.next()?.to_string(),
    })
}

/// Renders a possibly-missing numeric field.
fn display_num(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => "-".to_string(),
    }
}

/// Maps a bare symbol to the exchange-qualified security id the quote
/// endpoints expect. Shanghai listings lead with 6 (A-shares), 5 (funds)
/// or 9 (B-shares); everything else is treated as Shenzhen.
fn secid_for(symbol: &str) -> String {
    if symbol.starts_with('6') || symbol.starts_with('5') || symbol.starts_with('9') {
        format!("1.{symbol}")
    } else {
        format!("0.{symbol}")
    }
}

fn pick_user_agent() -> &'static str {
    let mut rng = rand::rng();
    USER_AGENTS[rng.random_range(0..USER_AGENTS.len())]
}

/// Exponential backoff with jitter: 1s, 2s, 4s, ... plus up to one
/// extra second, exponent capped to keep the wait bounded.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(6);
    let jitter: f64 = rand::rng().random_range(0.0..1.0);
    Duration::from_secs_f64(f64::from(2_u32.pow(exponent)) + jitter)
}

// =============================================================================
// EastMoneyProvider
// =============================================================================

/// Market-data provider backed by the East Money quote APIs.
pub struct EastMoneyProvider {
    client: reqwest::Client,
    max_retries: u32,
}

impl EastMoneyProvider {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// Issues a GET with User-Agent rotation and retry/backoff.
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ProviderError> {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(url)
                .query(query)
                .header(reqwest::header::USER_AGENT, pick_user_agent())
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);

            match result {
                Ok(response) => return Ok(response),
                Err(source) => {
                    if attempt >= self.max_retries {
                        return Err(ProviderError::Http {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    let delay = backoff_delay(attempt);
                    tracing::debug!(
                        url,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Fetches kline history. `None` means the symbol is unknown upstream.
    async fn fetch_klines(
        &self,
        symbol: &str,
        period: Period,
        begin: &str,
    ) -> Result<Option<KlineData>, ProviderError> {
        let secid = secid_for(symbol);
        let query = [
            ("secid", secid.as_str()),
            ("klt", period.kline_code()),
            ("fqt", "1"),
            ("beg", begin),
            ("end", "20500101"),
            ("fields1", "f1,f2,f3,f4,f5,f6"),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
        ];

        let response = self.get_with_retry(KLINE_URL, &query).await?;
        let payload: KlineResponse =
            response.json().await.map_err(|e| ProviderError::Decode {
                url: KLINE_URL.to_string(),
                message: e.to_string(),
            })?;

        Ok(payload.data)
    }

    /// Fetches one page of a board listing.
    async fn fetch_board(&self, board_filter: &str) -> Result<Vec<QuoteRow>, ProviderError> {
        let query = [
            ("pn", "1"),
            ("pz", "50"),
            ("po", "1"),
            ("np", "1"),
            ("fltt", "2"),
            ("invt", "2"),
            ("fid", "f3"),
            ("fs", board_filter),
            (
                "fields",
                "f2,f3,f4,f5,f6,f12,f14,f15,f16,f17,f18,f28,f108",
            ),
        ];

        let response = self.get_with_retry(CLIST_URL, &query).await?;
        let payload: ClistResponse =
            response.json().await.map_err(|e| ProviderError::Decode {
                url: CLIST_URL.to_string(),
                message: e.to_string(),
            })?;

        Ok(payload.data.map(|d| d.diff).unwrap_or_default())
    }

    fn spot_report(data: &KlineData, bar: &Bar) -> String {
        format!(
            "Stock code: {}\n\
             Name: {}\n\
             Latest close: {}\n\
             Trade date: {}\n\
             Change: {}%\n\
             Change amount: {}\n\
             High: {}\n\
             Low: {}\n\
             Volume: {}\n\
             Turnover: {}\n\
             Amplitude: {}%\n\
             Turnover rate: {}%\n\
             Open: {}",
            data.code,
            data.name,
            bar.close,
            bar.date,
            bar.pct_change,
            bar.change,
            bar.high,
            bar.low,
            bar.volume,
            bar.amount,
            bar.amplitude,
            bar.turnover,
            bar.open,
        )
    }

    fn index_report(row: &QuoteRow) -> String {
        format!(
            "Index code: {}\n\
             Name: {}\n\
             Latest: {}\n\
             Change: {}%\n\
             Change amount: {}\n\
             Volume: {}\n\
             Turnover: {}\n\
             Open: {}\n\
             Prev close: {}\n\
             High: {}\n\
             Low: {}",
            row.code,
            row.name,
            display_num(&row.latest),
            display_num(&row.pct_change),
            display_num(&row.change),
            display_num(&row.volume),
            display_num(&row.amount),
            display_num(&row.open),
            display_num(&row.prev_close),
            display_num(&row.high),
            display_num(&row.low),
        )
    }

    fn futures_report(row: &QuoteRow) -> String {
        format!(
            "Futures code: {}\n\
             Name: {}\n\
             Latest: {}\n\
             Change: {}%\n\
             Volume: {}\n\
             Open interest: {}\n\
             Open: {}\n\
             High: {}\n\
             Low: {}\n\
             Prev settlement: {}",
            row.code,
            row.name,
            display_num(&row.latest),
            display_num(&row.pct_change),
            display_num(&row.volume),
            display_num(&row.open_interest),
            display_num(&row.open),
            display_num(&row.high),
            display_num(&row.low),
            display_num(&row.prev_settlement),
        )
    }
}

#[async_trait]
impl MarketDataProvider for EastMoneyProvider {
    async fn stock_spot(&self, symbol: &str) -> ProviderResult {
        // "Latest" data is the most recent bar of this year's daily
        // history; the spot board needs a separate subscription.
        let begin = format!("{}0101", Local::now().year());
        let Some(data) = self.fetch_klines(symbol, Period::Daily, &begin).await? else {
            return Ok(vec![ProviderContent::text(format!(
                "No quote data found for symbol '{symbol}'"
            ))]);
        };

        match data.klines.last().map(String::as_str).and_then(parse_bar) {
            Some(bar) => Ok(vec![ProviderContent::text(Self::spot_report(&data, &bar))]),
            None => Ok(vec![ProviderContent::text(format!(
                "No quote data found for symbol '{symbol}'"
            ))]),
        }
    }

    async fn stock_history(&self, symbol: &str, period: Period) -> ProviderResult {
        let Some(data) = self.fetch_klines(symbol, period, "19900101").await? else {
            return Ok(vec![ProviderContent::text(format!(
                "No historical data found for symbol '{symbol}'"
            ))]);
        };

        if data.klines.is_empty() {
            return Ok(vec![ProviderContent::text(format!(
                "No historical data found for symbol '{symbol}'"
            ))]);
        }

        let mut report = format!(
            "History for {} {} ({}):",
            data.code,
            data.name,
            period.as_str()
        );
        for bar in data
            .klines
            .iter()
            .take(HISTORY_ROW_LIMIT)
            .filter_map(|line| parse_bar(line))
        {
            report.push_str(&format!(
                "\n{} open={} close={} high={} low={} volume={}",
                bar.date, bar.open, bar.close, bar.high, bar.low, bar.volume
            ));
        }

        Ok(vec![ProviderContent::text(report)])
    }

    async fn fund_info(&self, symbol: &str) -> ProviderResult {
        let url = format!("{FUND_VALUATION_URL}/{symbol}.js");
        let response = self.get_with_retry(&url, &[]).await?;
        let body = response.text().await.map_err(|e| ProviderError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;

        // The endpoint answers JSONP: jsonpgz({...}); — empty for
        // unknown fund codes.
        let payload = body
            .trim()
            .strip_prefix("jsonpgz(")
            .and_then(|s| s.strip_suffix(");"))
            .filter(|s| !s.is_empty());

        let Some(json) = payload else {
            return Ok(vec![ProviderContent::text(format!(
                "No fund found for code '{symbol}'"
            ))]);
        };

        #[derive(Debug, Deserialize)]
        struct FundValuation {
            #[serde(default)]
            fundcode: String,
            #[serde(default)]
            name: String,
            #[serde(default)]
            jzrq: String,
            #[serde(default)]
            dwjz: String,
            #[serde(default)]
            gsz: String,
            #[serde(default)]
            gszzl: String,
            #[serde(default)]
            gztime: String,
        }

        let fund: FundValuation =
            serde_json::from_str(json).map_err(|e| ProviderError::Decode {
                url,
                message: e.to_string(),
            })?;

        Ok(vec![ProviderContent::text(format!(
            "Fund code: {}\n\
             Fund name: {}\n\
             NAV date: {}\n\
             Unit NAV: {}\n\
             Estimated NAV: {}\n\
             Estimated growth: {}%\n\
             Estimate time: {}",
            fund.fundcode, fund.name, fund.jzrq, fund.dwjz, fund.gsz, fund.gszzl, fund.gztime
        ))])
    }

    async fn index_data(&self, symbol: &str) -> ProviderResult {
        let mut rows = self.fetch_board("m:1+s:2,m:0+t:5").await?;
        if !symbol.is_empty() {
            rows.retain(|row| row.code == symbol);
        }

        if rows.is_empty() {
            return Ok(vec![ProviderContent::text(format!(
                "No index found for code '{symbol}'"
            ))]);
        }

        Ok(rows
            .iter()
            .map(|row| ProviderContent::text(Self::index_report(row)))
            .collect())
    }

    async fn futures_data(&self, symbol: &str) -> ProviderResult {
        let mut rows = self.fetch_board("m:113,m:114,m:115").await?;
        if !symbol.is_empty() {
            rows.retain(|row| row.code == symbol);
        }

        if rows.is_empty() {
            return Ok(vec![ProviderContent::text(format!(
                "No futures contract found for code '{symbol}'"
            ))]);
        }

        Ok(rows
            .iter()
            .take(FUTURES_ROW_LIMIT)
            .map(|row| ProviderContent::text(Self::futures_report(row)))
            .collect())
    }
}
