//! Yahoo Finance chart API client returning daily bars for a ticker.

use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// One trading day of a ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<i64>>>,
}

fn series_at<T: Copy>(series: &Option<Vec<Option<T>>>, index: usize) -> Option<T> {
    series.as_ref().and_then(|v| v.get(index).copied().flatten())
}

pub struct YahooChartClient {
    base_url: String,
}

impl YahooChartClient {
    pub fn new(base_url: &str) -> Self {
        YahooChartClient {
            base_url: base_url.to_string(),
        }
    }

    /// Daily bars for `symbol` between the two dates (inclusive start).
    /// Rows without a close are exchange placeholders and are dropped.
    #[instrument(name = "YahooBarsFetch", skip(self), fields(symbol = %symbol))]
    pub async fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        let period1 = from.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = until.and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&period1={}&period2={}",
            self.base_url, symbol, period1, period2
        );
        debug!("Requesting chart data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("aurum/0.2")
            .timeout(Duration::from_secs(15))
            .build()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to fetch chart data for {symbol}"))?;

        let data = response
            .json::<ChartResponse>()
            .await
            .with_context(|| format!("Invalid chart response for {symbol}"))?;
        let item = data
            .chart
            .result
            .first()
            .ok_or_else(|| anyhow!("No chart data found for symbol: {}", symbol))?;

        let (Some(timestamps), Some(quote)) = (
            item.timestamp.as_ref(),
            item.indicators.as_ref().and_then(|i| i.quote.first()),
        ) else {
            return Ok(Vec::new());
        };

        let mut bars = Vec::new();
        for (index, ts) in timestamps.iter().enumerate() {
            let Some(date) = Utc.timestamp_opt(*ts, 0).single().map(|dt| dt.date_naive())
            else {
                continue;
            };
            let Some(close) = series_at(&quote.close, index) else {
                continue;
            };
            bars.push(DailyBar {
                date,
                open: series_at(&quote.open, index).unwrap_or(close),
                high: series_at(&quote.high, index).unwrap_or(close),
                low: series_at(&quote.low, index).unwrap_or(close),
                close,
                volume: series_at(&quote.volume, index),
            });
        }

        debug!("Fetched {} daily bars for {}", bars.len(), symbol);
        Ok(bars)
    }
}
