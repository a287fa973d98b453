//! National Bank of Poland clients: the gold price API and the housing
//! workbook download.

use crate::core::gold::DailyGoldPrice;
use crate::providers::WorkbookSource;
use crate::providers::util::with_retry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::debug;

/// The API rejects ranges wider than this many days.
const API_WINDOW_DAYS: i64 = 93;

/// First date with published gold quotations.
pub fn earliest_gold_data() -> NaiveDate {
    NaiveDate::from_ymd_opt(2013, 1, 2).unwrap()
}

/// Inclusive date windows covering `[from, until]` without gaps or overlap,
/// each at most [`API_WINDOW_DAYS`] wide. The lower bound is clamped to the
/// earliest published quotation.
pub fn gold_fetch_windows(from: NaiveDate, until: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut start = from.max(earliest_gold_data());
    while start < until {
        let end = (start + Duration::days(API_WINDOW_DAYS)).min(until);
        windows.push((start, end));
        start = end + Duration::days(1);
    }
    windows
}

// NBP uses 'data' for the quotation date and 'cena' for the price
#[derive(Debug, Deserialize)]
struct GoldQuoteDto {
    #[serde(rename = "data")]
    date: NaiveDate,
    #[serde(rename = "cena")]
    price: f64,
}

pub struct NbpClient {
    api_base_url: String,
    housing_url: String,
}

impl NbpClient {
    pub fn new(api_base_url: &str, housing_url: &str) -> Self {
        NbpClient {
            api_base_url: api_base_url.to_string(),
            housing_url: housing_url.to_string(),
        }
    }

    /// Daily gold quotations for an inclusive date range.
    pub async fn fetch_gold_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyGoldPrice>> {
        let url = format!("{}/cenyzlota/{}/{}/", self.api_base_url, start, end);
        debug!("Requesting gold quotations from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("aurum/0.2")
            .timeout(StdDuration::from_secs(10))
            .build()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to fetch gold quotations for {start} to {end}"))?;

        let quotes: Vec<GoldQuoteDto> = response
            .error_for_status()
            .with_context(|| format!("Gold quotation request rejected for {start} to {end}"))?
            .json()
            .await
            .with_context(|| format!("Invalid gold quotation response for {start} to {end}"))?;

        debug!("Retrieved {} daily quotations", quotes.len());
        Ok(quotes
            .into_iter()
            .map(|q| DailyGoldPrice {
                date: q.date,
                price: q.price,
            })
            .collect())
    }

    /// Raw bytes of the quarterly housing price workbook.
    pub async fn fetch_housing_workbook(&self) -> Result<Vec<u8>> {
        debug!("Downloading housing workbook from {}", self.housing_url);

        let client = reqwest::Client::builder()
            .user_agent("aurum/0.2")
            .timeout(StdDuration::from_secs(30))
            .build()?;
        let response = with_retry(|| async { client.get(&self.housing_url).send().await }, 3, 500)
            .await
            .context("Failed to download housing workbook")?;

        let bytes = response
            .error_for_status()
            .context("Housing workbook request rejected")?
            .bytes()
            .await
            .context("Failed to read housing workbook body")?;

        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl WorkbookSource for NbpClient {
    async fn fetch_workbook(&self) -> Result<Vec<u8>> {
        self.fetch_housing_workbook().await
    }
}
