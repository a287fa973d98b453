//! Gold price records, calendar aggregation and the lookup tables the other
//! pipelines join against.

use crate::core::period::YearMonth;
use crate::core::round2;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One daily quotation from the NBP feed, in PLN per gram of 1000-proof gold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyGoldPrice {
    pub date: NaiveDate,
    pub price: f64,
}

/// Monthly average gold price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGoldPrice {
    pub year: i32,
    pub month: u32,
    pub price: f64,
}

/// Yearly average gold price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyGoldPrice {
    pub year: i32,
    pub price: f64,
}

/// Average daily quotes into one value per calendar month.
pub fn aggregate_monthly(daily: &[DailyGoldPrice]) -> Vec<MonthlyGoldPrice> {
    let mut buckets: BTreeMap<YearMonth, Vec<f64>> = BTreeMap::new();
    for quote in daily {
        buckets
            .entry(YearMonth::new(quote.date.year(), quote.date.month()))
            .or_default()
            .push(quote.price);
    }

    buckets
        .into_iter()
        .map(|(month, prices)| MonthlyGoldPrice {
            year: month.year,
            month: month.month,
            price: round2(prices.iter().sum::<f64>() / prices.len() as f64),
        })
        .collect()
}

/// Average monthly values into one value per year.
pub fn aggregate_yearly(monthly: &[MonthlyGoldPrice]) -> Vec<YearlyGoldPrice> {
    let mut buckets: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for entry in monthly {
        buckets.entry(entry.year).or_default().push(entry.price);
    }

    buckets
        .into_iter()
        .map(|(year, prices)| YearlyGoldPrice {
            year,
            price: round2(prices.iter().sum::<f64>() / prices.len() as f64),
        })
        .collect()
}

/// Monthly gold price lookup, loaded once per run and read-only thereafter.
#[derive(Debug, Default)]
pub struct GoldPriceTable {
    prices: BTreeMap<YearMonth, f64>,
}

impl GoldPriceTable {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading gold prices from {}", path.display());
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Gold prices file not found: {}", path.display()))?;
        let entries: Vec<MonthlyGoldPrice> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid gold prices file: {}", path.display()))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = MonthlyGoldPrice>) -> Self {
        let prices = entries
            .into_iter()
            .map(|e| (YearMonth::new(e.year, e.month), e.price))
            .collect();
        Self { prices }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn price_per_gram(&self, month: YearMonth) -> Option<f64> {
        self.prices.get(&month).copied()
    }

    /// Grams of gold `amount_pln` buys in the given month, rounded to two
    /// decimals, or `None` when the table has no positive price for it.
    pub fn grams_for(&self, month: YearMonth, amount_pln: f64) -> Option<f64> {
        match self.price_per_gram(month) {
            Some(price) if price > 0.0 => Some(round2(amount_pln / price)),
            _ => None,
        }
    }
}

/// Yearly gold price lookup used by the annual wage series.
#[derive(Debug, Default)]
pub struct YearlyGoldTable {
    prices: BTreeMap<i32, f64>,
}

impl YearlyGoldTable {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading yearly gold prices from {}", path.display());
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Gold prices file not found: {}", path.display()))?;
        let entries: Vec<YearlyGoldPrice> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid gold prices file: {}", path.display()))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = YearlyGoldPrice>) -> Self {
        let prices = entries.into_iter().map(|e| (e.year, e.price)).collect();
        Self { prices }
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn grams_for(&self, year: i32, amount_pln: f64) -> Option<f64> {
        match self.prices.get(&year) {
            Some(price) if *price > 0.0 => Some(round2(amount_pln / price)),
            _ => None,
        }
    }
}
