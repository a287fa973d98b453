//! Annual wage pipelines backed by Eurostat, converted to grams of gold.

use crate::core::config::AppConfig;
use crate::core::gold::YearlyGoldTable;
use crate::output;
use crate::providers::eurostat::{AnnualWage, EurostatClient};
use anyhow::{Result, bail};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Which wage dataset to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WageKind {
    Average,
    Minimum,
}

impl WageKind {
    fn label(self) -> &'static str {
        match self {
            WageKind::Average => "average",
            WageKind::Minimum => "minimum",
        }
    }
}

/// One published wage record. `price` is the wage expressed in grams of
/// gold and is omitted entirely when no usable gold price exists for the
/// year; consumers treat the missing key as "not convertible".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WageRecord {
    pub year: i32,
    pub wage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

pub async fn refresh(
    config: &AppConfig,
    kind: WageKind,
    start_year: Option<i32>,
    end_year: Option<i32>,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let client = EurostatClient::new(&config.providers.eurostat.base_url);
    let start = start_year.unwrap_or(config.start_year);
    let end = end_year.unwrap_or_else(|| Local::now().year());

    let wages = match kind {
        WageKind::Average => client.fetch_average_wages(start, end).await?,
        WageKind::Minimum => client.fetch_minimum_wages(start, end).await?,
    };
    if wages.is_empty() {
        bail!("No {} wage data retrieved from Eurostat", kind.label());
    }

    // A missing gold table degrades the output, it does not block it
    let gold = match YearlyGoldTable::load(&config.gold_yearly_path()) {
        Ok(table) => table,
        Err(e) => {
            warn!("Gold prices unavailable, wages will not be converted: {:#}", e);
            YearlyGoldTable::default()
        }
    };

    let records = with_gold_equivalent(&wages, &gold);
    let path = output_path.unwrap_or_else(|| match kind {
        WageKind::Average => config.avg_wages_path(),
        WageKind::Minimum => config.min_wages_path(),
    });
    output::write_json(&path, &records)?;

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!(
            "Saved {} {} wage records ({}-{}) to {}",
            records.len(),
            kind.label(),
            first.year,
            last.year,
            path.display()
        );
    }
    Ok(())
}

/// Join annual wages against the yearly gold table. `price` is present iff
/// the table holds a positive price for the year.
pub fn with_gold_equivalent(wages: &[AnnualWage], gold: &YearlyGoldTable) -> Vec<WageRecord> {
    wages
        .iter()
        .map(|entry| WageRecord {
            year: entry.year,
            wage: entry.wage,
            price: gold.grams_for(entry.year, entry.wage),
        })
        .collect()
}
