//! The Warsaw m² pipeline: workbook download, quarterly extraction, monthly
//! interpolation and gold-equivalence conversion.

use crate::core::config::AppConfig;
use crate::core::gold::GoldPriceTable;
use crate::core::period::YearMonth;
use crate::interpolate::{self, MonthlyPrice};
use crate::output;
use crate::providers::WorkbookSource;
use crate::providers::nbp::NbpClient;
use crate::sheet;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// One month of the published price series. `priceM2_gold` is `null` when
/// no gold price is known for the month; the record itself is never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyM2Price {
    pub year: i32,
    pub month: u32,
    #[serde(rename = "priceM2_pln")]
    pub price_pln: f64,
    #[serde(rename = "priceM2_gold")]
    pub price_gold: Option<f64>,
}

pub async fn refresh(config: &AppConfig, output_path: Option<PathBuf>) -> Result<()> {
    let client = NbpClient::new(
        &config.providers.nbp.api_base_url,
        &config.providers.nbp.housing_url,
    );
    refresh_from_source(&client, config, output_path).await
}

/// The pipeline proper, driven through the workbook seam so tests can feed
/// fixture bytes.
pub async fn refresh_from_source(
    source: &dyn WorkbookSource,
    config: &AppConfig,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let bytes = source.fetch_workbook().await?;
    info!("Downloaded {} bytes of workbook data", bytes.len());

    let grid = sheet::read_first_sheet(&bytes)?;
    let quarterly = sheet::extract_quarterly_prices(&grid, &config.city_token)?;
    if quarterly.is_empty() {
        bail!("No quarterly data extracted for '{}'", config.city_token);
    }
    if let (Some(first), Some(last)) = (
        quarterly.iter().map(|q| q.period).min(),
        quarterly.iter().map(|q| q.period).max(),
    ) {
        println!(
            "Extracted {} quarters ({} to {})",
            quarterly.len(),
            first,
            last
        );
    }

    let monthly = interpolate::quarterly_to_monthly(&quarterly);
    info!("Generated {} monthly data points", monthly.len());

    // Fatal when missing or malformed: without the reference table the
    // output would silently lose its gold column
    let gold = GoldPriceTable::load(&config.gold_monthly_path())?;
    let enriched = with_gold_equivalent(&monthly, &gold);

    let path = output_path.unwrap_or_else(|| config.property_path());
    output::write_json(&path, &enriched)?;

    let converted = enriched.iter().filter(|e| e.price_gold.is_some()).count();
    println!(
        "Saved {} monthly prices ({} with gold equivalent) to {}",
        enriched.len(),
        converted,
        path.display()
    );
    Ok(())
}

/// Join the monthly series against the gold table, preserving order and
/// cardinality. Months without a usable gold price keep their record with an
/// explicit `None`; their count is reported, never treated as an error.
pub fn with_gold_equivalent(
    monthly: &[MonthlyPrice],
    gold: &GoldPriceTable,
) -> Vec<MonthlyM2Price> {
    let mut missing: Vec<YearMonth> = Vec::new();
    let enriched: Vec<MonthlyM2Price> = monthly
        .iter()
        .map(|entry| {
            let price_gold = gold.grams_for(entry.month, entry.price);
            if price_gold.is_none() {
                missing.push(entry.month);
            }
            MonthlyM2Price {
                year: entry.month.year,
                month: entry.month.month,
                price_pln: entry.price,
                price_gold,
            }
        })
        .collect();

    if !missing.is_empty() {
        let preview: Vec<String> = missing.iter().take(5).map(|m| m.to_string()).collect();
        warn!(
            "{} months missing gold price data (first: {})",
            missing.len(),
            preview.join(", ")
        );
    }
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::core::gold::MonthlyGoldPrice;

    struct FixtureSource(Vec<u8>);

    #[async_trait::async_trait]
    impl WorkbookSource for FixtureSource {
        async fn fetch_workbook(&self) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_refresh_from_fixture_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        output::write_json(
            &config.gold_monthly_path(),
            &serde_json::json!([{"year": 2021, "month": 1, "price": 250.0}]),
        )
        .unwrap();

        let bytes = std::fs::read("tests/fixtures/ceny_mieszkan.xlsx").unwrap();
        refresh_from_source(&FixtureSource(bytes), &config, None)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(config.property_path()).unwrap();
        let series: Vec<MonthlyM2Price> = serde_json::from_str(&raw).unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(series[0].price_gold, Some(38.0));
        assert_eq!(series[1].price_gold, None);
        assert_eq!(series[5].price_pln, 9700.0);
    }

    fn monthly(year: i32, month: u32, price: f64) -> MonthlyPrice {
        MonthlyPrice {
            month: YearMonth::new(year, month),
            price,
        }
    }

    #[test]
    fn test_conversion_keeps_every_record() {
        let series = [
            monthly(2021, 1, 9500.0),
            monthly(2021, 2, 9500.0),
            monthly(2021, 3, 9500.0),
        ];
        let gold = GoldPriceTable::from_entries([
            MonthlyGoldPrice { year: 2021, month: 1, price: 250.0 },
            MonthlyGoldPrice { year: 2021, month: 2, price: 255.0 },
            // month 3 missing on purpose
        ]);

        let enriched = with_gold_equivalent(&series, &gold);

        assert_eq!(enriched.len(), series.len());
        assert_eq!(
            enriched.iter().map(|e| (e.year, e.month)).collect::<Vec<_>>(),
            vec![(2021, 1), (2021, 2), (2021, 3)]
        );
        assert_eq!(enriched[0].price_gold, Some(38.0));
        assert_eq!(enriched[1].price_gold, Some(37.25));
        assert_eq!(enriched[2].price_gold, None);
    }

    #[test]
    fn test_non_positive_gold_price_yields_null() {
        let series = [monthly(2022, 5, 10000.0)];
        let gold = GoldPriceTable::from_entries([MonthlyGoldPrice {
            year: 2022,
            month: 5,
            price: -1.0,
        }]);

        let enriched = with_gold_equivalent(&series, &gold);
        assert_eq!(enriched[0].price_gold, None);
    }

    #[test]
    fn test_record_serializes_null_and_field_order() {
        let record = MonthlyM2Price {
            year: 2021,
            month: 3,
            price_pln: 9500.0,
            price_gold: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"year":2021,"month":3,"priceM2_pln":9500.0,"priceM2_gold":null}"#
        );
    }

    #[test]
    fn test_series_round_trips_through_json() {
        let series = vec![
            MonthlyM2Price { year: 2021, month: 1, price_pln: 9500.0, price_gold: Some(38.0) },
            MonthlyM2Price { year: 2021, month: 2, price_pln: 9500.0, price_gold: None },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warsaw.json");
        output::write_json(&path, &series).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let read_back: Vec<MonthlyM2Price> = serde_json::from_str(&raw).unwrap();
        assert_eq!(read_back, series);
    }
}
