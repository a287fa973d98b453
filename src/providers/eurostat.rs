//! Eurostat dissemination API client for the Polish wage datasets.
//!
//! The API answers in JSON-stat: a flat `value` map keyed by the string form
//! of a row-major offset over the dimensions listed in `id`/`size`. Only the
//! subset needed by the wage datasets is modelled here.

use crate::core::round2;
use crate::providers::util::with_retry;
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

/// Average full-time adjusted salary per employee, annual.
pub const AVG_WAGE_DATASET: &str = "nama_10_fte";
/// Monthly minimum wages, published semi-annually.
pub const MIN_WAGE_DATASET: &str = "earn_mw_cur";

/// One annual wage value in PLN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualWage {
    pub year: i32,
    pub wage: f64,
}

#[derive(Debug, Deserialize)]
struct JsonStatDataset {
    #[serde(default)]
    id: Vec<String>,
    #[serde(default)]
    size: Vec<usize>,
    #[serde(default)]
    dimension: HashMap<String, JsonStatDimension>,
    #[serde(default)]
    value: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct JsonStatDimension {
    category: JsonStatCategory,
}

#[derive(Debug, Default, Deserialize)]
struct JsonStatCategory {
    #[serde(default)]
    index: HashMap<String, usize>,
}

impl JsonStatDataset {
    fn time_index(&self) -> Result<&HashMap<String, usize>> {
        self.dimension
            .get("time")
            .map(|d| &d.category.index)
            .ok_or_else(|| anyhow!("Missing time dimension in JSON-stat response"))
    }

    fn nac_index(&self) -> Result<usize> {
        self.dimension
            .get("currency")
            .and_then(|d| d.category.index.get("NAC"))
            .copied()
            .ok_or_else(|| anyhow!("NAC (national currency) not found in currency dimension"))
    }

    /// Row-major offset of a data point with every dimension pinned to its
    /// first category, except `time` (the requested index) and `currency`
    /// which, when present, is pinned to the national-currency category.
    fn flat_index(&self, time_idx: usize) -> Result<usize> {
        if self.id.len() != self.size.len() {
            bail!("Mismatched id/size arrays in JSON-stat response");
        }
        if self.id.is_empty() {
            return Ok(time_idx);
        }

        let mut stride = 1usize;
        let mut offset = 0usize;
        for (name, dim_size) in self.id.iter().zip(&self.size).rev() {
            let idx = match name.as_str() {
                "time" => time_idx,
                "currency" => self.nac_index()?,
                _ => 0,
            };
            offset += idx * stride;
            stride *= dim_size;
        }
        Ok(offset)
    }

    fn value_for(&self, time_idx: usize) -> Result<Option<f64>> {
        let flat = self.flat_index(time_idx)?;
        Ok(self.value.get(&flat.to_string()).copied())
    }
}

pub struct EurostatClient {
    base_url: String,
}

impl EurostatClient {
    pub fn new(base_url: &str) -> Self {
        EurostatClient {
            base_url: base_url.to_string(),
        }
    }

    async fn fetch_dataset(
        &self,
        dataset: &str,
        query: &[(&str, &str)],
    ) -> Result<JsonStatDataset> {
        let url = format!("{}/{}", self.base_url, dataset);
        debug!("Requesting Eurostat dataset from {} with {:?}", url, query);

        let client = reqwest::Client::builder()
            .user_agent("aurum/0.2")
            .timeout(Duration::from_secs(15))
            .build()?;
        let response = with_retry(|| async { client.get(&url).query(query).send().await }, 3, 500)
            .await
            .with_context(|| format!("Failed to fetch Eurostat dataset {dataset}"))?;

        response
            .error_for_status()
            .with_context(|| format!("Eurostat request rejected for dataset {dataset}"))?
            .json()
            .await
            .with_context(|| format!("Invalid JSON-stat response for dataset {dataset}"))
    }

    /// Annual average full-time adjusted salary for Poland, in PLN.
    pub async fn fetch_average_wages(
        &self,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<AnnualWage>> {
        let data = self
            .fetch_dataset(
                AVG_WAGE_DATASET,
                &[("format", "JSON"), ("geo", "PL"), ("unit", "NAC")],
            )
            .await?;

        let mut wages = Vec::new();
        for (code, &time_idx) in data.time_index()? {
            let Ok(year) = code.parse::<i32>() else {
                continue;
            };
            if year < start_year || year > end_year {
                continue;
            }
            match data.value_for(time_idx)? {
                Some(value) => wages.push(AnnualWage {
                    year,
                    wage: round2(value),
                }),
                None => debug!("{}: no data", code),
            }
        }

        wages.sort_by_key(|w| w.year);
        debug!("Retrieved {} annual average wages", wages.len());
        Ok(wages)
    }

    /// Minimum wage for Poland, semi-annual values averaged per year, in PLN.
    pub async fn fetch_minimum_wages(
        &self,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<AnnualWage>> {
        let data = self
            .fetch_dataset(MIN_WAGE_DATASET, &[("format", "JSON"), ("geo", "PL")])
            .await?;

        let mut semesters: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for (code, &time_idx) in data.time_index()? {
            // Semi-annual codes look like "2013-S1"
            let Some((year_str, _semester)) = code.split_once('-') else {
                continue;
            };
            let Ok(year) = year_str.parse::<i32>() else {
                continue;
            };
            if year < start_year || year > end_year {
                continue;
            }
            if let Some(value) = data.value_for(time_idx)? {
                semesters.entry(year).or_default().push(value);
            } else {
                debug!("{}: no data", code);
            }
        }

        let wages: Vec<AnnualWage> = semesters
            .into_iter()
            .map(|(year, values)| AnnualWage {
                year,
                wage: round2(values.iter().sum::<f64>() / values.len() as f64),
            })
            .collect();
        debug!("Aggregated {} annual minimum wages", wages.len());
        Ok(wages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> JsonStatDataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flat_index_for_annual_dataset_is_time_index() {
        // unit=NAC filter collapses every non-time dimension to size 1
        let data = dataset(json!({
            "id": ["freq", "unit", "geo", "time"],
            "size": [1, 1, 1, 3],
            "dimension": {
                "time": {"category": {"index": {"2013": 0, "2014": 1, "2015": 2}}}
            },
            "value": {"0": 40000.0, "2": 45000.5}
        }));

        assert_eq!(data.flat_index(2).unwrap(), 2);
        assert_eq!(data.value_for(2).unwrap(), Some(45000.5));
        assert_eq!(data.value_for(1).unwrap(), None);
    }

    #[test]
    fn test_flat_index_pins_currency_to_nac() {
        // freq=1, currency=3 (EUR, NAC, PPS), geo=1, time=4
        let data = dataset(json!({
            "id": ["freq", "currency", "geo", "time"],
            "size": [1, 3, 1, 4],
            "dimension": {
                "currency": {"category": {"index": {"EUR": 0, "NAC": 1, "PPS": 2}}},
                "time": {"category": {"index": {
                    "2013-S1": 0, "2013-S2": 1, "2014-S1": 2, "2014-S2": 3
                }}}
            },
            "value": {"4": 1600.0, "5": 1600.0, "6": 1680.0, "7": 1700.0}
        }));

        // NAC block starts at currency_idx * geo * time = 1 * 1 * 4 = 4
        assert_eq!(data.flat_index(0).unwrap(), 4);
        assert_eq!(data.flat_index(3).unwrap(), 7);
        assert_eq!(data.value_for(2).unwrap(), Some(1680.0));
    }

    #[test]
    fn test_missing_nac_category_is_an_error() {
        let data = dataset(json!({
            "id": ["freq", "currency", "geo", "time"],
            "size": [1, 2, 1, 1],
            "dimension": {
                "currency": {"category": {"index": {"EUR": 0, "PPS": 1}}},
                "time": {"category": {"index": {"2013-S1": 0}}}
            },
            "value": {}
        }));

        assert!(data.flat_index(0).is_err());
    }

    #[test]
    fn test_mismatched_id_and_size_is_an_error() {
        let data = dataset(json!({
            "id": ["freq", "time"],
            "size": [1],
            "dimension": {"time": {"category": {"index": {"2013": 0}}}},
            "value": {}
        }));

        assert!(data.flat_index(0).is_err());
    }
}
