use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StockConfig {
    pub ticker: String,
    pub name: String,
    /// Overrides the global `start_year` for this ticker.
    pub start_year: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NbpProviderConfig {
    pub api_base_url: String,
    pub housing_url: String,
}

impl Default for NbpProviderConfig {
    fn default() -> Self {
        NbpProviderConfig {
            api_base_url: "https://api.nbp.pl/api".to_string(),
            housing_url: "https://static.nbp.pl/dane/rynek-nieruchomosci/ceny_mieszkan.xlsx"
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EurostatProviderConfig {
    pub base_url: String,
}

impl Default for EurostatProviderConfig {
    fn default() -> Self {
        EurostatProviderConfig {
            base_url: "https://ec.europa.eu/eurostat/api/dissemination/statistics/1.0/data"
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub nbp: NbpProviderConfig,
    pub eurostat: EurostatProviderConfig,
    pub yahoo: YahooProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the JSON data files are written into.
    pub data_dir: PathBuf,
    pub providers: ProvidersConfig,
    /// Case-insensitive substring identifying the city column in the
    /// housing workbook header.
    pub city_token: String,
    /// Default first year for the fetch pipelines.
    pub start_year: i32,
    pub stocks: Vec<StockConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("data"),
            providers: ProvidersConfig::default(),
            city_token: "warsza".to_string(),
            start_year: 2013,
            stocks: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path, or from the default location, falling
    /// back to defaults when no config file exists at all.
    pub fn load_or_default(config_path: Option<&str>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("pl", "aurum", "aurum")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn gold_yearly_path(&self) -> PathBuf {
        self.data_dir.join("nbp-gold-prices.json")
    }

    pub fn gold_monthly_path(&self) -> PathBuf {
        self.data_dir.join("nbp-gold-prices-monthly.json")
    }

    pub fn gold_daily_path(&self) -> PathBuf {
        self.data_dir.join("nbp-gold-prices-daily.json")
    }

    pub fn gold_latest_path(&self) -> PathBuf {
        self.data_dir.join("pricetoday.json")
    }

    pub fn property_path(&self) -> PathBuf {
        self.data_dir.join("warsaw-m2-prices-monthly.json")
    }

    pub fn avg_wages_path(&self) -> PathBuf {
        self.data_dir.join("avg-wages.json")
    }

    pub fn min_wages_path(&self) -> PathBuf {
        self.data_dir.join("min-wages.json")
    }

    pub fn stocks_dir(&self) -> PathBuf {
        self.data_dir.join("stocks")
    }
}
