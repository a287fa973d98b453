pub mod core;
pub mod gold;
pub mod interpolate;
pub mod output;
pub mod property;
pub mod providers;
pub mod sheet;
pub mod stocks;
pub mod ui;
pub mod update;
pub mod wages;

use crate::core::config::AppConfig;
use crate::wages::WageKind;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

/// Commands the binary dispatches after argument parsing.
#[derive(Debug, Clone)]
pub enum AppCommand {
    GoldHistory {
        start_year: Option<i32>,
        monthly: bool,
        output: Option<PathBuf>,
    },
    GoldToday,
    Property {
        output: Option<PathBuf>,
    },
    Wages {
        kind: WageKind,
        start_year: Option<i32>,
        end_year: Option<i32>,
        output: Option<PathBuf>,
    },
    Stocks,
    Stamp,
    UpdateAll {
        skip_checks: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("aurum starting...");

    let config = AppConfig::load_or_default(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::GoldHistory {
            start_year,
            monthly,
            output,
        } => gold::update_history(&config, start_year, monthly, output).await,
        AppCommand::GoldToday => gold::update_snapshot(&config).await,
        AppCommand::Property { output } => property::refresh(&config, output).await,
        AppCommand::Wages {
            kind,
            start_year,
            end_year,
            output,
        } => wages::refresh(&config, kind, start_year, end_year, output).await,
        AppCommand::Stocks => stocks::refresh(&config).await,
        AppCommand::Stamp => {
            let path = output::write_stamp(&config.data_dir)?;
            println!("Updated {}", path.display());
            Ok(())
        }
        AppCommand::UpdateAll { skip_checks } => update::run(&config, skip_checks).await,
    }
}
