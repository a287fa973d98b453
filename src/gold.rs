//! Gold price pipelines: the full NBP history aggregated to monthly or
//! yearly averages, and the 30-day snapshot with the latest quotation.

use crate::core::config::AppConfig;
use crate::core::gold::{self, DailyGoldPrice};
use crate::output;
use crate::providers::nbp::{NbpClient, gold_fetch_windows};
use crate::ui;
use anyhow::{Result, anyhow, bail};
use chrono::{Duration, Local, NaiveDate};
use std::path::PathBuf;
use tracing::{info, warn};

/// Calendar days fetched for the snapshot file. NBP only quotes working
/// days, so this yields roughly 20 trading days.
const SNAPSHOT_DAYS: i64 = 30;

fn nbp_client(config: &AppConfig) -> NbpClient {
    NbpClient::new(
        &config.providers.nbp.api_base_url,
        &config.providers.nbp.housing_url,
    )
}

/// Fetch the full gold price history and persist yearly averages, or
/// monthly averages when `monthly` is set.
pub async fn update_history(
    config: &AppConfig,
    start_year: Option<i32>,
    monthly: bool,
    output_path: Option<PathBuf>,
) -> Result<()> {
    let client = nbp_client(config);
    let start_year = start_year.unwrap_or(config.start_year);
    let from = NaiveDate::from_ymd_opt(start_year, 1, 1)
        .ok_or_else(|| anyhow!("Invalid start year: {start_year}"))?;
    let today = Local::now().date_naive();

    let daily = fetch_history(&client, from, today).await?;
    let monthly_prices = gold::aggregate_monthly(&daily);

    if monthly {
        let path = output_path.unwrap_or_else(|| config.gold_monthly_path());
        output::write_json(&path, &monthly_prices)?;
        println!(
            "Saved {} monthly gold prices to {}",
            monthly_prices.len(),
            path.display()
        );
    } else {
        let yearly_prices = gold::aggregate_yearly(&monthly_prices);
        let path = output_path.unwrap_or_else(|| config.gold_yearly_path());
        output::write_json(&path, &yearly_prices)?;
        println!(
            "Saved {} yearly gold prices to {}",
            yearly_prices.len(),
            path.display()
        );
    }
    Ok(())
}

async fn fetch_history(
    client: &NbpClient,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<DailyGoldPrice>> {
    let windows = gold_fetch_windows(from, until);
    info!(
        "Fetching NBP gold prices from {} to {} in {} windows",
        from,
        until,
        windows.len()
    );

    let pb = ui::new_progress_bar(windows.len() as u64, true);
    pb.set_message("Fetching gold quotations...");

    let mut daily = Vec::new();
    for (start, end) in windows {
        match client.fetch_gold_range(start, end).await {
            Ok(mut quotes) => daily.append(&mut quotes),
            // A failed window leaves a gap; the remaining history is still usable
            Err(e) => warn!("Skipping window {} to {}: {:#}", start, end, e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if daily.is_empty() {
        bail!("No data retrieved from the NBP gold price API");
    }
    daily.sort_by_key(|quote| quote.date);
    info!("Total daily prices retrieved: {}", daily.len());
    Ok(daily)
}

/// Fetch the last 30 days of quotations and persist the daily list
/// (newest first) plus the single most recent quotation.
pub async fn update_snapshot(config: &AppConfig) -> Result<()> {
    let client = nbp_client(config);
    let today = Local::now().date_naive();
    let start = today - Duration::days(SNAPSHOT_DAYS);

    let mut daily = client.fetch_gold_range(start, today).await?;
    if daily.is_empty() {
        bail!("No data returned from the NBP gold price API");
    }

    // Newest first; the web application reads the head of the file
    daily.sort_by_key(|quote| std::cmp::Reverse(quote.date));
    let latest = daily[0];

    output::write_json(&config.gold_daily_path(), &daily)?;
    output::write_json(&config.gold_latest_path(), &latest)?;

    info!(
        "Most recent price: {} = {} PLN/g",
        latest.date, latest.price
    );
    println!(
        "Latest gold price: {} PLN/g ({}), {} daily quotes saved",
        latest.price,
        latest.date,
        daily.len()
    );
    Ok(())
}
