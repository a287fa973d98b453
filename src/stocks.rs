//! Stock price pipeline: daily bars from Yahoo Finance aggregated to
//! monthly OHLCV records and joined against the monthly gold table.

use crate::core::config::{AppConfig, StockConfig};
use crate::core::gold::GoldPriceTable;
use crate::core::period::YearMonth;
use crate::core::round2;
use crate::output;
use crate::providers::yahoo::{DailyBar, YahooChartClient};
use crate::ui;
use anyhow::{Result, anyhow, bail};
use chrono::{Datelike, Local, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One month of a ticker's series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBar {
    pub year: i32,
    pub month: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
    pub price_gold: Option<f64>,
}

/// Wrapper document written per ticker.
#[derive(Debug, Serialize)]
struct StockSeriesDoc<'a> {
    ticker: &'a str,
    name: &'a str,
    generated: String,
    data_points: usize,
    currency: &'static str,
    note: &'static str,
    data: Vec<MonthlyBar>,
}

const GOLD_NOTE: &str = "price_gold values are in grams of gold (1000 proof from NBP)";

pub async fn refresh(config: &AppConfig) -> Result<()> {
    if config.stocks.is_empty() {
        warn!("No stocks configured, nothing to fetch");
        println!("No stocks configured.");
        return Ok(());
    }

    // A missing gold table degrades price_gold to null, it does not block
    let gold = match GoldPriceTable::load(&config.gold_monthly_path()) {
        Ok(table) => table,
        Err(e) => {
            warn!("Gold prices unavailable, price_gold will be null: {:#}", e);
            GoldPriceTable::default()
        }
    };

    let client = YahooChartClient::new(&config.providers.yahoo.base_url);
    let today = Local::now().date_naive();

    let pb = ui::new_progress_bar(config.stocks.len() as u64, true);
    pb.set_message("Fetching stocks...");
    let fetches = config.stocks.iter().map(|stock| {
        let client = &client;
        let gold = &gold;
        let pb = pb.clone();
        async move {
            let result = refresh_one(client, stock, config, today, gold).await;
            pb.inc(1);
            (stock.ticker.as_str(), result)
        }
    });
    let results = join_all(fetches).await;
    pb.finish_and_clear();

    let mut failed = 0;
    for (ticker, result) in results {
        match result {
            Ok(months) => println!("{ticker}: {months} months"),
            Err(e) => {
                warn!("Failed to process {}: {:#}", ticker, e);
                failed += 1;
            }
        }
    }
    info!(
        "Processed {} stocks, {} failed",
        config.stocks.len() - failed,
        failed
    );
    Ok(())
}

async fn refresh_one(
    client: &YahooChartClient,
    stock: &StockConfig,
    config: &AppConfig,
    today: NaiveDate,
    gold: &GoldPriceTable,
) -> Result<usize> {
    let start_year = stock.start_year.unwrap_or(config.start_year);
    let from = NaiveDate::from_ymd_opt(start_year, 1, 1)
        .ok_or_else(|| anyhow!("Invalid start year: {start_year}"))?;

    let bars = client.fetch_daily_bars(&stock.ticker, from, today).await?;
    if bars.is_empty() {
        bail!("No data found for ticker: {}", stock.ticker);
    }

    let monthly = aggregate_monthly(&bars, gold);
    let doc = StockSeriesDoc {
        ticker: &stock.ticker,
        name: &stock.name,
        generated: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        data_points: monthly.len(),
        currency: listing_currency(&stock.ticker),
        note: GOLD_NOTE,
        data: monthly,
    };

    let path = config
        .stocks_dir()
        .join(format!("{}-monthly.json", sanitize_ticker(&stock.ticker)));
    output::write_json(&path, &doc)?;
    Ok(doc.data_points)
}

/// Group daily bars by calendar month: open from the first bar, close and
/// volume from the last, high/low over the whole month, all prices rounded
/// to two decimals. `price_gold` is the month's close in grams of gold.
pub fn aggregate_monthly(bars: &[DailyBar], gold: &GoldPriceTable) -> Vec<MonthlyBar> {
    let mut buckets: BTreeMap<YearMonth, Vec<&DailyBar>> = BTreeMap::new();
    for bar in bars {
        buckets
            .entry(YearMonth::new(bar.date.year(), bar.date.month()))
            .or_default()
            .push(bar);
    }

    buckets
        .into_iter()
        .filter_map(|(month, mut month_bars)| {
            month_bars.sort_by_key(|bar| bar.date);
            let first = month_bars.first()?;
            let last = month_bars.last()?;
            let high = month_bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let low = month_bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let close = round2(last.close);

            Some(MonthlyBar {
                year: month.year,
                month: month.month,
                open: round2(first.open),
                high: round2(high),
                low: round2(low),
                close,
                volume: last.volume,
                price_gold: gold.grams_for(month, close),
            })
        })
        .collect()
}

/// Tickers on the `.IL`/`.L` listings are quoted in PLN by the upstream
/// configuration; everything else stays in its local currency.
fn listing_currency(ticker: &str) -> &'static str {
    if ticker.contains(".IL") || ticker.contains(".L") {
        "PLN"
    } else {
        "local"
    }
}

fn sanitize_ticker(ticker: &str) -> String {
    ticker.replace(['.', ' '], "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gold::MonthlyGoldPrice;

    fn bar(date: &str, open: f64, high: f64, low: f64, close: f64, volume: i64) -> DailyBar {
        DailyBar {
            date: date.parse().unwrap(),
            open,
            high,
            low,
            close,
            volume: Some(volume),
        }
    }

    #[test]
    fn test_aggregate_monthly_ohlcv() {
        let bars = [
            bar("2024-01-02", 10.0, 10.5, 9.8, 10.2, 100),
            bar("2024-01-15", 10.2, 11.0, 10.1, 10.9, 200),
            bar("2024-01-31", 10.9, 11.2, 10.7, 11.0, 300),
            bar("2024-02-01", 11.0, 11.4, 10.9, 11.3, 400),
        ];
        let gold = GoldPriceTable::from_entries([MonthlyGoldPrice {
            year: 2024,
            month: 1,
            price: 250.0,
        }]);

        let monthly = aggregate_monthly(&bars, &gold);

        assert_eq!(monthly.len(), 2);
        let january = &monthly[0];
        assert_eq!((january.year, january.month), (2024, 1));
        assert_eq!(january.open, 10.0);
        assert_eq!(january.high, 11.2);
        assert_eq!(january.low, 9.8);
        assert_eq!(january.close, 11.0);
        assert_eq!(january.volume, Some(300));
        assert_eq!(january.price_gold, Some(0.04));

        // February has no gold price
        assert_eq!(monthly[1].price_gold, None);
    }

    #[test]
    fn test_aggregate_sorts_bars_within_month() {
        let bars = [
            bar("2024-03-29", 12.0, 12.5, 11.9, 12.4, 500),
            bar("2024-03-01", 11.5, 11.8, 11.4, 11.7, 600),
        ];
        let monthly = aggregate_monthly(&bars, &GoldPriceTable::default());

        assert_eq!(monthly[0].open, 11.5);
        assert_eq!(monthly[0].close, 12.4);
        assert_eq!(monthly[0].volume, Some(500));
    }

    #[test]
    fn test_sanitize_ticker() {
        assert_eq!(sanitize_ticker("CDR.WA"), "cdr_wa");
        assert_eq!(sanitize_ticker("GOLD ETF.IL"), "gold_etf_il");
    }

    #[test]
    fn test_listing_currency() {
        assert_eq!(listing_currency("XTB.IL"), "PLN");
        assert_eq!(listing_currency("AU.L"), "PLN");
        assert_eq!(listing_currency("AAPL"), "local");
    }
}
