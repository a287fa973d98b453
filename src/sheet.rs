//! Extraction of quarterly city prices from the NBP housing workbook.
//!
//! The workbook layout is semi-structured: a header row somewhere near the
//! top names the cities, the first column carries free-text period labels,
//! and data rows follow in sheet order.

use crate::core::period::{YearQuarter, parse_quarter_label};
use anyhow::{Context, Result, anyhow};
use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;
use tracing::{debug, info};

/// One parsed workbook row: a quarter and the price for the target city.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarterlyPrice {
    pub period: YearQuarter,
    pub price: f64,
}

/// The header must appear within this many leading rows, otherwise the
/// workbook does not have the expected layout.
const HEADER_SCAN_ROWS: usize = 20;

/// Load the first worksheet of an XLSX document held in memory.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Range<Data>> {
    let mut workbook =
        Xlsx::new(Cursor::new(bytes)).context("Failed to open housing workbook")?;
    let sheets = workbook.sheet_names().to_owned();
    debug!("Workbook sheets: {sheets:?}");

    let first = sheets
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Housing workbook contains no sheets"))?;
    workbook
        .worksheet_range(&first)
        .with_context(|| format!("Failed to read sheet '{first}'"))
}

/// Extract quarterly prices for the city whose header cell contains
/// `city_token` (case-insensitive).
///
/// Rows with an empty period or price cell are skipped, as are rows whose
/// period label or price fails to parse; skips are logged, never fatal.
/// Rows are emitted in sheet order, which is not necessarily chronological.
pub fn extract_quarterly_prices(
    grid: &Range<Data>,
    city_token: &str,
) -> Result<Vec<QuarterlyPrice>> {
    let token = city_token.to_lowercase();
    let (header_row, price_col) = find_city_column(grid, &token).ok_or_else(|| {
        anyhow!("Column matching '{city_token}' not found in the first {HEADER_SCAN_ROWS} rows")
    })?;
    debug!(
        "Found '{}' column at row {}, column {}",
        city_token,
        header_row + 1,
        price_col + 1
    );

    let mut prices = Vec::new();
    for (row_idx, row) in grid.rows().enumerate().skip(header_row + 1) {
        let Some(label) = row.first().and_then(cell_text) else {
            continue;
        };
        let Some(price_cell) = row.get(price_col) else {
            continue;
        };
        if matches!(price_cell, Data::Empty) {
            continue;
        }

        let Some(period) = parse_quarter_label(&label) else {
            debug!("Skipping row {}: unrecognized period '{}'", row_idx + 1, label);
            continue;
        };
        let Some(price) = cell_number(price_cell) else {
            debug!(
                "Skipping row {}: invalid price for {}: {:?}",
                row_idx + 1,
                period,
                price_cell
            );
            continue;
        };

        prices.push(QuarterlyPrice { period, price });
    }

    info!(
        "Extracted {} quarterly data points for '{}'",
        prices.len(),
        city_token
    );
    Ok(prices)
}

fn find_city_column(grid: &Range<Data>, token: &str) -> Option<(usize, usize)> {
    for (row_idx, row) in grid.rows().take(HEADER_SCAN_ROWS).enumerate() {
        let hit = row.iter().position(|cell| match cell {
            Data::String(s) => s.to_lowercase().contains(token),
            _ => false,
        });
        if let Some(col) = hit {
            return Some((row_idx, col));
        }
    }
    None
}

/// Period labels are usually strings but occasionally numeric cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_header(header_row: u32, city_col: u32) -> Range<Data> {
        let mut grid: Range<Data> = Range::new((0, 0), (header_row + 6, 5));
        grid.set_value((0, 0), Data::String("Ceny mieszkań".into()));
        grid.set_value((header_row, 0), Data::String("Okres".into()));
        grid.set_value((header_row, 1), Data::String("Kraków".into()));
        grid.set_value((header_row, city_col), Data::String("Warszawa".into()));
        grid
    }

    #[test]
    fn test_extracts_rows_in_sheet_order() {
        let mut grid = grid_with_header(4, 3);
        grid.set_value((5, 0), Data::String("Q2 2021".into()));
        grid.set_value((5, 3), Data::Float(9700.0));
        grid.set_value((6, 0), Data::String("Q1 2021".into()));
        grid.set_value((6, 3), Data::Float(9500.0));

        let prices = extract_quarterly_prices(&grid, "warsza").unwrap();
        assert_eq!(
            prices,
            vec![
                QuarterlyPrice { period: YearQuarter::new(2021, 2), price: 9700.0 },
                QuarterlyPrice { period: YearQuarter::new(2021, 1), price: 9500.0 },
            ]
        );
    }

    #[test]
    fn test_skips_bad_rows_without_aborting() {
        let mut grid = grid_with_header(2, 3);
        // unparseable period
        grid.set_value((3, 0), Data::String("średnia".into()));
        grid.set_value((3, 3), Data::Float(1.0));
        // empty price cell
        grid.set_value((4, 0), Data::String("Q1 2020".into()));
        // unparseable price
        grid.set_value((5, 0), Data::String("Q2 2020".into()));
        grid.set_value((5, 3), Data::String("b.d.".into()));
        // good row, string-typed price
        grid.set_value((6, 0), Data::String("Q3 2020".into()));
        grid.set_value((6, 3), Data::String(" 10250.5 ".into()));

        let prices = extract_quarterly_prices(&grid, "warsza").unwrap();
        assert_eq!(
            prices,
            vec![QuarterlyPrice { period: YearQuarter::new(2020, 3), price: 10250.5 }]
        );
    }

    #[test]
    fn test_missing_city_column_is_fatal() {
        let mut grid: Range<Data> = Range::new((0, 0), (3, 3));
        grid.set_value((0, 0), Data::String("Okres".into()));
        grid.set_value((0, 1), Data::String("Kraków".into()));

        let result = extract_quarterly_prices(&grid, "warsza");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("warsza"));
    }

    #[test]
    fn test_header_match_is_case_insensitive() {
        let mut grid: Range<Data> = Range::new((0, 0), (2, 2));
        grid.set_value((0, 1), Data::String("WARSZAWA - rynek wtórny".into()));
        grid.set_value((1, 0), Data::String("I kw. 2013".into()));
        grid.set_value((1, 1), Data::Float(7100.0));

        let prices = extract_quarterly_prices(&grid, "Warsza").unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].period, YearQuarter::new(2013, 1));
    }
}
