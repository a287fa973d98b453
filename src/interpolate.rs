//! Quarterly-to-monthly series reconstruction.

use crate::core::period::YearMonth;
use crate::core::round2;
use crate::sheet::QuarterlyPrice;
use std::collections::BTreeMap;
use tracing::debug;

/// One month of the reconstructed price series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyPrice {
    pub month: YearMonth,
    pub price: f64,
}

/// Flat-index distance between the mid-months of two consecutive quarters.
/// Anything wider means a reporting gap that needs bridging.
const ADJACENT_QUARTER_MONTHS: i32 = 3;

/// Expand a sparse quarterly series into a dense monthly one.
///
/// Two sequential passes over an ordered keyed store. Pass 1 broadcasts each
/// quarter's price to its three months; duplicate quarters resolve to the
/// last input occurrence. Pass 2 bridges reporting gaps: for each pair of
/// neighbouring anchors further than one quarter apart, prices are linearly
/// interpolated between the two mid-quarter months and written only into
/// months the broadcast left empty, so broadcast values always win over
/// interpolated ones. The result is contiguous from the first anchor's first
/// month to the last anchor's last month; nothing is extrapolated beyond
/// the outermost anchors.
pub fn quarterly_to_monthly(quarterly: &[QuarterlyPrice]) -> Vec<MonthlyPrice> {
    if quarterly.is_empty() {
        return Vec::new();
    }

    let mut anchors = quarterly.to_vec();
    // Stable sort: duplicate quarters keep input order, so the later input
    // row overwrites during the broadcast below.
    anchors.sort_by_key(|r| (r.period.year, r.period.quarter));

    let mut months: BTreeMap<YearMonth, f64> = BTreeMap::new();

    for anchor in &anchors {
        for month in anchor.period.months() {
            months.insert(month, anchor.price);
        }
    }

    for pair in anchors.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let start = from.period.mid_month().flat_index();
        let end = to.period.mid_month().flat_index();
        let total_steps = end - start;
        if total_steps <= ADJACENT_QUARTER_MONTHS {
            continue;
        }

        debug!(
            "Bridging gap {} -> {} over {} months",
            from.period, to.period, total_steps
        );
        for step in 1..total_steps {
            let month = YearMonth::from_flat_index(start + step);
            let price =
                from.price + (to.price - from.price) * (step as f64 / total_steps as f64);
            months.entry(month).or_insert_with(|| round2(price));
        }
    }

    months
        .into_iter()
        .map(|(month, price)| MonthlyPrice {
            month,
            price: round2(price),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::period::YearQuarter;

    fn anchor(year: i32, quarter: u32, price: f64) -> QuarterlyPrice {
        QuarterlyPrice {
            period: YearQuarter::new(year, quarter),
            price,
        }
    }

    fn assert_contiguous(series: &[MonthlyPrice]) {
        for pair in series.windows(2) {
            assert_eq!(
                pair[1].month.flat_index(),
                pair[0].month.flat_index() + 1,
                "gap between {} and {}",
                pair[0].month,
                pair[1].month
            );
        }
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        assert!(quarterly_to_monthly(&[]).is_empty());
    }

    #[test]
    fn test_single_quarter_broadcasts_three_months() {
        let series = quarterly_to_monthly(&[anchor(2020, 1, 100.0)]);
        assert_eq!(
            series,
            vec![
                MonthlyPrice { month: YearMonth::new(2020, 1), price: 100.0 },
                MonthlyPrice { month: YearMonth::new(2020, 2), price: 100.0 },
                MonthlyPrice { month: YearMonth::new(2020, 3), price: 100.0 },
            ]
        );
    }

    #[test]
    fn test_adjacent_quarters_are_not_interpolated() {
        let series = quarterly_to_monthly(&[anchor(2021, 1, 9500.0), anchor(2021, 2, 9700.0)]);
        assert_eq!(series.len(), 6);
        assert_contiguous(&series);
        assert!(series[..3].iter().all(|m| m.price == 9500.0));
        assert!(series[3..].iter().all(|m| m.price == 9700.0));
    }

    #[test]
    fn test_gap_is_bridged_linearly_between_mid_months() {
        // Q1 and Q4 of the same year: mid-months Feb and Nov, 9 steps apart.
        let series = quarterly_to_monthly(&[anchor(2020, 1, 100.0), anchor(2020, 4, 160.0)]);

        assert_eq!(series.len(), 12);
        assert_contiguous(&series);
        assert_eq!(series[0].month, YearMonth::new(2020, 1));
        assert_eq!(series[11].month, YearMonth::new(2020, 12));

        // Broadcast months keep their anchor price even inside the bridge
        assert!(series[..3].iter().all(|m| m.price == 100.0));
        assert!(series[9..].iter().all(|m| m.price == 160.0));

        // Interpolated months Apr..Sep climb monotonically in equal steps
        let bridged: Vec<f64> = series[3..9].iter().map(|m| m.price).collect();
        let expected: Vec<f64> = (2..8)
            .map(|step| round2(100.0 + 60.0 * step as f64 / 9.0))
            .collect();
        assert_eq!(bridged, expected);
        for pair in bridged.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_gap_across_year_boundary_stays_contiguous() {
        let series = quarterly_to_monthly(&[anchor(2020, 4, 100.0), anchor(2021, 3, 200.0)]);

        assert_contiguous(&series);
        assert_eq!(series.first().unwrap().month, YearMonth::new(2020, 10));
        assert_eq!(series.last().unwrap().month, YearMonth::new(2021, 9));
        assert_eq!(series.len(), 12);
    }

    #[test]
    fn test_duplicate_quarter_last_write_wins() {
        let series = quarterly_to_monthly(&[anchor(2020, 1, 100.0), anchor(2020, 1, 120.0)]);
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|m| m.price == 120.0));
    }

    #[test]
    fn test_unordered_input_is_sorted_before_processing() {
        let series = quarterly_to_monthly(&[anchor(2021, 2, 9700.0), anchor(2021, 1, 9500.0)]);
        assert_eq!(series.first().unwrap().month, YearMonth::new(2021, 1));
        assert_eq!(series.first().unwrap().price, 9500.0);
        assert_eq!(series.last().unwrap().month, YearMonth::new(2021, 6));
    }
}
