//! Discount KPIs and band distribution.
//!
//! All functions are order-independent over their input records.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use discount_core::models::DiscountRecord;

// ── BandOrdering ──────────────────────────────────────────────────────────────

static BAND_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("regex is valid"));

/// How discount band labels are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandOrdering {
    /// Plain string order. "9%-19%" ranks above "80%-89%".
    #[default]
    Lexicographic,
    /// By the first number in the label, so "80%-89%" ranks above "9%-19%".
    /// Labels without a number rank below all numeric ones; ties fall back to
    /// string order.
    NumericRange,
}

impl BandOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            BandOrdering::Lexicographic => a.cmp(b),
            BandOrdering::NumericRange => match (band_lower_bound(a), band_lower_bound(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => a.cmp(b),
            },
        }
    }
}

/// First number appearing in a band label, e.g. `"10%-19%"` → `10.0`.
pub fn band_lower_bound(label: &str) -> Option<f64> {
    BAND_NUMBER
        .find(label)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Mean discount within the highest-ranked band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBandAverage {
    pub band: String,
    pub average: f64,
    pub count: usize,
}

/// One histogram bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandCount {
    pub band: String,
    pub count: usize,
}

/// Record counts per discount band, in band order, plus their total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandHistogram {
    pub rows: Vec<BandCount>,
    pub total: usize,
}

impl BandHistogram {
    /// Label of the synthetic summary row.
    pub const TOTAL_LABEL: &'static str = "Total";

    /// Band rows followed by the synthetic `"Total"` row.
    pub fn rows_with_total(&self) -> Vec<BandCount> {
        let mut rows = self.rows.clone();
        rows.push(BandCount {
            band: Self::TOTAL_LABEL.to_string(),
            count: self.total,
        });
        rows
    }
}

/// Every KPI over one record set. `None` marks a metric as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountSummary {
    pub record_count: usize,
    pub average_discount: Option<f64>,
    pub top_band: Option<TopBandAverage>,
    pub histogram: Option<BandHistogram>,
}

// ── DiscountAggregator ────────────────────────────────────────────────────────

/// Stateless KPI calculator.
pub struct DiscountAggregator;

impl DiscountAggregator {
    /// Arithmetic mean of the discounts; `None` for no records.
    pub fn average_discount(records: &[DiscountRecord]) -> Option<f64> {
        mean(records.iter().map(|r| r.discount))
    }

    /// Mean discount of the highest-ranked band under `ordering`.
    ///
    /// `None` when no record carries a band.
    pub fn top_band_average(records: &[DiscountRecord], ordering: BandOrdering) -> Option<TopBandAverage> {
        let top = records
            .iter()
            .filter_map(|r| r.discount_band.as_deref())
            .max_by(|a, b| ordering.compare(a, b))?;

        let in_band: Vec<f64> = records
            .iter()
            .filter(|r| r.discount_band.as_deref() == Some(top))
            .map(|r| r.discount)
            .collect();

        Some(TopBandAverage {
            band: top.to_string(),
            average: mean(in_band.iter().copied())?,
            count: in_band.len(),
        })
    }

    /// Count of records per band, rows sorted by `ordering`.
    ///
    /// `None` ("no band data") when no record carries a band.
    pub fn band_histogram(records: &[DiscountRecord], ordering: BandOrdering) -> Option<BandHistogram> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for band in records.iter().filter_map(|r| r.discount_band.as_deref()) {
            *counts.entry(band).or_default() += 1;
        }
        if counts.is_empty() {
            return None;
        }

        let mut rows: Vec<BandCount> = counts
            .into_iter()
            .map(|(band, count)| BandCount {
                band: band.to_string(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| ordering.compare(&a.band, &b.band));

        let total = rows.iter().map(|r| r.count).sum();
        Some(BandHistogram { rows, total })
    }

    /// All KPIs at once.
    pub fn summarize(records: &[DiscountRecord], ordering: BandOrdering) -> DiscountSummary {
        DiscountSummary {
            record_count: records.len(),
            average_discount: Self::average_discount(records),
            top_band: Self::top_band_average(records, ordering),
            histogram: Self::band_histogram(records, ordering),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(discount: f64, band: Option<&str>) -> DiscountRecord {
        DiscountRecord {
            insurer: "Acme".to_string(),
            chi_location: None,
            service_type: None,
            discount,
            discount_band: band.map(str::to_string),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ── average_discount ──────────────────────────────────────────────────────

    #[test]
    fn test_average_discount() {
        let records = vec![record(0.5, None), record(0.7, None)];
        let avg = DiscountAggregator::average_discount(&records).unwrap();
        assert!(approx(avg, 0.6), "avg = {avg}");
    }

    #[test]
    fn test_average_discount_empty_is_unavailable() {
        assert_eq!(DiscountAggregator::average_discount(&[]), None);
    }

    #[test]
    fn test_average_is_order_independent() {
        let a = vec![record(0.1, None), record(0.2, None), record(0.6, None)];
        let b = vec![record(0.6, None), record(0.1, None), record(0.2, None)];
        let x = DiscountAggregator::average_discount(&a).unwrap();
        let y = DiscountAggregator::average_discount(&b).unwrap();
        assert!(approx(x, y));
    }

    // ── top_band_average ──────────────────────────────────────────────────────

    #[test]
    fn test_top_band_picks_greatest_label() {
        let records = vec![
            record(0.1, Some("A")),
            record(0.2, Some("B")),
            record(0.3, Some("C")),
        ];
        let top = DiscountAggregator::top_band_average(&records, BandOrdering::Lexicographic).unwrap();
        assert_eq!(top.band, "C");
        assert!(approx(top.average, 0.3));
        assert_eq!(top.count, 1);
    }

    #[test]
    fn test_top_band_averages_within_band_only() {
        let records = vec![
            record(0.9, Some("90%-99%")),
            record(0.95, Some("90%-99%")),
            record(0.5, Some("50%-59%")),
            record(0.99, None),
        ];
        let top = DiscountAggregator::top_band_average(&records, BandOrdering::Lexicographic).unwrap();
        assert_eq!(top.band, "90%-99%");
        assert!(approx(top.average, 0.925));
        assert_eq!(top.count, 2);
    }

    #[test]
    fn test_top_band_unavailable_without_bands() {
        let records = vec![record(0.5, None)];
        assert!(DiscountAggregator::top_band_average(&records, BandOrdering::Lexicographic).is_none());
    }

    #[test]
    fn test_lexicographic_ordering_keeps_string_semantics() {
        let records = vec![record(0.85, Some("80%-89%")), record(0.1, Some("9%-19%"))];
        let top = DiscountAggregator::top_band_average(&records, BandOrdering::Lexicographic).unwrap();
        assert_eq!(top.band, "9%-19%");
    }

    #[test]
    fn test_numeric_ordering_ranks_by_lower_bound() {
        let records = vec![record(0.85, Some("80%-89%")), record(0.1, Some("9%-19%"))];
        let top = DiscountAggregator::top_band_average(&records, BandOrdering::NumericRange).unwrap();
        assert_eq!(top.band, "80%-89%");
        assert!(approx(top.average, 0.85));
    }

    #[test]
    fn test_numeric_ordering_puts_unparseable_labels_first() {
        let ord = BandOrdering::NumericRange;
        assert_eq!(ord.compare("unbanded", "5%-9%"), Ordering::Less);
        assert_eq!(ord.compare("10%-19%", "other"), Ordering::Greater);
        assert_eq!(ord.compare("alpha", "beta"), Ordering::Less);
        assert_eq!(ord.compare("10%", "10% "), Ordering::Less);
    }

    #[test]
    fn test_band_lower_bound() {
        assert_eq!(band_lower_bound("10%-19%"), Some(10.0));
        assert_eq!(band_lower_bound("<5"), Some(5.0));
        assert_eq!(band_lower_bound("12.5 - 20"), Some(12.5));
        assert_eq!(band_lower_bound("none"), None);
    }

    // ── band_histogram ────────────────────────────────────────────────────────

    #[test]
    fn test_histogram_counts_sorted_with_total() {
        let records = vec![
            record(0.6, Some("60-69")),
            record(0.4, Some("40-49")),
            record(0.65, Some("60-69")),
            record(0.1, None),
        ];
        let hist = DiscountAggregator::band_histogram(&records, BandOrdering::Lexicographic).unwrap();

        assert_eq!(
            hist.rows,
            vec![
                BandCount { band: "40-49".into(), count: 1 },
                BandCount { band: "60-69".into(), count: 2 },
            ]
        );
        assert_eq!(hist.total, 3);

        let with_total = hist.rows_with_total();
        assert_eq!(with_total.last().unwrap(), &BandCount { band: "Total".into(), count: 3 });
    }

    #[test]
    fn test_histogram_total_equals_sum_of_rows() {
        let bands = ["a", "b", "c", "a", "b", "a", "z"];
        let records: Vec<DiscountRecord> = bands.iter().map(|b| record(0.1, Some(b))).collect();
        let hist = DiscountAggregator::band_histogram(&records, BandOrdering::Lexicographic).unwrap();
        assert_eq!(hist.total, hist.rows.iter().map(|r| r.count).sum::<usize>());
        assert_eq!(hist.total, bands.len());
    }

    #[test]
    fn test_histogram_numeric_order() {
        let records = vec![record(0.85, Some("80%-89%")), record(0.1, Some("9%-19%"))];
        let hist = DiscountAggregator::band_histogram(&records, BandOrdering::NumericRange).unwrap();
        let labels: Vec<&str> = hist.rows.iter().map(|r| r.band.as_str()).collect();
        assert_eq!(labels, vec!["9%-19%", "80%-89%"]);
    }

    #[test]
    fn test_histogram_unavailable_without_bands() {
        let records = vec![record(0.5, None), record(0.6, None)];
        assert!(DiscountAggregator::band_histogram(&records, BandOrdering::Lexicographic).is_none());
    }

    // ── summarize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_summarize_empty() {
        let summary = DiscountAggregator::summarize(&[], BandOrdering::Lexicographic);
        assert_eq!(summary.record_count, 0);
        assert!(summary.average_discount.is_none());
        assert!(summary.top_band.is_none());
        assert!(summary.histogram.is_none());
    }
}
