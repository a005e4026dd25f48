//! Dashboard analysis pipeline.
//!
//! Filters a normalized collection down to one selection and aggregates it,
//! returning a [`DashboardView`] ready for rendering. The two "nothing to
//! show" conditions are views, not errors.

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use discount_core::models::{DiscountRecord, NormalizedCollection};

use crate::aggregator::{BandHistogram, BandOrdering, DiscountAggregator, TopBandAverage};
use crate::filter::{FilterEngine, FilterSelection};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    pub band_ordering: BandOrdering,
    /// Records of the whole collection the selection was applied to.
    pub records_considered: usize,
}

/// KPIs for one insurer under one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub insurer: String,
    pub selection: FilterSelection,
    /// Records left after filtering; always non-zero.
    pub record_count: usize,
    pub average_discount: f64,
    /// `None` when no filtered record has a discount band.
    pub top_band: Option<TopBandAverage>,
    /// `None` when no filtered record has a discount band.
    pub histogram: Option<BandHistogram>,
    pub metadata: ReportMetadata,
}

/// What the dashboard should display for a selection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    /// The loaded bundle yielded no usable records at all.
    EmptyDataset,
    /// Records exist, but none match the selection.
    NoMatchingRecords { insurer: String },
    Report(Box<DashboardReport>),
}

impl DashboardView {
    /// `true` for both soft-empty outcomes.
    pub fn is_empty(&self) -> bool {
        !matches!(self, DashboardView::Report(_))
    }

    pub fn report(&self) -> Option<&DashboardReport> {
        match self {
            DashboardView::Report(report) => Some(report.as_ref()),
            _ => None,
        }
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the selection pipeline over `collection`.
///
/// 1. An empty collection short-circuits to [`DashboardView::EmptyDataset`].
/// 2. Apply the filter; no survivors gives [`DashboardView::NoMatchingRecords`].
/// 3. Aggregate the survivors into a [`DashboardReport`].
pub fn analyze_selection(
    collection: &NormalizedCollection,
    selection: &FilterSelection,
    ordering: BandOrdering,
) -> DashboardView {
    if collection.is_empty() {
        debug!("empty dataset; nothing to analyze");
        return DashboardView::EmptyDataset;
    }

    // ── Step 1: Filter ────────────────────────────────────────────────────────
    let filtered = FilterEngine::apply(collection, selection);
    if filtered.is_empty() {
        debug!(insurer = %selection.insurer, "selection matched no records");
        return DashboardView::NoMatchingRecords {
            insurer: selection.insurer.clone(),
        };
    }

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let records: &[DiscountRecord] = filtered.records();
    let summary = DiscountAggregator::summarize(records, ordering);
    let Some(average_discount) = summary.average_discount else {
        return DashboardView::NoMatchingRecords {
            insurer: selection.insurer.clone(),
        };
    };

    // ── Step 3: Build report ──────────────────────────────────────────────────
    debug!(
        insurer = %selection.insurer,
        records = summary.record_count,
        "report built"
    );

    DashboardView::Report(Box::new(DashboardReport {
        insurer: selection.insurer.clone(),
        selection: selection.clone(),
        record_count: summary.record_count,
        average_discount,
        top_band: summary.top_band,
        histogram: summary.histogram,
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339(),
            band_ordering: ordering,
            records_considered: collection.len(),
        },
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(insurer: &str, chi: &str, discount: f64, band: Option<&str>) -> DiscountRecord {
        DiscountRecord {
            insurer: insurer.to_string(),
            chi_location: Some(chi.to_string()),
            service_type: None,
            discount,
            discount_band: band.map(str::to_string),
        }
    }

    fn sample() -> NormalizedCollection {
        NormalizedCollection::new(vec![
            record("Acme", "X", 0.5, Some("40-49")),
            record("Acme", "Y", 0.7, Some("60-69")),
            record("Zeta", "X", 0.2, None),
        ])
    }

    #[test]
    fn test_empty_collection_is_empty_dataset() {
        let view = analyze_selection(
            &NormalizedCollection::default(),
            &FilterSelection::for_insurer("Acme"),
            BandOrdering::default(),
        );
        assert!(matches!(view, DashboardView::EmptyDataset));
        assert!(view.is_empty());
    }

    #[test]
    fn test_no_match_is_distinct_from_empty_dataset() {
        let selection = FilterSelection::for_insurer("Acme").with_chi_locations(["Nowhere"]);
        let view = analyze_selection(&sample(), &selection, BandOrdering::default());
        match view {
            DashboardView::NoMatchingRecords { insurer } => assert_eq!(insurer, "Acme"),
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_insurer_matches_nothing() {
        let view = analyze_selection(&sample(), &FilterSelection::for_insurer("Nobody"), BandOrdering::default());
        assert!(matches!(view, DashboardView::NoMatchingRecords { .. }));
    }

    #[test]
    fn test_report_contents() {
        let view = analyze_selection(&sample(), &FilterSelection::for_insurer("Acme"), BandOrdering::default());
        let report = view.report().expect("report");

        assert_eq!(report.record_count, 2);
        assert!((report.average_discount - 0.6).abs() < 1e-9);
        assert_eq!(report.top_band.as_ref().unwrap().band, "60-69");
        assert_eq!(report.histogram.as_ref().unwrap().total, 2);
        assert_eq!(report.metadata.records_considered, 3);
        assert!(!report.metadata.generated_at.is_empty());
    }

    #[test]
    fn test_report_without_bands_keeps_average() {
        let view = analyze_selection(&sample(), &FilterSelection::for_insurer("Zeta"), BandOrdering::default());
        let report = view.report().unwrap();
        assert!((report.average_discount - 0.2).abs() < 1e-9);
        assert!(report.top_band.is_none());
        assert!(report.histogram.is_none());
    }

    #[test]
    fn test_view_serializes_with_tag() {
        let view = DashboardView::NoMatchingRecords { insurer: "Acme".into() };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "no_matching_records");
        assert_eq!(json["insurer"], "Acme");
    }
}
