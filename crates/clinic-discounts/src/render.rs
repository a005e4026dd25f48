//! Terminal rendering of dashboard views.

use std::fmt::Write as _;

use discount_core::formatting::{format_count, format_discount};
use discount_data::aggregator::BandHistogram;
use discount_data::analysis::{DashboardReport, DashboardView};
use discount_data::filter::FilterOptions;
use unicode_width::UnicodeWidthStr;

pub const TITLE: &str = "Clinic Discount Dashboard";
pub const EMPTY_DATASET_MESSAGE: &str = "No valid discount data recognised in this dataset.";
pub const NO_MATCH_MESSAGE: &str = "No records under current filters.";
pub const NO_BAND_MESSAGE: &str = "No discount band column in this data.";
const UNAVAILABLE: &str = "N/A";

// ── Width helpers ──────────────────────────────────────────────────────────────

/// Pad `s` with spaces to `width` display columns.
fn pad_right(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

fn pad_left(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - w), s)
    }
}

// ── Views ──────────────────────────────────────────────────────────────────────

/// The soft-empty message for a view, or `None` for a report.
pub fn empty_message(view: &DashboardView) -> Option<&'static str> {
    match view {
        DashboardView::EmptyDataset => Some(EMPTY_DATASET_MESSAGE),
        DashboardView::NoMatchingRecords { .. } => Some(NO_MATCH_MESSAGE),
        DashboardView::Report(_) => None,
    }
}

/// Plain-text rendering of `view`.
pub fn render_text(view: &DashboardView) -> String {
    match view {
        DashboardView::Report(report) => render_report(report),
        DashboardView::NoMatchingRecords { insurer } => {
            format!("{TITLE}\nInsurer: {insurer}\n\n{NO_MATCH_MESSAGE}\n")
        }
        DashboardView::EmptyDataset => format!("{TITLE}\n\n{EMPTY_DATASET_MESSAGE}\n"),
    }
}

fn render_report(report: &DashboardReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "Insurer: {}", report.insurer);
    let _ = writeln!(out, "Records: {}", format_count(report.record_count));
    out.push('\n');

    let average = format_discount(report.average_discount, 2);
    let (top_label, top_value) = match &report.top_band {
        Some(top) => (
            format!("Top band ({}) average", top.band),
            format_discount(top.average, 2),
        ),
        None => ("Top band average".to_string(), UNAVAILABLE.to_string()),
    };

    let label_width = UnicodeWidthStr::width(top_label.as_str()).max("Average discount".len()) + 2;
    let _ = writeln!(out, "{}{}", pad_right("Average discount", label_width), average);
    let _ = writeln!(out, "{}{}", pad_right(&top_label, label_width), top_value);
    out.push('\n');

    match &report.histogram {
        Some(histogram) => out.push_str(&render_histogram(histogram)),
        None => {
            let _ = writeln!(out, "{NO_BAND_MESSAGE}");
        }
    }
    out
}

/// Band / count table, closed by the Total row.
pub fn render_histogram(histogram: &BandHistogram) -> String {
    let rows = histogram.rows_with_total();
    let counts: Vec<String> = rows.iter().map(|r| format_count(r.count)).collect();

    let band_width = rows
        .iter()
        .map(|r| UnicodeWidthStr::width(r.band.as_str()))
        .chain(std::iter::once("Discount band".len()))
        .max()
        .unwrap_or(0);
    let count_width = counts
        .iter()
        .map(|c| c.len())
        .chain(std::iter::once("Count".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}",
        pad_right("Discount band", band_width),
        pad_left("Count", count_width)
    );
    let _ = writeln!(out, "{}  {}", "-".repeat(band_width), "-".repeat(count_width));
    for (row, count) in rows.iter().zip(&counts) {
        let _ = writeln!(
            out,
            "{}  {}",
            pad_right(&row.band, band_width),
            pad_left(count, count_width)
        );
    }
    out
}

/// Insurers plus the chosen insurer's filter options, for `--list`.
pub fn render_listing(insurers: &[String], insurer: Option<&str>, options: &FilterOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Insurers:");
    for name in insurers {
        let marker = if Some(name.as_str()) == insurer { "*" } else { " " };
        let _ = writeln!(out, " {marker} {name}");
    }
    if let Some(insurer) = insurer {
        let _ = writeln!(out, "\nChi locations ({insurer}):");
        for value in &options.chi_locations {
            let _ = writeln!(out, "   {value}");
        }
        let _ = writeln!(out, "\nService types ({insurer}):");
        for value in &options.service_types {
            let _ = writeln!(out, "   {value}");
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
