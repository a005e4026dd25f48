//! Bundle → normalized collection.
//!
//! Runs the [`SchemaReconciler`] on every table, keeps the four canonical
//! columns, drops rows whose discount does not coerce to a number, and stamps
//! each surviving row with its table name as the insurer.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use discount_core::data_processors::CellCoercer;
use discount_core::models::{DiscountRecord, InputBundle, NormalizedCollection, RawTable};

use crate::reconciler::{CanonicalField, ColumnMapping, SchemaReconciler};

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened to one table during a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Rows were adopted (possibly zero after cleaning).
    Loaded,
    /// The table had no headers or no rows.
    Empty,
    /// No header matched the discount rules; the table was skipped whole.
    NoDiscountColumn,
}

/// Per-table load diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub name: String,
    pub status: TableStatus,
    pub mapping: ColumnMapping,
    pub rows_kept: usize,
    /// Rows whose discount cell failed numeric coercion.
    pub rows_dropped: usize,
}

/// The complete output of [`RecordLoader::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub collection: NormalizedCollection,
    pub tables: Vec<TableReport>,
}

impl LoadOutcome {
    /// `true` when no table contributed a single usable row.
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Total rows dropped for non-numeric discounts, across all tables.
    pub fn rows_dropped(&self) -> usize {
        self.tables.iter().map(|t| t.rows_dropped).sum()
    }
}

// ── RecordLoader ──────────────────────────────────────────────────────────────

/// Stateless loader from [`InputBundle`] to [`NormalizedCollection`].
pub struct RecordLoader;

impl RecordLoader {
    /// Load every table in `bundle`.
    ///
    /// Tables are independent, so they are processed in parallel; the indexed
    /// collect keeps the result in bundle order. A bundle with nothing usable
    /// yields an empty collection rather than an error.
    pub fn load(bundle: &InputBundle) -> LoadOutcome {
        let per_table: Vec<(Vec<DiscountRecord>, TableReport)> = bundle
            .tables()
            .par_iter()
            .map(|(name, table)| Self::load_table(name, table))
            .collect();

        let mut records = Vec::new();
        let mut tables = Vec::with_capacity(per_table.len());
        for (table_records, report) in per_table {
            records.extend(table_records);
            tables.push(report);
        }

        let outcome = LoadOutcome {
            collection: NormalizedCollection::new(records),
            tables,
        };

        info!(
            tables = bundle.len(),
            records = outcome.collection.len(),
            rows_dropped = outcome.rows_dropped(),
            "bundle loaded"
        );

        outcome
    }

    /// Convenience wrapper returning only the collection.
    pub fn load_collection(bundle: &InputBundle) -> NormalizedCollection {
        Self::load(bundle).collection
    }

    /// Load a single table tagged with `insurer`.
    pub fn load_table(insurer: &str, table: &RawTable) -> (Vec<DiscountRecord>, TableReport) {
        if table.is_empty() {
            debug!(table = insurer, "skipping empty table");
            return (Vec::new(), Self::report(insurer, TableStatus::Empty, ColumnMapping::default()));
        }

        let mapping = SchemaReconciler::reconcile(table);

        let Some(discount_col) = mapping.index_of(CanonicalField::Discount) else {
            debug!(table = insurer, "no discount column; skipping table");
            return (Vec::new(), Self::report(insurer, TableStatus::NoDiscountColumn, mapping));
        };

        let chi_col = mapping.index_of(CanonicalField::ChiLocation);
        let service_col = mapping.index_of(CanonicalField::ServiceType);
        let band_col = mapping.index_of(CanonicalField::DiscountBand);

        let label = |row: usize, col: Option<usize>| -> Option<String> {
            col.and_then(|c| CellCoercer::to_label(table.cell(row, c)))
        };

        let mut records = Vec::with_capacity(table.rows.len());
        let mut rows_dropped = 0usize;

        for row in 0..table.rows.len() {
            let Some(discount) = CellCoercer::to_number(table.cell(row, discount_col)) else {
                rows_dropped += 1;
                continue;
            };
            records.push(DiscountRecord {
                insurer: insurer.to_string(),
                chi_location: label(row, chi_col),
                service_type: label(row, service_col),
                discount,
                discount_band: label(row, band_col),
            });
        }

        debug!(
            table = insurer,
            kept = records.len(),
            dropped = rows_dropped,
            discount_header = %table.headers[discount_col],
            "table loaded"
        );

        let mut report = Self::report(insurer, TableStatus::Loaded, mapping);
        report.rows_kept = records.len();
        report.rows_dropped = rows_dropped;
        (records, report)
    }

    fn report(name: &str, status: TableStatus, mapping: ColumnMapping) -> TableReport {
        TableReport {
            name: name.to_string(),
            status,
            mapping,
            rows_kept: 0,
            rows_dropped: 0,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
