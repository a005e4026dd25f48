use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical column name of the discount field.
///
/// Insurer sheets spell the column both ways; the legacy spelling is the one
/// downstream consumers key on.
pub const DISCOUNT_COLUMN: &str = "dicount";

/// A single spreadsheet cell as handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Blank cell, or a position past the end of a short row.
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<serde_json::Value> for CellValue {
    /// Map a JSON scalar onto a cell. Arrays and objects are kept as their
    /// compact JSON text so no information is silently lost.
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Value::String(s) => CellValue::Text(s),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// One sheet of an insurer export: a header row followed by data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// A table without headers or without data rows carries nothing to load.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Cell at (`row`, `col`); positions past the end of a short row read as
    /// [`CellValue::Empty`].
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }
}

/// Ordered mapping from table (sheet) name to raw table.
///
/// Iteration follows insertion order, which for workbooks is sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBundle {
    tables: Vec<(String, RawTable)>,
}

impl InputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. A table with an existing name is replaced in place.
    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        let name = name.into();
        match self.tables.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = table,
            None => self.tables.push((name, table)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawTable)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn tables(&self) -> &[(String, RawTable)] {
        &self.tables
    }
}

impl<N: Into<String>> FromIterator<(N, RawTable)> for InputBundle {
    fn from_iter<I: IntoIterator<Item = (N, RawTable)>>(iter: I) -> Self {
        let mut bundle = InputBundle::new();
        for (name, table) in iter {
            bundle.insert(name, table);
        }
        bundle
    }
}

/// One normalized clinic discount offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRecord {
    /// Name of the sheet the row came from.
    pub insurer: String,
    #[serde(default)]
    pub chi_location: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    /// Fractional discount, typically in `[0, 1]`. Always finite.
    #[serde(rename = "dicount")]
    pub discount: f64,
    #[serde(default)]
    pub discount_band: Option<String>,
}

/// The reconciled record set produced by a load.
///
/// Order carries no meaning for aggregation; it follows bundle order so that
/// output stays reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedCollection {
    records: Vec<DiscountRecord>,
}

impl NormalizedCollection {
    pub fn new(records: Vec<DiscountRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DiscountRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiscountRecord> {
        self.records.iter()
    }

    /// Distinct insurer names, sorted.
    pub fn insurers(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.insurer.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<DiscountRecord> for NormalizedCollection {
    fn from_iter<I: IntoIterator<Item = DiscountRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a NormalizedCollection {
    type Item = &'a DiscountRecord;
    type IntoIter = std::slice::Iter<'a, DiscountRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
