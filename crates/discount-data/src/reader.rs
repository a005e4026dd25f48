//! Bundle discovery and loading.
//!
//! Turns an insurer export on disk into an [`InputBundle`]:
//!
//! * Excel-family workbooks, one table per worksheet (via calamine);
//! * a single CSV/TSV file, one table named after the file stem;
//! * a directory of CSV/TSV files, searched recursively;
//! * a JSON bundle: `{"sheets": [{"name", "headers", "rows"}]}`.
//!
//! Files are read once into a [`BundleSnapshot`]; the fingerprint the load
//! cache is keyed on and the parsed tables both come from those same bytes.

use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use discount_core::data_processors::CellCoercer;
use discount_core::error::{DashboardError, Result};
use discount_core::models::{CellValue, InputBundle, RawTable};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

// ── BundleFormat ──────────────────────────────────────────────────────────────

/// On-disk layout of an input bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Workbook,
    /// Delimited text; the byte is the field delimiter.
    Delimited(u8),
    DelimitedDirectory,
    Json,
}

impl BundleFormat {
    /// Detect the format from the path's type and extension.
    pub fn detect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DashboardError::BundleNotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Ok(BundleFormat::DelimitedDirectory);
        }
        let ext = extension_of(path);
        match ext.as_deref() {
            Some(e) if WORKBOOK_EXTENSIONS.contains(&e) => Ok(BundleFormat::Workbook),
            Some("csv") => Ok(BundleFormat::Delimited(b',')),
            Some("tsv") => Ok(BundleFormat::Delimited(b'\t')),
            Some("json") => Ok(BundleFormat::Json),
            _ => Err(DashboardError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Stable tag mixed into the fingerprint.
    fn key_tag(self) -> String {
        match self {
            BundleFormat::Workbook => "workbook".to_string(),
            BundleFormat::Delimited(d) => format!("delimited:{}", d),
            BundleFormat::DelimitedDirectory => "delimited-directory".to_string(),
            BundleFormat::Json => "json".to_string(),
        }
    }
}

// ── BundleSnapshot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SnapshotFile {
    path: PathBuf,
    /// Name-derived part of the identity: the relative path of a directory
    /// member, the table name of a single delimited file, empty when the
    /// table names live inside the content.
    identity: String,
    bytes: Vec<u8>,
}

/// The bytes of a bundle, read once.
#[derive(Debug, Clone)]
pub struct BundleSnapshot {
    path: PathBuf,
    format: BundleFormat,
    files: Vec<SnapshotFile>,
}

impl BundleSnapshot {
    /// Detect the format of `path` and read every file it covers.
    pub fn read(path: &Path) -> Result<Self> {
        let format = BundleFormat::detect(path)?;
        let files = match format {
            BundleFormat::DelimitedDirectory => find_delimited_files(path)
                .into_iter()
                .map(|file| {
                    let identity = file
                        .strip_prefix(path)
                        .unwrap_or(&file)
                        .to_string_lossy()
                        .replace('\\', "/");
                    Ok(SnapshotFile {
                        bytes: read_bytes(&file)?,
                        identity,
                        path: file,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            BundleFormat::Delimited(_) => vec![SnapshotFile {
                bytes: read_bytes(path)?,
                identity: table_name(path),
                path: path.to_path_buf(),
            }],
            BundleFormat::Workbook | BundleFormat::Json => vec![SnapshotFile {
                bytes: read_bytes(path)?,
                identity: String::new(),
                path: path.to_path_buf(),
            }],
        };
        Ok(Self {
            path: path.to_path_buf(),
            format,
            files,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> BundleFormat {
        self.format
    }

    /// SHA-256 over the format, every name that becomes a table name, and the
    /// bytes. Where the path a bundle was found at does not feed a table
    /// name (workbooks, JSON bundles), it does not feed the key either.
    pub fn fingerprint(&self) -> BundleFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.format.key_tag().as_bytes());
        hasher.update([0u8]);
        for file in &self.files {
            hasher.update(file.identity.as_bytes());
            hasher.update([0u8]);
            hasher.update(&file.bytes);
            hasher.update([0u8]);
        }
        BundleFingerprint(format!("sha256:{:x}", hasher.finalize()))
    }

    /// Parse the snapshot into tables.
    pub fn parse(&self) -> Result<InputBundle> {
        let bundle = match self.format {
            BundleFormat::Workbook => parse_workbook(&self.path, &self.files[0].bytes)?,
            BundleFormat::Json => parse_json_slice(&self.files[0].bytes)?,
            BundleFormat::Delimited(delimiter) => {
                let file = &self.files[0];
                let mut bundle = InputBundle::new();
                bundle.insert(
                    file.identity.clone(),
                    parse_delimited(&file.path, &file.bytes, delimiter)?,
                );
                bundle
            }
            BundleFormat::DelimitedDirectory => self.parse_directory()?,
        };
        debug!(path = %self.path.display(), tables = bundle.len(), "bundle read");
        Ok(bundle)
    }

    /// One table per file stem, in path order. A repeated stem keeps the
    /// first file and warns.
    fn parse_directory(&self) -> Result<InputBundle> {
        let mut bundle = InputBundle::new();
        let mut seen: HashSet<String> = HashSet::new();

        for file in &self.files {
            let name = table_name(&file.path);
            if !seen.insert(name.clone()) {
                warn!(file = %file.path.display(), table = %name, "duplicate table name; file ignored");
                continue;
            }
            let delimiter = if extension_of(&file.path).as_deref() == Some("tsv") {
                b'\t'
            } else {
                b','
            };
            bundle.insert(name, parse_delimited(&file.path, &file.bytes, delimiter)?);
        }

        Ok(bundle)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read the bundle at `path`, whatever its format.
pub fn read_bundle(path: &Path) -> Result<InputBundle> {
    BundleSnapshot::read(path)?.parse()
}

/// Fingerprint the bundle at `path`.
pub fn fingerprint_bundle(path: &Path) -> Result<BundleFingerprint> {
    Ok(BundleSnapshot::read(path)?.fingerprint())
}

/// Find all `.csv` / `.tsv` files recursively under `dir`, sorted by path.
pub fn find_delimited_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Bundle directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && matches!(extension_of(entry.path()).as_deref(), Some("csv" | "tsv"))
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Parse a JSON bundle document.
pub fn parse_json_bundle(content: &str) -> Result<InputBundle> {
    parse_json_slice(content.as_bytes())
}

// ── Fingerprint ───────────────────────────────────────────────────────────────

/// Cache key of a bundle, rendered as `sha256:<64 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleFingerprint(String);

impl BundleFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Every worksheet of a workbook; the first row of each sheet holds the
/// headers.
fn parse_workbook(path: &Path, bytes: &[u8]) -> Result<InputBundle> {
    let workbook_err = |e: calamine::Error| DashboardError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(workbook_err)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let mut bundle = InputBundle::new();
    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(workbook_err)?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(idx, cell)| header_text(idx, cell))
                .collect(),
            None => Vec::new(),
        };
        let data: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        debug!(sheet = %sheet_name, columns = headers.len(), rows = data.len(), "sheet read");
        bundle.insert(sheet_name.clone(), RawTable::new(headers, data));
    }

    Ok(bundle)
}

/// One delimited text table; the first record holds the headers.
fn parse_delimited(path: &Path, bytes: &[u8], delimiter: u8) -> Result<RawTable> {
    let csv_err = |e: csv::Error| DashboardError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .map(|(idx, h)| unnamed_if_blank(idx, h.to_string()))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawTable::new(headers, rows))
}

#[derive(Debug, Deserialize)]
struct JsonBundle {
    sheets: Vec<JsonSheet>,
}

#[derive(Debug, Deserialize)]
struct JsonSheet {
    name: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

fn parse_json_slice(bytes: &[u8]) -> Result<InputBundle> {
    let doc: JsonBundle = serde_json::from_slice(bytes)?;
    Ok(doc
        .sheets
        .into_iter()
        .map(|sheet| {
            let rows = sheet
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(CellValue::from).collect())
                .collect();
            (sheet.name, RawTable::new(sheet.headers, rows))
        })
        .collect())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Blank headers get a positional placeholder that no matching rule hits.
fn unnamed_if_blank(idx: usize, header: String) -> String {
    if header.trim().is_empty() {
        format!("Unnamed: {idx}")
    } else {
        header
    }
}

/// Header cells render like labels, so a numeric header reads "2024".
fn header_text(idx: usize, cell: &Data) -> String {
    let text = CellCoercer::to_label(&cell_from_data(cell)).unwrap_or_default();
    unnamed_if_blank(idx, text)
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Error cells keep their spreadsheet text (e.g. "#DIV/0!") so they
        // fail numeric coercion like any other non-number.
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
