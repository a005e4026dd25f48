use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use discount_core::error::DashboardError;
use discount_runtime::data_manager::BundleSource;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name of the dataset shipped alongside the dashboard.
pub const DEFAULT_DATASET_NAME: &str = "Doctor list_with_Dashboard.xlsx";

// ── Directory bootstrap ────────────────────────────────────────────────────────

fn app_dir_in(home: &Path) -> PathBuf {
    home.join(".clinic-discounts")
}

/// Ensure `~/.clinic-discounts/` and its `logs/` subdirectory exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let app_dir = app_dir_in(&home);
    std::fs::create_dir_all(&app_dir)?;
    std::fs::create_dir_all(app_dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a Python-style level name to a tracing filter directive.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or is appended to `log_file` (without ANSI colours)
/// when one is given. Falls back to `"warn"` if the level is not recognised.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

// ── Dataset discovery ──────────────────────────────────────────────────────────

/// Locate the default dataset.
///
/// Checks the working directory first, then `~/.clinic-discounts/`.
fn discover_default_dataset_in(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut candidates = vec![cwd.join(DEFAULT_DATASET_NAME)];
    if let Some(home) = home {
        candidates.push(app_dir_in(home).join(DEFAULT_DATASET_NAME));
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// Turn `--data` (or its absence) into a [`BundleSource`].
pub fn resolve_source(data: Option<&PathBuf>) -> anyhow::Result<BundleSource> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    resolve_source_in(data, &cwd, dirs::home_dir().as_deref())
}

fn resolve_source_in(
    data: Option<&PathBuf>,
    cwd: &Path,
    home: Option<&Path>,
) -> anyhow::Result<BundleSource> {
    if let Some(path) = data {
        return Ok(BundleSource::Upload(path.clone()));
    }
    match discover_default_dataset_in(cwd, home) {
        Some(path) => Ok(BundleSource::Default(path)),
        None => Err(DashboardError::Config(format!(
            "no --data given and \"{}\" not found in the working directory or ~/.clinic-discounts/",
            DEFAULT_DATASET_NAME
        ))
        .into()),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
