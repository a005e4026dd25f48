mod bootstrap;
mod render;

use std::process::ExitCode;

use anyhow::Result;
use discount_core::settings::Settings;
use discount_data::aggregator::BandOrdering;
use discount_data::analysis::DashboardView;
use discount_runtime::session::DashboardSession;

/// Exit status for a view with nothing to show.
const EXIT_EMPTY_VIEW: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Clinic discounts v{} starting", env!("CARGO_PKG_VERSION"));

    let source = bootstrap::resolve_source(settings.data.as_ref())?;
    let session = DashboardSession::open(source)?;

    let insurer = settings
        .insurer
        .clone()
        .or_else(|| session.default_insurer())
        .unwrap_or_default();

    if settings.list {
        let selected = (!insurer.is_empty()).then_some(insurer.as_str());
        let options = session.filter_options(&insurer);
        print!(
            "{}",
            render::render_listing(&session.insurers(), selected, &options)
        );
        return Ok(ExitCode::SUCCESS);
    }

    // Each dimension starts fully ticked; an explicit flag replaces that.
    let mut selection = session.default_selection(&insurer);
    if !settings.chi_locations.is_empty() {
        selection = selection.with_chi_locations(settings.chi_locations.iter().cloned());
    }
    if !settings.service_types.is_empty() {
        selection = selection.with_service_types(settings.service_types.iter().cloned());
    }

    let ordering = if settings.numeric_band_order() {
        BandOrdering::NumericRange
    } else {
        BandOrdering::Lexicographic
    };

    let view = session.view(&selection, ordering);

    if settings.format == "json" {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render::render_text(&view));
    }

    match &view {
        DashboardView::Report(_) => Ok(ExitCode::SUCCESS),
        _ => {
            if let Some(message) = render::empty_message(&view) {
                tracing::warn!(insurer = %insurer, "{}", message);
            }
            Ok(ExitCode::from(EXIT_EMPTY_VIEW))
        }
    }
}
