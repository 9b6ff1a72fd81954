mod bootstrap;
mod export;
mod report;

use std::io::Write;

use anyhow::Result;
use tracker_core::error::TrackerError;
use tracker_core::settings::Settings;
use tracker_core::time_utils::TimezoneHandler;
use tracker_data::analysis::{analyze_directory, AnalysisOptions};

use crate::export::PlotExport;
use crate::report::{ReportContext, ReportKind};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Pace Tracker v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Sport: {}, Report: {}, Timezone: {}",
        settings.sport,
        settings.report,
        settings.timezone
    );

    let activities_dir = bootstrap::discover_activities_dir(settings.activities_dir.as_deref());
    tracing::info!("Reading activities from {}", activities_dir.display());

    let kind = ReportKind::parse(&settings.report)
        .ok_or_else(|| TrackerError::Config(format!("Unknown report: {}", settings.report)))?;

    // Details-only downloads carry no sport; the splits report still wants them.
    let sport = settings.sport_filter();
    let options = AnalysisOptions {
        sport,
        allow_missing: false,
        keep_untyped: !settings.list && kind == ReportKind::Splits,
    };
    let analysis = analyze_directory(&activities_dir, options).map_err(TrackerError::from)?;

    if analysis.records.is_empty() {
        return Err(TrackerError::NoActivities(sport.to_string()).into());
    }

    let tz = TimezoneHandler::new(&settings.timezone);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if settings.list {
        report::write_list(&mut out, &analysis.records, &tz)?;
    } else {
        let ctx = ReportContext {
            tz: &tz,
            window: settings.window as usize,
            skip_km: settings.skip_km,
        };
        report::write_report(&mut out, kind, &analysis.records, &ctx)?;
    }

    if !analysis.failures.is_empty() {
        writeln!(
            out,
            "\n{} activities could not be read (see log for details)",
            analysis.failures.len()
        )?;
    }
    out.flush()?;

    if let Some(path) = &settings.output {
        let export = PlotExport::build(
            &analysis,
            &settings.timezone,
            settings.window as usize,
            settings.skip_km,
        );
        export.write_to(path)?;
        tracing::info!("Wrote plot data to {}", path.display());
    }

    Ok(())
}
