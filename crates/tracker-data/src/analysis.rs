//! Scan-and-extract pipeline for Pace Tracker.
//!
//! Lists an activities directory, extracts every activity found, and returns
//! an [`ExtractionReport`] holding the records in start-time order plus one
//! [`ExtractionFailure`] per activity that could not be extracted.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};
use tracker_core::error::{DirectoryError, ExtractionError};
use tracker_core::models::{ActivityRecord, SportFilter};

use crate::extractor::extract;
use crate::scanner::DirectoryScanner;

// ── Public types ──────────────────────────────────────────────────────────────

/// One activity that could not be turned into a record.
#[derive(Debug)]
pub struct ExtractionFailure {
    pub id: String,
    pub error: ExtractionError,
}

/// Metadata produced alongside the extraction report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    /// Number of activity groups found by the scan.
    pub groups_found: usize,
    /// Records built successfully (before any sport filter).
    pub records_extracted: usize,
    /// Records dropped by the sport filter.
    pub records_filtered: usize,
    pub failures: usize,
    /// Wall-clock seconds spent on the whole pass.
    pub elapsed_seconds: f64,
}

/// The complete output of one extraction pass.
#[derive(Debug)]
pub struct ExtractionReport {
    /// Records in ascending start-time order.
    pub records: Vec<ActivityRecord>,
    pub failures: Vec<ExtractionFailure>,
    pub metadata: ReportMetadata,
}

impl ExtractionReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Knobs for [`analyze_directory`].
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub sport: SportFilter,
    /// Treat a missing directory as empty.
    pub allow_missing: bool,
    /// Keep records no source gave a sport, whatever `sport` says.
    pub keep_untyped: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sport: SportFilter::All,
            allow_missing: false,
            keep_untyped: false,
        }
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Extract every activity in `root`.
///
/// Only directory-level problems are returned as errors; per-activity
/// problems end up in [`ExtractionReport::failures`].
pub fn extract_all(root: &Path) -> Result<ExtractionReport, DirectoryError> {
    analyze_directory(root, AnalysisOptions::default())
}

/// Run the full pipeline.
///
/// 1. Scan and group the files in `root`.
/// 2. Extract each group, collecting failures.
/// 3. Drop records that do not match `options.sport` (untyped records stay
///    when `options.keep_untyped` is set).
/// 4. Sort by start time.
pub fn analyze_directory(
    root: &Path,
    options: AnalysisOptions,
) -> Result<ExtractionReport, DirectoryError> {
    let started = std::time::Instant::now();

    // ── Step 1: Scan ──────────────────────────────────────────────────────────
    let groups = DirectoryScanner::new(root)
        .allow_missing(options.allow_missing)
        .scan()?;
    let groups_found = groups.len();

    // ── Step 2: Extract ───────────────────────────────────────────────────────
    let mut records: Vec<ActivityRecord> = Vec::with_capacity(groups_found);
    let mut failures: Vec<ExtractionFailure> = Vec::new();
    for group in groups {
        match extract(&group) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!("Error processing activity {}: {}", group.id, error);
                failures.push(ExtractionFailure {
                    id: group.id,
                    error,
                });
            }
        }
    }
    let records_extracted = records.len();

    // ── Step 3: Filter ────────────────────────────────────────────────────────
    records.retain(|r| {
        options.sport.matches(&r.activity_type)
            || (options.keep_untyped && r.activity_type.is_unknown())
    });
    let records_filtered = records_extracted - records.len();

    // ── Step 4: Order ─────────────────────────────────────────────────────────
    records.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    info!(
        "Found {} {} activities ({} failed) in {}",
        records.len(),
        options.sport,
        failures.len(),
        root.display()
    );

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        groups_found,
        records_extracted,
        records_filtered,
        failures: failures.len(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
    };

    Ok(ExtractionReport {
        records,
        failures,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
