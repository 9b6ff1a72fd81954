//! Turns one [`ActivityFileGroup`] into a normalised [`ActivityRecord`].

use std::path::PathBuf;

use tracing::debug;
use tracker_core::error::ExtractionError;
use tracker_core::models::{
    ActivityFile, ActivityFileGroup, ActivityRecord, ActivityType, FileFormat, FileRole,
};

use crate::fit::read_fit_file;
use crate::garmin_json::{read_details_file, read_summary_file};
use crate::metrics::PartialMetrics;
use crate::splits::compute_km_splits;

/// Preference rank of a file; lower ranks win when sources disagree.
fn source_rank(file: &ActivityFile) -> u8 {
    match (file.format, file.role) {
        (FileFormat::Json, FileRole::Details) => 2,
        (FileFormat::Json, _) => 0,
        (FileFormat::Fit, _) => 1,
    }
}

fn read_source(file: &ActivityFile) -> Result<PartialMetrics, ExtractionError> {
    match (file.format, file.role) {
        (FileFormat::Fit, _) => read_fit_file(&file.path),
        (FileFormat::Json, FileRole::Details) => read_details_file(&file.path),
        (FileFormat::Json, _) => read_summary_file(&file.path),
    }
}

/// Extract one activity.
///
/// Every member file is read in preference order (summary JSON, FIT,
/// details JSON) and merged field by field; the filename timestamp is the
/// last resort for the start time. Any unreadable or corrupt member fails
/// the whole activity.
pub fn extract(group: &ActivityFileGroup) -> Result<ActivityRecord, ExtractionError> {
    if group.is_empty() {
        return Err(ExtractionError::NoUsableFiles(group.id.clone()));
    }

    let mut files: Vec<&ActivityFile> = group.files.iter().collect();
    files.sort_by_key(|f| source_rank(f));

    let mut merged = PartialMetrics::default();
    let mut sources: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files {
        let partial = read_source(file)?;
        debug!("Read {} for activity {}", file.path.display(), group.id);
        merged.merge(partial);
        sources.push(file.path.clone());
    }
    merged.fill_from_samples();

    let start_time = merged
        .start_time
        .or(group.filename_timestamp)
        .ok_or_else(|| ExtractionError::MissingField {
            id: group.id.clone(),
            field: "start_time",
        })?;
    let duration = merged
        .duration_seconds
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ExtractionError::MissingField {
            id: group.id.clone(),
            field: "duration",
        })?;
    let distance = merged
        .distance_meters
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let activity_type = merged
        .activity_type
        .unwrap_or_else(ActivityType::unknown);

    let mut record = ActivityRecord::new(
        group.id.clone(),
        activity_type,
        start_time,
        duration,
        distance,
    );
    record.name = merged.name;
    record.average_heart_rate = merged.average_heart_rate;
    record.max_heart_rate = merged.max_heart_rate;
    record.splits = compute_km_splits(&merged.samples);
    record.sources = sources;
    Ok(record)
}
