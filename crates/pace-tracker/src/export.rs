//! JSON export consumed by the external plotting step.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracker_core::models::{ActivityRecord, ActivityType};
use tracker_data::analysis::{ExtractionReport, ReportMetadata};
use tracker_data::splits::{fastest_splits, FastestSplit};
use tracker_data::stats::{
    heart_rate_statistics, heart_rate_trend, pace_statistics, pace_trend, rolling_heart_rate,
    rolling_pace, HeartRateStatistics, PaceStatistics, RollingSeries, TrendSummary,
};

/// One row of the activity table.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub start_time: DateTime<Utc>,
    pub id: String,
    pub name: Option<String>,
    pub activity_type: ActivityType,
    pub distance_km: f64,
    pub duration_seconds: f64,
    pub pace_seconds_per_km: Option<f64>,
    pub speed_m_s: Option<f64>,
    pub heart_rate: Option<f64>,
}

impl From<&ActivityRecord> for ExportRow {
    fn from(r: &ActivityRecord) -> Self {
        Self {
            start_time: r.start_time,
            id: r.id.clone(),
            name: r.name.clone(),
            activity_type: r.activity_type.clone(),
            distance_km: r.distance_km(),
            duration_seconds: r.duration_seconds,
            pace_seconds_per_km: r.average_pace,
            speed_m_s: r.average_speed,
            heart_rate: r.average_heart_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportFailure {
    pub id: String,
    pub error: String,
}

/// Everything the plotter draws from.
#[derive(Debug, Serialize)]
pub struct PlotExport {
    pub metadata: ReportMetadata,
    pub timezone: String,
    pub activities: Vec<ExportRow>,
    pub pace_statistics: Option<PaceStatistics>,
    pub heart_rate_statistics: Option<HeartRateStatistics>,
    pub pace_trend: Option<TrendSummary>,
    pub heart_rate_trend: Option<TrendSummary>,
    pub rolling_pace: RollingSeries,
    pub rolling_heart_rate: RollingSeries,
    pub fastest_splits: Vec<FastestSplit>,
    pub failures: Vec<ExportFailure>,
}

impl PlotExport {
    pub fn build(report: &ExtractionReport, timezone: &str, window: usize, skip_km: u32) -> Self {
        let records = &report.records;
        Self {
            metadata: report.metadata.clone(),
            timezone: timezone.to_string(),
            activities: records.iter().map(ExportRow::from).collect(),
            pace_statistics: pace_statistics(records),
            heart_rate_statistics: heart_rate_statistics(records),
            pace_trend: pace_trend(records),
            heart_rate_trend: heart_rate_trend(records),
            rolling_pace: rolling_pace(records, window),
            rolling_heart_rate: rolling_heart_rate(records, window),
            fastest_splits: fastest_splits(records, skip_km),
            failures: report
                .failures
                .iter()
                .map(|f| ExportFailure {
                    id: f.id.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    /// Write pretty-printed JSON to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
