//! Garmin Connect JSON exports: `*_summary.json` and `*_details.json`.
//!
//! Both documents are navigated as [`serde_json::Value`]; Garmin adds and
//! renames keys between API versions, so every field is optional.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use tracker_core::error::ExtractionError;
use tracker_core::models::ActivityType;
use tracker_core::time_utils::parse_json_timestamp;

use crate::metrics::{PartialMetrics, Sample};

/// Read `path` and parse it as JSON. The file is closed before returning.
pub fn read_json(path: &Path) -> Result<Value, ExtractionError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExtractionError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ExtractionError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Pull the activity summary out of a `*_summary.json` document.
///
/// Summary values live under `summaryDTO` in current exports and at the top
/// level in older ones; both are looked at, `summaryDTO` first.
pub fn parse_summary(data: &Value) -> PartialMetrics {
    let dto = data.get("summaryDTO");
    let lookup = |key: &str| dto.and_then(|d| d.get(key)).or_else(|| data.get(key));

    let activity_type = data
        .get("activityTypeDTO")
        .or_else(|| data.get("activityType"))
        .and_then(|t| t.get("typeKey"))
        .and_then(Value::as_str)
        .map(ActivityType::from_type_key);

    let start_time = ["startTimeGMT", "beginTimestamp"]
        .iter()
        .find_map(|&key| lookup(key).and_then(parse_json_timestamp));

    let distance_meters = number(lookup("distance"));
    let average_speed = number(lookup("averageSpeed")).filter(|s| *s > 0.0);
    let duration_seconds = number(lookup("duration"))
        .or_else(|| number(lookup("movingDuration")))
        .or_else(|| Some(distance_meters? / average_speed?));

    PartialMetrics {
        name: data
            .get("activityName")
            .and_then(Value::as_str)
            .map(str::to_string),
        activity_type,
        start_time,
        duration_seconds,
        distance_meters,
        average_heart_rate: number(lookup("averageHR")),
        max_heart_rate: number(lookup("maxHR")),
        samples: Vec::new(),
    }
}

/// Read and parse a summary file.
pub fn read_summary_file(path: &Path) -> Result<PartialMetrics, ExtractionError> {
    let data = read_json(path)?;
    let metrics = parse_summary(&data);
    debug!(
        "Summary {}: duration={:?} distance={:?}",
        path.display(),
        metrics.duration_seconds,
        metrics.distance_meters
    );
    Ok(metrics)
}

// ── Details ───────────────────────────────────────────────────────────────────

/// Turn a `*_details.json` document into a sample series.
///
/// `metricDescriptors` maps each metric key onto a column of the
/// `activityDetailMetrics[].metrics` rows. Keys missing from the descriptors
/// leave the corresponding sample field unset.
pub fn parse_details(data: &Value) -> PartialMetrics {
    let columns: HashMap<&str, usize> = data
        .get("metricDescriptors")
        .and_then(Value::as_array)
        .map(|descriptors| {
            descriptors
                .iter()
                .filter_map(|d| {
                    let key = d.get("key")?.as_str()?;
                    let index = usize::try_from(d.get("metricsIndex")?.as_u64()?).ok()?;
                    Some((key, index))
                })
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<&Vec<Value>> = data
        .get("activityDetailMetrics")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("metrics").and_then(Value::as_array))
                .collect()
        })
        .unwrap_or_default();

    let samples: Vec<Sample> = rows
        .iter()
        .map(|&row| Sample {
            elapsed_seconds: number(cell(row, &columns, "sumDuration")),
            distance_meters: number(cell(row, &columns, "sumDistance")),
            heart_rate: number(cell(row, &columns, "directHeartRate")),
        })
        .collect();

    let start_time = rows.iter().find_map(|&row| {
        cell(row, &columns, "directTimestamp").and_then(parse_json_timestamp)
    });

    let mut metrics = PartialMetrics {
        start_time,
        samples,
        ..Default::default()
    };
    metrics.fill_from_samples();
    metrics
}

fn cell<'a>(row: &'a [Value], columns: &HashMap<&str, usize>, key: &str) -> Option<&'a Value> {
    columns.get(key).and_then(|&i| row.get(i))
}

/// Read and parse a details file.
pub fn read_details_file(path: &Path) -> Result<PartialMetrics, ExtractionError> {
    let data = read_json(path)?;
    let metrics = parse_details(&data);
    debug!("Details {}: {} samples", path.display(), metrics.samples.len());
    Ok(metrics)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn details_doc() -> Value {
        json!({
            "metricDescriptors": [
                {"metricsIndex": 0, "key": "directTimestamp"},
                {"metricsIndex": 1, "key": "sumDistance"},
                {"metricsIndex": 2, "key": "sumDuration"},
                {"metricsIndex": 3, "key": "directHeartRate"}
            ],
            "activityDetailMetrics": [
                {"metrics": [1732112394000.0, 0.0, 0.0, 110.0]},
                {"metrics": [1732112694000.0, 1000.0, 300.0, null]},
                {"metrics": [1732112994000.0, 2000.0, 600.0, 150.0]}
            ]
        })
    }

    #[test]
    fn test_parse_summary_dto() {
        let doc = json!({
            "activityName": "Lunch Run",
            "activityTypeDTO": {"typeKey": "running"},
            "summaryDTO": {
                "startTimeGMT": "2024-11-20T14:19:54.0",
                "duration": 1800.0,
                "distance": 5000.0,
                "averageSpeed": 2.77,
                "averageHR": 152.0,
                "maxHR": 171.0
            }
        });
        let m = parse_summary(&doc);
        assert_eq!(m.name.as_deref(), Some("Lunch Run"));
        assert_eq!(m.activity_type, Some(ActivityType::Running));
        assert_eq!(m.start_time, Some(Utc.with_ymd_and_hms(2024, 11, 20, 14, 19, 54).unwrap()));
        assert_eq!(m.duration_seconds, Some(1800.0));
        assert_eq!(m.distance_meters, Some(5000.0));
        assert_eq!(m.average_heart_rate, Some(152.0));
        assert_eq!(m.max_heart_rate, Some(171.0));
    }

    #[test]
    fn test_parse_summary_top_level_fallback() {
        let doc = json!({
            "activityType": {"typeKey": "road_biking"},
            "startTimeGMT": "2024-11-20 14:19:54",
            "distance": 20000.0,
            "averageSpeed": 8.0
        });
        let m = parse_summary(&doc);
        assert_eq!(m.activity_type, Some(ActivityType::Cycling));
        assert!(m.start_time.is_some());
        // Duration recovered from distance / speed.
        assert_eq!(m.duration_seconds, Some(2500.0));
        assert!(m.average_heart_rate.is_none());
    }

    #[test]
    fn test_parse_summary_without_heart_rate() {
        let doc = json!({"summaryDTO": {"duration": 60.0, "averageHR": null}});
        let m = parse_summary(&doc);
        assert!(m.average_heart_rate.is_none());
        assert!(m.start_time.is_none());
    }

    #[test]
    fn test_parse_details() {
        let m = parse_details(&details_doc());
        assert_eq!(m.samples.len(), 3);
        assert_eq!(m.samples[1].heart_rate, None);
        assert_eq!(m.duration_seconds, Some(600.0));
        assert_eq!(m.distance_meters, Some(2000.0));
        assert_eq!(m.average_heart_rate, Some(130.0));
        assert_eq!(m.max_heart_rate, Some(150.0));
        assert_eq!(
            m.start_time,
            chrono::DateTime::from_timestamp_millis(1_732_112_394_000)
        );
    }

    #[test]
    fn test_parse_details_without_descriptors() {
        let m = parse_details(&json!({"activityDetailMetrics": [{"metrics": [1.0]}]}));
        assert_eq!(m.samples.len(), 1);
        assert!(m.duration_seconds.is_none());
        assert!(m.start_time.is_none());
    }

    #[test]
    fn test_read_json_errors() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("1_summary.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            read_summary_file(&bad),
            Err(ExtractionError::JsonParse { .. })
        ));
        assert!(matches!(
            read_details_file(&dir.path().join("missing_details.json")),
            Err(ExtractionError::FileRead { .. })
        ));
    }

    #[test]
    fn test_read_details_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("1_details.json");
        std::fs::write(&path, serde_json::to_string(&details_doc()).unwrap()).unwrap();
        let m = read_details_file(&path).unwrap();
        assert_eq!(m.samples.len(), 3);
    }
}
