//! Fixture writers shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tracker_data::fit::crc16;

/// Seconds between the Unix epoch and 2024-11-20T14:19:54Z, in FIT time.
pub const FIT_START: u32 = 1_732_112_394 - 631_065_600;

/// Write a single-session FIT file with the given totals.
///
/// `heart_rate` of `None` writes the FIT invalid marker.
pub fn write_session_fit(
    dir: &Path,
    name: &str,
    start: u32,
    duration_seconds: u32,
    distance_meters: u32,
    heart_rate: Option<u8>,
) -> PathBuf {
    let mut data = Vec::new();
    // Definition: local 0, little-endian, global 18 (session), 5 fields.
    data.extend_from_slice(&[0x40, 0, 0, 18, 0, 5]);
    data.extend_from_slice(&[2, 4, 0x86]); // start_time
    data.extend_from_slice(&[5, 1, 0x00]); // sport
    data.extend_from_slice(&[8, 4, 0x86]); // total_timer_time
    data.extend_from_slice(&[9, 4, 0x86]); // total_distance
    data.extend_from_slice(&[16, 1, 0x02]); // avg_heart_rate
    // Data message.
    data.push(0);
    data.extend_from_slice(&start.to_le_bytes());
    data.push(1);
    data.extend_from_slice(&(duration_seconds * 1000).to_le_bytes());
    data.extend_from_slice(&(distance_meters * 100).to_le_bytes());
    data.push(heart_rate.unwrap_or(0xFF));

    let path = dir.join(name);
    std::fs::write(&path, finish_fit(&data)).unwrap();
    path
}

/// Wrap record bytes with a 14-byte header and the trailing file CRC.
pub fn finish_fit(data: &[u8]) -> Vec<u8> {
    let mut out = vec![14u8, 0x20, 0x54, 0x08];
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(b".FIT");
    let header_crc = crc16(0, &out);
    out.extend_from_slice(&header_crc.to_le_bytes());
    out.extend_from_slice(data);
    let crc = crc16(0, &out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Summary JSON in the shape the Garmin Connect API returns.
pub fn summary_json(
    type_key: &str,
    start: &str,
    duration: f64,
    distance: f64,
    heart_rate: Option<f64>,
) -> serde_json::Value {
    let mut dto = serde_json::json!({
        "startTimeGMT": start,
        "duration": duration,
        "distance": distance,
        "averageSpeed": if duration > 0.0 { distance / duration } else { 0.0 },
    });
    if let Some(hr) = heart_rate {
        dto["averageHR"] = serde_json::json!(hr);
        dto["maxHR"] = serde_json::json!(hr + 15.0);
    }
    serde_json::json!({
        "activityName": format!("{} activity", type_key),
        "activityTypeDTO": {"typeKey": type_key},
        "summaryDTO": dto,
    })
}

/// Details JSON with one sample every 100 m at a constant `pace` (s/km).
pub fn details_json(distance: f64, pace: f64, heart_rate: f64) -> serde_json::Value {
    let steps = (distance / 100.0) as usize;
    let rows: Vec<serde_json::Value> = (0..=steps)
        .map(|i| {
            let d = i as f64 * 100.0;
            serde_json::json!({"metrics": [d, d / 1000.0 * pace, heart_rate]})
        })
        .collect();
    serde_json::json!({
        "metricDescriptors": [
            {"metricsIndex": 0, "key": "sumDistance"},
            {"metricsIndex": 1, "key": "sumDuration"},
            {"metricsIndex": 2, "key": "directHeartRate"}
        ],
        "activityDetailMetrics": rows,
    })
}
