//! Per-kilometre splits and fastest-split selection.

use std::collections::BTreeMap;

use tracker_core::calculations::mean;
use tracker_core::models::{ActivityRecord, KmSplit};

use crate::metrics::Sample;

/// Kilometres skipped at the start of an activity when looking for the
/// fastest split (warm-up).
pub const DEFAULT_SKIP_KM: u32 = 2;

#[derive(Default)]
struct Bucket {
    first: Option<(f64, f64)>,
    last: Option<(f64, f64)>,
    heart_rates: Vec<f64>,
}

/// Bucket cumulative samples by whole kilometre.
///
/// Samples lacking distance or elapsed time are ignored. A bucket spans from
/// the sample before its first one (the previous bucket's last) to its own
/// last sample, so the stretch crossing a kilometre boundary counts towards
/// the later kilometre. Pace is time span over distance span; a bucket that
/// covers no distance gets no pace.
pub fn compute_km_splits(samples: &[Sample]) -> Vec<KmSplit> {
    let mut buckets: BTreeMap<u32, Bucket> = BTreeMap::new();
    let mut previous: Option<(f64, f64)> = None;

    for sample in samples {
        let (Some(distance), Some(elapsed)) = (sample.distance_meters, sample.elapsed_seconds)
        else {
            continue;
        };
        if distance < 0.0 {
            continue;
        }
        let km = (distance / 1000.0).floor() as u32;
        let point = (distance, elapsed);
        let bucket = buckets.entry(km).or_default();
        if bucket.first.is_none() {
            bucket.first = Some(previous.unwrap_or(point));
        }
        bucket.last = Some(point);
        if let Some(hr) = sample.heart_rate {
            bucket.heart_rates.push(hr);
        }
        previous = Some(point);
    }

    buckets
        .into_iter()
        .filter_map(|(km, bucket)| {
            let (d0, t0) = bucket.first?;
            let (d1, t1) = bucket.last?;
            let distance = d1 - d0;
            let duration = t1 - t0;
            let pace = if distance > 0.0 {
                Some(duration / (distance / 1000.0)).filter(|p| p.is_finite())
            } else {
                None
            };
            Some(KmSplit {
                km,
                distance_meters: distance,
                duration_seconds: duration,
                pace_seconds_per_km: pace,
                heart_rate: mean(&bucket.heart_rates),
            })
        })
        .collect()
}

/// Fastest kilometre of one activity.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FastestSplit {
    pub activity_id: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub distance_km: f64,
    pub km: u32,
    pub pace_seconds_per_km: f64,
    pub heart_rate: Option<f64>,
}

/// Fastest split at or beyond `skip_km` with a finite positive pace.
pub fn fastest_split(splits: &[KmSplit], skip_km: u32) -> Option<&KmSplit> {
    splits
        .iter()
        .filter(|s| s.km >= skip_km)
        .filter(|s| matches!(s.pace_seconds_per_km, Some(p) if p.is_finite() && p > 0.0))
        .min_by(|a, b| {
            let pa = a.pace_seconds_per_km.unwrap_or(f64::INFINITY);
            let pb = b.pace_seconds_per_km.unwrap_or(f64::INFINITY);
            pa.total_cmp(&pb)
        })
}

/// Fastest split for every record that has one, in record order.
///
/// Records without a qualifying split are skipped with a warning.
pub fn fastest_splits(records: &[ActivityRecord], skip_km: u32) -> Vec<FastestSplit> {
    records
        .iter()
        .filter_map(|record| {
            let Some(split) = fastest_split(&record.splits, skip_km) else {
                if !record.splits.is_empty() {
                    tracing::warn!("No valid splits found in activity {}", record.id);
                }
                return None;
            };
            Some(FastestSplit {
                activity_id: record.id.clone(),
                start_time: record.start_time,
                distance_km: record.distance_km(),
                km: split.km,
                pace_seconds_per_km: split.pace_seconds_per_km?,
                heart_rate: split.heart_rate,
            })
        })
        .collect()
}
