//! Summary statistics, trend lines and rolling averages over a record set.
//!
//! Paces are in seconds per kilometre throughout; formatting for display is
//! left to `tracker_core::formatting`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracker_core::calculations::{
    centered_rolling_mean, mean, min_max, rolling_mean, std_dev, Trend,
};
use tracker_core::models::ActivityRecord;

/// Rolling window used when none is configured.
pub const DEFAULT_WINDOW: usize = 5;

// ── Statistics ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaceStatistics {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Fastest (lowest) pace.
    pub best: f64,
    /// Slowest (highest) pace.
    pub worst: f64,
    pub range: f64,
    pub first_date: DateTime<Utc>,
    pub last_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartRateStatistics {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Records without a heart rate.
    pub missing: usize,
}

/// Records that have a pace, paired with it.
fn paced(records: &[ActivityRecord]) -> Vec<(DateTime<Utc>, f64)> {
    records
        .iter()
        .filter_map(|r| Some((r.start_time, r.average_pace?)))
        .collect()
}

fn hearted(records: &[ActivityRecord]) -> Vec<(DateTime<Utc>, f64)> {
    records
        .iter()
        .filter_map(|r| Some((r.start_time, r.average_heart_rate?)))
        .collect()
}

/// `None` when no record has a pace.
pub fn pace_statistics(records: &[ActivityRecord]) -> Option<PaceStatistics> {
    let points = paced(records);
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let (best, worst) = min_max(&values)?;
    Some(PaceStatistics {
        count: values.len(),
        mean: mean(&values)?,
        std_dev: std_dev(&values)?,
        best,
        worst,
        range: worst - best,
        first_date: points.iter().map(|(t, _)| *t).min()?,
        last_date: points.iter().map(|(t, _)| *t).max()?,
    })
}

/// `None` when no record has a heart rate.
pub fn heart_rate_statistics(records: &[ActivityRecord]) -> Option<HeartRateStatistics> {
    let values: Vec<f64> = hearted(records).into_iter().map(|(_, v)| v).collect();
    let (min, max) = min_max(&values)?;
    Some(HeartRateStatistics {
        count: values.len(),
        mean: mean(&values)?,
        std_dev: std_dev(&values)?,
        min,
        max,
        range: max - min,
        missing: records.len() - values.len(),
    })
}

// ── Trends ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Increasing,
    Decreasing,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    /// Change per day, in the metric's unit.
    pub per_day: f64,
    pub direction: TrendDirection,
    /// Dates the fit was computed over.
    pub dates: Vec<DateTime<Utc>>,
    /// Fitted value at each date.
    pub fitted: Vec<f64>,
}

fn trend_over(
    points: &[(DateTime<Utc>, f64)],
    direction: impl Fn(f64) -> TrendDirection,
) -> Option<TrendSummary> {
    let dates: Vec<DateTime<Utc>> = points.iter().map(|(t, _)| *t).collect();
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let Trend { per_day, fitted } = Trend::fit(&dates, &values)?;
    Some(TrendSummary {
        per_day,
        direction: direction(per_day),
        dates,
        fitted,
    })
}

/// Pace trend in seconds per km per day. A falling pace is an improvement.
pub fn pace_trend(records: &[ActivityRecord]) -> Option<TrendSummary> {
    trend_over(&paced(records), |slope| {
        if slope < 0.0 {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        }
    })
}

/// Heart-rate trend in bpm per day.
pub fn heart_rate_trend(records: &[ActivityRecord]) -> Option<TrendSummary> {
    trend_over(&hearted(records), |slope| {
        if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    })
}

// ── Rolling averages ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RollingSeries {
    pub window: usize,
    pub dates: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
    /// Trailing mean, at least one observation per window.
    pub trailing: Vec<f64>,
    /// Centered mean; absent where the full window does not fit.
    pub centered: Vec<Option<f64>>,
}

fn rolling_over(points: &[(DateTime<Utc>, f64)], window: usize) -> RollingSeries {
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    RollingSeries {
        window,
        dates: points.iter().map(|(t, _)| *t).collect(),
        trailing: rolling_mean(&values, window),
        centered: centered_rolling_mean(&values, window),
        values,
    }
}

/// Rolling pace over records with a pace, in record order.
pub fn rolling_pace(records: &[ActivityRecord], window: usize) -> RollingSeries {
    rolling_over(&paced(records), window)
}

pub fn rolling_heart_rate(records: &[ActivityRecord], window: usize) -> RollingSeries {
    rolling_over(&hearted(records), window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tracker_core::models::ActivityType;

    fn records(paces: &[(f64, Option<f64>)]) -> Vec<ActivityRecord> {
        let day0 = Utc.with_ymd_and_hms(2024, 11, 1, 7, 0, 0).unwrap();
        paces
            .iter()
            .enumerate()
            .map(|(i, &(pace, hr))| {
                // 5 km at `pace` seconds per km.
                let mut r = ActivityRecord::new(
                    i.to_string(),
                    ActivityType::Running,
                    day0 + Duration::days(i as i64),
                    pace * 5.0,
                    5000.0,
                );
                r.average_heart_rate = hr;
                r
            })
            .collect()
    }

    #[test]
    fn test_pace_statistics() {
        let recs = records(&[(300.0, Some(150.0)), (360.0, None), (330.0, Some(160.0))]);
        let stats = pace_statistics(&recs).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 330.0).abs() < 1e-9);
        assert!((stats.std_dev - 600.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(stats.best, 300.0);
        assert_eq!(stats.worst, 360.0);
        assert_eq!(stats.range, 60.0);
        assert_eq!(stats.first_date, recs[0].start_time);
        assert_eq!(stats.last_date, recs[2].start_time);
    }

    #[test]
    fn test_pace_statistics_ignores_records_without_pace() {
        let start = Utc.with_ymd_and_hms(2024, 11, 1, 7, 0, 0).unwrap();
        let idle = ActivityRecord::new("x", ActivityType::Running, start, 600.0, 0.0);
        assert!(pace_statistics(&[idle.clone()]).is_none());

        let mut recs = records(&[(300.0, None)]);
        recs.push(idle);
        assert_eq!(pace_statistics(&recs).unwrap().count, 1);
    }

    #[test]
    fn test_heart_rate_statistics() {
        let recs = records(&[(300.0, Some(150.0)), (360.0, None), (330.0, Some(160.0))]);
        let stats = heart_rate_statistics(&recs).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 155.0);
        assert_eq!(stats.std_dev, 5.0);
        assert_eq!(stats.range, 10.0);
        assert_eq!(stats.missing, 1);

        assert!(heart_rate_statistics(&records(&[(300.0, None)])).is_none());
    }

    #[test]
    fn test_pace_trend_improving() {
        let recs = records(&[(360.0, None), (350.0, None), (340.0, None)]);
        let trend = pace_trend(&recs).unwrap();
        assert!((trend.per_day + 10.0).abs() < 1e-6);
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.fitted.len(), 3);
    }

    #[test]
    fn test_heart_rate_trend() {
        let recs = records(&[(300.0, Some(150.0)), (300.0, Some(152.0)), (300.0, None)]);
        let trend = heart_rate_trend(&recs).unwrap();
        assert!((trend.per_day - 2.0).abs() < 1e-6);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.dates.len(), 2);
    }

    #[test]
    fn test_trend_needs_two_points() {
        assert!(pace_trend(&records(&[(300.0, None)])).is_none());
        assert!(heart_rate_trend(&[]).is_none());
    }

    #[test]
    fn test_rolling_pace() {
        let recs = records(&[(300.0, None), (330.0, None), (360.0, None)]);
        let rolling = rolling_pace(&recs, 2);
        assert_eq!(rolling.trailing, vec![300.0, 315.0, 345.0]);
        assert_eq!(rolling.centered.len(), 3);
        assert_eq!(rolling.dates.len(), 3);
    }
}
