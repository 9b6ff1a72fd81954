//! Partial activity metrics as recovered from a single source file.
//!
//! Every parser produces a [`PartialMetrics`]; the extractor merges them in
//! order of preference, so a field missing from one file can be supplied by
//! another file of the same activity.

use chrono::{DateTime, Utc};
use tracker_core::models::ActivityType;

/// One sample of a detail time series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    /// Seconds since the activity started (cumulative).
    pub elapsed_seconds: Option<f64>,
    /// Metres since the activity started (cumulative).
    pub distance_meters: Option<f64>,
    pub heart_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialMetrics {
    pub name: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub distance_meters: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub samples: Vec<Sample>,
}

impl PartialMetrics {
    /// Fill every field still unset in `self` from `other`.
    pub fn merge(&mut self, other: PartialMetrics) {
        self.name = self.name.take().or(other.name);
        self.activity_type = self.activity_type.take().or(other.activity_type);
        self.start_time = self.start_time.or(other.start_time);
        self.duration_seconds = self.duration_seconds.or(other.duration_seconds);
        self.distance_meters = self.distance_meters.or(other.distance_meters);
        self.average_heart_rate = self.average_heart_rate.or(other.average_heart_rate);
        self.max_heart_rate = self.max_heart_rate.or(other.max_heart_rate);
        if self.samples.is_empty() {
            self.samples = other.samples;
        }
    }

    /// Derive summary fields from the samples where the summary itself is
    /// silent: duration and distance from the last sample that has them,
    /// heart-rate mean and maximum over samples that report one.
    pub fn fill_from_samples(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        if self.duration_seconds.is_none() {
            self.duration_seconds = self.samples.iter().rev().find_map(|s| s.elapsed_seconds);
        }
        if self.distance_meters.is_none() {
            self.distance_meters = self.samples.iter().rev().find_map(|s| s.distance_meters);
        }
        let rates: Vec<f64> = self.samples.iter().filter_map(|s| s.heart_rate).collect();
        if self.average_heart_rate.is_none() {
            self.average_heart_rate = tracker_core::calculations::mean(&rates);
        }
        if self.max_heart_rate.is_none() {
            self.max_heart_rate = tracker_core::calculations::min_max(&rates).map(|(_, hi)| hi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(elapsed: f64, distance: f64, hr: Option<f64>) -> Sample {
        Sample {
            elapsed_seconds: Some(elapsed),
            distance_meters: Some(distance),
            heart_rate: hr,
        }
    }

    #[test]
    fn test_merge_prefers_existing_values() {
        let mut primary = PartialMetrics {
            duration_seconds: Some(1800.0),
            ..Default::default()
        };
        primary.merge(PartialMetrics {
            duration_seconds: Some(10.0),
            distance_meters: Some(5000.0),
            average_heart_rate: Some(150.0),
            ..Default::default()
        });
        assert_eq!(primary.duration_seconds, Some(1800.0));
        assert_eq!(primary.distance_meters, Some(5000.0));
        assert_eq!(primary.average_heart_rate, Some(150.0));
    }

    #[test]
    fn test_merge_keeps_first_samples() {
        let mut primary = PartialMetrics {
            samples: vec![sample(0.0, 0.0, None)],
            ..Default::default()
        };
        primary.merge(PartialMetrics {
            samples: vec![sample(1.0, 1.0, None), sample(2.0, 2.0, None)],
            ..Default::default()
        });
        assert_eq!(primary.samples.len(), 1);
    }

    #[test]
    fn test_fill_from_samples() {
        let mut m = PartialMetrics {
            samples: vec![
                sample(0.0, 0.0, Some(120.0)),
                sample(300.0, 1000.0, None),
                sample(600.0, 2000.0, Some(160.0)),
            ],
            ..Default::default()
        };
        m.fill_from_samples();
        assert_eq!(m.duration_seconds, Some(600.0));
        assert_eq!(m.distance_meters, Some(2000.0));
        assert_eq!(m.average_heart_rate, Some(140.0));
        assert_eq!(m.max_heart_rate, Some(160.0));
    }

    #[test]
    fn test_fill_from_samples_without_heart_rate() {
        let mut m = PartialMetrics {
            samples: vec![sample(0.0, 0.0, None), sample(60.0, 200.0, None)],
            ..Default::default()
        };
        m.fill_from_samples();
        assert!(m.average_heart_rate.is_none());
        assert!(m.max_heart_rate.is_none());
    }
}
