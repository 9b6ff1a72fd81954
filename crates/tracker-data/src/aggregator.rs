//! Activity aggregation over weekly, monthly and yearly windows.

use std::collections::BTreeMap;

use serde::Serialize;
use tracker_core::calculations::derive_pace;
use tracker_core::models::ActivityRecord;
use tracker_core::time_utils::TimezoneHandler;

// ── Period ────────────────────────────────────────────────────────────────────

/// Calendar window records are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// ISO week, key `"2024-W47"`.
    Week,
    /// Calendar month, key `"2024-11"`.
    Month,
    /// Calendar year, key `"2024"`.
    Year,
}

impl Period {
    fn key_format(self) -> &'static str {
        match self {
            Period::Week => "%G-W%V",
            Period::Month => "%Y-%m",
            Period::Year => "%Y",
        }
    }
}

// ── PeriodStats ───────────────────────────────────────────────────────────────

/// Totals for the activities within one period.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeriodStats {
    pub period_key: String,
    pub count: u32,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
    #[serde(skip)]
    heart_rate_sum: f64,
    #[serde(skip)]
    heart_rate_count: u32,
}

impl PeriodStats {
    fn new(period_key: impl Into<String>) -> Self {
        Self {
            period_key: period_key.into(),
            ..Default::default()
        }
    }

    /// Add a single record to the running totals.
    pub fn add_record(&mut self, record: &ActivityRecord) {
        self.count += 1;
        self.total_distance_meters += record.distance_meters;
        self.total_duration_seconds += record.duration_seconds;
        if let Some(hr) = record.average_heart_rate {
            self.heart_rate_sum += hr;
            self.heart_rate_count += 1;
        }
    }

    fn absorb(&mut self, other: &PeriodStats) {
        self.count += other.count;
        self.total_distance_meters += other.total_distance_meters;
        self.total_duration_seconds += other.total_duration_seconds;
        self.heart_rate_sum += other.heart_rate_sum;
        self.heart_rate_count += other.heart_rate_count;
    }

    /// Total duration over total kilometres, in seconds per km.
    pub fn average_pace(&self) -> Option<f64> {
        derive_pace(self.total_duration_seconds, self.total_distance_meters)
    }

    /// Mean over the records that reported a heart rate.
    pub fn mean_heart_rate(&self) -> Option<f64> {
        (self.heart_rate_count > 0).then(|| self.heart_rate_sum / f64::from(self.heart_rate_count))
    }
}

// ── ActivityAggregator ────────────────────────────────────────────────────────

/// Stateless helper that groups activity records by time period.
pub struct ActivityAggregator;

impl ActivityAggregator {
    /// Aggregate `records` by `period`, keyed in the handler's timezone.
    ///
    /// Returns periods sorted by key (ascending).
    pub fn aggregate(
        records: &[ActivityRecord],
        period: Period,
        tz: &TimezoneHandler,
    ) -> Vec<PeriodStats> {
        let format = period.key_format();
        let mut map: BTreeMap<String, PeriodStats> = BTreeMap::new();

        for record in records {
            let key = tz.to_local(record.start_time).format(format).to_string();
            map.entry(key.clone())
                .or_insert_with(|| PeriodStats::new(key))
                .add_record(record);
        }

        map.into_values().collect()
    }

    pub fn aggregate_weekly(records: &[ActivityRecord], tz: &TimezoneHandler) -> Vec<PeriodStats> {
        Self::aggregate(records, Period::Week, tz)
    }

    pub fn aggregate_monthly(records: &[ActivityRecord], tz: &TimezoneHandler) -> Vec<PeriodStats> {
        Self::aggregate(records, Period::Month, tz)
    }

    pub fn aggregate_yearly(records: &[ActivityRecord], tz: &TimezoneHandler) -> Vec<PeriodStats> {
        Self::aggregate(records, Period::Year, tz)
    }

    /// Sum up all periods into a single [`PeriodStats`] keyed `"total"`.
    pub fn calculate_totals(data: &[PeriodStats]) -> PeriodStats {
        let mut totals = PeriodStats::new("total");
        for period in data {
            totals.absorb(period);
        }
        totals
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
