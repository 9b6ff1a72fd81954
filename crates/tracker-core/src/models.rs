use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::calculations::{derive_pace, derive_speed};

/// Coarse sport family of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Cycling,
    /// Anything else; keeps the raw type key reported by the source.
    Other(String),
}

impl ActivityType {
    /// Type of an activity none of whose sources names a sport.
    pub fn unknown() -> Self {
        ActivityType::Other("unknown".to_string())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ActivityType::Other(key) if key == "unknown")
    }

    /// Map a Garmin Connect `typeKey` onto a sport family.
    ///
    /// Garmin uses sub-type keys such as `trail_running` or `road_biking`;
    /// they all collapse onto their family.
    pub fn from_type_key(key: &str) -> Self {
        let key = key.trim().to_lowercase();
        match key.as_str() {
            "running" | "trail_running" | "treadmill_running" | "track_running"
            | "indoor_running" | "street_running" | "virtual_run" | "ultra_run" => {
                ActivityType::Running
            }
            "cycling" | "road_biking" | "mountain_biking" | "gravel_cycling"
            | "indoor_cycling" | "virtual_ride" | "cyclocross" | "e_bike_fitness"
            | "e_bike_mountain" | "bmx" | "track_cycling" | "recumbent_cycling" => {
                ActivityType::Cycling
            }
            _ => ActivityType::Other(key),
        }
    }

    /// Map a FIT `sport` enum value onto a sport family.
    pub fn from_fit_sport(sport: u8) -> Self {
        match sport {
            1 => ActivityType::Running,
            2 => ActivityType::Cycling,
            other => ActivityType::Other(format!("fit_sport_{}", other)),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Other(key) => key.as_str(),
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which activities a report should keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportFilter {
    Running,
    Cycling,
    All,
}

impl SportFilter {
    /// Parse a filter name as accepted on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "running" => Some(SportFilter::Running),
            "cycling" => Some(SportFilter::Cycling),
            "all" => Some(SportFilter::All),
            _ => None,
        }
    }

    pub fn matches(&self, activity_type: &ActivityType) -> bool {
        match self {
            SportFilter::Running => *activity_type == ActivityType::Running,
            SportFilter::Cycling => *activity_type == ActivityType::Cycling,
            SportFilter::All => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportFilter::Running => "running",
            SportFilter::Cycling => "cycling",
            SportFilter::All => "all",
        }
    }
}

impl fmt::Display for SportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk encoding of an activity file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Garmin Connect API dump.
    Json,
    /// Binary FIT protocol file.
    Fit,
}

impl FileFormat {
    /// Recognise a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "fit" => Some(FileFormat::Fit),
            _ => None,
        }
    }
}

/// What part of an activity a file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// Scalar summary (`*_summary.*`).
    Summary,
    /// Sample-level time series (`*_details.*`).
    Details,
    /// A file with no role suffix, e.g. `17582889898.fit`.
    Activity,
}

impl FileRole {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_lowercase().as_str() {
            "summary" => Some(FileRole::Summary),
            "details" => Some(FileRole::Details),
            _ => None,
        }
    }
}

/// One recognised file belonging to an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFile {
    pub path: PathBuf,
    pub format: FileFormat,
    pub role: FileRole,
}

/// The files on disk that share one activity identifier.
///
/// Only lives for the duration of an extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFileGroup {
    /// Identifier derived from the filenames (unique within a directory).
    pub id: String,
    /// Start time encoded in the filename prefix, when present.
    pub filename_timestamp: Option<DateTime<Utc>>,
    /// Member files, ordered by role then path.
    pub files: Vec<ActivityFile>,
}

impl ActivityFileGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename_timestamp: None,
            files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One whole kilometre of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmSplit {
    /// Zero-based kilometre index (`floor(distance_km)`).
    pub km: u32,
    /// Distance covered by the samples in this kilometre.
    pub distance_meters: f64,
    /// Time spent between the first and last sample in this kilometre.
    pub duration_seconds: f64,
    /// Interval pace in seconds per kilometre.
    pub pace_seconds_per_km: Option<f64>,
    /// Mean heart rate over samples that reported one.
    pub heart_rate: Option<f64>,
}

/// One normalised activity, ready for plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    /// Seconds per kilometre; absent when distance is zero.
    pub average_pace: Option<f64>,
    /// Metres per second; absent when duration is zero.
    pub average_speed: Option<f64>,
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
    #[serde(default)]
    pub splits: Vec<KmSplit>,
    /// Files the record was built from.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

impl ActivityRecord {
    /// Build a record, deriving pace and speed from duration and distance.
    pub fn new(
        id: impl Into<String>,
        activity_type: ActivityType,
        start_time: DateTime<Utc>,
        duration_seconds: f64,
        distance_meters: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            activity_type,
            start_time,
            duration_seconds,
            distance_meters,
            average_pace: derive_pace(duration_seconds, distance_meters),
            average_speed: derive_speed(duration_seconds, distance_meters),
            average_heart_rate: None,
            max_heart_rate: None,
            splits: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    /// Display name, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_activity_type_families() {
        assert_eq!(ActivityType::from_type_key("running"), ActivityType::Running);
        assert_eq!(ActivityType::from_type_key("trail_running"), ActivityType::Running);
        assert_eq!(ActivityType::from_type_key("Road_Biking"), ActivityType::Cycling);
        assert_eq!(
            ActivityType::from_type_key("lap_swimming"),
            ActivityType::Other("lap_swimming".to_string())
        );
    }

    #[test]
    fn test_activity_type_from_fit_sport() {
        assert_eq!(ActivityType::from_fit_sport(1), ActivityType::Running);
        assert_eq!(ActivityType::from_fit_sport(2), ActivityType::Cycling);
        assert_eq!(ActivityType::from_fit_sport(5).as_str(), "fit_sport_5");
    }

    #[test]
    fn test_sport_filter() {
        let filter = SportFilter::parse("Running").unwrap();
        assert!(filter.matches(&ActivityType::Running));
        assert!(!filter.matches(&ActivityType::Cycling));
        assert!(SportFilter::All.matches(&ActivityType::Other("yoga".to_string())));
        assert!(SportFilter::parse("swimming").is_none());
    }

    #[test]
    fn test_unknown_activity_type() {
        assert!(ActivityType::unknown().is_unknown());
        assert_eq!(ActivityType::unknown().as_str(), "unknown");
        assert!(!ActivityType::from_type_key("yoga").is_unknown());
        assert!(!SportFilter::Running.matches(&ActivityType::unknown()));
    }

    #[test]
    fn test_file_format_extension_case_insensitive() {
        assert_eq!(FileFormat::from_extension("FIT"), Some(FileFormat::Fit));
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("gpx"), None);
    }

    #[test]
    fn test_record_derives_pace_and_speed() {
        let rec = ActivityRecord::new(
            "123",
            ActivityType::Running,
            ts("2024-11-20T14:19:54Z"),
            1800.0,
            5000.0,
        );
        assert_eq!(rec.average_pace, Some(360.0));
        let speed = rec.average_speed.unwrap();
        assert!((speed - 5000.0 / 1800.0).abs() < 1e-9);
        assert!(rec.average_heart_rate.is_none());
    }

    #[test]
    fn test_record_zero_distance_has_no_pace() {
        let rec = ActivityRecord::new(
            "456",
            ActivityType::Running,
            ts("2024-11-20T14:19:54Z"),
            0.0,
            0.0,
        );
        assert!(rec.average_pace.is_none());
        assert!(rec.average_speed.is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut rec = ActivityRecord::new(
            "789",
            ActivityType::Cycling,
            ts("2024-01-01T00:00:00Z"),
            60.0,
            100.0,
        );
        assert_eq!(rec.display_name(), "789");
        rec.name = Some("Morning Ride".to_string());
        assert_eq!(rec.display_name(), "Morning Ride");
    }
}
