use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::SportFilter;
use crate::time_utils::TimezoneHandler;

/// Accept `auto` or a known IANA timezone name.
fn parse_timezone_arg(value: &str) -> Result<String, String> {
    if value == "auto" || TimezoneHandler::validate_timezone(value) {
        Ok(value.to_string())
    } else {
        Err(format!("unknown timezone '{}'", value))
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Pace, speed and heart-rate trends from downloaded Garmin activities
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pace-tracker",
    about = "Pace, speed and heart-rate trends from downloaded Garmin activities",
    version
)]
pub struct Settings {
    /// Directory containing activity files (default: ./activities)
    #[arg(long)]
    pub activities_dir: Option<PathBuf>,

    /// Write the normalised activity table as JSON for plotting
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// List activities without printing a report
    #[arg(long)]
    pub list: bool,

    /// Activity type to keep (the splits report also keeps activities of unknown type)
    #[arg(long, default_value = "running", value_parser = ["running", "cycling", "all"])]
    pub sport: String,

    /// Report to print
    #[arg(long, default_value = "pace", value_parser = ["pace", "speed", "heart-rate", "splits", "weekly", "monthly"])]
    pub report: String,

    /// Rolling-average window, in activities
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub window: u32,

    /// Kilometres skipped at the start of each activity when looking for the fastest split
    #[arg(long, default_value = "2")]
    pub skip_km: u32,

    /// Timezone used for dates (auto-detected if not specified)
    #[arg(long, default_value = "auto", value_parser = parse_timezone_arg)]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.pace-tracker/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<u32>,
}

impl LastUsedParams {
    /// Uses `~/.pace-tracker/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".pace-tracker").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    ///
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent directories
    /// if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Accepts args and an explicit config path so that tests can redirect to
    /// a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if settings.activities_dir.is_none() {
            settings.activities_dir = last.activities_dir;
        }
        if !is_arg_explicitly_set(&matches, "sport") {
            if let Some(v) = last.sport {
                if SportFilter::parse(&v).is_some() {
                    settings.sport = v;
                }
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone.filter(|tz| TimezoneHandler::validate_timezone(tz)) {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "window") {
            if let Some(v) = last.window.filter(|w| (1..=100).contains(w)) {
                settings.window = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// The parsed `--sport` value. Clap restricts the accepted strings.
    pub fn sport_filter(&self) -> SportFilter {
        SportFilter::parse(&self.sport).unwrap_or(SportFilter::Running)
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        settings.timezone = crate::time_utils::resolve_timezone(&settings.timezone);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            activities_dir: s.activities_dir.clone(),
            sport: Some(s.sport.clone()),
            timezone: Some(s.timezone.clone()),
            window: Some(s.window),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
