use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve the `"auto"` sentinel to the system timezone.
pub fn resolve_timezone(name: &str) -> String {
    if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    }
}

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// Parse a timestamp string as written by Garmin Connect.
///
/// Accepts RFC 3339 (with `Z` or an offset) and the naive forms the API uses
/// for `startTimeGMT` (`2024-11-20T14:19:54.0`, `2024-11-20 14:19:54`), which
/// are interpreted as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = if let Some(stripped) = s.strip_suffix('Z') {
        format!("{}+00:00", stripped)
    } else {
        s.to_string()
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset without a colon, e.g. `+0000`.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

/// Convert a JSON value holding either a timestamp string or epoch
/// milliseconds into a UTC datetime.
pub fn parse_json_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// Convert a FIT `date_time` (seconds since the FIT epoch) into UTC.
pub fn from_fit_timestamp(fit_seconds: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::from(fit_seconds) + FIT_EPOCH_OFFSET, 0)
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Converts UTC timestamps into the zone dates are displayed and grouped in.
#[derive(Debug, Clone)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for an IANA timezone name.
    ///
    /// Unrecognised names fall back to UTC with a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Whether `tz_name` is a known IANA timezone.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn to_local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.tz)
    }

    /// `YYYY-MM-DD` in the handler's zone.
    pub fn format_date(&self, dt: DateTime<Utc>) -> String {
        self.to_local(dt).format("%Y-%m-%d").to_string()
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_timestamp_rfc3339_offset() {
        assert_eq!(
            parse_timestamp("2024-11-20T14:19:54+00:00"),
            Some(ts("2024-11-20T14:19:54Z"))
        );
        assert_eq!(
            parse_timestamp("2024-11-20T16:19:54+02:00"),
            Some(ts("2024-11-20T14:19:54Z"))
        );
    }

    #[test]
    fn test_parse_timestamp_z_suffix() {
        assert_eq!(
            parse_timestamp("2024-11-20T14:19:54Z"),
            Some(ts("2024-11-20T14:19:54Z"))
        );
    }

    #[test]
    fn test_parse_timestamp_garmin_gmt_forms() {
        let expected = Some(ts("2024-11-20T14:19:54Z"));
        assert_eq!(parse_timestamp("2024-11-20T14:19:54.0"), expected);
        assert_eq!(parse_timestamp("2024-11-20 14:19:54"), expected);
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_json_timestamp_millis() {
        let v = serde_json::json!(1_732_112_394_000_i64);
        assert_eq!(parse_json_timestamp(&v), Some(ts("2024-11-20T14:19:54Z")));
        assert!(parse_json_timestamp(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_from_fit_timestamp_epoch() {
        assert_eq!(from_fit_timestamp(0), Some(ts("1989-12-31T00:00:00Z")));
    }

    #[test]
    fn test_timezone_handler_format_date_crosses_midnight() {
        let handler = TimezoneHandler::new("Asia/Tokyo");
        assert_eq!(handler.format_date(ts("2024-01-15T20:00:00Z")), "2024-01-16");
    }

    #[test]
    fn test_timezone_handler_unknown_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Mars/Olympus");
        assert_eq!(handler.format_date(ts("2024-01-15T23:30:00Z")), "2024-01-15");
        assert!(!TimezoneHandler::validate_timezone("Mars/Olympus"));
        assert!(TimezoneHandler::validate_timezone("Europe/Oslo"));
    }

    #[test]
    fn test_resolve_timezone_passthrough() {
        assert_eq!(resolve_timezone("Europe/Oslo"), "Europe/Oslo");
        assert!(!resolve_timezone("auto").is_empty());
    }
}
