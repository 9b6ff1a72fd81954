/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use tracker_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a tiny epsilon so exact decimal midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let frac_part = rounded - rounded.trunc();

    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", frac_part, prec = decimals as usize);
        // `frac_str` starts with "0.", e.g. "0.50".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a pace given in seconds per kilometre as `M:SS`.
///
/// # Examples
///
/// ```
/// use tracker_core::formatting::format_pace;
///
/// assert_eq!(format_pace(360.0), "6:00");
/// assert_eq!(format_pace(331.4), "5:31");
/// assert_eq!(format_pace(359.6), "6:00");
/// ```
pub fn format_pace(seconds_per_km: f64) -> String {
    let total = seconds_per_km.round().max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format an optional pace, using `"--"` when absent.
pub fn format_optional_pace(seconds_per_km: Option<f64>) -> String {
    seconds_per_km.map_or_else(|| "--".to_string(), format_pace)
}

/// Format a duration in seconds as `H:MM:SS` (or `M:SS` under an hour).
///
/// # Examples
///
/// ```
/// use tracker_core::formatting::format_duration;
///
/// assert_eq!(format_duration(59.0),   "0:59");
/// assert_eq!(format_duration(1800.0), "30:00");
/// assert_eq!(format_duration(3725.0), "1:02:05");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    if hours == 0 {
        format!("{}:{:02}", mins, secs)
    } else {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format a distance in metres as kilometres with two decimals.
///
/// # Examples
///
/// ```
/// use tracker_core::formatting::format_distance;
///
/// assert_eq!(format_distance(5000.0),    "5.00 km");
/// assert_eq!(format_distance(1234567.0), "1,234.57 km");
/// ```
pub fn format_distance(meters: f64) -> String {
    format!("{} km", format_number(meters / 1000.0, 2))
}

/// Format an optional heart rate, e.g. `"152 bpm"` or `"No HR"`.
pub fn format_heart_rate(bpm: Option<f64>) -> String {
    match bpm {
        Some(v) => format!("{:.0} bpm", v),
        None => "No HR".to_string(),
    }
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
