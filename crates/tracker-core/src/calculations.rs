use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

// ── Derived metrics ───────────────────────────────────────────────────────────

/// Average pace in seconds per kilometre.
///
/// `None` when the distance is zero or not a positive finite number.
pub fn derive_pace(duration_seconds: f64, distance_meters: f64) -> Option<f64> {
    if !distance_meters.is_finite() || distance_meters <= 0.0 || !duration_seconds.is_finite() {
        return None;
    }
    let pace = duration_seconds / (distance_meters / 1000.0);
    pace.is_finite().then_some(pace)
}

/// Average speed in metres per second.
///
/// `None` when the duration is zero or not a positive finite number.
pub fn derive_speed(duration_seconds: f64, distance_meters: f64) -> Option<f64> {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 || !distance_meters.is_finite() {
        return None;
    }
    let speed = distance_meters / duration_seconds;
    speed.is_finite().then_some(speed)
}

// ── Summary statistics ────────────────────────────────────────────────────────

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N, like NumPy's `std`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Smallest and largest value; `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

// ── Trend fitting ─────────────────────────────────────────────────────────────

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Degree-one polynomial fit over paired samples.
///
/// Returns `None` with fewer than two points or when every `x` is equal.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: my - slope * mx,
    })
}

/// A fitted trend of some metric against calendar time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    /// Change of the metric per day.
    pub per_day: f64,
    /// Fitted value at each input timestamp, in input order.
    pub fitted: Vec<f64>,
}

impl Trend {
    /// Fit `values` against `times` (seconds since the epoch on the x axis).
    pub fn fit(times: &[DateTime<Utc>], values: &[f64]) -> Option<Self> {
        let xs: Vec<f64> = times.iter().map(|t| t.timestamp() as f64).collect();
        let line = linear_fit(&xs, values)?;
        Some(Self {
            per_day: line.slope * SECONDS_PER_DAY,
            fitted: xs.iter().map(|&x| line.at(x)).collect(),
        })
    }
}

// ── Rolling windows ───────────────────────────────────────────────────────────

/// Trailing rolling mean with a minimum of one observation per window.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Centered rolling mean; positions where the full window does not fit are
/// `None`. For even windows the extra element sits before the centre.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let after = (window - 1) / 2;
    (0..values.len())
        .map(|i| {
            let end = i + after;
            if end >= values.len() || end + 1 < window {
                return None;
            }
            let slice = &values[end + 1 - window..=end];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}
