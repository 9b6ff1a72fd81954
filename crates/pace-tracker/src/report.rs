//! Plain-text reports printed to stdout.

use std::io::{self, Write};

use tracker_core::calculations::{mean, min_max};
use tracker_core::formatting::{
    format_distance, format_duration, format_heart_rate, format_number, format_optional_pace,
    format_pace,
};
use tracker_core::models::ActivityRecord;
use tracker_core::time_utils::TimezoneHandler;
use tracker_data::aggregator::{ActivityAggregator, PeriodStats};
use tracker_data::splits::fastest_splits;
use tracker_data::stats::{
    heart_rate_statistics, heart_rate_trend, pace_statistics, pace_trend, rolling_pace,
};

const RULE: &str =
    "================================================================================";
const THIN_RULE: &str =
    "--------------------------------------------------------------------------------";

/// Which summary report to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Pace,
    Speed,
    HeartRate,
    Splits,
    Weekly,
    Monthly,
}

impl ReportKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pace" => Some(ReportKind::Pace),
            "speed" => Some(ReportKind::Speed),
            "heart-rate" => Some(ReportKind::HeartRate),
            "splits" => Some(ReportKind::Splits),
            "weekly" => Some(ReportKind::Weekly),
            "monthly" => Some(ReportKind::Monthly),
            _ => None,
        }
    }
}

/// Parameters shared by all reports.
pub struct ReportContext<'a> {
    pub tz: &'a TimezoneHandler,
    pub window: usize,
    pub skip_km: u32,
}

/// One line per record: date, name, pace and heart rate.
pub fn write_list<W: Write>(
    out: &mut W,
    records: &[ActivityRecord],
    tz: &TimezoneHandler,
) -> io::Result<()> {
    for record in records {
        writeln!(
            out,
            "{}  {:<32}  {:>6} /km  {}",
            tz.format_date(record.start_time),
            truncate(record.display_name(), 32),
            format_optional_pace(record.average_pace),
            format_heart_rate(record.average_heart_rate),
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub fn write_report<W: Write>(
    out: &mut W,
    kind: ReportKind,
    records: &[ActivityRecord],
    ctx: &ReportContext<'_>,
) -> io::Result<()> {
    match kind {
        ReportKind::Pace => write_pace(out, records, ctx),
        ReportKind::Speed => write_speed(out, records, ctx),
        ReportKind::HeartRate => write_heart_rate(out, records),
        ReportKind::Splits => write_splits(out, records, ctx),
        ReportKind::Weekly => write_periods(
            out,
            "Weekly",
            &ActivityAggregator::aggregate_weekly(records, ctx.tz),
        ),
        ReportKind::Monthly => write_periods(
            out,
            "Monthly",
            &ActivityAggregator::aggregate_monthly(records, ctx.tz),
        ),
    }
}

fn write_pace<W: Write>(
    out: &mut W,
    records: &[ActivityRecord],
    ctx: &ReportContext<'_>,
) -> io::Result<()> {
    writeln!(out, "\nPace Statistics:")?;
    writeln!(out, "{}", RULE)?;
    let Some(stats) = pace_statistics(records) else {
        writeln!(out, "No activities with pace data")?;
        return Ok(());
    };
    writeln!(out, "Total activities: {}", stats.count)?;
    writeln!(
        out,
        "Date range: {} to {}",
        ctx.tz.format_date(stats.first_date),
        ctx.tz.format_date(stats.last_date)
    )?;
    writeln!(out, "Average pace: {} /km", format_pace(stats.mean))?;
    writeln!(out, "Std deviation: {} s/km", format_number(stats.std_dev, 1))?;
    writeln!(out, "Best pace: {} /km", format_pace(stats.best))?;
    writeln!(out, "Worst pace: {} /km", format_pace(stats.worst))?;
    writeln!(out, "Range: {} s/km", format_number(stats.range, 1))?;

    if let Some(trend) = pace_trend(records) {
        writeln!(
            out,
            "Trend: {} s/km per day ({})",
            format_number(trend.per_day, 2),
            trend.direction.as_str()
        )?;
    }
    let rolling = rolling_pace(records, ctx.window);
    if let Some(latest) = rolling.trailing.last() {
        writeln!(
            out,
            "Latest {}-activity average: {} /km",
            rolling.window,
            format_pace(*latest)
        )?;
    }
    Ok(())
}

fn write_speed<W: Write>(
    out: &mut W,
    records: &[ActivityRecord],
    ctx: &ReportContext<'_>,
) -> io::Result<()> {
    writeln!(out, "\nSpeed Statistics:")?;
    writeln!(out, "{}", RULE)?;
    // km/h for display.
    let speeds: Vec<f64> = records
        .iter()
        .filter_map(|r| r.average_speed)
        .map(|s| s * 3.6)
        .collect();
    let (Some(avg), Some((slowest, fastest))) = (mean(&speeds), min_max(&speeds)) else {
        writeln!(out, "No activities with speed data")?;
        return Ok(());
    };
    writeln!(out, "Total activities: {}", speeds.len())?;
    writeln!(out, "Average speed: {} km/h", format_number(avg, 2))?;
    writeln!(out, "Fastest: {} km/h", format_number(fastest, 2))?;
    writeln!(out, "Slowest: {} km/h", format_number(slowest, 2))?;

    writeln!(out, "{}", THIN_RULE)?;
    for record in records.iter().filter(|r| r.average_speed.is_some()) {
        writeln!(
            out,
            "{}  {:>10}  {:>8}  {:>6} km/h",
            ctx.tz.format_date(record.start_time),
            format_distance(record.distance_meters),
            format_duration(record.duration_seconds),
            format_number(record.average_speed.unwrap_or(0.0) * 3.6, 2),
        )?;
    }
    Ok(())
}

fn write_heart_rate<W: Write>(out: &mut W, records: &[ActivityRecord]) -> io::Result<()> {
    writeln!(out, "\nHeart Rate Statistics:")?;
    writeln!(out, "{}", RULE)?;
    let Some(stats) = heart_rate_statistics(records) else {
        writeln!(out, "No heart rate data available")?;
        return Ok(());
    };
    writeln!(out, "Activities with heart rate: {}", stats.count)?;
    if stats.missing > 0 {
        writeln!(out, "Activities without heart rate: {}", stats.missing)?;
    }
    writeln!(out, "Average: {} bpm", format_number(stats.mean, 1))?;
    writeln!(out, "Std deviation: {} bpm", format_number(stats.std_dev, 1))?;
    writeln!(out, "Minimum: {} bpm", format_number(stats.min, 0))?;
    writeln!(out, "Maximum: {} bpm", format_number(stats.max, 0))?;
    writeln!(out, "Range: {} bpm", format_number(stats.range, 0))?;
    if let Some(trend) = heart_rate_trend(records) {
        writeln!(
            out,
            "Trend: {} bpm per day ({})",
            format_number(trend.per_day, 3),
            trend.direction.as_str()
        )?;
    }
    Ok(())
}

fn write_splits<W: Write>(
    out: &mut W,
    records: &[ActivityRecord],
    ctx: &ReportContext<'_>,
) -> io::Result<()> {
    let fastest = fastest_splits(records, ctx.skip_km);
    writeln!(out, "\nActivity Analysis Summary:")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Total Activities Analyzed: {}", fastest.len())?;
    writeln!(out, "\nFastest Kilometers:")?;
    writeln!(out, "{}", THIN_RULE)?;
    writeln!(out, "Date         Distance  Fastest KM  Pace    Heart Rate")?;
    writeln!(out, "{}", THIN_RULE)?;
    for split in &fastest {
        writeln!(
            out,
            "{}  {:>6.1}km  KM {:>3}     {:<6}  {}",
            ctx.tz.format_date(split.start_time),
            split.distance_km,
            split.km,
            format_pace(split.pace_seconds_per_km),
            format_heart_rate(split.heart_rate),
        )?;
    }
    Ok(())
}

fn write_periods<W: Write>(out: &mut W, label: &str, periods: &[PeriodStats]) -> io::Result<()> {
    writeln!(out, "\n{} Summary:", label)?;
    writeln!(out, "{}", RULE)?;
    writeln!(
        out,
        "{:<10}  {:>5}  {:>12}  {:>10}  {:>8}  {:>8}",
        "Period", "Count", "Distance", "Duration", "Pace", "HR"
    )?;
    writeln!(out, "{}", THIN_RULE)?;
    let totals = ActivityAggregator::calculate_totals(periods);
    for period in periods.iter().chain(std::iter::once(&totals)) {
        if std::ptr::eq(period, &totals) {
            writeln!(out, "{}", THIN_RULE)?;
        }
        writeln!(
            out,
            "{:<10}  {:>5}  {:>12}  {:>10}  {:>8}  {:>8}",
            period.period_key,
            period.count,
            format_distance(period.total_distance_meters),
            format_duration(period.total_duration_seconds),
            format_optional_pace(period.average_pace()),
            format_heart_rate(period.mean_heart_rate()),
        )?;
    }
    Ok(())
}
