// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Trend Engine
//!
//! Multi-day analysis over paginated WHOOP collections.
//!
//! - [`fetch_multi_day`] walks the `nextToken` cursor for an inclusive date window
//! - [`trend_statistics`] reduces a series to count/average/range/slope/stability
//! - [`ascii_chart`] renders a series as a small text plot
//!
//! The report builders at the bottom compose these into the trend tools.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{defaults, endpoints, limits};
use crate::dates;
use crate::errors::{WhoopError, WhoopResult};
use crate::formatters::{fetch_error, fmt_num, KJ_PER_KCAL};
use crate::models::{or_zero, CycleRecord, Page, RecoveryRecord, SleepRecord, WorkoutRecord};
use crate::whoop_client::{get_typed, Query, WhoopApi};

/// Slopes smaller than this are reported as stable
pub const TREND_EPSILON: f64 = 0.1;

/// The chart caption uses a finer threshold
pub const CHART_TREND_EPSILON: f64 = 0.01;

const RULE: usize = 60;
const WIDE_RULE: usize = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    #[default]
    InsufficientData,
}

impl TrendDirection {
    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::Declining => "Declining",
            TrendDirection::Stable => "Stable",
            TrendDirection::InsufficientData => "Insufficient Data",
        }
    }

    fn flipped(self) -> Self {
        match self {
            TrendDirection::Improving => TrendDirection::Declining,
            TrendDirection::Declining => TrendDirection::Improving,
            other => other,
        }
    }

    /// Arrow for a series where higher values are better
    fn emoji(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "📈",
            TrendDirection::Declining => "📉",
            _ => "➡️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    High,
    Moderate,
    Low,
    #[default]
    Unknown,
}

impl Stability {
    pub fn label(&self) -> &'static str {
        match self {
            Stability::High => "High",
            Stability::Moderate => "Moderate",
            Stability::Low => "Low",
            Stability::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct TrendStatistics {
    pub count: usize,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub trend: f64,
    pub trend_direction: TrendDirection,
    pub variance: f64,
    pub stability: Stability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrendError {
    #[error("No data provided")]
    Empty,
    #[error("No valid data points")]
    NoValidPoints,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Summary statistics for a series; `None` entries are ignored
pub fn trend_statistics(values: &[Option<f64>]) -> Result<TrendStatistics, TrendError> {
    if values.is_empty() {
        return Err(TrendError::Empty);
    }

    let clean: Vec<f64> = values.iter().flatten().copied().collect();
    if clean.is_empty() {
        return Err(TrendError::NoValidPoints);
    }

    let count = clean.len();
    let n = count as f64;
    let average = clean.iter().sum::<f64>() / n;
    let minimum = clean.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (trend, trend_direction) = if count > 1 {
        let trend = (clean[count - 1] - clean[0]) / (n - 1.0);
        let direction = if trend.abs() < TREND_EPSILON {
            TrendDirection::Stable
        } else if trend > 0.0 {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        };
        (trend, direction)
    } else {
        (0.0, TrendDirection::InsufficientData)
    };

    let (variance, stability) = if count > 1 {
        let variance = clean.iter().map(|x| (x - average).powi(2)).sum::<f64>() / n;
        let stability = if variance < (average * 0.1).powi(2) {
            Stability::High
        } else if variance < (average * 0.2).powi(2) {
            Stability::Moderate
        } else {
            Stability::Low
        };
        (variance, stability)
    } else {
        (0.0, Stability::Unknown)
    };

    Ok(TrendStatistics {
        count,
        average: round_to(average, 2),
        minimum,
        maximum,
        trend: round_to(trend, 3),
        trend_direction,
        variance: round_to(variance, 2),
        stability,
    })
}

/// Same as [`trend_statistics`] for metrics where a falling value is an improvement
pub fn trend_statistics_lower_is_better(
    values: &[Option<f64>],
) -> Result<TrendStatistics, TrendError> {
    trend_statistics(values).map(|mut stats| {
        stats.trend_direction = stats.trend_direction.flipped();
        stats
    })
}

/// Text plot of `values` with min/mid/max labels and a slope caption
pub fn ascii_chart(values: &[f64], title: &str, width: usize) -> String {
    if values.len() < 2 {
        return format!("{}\nInsufficient data for chart visualization.", title);
    }

    let width = width.max(2);
    let height = defaults::ASCII_CHART_HEIGHT;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let span = (width - 1) as f64;

    let columns: Vec<f64> = if range == 0.0 {
        vec![(width / 2) as f64; values.len()]
    } else {
        values
            .iter()
            .map(|v| ((v - min) / range * span).trunc())
            .collect()
    };

    let mut lines = vec![title.to_string(), "=".repeat(title.chars().count())];

    for row in (0..=height).rev() {
        let threshold = row as f64 * span / height as f64;
        let mut line = if row == height {
            format!("{:6.1} |", max)
        } else if row == 0 {
            format!("{:6.1} |", min)
        } else if row == height / 2 {
            format!("{:6.1} |", (max + min) / 2.0)
        } else {
            "       |".to_string()
        };

        for (i, &column) in columns.iter().enumerate() {
            let near = (column - threshold).abs() <= 1.0;
            let crosses = i > 0 && {
                let previous = columns[i - 1];
                (previous <= threshold && threshold <= column)
                    || (column <= threshold && threshold <= previous)
            };
            line.push(if near || crosses { '●' } else { ' ' });
        }
        lines.push(line);
    }

    lines.push(format!("       +{}", "-".repeat(width)));

    let trend = (values[values.len() - 1] - values[0]) / (values.len() - 1) as f64;
    let caption = if trend.abs() < CHART_TREND_EPSILON {
        "→ Stable".to_string()
    } else if trend > 0.0 {
        format!("↗ Improving (+{:.2}/day)", trend)
    } else {
        format!("↘ Declining ({:.2}/day)", trend)
    };
    lines.push(format!("Trend: {}", caption));

    lines.join("\n")
}

/// Every record in `[start, end]`, following the pagination cursor.
///
/// Authentication problems are returned as errors. Any other failure ends
/// pagination and the records gathered so far are returned.
pub async fn fetch_multi_day<T: DeserializeOwned>(
    api: &dyn WhoopApi,
    endpoint: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> WhoopResult<Vec<T>> {
    let (start_iso, _) = dates::day_bounds(&start.format("%Y-%m-%d").to_string());
    let (_, end_iso) = dates::day_bounds(&end.format("%Y-%m-%d").to_string());

    let mut records = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let mut query: Query = vec![
            ("start", start_iso.clone()),
            ("end", end_iso.clone()),
            ("limit", limits::PAGE_SIZE.to_string()),
        ];
        if let Some(token) = next_token.take() {
            query.push(("nextToken", token));
        }

        let page: Page<T> = match get_typed(api, endpoint, &query).await {
            Ok(page) => page,
            Err(e @ (WhoopError::NotAuthenticated | WhoopError::CorruptToken)) => return Err(e),
            Err(e) => {
                warn!(endpoint, error = %e, "Stopping pagination after error");
                break;
            }
        };

        records.extend(page.records);
        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    debug!(endpoint, count = records.len(), "Fetched multi-day records");
    Ok(records)
}

/// Clamp `days`, resolve the window and fetch it; `Err` carries user-facing text
async fn load_window<T: DeserializeOwned>(
    api: &dyn WhoopApi,
    endpoint: &str,
    resource: &str,
    days: u32,
    end_date: Option<&str>,
) -> Result<(Vec<T>, NaiveDate, NaiveDate), String> {
    let (start, end) = dates::date_range(days, end_date)?;
    let records = fetch_multi_day(api, endpoint, start, end)
        .await
        .map_err(|e| fetch_error(resource, &e))?;
    Ok((records, start, end))
}

pub fn clamp_days(days: Option<i64>, default: u32, min: u32, max: u32) -> u32 {
    days.map(|d| d.clamp(i64::from(min), i64::from(max)) as u32)
        .unwrap_or(default)
        .clamp(min, max)
}

fn header(rule: usize, title: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "\n{}\n{}\n{}\n\n📅 Period: {} to {}\n",
        "=".repeat(rule),
        title,
        "=".repeat(rule),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
    )
}

/// Display a rounded average the way it is stored, keeping one decimal for whole numbers
fn decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Capitalize the first letter of every word
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

pub fn recovery_trends_report(
    records: &[RecoveryRecord],
    days: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let scores: Vec<Option<f64>> = records.iter().map(|r| r.score().recovery_score).collect();
    let hrv: Vec<Option<f64>> = records.iter().map(|r| r.score().hrv_rmssd_milli).collect();
    let rhr: Vec<Option<f64>> = records.iter().map(|r| r.score().resting_heart_rate).collect();

    let recovery_stats = trend_statistics(&scores);
    let hrv_stats = trend_statistics(&hrv);
    let rhr_stats = trend_statistics_lower_is_better(&rhr);

    let mut out = header(RULE, &format!("📈 RECOVERY TRENDS ANALYSIS ({} days)", days), start, end);
    out.push_str(&format!("📊 Data Points: {} recovery sessions\n\n", records.len()));

    match &recovery_stats {
        Ok(s) => out.push_str(&format!(
            "💚 RECOVERY SCORE TRENDS {}\nAverage: {}%\nRange: {}% - {}%\nTrend: {} ({:+.1} per day)\nStability: {}\n\n",
            s.trend_direction.emoji(),
            decimal(s.average),
            fmt_num(s.minimum),
            fmt_num(s.maximum),
            s.trend_direction.label(),
            s.trend,
            s.stability.label(),
        )),
        Err(_) => out.push_str("💚 RECOVERY SCORE TRENDS\nInsufficient data available.\n\n"),
    }

    match &hrv_stats {
        Ok(s) => out.push_str(&format!(
            "🫀 HRV TRENDS {}\nAverage: {}ms\nRange: {}ms - {}ms\nTrend: {} ({:+.1} per day)\nStability: {}\n\n",
            s.trend_direction.emoji(),
            s.average as i64,
            s.minimum as i64,
            s.maximum as i64,
            s.trend_direction.label(),
            s.trend,
            s.stability.label(),
        )),
        Err(_) => out.push_str("🫀 HRV TRENDS\nInsufficient data available.\n\n"),
    }

    match &rhr_stats {
        Ok(s) => {
            // An improving resting heart rate is a falling one
            let arrow = match s.trend_direction {
                TrendDirection::Improving => "📉",
                TrendDirection::Declining => "📈",
                _ => "➡️",
            };
            out.push_str(&format!(
                "❤️ RESTING HEART RATE TRENDS {}\nAverage: {} bpm\nRange: {} bpm - {} bpm\nTrend: {} ({:+.1} per day)\nStability: {}\n\n",
                arrow,
                s.average as i64,
                s.minimum as i64,
                s.maximum as i64,
                s.trend_direction.label(),
                s.trend,
                s.stability.label(),
            ));
        }
        Err(_) => out.push_str("❤️ RESTING HEART RATE TRENDS\nInsufficient data available.\n\n"),
    }

    out.push_str("🎯 INSIGHTS & RECOMMENDATIONS\n");
    if let Ok(s) = &recovery_stats {
        out.push_str(if s.average >= 67.0 {
            "• Excellent recovery average - you're consistently ready for training\n"
        } else if s.average >= 50.0 {
            "• Good recovery average - generally ready for moderate to high training\n"
        } else {
            "• Recovery below optimal - focus on sleep, stress management, and recovery practices\n"
        });
        match s.trend_direction {
            TrendDirection::Improving => {
                out.push_str("• Positive trend! Your recovery protocols are working well\n")
            }
            TrendDirection::Declining => out.push_str(
                "• Declining trend - consider adjusting training load or recovery strategies\n",
            ),
            _ => {}
        }
        if s.stability == Stability::Low {
            out.push_str(
                "• High variability detected - focus on consistent sleep and recovery routines\n",
            );
        }
    }

    if let (Ok(h), Ok(r)) = (&hrv_stats, &rhr_stats) {
        if h.trend_direction == TrendDirection::Improving
            && r.trend_direction == TrendDirection::Improving
        {
            out.push_str("• Cardiovascular fitness is improving - both HRV up and RHR down\n");
        } else if h.trend_direction == TrendDirection::Declining
            || r.trend_direction == TrendDirection::Declining
        {
            out.push_str("• Monitor cardiovascular stress - consider reducing training intensity\n");
        }
    }

    out.push('\n');
    out.push_str(&"=".repeat(RULE));
    out
}

pub async fn recovery_trends(api: &dyn WhoopApi, days: Option<i64>, end_date: Option<&str>) -> String {
    let days = clamp_days(days, 7, 2, 60);
    match load_window::<RecoveryRecord>(api, endpoints::RECOVERY, "recovery", days, end_date).await {
        Ok((records, _, _)) if records.is_empty() => {
            format!("No recovery data found for the past {} days.", days)
        }
        Ok((records, start, end)) => recovery_trends_report(&records, days, start, end),
        Err(message) => message,
    }
}

pub fn strain_trends_report(
    records: &[CycleRecord],
    days: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let strain_values: Vec<f64> = records.iter().filter_map(|r| r.score().strain).collect();
    let strains: Vec<Option<f64>> = strain_values.iter().copied().map(Some).collect();
    let avg_hr: Vec<Option<f64>> = records.iter().map(|r| r.score().average_heart_rate).collect();
    let max_hr: Vec<Option<f64>> = records.iter().map(|r| r.score().max_heart_rate).collect();
    let calories: Vec<Option<f64>> = records
        .iter()
        .map(|r| or_zero(r.score().kilojoule))
        .filter(|kj| *kj > 0.0)
        .map(|kj| Some(kj / KJ_PER_KCAL))
        .collect();

    let strain_stats = trend_statistics(&strains);
    let avg_hr_stats = trend_statistics(&avg_hr);
    let max_hr_stats = trend_statistics(&max_hr).unwrap_or_default();
    let calories_stats = trend_statistics(&calories);

    let total_strain: f64 = strain_values.iter().sum();
    let weekly_average = if days >= 7 {
        total_strain / (f64::from(days) / 7.0)
    } else {
        total_strain / f64::from(days)
    };

    let high = strain_values.iter().filter(|s| **s >= 15.0).count();
    let moderate = strain_values.iter().filter(|s| (10.0..15.0).contains(*s)).count();
    let low = strain_values.iter().filter(|s| **s < 10.0).count();
    let n = strain_values.len();

    let mut out = header(RULE, &format!("🔥 STRAIN TRENDS ANALYSIS ({} days)", days), start, end);
    out.push_str(&format!("📊 Data Points: {} training days\n\n", records.len()));

    out.push_str(&format!(
        "📋 TRAINING LOAD OVERVIEW\nTotal Strain: {:.1}\nWeekly Average: {:.1}\nDaily Average: {:.1}\n\n\
         Strain Distribution:\n  \
         High (15.0-21.0): {} days ({:.1}%)\n  \
         Moderate (10.0-14.9): {} days ({:.1}%)\n  \
         Low (0-9.9): {} days ({:.1}%)\n\n",
        total_strain,
        weekly_average,
        strain_stats.map(|s| s.average).unwrap_or(0.0),
        high,
        percent_of(high, n),
        moderate,
        percent_of(moderate, n),
        low,
        percent_of(low, n),
    ));

    match &strain_stats {
        Ok(s) => out.push_str(&format!(
            "🔥 STRAIN TRENDS {}\nAverage: {:.1}/21.0\nRange: {:.1} - {:.1}\nTrend: {} ({:+.2} per day)\nStability: {}\n\n",
            s.trend_direction.emoji(),
            s.average,
            s.minimum,
            s.maximum,
            s.trend_direction.label(),
            s.trend,
            s.stability.label(),
        )),
        Err(_) => out.push_str("🔥 STRAIN TRENDS\nInsufficient data available.\n\n"),
    }

    match &avg_hr_stats {
        Ok(s) => out.push_str(&format!(
            "❤️ HEART RATE TRENDS\nAverage HR: {} bpm (Range: {}-{})\nMax HR: {} bpm (Range: {}-{})\nHR Stability: {}\n\n",
            s.average as i64,
            s.minimum as i64,
            s.maximum as i64,
            max_hr_stats.average as i64,
            max_hr_stats.minimum as i64,
            max_hr_stats.maximum as i64,
            s.stability.label(),
        )),
        Err(_) => out.push_str("❤️ HEART RATE TRENDS\nInsufficient data available.\n\n"),
    }

    match &calories_stats {
        Ok(s) => out.push_str(&format!(
            "⚡ ENERGY EXPENDITURE\nDaily Average: {} kcal\nRange: {} - {} kcal\nWeekly Total: {} kcal\n\n",
            s.average as i64,
            s.minimum as i64,
            s.maximum as i64,
            (s.average * 7.0) as i64,
        )),
        Err(_) => out.push_str("⚡ ENERGY EXPENDITURE\nInsufficient data available.\n\n"),
    }

    out.push_str("🎯 TRAINING INSIGHTS & RECOMMENDATIONS\n");
    if let Ok(s) = &strain_stats {
        out.push_str(if s.average >= 15.0 {
            "• High training load detected - monitor recovery closely\n"
        } else if s.average >= 12.0 {
            "• Moderate to high training load - good for building fitness\n"
        } else if s.average >= 8.0 {
            "• Moderate training load - well-balanced approach\n"
        } else {
            "• Low training load - consider increasing intensity if recovery allows\n"
        });

        match s.trend_direction {
            TrendDirection::Improving => out.push_str(
                "• Increasing strain trend - ensure recovery keeps pace with training load\n",
            ),
            TrendDirection::Declining => out.push_str(
                "• Decreasing strain trend - good for recovery periods or deload weeks\n",
            ),
            _ => {}
        }

        match s.stability {
            Stability::Low => out.push_str(
                "• High strain variability - consider more consistent training patterns\n",
            ),
            Stability::High => {
                out.push_str("• Consistent strain levels - excellent training discipline\n")
            }
            _ => {}
        }

        let days_f = f64::from(days);
        out.push_str(if high as f64 > days_f * 0.3 {
            "• High percentage of high-strain days - prioritize recovery\n"
        } else if low as f64 > days_f * 0.5 {
            "• Many low-strain days - opportunity to increase training intensity\n"
        } else {
            "• Good strain distribution balance between work and recovery\n"
        });
    }

    if days >= 7 {
        out.push_str(if weekly_average < 50.0 {
            "• Weekly load is conservative - good for recovery blocks\n"
        } else if weekly_average > 90.0 {
            "• High weekly load - monitor fatigue and recovery metrics\n"
        } else {
            "• Balanced weekly training load for sustainable progress\n"
        });
    }

    out.push('\n');
    out.push_str(&"=".repeat(RULE));
    out
}

pub async fn strain_trends(api: &dyn WhoopApi, days: Option<i64>, end_date: Option<&str>) -> String {
    let days = clamp_days(days, 14, 2, 60);
    match load_window::<CycleRecord>(api, endpoints::CYCLE, "cycle", days, end_date).await {
        Ok((records, _, _)) if records.is_empty() => {
            format!("No cycle data found for the past {} days.", days)
        }
        Ok((records, start, end)) => strain_trends_report(&records, days, start, end),
        Err(message) => message,
    }
}

fn hours_minutes(hours: f64) -> String {
    format!("{}h {}m", hours.trunc() as i64, ((hours % 1.0) * 60.0).trunc() as i64)
}

fn quality_label(average: f64, excellent: f64, good: f64, fair: f64) -> &'static str {
    if average < excellent {
        "Excellent"
    } else if average < good {
        "Good"
    } else if average < fair {
        "Fair"
    } else {
        "Needs Improvement"
    }
}

pub fn sleep_trends_report(
    records: &[SleepRecord],
    days: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let efficiency_values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.score().sleep_efficiency_percentage)
        .collect();
    let efficiency: Vec<Option<f64>> = efficiency_values.iter().copied().map(Some).collect();
    let performance: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.score().sleep_performance_percentage)
        .collect();
    let duration: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.stages().total_sleep_milli())
        .filter(|ms| *ms > 0.0)
        .map(|ms| Some(ms / 3_600_000.0))
        .collect();
    let latency: Vec<Option<f64>> = records
        .iter()
        .map(|r| or_zero(r.stages().sleep_latency_milli))
        .filter(|ms| *ms > 0.0)
        .map(|ms| Some(ms / 60_000.0))
        .collect();
    let disturbances: Vec<Option<f64>> = records
        .iter()
        .map(|r| Some(or_zero(r.stages().disturbance_count)))
        .collect();

    let efficiency_stats = trend_statistics(&efficiency);
    let performance_stats = trend_statistics(&performance);
    let duration_stats = trend_statistics(&duration);
    let latency_stats = trend_statistics(&latency);
    let disturbance_stats = trend_statistics(&disturbances);

    let excellent = efficiency_values.iter().filter(|e| **e >= 85.0).count();
    let good = efficiency_values.iter().filter(|e| (75.0..85.0).contains(*e)).count();
    let fair = efficiency_values.iter().filter(|e| (65.0..75.0).contains(*e)).count();
    let poor = efficiency_values.iter().filter(|e| **e < 65.0).count();
    let nights = efficiency_values.len();

    let mut out = header(RULE, &format!("😴 SLEEP TRENDS ANALYSIS ({} days)", days), start, end);
    out.push_str(&format!("📊 Data Points: {} sleep sessions\n\n", records.len()));

    if nights > 0 {
        out.push_str(&format!(
            "📋 SLEEP QUALITY OVERVIEW\nSleep Quality Distribution:\n  \
             Excellent (≥85%): {} nights ({:.1}%)\n  \
             Good (75-84%): {} nights ({:.1}%)\n  \
             Fair (65-74%): {} nights ({:.1}%)\n  \
             Poor (<65%): {} nights ({:.1}%)\n\n",
            excellent,
            percent_of(excellent, nights),
            good,
            percent_of(good, nights),
            fair,
            percent_of(fair, nights),
            poor,
            percent_of(poor, nights),
        ));
    }

    for (heading, stats) in [
        ("💤 SLEEP EFFICIENCY TRENDS", &efficiency_stats),
        ("🏆 SLEEP PERFORMANCE TRENDS", &performance_stats),
    ] {
        match stats {
            Ok(s) => out.push_str(&format!(
                "{} {}\nAverage: {:.1}%\nRange: {:.1}% - {:.1}%\nTrend: {} ({:+.2}% per day)\nStability: {}\n\n",
                heading,
                s.trend_direction.emoji(),
                s.average,
                s.minimum,
                s.maximum,
                s.trend_direction.label(),
                s.trend,
                s.stability.label(),
            )),
            Err(_) => out.push_str(&format!("{}\nInsufficient data available.\n\n", heading)),
        }
    }

    match &duration_stats {
        Ok(s) => out.push_str(&format!(
            "⏰ SLEEP DURATION TRENDS\nAverage: {}\nRange: {} - {}\nStability: {}\n\n",
            hours_minutes(s.average),
            hours_minutes(s.minimum),
            hours_minutes(s.maximum),
            s.stability.label(),
        )),
        Err(_) => out.push_str("⏰ SLEEP DURATION TRENDS\nInsufficient data available.\n\n"),
    }

    match &latency_stats {
        Ok(s) => out.push_str(&format!(
            "🕐 SLEEP LATENCY TRENDS\nAverage: {:.0} minutes\nRange: {:.0} - {:.0} minutes\nQuality: {}\n\n",
            s.average,
            s.minimum,
            s.maximum,
            quality_label(s.average, 15.0, 30.0, 45.0),
        )),
        Err(_) => out.push_str("🕐 SLEEP LATENCY TRENDS\nInsufficient data available.\n\n"),
    }

    match &disturbance_stats {
        Ok(s) => out.push_str(&format!(
            "🌙 SLEEP DISTURBANCES\nAverage: {:.1} per night\nRange: {} - {} disturbances\nQuality: {}\n\n",
            s.average,
            s.minimum as i64,
            s.maximum as i64,
            quality_label(s.average, 2.0, 4.0, 6.0),
        )),
        Err(_) => out.push_str("🌙 SLEEP DISTURBANCES\nInsufficient data available.\n\n"),
    }

    out.push_str("🎯 SLEEP OPTIMIZATION INSIGHTS\n");
    if let Ok(s) = &efficiency_stats {
        out.push_str(if s.average >= 85.0 {
            "• Excellent sleep efficiency - you're optimizing recovery well\n"
        } else if s.average >= 75.0 {
            "• Good sleep efficiency - some room for optimization\n"
        } else {
            "• Sleep efficiency below optimal - focus on sleep hygiene improvements\n"
        });
        match s.trend_direction {
            TrendDirection::Improving => {
                out.push_str("• Positive trend! Your sleep optimization efforts are working\n")
            }
            TrendDirection::Declining => out.push_str(
                "• Declining trend - review recent changes in routine or environment\n",
            ),
            _ => {}
        }
        match s.stability {
            Stability::Low => out.push_str(
                "• High variability in sleep quality - focus on consistent bedtime routines\n",
            ),
            Stability::High => {
                out.push_str("• Consistent sleep quality - excellent sleep discipline\n")
            }
            _ => {}
        }
    }

    if let Ok(s) = &duration_stats {
        out.push_str(if s.average < 7.0 {
            "• Sleep duration below recommended 7-9 hours - prioritize more sleep time\n"
        } else if s.average > 9.0 {
            "• Sleep duration above average - ensure quality matches quantity\n"
        } else {
            "• Sleep duration in optimal range - maintain current schedule\n"
        });
    }

    if matches!(&latency_stats, Ok(s) if s.average > 30.0) {
        out.push_str("• Long sleep latency detected - consider relaxation techniques before bed\n");
    }
    if matches!(&disturbance_stats, Ok(s) if s.average > 4.0) {
        out.push_str(
            "• High sleep disturbances - optimize sleep environment (temperature, noise, light)\n",
        );
    }

    if nights > 0 {
        if poor as f64 > nights as f64 * 0.2 {
            out.push_str(
                "• High percentage of poor sleep nights - comprehensive sleep review needed\n",
            );
        } else if excellent as f64 > nights as f64 * 0.6 {
            out.push_str(
                "• Majority of nights are excellent - maintain current sleep practices\n",
            );
        }
    }

    out.push('\n');
    out.push_str(&"=".repeat(RULE));
    out
}

pub async fn sleep_trends(api: &dyn WhoopApi, days: Option<i64>, end_date: Option<&str>) -> String {
    let days = clamp_days(days, 30, 2, 60);
    match load_window::<SleepRecord>(api, endpoints::SLEEP, "sleep", days, end_date).await {
        Ok((records, _, _)) if records.is_empty() => {
            format!("No sleep data found for the past {} days.", days)
        }
        Ok((records, start, end)) => sleep_trends_report(&records, days, start, end),
        Err(message) => message,
    }
}

pub fn recovery_chart_report(
    scores: &[f64],
    days: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let chart = ascii_chart(
        scores,
        &format!("Recovery Score Trends ({} days)", days),
        defaults::ASCII_CHART_WIDTH,
    );
    let series: Vec<Option<f64>> = scores.iter().copied().map(Some).collect();
    let stats = trend_statistics(&series).unwrap_or_default();

    let mut out = header(RULE, "📈 RECOVERY SCORE CHART", start, end);
    out.push_str(&format!(
        "📊 Data Points: {}\n\n{}\n\n📊 STATISTICS:\nAverage: {:.1}%\nRange: {:.1}% - {:.1}%\nTrend: {}\nStability: {}\n\n🎯 Quick Insights:\n",
        scores.len(),
        chart,
        stats.average,
        stats.minimum,
        stats.maximum,
        stats.trend_direction.label(),
        stats.stability.label(),
    ));

    out.push_str(if stats.average >= 67.0 {
        "• Consistently ready for training 💚\n"
    } else if stats.average >= 50.0 {
        "• Generally good recovery levels 💛\n"
    } else {
        "• Focus needed on recovery optimization ❤️\n"
    });
    match stats.trend_direction {
        TrendDirection::Improving => {
            out.push_str("• Positive trend - recovery protocols working! 📈\n")
        }
        TrendDirection::Declining => {
            out.push_str("• Consider adjusting training or recovery strategies 📉\n")
        }
        _ => {}
    }

    out.push('\n');
    out.push_str(&"=".repeat(RULE));
    out
}

pub async fn recovery_chart(api: &dyn WhoopApi, days: Option<i64>, end_date: Option<&str>) -> String {
    let days = clamp_days(days, 14, 3, 30);
    let (records, start, end) =
        match load_window::<RecoveryRecord>(api, endpoints::RECOVERY, "recovery", days, end_date)
            .await
        {
            Ok(window) => window,
            Err(message) => return message,
        };
    if records.is_empty() {
        return format!("No recovery data found for the past {} days.", days);
    }

    let scores: Vec<f64> = records.iter().filter_map(|r| r.score().recovery_score).collect();
    if scores.is_empty() {
        return "No recovery score data available for charting.".to_string();
    }
    recovery_chart_report(&scores, days, start, end)
}

/// Profile inferred from how workouts are spread over sports
pub fn athlete_type(distribution: &[(String, usize)], total: usize) -> String {
    let Some((top_sport, top_count)) = distribution.iter().max_by(|a, b| {
        // Earliest sport wins ties
        a.1.cmp(&b.1).then(std::cmp::Ordering::Greater)
    }) else {
        return "Mixed Training".to_string();
    };

    if percent_of(*top_count, total) >= 70.0 {
        let lower = top_sport.to_lowercase();
        if ["running", "cycling", "swimming", "rowing"].contains(&lower.as_str()) {
            "Endurance Specialist".to_string()
        } else if ["weightlifting", "strength training", "crossfit"].contains(&lower.as_str()) {
            "Strength/Power Specialist".to_string()
        } else {
            format!("{} Specialist", title_case(top_sport))
        }
    } else if distribution.len() >= 3 {
        "Multi-Sport Athlete".to_string()
    } else {
        "Mixed Training".to_string()
    }
}

pub fn workout_trends_report(
    workouts: &[WorkoutRecord],
    days: u32,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    let total = workouts.len();
    let weeks = f64::from(days) / 7.0;

    let mut distribution: Vec<(String, usize)> = Vec::new();
    for workout in workouts {
        let sport = workout.sport_label();
        match distribution.iter_mut().find(|(name, _)| *name == sport) {
            Some((_, count)) => *count += 1,
            None => distribution.push((sport, 1)),
        }
    }

    let positive = |values: Vec<f64>| -> Vec<f64> { values.into_iter().filter(|v| *v > 0.0).collect() };
    let strain_values = positive(workouts.iter().map(|w| or_zero(w.score().strain)).collect());
    let duration_values = positive(workouts.iter().map(|w| w.duration_minutes()).collect());
    let hr_values = positive(workouts.iter().map(|w| or_zero(w.score().average_heart_rate)).collect());
    let calorie_values: Vec<f64> = positive(workouts.iter().map(|w| or_zero(w.score().kilojoule)).collect())
        .into_iter()
        .map(|kj| kj / KJ_PER_KCAL)
        .collect();
    let distance_values: Vec<f64> = positive(workouts.iter().map(|w| or_zero(w.score().distance_meter)).collect())
        .into_iter()
        .map(|m| m / 1000.0)
        .collect();

    let as_series = |values: &[f64]| -> Vec<Option<f64>> { values.iter().copied().map(Some).collect() };
    let strain_stats = trend_statistics(&as_series(&strain_values));
    let duration_stats = trend_statistics(&as_series(&duration_values));
    let hr_stats = trend_statistics(&as_series(&hr_values));

    let frequency = total as f64 / weeks;
    let profile = athlete_type(&distribution, total);

    let mut out = header(
        WIDE_RULE,
        &format!("🏋️ WORKOUT TRENDS & ATHLETIC PROFILING ({} days)", days),
        start,
        end,
    );
    out.push_str(&format!(
        "🏃 Total Workouts: {}\n📊 Training Frequency: {:.1} workouts/week\n🎯 Athletic Profile: {}\n\n",
        total, frequency, profile
    ));

    if !distribution.is_empty() {
        out.push_str("🏆 SPORT DISTRIBUTION\n");
        let mut sorted = distribution.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        for (sport, count) in &sorted {
            out.push_str(&format!(
                "  • {}: {} workouts ({:.1}%)\n",
                title_case(sport),
                count,
                percent_of(*count, total)
            ));
        }
        out.push('\n');
    }

    match &strain_stats {
        Ok(s) => {
            let high = strain_values.iter().filter(|v| **v >= 15.0).count();
            let moderate = strain_values.iter().filter(|v| (10.0..15.0).contains(*v)).count();
            let low = strain_values.iter().filter(|v| **v < 10.0).count();
            let n = strain_values.len();
            out.push_str(&format!(
                "🔥 TRAINING INTENSITY ANALYSIS {}\nAverage Strain: {:.1}/21.0\nRange: {:.1} - {:.1}\nTrend: {} ({:+.2} per day)\n\n\
                 Intensity Distribution:\n  \
                 High Intensity (15.0-21.0): {} workouts ({:.1}%)\n  \
                 Moderate Intensity (10.0-14.9): {} workouts ({:.1}%)\n  \
                 Low Intensity (<10.0): {} workouts ({:.1}%)\n\n",
                s.trend_direction.emoji(),
                s.average,
                s.minimum,
                s.maximum,
                s.trend_direction.label(),
                s.trend,
                high,
                percent_of(high, n),
                moderate,
                percent_of(moderate, n),
                low,
                percent_of(low, n),
            ));
        }
        Err(_) => out.push_str("🔥 TRAINING INTENSITY\nInsufficient strain data available.\n\n"),
    }

    match &duration_stats {
        Ok(s) => {
            let total_hours = duration_values.iter().sum::<f64>() / 60.0;
            out.push_str(&format!(
                "⏱️ TRAINING VOLUME ANALYSIS\nTotal Training Time: {:.1} hours\nWeekly Average: {:.1} hours/week\nAverage Workout: {:.0} minutes\nRange: {:.0} - {:.0} minutes\n\n",
                total_hours,
                total_hours / weeks,
                s.average,
                s.minimum,
                s.maximum,
            ));
        }
        Err(_) => out.push_str("⏱️ TRAINING VOLUME\nInsufficient duration data available.\n\n"),
    }

    match &hr_stats {
        Ok(s) => out.push_str(&format!(
            "❤️ CARDIOVASCULAR PATTERNS\nAverage Workout HR: {} bpm\nRange: {} - {} bpm\nConsistency: {}\n\n",
            s.average as i64,
            s.minimum as i64,
            s.maximum as i64,
            s.stability.label(),
        )),
        Err(_) => out.push_str("❤️ CARDIOVASCULAR PATTERNS\nInsufficient heart rate data available.\n\n"),
    }

    if !distance_values.is_empty() {
        let total_km: f64 = distance_values.iter().sum();
        out.push_str(&format!(
            "🏃 PERFORMANCE METRICS\nTotal Distance: {:.1} km\nWeekly Average: {:.1} km/week\nAverage per Workout: {:.1} km\n\n",
            total_km,
            total_km / weeks,
            total_km / distance_values.len() as f64,
        ));
    }

    if !calorie_values.is_empty() {
        let total_kcal: f64 = calorie_values.iter().sum();
        out.push_str(&format!(
            "⚡ ENERGY EXPENDITURE\nTotal Calories: {} kcal\nWeekly Average: {} kcal/week\nAverage per Workout: {} kcal\n\n",
            total_kcal as i64,
            (total_kcal / weeks) as i64,
            (total_kcal / calorie_values.len() as f64) as i64,
        ));
    }

    out.push_str("🎯 ATHLETIC PROFILING & INSIGHTS\n");
    out.push_str(if frequency >= 6.0 {
        "• High-frequency trainer - excellent consistency for elite performance\n"
    } else if frequency >= 4.0 {
        "• Moderate-frequency trainer - good consistency for fitness goals\n"
    } else if frequency >= 2.0 {
        "• Low-moderate frequency - room for increased consistency\n"
    } else {
        "• Low training frequency - consider increasing workout consistency\n"
    });

    if let Ok(s) = &strain_stats {
        out.push_str(if s.average >= 15.0 {
            "• High-intensity focused training - monitor recovery closely\n"
        } else if s.average >= 12.0 {
            "• Moderate-high intensity training - good for fitness building\n"
        } else if s.average >= 8.0 {
            "• Balanced intensity approach - sustainable for long-term progress\n"
        } else {
            "• Lower intensity focus - consider adding higher intensity sessions\n"
        });
        match s.trend_direction {
            TrendDirection::Improving => out.push_str(
                "• Positive training progression - intensity building effectively\n",
            ),
            TrendDirection::Declining => out.push_str(
                "• Declining intensity trend - may indicate fatigue or detraining\n",
            ),
            _ => {}
        }
    }

    match profile.as_str() {
        "Endurance Specialist" => {
            out.push_str("• Endurance-focused profile - emphasize aerobic base and recovery\n")
        }
        "Strength/Power Specialist" => {
            out.push_str("• Strength/Power profile - focus on recovery between intense sessions\n")
        }
        "Multi-Sport Athlete" => out.push_str(
            "• Cross-training approach - excellent for overall fitness and injury prevention\n",
        ),
        _ => {}
    }

    out.push('\n');
    out.push_str(&"=".repeat(WIDE_RULE));
    out
}

pub async fn workout_trends(
    api: &dyn WhoopApi,
    days: Option<i64>,
    end_date: Option<&str>,
    sport_filter: Option<&str>,
) -> String {
    let days = clamp_days(days, 30, 7, 60);
    let (mut workouts, start, end) =
        match load_window::<WorkoutRecord>(api, endpoints::WORKOUT, "workout", days, end_date)
            .await
        {
            Ok(window) => window,
            Err(message) => return message,
        };
    if workouts.is_empty() {
        return format!("No workout data found for the past {} days.", days);
    }

    if let Some(filter) = sport_filter.map(str::trim).filter(|f| !f.is_empty()) {
        let wanted = filter.to_lowercase();
        workouts.retain(|w| w.sport_label().to_lowercase() == wanted);
        if workouts.is_empty() {
            return format!("No {} workouts found in the past {} days.", filter, days);
        }
    }

    workout_trends_report(&workouts, days, start, end)
}
