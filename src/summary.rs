// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Daily Summary
//!
//! One screen combining the day's sleep, recovery, strain and workout
//! records, with advice that depends on the Eastern-time hour when the
//! summary is for the current cycle.

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use tracing::debug;

use crate::dates;
use crate::errors::{WhoopError, WhoopResult};
use crate::formatters::{fmt_num, KJ_PER_KCAL};
use crate::models::{or_zero, CycleRecord, Page, RecoveryRecord, SleepRecord, WorkoutRecord};
use crate::whoop_client::{self, WhoopApi};

const RULE: usize = 60;

/// Turn `today`/`yesterday`/`YYYY-MM-DD` into a concrete date.
///
/// `Ok(None)` means "the current cycle".
pub fn resolve_date(input: Option<&str>, today: chrono::NaiveDate) -> Result<Option<String>, String> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.to_lowercase().as_str() {
        "today" => Ok(None),
        "yesterday" => Ok(Some((today - Duration::days(1)).format("%Y-%m-%d").to_string())),
        _ => dates::parse_date(raw).map(|d| Some(d.format("%Y-%m-%d").to_string())),
    }
}

/// Records gathered for one summary
pub struct DailyData {
    pub cycle: WhoopResult<Page<CycleRecord>>,
    pub sleep: WhoopResult<Page<SleepRecord>>,
    pub recovery: WhoopResult<Page<RecoveryRecord>>,
    pub workouts: WhoopResult<Vec<WorkoutRecord>>,
}

impl DailyData {
    async fn fetch(api: &dyn WhoopApi, date: Option<&str>) -> Self {
        let workouts = match date {
            Some(date) => whoop_client::workouts_on(api, date).await.map(|p| p.records),
            None => whoop_client::workout(api, None).await.map(|w| w.into_iter().collect()),
        };

        Self {
            cycle: whoop_client::cycle_for(api, date).await,
            sleep: whoop_client::sleep_for(api, date).await,
            recovery: whoop_client::recovery_for(api, date).await,
            workouts,
        }
    }

    fn core_failed(&self) -> bool {
        self.cycle.is_err() || self.sleep.is_err() || self.recovery.is_err()
    }

    fn not_authenticated(&self) -> bool {
        let unauthenticated = |e: Option<&WhoopError>| {
            matches!(e, Some(WhoopError::NotAuthenticated | WhoopError::CorruptToken))
        };
        unauthenticated(self.cycle.as_ref().err())
            && unauthenticated(self.sleep.as_ref().err())
            && unauthenticated(self.recovery.as_ref().err())
    }
}

fn first<T>(result: &WhoopResult<Page<T>>) -> Option<&T> {
    result.as_ref().ok().and_then(|page| page.first())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimePeriod {
    Day,
    Evening,
    Night,
}

impl TimePeriod {
    fn at(hour: u32) -> Self {
        match hour {
            6..=17 => TimePeriod::Day,
            18..=22 => TimePeriod::Evening,
            _ => TimePeriod::Night,
        }
    }

    fn banner(&self) -> &'static str {
        match self {
            TimePeriod::Day => "☀️ DAYTIME",
            TimePeriod::Evening => "🌙 EVENING",
            TimePeriod::Night => "🌙 NIGHTTIME",
        }
    }
}

fn efficiency_quality(efficiency: f64) -> &'static str {
    if efficiency > 85.0 {
        "Excellent"
    } else if efficiency > 75.0 {
        "Good"
    } else if efficiency > 65.0 {
        "Fair"
    } else {
        "Poor"
    }
}

fn sleep_section(sleep: Option<&SleepRecord>) -> String {
    let mut out = "😴 SLEEP DATA\n".to_string();
    let Some(sleep) = sleep else {
        out.push_str("Sleep data not available for this period.\n\n");
        return out;
    };

    let hours = sleep.stages().total_sleep_milli() / 3_600_000.0;
    let score = sleep.score();
    out.push_str(&format!(
        "Duration: {}h {}m\n",
        hours.trunc() as i64,
        ((hours % 1.0) * 60.0).trunc() as i64
    ));
    if let Some(efficiency) = score.sleep_efficiency_percentage {
        out.push_str(&format!("Efficiency: {:.1}%\n", efficiency));
    }
    if let Some(performance) = score.sleep_performance_percentage {
        out.push_str(&format!("Performance: {:.1}%\n", performance));
    }
    if let Some(efficiency) = score.sleep_efficiency_percentage {
        out.push_str(&format!("Quality: {}\n", efficiency_quality(efficiency)));
    }
    out.push('\n');
    out
}

fn recovery_section(recovery: Option<&RecoveryRecord>) -> String {
    let mut out = "💚 RECOVERY\n".to_string();
    let Some(recovery) = recovery else {
        out.push_str("Recovery data not available for this period.\n\n");
        return out;
    };

    let score = recovery.score();
    if let Some(value) = score.recovery_score {
        let (heart, status) = if value >= 67.0 {
            ("💚", "Ready")
        } else if value >= 34.0 {
            ("💛", "Caution")
        } else {
            ("❤️", "Not Ready")
        };
        out.push_str(&format!("Recovery Score: {} {}% ({})\n", heart, fmt_num(value), status));
    }
    if let Some(hrv) = score.hrv_rmssd_milli {
        // Some payloads report HRV in seconds
        let millis = if hrv < 1.0 { hrv * 1000.0 } else { hrv };
        out.push_str(&format!("HRV: {}ms\n", millis as i64));
    }
    if let Some(rhr) = score.resting_heart_rate {
        out.push_str(&format!("Resting Heart Rate: {} bpm\n", rhr as i64));
    }
    if score.recovery_score.is_none()
        && score.hrv_rmssd_milli.is_none()
        && score.resting_heart_rate.is_none()
    {
        let state = recovery.score_state.as_deref().unwrap_or("Unknown");
        out.push_str(&format!("Recovery not yet scored (state: {})\n", state));
    }
    out.push('\n');
    out
}

fn strain_section(cycle: Option<&CycleRecord>) -> String {
    let mut out = "🔥 STRAIN\n".to_string();
    let Some(cycle) = cycle else {
        out.push_str("Strain data not available for this period.\n\n");
        return out;
    };

    let score = cycle.score();
    if let Some(strain) = score.strain {
        out.push_str(&format!("Daily Strain: {:.1} / 21.0\n", strain));
    }
    if let Some(hr) = score.average_heart_rate {
        out.push_str(&format!("Average Heart Rate: {} bpm\n", hr as i64));
    }
    if let Some(hr) = score.max_heart_rate {
        out.push_str(&format!("Max Heart Rate: {} bpm\n", hr as i64));
    }
    out.push('\n');
    out
}

fn workout_section(workouts: &[WorkoutRecord]) -> String {
    let mut out = "💪 WORKOUTS\n".to_string();
    let Some(workout) = workouts.first() else {
        out.push_str("No workouts recorded for this period.\n\n");
        return out;
    };

    if workouts.len() > 1 {
        out.push_str(&format!("Workouts: {}\n", workouts.len()));
    }

    let score = workout.score();
    let minutes = workout.duration_minutes();
    out.push_str(&format!("Sport: {}\n", workout.sport_label()));
    if minutes > 0.0 {
        out.push_str(&format!(
            "Duration: {}h {}m ({:.1} minutes)\n",
            (minutes / 60.0).trunc() as i64,
            (minutes % 60.0).trunc() as i64,
            minutes
        ));
    }
    if let Some(strain) = score.strain {
        out.push_str(&format!("Strain: {:.1}/21.0\n", strain));
    }
    let kilojoules = or_zero(score.kilojoule);
    if kilojoules > 0.0 {
        out.push_str(&format!("Calories: {:.0} kcal\n", kilojoules / KJ_PER_KCAL));
    }
    out.push('\n');
    out
}

fn recommendations(
    period: TimePeriod,
    hour: u32,
    recovery: Option<&RecoveryRecord>,
    cycle: Option<&CycleRecord>,
) -> String {
    let mut out = format!("🎯 {} RECOMMENDATIONS\n", period.banner());
    let strain = cycle.and_then(|c| c.score().strain);
    let current = |strain: Option<f64>, target: &str| -> String {
        strain
            .map(|s| format!("• Target Strain: {} (Current: {:.1}/21.0)\n", target, s))
            .unwrap_or_default()
    };

    match period {
        TimePeriod::Night => {
            out.push_str("• This is prime recovery time - prioritize rest and sleep\n");
            if hour >= 23 || hour < 4 {
                out.push_str(
                    "• Your body is in deep recovery mode. Consider sleep if you haven't already\n",
                );
            } else {
                out.push_str("• Recovery data from last night's sleep should be available soon\n");
                out.push_str("• Light movement like stretching can help start your day\n");
            }
        }
        TimePeriod::Day => {
            match recovery.and_then(|r| r.score().recovery_score) {
                Some(score) => {
                    let pct = fmt_num(score);
                    let (line, target) = if score >= 67.0 {
                        (
                            format!("• Green Recovery ({}%): Ready for high-intensity training\n", pct),
                            "14.0-18.0",
                        )
                    } else if score >= 34.0 {
                        (
                            format!("• Yellow Recovery ({}%): Moderate training recommended\n", pct),
                            "10.0-14.0",
                        )
                    } else {
                        (
                            format!("• Red Recovery ({}%): Prioritize rest and recovery\n", pct),
                            "Below 10.0",
                        )
                    };
                    out.push_str(&line);
                    out.push_str(&current(strain, target));
                }
                None => out.push_str(
                    "• Recovery data processing. Listen to your body for training intensity.\n",
                ),
            }
            if hour < 12 {
                out.push_str("• Morning is ideal for challenging workouts if recovery allows\n");
            }
        }
        TimePeriod::Evening => {
            out.push_str("• Focus on recovery and sleep preparation\n");
            out.push_str("• Consider a wind-down routine to optimize tomorrow's recovery\n");
            if let Some(strain) = strain.filter(|s| *s > 14.0) {
                out.push_str(&format!(
                    "• Your strain was high today ({:.1}). Prioritize quality sleep for recovery.\n",
                    strain
                ));
            }
        }
    }
    out
}

/// Render the summary; `now` is the Eastern-time clock used for advice
pub fn compose_summary(data: &DailyData, date: Option<&str>, now: DateTime<FixedOffset>) -> String {
    let (title, context) = match date {
        Some(date) => (
            format!("Summary for {}", date),
            format!("📅 **HISTORICAL DATA**: Showing data for {}", date),
        ),
        None => (
            "Today's Summary".to_string(),
            format!(
                "🟢 **CURRENT CYCLE**: Your most recent physiological cycle\nCurrent Time: {} EST",
                now.format("%I:%M %p")
            ),
        ),
    };

    let rule = "=".repeat(RULE);
    let mut out = format!("\n{}\n📅 {}\n{}\n\n{}\n\n", rule, title, rule, context);

    let cycle = first(&data.cycle);
    let recovery = first(&data.recovery);
    let workouts: &[WorkoutRecord] = data.workouts.as_deref().unwrap_or(&[]);

    out.push_str(&sleep_section(first(&data.sleep)));
    out.push_str(&recovery_section(recovery));
    out.push_str(&strain_section(cycle));
    out.push_str(&workout_section(workouts));

    if date.is_none() {
        let hour = now.hour();
        out.push_str(&recommendations(TimePeriod::at(hour), hour, recovery, cycle));
    } else {
        out.push_str("🎯 📅 HISTORICAL SUMMARY\n");
        out.push_str("• This represents a completed physiological cycle from the past\n");
    }
    out
}

/// `get_daily_summary`: falls back to the current cycle when a past date
/// cannot be fetched
pub async fn daily_summary(api: &dyn WhoopApi, date: Option<&str>) -> String {
    let now = dates::now_eastern();
    let mut resolved = match resolve_date(date, now.date_naive()) {
        Ok(resolved) => resolved,
        Err(message) => return message,
    };

    let mut data = DailyData::fetch(api, resolved.as_deref()).await;
    if data.not_authenticated() {
        return WhoopError::NotAuthenticated.to_string();
    }
    if resolved.is_some() && data.core_failed() {
        debug!("Historical fetch failed, falling back to current cycle");
        data = DailyData::fetch(api, None).await;
        resolved = None;
    }

    compose_summary(&data, resolved.as_deref(), now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn at_hour(hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, hour, 30, 0)
            .unwrap()
    }

    fn page<T: serde::de::DeserializeOwned>(records: serde_json::Value) -> WhoopResult<Page<T>> {
        Ok(serde_json::from_value(json!({ "records": records })).unwrap())
    }

    fn sample() -> DailyData {
        DailyData {
            cycle: page(json!([{"score": {"strain": 15.26, "average_heart_rate": 72.4, "max_heart_rate": 171}}])),
            sleep: page(json!([{"score": {
                "sleep_efficiency_percentage": 88.0,
                "sleep_performance_percentage": 91.0,
                "stage_summary": {"total_light_sleep_time_milli": 27_000_000}
            }}])),
            recovery: page(json!([{"score": {"recovery_score": 72, "hrv_rmssd_milli": 0.0625, "resting_heart_rate": 51.8}}])),
            workouts: Ok(vec![serde_json::from_value(json!({
                "sport_name": "Running",
                "start": "2024-01-15T12:00:00Z",
                "end": "2024-01-15T12:45:00Z",
                "score": {"strain": 11.0, "kilojoule": 2092}
            }))
            .unwrap()]),
        }
    }

    #[test]
    fn test_resolve_date() {
        assert_eq!(resolve_date(None, today()), Ok(None));
        assert_eq!(resolve_date(Some("Today"), today()), Ok(None));
        assert_eq!(
            resolve_date(Some("yesterday"), today()),
            Ok(Some("2024-01-14".to_string()))
        );
        assert_eq!(
            resolve_date(Some("2024-01-10"), today()),
            Ok(Some("2024-01-10".to_string()))
        );
        assert!(resolve_date(Some("last week"), today()).is_err());
    }

    #[test]
    fn test_time_periods() {
        assert_eq!(TimePeriod::at(6), TimePeriod::Day);
        assert_eq!(TimePeriod::at(17), TimePeriod::Day);
        assert_eq!(TimePeriod::at(18), TimePeriod::Evening);
        assert_eq!(TimePeriod::at(22), TimePeriod::Evening);
        assert_eq!(TimePeriod::at(23), TimePeriod::Night);
        assert_eq!(TimePeriod::at(5), TimePeriod::Night);
    }

    #[test]
    fn test_current_cycle_summary_in_the_morning() {
        let text = compose_summary(&sample(), None, at_hour(9));
        assert!(text.contains("📅 Today's Summary\n"));
        assert!(text.contains("Current Time: 09:30 AM EST"));
        assert!(text.contains("Duration: 7h 30m\nEfficiency: 88.0%\nPerformance: 91.0%\nQuality: Excellent\n"));
        assert!(text.contains("Recovery Score: 💚 72% (Ready)\nHRV: 62ms\nResting Heart Rate: 51 bpm\n"));
        assert!(text.contains("Daily Strain: 15.3 / 21.0\nAverage Heart Rate: 72 bpm\n"));
        assert!(text.contains("Sport: Running\nDuration: 0h 45m (45.0 minutes)\nStrain: 11.0/21.0\nCalories: 500 kcal\n"));
        assert!(text.contains("🎯 ☀️ DAYTIME RECOMMENDATIONS\n"));
        assert!(text.contains("• Green Recovery (72%): Ready for high-intensity training\n"));
        assert!(text.contains("• Target Strain: 14.0-18.0 (Current: 15.3/21.0)\n"));
        assert!(text.contains("• Morning is ideal"));
    }

    #[test]
    fn test_evening_mentions_high_strain() {
        let text = compose_summary(&sample(), None, at_hour(20));
        assert!(text.contains("🎯 🌙 EVENING RECOMMENDATIONS\n"));
        assert!(text.contains("• Your strain was high today (15.3)."));
    }

    #[test]
    fn test_historical_summary_with_missing_sections() {
        let data = DailyData {
            cycle: Err(WhoopError::Http { status: 500, body: String::new() }),
            sleep: page(json!([])),
            recovery: page(json!([])),
            workouts: Ok(Vec::new()),
        };
        let text = compose_summary(&data, Some("2024-01-10"), at_hour(9));
        assert!(text.contains("📅 Summary for 2024-01-10\n"));
        assert!(text.contains("Sleep data not available for this period."));
        assert!(text.contains("Recovery data not available for this period."));
        assert!(text.contains("Strain data not available for this period."));
        assert!(text.contains("No workouts recorded for this period."));
        assert!(text.ends_with("• This represents a completed physiological cycle from the past\n"));
    }
}
