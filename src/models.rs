// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # WHOOP Data Models
//!
//! Typed views of the WHOOP v2 resources. Every numeric field is optional
//! because the API omits or nulls values for unscored or partial records;
//! callers read them through [`or_zero`] instead of sprinkling defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single "default if absent" rule used across formatters and analyses
pub fn or_zero<T: Default>(value: Option<T>) -> T {
    value.unwrap_or_default()
}

/// Parse an RFC 3339 timestamp as sent by WHOOP
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Paginated collection response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default, rename = "nextToken", alias = "next_token")]
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn first(&self) -> Option<&T> {
        self.records.first()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub nap: Option<bool>,
    #[serde(default)]
    pub score_state: Option<String>,
    #[serde(default)]
    pub score: Option<SleepScore>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SleepScore {
    #[serde(default)]
    pub stage_summary: Option<StageSummary>,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
    #[serde(default)]
    pub sleep_performance_percentage: Option<f64>,
    #[serde(default)]
    pub sleep_consistency_percentage: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency_percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageSummary {
    #[serde(default)]
    pub total_in_bed_time_milli: Option<f64>,
    #[serde(default)]
    pub total_awake_time_milli: Option<f64>,
    #[serde(default)]
    pub total_light_sleep_time_milli: Option<f64>,
    #[serde(default)]
    pub total_slow_wave_sleep_time_milli: Option<f64>,
    #[serde(default)]
    pub total_rem_sleep_time_milli: Option<f64>,
    #[serde(default)]
    pub sleep_cycle_count: Option<f64>,
    #[serde(default)]
    pub disturbance_count: Option<f64>,
    #[serde(default)]
    pub sleep_latency_milli: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency_score: Option<f64>,
    #[serde(default)]
    pub sleep_consistency_score: Option<f64>,
    #[serde(default)]
    pub sleep_need_score: Option<f64>,
}

impl SleepRecord {
    pub fn score(&self) -> SleepScore {
        or_zero(self.score)
    }

    pub fn stages(&self) -> StageSummary {
        or_zero(self.score().stage_summary)
    }

    pub fn is_nap(&self) -> bool {
        self.nap.unwrap_or(false)
    }
}

impl StageSummary {
    /// Light + deep + REM, in milliseconds
    pub fn total_sleep_milli(&self) -> f64 {
        or_zero(self.total_light_sleep_time_milli)
            + or_zero(self.total_slow_wave_sleep_time_milli)
            + or_zero(self.total_rem_sleep_time_milli)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryRecord {
    #[serde(default)]
    pub cycle_id: Option<Value>,
    #[serde(default)]
    pub sleep_id: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub score_state: Option<String>,
    #[serde(default)]
    pub score: Option<RecoveryScore>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecoveryScore {
    #[serde(default)]
    pub user_calibrating: Option<bool>,
    #[serde(default)]
    pub recovery_score: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
    #[serde(default)]
    pub hrv_rmssd_milli: Option<f64>,
    #[serde(default)]
    pub spo2_percentage: Option<f64>,
    #[serde(default)]
    pub skin_temp_celsius: Option<f64>,
    #[serde(default)]
    pub cardiovascular_load: Option<f64>,
    #[serde(default)]
    pub musculoskeletal_load: Option<f64>,
    #[serde(default)]
    pub metabolic_load: Option<f64>,
    #[serde(default)]
    pub recovery_quality_score: Option<f64>,
    #[serde(default)]
    pub recovery_need_score: Option<f64>,
}

impl RecoveryRecord {
    pub fn score(&self) -> RecoveryScore {
        or_zero(self.score)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkoutRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub sport_id: Option<i64>,
    #[serde(default)]
    pub sport_name: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub score_state: Option<String>,
    #[serde(default)]
    pub score: Option<WorkoutScore>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkoutScore {
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
    #[serde(default)]
    pub kilojoule: Option<f64>,
    #[serde(default)]
    pub percent_recorded: Option<f64>,
    #[serde(default)]
    pub distance_meter: Option<f64>,
    #[serde(default)]
    pub altitude_gain_meter: Option<f64>,
    #[serde(default)]
    pub altitude_change_meter: Option<f64>,
    #[serde(default, alias = "zone_durations")]
    pub zone_duration: Option<ZoneDurations>,
}

/// Time in each heart-rate zone, in milliseconds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZoneDurations {
    #[serde(default)]
    pub zone_zero_milli: Option<f64>,
    #[serde(default)]
    pub zone_one_milli: Option<f64>,
    #[serde(default)]
    pub zone_two_milli: Option<f64>,
    #[serde(default)]
    pub zone_three_milli: Option<f64>,
    #[serde(default)]
    pub zone_four_milli: Option<f64>,
    #[serde(default)]
    pub zone_five_milli: Option<f64>,
}

impl ZoneDurations {
    /// Zones 0 through 5 in order
    pub fn as_array(&self) -> [f64; 6] {
        [
            or_zero(self.zone_zero_milli),
            or_zero(self.zone_one_milli),
            or_zero(self.zone_two_milli),
            or_zero(self.zone_three_milli),
            or_zero(self.zone_four_milli),
            or_zero(self.zone_five_milli),
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

impl WorkoutRecord {
    pub fn score(&self) -> WorkoutScore {
        or_zero(self.score)
    }

    pub fn zones(&self) -> ZoneDurations {
        or_zero(self.score().zone_duration)
    }

    /// `sport_name`, or `Sport {id}` when WHOOP did not send one
    pub fn sport_label(&self) -> String {
        match &self.sport_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Sport {}", or_zero(self.sport_id)),
        }
    }

    /// Minutes between start and end, zero when either is missing or unparseable
    pub fn duration_minutes(&self) -> f64 {
        let start = self.start.as_deref().and_then(parse_timestamp);
        let end = self.end.as_deref().and_then(parse_timestamp);
        match (start, end) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 60_000.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub score_state: Option<String>,
    #[serde(default)]
    pub score: Option<CycleScore>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CycleScore {
    #[serde(default)]
    pub strain: Option<f64>,
    #[serde(default)]
    pub kilojoule: Option<f64>,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
}

impl CycleRecord {
    pub fn score(&self) -> CycleScore {
        or_zero(self.score)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BodyMeasurement {
    #[serde(default)]
    pub height_meter: Option<f64>,
    #[serde(default)]
    pub weight_kilogram: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
    #[serde(default)]
    pub vo2_max: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
    #[serde(default)]
    pub hrv_baseline: Option<f64>,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub muscle_mass_kg: Option<f64>,
    #[serde(default)]
    pub bone_mass_kg: Option<f64>,
    #[serde(default)]
    pub hydration_percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nulls_and_missing_fields_default_to_zero() {
        let record: SleepRecord = serde_json::from_value(json!({
            "start": "2024-01-15T03:00:00.000Z",
            "score": {"stage_summary": {"total_light_sleep_time_milli": null}}
        }))
        .unwrap();

        assert_eq!(or_zero(record.stages().total_light_sleep_time_milli), 0.0);
        assert_eq!(record.stages().total_sleep_milli(), 0.0);
        assert!(!record.is_nap());

        let empty: RecoveryRecord = serde_json::from_value(json!({"score": null})).unwrap();
        assert_eq!(or_zero(empty.score().recovery_score), 0.0);
    }

    #[test]
    fn test_page_accepts_both_cursor_spellings() {
        let camel: Page<CycleRecord> =
            serde_json::from_value(json!({"records": [], "nextToken": "a"})).unwrap();
        let snake: Page<CycleRecord> =
            serde_json::from_value(json!({"records": [], "next_token": "b"})).unwrap();
        let none: Page<CycleRecord> = serde_json::from_value(json!({})).unwrap();

        assert_eq!(camel.next_token.as_deref(), Some("a"));
        assert_eq!(snake.next_token.as_deref(), Some("b"));
        assert!(none.records.is_empty() && none.next_token.is_none());
    }

    #[test]
    fn test_workout_helpers() {
        let workout: WorkoutRecord = serde_json::from_value(json!({
            "sport_id": 44,
            "start": "2024-01-15T12:00:00.000Z",
            "end": "2024-01-15T13:30:00.000Z",
            "score": {"zone_durations": {"zone_one_milli": 60000, "zone_five_milli": 120000}}
        }))
        .unwrap();

        assert_eq!(workout.sport_label(), "Sport 44");
        assert_eq!(workout.duration_minutes(), 90.0);
        assert_eq!(workout.zones().total(), 180000.0);
        assert_eq!(workout.zones().as_array()[5], 120000.0);
    }
}
