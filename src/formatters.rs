// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Text reports for single WHOOP records.
//!
//! All functions here are pure: the same record always yields the same text.
//! Missing values render as zero (or `N/A` where zero would mislead).

use std::collections::BTreeMap;

use crate::dates::{format_duration_millis, format_optional};
use crate::errors::WhoopError;
use crate::models::{
    or_zero, BodyMeasurement, CycleRecord, Page, RecoveryRecord, SleepRecord, UserProfile,
    WorkoutRecord,
};

pub const KJ_PER_KCAL: f64 = 4.184;
pub const METERS_PER_MILE: f64 = 1609.34;
pub const FEET_PER_METER: f64 = 3.28084;
pub const LBS_PER_KG: f64 = 2.20462;
pub const INCHES_PER_METER: f64 = 39.37;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Render a whole number without a trailing `.0`
pub fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `12345.6` -> `"12,346"`
pub fn with_commas(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn recovery_band(score: f64) -> &'static str {
    if score >= 67.0 {
        "Green (High)"
    } else if score >= 34.0 {
        "Yellow (Medium)"
    } else {
        "Red (Low)"
    }
}

pub fn strain_band(strain: f64) -> &'static str {
    if strain >= 18.0 {
        "All Out (18.0-21.0)"
    } else if strain >= 14.0 {
        "Strenuous (14.0-17.9)"
    } else if strain >= 10.0 {
        "Moderate (10.0-13.9)"
    } else if strain >= 4.0 {
        "Light (4.0-9.9)"
    } else {
        "Minimal (0-3.9)"
    }
}

/// Text for a failed fetch. Authentication problems get the standard
/// instruction instead of a resource-specific prefix.
pub fn fetch_error(resource: &str, error: &WhoopError) -> String {
    match error {
        WhoopError::NotAuthenticated | WhoopError::CorruptToken => {
            WhoopError::NotAuthenticated.to_string()
        }
        other => format!("Error fetching {} data: {}", resource, other),
    }
}

/// Format a fetch result with `render`, or explain why it failed
pub fn render<T>(
    result: Result<T, WhoopError>,
    resource: &str,
    render: impl FnOnce(&T) -> String,
) -> String {
    match result {
        Ok(value) => render(&value),
        Err(e) => fetch_error(resource, &e),
    }
}

fn hours_and_minutes(hours: f64) -> (i64, i64) {
    (hours.trunc() as i64, ((hours % 1.0) * 60.0).trunc() as i64)
}

pub fn format_sleep_page(page: &Page<SleepRecord>) -> String {
    match page.first() {
        Some(sleep) => format_sleep(sleep),
        None => "No sleep data found for the specified date range.".to_string(),
    }
}

pub fn format_sleep(sleep: &SleepRecord) -> String {
    let score = sleep.score();
    let stages = sleep.stages();

    let total_sleep_hours = stages.total_sleep_milli() / MILLIS_PER_HOUR;
    let in_bed_hours = or_zero(stages.total_in_bed_time_milli) / MILLIS_PER_HOUR;
    let (sleep_h, sleep_m) = hours_and_minutes(total_sleep_hours);
    let (bed_h, bed_m) = hours_and_minutes(in_bed_hours);

    let mut extra = String::new();
    let latency = or_zero(stages.sleep_latency_milli);
    if latency > 0.0 {
        extra.push_str(&format!("Sleep Latency: {}\n", format_duration_millis(latency)));
    }
    for (label, value) in [
        ("Sleep Efficiency Score", stages.sleep_efficiency_score),
        ("Sleep Consistency Score", stages.sleep_consistency_score),
        ("Sleep Need Score", stages.sleep_need_score),
    ] {
        let value = or_zero(value);
        if value > 0.0 {
            extra.push_str(&format!("{}: {}%\n", label, fmt_num(value)));
        }
    }

    let description = if sleep.is_nap() { "Nap" } else { "Night Sleep" };

    format!(
        "\nSleep: {} on {}\n\
         Sleep Performance: {}%\n\
         Sleep Efficiency: {:.1}%\n\
         Sleep Duration: {}h {}m ({:.2} hours)\n\
         Time in Bed: {}h {}m ({:.2} hours)\n\
         {}Started: {}\n\
         Ended: {}\n\
         Light Sleep: {}\n\
         Deep Sleep: {}\n\
         REM Sleep: {}\n\
         Awake: {}\n\
         Sleep Cycles: {}\n\
         Disturbances: {}\n",
        description,
        format_optional(sleep.start.as_deref(), false, "Unknown Date"),
        fmt_num(or_zero(score.sleep_performance_percentage)),
        or_zero(score.sleep_efficiency_percentage),
        sleep_h,
        sleep_m,
        total_sleep_hours,
        bed_h,
        bed_m,
        in_bed_hours,
        extra,
        format_optional(sleep.start.as_deref(), true, "Unknown"),
        format_optional(sleep.end.as_deref(), true, "Unknown"),
        format_duration_millis(or_zero(stages.total_light_sleep_time_milli)),
        format_duration_millis(or_zero(stages.total_slow_wave_sleep_time_milli)),
        format_duration_millis(or_zero(stages.total_rem_sleep_time_milli)),
        format_duration_millis(or_zero(stages.total_awake_time_milli)),
        fmt_num(or_zero(stages.sleep_cycle_count)),
        fmt_num(or_zero(stages.disturbance_count)),
    )
}

pub fn format_recovery_page(page: &Page<RecoveryRecord>) -> String {
    match page.first() {
        Some(recovery) => format_recovery(recovery),
        None => "No recovery data found for the specified date range.".to_string(),
    }
}

pub fn format_recovery(recovery: &RecoveryRecord) -> String {
    let score = recovery.score();
    let recovery_score = or_zero(score.recovery_score);

    let temperature = match score.skin_temp_celsius {
        Some(c) => format!("{:.1}°F ({:.1}°C)", celsius_to_fahrenheit(c), c),
        None => "N/A".to_string(),
    };
    let spo2 = match score.spo2_percentage {
        Some(v) => format!("{}%", fmt_num(v)),
        None => "N/A".to_string(),
    };

    let cardio = or_zero(score.cardiovascular_load);
    let muscle = or_zero(score.musculoskeletal_load);
    let metabolic = or_zero(score.metabolic_load);

    let mut extra = String::new();
    if cardio > 0.0 || muscle > 0.0 || metabolic > 0.0 {
        extra.push_str("Load Analysis:\n");
        for (label, value) in [
            ("Cardiovascular Load", cardio),
            ("Musculoskeletal Load", muscle),
            ("Metabolic Load", metabolic),
        ] {
            if value > 0.0 {
                extra.push_str(&format!("  {}: {}%\n", label, fmt_num(value)));
            }
        }
    }
    for (label, value) in [
        ("Recovery Quality Score", score.recovery_quality_score),
        ("Recovery Need Score", score.recovery_need_score),
    ] {
        let value = or_zero(value);
        if value > 0.0 {
            extra.push_str(&format!("{}: {}%\n", label, fmt_num(value)));
        }
    }

    format!(
        "\nRecovery Status: {}\n\
         Recovery Score: {}%\n\
         Date: {}\n\
         Resting Heart Rate: {} bpm\n\
         Heart Rate Variability: {} ms\n\
         SPO2: {}\n\
         Skin Temperature: {}\n\
         {}Based on: Last Sleep Session\n",
        recovery_band(recovery_score),
        fmt_num(recovery_score),
        format_optional(recovery.created_at.as_deref(), false, "Unknown Date"),
        fmt_num(or_zero(score.resting_heart_rate)),
        fmt_num(or_zero(score.hrv_rmssd_milli)),
        spo2,
        temperature,
        extra,
    )
}

pub fn format_workout_option(workout: Option<&WorkoutRecord>) -> String {
    match workout {
        Some(workout) => format_workout(workout),
        None => "No workout data found for the specified criteria.".to_string(),
    }
}

pub fn format_workout(workout: &WorkoutRecord) -> String {
    let score = workout.score();
    let duration = workout.duration_minutes();
    let kilojoules = or_zero(score.kilojoule);
    let strain = or_zero(score.strain);

    let distance = score
        .distance_meter
        .map(|m| format!("Distance: {:.2} miles ({}m)\n", m / METERS_PER_MILE, with_commas(m)))
        .unwrap_or_default();

    let mut elevation = String::new();
    if let Some(gain) = score.altitude_gain_meter {
        elevation.push_str(&format!(
            "Elevation Gain: {:.0}ft ({:.0}m)\n",
            gain * FEET_PER_METER,
            gain
        ));
    }
    if let Some(change) = score.altitude_change_meter {
        elevation.push_str(&format!(
            "Net Elevation: {:+.0}ft ({:+.0}m)\n",
            change * FEET_PER_METER,
            change
        ));
    }

    let recorded = match score.percent_recorded {
        Some(p) if p > 0.0 => p,
        _ => 100.0,
    };
    let quality = if recorded < 100.0 {
        format!("Data Quality: {}% recorded\n", fmt_num(recorded))
    } else {
        String::new()
    };

    let zones = workout.zones().as_array();

    format!(
        "\nWorkout: {} on {}\n\
         Strain Level: {}\n\
         Strain Score: {:.1}/21.0\n\
         Average Heart Rate: {} bpm\n\
         Max Heart Rate: {} bpm\n\
         Duration: {} ({:.1} minutes)\n\
         Calories Burned: {:.0} kcal ({:.0} kJ)\n\
         {}{}{}Started: {}\n\
         Ended: {}\n\
         Zone 0 (Rest): {}\n\
         Zone 1 (50-60%): {}\n\
         Zone 2 (60-70%): {}\n\
         Zone 3 (70-80%): {}\n\
         Zone 4 (80-90%): {}\n\
         Zone 5 (90-100%): {}\n",
        workout.sport_label(),
        format_optional(workout.start.as_deref(), false, "Unknown Date"),
        strain_band(strain),
        strain,
        fmt_num(or_zero(score.average_heart_rate)),
        fmt_num(or_zero(score.max_heart_rate)),
        hours_minutes_label(duration),
        duration,
        kilojoules / KJ_PER_KCAL,
        kilojoules,
        distance,
        elevation,
        quality,
        format_optional(workout.start.as_deref(), true, "Unknown"),
        format_optional(workout.end.as_deref(), true, "Unknown"),
        format_duration_millis(zones[0]),
        format_duration_millis(zones[1]),
        format_duration_millis(zones[2]),
        format_duration_millis(zones[3]),
        format_duration_millis(zones[4]),
        format_duration_millis(zones[5]),
    )
}

/// Always shows hours, unlike `dates::format_duration_minutes`
fn hours_minutes_label(minutes: f64) -> String {
    format!("{}h {}m", (minutes / 60.0).trunc() as i64, (minutes % 60.0).trunc() as i64)
}

pub fn format_cycle_page(page: &Page<CycleRecord>) -> String {
    match page.first() {
        Some(cycle) => format_cycle(cycle),
        None => "No cycle data found for the specified date range.".to_string(),
    }
}

pub fn format_cycle(cycle: &CycleRecord) -> String {
    let score = cycle.score();
    let kilojoules = or_zero(score.kilojoule);
    let strain = or_zero(score.strain);

    format!(
        "\nDay: {}\n\
         Daily Strain Level: {}\n\
         Daily Strain: {:.1}/21.0\n\
         Energy Expenditure: {:.1} kJ ({:.0} kcal)\n\
         Average Heart Rate: {} bpm\n\
         Max Heart Rate: {} bpm\n\
         Status: {}\n",
        format_optional(cycle.start.as_deref(), false, "Unknown Date"),
        strain_band(strain),
        strain,
        kilojoules,
        kilojoules / KJ_PER_KCAL,
        fmt_num(or_zero(score.average_heart_rate)),
        fmt_num(or_zero(score.max_heart_rate)),
        cycle.score_state.as_deref().unwrap_or("Unknown"),
    )
}

fn value_text(value: &Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "Unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn format_profile(profile: &UserProfile) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
    format!(
        "\nName: {} {}\nEmail: {}\nUser ID: {}\n",
        text(&profile.first_name),
        text(&profile.last_name),
        text(&profile.email),
        value_text(&profile.user_id),
    )
}

pub fn format_body_measurement(body: &BodyMeasurement) -> String {
    let height_m = or_zero(body.height_meter);
    let height_in = height_m * INCHES_PER_METER;
    let feet = (height_in / 12.0).trunc() as i64;
    let inches = (height_in % 12.0).round() as i64;
    let weight_kg = or_zero(body.weight_kilogram);

    let mut extra = String::new();
    let vo2 = or_zero(body.vo2_max);
    if vo2 > 0.0 {
        extra.push_str(&format!("VO2 Max: {} ml/kg/min\n", fmt_num(vo2)));
    }
    let rhr = or_zero(body.resting_heart_rate);
    if rhr > 0.0 {
        extra.push_str(&format!("RHR: {} bpm\n", fmt_num(rhr)));
    }
    let hrv = or_zero(body.hrv_baseline);
    if hrv > 0.0 {
        extra.push_str(&format!("HRV Baseline: {} ms\n", fmt_num(hrv)));
    }

    let fat = or_zero(body.body_fat_percentage);
    let muscle = or_zero(body.muscle_mass_kg);
    let bone = or_zero(body.bone_mass_kg);
    let hydration = or_zero(body.hydration_percentage);

    let mut composition = String::new();
    if fat > 0.0 || muscle > 0.0 || bone > 0.0 || hydration > 0.0 {
        composition.push_str("Body Composition:\n");
        if fat > 0.0 {
            composition.push_str(&format!("  Body Fat: {:.1}%\n", fat));
        }
        if muscle > 0.0 {
            composition.push_str(&format!(
                "  Muscle Mass: {:.1} lbs ({:.1} kg)\n",
                muscle * LBS_PER_KG,
                muscle
            ));
        }
        if bone > 0.0 {
            composition.push_str(&format!(
                "  Bone Mass: {:.1} lbs ({:.1} kg)\n",
                bone * LBS_PER_KG,
                bone
            ));
        }
        if hydration > 0.0 {
            composition.push_str(&format!("  Hydration: {:.1}%\n", hydration));
        }
    }

    format!(
        "\nHeight: {}'{}\" ({:.1} cm)\nWeight: {:.1} lbs ({:.1} kg)\nMax Heart Rate: {} bpm\n{}{}\n",
        feet,
        inches,
        height_m * 100.0,
        weight_kg * LBS_PER_KG,
        weight_kg,
        fmt_num(or_zero(body.max_heart_rate)),
        extra,
        composition,
    )
}

/// Distinct sports seen in `workouts`, ordered by sport id
pub fn sports_seen(workouts: &[WorkoutRecord]) -> BTreeMap<i64, String> {
    workouts
        .iter()
        .filter_map(|w| w.sport_id.map(|id| (id, w.sport_label())))
        .collect()
}

pub fn format_sports_mapping(workouts: &[WorkoutRecord]) -> String {
    let sports = sports_seen(workouts);
    if sports.is_empty() {
        return "No sports found in your recent workout history. Try working out with different sports to build the mapping.".to_string();
    }

    let mut out = "WHOOP Sports from your workout history:\n\n".to_string();
    for (id, name) in sports {
        out.push_str(&format!("ID {}: {}\n", id, name));
    }
    out
}

pub fn format_sports_search(workouts: &[WorkoutRecord], query: &str) -> String {
    let needle = query.to_lowercase();
    let matches: Vec<(i64, String)> = sports_seen(workouts)
        .into_iter()
        .filter(|(_, name)| name.to_lowercase().contains(&needle))
        .collect();

    if matches.is_empty() {
        return format!("No matching sports found for '{}' in your workout history.", query);
    }

    let mut out = format!("WHOOP sports matching '{}' from your workout history:\n\n", query);
    for (id, name) in matches {
        out.push_str(&format!("ID {}: {}\n", id, name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sleep_fixture() -> SleepRecord {
        serde_json::from_value(json!({
            "start": "2024-01-15T04:00:00.000Z",
            "end": "2024-01-15T12:00:00.000Z",
            "nap": false,
            "score": {
                "sleep_performance_percentage": 92,
                "sleep_efficiency_percentage": 88.44,
                "stage_summary": {
                    "total_in_bed_time_milli": 28_800_000,
                    "total_awake_time_milli": 1_800_000,
                    "total_light_sleep_time_milli": 12_600_000,
                    "total_slow_wave_sleep_time_milli": 5_400_000,
                    "total_rem_sleep_time_milli": 7_200_000,
                    "sleep_cycle_count": 5,
                    "disturbance_count": 2
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_bands_keep_exact_boundaries() {
        assert_eq!(recovery_band(67.0), "Green (High)");
        assert_eq!(recovery_band(66.9), "Yellow (Medium)");
        assert_eq!(recovery_band(34.0), "Yellow (Medium)");
        assert_eq!(recovery_band(33.9), "Red (Low)");

        assert_eq!(strain_band(18.0), "All Out (18.0-21.0)");
        assert_eq!(strain_band(17.99), "Strenuous (14.0-17.9)");
        assert_eq!(strain_band(10.0), "Moderate (10.0-13.9)");
        assert_eq!(strain_band(4.0), "Light (4.0-9.9)");
        assert_eq!(strain_band(3.9), "Minimal (0-3.9)");
    }

    #[test]
    fn test_number_helpers() {
        assert_eq!(fmt_num(42.0), "42");
        assert_eq!(fmt_num(42.5), "42.5");
        assert_eq!(with_commas(12345.6), "12,346");
        assert_eq!(with_commas(999.0), "999");
        assert_eq!(with_commas(-1234.0), "-1,234");
    }

    #[test]
    fn test_sleep_report() {
        let text = format_sleep(&sleep_fixture());
        assert!(text.starts_with("\nSleep: Night Sleep on Sunday, Jan 14, 2024\n"));
        assert!(text.contains("Sleep Performance: 92%\n"));
        assert!(text.contains("Sleep Efficiency: 88.4%\n"));
        assert!(text.contains("Sleep Duration: 7h 0m (7.00 hours)\n"));
        assert!(text.contains("Time in Bed: 8h 0m (8.00 hours)\n"));
        assert!(text.contains("Light Sleep: 3h 30m\n"));
        assert!(text.contains("Awake: 30m\n"));
        assert!(text.contains("Sleep Cycles: 5\nDisturbances: 2\n"));
        assert!(!text.contains("Sleep Latency"));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let sleep = sleep_fixture();
        assert_eq!(format_sleep(&sleep), format_sleep(&sleep));
    }

    #[test]
    fn test_empty_pages() {
        let page: Page<SleepRecord> = serde_json::from_value(json!({"records": []})).unwrap();
        assert_eq!(format_sleep_page(&page), "No sleep data found for the specified date range.");
        assert_eq!(
            format_workout_option(None),
            "No workout data found for the specified criteria."
        );
    }

    #[test]
    fn test_recovery_report_handles_partial_score() {
        let record: RecoveryRecord = serde_json::from_value(json!({
            "created_at": "2024-01-15T12:00:00.000Z",
            "score": {"recovery_score": 70, "resting_heart_rate": 52, "hrv_rmssd_milli": 65.5,
                      "skin_temp_celsius": 33.5, "metabolic_load": 20}
        }))
        .unwrap();

        let text = format_recovery(&record);
        assert!(text.contains("Recovery Status: Green (High)\nRecovery Score: 70%\n"));
        assert!(text.contains("Heart Rate Variability: 65.5 ms\n"));
        assert!(text.contains("SPO2: N/A\n"));
        assert!(text.contains("Skin Temperature: 92.3°F (33.5°C)\n"));
        assert!(text.contains("Load Analysis:\n  Metabolic Load: 20%\n"));
        assert!(!text.contains("Cardiovascular Load"));
        assert!(text.ends_with("Based on: Last Sleep Session\n"));
    }

    #[test]
    fn test_workout_report_units() {
        let workout: WorkoutRecord = serde_json::from_value(json!({
            "sport_id": 0,
            "sport_name": "Running",
            "start": "2024-01-15T12:00:00.000Z",
            "end": "2024-01-15T13:15:00.000Z",
            "score": {
                "strain": 14.26,
                "average_heart_rate": 150,
                "max_heart_rate": 182,
                "kilojoule": 4184,
                "percent_recorded": 95,
                "distance_meter": 12070.1,
                "altitude_gain_meter": 100,
                "altitude_change_meter": -10,
                "zone_duration": {"zone_two_milli": 1_800_000}
            }
        }))
        .unwrap();

        let text = format_workout(&workout);
        assert!(text.contains("Workout: Running on Monday, Jan 15, 2024\n"));
        assert!(text.contains("Strain Level: Strenuous (14.0-17.9)\nStrain Score: 14.3/21.0\n"));
        assert!(text.contains("Duration: 1h 15m (75.0 minutes)\n"));
        assert!(text.contains("Calories Burned: 1000 kcal (4184 kJ)\n"));
        assert!(text.contains("Distance: 7.50 miles (12,070m)\n"));
        assert!(text.contains("Elevation Gain: 328ft (100m)\nNet Elevation: -33ft (-10m)\n"));
        assert!(text.contains("Data Quality: 95% recorded\n"));
        assert!(text.contains("Zone 2 (60-70%): 30m\n"));
    }

    #[test]
    fn test_cycle_and_profile() {
        let cycle: CycleRecord = serde_json::from_value(json!({
            "start": "2024-01-15T12:00:00.000Z",
            "score_state": "SCORED",
            "score": {"strain": 9.5, "kilojoule": 8368, "average_heart_rate": 70, "max_heart_rate": 160}
        }))
        .unwrap();
        let text = format_cycle(&cycle);
        assert!(text.contains("Daily Strain Level: Light (4.0-9.9)\nDaily Strain: 9.5/21.0\n"));
        assert!(text.contains("Energy Expenditure: 8368.0 kJ (2000 kcal)\n"));
        assert!(text.ends_with("Status: SCORED\n"));

        let profile: UserProfile = serde_json::from_value(json!({
            "user_id": 10129, "first_name": "Sam", "last_name": "Lee", "email": "sam@example.com"
        }))
        .unwrap();
        assert_eq!(
            format_profile(&profile),
            "\nName: Sam Lee\nEmail: sam@example.com\nUser ID: 10129\n"
        );
    }

    #[test]
    fn test_body_measurement() {
        let body: BodyMeasurement = serde_json::from_value(json!({
            "height_meter": 1.83, "weight_kilogram": 90.7185, "max_heart_rate": 195
        }))
        .unwrap();
        let text = format_body_measurement(&body);
        assert!(text.starts_with("\nHeight: 6'0\" (183.0 cm)\nWeight: 200.0 lbs (90.7 kg)\n"));
        assert!(text.contains("Max Heart Rate: 195 bpm\n"));
        assert!(!text.contains("Body Composition"));
    }

    #[test]
    fn test_sports_mapping_and_search() {
        let workouts: Vec<WorkoutRecord> = serde_json::from_value(json!([
            {"sport_id": 1, "sport_name": "Cycling"},
            {"sport_id": 0, "sport_name": "Running"},
            {"sport_id": 1, "sport_name": "Cycling"},
            {"sport_name": "No Id"}
        ]))
        .unwrap();

        assert_eq!(
            format_sports_mapping(&workouts),
            "WHOOP Sports from your workout history:\n\nID 0: Running\nID 1: Cycling\n"
        );
        assert_eq!(
            format_sports_search(&workouts, "CYC"),
            "WHOOP sports matching 'CYC' from your workout history:\n\nID 1: Cycling\n"
        );
        assert_eq!(
            format_sports_search(&workouts, "rowing"),
            "No matching sports found for 'rowing' in your workout history."
        );
    }

    #[test]
    fn test_fetch_error_prefers_auth_instruction() {
        assert_eq!(
            fetch_error("sleep", &WhoopError::CorruptToken),
            crate::constants::messages::NOT_AUTHENTICATED
        );
        assert_eq!(
            fetch_error("sleep", &WhoopError::Http { status: 500, body: "x".into() }),
            "Error fetching sleep data: HTTP error 500: x"
        );
    }
}
