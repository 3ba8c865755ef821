// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Derived Analyses
//!
//! Reports that add interpretation on top of a single record: heart-rate
//! zone focus for a workout, sleep stage quality, recovery load per body
//! system and a combined training readiness score.

use crate::dates::{format_date_est, format_duration_millis};
use crate::formatters::{
    fetch_error, fmt_num, format_recovery_page, format_sleep_page, format_workout_option,
};
use crate::models::{or_zero, CycleRecord, RecoveryRecord, SleepRecord, WorkoutRecord};
use crate::whoop_client::{self, WhoopApi};

/// Percentage of `part` in `total`, zero when there is nothing to divide
fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

pub fn training_focus(zones: &[f64; 6]) -> &'static str {
    let total: f64 = zones.iter().sum();
    if total <= 0.0 {
        return "Low Intensity/Recovery";
    }
    if (zones[4] + zones[5]) / total > 0.3 {
        "High Intensity"
    } else if (zones[3] + zones[4]) / total > 0.3 {
        "Moderate Intensity"
    } else {
        "Low Intensity/Recovery"
    }
}

pub fn workout_analysis_text(workout: &WorkoutRecord) -> String {
    let zones = workout.zones().as_array();
    let total: f64 = zones.iter().sum();

    format!(
        "\n{}\n=== WORKOUT ANALYSIS ===\n\
         Zone Distribution:\n  \
         Zone 0 (Rest): {:.1}% of workout\n  \
         Zone 1-2 (Aerobic): {:.1}% of workout\n  \
         Zone 3-4 (Anaerobic): {:.1}% of workout\n  \
         Zone 5 (Max Effort): {:.1}% of workout\n\n\
         Training Focus: {}\n",
        crate::formatters::format_workout(workout),
        share(zones[0], total),
        share(zones[1] + zones[2], total),
        share(zones[3] + zones[4], total),
        share(zones[5], total),
        training_focus(&zones),
    )
}

pub async fn workout_analysis(api: &dyn WhoopApi, workout_id: Option<&str>) -> String {
    match whoop_client::workout(api, workout_id).await {
        Ok(Some(workout)) => workout_analysis_text(&workout),
        Ok(None) => format_workout_option(None),
        Err(e) => fetch_error("workout", &e),
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

fn latency_label(latency_milli: f64) -> &'static str {
    if latency_milli < 900_000.0 {
        "Fast"
    } else if latency_milli < 1_800_000.0 {
        "Normal"
    } else {
        "Slow"
    }
}

fn continuity_label(disturbances: f64) -> &'static str {
    if disturbances < 2.0 {
        "Excellent"
    } else if disturbances < 4.0 {
        "Good"
    } else if disturbances < 6.0 {
        "Fair"
    } else {
        "Poor"
    }
}

fn sleep_recommendation(efficiency: f64, disturbances: f64, latency_milli: f64) -> &'static str {
    if efficiency > 85.0 && disturbances < 3.0 {
        "• Great sleep quality! Maintain current sleep habits."
    } else if disturbances > 4.0 {
        "• Consider improving sleep environment to reduce disturbances."
    } else if latency_milli > 1_800_000.0 {
        "• Focus on consistent bedtime routine to improve sleep latency."
    } else {
        "• Consider sleep hygiene improvements for better efficiency."
    }
}

pub fn sleep_quality_text(formatted: &str, sleep: &SleepRecord) -> String {
    let stages = sleep.stages();
    let light = or_zero(stages.total_light_sleep_time_milli);
    let deep = or_zero(stages.total_slow_wave_sleep_time_milli);
    let rem = or_zero(stages.total_rem_sleep_time_milli);
    let total = stages.total_sleep_milli();

    let efficiency = or_zero(sleep.score().sleep_efficiency_percentage);
    let latency = or_zero(stages.sleep_latency_milli);
    let disturbances = or_zero(stages.disturbance_count);

    format!(
        "\n{}\n=== SLEEP QUALITY ANALYSIS ===\n\
         Sleep Stage Distribution:\n  \
         Light Sleep: {:.1}% (Optimal: 45-55%)\n  \
         Deep Sleep: {:.1}% (Optimal: 15-20%)\n  \
         REM Sleep: {:.1}% (Optimal: 20-25%)\n\n\
         Sleep Quality Assessment:\n  \
         Overall Quality: {}\n  \
         Sleep Latency: {} ({})\n  \
         Sleep Continuity: {} ({} disturbances)\n\n\
         Recommendations:\n{}\n",
        formatted,
        share(light, total),
        share(deep, total),
        share(rem, total),
        efficiency_quality(efficiency),
        latency_label(latency),
        format_duration_millis(latency),
        continuity_label(disturbances),
        fmt_num(disturbances),
        sleep_recommendation(efficiency, disturbances, latency),
    )
}

pub async fn sleep_quality_analysis(api: &dyn WhoopApi, date: Option<&str>) -> String {
    let page = match whoop_client::sleep_for(api, date).await {
        Ok(page) => page,
        Err(e) => return fetch_error("sleep", &e),
    };
    match page.first() {
        Some(sleep) => sleep_quality_text(&format_sleep_page(&page), sleep),
        None => "No sleep data found for analysis.".to_string(),
    }
}

fn load_level(load: f64) -> &'static str {
    if load > 70.0 {
        "High"
    } else if load > 40.0 {
        "Moderate"
    } else {
        "Low"
    }
}

pub fn readiness_status(recovery_score: f64) -> &'static str {
    if recovery_score > 67.0 {
        "Ready"
    } else if recovery_score > 34.0 {
        "Caution"
    } else {
        "Not Ready"
    }
}

fn limiting_factor(cardio: f64, muscle: f64, metabolic: f64) -> &'static str {
    let max = cardio.max(muscle).max(metabolic);
    if cardio == max {
        "Cardiovascular"
    } else if muscle == max {
        "Musculoskeletal"
    } else {
        "Metabolic"
    }
}

fn recovery_training_advice(recovery_score: f64) -> &'static str {
    if recovery_score > 67.0 {
        "• Full intensity training recommended"
    } else if recovery_score > 50.0 {
        "• Light to moderate training recommended"
    } else if recovery_score > 34.0 {
        "• Recovery day recommended - focus on sleep and nutrition"
    } else {
        "• Active recovery only - prioritize rest"
    }
}

fn recovery_strategy(cardio: f64, muscle: f64, metabolic: f64) -> &'static str {
    if cardio > muscle.max(metabolic) {
        "• Focus on cardiovascular recovery (gentle aerobic activity, breathing exercises)"
    } else if muscle > cardio.max(metabolic) {
        "• Focus on musculoskeletal recovery (stretching, massage, gentle movement)"
    } else {
        "• Focus on metabolic recovery (nutrition, hydration, adequate sleep)"
    }
}

pub fn recovery_load_text(formatted: &str, recovery: &RecoveryRecord) -> String {
    let score = recovery.score();
    let cardio = or_zero(score.cardiovascular_load);
    let muscle = or_zero(score.musculoskeletal_load);
    let metabolic = or_zero(score.metabolic_load);
    let recovery_score = or_zero(score.recovery_score);

    format!(
        "\n{}\n=== RECOVERY LOAD ANALYSIS ===\n\
         System Load Breakdown:\n  \
         Cardiovascular System: {} Load ({}%)\n  \
         Musculoskeletal System: {} Load ({}%)\n  \
         Metabolic System: {} Load ({}%)\n\n\
         Recovery Readiness:\n  \
         Overall Status: {}\n  \
         Primary Limiting Factor: {}\n\n\
         Training Recommendations:\n{}\n\n\
         Recovery Strategies:\n{}\n",
        formatted,
        load_level(cardio),
        fmt_num(cardio),
        load_level(muscle),
        fmt_num(muscle),
        load_level(metabolic),
        fmt_num(metabolic),
        readiness_status(recovery_score),
        limiting_factor(cardio, muscle, metabolic),
        recovery_training_advice(recovery_score),
        recovery_strategy(cardio, muscle, metabolic),
    )
}

pub async fn recovery_load_analysis(api: &dyn WhoopApi, date: Option<&str>) -> String {
    let page = match whoop_client::recovery_for(api, date).await {
        Ok(page) => page,
        Err(e) => return fetch_error("recovery", &e),
    };
    match page.first() {
        Some(recovery) => recovery_load_text(&format_recovery_page(&page), recovery),
        None => "No recovery data found for analysis.".to_string(),
    }
}

/// Weighted readiness on a 0-100 scale
pub fn readiness_score(
    recovery_score: f64,
    sleep_performance: f64,
    sleep_efficiency: f64,
    strain: f64,
) -> f64 {
    let strain_capacity = ((21.0 - strain) * 4.76).min(100.0);
    recovery_score * 0.4 + sleep_performance * 0.3 + sleep_efficiency * 0.2 + strain_capacity * 0.1
}

/// Readiness level and the matching training advice
pub fn readiness_level(score: f64) -> (&'static str, &'static str) {
    if score >= 80.0 {
        ("Excellent", "Perfect day for high-intensity training or competition")
    } else if score >= 65.0 {
        ("Good", "Good for moderate to high-intensity training")
    } else if score >= 50.0 {
        ("Fair", "Light to moderate training recommended")
    } else {
        ("Poor", "Recovery day recommended - focus on rest and recovery")
    }
}

fn light(value: f64, green_above: f64, yellow_above: f64) -> &'static str {
    if value > green_above {
        "🟢"
    } else if value > yellow_above {
        "🟡"
    } else {
        "🔴"
    }
}

pub fn training_readiness_text(
    recovery: &RecoveryRecord,
    sleep: &SleepRecord,
    cycle: &CycleRecord,
) -> String {
    let recovery_score = or_zero(recovery.score().recovery_score);
    let sleep_performance = or_zero(sleep.score().sleep_performance_percentage);
    let sleep_efficiency = or_zero(sleep.score().sleep_efficiency_percentage);
    let strain = or_zero(cycle.score().strain);

    let score = readiness_score(recovery_score, sleep_performance, sleep_efficiency, strain);
    let (level, advice) = readiness_level(score);

    let date = match recovery.created_at.as_deref() {
        Some(created) if created != "Unknown" => format_date_est(created, false),
        _ => "Today".to_string(),
    };

    let sleep_quality = if sleep_performance > 80.0 {
        "Excellent"
    } else if sleep_performance > 60.0 {
        "Good"
    } else {
        "Poor"
    };

    let (strain_light, strain_load) = if strain < 15.0 {
        ("🟢", "Low")
    } else if strain < 18.0 {
        ("🟡", "Moderate")
    } else {
        ("🔴", "High")
    };

    let focus = if score >= 80.0 {
        "• All systems optimal - maintain current routines"
    } else if sleep_performance < 70.0 {
        "• Prioritize sleep quality for better readiness"
    } else if recovery_score < 60.0 {
        "• Focus on recovery strategies to improve readiness"
    } else {
        "• Monitor training load to prevent overreaching"
    };

    format!(
        "\n=== TRAINING READINESS ASSESSMENT ===\n\
         Date: {}\n\n\
         Overall Readiness: {} ({:.1}/100)\n\n\
         Key Metrics:\n  \
         Recovery Score: {}% (Weight: 40%)\n  \
         Sleep Performance: {}% (Weight: 30%)\n  \
         Sleep Efficiency: {:.1}% (Weight: 20%)\n  \
         Previous Day Strain: {:.1}/21 (Weight: 10%)\n\n\
         Training Recommendation: {}\n\n\
         Detailed Breakdown:\n  \
         {} Recovery: {}\n  \
         {} Sleep Quality: {}\n  \
         {} Strain Load: {}\n\n\
         Focus Areas:\n{}\n",
        date,
        level,
        score,
        fmt_num(recovery_score),
        fmt_num(sleep_performance),
        sleep_efficiency,
        strain,
        advice,
        light(recovery_score, 67.0, 34.0),
        readiness_status(recovery_score),
        light(sleep_performance, 80.0, 60.0),
        sleep_quality,
        strain_light,
        strain_load,
        focus,
    )
}

pub async fn training_readiness(api: &dyn WhoopApi, date: Option<&str>) -> String {
    let recovery = match whoop_client::recovery_for(api, date).await {
        Ok(page) => page,
        Err(e) => return fetch_error("recovery", &e),
    };
    let sleep = match whoop_client::sleep_for(api, date).await {
        Ok(page) => page,
        Err(e) => return fetch_error("sleep", &e),
    };
    let cycle = match whoop_client::cycle_for(api, date).await {
        Ok(page) => page,
        Err(e) => return fetch_error("cycle", &e),
    };

    match (recovery.first(), sleep.first(), cycle.first()) {
        (Some(recovery), Some(sleep), Some(cycle)) => {
            training_readiness_text(recovery, sleep, cycle)
        }
        _ => "Insufficient data for training readiness assessment.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_training_focus_thresholds() {
        assert_eq!(training_focus(&[0.0; 6]), "Low Intensity/Recovery");
        assert_eq!(training_focus(&[60.0, 0.0, 0.0, 0.0, 20.0, 20.0]), "High Intensity");
        assert_eq!(training_focus(&[60.0, 0.0, 0.0, 35.0, 5.0, 0.0]), "Moderate Intensity");
        assert_eq!(training_focus(&[70.0, 0.0, 0.0, 30.0, 0.0, 0.0]), "Low Intensity/Recovery");
    }

    #[test]
    fn test_workout_without_zones_does_not_divide_by_zero() {
        let workout: WorkoutRecord = serde_json::from_value(json!({"sport_name": "Yoga"})).unwrap();
        let text = workout_analysis_text(&workout);
        assert!(text.contains("Zone 0 (Rest): 0.0% of workout"));
        assert!(text.ends_with("Training Focus: Low Intensity/Recovery\n"));
    }

    #[test]
    fn test_sleep_quality_assessment() {
        let sleep: SleepRecord = serde_json::from_value(json!({
            "score": {
                "sleep_efficiency_percentage": 90,
                "stage_summary": {
                    "total_light_sleep_time_milli": 5_000_000,
                    "total_slow_wave_sleep_time_milli": 2_000_000,
                    "total_rem_sleep_time_milli": 3_000_000,
                    "sleep_latency_milli": 600_000,
                    "disturbance_count": 1
                }
            }
        }))
        .unwrap();

        let text = sleep_quality_text("", &sleep);
        assert!(text.contains("Light Sleep: 50.0% (Optimal: 45-55%)"));
        assert!(text.contains("Deep Sleep: 20.0% (Optimal: 15-20%)"));
        assert!(text.contains("Overall Quality: Excellent"));
        assert!(text.contains("Sleep Latency: Fast (10m)"));
        assert!(text.contains("Sleep Continuity: Excellent (1 disturbances)"));
        assert!(text.contains("• Great sleep quality! Maintain current sleep habits."));
    }

    #[test]
    fn test_sleep_recommendation_precedence() {
        assert_eq!(
            sleep_recommendation(90.0, 5.0, 0.0),
            "• Consider improving sleep environment to reduce disturbances."
        );
        assert_eq!(
            sleep_recommendation(70.0, 3.0, 2_000_000.0),
            "• Focus on consistent bedtime routine to improve sleep latency."
        );
        assert_eq!(
            sleep_recommendation(70.0, 3.0, 0.0),
            "• Consider sleep hygiene improvements for better efficiency."
        );
    }

    #[test]
    fn test_recovery_load_breakdown() {
        let recovery: RecoveryRecord = serde_json::from_value(json!({
            "score": {"recovery_score": 55, "cardiovascular_load": 30,
                      "musculoskeletal_load": 75, "metabolic_load": 50}
        }))
        .unwrap();

        let text = recovery_load_text("", &recovery);
        assert!(text.contains("Cardiovascular System: Low Load (30%)"));
        assert!(text.contains("Musculoskeletal System: High Load (75%)"));
        assert!(text.contains("Metabolic System: Moderate Load (50%)"));
        assert!(text.contains("Overall Status: Caution"));
        assert!(text.contains("Primary Limiting Factor: Musculoskeletal"));
        assert!(text.contains("• Light to moderate training recommended"));
        assert!(text.contains("• Focus on musculoskeletal recovery"));
    }

    #[test]
    fn test_equal_loads_fall_through_to_metabolic_strategy() {
        assert_eq!(limiting_factor(0.0, 0.0, 0.0), "Cardiovascular");
        assert_eq!(
            recovery_strategy(0.0, 0.0, 0.0),
            "• Focus on metabolic recovery (nutrition, hydration, adequate sleep)"
        );
    }

    #[test]
    fn test_readiness_score_and_levels() {
        // 0.4*80 + 0.3*90 + 0.2*90 + 0.1*min(100, 11*4.76)
        let score = readiness_score(80.0, 90.0, 90.0, 10.0);
        assert!((score - 82.236).abs() < 1e-9);
        assert_eq!(readiness_level(score).0, "Excellent");
        assert_eq!(readiness_level(65.0).0, "Good");
        assert_eq!(readiness_level(49.9).0, "Poor");

        // 21 * 4.76 = 99.96 stays under the cap
        assert!((readiness_score(0.0, 0.0, 0.0, 0.0) - 9.996).abs() < 1e-9);
        // -1 strain gives 104.72, capped at 100
        assert!((readiness_score(0.0, 0.0, 0.0, -1.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_readiness_report() {
        let recovery: RecoveryRecord = serde_json::from_value(json!({
            "created_at": "2024-01-15T12:00:00.000Z",
            "score": {"recovery_score": 40}
        }))
        .unwrap();
        let sleep: SleepRecord = serde_json::from_value(json!({
            "score": {"sleep_performance_percentage": 65, "sleep_efficiency_percentage": 80}
        }))
        .unwrap();
        let cycle: CycleRecord =
            serde_json::from_value(json!({"score": {"strain": 16.0}})).unwrap();

        let text = training_readiness_text(&recovery, &sleep, &cycle);
        assert!(text.contains("Date: Monday, Jan 15, 2024\n"));
        assert!(text.contains("Overall Readiness: Fair (53.9/100)"));
        assert!(text.contains("🟡 Recovery: Caution"));
        assert!(text.contains("🟡 Sleep Quality: Good"));
        assert!(text.contains("🟡 Strain Load: Moderate"));
        assert!(text.contains("• Prioritize sleep quality for better readiness"));
    }
}
