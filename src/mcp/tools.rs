// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Tool Registry
//!
//! Maps tool names to their implementations. Every tool produces text;
//! vendor failures are part of that text. Only an unknown tool name or
//! arguments of the wrong type surface as [`ToolError`].

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::analysis;
use crate::config::WhoopConfig;
use crate::constants::{limits, tools};
use crate::errors::{ToolError, WhoopError};
use crate::formatters::{self, render};
use crate::mcp::schema::{tool_schemas, ToolSchema};
use crate::oauth2_client::{authentication_status, OAuthFlow};
use crate::prompt_store::{self, PromptStore};
use crate::summary;
use crate::token_store::TokenStore;
use crate::trends;
use crate::whoop_client::{self, WhoopApi, WhoopClient};

pub const TOOLS_GUIDE: &str = r#"
🏥 WHOOP HEALTH ANALYTICS TOOLKIT
═══════════════════════════════════════════════════════════════════════════════════

📊 COMPREHENSIVE HEALTH DATA AVAILABLE

🔹 SINGLE-DAY DATA TOOLS (Latest or Specific Date)
   • get_sleep_daily(date) → Sleep stages, efficiency, performance
   • get_recovery_daily(date) → Recovery score, HRV, RHR, temperature
   • get_workout_daily(workout_id) → Workout strain, HR zones, calories
   • get_cycle_daily(date) → Daily strain, avg/max HR, energy
   • get_profile_data() → User profile and basic information
   • get_body_measurement_data() → Height, weight, max heart rate

🔹 MULTI-DAY TREND ANALYSIS (2-60 Days Historical)
   • get_recovery_trends(days, end_date) → Recovery patterns & HRV trends
   • get_strain_trends(days, end_date) → Training load progression
   • get_sleep_trends(days, end_date) → Sleep quality & consistency patterns
   • get_workout_trends(days, end_date, sport_filter) → Training patterns & athletic profiling
   • get_recovery_chart(days, end_date) → ASCII chart visualization

🔹 ADVANCED ANALYSIS TOOLS
   • get_training_readiness(date) → Training recommendations
   • get_workout_analysis(workout_id) → Detailed workout metrics & zones
   • get_sleep_quality_analysis(date) → Sleep efficiency deep dive
   • get_recovery_load_analysis(date) → Cardiovascular stress analysis

🔹 COMPREHENSIVE SUMMARIES
   • get_daily_summary(date) → Complete daily health overview
   • search_whoop_sports(query) → Sport-specific workout history
   • get_sports_mapping() → Available sports and IDs

💡 KEY CAPABILITIES

✅ MULTI-DAY ANALYTICS (Up to 60 days)
   - Recovery trends with statistical analysis
   - Training load progression and patterns
   - Sleep quality consistency over time
   - Workout trends and athletic profiling
   - Heart rate variability tracking
   - Trend direction analysis (improving/declining/stable)

✅ COMPREHENSIVE METRICS COVERED
   - Workout Type, Duration, Strain (0-21 scale)
   - Training frequency, intensity distribution, sport profiling
   - Recovery Scores (0-100%), HRV, Resting Heart Rate
   - Sleep Quality, Efficiency, Consistency
   - Energy expenditure and training load
   - Athletic profiling (endurance vs strength vs multi-sport)

✅ INTELLIGENT INSIGHTS
   - Personalized recommendations based on data
   - Time-aware suggestions (adapts to time of day)
   - Overtraining risk assessment
   - Sleep optimization guidance

📋 USAGE PATTERNS

🎯 Daily Health Check:
   get_daily_summary() → Complete current status

🎯 Weekly Training Analysis:
   get_workout_trends(7) → Training patterns and frequency
   get_strain_trends(7) → Training load patterns
   get_recovery_trends(7) → Recovery adequacy

🎯 Monthly Health Trends:
   get_sleep_trends(30) → Sleep pattern analysis
   get_recovery_trends(30) → Long-term recovery trends

🎯 Training Planning:
   get_training_readiness() → Current readiness
   get_workout_trends(14) → Training patterns & periodization
   get_strain_trends(14) → Recent training load

⚡ AUTHENTICATION
   authenticate_with_whoop() → Required first step
   check_authentication_status() → Verify connection

📈 QUICK START
1. authenticate_with_whoop()
2. get_daily_summary() → Get overview
3. get_recovery_trends(14) → Understand recent patterns
4. Use specific tools based on your needs

💡 PRO TIPS
• Use multi-day tools for trend analysis
• Combine recovery + strain trends for training insights
• Daily summary tool provides holistic health picture
• All date parameters use YYYY-MM-DD format
• set_custom_prompt(prompt) personalizes every conversation

═══════════════════════════════════════════════════════════════════════════════════
"#;

pub struct ToolRegistry {
    api: Arc<dyn WhoopApi>,
    tokens: TokenStore,
    prompts: PromptStore,
    flow: Option<OAuthFlow>,
}

impl ToolRegistry {
    pub fn new(api: Arc<dyn WhoopApi>, tokens: TokenStore, prompts: PromptStore) -> Self {
        Self {
            api,
            tokens,
            prompts,
            flow: None,
        }
    }

    /// Registry backed by the real WHOOP client; OAuth is available when
    /// client credentials are configured
    pub fn from_config(config: WhoopConfig) -> Self {
        let prompts = PromptStore::new(config.prompt_file.clone());
        let client = WhoopClient::new(config);
        let tokens = client.token_store().clone();
        let flow = client.oauth().cloned().map(OAuthFlow::new);

        let registry = Self::new(Arc::new(client), tokens, prompts);
        match flow {
            Some(flow) => registry.with_oauth_flow(flow),
            None => registry,
        }
    }

    pub fn with_oauth_flow(mut self, flow: OAuthFlow) -> Self {
        self.flow = Some(flow);
        self
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        tool_schemas()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        tool_schemas().iter().any(|t| t.name == name)
    }

    /// Invoke `name` with the JSON object `args`
    pub async fn call_tool(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let args = Args::new(name, args)?;
        let api = self.api.as_ref();
        debug!(tool = name, "Dispatching tool call");

        let text = match name {
            tools::AUTHENTICATE => match &self.flow {
                Some(flow) => flow.authenticate().await,
                None => format!("Error: {}", WhoopError::MissingCredentials),
            },
            tools::CHECK_AUTH => authentication_status(&self.tokens).await,
            tools::SLEEP_DAILY => {
                let date = args.string("date")?;
                render(
                    whoop_client::sleep_for(api, date.as_deref()).await,
                    "sleep",
                    formatters::format_sleep_page,
                )
            }
            tools::RECOVERY_DAILY => {
                let date = args.string("date")?;
                render(
                    whoop_client::recovery_for(api, date.as_deref()).await,
                    "recovery",
                    formatters::format_recovery_page,
                )
            }
            tools::WORKOUT_DAILY => {
                let id = args.string("workout_id")?;
                render(whoop_client::workout(api, id.as_deref()).await, "workout", |w| {
                    formatters::format_workout_option(w.as_ref())
                })
            }
            tools::CYCLE_DAILY => {
                let date = args.string("date")?;
                render(
                    whoop_client::cycle_for(api, date.as_deref()).await,
                    "cycle",
                    formatters::format_cycle_page,
                )
            }
            tools::PROFILE => render(
                whoop_client::profile(api).await,
                "profile",
                formatters::format_profile,
            ),
            tools::BODY_MEASUREMENT => render(
                whoop_client::body_measurement(api).await,
                "body measurement",
                formatters::format_body_measurement,
            ),
            tools::SPORTS_MAPPING => render(
                whoop_client::recent_workouts(api, limits::SPORTS_MAPPING_LIMIT).await,
                "workout",
                |page| formatters::format_sports_mapping(&page.records),
            ),
            tools::WORKOUT_ANALYSIS => {
                let id = args.string("workout_id")?;
                analysis::workout_analysis(api, id.as_deref()).await
            }
            tools::SLEEP_QUALITY => {
                let date = args.string("date")?;
                analysis::sleep_quality_analysis(api, date.as_deref()).await
            }
            tools::RECOVERY_LOAD => {
                let date = args.string("date")?;
                analysis::recovery_load_analysis(api, date.as_deref()).await
            }
            tools::TRAINING_READINESS => {
                let date = args.string("date")?;
                analysis::training_readiness(api, date.as_deref()).await
            }
            tools::SEARCH_SPORTS => {
                let query = args.required_string("query")?;
                render(
                    whoop_client::recent_workouts(api, limits::SPORTS_SEARCH_LIMIT).await,
                    "workout",
                    |page| formatters::format_sports_search(&page.records, &query),
                )
            }
            tools::DAILY_SUMMARY => {
                let date = args.string("date")?;
                summary::daily_summary(api, date.as_deref()).await
            }
            tools::SET_PROMPT => {
                let prompt = args.string("prompt")?;
                prompt_store::set_custom_prompt(&self.prompts, prompt.as_deref()).await
            }
            tools::GET_PROMPT => prompt_store::current_prompt(&self.prompts).await,
            tools::RECOVERY_TRENDS => {
                let (days, end_date) = (args.integer("days")?, args.string("end_date")?);
                trends::recovery_trends(api, days, end_date.as_deref()).await
            }
            tools::STRAIN_TRENDS => {
                let (days, end_date) = (args.integer("days")?, args.string("end_date")?);
                trends::strain_trends(api, days, end_date.as_deref()).await
            }
            tools::SLEEP_TRENDS => {
                let (days, end_date) = (args.integer("days")?, args.string("end_date")?);
                trends::sleep_trends(api, days, end_date.as_deref()).await
            }
            tools::RECOVERY_CHART => {
                let (days, end_date) = (args.integer("days")?, args.string("end_date")?);
                trends::recovery_chart(api, days, end_date.as_deref()).await
            }
            tools::WORKOUT_TRENDS => {
                let (days, end_date) = (args.integer("days")?, args.string("end_date")?);
                let sport = args.string("sport_filter")?;
                trends::workout_trends(api, days, end_date.as_deref(), sport.as_deref()).await
            }
            tools::TOOLS_GUIDE => TOOLS_GUIDE.to_string(),
            other => return Err(ToolError::NotFound(other.to_string())),
        };

        Ok(text)
    }
}

/// Typed access to a `tools/call` argument object
struct Args<'a> {
    tool: &'a str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(tool: &'a str, value: &'a Value) -> Result<Self, ToolError> {
        match value {
            Value::Null => Ok(Self { tool, map: None }),
            Value::Object(map) => Ok(Self { tool, map: Some(map) }),
            _ => Err(invalid_args(tool, "arguments must be an object")),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    /// Strings pass through; numbers are accepted for ids
    fn string(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(invalid_args(self.tool, &format!("'{}' must be a string", key))),
        }
    }

    fn required_string(&self, key: &str) -> Result<String, ToolError> {
        self.string(key)?
            .ok_or_else(|| invalid_args(self.tool, &format!("'{}' is required", key)))
    }

    fn integer(&self, key: &str) -> Result<Option<i64>, ToolError> {
        let invalid = || invalid_args(self.tool, &format!("'{}' must be an integer", key));
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }
}

fn invalid_args(tool: &str, reason: &str) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.to_string(),
    }
}
