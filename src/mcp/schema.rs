// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP Protocol Schema Definitions
//!
//! Type-safe definitions for the `initialize` result and the tool
//! descriptors returned by `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::constants::tools;

/// Server Information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP Tool Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// JSON Schema Property Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
}

/// Capability flags advertised during `initialize`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: HashMap<String, Value>,
    pub prompts: HashMap<String, Value>,
    pub resources: HashMap<String, Value>,
}

/// Complete MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
    /// Custom prompt, when the user has set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResponse {
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities::default(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }
}

/// `tools/list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResponse {
    pub tools: Vec<ToolSchema>,
}

/// A single text block in a `tools/call` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// `tools/call` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<Content>,
}

impl ToolResponse {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![Content {
                content_type: "text".to_string(),
                text,
            }],
        }
    }
}

fn string_property(description: &str) -> PropertySchema {
    PropertySchema {
        property_type: "string".to_string(),
        description: Some(description.to_string()),
        default: None,
        minimum: None,
        maximum: None,
    }
}

fn days_property(default: i64, minimum: i64, maximum: i64) -> PropertySchema {
    PropertySchema {
        property_type: "integer".to_string(),
        description: Some(format!(
            "Number of days to analyze ({}-{}, default {})",
            minimum, maximum, default
        )),
        default: Some(Value::from(default)),
        minimum: Some(minimum),
        maximum: Some(maximum),
    }
}

fn date_property() -> PropertySchema {
    string_property("Date in YYYY-MM-DD format. Defaults to the most recent record.")
}

fn end_date_property() -> PropertySchema {
    string_property("Last day of the window in YYYY-MM-DD format. Defaults to today (US Eastern).")
}

fn tool(
    name: &str,
    description: &str,
    properties: Vec<(&str, PropertySchema)>,
    required: &[&str],
) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: JsonSchema {
            schema_type: "object".to_string(),
            properties: Some(
                properties
                    .into_iter()
                    .map(|(key, schema)| (key.to_string(), schema))
                    .collect(),
            ),
            required: Some(required.iter().map(|r| r.to_string()).collect()),
        },
    }
}

/// Every tool the server exposes, in catalogue order
pub fn tool_schemas() -> Vec<ToolSchema> {
    vec![
        tool(
            tools::AUTHENTICATE,
            "Authenticate with WHOOP using OAuth2. Opens your browser to authorize the app and exchanges the code for a token.",
            vec![],
            &[],
        ),
        tool(
            tools::CHECK_AUTH,
            "Check if you are authenticated with WHOOP.",
            vec![],
            &[],
        ),
        tool(
            tools::SLEEP_DAILY,
            "Get detailed sleep data for a single night including quality, duration, efficiency, and stages",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::RECOVERY_DAILY,
            "Get detailed recovery metrics for a single day including recovery score, HRV, and RHR",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::WORKOUT_DAILY,
            "Get detailed data for a single workout including strain, heart rate, and performance metrics",
            vec![("workout_id", string_property("Workout ID. Defaults to the most recent workout."))],
            &[],
        ),
        tool(
            tools::CYCLE_DAILY,
            "Get daily strain and physiological cycle data for a single day",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::PROFILE,
            "Get the user's personal profile information from WHOOP",
            vec![],
            &[],
        ),
        tool(
            tools::BODY_MEASUREMENT,
            "Get the user's personal body measurement data from WHOOP",
            vec![],
            &[],
        ),
        tool(
            tools::SPORTS_MAPPING,
            "Get a mapping of sport IDs to sport names from your workout history",
            vec![],
            &[],
        ),
        tool(
            tools::WORKOUT_ANALYSIS,
            "Get detailed workout analysis with elevation, zones, and quality metrics",
            vec![("workout_id", string_property("Workout ID. Defaults to the most recent workout."))],
            &[],
        ),
        tool(
            tools::SLEEP_QUALITY,
            "Analyze sleep stages, efficiency, latency and continuity against optimal ranges",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::RECOVERY_LOAD,
            "Analyze cardiovascular, musculoskeletal and metabolic load alongside recovery",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::TRAINING_READINESS,
            "Get comprehensive training readiness assessment combining recovery, sleep, and strain data",
            vec![("date", date_property())],
            &[],
        ),
        tool(
            tools::SEARCH_SPORTS,
            "Search for sports in your WHOOP workout history",
            vec![("query", string_property("Search term to look for a specific sport"))],
            &["query"],
        ),
        tool(
            tools::DAILY_SUMMARY,
            "Get a comprehensive daily health summary combining all WHOOP metrics with smart recommendations",
            vec![(
                "date",
                string_property("'today', 'yesterday', or a date in YYYY-MM-DD format. Defaults to the current cycle."),
            )],
            &[],
        ),
        tool(
            tools::SET_PROMPT,
            "Set a custom prompt used at the start of every conversation, or clear it by omitting the prompt",
            vec![("prompt", string_property("The custom prompt text. Omit or pass null to clear."))],
            &[],
        ),
        tool(
            tools::GET_PROMPT,
            "Get the current custom prompt",
            vec![],
            &[],
        ),
        tool(
            tools::RECOVERY_TRENDS,
            "Analyze recovery trends and patterns over multiple days",
            vec![("days", days_property(7, 2, 60)), ("end_date", end_date_property())],
            &[],
        ),
        tool(
            tools::STRAIN_TRENDS,
            "Analyze strain and training load progression over multiple days",
            vec![("days", days_property(14, 2, 60)), ("end_date", end_date_property())],
            &[],
        ),
        tool(
            tools::SLEEP_TRENDS,
            "Analyze sleep patterns and quality trends over multiple days",
            vec![("days", days_property(30, 2, 60)), ("end_date", end_date_property())],
            &[],
        ),
        tool(
            tools::RECOVERY_CHART,
            "Generate ASCII chart visualization of recovery score trends over time",
            vec![("days", days_property(14, 3, 30)), ("end_date", end_date_property())],
            &[],
        ),
        tool(
            tools::WORKOUT_TRENDS,
            "Analyze workout trends, training patterns, and athletic profiling over multiple days",
            vec![
                ("days", days_property(30, 7, 60)),
                ("end_date", end_date_property()),
                ("sport_filter", string_property("Only include workouts of this sport (case-insensitive exact match)")),
            ],
            &[],
        ),
        tool(
            tools::TOOLS_GUIDE,
            "Get a comprehensive guide to all available WHOOP analytics tools and their capabilities",
            vec![],
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_response_serialization() {
        let response = InitializeResponse::new(
            "2024-11-05".to_string(),
            "whoop-mcp".to_string(),
            "1.0.0".to_string(),
        );

        let json = serde_json::to_value(&response).expect("Should serialize");

        assert_eq!(json["protocolVersion"], "2024-11-05");
        assert_eq!(json["serverInfo"]["name"], "whoop-mcp");
        assert_eq!(json["serverInfo"]["version"], "1.0.0");
        assert!(json["capabilities"]["tools"].is_object());
        assert!(json["capabilities"]["prompts"].is_object());
        assert!(json["capabilities"]["resources"].is_object());
        assert!(json.get("instructions").is_none());

        let with_prompt = response.with_instructions(Some("Be brief".to_string()));
        assert_eq!(serde_json::to_value(&with_prompt).unwrap()["instructions"], "Be brief");
    }

    #[test]
    fn test_catalogue_has_unique_names() {
        let schemas = tool_schemas();
        assert_eq!(schemas.len(), 23);

        let mut names: Vec<&str> = schemas.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 23);
    }

    #[test]
    fn test_trend_tool_bounds() {
        let schemas = tool_schemas();
        let chart = schemas
            .iter()
            .find(|t| t.name == tools::RECOVERY_CHART)
            .unwrap();
        let json = serde_json::to_value(chart).unwrap();

        assert_eq!(json["inputSchema"]["type"], "object");
        assert_eq!(json["inputSchema"]["properties"]["days"]["type"], "integer");
        assert_eq!(json["inputSchema"]["properties"]["days"]["minimum"], 3);
        assert_eq!(json["inputSchema"]["properties"]["days"]["maximum"], 30);
        assert_eq!(json["inputSchema"]["properties"]["days"]["default"], 14);
    }

    #[test]
    fn test_search_requires_query() {
        let search = tool_schemas()
            .into_iter()
            .find(|t| t.name == tools::SEARCH_SPORTS)
            .unwrap();
        assert_eq!(search.input_schema.required, Some(vec!["query".to_string()]));
    }
}
