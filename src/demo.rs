// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Parallel Demo
//!
//! Submits a research task to the Parallel task API with this server
//! registered as an MCP tool source, follows the run's event stream and
//! prints the final structured report.

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use futures_util::StreamExt;
use serde_json::{json, Map, Value};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::parallel;

/// Connection settings for the task API
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub api_key: String,
    /// Sent to our own `/mcp` endpoint as `X-API-Key`
    pub mcp_api_key: String,
    pub base_url: String,
    pub max_reconnects: u32,
    pub reconnect_delay: Duration,
}

impl ParallelConfig {
    pub fn new(api_key: impl Into<String>, mcp_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            mcp_api_key: mcp_api_key.into(),
            base_url: parallel::DEFAULT_BASE_URL.to_string(),
            max_reconnects: parallel::MAX_RECONNECTS,
            reconnect_delay: Duration::from_secs(parallel::RECONNECT_DELAY_SECS),
        }
    }

    /// `PARALLEL_API_KEY` is required; `MCP_API_KEY` falls back to the development key
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("PARALLEL_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("PARALLEL_API_KEY environment variable is required"))?;
        let mcp_api_key =
            env::var("MCP_API_KEY").unwrap_or_else(|_| parallel::DEFAULT_MCP_API_KEY.to_string());
        Ok(Self::new(api_key, mcp_api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_reconnects(mut self, max_reconnects: u32, delay: Duration) -> Self {
        self.max_reconnects = max_reconnects;
        self.reconnect_delay = delay;
        self
    }
}

/// `{public_url}/mcp`, tolerating a trailing slash
pub fn mcp_url(public_url: &str) -> String {
    format!("{}/mcp", public_url.trim_end_matches('/'))
}

pub fn task_prompt() -> &'static str {
    r#"I need you to conduct EXTENSIVE research across both my WHOOP data and the web to solve a specific fitness puzzle:

**MY PROFILE:**
- Demographics: [Include your Demographics]
- Training routine: [Summarize your exercise routine; WHOOP does not have strength training data available via MCP]
- WHOOP data: includes HRV, RHR, strain, recovery, and sleep metrics

**THE PUZZLE:**
I've been really curious about what it means to "train like an athlete." Specifically: how far away am I from the physiological profiles of different athlete groups, and what changes would most effectively move my metrics in that direction?

**RESEARCH REQUIREMENTS:**
Search extensively across:
- Published biometric norms (2020-2025) for athletes in different categories (endurance, strength/power, team sport, recreationally trained)
- Studies comparing trained vs untrained people with my demographic by HRV, RHR, recovery, VO2, sleep
- Research on training adaptations and interventions that shift these metrics
- Evidence-based protocols athletes use to close gaps in HRV, RHR, or recovery
- Demographic factors that might affect adaptation patterns

**CRITICAL:** Use my actual WHOOP data throughout with MCP tool calls. Reference specific studies (2020-2025), include direct URLs to research papers, training protocols, and practical resources, and include a clear summary of my WHOOP data in relation to your web research."#
}

const REPORT_FIELDS: [(&str, &str); 11] = [
    ("whoop_data_summary", "Comprehensive 30-day snapshot of WHOOP data including average RHR (bpm), HRV (ms), daily strain, sleep duration, restorative sleep (deep + REM), recovery scores and workout frequency. Present as a clear, organized summary with key trends and patterns."),
    ("athlete_norms_endurance", "Published ranges (2020-2025) for endurance athletes: HRV, RHR, recovery, VO2 max, sleep metrics. Include specific studies and sample sizes."),
    ("athlete_norms_strength", "Published ranges (2020-2025) for strength/power athletes: HRV, RHR, recovery, VO2 max, sleep metrics. Include specific studies and sample sizes."),
    ("athlete_norms_team_sport", "Published ranges (2020-2025) for team sport athletes: HRV, RHR, recovery, VO2 max, sleep metrics. Include specific studies and sample sizes."),
    ("cohort_comparison_summary", "Detailed comparison showing percent similarity of the user's metrics to each athlete cohort. Highlight closest matches and the largest gaps with specific numbers."),
    ("training_interventions", "Research-backed training and recovery interventions (2020-2025) to improve HRV, reduce RHR and enhance recovery, with protocols, timelines and effect sizes."),
    ("top_3_cohort_matches", "Ranked list of athlete cohorts the user most closely resembles, with quantitative and qualitative comparison."),
    ("biggest_gaps", "Top 3 largest gaps between the user's metrics and target athlete cohorts, with specific numbers and citations."),
    ("evidence_based_action_plan", "5 prioritized, research-backed recommendations with implementation steps, expected timelines and links to supporting studies."),
    ("forecast_timeline", "Realistic timelines for closing specific gaps based on intervention studies, including milestones and expected progression rates."),
    ("red_flags", "Warning signs or conditions where pursuing elite athlete metrics could be risky or require medical oversight."),
];

/// Structured output schema for the benchmarking report
pub fn task_spec() -> Value {
    let properties: Map<String, Value> = REPORT_FIELDS
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = REPORT_FIELDS.iter().map(|(name, _)| *name).collect();

    json!({
        "output_schema": {
            "type": "json",
            "json_schema": {
                "type": "object",
                "description": "Benchmarking of WHOOP fitness data against athlete cohorts with research-backed interventions",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        }
    })
}

/// Body for `POST /v1/tasks/runs`
pub fn run_request(mcp_url: &str, mcp_api_key: &str) -> Value {
    json!({
        "input": task_prompt(),
        "processor": parallel::PROCESSOR,
        "enable_events": true,
        "task_spec": task_spec(),
        "mcp_servers": [{
            "type": "url",
            "url": mcp_url,
            "name": parallel::MCP_SERVER_NAME,
            "headers": { "X-API-Key": mcp_api_key },
        }],
    })
}

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    State {
        status: String,
    },
    Progress {
        kind: String,
        message: String,
        timestamp: Option<String>,
    },
    Stats {
        considered: u64,
        read: u64,
        sample: Vec<String>,
    },
    Other {
        kind: String,
        message: Option<String>,
    },
}

impl TaskEvent {
    pub fn from_value(event: &Value) -> Self {
        let kind = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        if kind == "task_run.state" {
            let status = event
                .pointer("/run/status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return TaskEvent::State {
                status: status.to_string(),
            };
        }

        if kind.starts_with("task_run.progress_msg") {
            return TaskEvent::Progress {
                message: event
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("No message")
                    .to_string(),
                timestamp: event
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                kind,
            };
        }

        if kind == "task_run.progress_stats" {
            let stats = event.get("source_stats").cloned().unwrap_or(Value::Null);
            return TaskEvent::Stats {
                considered: stats["num_sources_considered"].as_u64().unwrap_or(0),
                read: stats["num_sources_read"].as_u64().unwrap_or(0),
                sample: stats["sources_read_sample"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            };
        }

        TaskEvent::Other {
            message: event
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            kind,
        }
    }
}

/// Splits a byte stream into `data: ` payloads. Lines may span chunks.
#[derive(Debug, Default)]
pub struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the JSON payloads of every completed line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            if let Some(payload) = line.strip_prefix("data: ") {
                match serde_json::from_str(payload) {
                    Ok(event) => events.push(event),
                    Err(e) => debug!("Skipping undecodable event: {}", e),
                }
            }
        }

        events
    }
}

/// How following a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// `failed` or `cancelled`
    Stopped(String),
    /// Reconnect budget exhausted before a terminal state
    Incomplete,
}

fn event_label(kind: &str) -> (&'static str, &'static str) {
    match kind {
        "task_run.progress_msg.exec_status" => ("[START]", "Starting"),
        "task_run.progress_msg.plan" => ("[PLAN]", "Reasoning"),
        "task_run.progress_msg.tool" => ("[TOOL]", "Tool"),
        "task_run.progress_msg.tool_call" => ("[MCP]", "MCP Tool Call"),
        "task_run.progress_msg.search" => ("[SEARCH]", "Web Search"),
        _ => ("[UPDATE]", "Update"),
    }
}

fn clock_time(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

fn clean_source(source: &str) -> String {
    let bare = source
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    if bare.chars().count() > 50 {
        truncate(bare, 47)
    } else {
        bare.to_string()
    }
}

/// Turns events into console text; progress stats only print when the source count grows
#[derive(Debug, Default)]
pub struct EventPrinter {
    sources_considered: u64,
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, event: &TaskEvent) -> Option<String> {
        match event {
            TaskEvent::State { status } => Some(format!("📊 Task Status: {}", status)),
            TaskEvent::Progress {
                kind,
                message,
                timestamp,
            } => {
                let (icon, title) = event_label(kind);
                let mut text = format!(
                    "{} {} [{}]\n{}",
                    icon,
                    title,
                    clock_time(timestamp.as_deref()),
                    message
                );
                match kind.as_str() {
                    "task_run.progress_msg.plan" => text.push_str("\n🧠 Agent is strategizing..."),
                    "task_run.progress_msg.tool" => text.push_str("\n🔧 Tool reasoning complete"),
                    _ => {}
                }
                Some(text)
            }
            TaskEvent::Stats {
                considered,
                read,
                sample,
            } => {
                if *considered == 0 || *considered <= self.sources_considered {
                    return None;
                }
                self.sources_considered = *considered;

                let mut text = format!(
                    "📈 Research Progress: {}/{} sources analyzed",
                    read, considered
                );
                if !sample.is_empty() {
                    text.push_str("\n\nMost recent sources:");
                    let start = sample.len().saturating_sub(5);
                    for source in &sample[start..] {
                        text.push_str(&format!("\n   • {}", clean_source(source)));
                    }
                    if sample.len() > 5 {
                        text.push_str(&format!("\n   ...and {} more", sample.len() - 5));
                    }
                }
                Some(text)
            }
            TaskEvent::Other { kind, message } => {
                let mut text = format!("🔔 Unhandled event: {}", kind);
                if let Some(message) = message {
                    text.push_str(&format!("\n   Message: {}", message));
                }
                Some(text)
            }
        }
    }
}

/// Client for the task API endpoints the demo touches
pub struct ParallelClient {
    http: reqwest::Client,
    config: ParallelConfig,
}

impl ParallelClient {
    pub fn new(config: ParallelConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Create the run and return its id
    pub async fn create_run(&self, mcp_url: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/v1/tasks/runs"))
            .header("x-api-key", &self.config.api_key)
            .header("parallel-beta", parallel::RUN_BETA)
            .json(&run_request(mcp_url, &self.config.mcp_api_key))
            .send()
            .await
            .context("Failed to reach the task API")?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status != 200 && status != 202 {
            bail!("Error creating task: {}", body);
        }

        let created: Value = serde_json::from_str(&body).context("Malformed task response")?;
        created
            .get("run_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Task response did not include a run_id"))
    }

    /// Read one connection's worth of events. `None` means the stream ended early.
    async fn stream_once(
        &self,
        run_id: &str,
        printer: &mut EventPrinter,
        emit: &mut (dyn FnMut(String) + Send),
    ) -> Result<Option<RunOutcome>> {
        let response = self
            .http
            .get(self.url(&format!("/v1beta/tasks/runs/{}/events", run_id)))
            .header("x-api-key", &self.config.api_key)
            .header("accept", "text/event-stream")
            .header("parallel-beta", parallel::EVENTS_BETA)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            bail!("HTTP {}: {}", status, body);
        }

        let mut buffer = SseBuffer::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for value in buffer.push(&chunk) {
                let event = TaskEvent::from_value(&value);
                if let Some(text) = printer.render(&event) {
                    emit(text);
                }
                if let TaskEvent::State { status } = &event {
                    match status.as_str() {
                        "completed" => return Ok(Some(RunOutcome::Completed)),
                        "failed" | "cancelled" => {
                            emit(format!("❌ Task {}", status));
                            return Ok(Some(RunOutcome::Stopped(status.clone())));
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(None)
    }

    /// Follow the event stream until the run finishes or reconnects run out
    pub async fn follow_run(
        &self,
        run_id: &str,
        emit: &mut (dyn FnMut(String) + Send),
    ) -> RunOutcome {
        let mut printer = EventPrinter::new();
        let max = self.config.max_reconnects;
        let mut reconnects = 0;

        while reconnects < max {
            if reconnects > 0 {
                emit(format!(
                    "🔗 Reconnecting to event stream (attempt {})...",
                    reconnects + 1
                ));
            }

            match self.stream_once(run_id, &mut printer, emit).await {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {
                    reconnects += 1;
                    emit(format!(
                        "🔄 Stream ended, reconnecting... ({}/{})",
                        reconnects, max
                    ));
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
                Err(e) => {
                    warn!("Event stream error: {}", e);
                    emit(format!("Stream error: {}", e));
                    reconnects += 1;
                    if reconnects < max {
                        emit(format!("🔄 Reconnecting... ({}/{})", reconnects, max));
                        tokio::time::sleep(self.config.reconnect_delay).await;
                    } else {
                        emit("Max reconnection attempts reached".to_string());
                    }
                }
            }
        }

        RunOutcome::Incomplete
    }

    pub async fn get_result(&self, run_id: &str) -> Result<Value> {
        let response = self
            .http
            .get(self.url(&format!("/v1/tasks/runs/{}/result", run_id)))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Error getting task result: {}", body);
        }
        Ok(response.json().await?)
    }
}

fn field_title(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn field_preview(value: &Value, max_chars: usize) -> String {
    match value {
        Value::String(text) => truncate(text, max_chars),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => {
            let lines: Vec<String> = map
                .iter()
                .map(|(key, v)| {
                    let v = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                    format!("• {}: {}", field_title(key), v)
                })
                .collect();
            truncate(&lines.join("\n"), max_chars)
        }
        Value::Array(items) => {
            let mut lines: Vec<String> = items
                .iter()
                .take(3)
                .map(|item| {
                    let text = item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string());
                    format!("• {}", truncate(&text, 100))
                })
                .collect();
            if items.len() > 3 {
                lines.push(format!("... and {} more items", items.len() - 3));
            }
            lines.join("\n")
        }
        other => truncate(&other.to_string(), max_chars),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

const PRIORITY_FIELDS: [&str; 4] = [
    "whoop_data_summary",
    "cohort_comparison_summary",
    "evidence_based_action_plan",
    "biggest_gaps",
];

struct FieldGroup {
    heading: &'static str,
    markers: &'static [&'static str],
    preview: usize,
    limit: usize,
}

const FIELD_GROUPS: [FieldGroup; 5] = [
    FieldGroup { heading: "📱 YOUR DATA", markers: &["summary"], preview: 150, limit: usize::MAX },
    FieldGroup { heading: "📚 RESEARCH FINDINGS", markers: &["norms"], preview: 400, limit: 5 },
    FieldGroup {
        heading: "💡 INTERVENTIONS & SOLUTIONS",
        markers: &["intervention", "forecast_timeline"],
        preview: 350,
        limit: usize::MAX,
    },
    FieldGroup { heading: "🎯 ATHLETE COMPARISONS", markers: &["matches"], preview: 350, limit: usize::MAX },
    FieldGroup { heading: "⚠️ CLINICAL CONSIDERATIONS", markers: &["red_flag", "warning"], preview: 350, limit: usize::MAX },
];

fn push_field(out: &mut String, name: &str, value: &Value, preview: usize) {
    out.push_str(&format!("── {} ──\n{}\n\n", field_title(name), field_preview(value, preview)));
}

/// Console report for a finished run's result document
pub fn render_result(result: &Value) -> String {
    let Some(output) = result.get("output") else {
        return "No task output available".to_string();
    };
    let Some(content) = output.get("content").filter(|c| !c.is_null()) else {
        return "No content found in output".to_string();
    };

    let pretty = serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string());
    let length = pretty.chars().count();
    let mut out = format!(
        "Analysis Complete!\nTotal analysis: {} characters (~{} pages)\n\n",
        length,
        length / 3000
    );

    let basis = output.get("basis").and_then(Value::as_array).cloned().unwrap_or_default();
    if !basis.is_empty() {
        out.push_str("📚 RESEARCH BASIS PREVIEW\n\n");
        for (i, field) in basis.iter().take(parallel::BASIS_PREVIEW).enumerate() {
            out.push_str(&format!(
                "{}. Field: {}\n",
                i + 1,
                field.get("field").and_then(Value::as_str).unwrap_or("Unknown")
            ));
            if let Some(reasoning) = field.get("reasoning").and_then(Value::as_str).filter(|r| !r.is_empty()) {
                out.push_str(&format!("   Reasoning: {}\n", truncate(reasoning, 80)));
            }
            if let Some(citation) = field.pointer("/citations/0") {
                out.push_str(&format!(
                    "   Source: {}\n",
                    citation.get("url").and_then(Value::as_str).unwrap_or("N/A")
                ));
                if let Some(excerpt) = citation.pointer("/excerpts/0").and_then(Value::as_str) {
                    out.push_str(&format!("   Excerpt: {}\n", truncate(excerpt, 100)));
                }
            }
            out.push('\n');
        }
        if basis.len() > parallel::BASIS_PREVIEW {
            out.push_str(&format!(
                "...and {} more fields captured!\n\n",
                basis.len() - parallel::BASIS_PREVIEW
            ));
        }
    }

    let calls = output
        .get("mcp_tool_calls")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !calls.is_empty() {
        out.push_str("MCP TOOL CALLS\n\n");
        for (i, call) in calls.iter().take(parallel::TOOL_CALL_PREVIEW).enumerate() {
            let text = |key: &str| call.get(key).and_then(Value::as_str).unwrap_or("Unknown");
            out.push_str(&format!("{}. Tool: {}\n   Server: {}\n", i + 1, text("tool_name"), text("server_name")));
            if let Some(content) = call.get("content").and_then(Value::as_str).filter(|c| !c.is_empty()) {
                out.push_str(&format!("   Result: {}\n", truncate(content, 100)));
            } else if let Some(error) = call.get("error").and_then(Value::as_str) {
                out.push_str(&format!("   Error: {}\n", error));
            }
            out.push('\n');
        }
        if calls.len() > parallel::TOOL_CALL_PREVIEW {
            out.push_str(&format!(
                "...and {} more tool calls!\n\n",
                calls.len() - parallel::TOOL_CALL_PREVIEW
            ));
        }
    }

    let Some(fields) = content.as_object() else {
        out.push_str("🔍 Raw Analysis Content\n");
        out.push_str(&truncate(&pretty, 2000));
        out.push('\n');
        return out;
    };

    out.push_str("ATHLETE BENCHMARKING REPORT\n\n");
    for name in PRIORITY_FIELDS {
        if let Some(value) = fields.get(name).filter(|v| is_present(v)) {
            push_field(&mut out, name, value, 300);
        }
    }

    let mut remaining: Vec<&String> = fields
        .iter()
        .filter(|(name, value)| !PRIORITY_FIELDS.contains(&name.as_str()) && is_present(value))
        .map(|(name, _)| name)
        .collect();

    for group in &FIELD_GROUPS {
        let (members, rest): (Vec<&String>, Vec<&String>) = remaining
            .into_iter()
            .partition(|name| group.markers.iter().any(|m| name.to_lowercase().contains(m)));
        remaining = rest;
        if members.is_empty() {
            continue;
        }

        out.push_str(&format!("{}\n\n", group.heading));
        for name in members.iter().take(group.limit) {
            push_field(&mut out, name, &fields[name.as_str()], group.preview);
        }
        if members.len() > group.limit {
            out.push_str(&format!("...and {} more fields available\n\n", members.len() - group.limit));
        }
    }

    if !remaining.is_empty() {
        out.push_str("📋 ADDITIONAL INSIGHTS\n\n");
        for name in remaining.iter().take(3) {
            push_field(&mut out, name, &fields[name.as_str()], 250);
        }
        if remaining.len() > 3 {
            out.push_str(&format!("...and {} more fields available\n\n", remaining.len() - 3));
        }
    }

    out
}

/// Full demo: create the run, stream progress, print the report
pub async fn run_demo(config: ParallelConfig, public_url: &str) -> Result<RunOutcome> {
    let client = ParallelClient::new(config);
    let mcp = mcp_url(public_url);

    println!("Parallel AI × WHOOP Integration");
    println!("Athlete Benchmarking & Training Optimization via MCP\n");
    println!("Using MCP URL: {}\n", mcp);

    let run_id = client.create_run(&mcp).await?;
    println!("✅ Task created: {}\n", run_id);
    println!("🔴 LIVE: Streaming real-time analysis...\n");

    let mut print = |text: String| println!("{}\n", text);
    let outcome = client.follow_run(&run_id, &mut print).await;

    if outcome == RunOutcome::Completed {
        println!("{}", "=".repeat(80));
        println!("Fetching complete task result...");
        match client.get_result(&run_id).await {
            Ok(result) => println!("{}", render_result(&result)),
            Err(e) => println!("Failed to retrieve task result: {}", e),
        }
    } else {
        println!("Task did not complete during demo session");
    }

    println!("\nDemo completed! Your WHOOP data was benchmarked against athlete cohorts in real-time via MCP.");
    Ok(outcome)
}
