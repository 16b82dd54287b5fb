//! Decision policy client
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The state
//! snapshot is rendered into a prompt with a strict output contract; the
//! reply is parsed tolerantly - a reply with no usable JSON comes back as a
//! `RawDecision` with no recognized type, which the core's validation then
//! coerces to a diagnostic final. Only transport failures are errors.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use loop_core::{DecisionRequest, HistoryEntry, Oracle, RawDecision};

use crate::config::ClientConfig;

const SYSTEM_PROMPT: &str = "\
You are the decision policy for a tool-using agent. Given the goal, user \
messages, action history, governing policies, and the available tools, choose \
exactly one next action.

Respond with a single JSON object and nothing else:
{\"rationale\": \"...\", \"decision_type\": \"tool\" | \"hitl\" | \"final\", \
\"selected_tool\": \"...\", \"arguments\": \"<JSON-encoded object>\", \
\"hitl_request\": \"...\", \"final_response\": \"...\"}

Rules:
- Check the history first. If a question was already answered via a \
hitl_response entry, do not ask it again.
- Use \"hitl\" only for information that is missing from the history.
- Use \"tool\" when a tool can advance the goal; include every required \
argument in the arguments JSON, reusing concrete values from earlier results.
- Use \"final\" when the goal is achieved, cannot be achieved, or the history \
already holds enough to answer.

Policy precedence: organization policies override industry rules, which \
override domain guidelines; the user goal ranks last.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

/// Client for the external decision policy service.
#[derive(Debug, Clone)]
pub struct PolicyClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl PolicyClient {
    pub fn new(config: ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// POST one chat request, retrying transport failures per the config.
    async fn chat(&self, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            stream: false,
        };
        let api_key = std::env::var(&self.config.api_key_env).ok();

        let mut last_error = None;
        for attempt in 0..=self.config.retry.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry.backoff_ms * attempt as u64;
                debug!(attempt, backoff_ms = backoff, "Retrying decision request");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let mut builder = self.client.post(&url).json(&request);
            if let Some(key) = &api_key {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => {
                        let parsed: ChatResponse = response
                            .json()
                            .await
                            .context("Failed to parse decision service response")?;
                        let content = parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .unwrap_or_default();
                        return Ok(content);
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "Decision service returned error status");
                        last_error = Some(anyhow::Error::new(e));
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "Decision request failed");
                    last_error = Some(anyhow::Error::new(e));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Decision request failed with no attempts"))
            .context(format!("Decision service unreachable at {}", url)))
    }
}

#[async_trait]
impl Oracle for PolicyClient {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn decide(&self, request: &DecisionRequest) -> Result<RawDecision> {
        let prompt = render_prompt(request);
        let reply = self.chat(&prompt).await?;
        debug!(reply_len = reply.len(), "Received decision reply");
        Ok(parse_raw_decision(&reply))
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "(none)"
    } else {
        value
    }
}

fn render_history(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }
    history
        .iter()
        .map(|entry| {
            let mut line = format!(
                "step {} [{}] {} ({}): {}",
                entry.step, entry.actor, entry.action, entry.outcome, entry.result
            );
            if let Some(args) = &entry.arguments {
                if !args.is_empty() {
                    line.push_str(&format!(
                        " | arguments: {}",
                        Value::Object(args.clone())
                    ));
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the snapshot into the user prompt.
fn render_prompt(request: &DecisionRequest) -> String {
    let messages = if request.user_messages.is_empty() {
        "(none)".to_string()
    } else {
        request
            .user_messages
            .iter()
            .map(|m| format!("- {}", m))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Goal: {}\n\nUser messages:\n{}\n\nHistory:\n{}\n\n\
         Organization policies: {}\nIndustry rules: {}\nDomain guidelines: {}\n\n{}",
        request.goal,
        messages,
        render_history(&request.history),
        or_none(&request.org_policies),
        or_none(&request.industry_rules),
        or_none(&request.domain_guidelines),
        request.available_tools,
    )
}

/// Parse a raw decision out of the model reply.
///
/// Tries the reply as-is, then the contents of a markdown code fence, then
/// the first balanced JSON object found anywhere in the text. A reply with
/// nothing parseable yields a `RawDecision` with no decision type; the core
/// coerces that to a diagnostic final rather than failing the call.
fn parse_raw_decision(reply: &str) -> RawDecision {
    let candidate = extract_json_from_markdown(reply).unwrap_or_else(|| reply.trim());

    if let Ok(raw) = serde_json::from_str::<RawDecision>(candidate) {
        return raw;
    }
    if let Some(object) = extract_first_json_object(reply) {
        if let Ok(raw) = serde_json::from_str::<RawDecision>(object) {
            return raw;
        }
    }

    warn!(reply_len = reply.len(), "Decision reply contained no parseable JSON");
    RawDecision {
        rationale: reply.chars().take(200).collect(),
        ..Default::default()
    }
}

/// Extract JSON content from a markdown code block.
fn extract_json_from_markdown(content: &str) -> Option<&str> {
    let patterns = ["```json\n", "```JSON\n", "```\n"];

    for pattern in patterns {
        if let Some(start) = content.find(pattern) {
            let json_start = start + pattern.len();
            if let Some(end) = content[json_start..].find("```") {
                return Some(content[json_start..json_start + end].trim());
            }
        }
    }

    None
}

/// Find the first balanced `{...}` object in the text.
fn extract_first_json_object(content: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if c != '\\' {
                escaped = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start {
                            return Some(&content[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    None
}
