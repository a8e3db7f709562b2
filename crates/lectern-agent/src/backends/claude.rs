use super::LlmBackend;
use crate::config::ModelConfig;
use crate::llm::LlmResponse;
use async_trait::async_trait;
use lectern_core::{LecternError, LecternResult, Message, Role, ToolCall};
use lectern_tools::ToolDescriptor;
use serde::Serialize;
use serde_json::Value;

/// Claude (Anthropic Messages API) backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> LecternResult<LlmResponse> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let claude_tools: Vec<ClaudeTool> = tools
            .iter()
            .map(|t| ClaudeTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters_schema.clone(),
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": build_messages(messages, !claude_tools.is_empty()),
        });

        if let Some(sys) = system_prompt {
            body["system"] = serde_json::json!(sys);
        }

        if !claude_tools.is_empty() {
            body["tools"] = serde_json::to_value(&claude_tools)?;
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LecternError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: Value = resp
            .json()
            .await
            .map_err(|e| LecternError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(LecternError::Http(format!(
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

// -- Claude wire types --

#[derive(Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: Value,
}

/// Map conversation turns to Messages API entries.
///
/// The API rejects `tool_use`/`tool_result` blocks in a request that defines
/// no tools, so with `tool_blocks == false` those turns are rendered as text.
/// Consecutive tool results are merged into a single user turn.
pub fn build_messages(messages: &[Message], tool_blocks: bool) -> Vec<Value> {
    let mut api_messages: Vec<Value> = Vec::new();

    for m in messages {
        let entry = match m.role {
            Role::System => continue,
            Role::User => serde_json::json!({"role": "user", "content": m.content}),
            Role::Assistant if m.tool_calls.is_empty() => {
                serde_json::json!({"role": "assistant", "content": m.content})
            }
            Role::Assistant if tool_blocks => {
                let mut blocks = Vec::new();
                if !m.content.is_empty() {
                    blocks.push(serde_json::json!({"type": "text", "text": m.content}));
                }
                for call in &m.tool_calls {
                    blocks.push(serde_json::json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                serde_json::json!({"role": "assistant", "content": blocks})
            }
            Role::Assistant => {
                let mut lines: Vec<String> = Vec::new();
                if !m.content.is_empty() {
                    lines.push(m.content.clone());
                }
                for call in &m.tool_calls {
                    lines.push(format!("[called {} with {}]", call.name, call.arguments));
                }
                serde_json::json!({"role": "assistant", "content": lines.join("\n")})
            }
            Role::Tool => {
                let block = match (&m.tool_result, tool_blocks) {
                    (Some(result), true) => serde_json::json!({
                        "type": "tool_result",
                        "tool_use_id": result.call_id,
                        "content": result.content,
                        "is_error": result.is_error,
                    }),
                    _ => serde_json::json!({
                        "type": "text",
                        "text": format!("[tool result]\n{}", m.content),
                    }),
                };
                if let Some(last) = api_messages.last_mut() {
                    if last["role"] == "user" {
                        if let Some(content) = last["content"].as_array_mut() {
                            content.push(block);
                            continue;
                        }
                    }
                }
                serde_json::json!({"role": "user", "content": [block]})
            }
        };
        api_messages.push(entry);
    }

    api_messages
}

pub fn parse_claude_response(body: &Value) -> LecternResult<LlmResponse> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| LecternError::Agent("Missing content in Claude response".into()))?;

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text_parts.push(t.to_string());
                }
            }
            Some("tool_use") => {
                let id = block["id"].as_str().unwrap_or_default().to_string();
                let name = block["name"].as_str().unwrap_or_default().to_string();
                let arguments = block["input"].clone();
                tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments,
                });
            }
            _ => {}
        }
    }

    if !tool_calls.is_empty() {
        Ok(LlmResponse::ToolUse {
            content: if text_parts.is_empty() {
                None
            } else {
                Some(text_parts.join("\n"))
            },
            tool_calls,
        })
    } else {
        let stop_reason = body["stop_reason"].as_str().unwrap_or("end_turn");
        let text = text_parts.join("\n");
        if stop_reason == "end_turn" {
            Ok(LlmResponse::Done(text))
        } else {
            Ok(LlmResponse::Text(text))
        }
    }
}
