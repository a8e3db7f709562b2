use super::LlmBackend;
use crate::config::ModelConfig;
use crate::llm::LlmResponse;
use async_trait::async_trait;
use lectern_core::{LecternError, LecternResult, Message, Role, ToolCall};
use lectern_tools::ToolDescriptor;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn model_name(&self) -> String {
        let model = &self.config.model_id;
        if model.starts_with("models/") {
            model.clone()
        } else {
            format!("models/{model}")
        }
    }
}

fn build_tools(tools: &[ToolDescriptor]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters_schema,
            })
        })
        .collect();
    serde_json::json!([{ "function_declarations": declarations }])
}

/// Map conversation turns to Gemini `contents`.
///
/// Gemini names function responses by function, not by call id, so ids are
/// resolved through the preceding assistant turns. Consecutive tool results
/// share one user turn.
pub fn build_contents(messages: &[Message]) -> Vec<Value> {
    let id_to_name: HashMap<&str, &str> = messages
        .iter()
        .flat_map(|m| m.tool_calls.iter())
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect();

    let mut contents: Vec<Value> = Vec::new();
    for m in messages {
        let entry = match m.role {
            Role::System => continue,
            Role::User => serde_json::json!({"role": "user", "parts": [{"text": m.content}]}),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !m.content.is_empty() {
                    parts.push(serde_json::json!({"text": m.content}));
                }
                for call in &m.tool_calls {
                    parts.push(serde_json::json!({
                        "functionCall": {"name": call.name, "args": call.arguments}
                    }));
                }
                serde_json::json!({"role": "model", "parts": parts})
            }
            Role::Tool => {
                let name = m
                    .tool_result
                    .as_ref()
                    .and_then(|r| id_to_name.get(r.call_id.as_str()).copied())
                    .unwrap_or("tool");
                let part = serde_json::json!({
                    "functionResponse": {
                        "name": name,
                        "response": {"content": m.content},
                    }
                });
                if let Some(last) = contents.last_mut() {
                    let is_response_turn = last["role"] == "user"
                        && last["parts"][0].get("functionResponse").is_some();
                    if is_response_turn {
                        if let Some(parts) = last["parts"].as_array_mut() {
                            parts.push(part);
                            continue;
                        }
                    }
                }
                serde_json::json!({"role": "user", "parts": [part]})
            }
        };
        contents.push(entry);
    }
    contents
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> LecternResult<LlmResponse> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.config.base_url(),
            self.model_name()
        );

        let mut body = serde_json::json!({
            "contents": build_contents(messages),
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_tokens,
            },
        });

        if let Some(sys) = system_prompt {
            body["systemInstruction"] = serde_json::json!({"parts": [{"text": sys}]});
        }

        if !tools.is_empty() {
            body["tools"] = build_tools(tools);
        }

        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
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
                "Gemini API error {status}: {resp_body}"
            )));
        }

        parse_gemini_response(&resp_body)
    }
}

pub fn parse_gemini_response(body: &Value) -> LecternResult<LlmResponse> {
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(LecternError::Agent(format!("Gemini API error: {message}")));
    }

    let candidate = body["candidates"]
        .get(0)
        .ok_or_else(|| LecternError::Agent("No candidates in Gemini response".into()))?;
    let parts = candidate["content"]["parts"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    for part in parts {
        if let Some(text) = part["text"].as_str() {
            if !text.is_empty() {
                text_parts.push(text.to_string());
            }
        }
        if let Some(call) = part.get("functionCall") {
            let arguments = match &call["args"] {
                args @ Value::Object(_) => args.clone(),
                Value::Null => Value::Object(Map::new()),
                other => {
                    let mut wrapped = Map::new();
                    wrapped.insert("input".to_string(), other.clone());
                    Value::Object(wrapped)
                }
            };
            let id = call["id"]
                .as_str()
                .map_or_else(|| format!("gemini_call_{}", tool_calls.len() + 1), str::to_string);
            tool_calls.push(ToolCall {
                id,
                name: call["name"].as_str().unwrap_or_default().to_string(),
                arguments,
            });
        }
    }

    let text = text_parts.join("\n");
    if !tool_calls.is_empty() {
        return Ok(LlmResponse::ToolUse {
            content: (!text.is_empty()).then_some(text),
            tool_calls,
        });
    }

    match candidate["finishReason"].as_str() {
        Some("STOP") | None => Ok(LlmResponse::Done(text)),
        Some(_) => Ok(LlmResponse::Text(text)),
    }
}
