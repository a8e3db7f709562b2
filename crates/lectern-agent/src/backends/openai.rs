use super::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use crate::llm::LlmResponse;
use async_trait::async_trait;
use lectern_core::{LecternError, LecternResult, Message, Role, ToolCall};
use lectern_tools::ToolDescriptor;
use serde_json::Value;

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, Groq, Ollama, and any other provider
/// that implements the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_tools(&self, tools: &[ToolDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters_schema,
                    }
                })
            })
            .collect()
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires extra headers
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request
                .header("HTTP-Referer", "https://github.com/lectern-rag/lectern")
                .header("X-Title", "Lectern")
        } else {
            request
        }
    }
}

pub fn build_messages(system_prompt: Option<&str>, messages: &[Message]) -> Vec<Value> {
    let mut api_messages: Vec<Value> = Vec::new();

    if let Some(sys) = system_prompt {
        api_messages.push(serde_json::json!({
            "role": "system",
            "content": sys
        }));
    }

    for m in messages {
        let entry = match m.role {
            Role::System => continue,
            Role::User => serde_json::json!({"role": "user", "content": m.content}),
            Role::Assistant if m.tool_calls.is_empty() => {
                serde_json::json!({"role": "assistant", "content": m.content})
            }
            Role::Assistant => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": c.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if m.content.is_empty() {
                    Value::Null
                } else {
                    Value::from(m.content.clone())
                };
                serde_json::json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Role::Tool => {
                let call_id = m
                    .tool_result
                    .as_ref()
                    .map(|r| r.call_id.clone())
                    .unwrap_or_default();
                serde_json::json!({"role": "tool", "tool_call_id": call_id, "content": m.content})
            }
        };
        api_messages.push(entry);
    }

    api_messages
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> LecternResult<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": build_messages(system_prompt, messages),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(self.build_tools(tools));
        }

        let request = self.add_provider_headers(self.http.post(&url));

        let resp = request
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
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

pub fn parse_openai_response(body: &Value) -> LecternResult<LlmResponse> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| LecternError::Agent("No choices in OpenAI response".into()))?;
    let message = &choice["message"];
    let content = message["content"].as_str().unwrap_or_default().to_string();

    let tool_calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(i, tc)| {
                    let name = tc["function"]["name"].as_str()?.to_string();
                    let id = tc["id"]
                        .as_str()
                        .map_or_else(|| format!("call_{i}"), str::to_string);
                    let arguments = tc["function"]["arguments"]
                        .as_str()
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or_else(|| serde_json::json!({}));
                    Some(ToolCall {
                        id,
                        name,
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if !tool_calls.is_empty() {
        return Ok(LlmResponse::ToolUse {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
        });
    }

    let finish_reason = choice["finish_reason"].as_str().unwrap_or("stop");
    if finish_reason == "stop" {
        Ok(LlmResponse::Done(content))
    } else {
        Ok(LlmResponse::Text(content))
    }
}
