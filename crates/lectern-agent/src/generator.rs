use crate::llm::{LlmClient, LlmResponse};
use lectern_core::{LecternResult, Message, ToolResult};
use lectern_tools::search::SEARCH_TOOL_NAME;
use lectern_tools::{ToolDescriptor, ToolManager};
use tracing::{debug, info};

/// Instructions sent as the system prompt of every generation.
pub const SYSTEM_PROMPT: &str = "\
You are an assistant for course materials and educational content, with tools \
for searching course content and reading course outlines.

Tool usage:
- Use the search tool only for questions about specific course content or \
detailed educational materials.
- Use the outline tool for questions about a course's structure, link or lesson list.
- At most one search per query.
- Build accurate, fact-based answers from the tool results.
- If a search returns nothing, say so plainly without offering alternatives.

Responding:
- General knowledge questions: answer from your own knowledge without searching.
- Course-specific questions: search first, then answer.
- No meta-commentary: give the answer only. Do not describe your reasoning or \
searches, and do not write \"based on the search results\".

Every answer must be:
1. Brief and focused
2. Educational
3. Clear, in accessible language
4. Supported by examples when they help understanding

Provide only the direct answer to what was asked.";

/// Result of one generation: the answer plus the sources cited by the tools
/// it ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Runs one tool-augmented generation against an [`LlmClient`].
pub struct ResponseGenerator {
    llm: LlmClient,
}

impl ResponseGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// System prompt followed by the prior conversation, when there is one.
    pub fn system_content(history: Option<&str>) -> String {
        match history {
            Some(history) if !history.is_empty() => {
                format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{history}")
            }
            _ => SYSTEM_PROMPT.to_string(),
        }
    }

    /// Generate an answer for `query`.
    ///
    /// When the first response requests tools and a manager is available,
    /// every requested call is executed and the provider is called exactly
    /// once more, without tool definitions. There is never a second round.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &[ToolDescriptor],
        manager: Option<&ToolManager>,
    ) -> LecternResult<Generation> {
        let system = Self::system_content(history);
        let mut messages = vec![Message::user(query)];

        let first = self.llm.chat(Some(&system), &messages, tools).await?;

        let (manager, content, tool_calls) = match (first, manager) {
            (
                LlmResponse::ToolUse {
                    content,
                    tool_calls,
                },
                Some(manager),
            ) if !tool_calls.is_empty() => (manager, content, tool_calls),
            (response, _) => {
                return Ok(Generation {
                    answer: response.into_text(),
                    sources: Vec::new(),
                })
            }
        };

        let mut calls = tool_calls;
        for call in &mut calls {
            if call.name == SEARCH_TOOL_NAME && call.str_arg("query").is_none() {
                debug!(call_id = %call.id, "Search call without query, using the user query");
                if !call.arguments.is_object() {
                    call.arguments = serde_json::json!({});
                }
                call.arguments["query"] = serde_json::Value::from(query);
            }
        }

        messages.push(Message::assistant_tool_calls(content, calls.clone()));

        let mut sources: Vec<String> = Vec::new();
        for call in &calls {
            info!(tool = %call.name, call_id = %call.id, "Executing tool call");
            let output = manager.execute(call).await;
            for source in &output.sources {
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
            let result = if output.is_error {
                ToolResult::error(&call.id, output.result)
            } else {
                ToolResult::success(&call.id, output.result)
            };
            messages.push(Message::tool(result));
        }

        let final_response = self.llm.chat(Some(&system), &messages, &[]).await?;
        Ok(Generation {
            answer: final_response.into_text(),
            sources,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backends::LlmBackend;
    use async_trait::async_trait;
    use lectern_core::{LecternError, Role, ToolCall};
    use lectern_tools::{Tool, ToolOutput};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Records every request and replays canned responses.
    #[derive(Default)]
    struct ScriptedBackend {
        responses: Mutex<VecDeque<LlmResponse>>,
        requests: Arc<Mutex<Vec<(String, Vec<Message>, usize)>>>,
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn chat(
            &self,
            system_prompt: Option<&str>,
            messages: &[Message],
            tools: &[ToolDescriptor],
        ) -> LecternResult<LlmResponse> {
            self.requests.lock().push((
                system_prompt.unwrap_or_default().to_string(),
                messages.to_vec(),
                tools.len(),
            ));
            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| LecternError::Agent("no scripted response".into()))
        }
    }

    struct RecordingSearch {
        descriptor: ToolDescriptor,
        seen: Arc<Mutex<Vec<ToolCall>>>,
    }

    #[async_trait]
    impl Tool for RecordingSearch {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, call: &ToolCall) -> LecternResult<ToolOutput> {
            self.seen.lock().push(call.clone());
            Ok(ToolOutput::with_sources(
                "[MCP - Lesson 1]\nServers expose tools.",
                vec!["MCP - Lesson 1".into()],
            ))
        }
    }

    type Requests = Arc<Mutex<Vec<(String, Vec<Message>, usize)>>>;

    fn generator(responses: Vec<LlmResponse>) -> (ResponseGenerator, Requests) {
        let backend = ScriptedBackend {
            responses: Mutex::new(responses.into()),
            ..ScriptedBackend::default()
        };
        let requests = backend.requests.clone();
        let llm = LlmClient::from_backend(Box::new(backend));
        (ResponseGenerator::new(llm), requests)
    }

    fn manager() -> (ToolManager, Arc<Mutex<Vec<ToolCall>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ToolManager::new();
        manager.register(Arc::new(RecordingSearch {
            descriptor: ToolDescriptor {
                name: SEARCH_TOOL_NAME.into(),
                description: "search".into(),
                parameters_schema: serde_json::json!({"type": "object"}),
            },
            seen: seen.clone(),
        }));
        (manager, seen)
    }

    fn search_call(arguments: serde_json::Value) -> LlmResponse {
        LlmResponse::ToolUse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: SEARCH_TOOL_NAME.into(),
                arguments,
            }],
        }
    }

    #[test]
    fn test_system_content_appends_history() {
        assert_eq!(ResponseGenerator::system_content(None), SYSTEM_PROMPT);
        let with_history = ResponseGenerator::system_content(Some("User: hi\nAssistant: hello"));
        assert!(with_history.ends_with("\n\nPrevious conversation:\nUser: hi\nAssistant: hello"));
    }

    #[tokio::test]
    async fn test_direct_answer_makes_one_call() {
        let (generator, requests) = generator(vec![LlmResponse::Done("Paris".into())]);
        let (manager, seen) = manager();

        let generation = generator
            .generate("capital of France?", None, &manager.definitions(), Some(&manager))
            .await
            .unwrap();

        assert_eq!(generation.answer, "Paris");
        assert!(generation.sources.is_empty());
        assert_eq!(requests.lock().len(), 1);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_then_final_call_without_tools() {
        let (generator, requests) = generator(vec![
            search_call(serde_json::json!({"query": "servers"})),
            LlmResponse::Done("Servers expose tools.".into()),
            LlmResponse::Done("never requested".into()),
        ]);
        let (manager, seen) = manager();

        let generation = generator
            .generate(
                "What do servers do?",
                Some("User: a\nAssistant: b"),
                &manager.definitions(),
                Some(&manager),
            )
            .await
            .unwrap();

        assert_eq!(generation.answer, "Servers expose tools.");
        assert_eq!(generation.sources, vec!["MCP - Lesson 1"]);
        assert_eq!(seen.lock().len(), 1);

        let requests = requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].2, 1);
        assert_eq!(requests[1].2, 0);
        assert!(requests[1].0.contains("Previous conversation:"));
        let roles: Vec<Role> = requests[1].1.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);
    }

    #[tokio::test]
    async fn test_second_tool_request_is_not_executed() {
        let (generator, requests) = generator(vec![
            search_call(serde_json::json!({"query": "servers"})),
            search_call(serde_json::json!({"query": "again"})),
        ]);
        let (manager, seen) = manager();

        let generation = generator
            .generate("q", None, &manager.definitions(), Some(&manager))
            .await
            .unwrap();

        assert_eq!(generation.answer, "");
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_query_filled_from_user_query() {
        let (generator, _) = generator(vec![
            search_call(serde_json::json!({"course_name": "MCP"})),
            LlmResponse::Done("ok".into()),
        ]);
        let (manager, seen) = manager();

        generator
            .generate("what is in MCP?", None, &manager.definitions(), Some(&manager))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].arguments["query"], "what is in MCP?");
        assert_eq!(seen[0].arguments["course_name"], "MCP");
    }

    #[tokio::test]
    async fn test_tool_request_without_manager_returns_text() {
        let (generator, requests) = generator(vec![LlmResponse::ToolUse {
            content: Some("Let me search".into()),
            tool_calls: vec![ToolCall {
                id: "c".into(),
                name: SEARCH_TOOL_NAME.into(),
                arguments: serde_json::json!({}),
            }],
        }]);

        let generation = generator.generate("q", None, &[], None).await.unwrap();
        assert_eq!(generation.answer, "Let me search");
        assert_eq!(requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let (generator, _) = generator(vec![]);
        assert!(generator.generate("q", None, &[], None).await.is_err());
    }
}
