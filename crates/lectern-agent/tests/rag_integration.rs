#![allow(clippy::unwrap_used, clippy::expect_used)]

use lectern_agent::{LlmProvider, ModelConfig, RagConfig, RagSystem};
use lectern_core::{Role, SessionId};
use lectern_retrieval::LocalEmbedding;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MCP_COURSE: &str = "Course Title: MCP: Build Rich-Context AI Apps with Anthropic
Course Link: https://example.com/mcp
Course Instructor: Elie Schoppik

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/0
The Model Context Protocol standardises how applications give context to models.

Lesson 1: MCP Architecture
Lesson Link: https://example.com/mcp/1
An MCP server exposes tools, resources and prompts. A client connects to one server.
";

const CHROMA_COURSE: &str = "Course Title: Advanced Retrieval for AI with Chroma
Course Instructor: Anton Troynikov

Lesson 1: Query Expansion
Query expansion rewrites a question before retrieval. It often improves recall.
";

const MCP_TITLE: &str = "MCP: Build Rich-Context AI Apps with Anthropic";

fn write_docs(dir: &Path) {
    std::fs::write(dir.join("course1_script.txt"), MCP_COURSE).unwrap();
    std::fs::write(dir.join("course2_script.md"), CHROMA_COURSE).unwrap();
    std::fs::write(dir.join("slides.pdf"), "binary").unwrap();
}

async fn system(model: ModelConfig, docs: &Path) -> RagSystem {
    let rag = RagSystem::from_config(
        model,
        &RagConfig::default(),
        Arc::new(LocalEmbedding::default()),
        None,
    )
    .await
    .unwrap();
    rag.add_course_folder(docs, false).await.unwrap();
    rag
}

fn claude_config(server: &MockServer) -> ModelConfig {
    let mut config = ModelConfig::new(LlmProvider::Claude, "claude-sonnet-4-20250514", "test-key");
    config.api_base_url = Some(server.uri());
    config
}

fn claude_text(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    }))
}

#[tokio::test]
async fn test_tool_use_triggers_exactly_one_more_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{
                "type": "tool_use",
                "id": "toolu_01",
                "name": "search_course_content",
                "input": {"query": "server", "course_name": "MCP", "lesson_number": 1}
            }],
            "stop_reason": "tool_use"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(claude_text("An MCP server exposes tools, resources and prompts."))
        .expect(1)
        .mount(&server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(claude_config(&server), docs.path()).await;

    let outcome = rag.query("What does an MCP server expose?", None).await.unwrap();

    assert_eq!(outcome.answer, "An MCP server exposes tools, resources and prompts.");
    assert_eq!(outcome.sources, vec![format!("{MCP_TITLE} - Lesson 1")]);
    assert!(rag.tools().last_sources().is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let first: Value = requests[0].body_json().unwrap();
    assert_eq!(
        first["messages"][0]["content"],
        "Answer this question about course materials: What does an MCP server expose?"
    );
    assert_eq!(first["tools"].as_array().unwrap().len(), 2);
    assert_eq!(first["temperature"], 0.0);
    assert_eq!(first["max_tokens"], 800);

    let second: Value = requests[1].body_json().unwrap();
    assert!(second.get("tools").is_none());
    let tool_turn = &second["messages"][2]["content"][0];
    assert!(tool_turn["text"]
        .as_str()
        .unwrap()
        .contains(&format!("[{MCP_TITLE} - Lesson 1]")));

    let session = rag
        .sessions()
        .session(&outcome.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[0].content, "What does an MCP server expose?");
    assert_eq!(session.messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_direct_answer_is_single_call_and_history_carries_over() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(claude_text("Recall is the share of relevant items retrieved."))
        .expect(2)
        .mount(&server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(claude_config(&server), docs.path()).await;

    let first = rag.query("What is recall?", None).await.unwrap();
    assert!(first.sources.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let second = rag
        .query("And precision?", Some(first.session_id.clone()))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[1].body_json().unwrap();
    let system = body["system"].as_str().unwrap();
    assert!(system.contains(
        "Previous conversation:\nUser: What is recall?\nAssistant: Recall is the share"
    ));
}

#[tokio::test]
async fn test_new_session_starts_empty_and_unknown_id_is_adopted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(claude_text("ok"))
        .mount(&server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(claude_config(&server), docs.path()).await;

    let fresh = rag.sessions().create_session().await.unwrap();
    assert!(rag
        .sessions()
        .conversation_history(&fresh)
        .await
        .unwrap()
        .is_none());

    let outcome = rag
        .query("hello", Some(SessionId::from("client-chosen")))
        .await
        .unwrap();
    assert_eq!(outcome.session_id.as_str(), "client-chosen");
    let history = rag
        .sessions()
        .conversation_history(&outcome.session_id)
        .await
        .unwrap();
    assert_eq!(history.as_deref(), Some("User: hello\nAssistant: ok"));
}

#[tokio::test]
async fn test_provider_error_surfaces_and_history_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .mount(&server)
        .await;

    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(claude_config(&server), docs.path()).await;

    let id = SessionId::from("s1");
    let err = rag.query("hi", Some(id.clone())).await.unwrap_err();
    assert!(err.to_string().contains("401"));
    assert!(rag.sessions().session(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_gemini_tool_round() {
    let server = MockServer::start().await;
    let endpoint = "/v1beta/models/gemini-2.0-flash:generateContent";
    Mock::given(method("POST"))
        .and(path(endpoint))
        .and(query_param("key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{
                    "functionCall": {
                        "name": "search_course_content",
                        "args": {"course_name": "Chroma"}
                    }
                }]},
                "finishReason": "STOP"
            }]
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "It rewrites the question."}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ModelConfig::new(LlmProvider::Gemini, "gemini-2.0-flash", "gemini-key");
    config.api_base_url = Some(server.uri());
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(config, docs.path()).await;

    let outcome = rag.query("What is query expansion?", None).await.unwrap();
    assert_eq!(outcome.answer, "It rewrites the question.");
    assert_eq!(
        outcome.sources,
        vec!["Advanced Retrieval for AI with Chroma - Lesson 1"]
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first: Value = requests[0].body_json().unwrap();
    assert_eq!(
        first["tools"][0]["function_declarations"][0]["name"],
        "search_course_content"
    );
    assert_eq!(first["generationConfig"]["maxOutputTokens"], 800);

    let second: Value = requests[1].body_json().unwrap();
    assert!(second.get("tools").is_none());
    let call = &second["contents"][1]["parts"][0]["functionCall"];
    assert_eq!(
        call["args"]["query"],
        "Answer this question about course materials: What is query expansion?"
    );
    let response = &second["contents"][2]["parts"][0]["functionResponse"];
    assert_eq!(response["name"], "search_course_content");
    assert!(response["response"]["content"]
        .as_str()
        .unwrap()
        .starts_with("[Advanced Retrieval for AI with Chroma - Lesson 1]"));
}

#[tokio::test]
async fn test_openai_direct_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Two courses are available."},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ModelConfig::new(LlmProvider::OpenAi, "gpt-4o-mini", "sk-test");
    config.api_base_url = Some(server.uri());
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = system(config, docs.path()).await;

    let outcome = rag.query("How many courses?", None).await.unwrap();
    assert_eq!(outcome.answer, "Two courses are available.");
    assert!(outcome.sources.is_empty());
}

#[tokio::test]
async fn test_folder_ingestion_skips_known_courses() {
    let server = MockServer::start().await;
    let docs = tempfile::tempdir().unwrap();
    write_docs(docs.path());
    let rag = RagSystem::from_config(
        claude_config(&server),
        &RagConfig::default(),
        Arc::new(LocalEmbedding::default()),
        None,
    )
    .await
    .unwrap();

    let (courses, chunks) = rag.add_course_folder(docs.path(), false).await.unwrap();
    assert_eq!(courses, 2);
    assert!(chunks >= 3);

    assert_eq!(rag.add_course_folder(docs.path(), false).await.unwrap(), (0, 0));

    let (again, _) = rag.add_course_folder(docs.path(), true).await.unwrap();
    assert_eq!(again, 2);

    let analytics = rag.course_analytics().await.unwrap();
    assert_eq!(analytics.total_courses, 2);
    assert!(analytics.course_titles.contains(&MCP_TITLE.to_string()));

    assert!(rag
        .add_course_folder(&docs.path().join("missing"), false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_persistent_collections_survive_restart() {
    let server = MockServer::start().await;
    let docs = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    write_docs(docs.path());

    {
        let rag = RagSystem::from_config(
            claude_config(&server),
            &RagConfig::default(),
            Arc::new(LocalEmbedding::default()),
            Some(data.path()),
        )
        .await
        .unwrap();
        rag.add_course_folder(docs.path(), false).await.unwrap();
    }

    let restarted = RagSystem::from_config(
        claude_config(&server),
        &RagConfig::default(),
        Arc::new(LocalEmbedding::default()),
        Some(data.path()),
    )
    .await
    .unwrap();
    assert_eq!(restarted.course_analytics().await.unwrap().total_courses, 2);
    assert_eq!(
        restarted.add_course_folder(docs.path(), false).await.unwrap(),
        (0, 0)
    );
}

#[tokio::test]
async fn test_reingesting_shorter_course_removes_old_lessons() {
    let server = MockServer::start().await;
    let docs = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let file = docs.path().join("widgets.txt");
    std::fs::write(
        &file,
        "Course Title: Widgets\n\nLesson 1: Basics\nWidgets alpha content.\n\n\
         Lesson 2: Zebras\nOld zebra content beta.\n",
    )
    .unwrap();

    let rag = RagSystem::from_config(
        claude_config(&server),
        &RagConfig::default(),
        Arc::new(LocalEmbedding::default()),
        Some(data.path()),
    )
    .await
    .unwrap();
    let (_, first) = rag.add_course_document(&file).await.unwrap();
    assert_eq!(first, 2);

    std::fs::write(
        &file,
        "Course Title: Widgets\n\nLesson 1: Basics\nWidgets alpha content.\n",
    )
    .unwrap();
    let (course, second) = rag.add_course_document(&file).await.unwrap();
    assert_eq!(course.lessons.len(), 1);
    assert_eq!(second, 1);

    let stale = rag
        .store()
        .search("zebra", Some("Widgets"), Some(2), Some(10))
        .await;
    assert!(stale.error.is_none());
    assert!(stale.is_empty());

    drop(rag);
    let restarted = RagSystem::from_config(
        claude_config(&server),
        &RagConfig::default(),
        Arc::new(LocalEmbedding::default()),
        Some(data.path()),
    )
    .await
    .unwrap();
    let all = restarted
        .store()
        .search("widgets", Some("Widgets"), None, Some(10))
        .await;
    assert_eq!(all.hits.len(), 1);
    assert_eq!(all.hits[0].metadata.lesson_number, Some(1));
}
