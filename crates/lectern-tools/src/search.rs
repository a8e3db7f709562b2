use crate::tool::{Tool, ToolDescriptor, ToolOutput};
use async_trait::async_trait;
use lectern_core::{LecternResult, ToolCall};
use lectern_retrieval::{CourseStore, SearchResults};
use std::sync::Arc;
use tracing::debug;

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

/// Semantic search over course content with optional course and lesson filters.
pub struct CourseSearchTool {
    descriptor: ToolDescriptor,
    store: Arc<CourseStore>,
}

impl CourseSearchTool {
    pub fn new(store: Arc<CourseStore>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: SEARCH_TOOL_NAME.to_string(),
                description: "Search course materials with smart course name matching \
                              and lesson filtering"
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to search for in the course content"
                        },
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                        },
                        "lesson_number": {
                            "type": "integer",
                            "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                        }
                    },
                    "required": ["query"]
                }),
            },
            store,
        }
    }
}

/// Label used both as the block header and as the cited source.
fn source_label(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(n) => format!("{course_title} - Lesson {n}"),
        None => course_title.to_string(),
    }
}

fn format_results(results: &SearchResults) -> ToolOutput {
    let mut blocks = Vec::with_capacity(results.len());
    let mut sources: Vec<String> = Vec::new();
    for hit in &results.hits {
        let label = source_label(&hit.metadata.course_title, hit.metadata.lesson_number);
        blocks.push(format!("[{label}]\n{}", hit.document));
        if !sources.contains(&label) {
            sources.push(label);
        }
    }
    ToolOutput::with_sources(blocks.join("\n\n"), sources)
}

fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{course}'"));
    }
    if let Some(n) = lesson_number {
        message.push_str(&format!(" in lesson {n}"));
    }
    message
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: &ToolCall) -> LecternResult<ToolOutput> {
        let Some(query) = call.str_arg("query") else {
            return Ok(ToolOutput::error("Missing required argument 'query'"));
        };
        let course_name = call.str_arg("course_name");
        let lesson_number = call.u32_arg("lesson_number");

        let results = self
            .store
            .search(query, course_name, lesson_number, None)
            .await;

        if let Some(error) = results.error {
            debug!(error = %error, "Course search returned an error");
            return Ok(ToolOutput::error(error));
        }
        if results.is_empty() {
            return Ok(ToolOutput::text(no_results_message(course_name, lesson_number)));
        }
        Ok(format_results(&results))
    }
}
