use crate::tool::{Tool, ToolDescriptor, ToolOutput};
use async_trait::async_trait;
use lectern_core::{LecternResult, ToolCall};
use lectern_retrieval::{Course, CourseStore};
use std::sync::Arc;

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

/// Returns the title, link, instructor and lesson list of one course.
pub struct CourseOutlineTool {
    descriptor: ToolDescriptor,
    store: Arc<CourseStore>,
}

impl CourseOutlineTool {
    pub fn new(store: Arc<CourseStore>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: OUTLINE_TOOL_NAME.to_string(),
                description: "Get the outline of a course: its title, link, instructor \
                              and the numbered list of lessons"
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial matches work)"
                        }
                    },
                    "required": ["course_name"]
                }),
            },
            store,
        }
    }
}

fn format_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course Title: {}", course.title)];
    if let Some(link) = &course.course_link {
        lines.push(format!("Course Link: {link}"));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Course Instructor: {instructor}"));
    }
    if course.lessons.is_empty() {
        lines.push("No lessons listed".to_string());
    } else {
        lines.push(format!("Lessons ({}):", course.lessons.len()));
        for lesson in &course.lessons {
            lines.push(format!("Lesson {}: {}", lesson.lesson_number, lesson.title));
        }
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: &ToolCall) -> LecternResult<ToolOutput> {
        let Some(name) = call.str_arg("course_name") else {
            return Ok(ToolOutput::error("Missing required argument 'course_name'"));
        };

        match self.store.course_outline(name).await? {
            Some(course) => Ok(ToolOutput::with_sources(
                format_outline(&course),
                vec![course.title.clone()],
            )),
            None => Ok(ToolOutput::error(format!("No course found matching '{name}'"))),
        }
    }
}
