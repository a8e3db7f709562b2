//! Tools the model can call while answering a question.
//!
//! A [`Tool`] describes itself with a [`ToolDescriptor`] (name, description,
//! JSON input schema) and turns a [`ToolCall`](lectern_core::ToolCall) into a
//! [`ToolOutput`]. The [`ToolManager`] dispatches calls by name and remembers
//! the sources cited by the most recent executions.
//!
//! # Main types
//!
//! - [`ToolManager`]: Name-keyed registry and dispatcher.
//! - [`CourseSearchTool`]: `search_course_content`, filtered semantic search.
//! - [`CourseOutlineTool`]: `get_course_outline`, lesson list of one course.

/// Tool registry and dispatch.
pub mod manager;
/// Course outline tool.
pub mod outline;
/// Course content search tool.
pub mod search;
/// Tool trait and descriptor types.
pub mod tool;

pub use manager::ToolManager;
pub use outline::CourseOutlineTool;
pub use search::CourseSearchTool;
pub use tool::{Tool, ToolDescriptor, ToolOutput};
