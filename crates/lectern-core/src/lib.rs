//! Core types and error definitions for Lectern.
//!
//! This crate provides the foundational types shared across all Lectern crates,
//! including error handling, conversation messages, and tool call abstractions.
//!
//! # Main types
//!
//! - [`LecternError`]: Unified error enum for all Lectern subsystems.
//! - [`LecternResult`]: Convenience alias for `Result<T, LecternError>`.
//! - [`SessionId`]: Opaque conversation identifier.
//! - [`Role`]: Message role (user, assistant, system, tool).
//! - [`Message`]: A single turn within a conversation.
//! - [`ToolCall`]: An LLM-initiated tool invocation request.
//! - [`ToolResult`]: The result returned after executing a tool call.

pub mod error;
pub mod message;
pub mod tool;

pub use error::{LecternError, LecternResult};
pub use message::{Message, Role, SessionId};
pub use tool::{ToolCall, ToolResult};
