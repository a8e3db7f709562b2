//! HTTP gateway for Lectern.
//!
//! Exposes `POST /api/query`, `GET /api/courses` and `GET /health` over a
//! shared [`RagSystem`](lectern_agent::RagSystem), and optionally serves a
//! static frontend directory for every other path.

pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{CoursesResponse, GatewayServer, QueryRequest, QueryResponse};
