//! Retrieval layer: course documents in, ranked chunks out.
//!
//! Course files are parsed and chunked by [`DocumentProcessor`], embedded by an
//! [`EmbeddingProvider`], and stored in two [`Collection`]s (a course catalog
//! and the chunk content). [`CourseStore`] is the search-facing wrapper that
//! resolves fuzzy course names and applies course/lesson filters.
//!
//! # Main types
//!
//! - [`CourseStore`]: Course-aware search over the catalog and content collections.
//! - [`SearchResults`]: Ranked documents with metadata, or an error string.
//! - [`Collection`]: Trait for embedded record collections with metadata filters.
//! - [`InMemoryCollection`] / [`FileCollection`]: Volatile and JSONL-backed collections.
//! - [`EmbeddingProvider`]: Trait for text embeddings; [`LocalEmbedding`] and
//!   [`OpenAiEmbedding`] implement it.
//! - [`DocumentProcessor`]: Parses course files into a [`Course`] and [`CourseChunk`]s.

/// Embedded record collections and metadata filters.
pub mod collection;
/// Course-aware search wrapper.
pub mod course_store;
/// Course file parsing and sentence-based chunking.
pub mod documents;
/// Embedding provider trait and implementations.
pub mod embedding;
/// Course, lesson, chunk and search result types.
pub mod models;

pub use collection::{
    Collection, FileCollection, InMemoryCollection, MetadataFilter, Record, ScoredRecord,
};
pub use course_store::{CourseStore, StoreOptions};
pub use documents::DocumentProcessor;
pub use embedding::{EmbeddingProvider, LocalEmbedding, OpenAiEmbedding};
pub use models::{ChunkMetadata, Course, CourseChunk, Lesson, SearchHit, SearchResults};
