use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const KEY_COURSE_TITLE: &str = "course_title";
pub const KEY_LESSON_NUMBER: &str = "lesson_number";
pub const KEY_CHUNK_INDEX: &str = "chunk_index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// A course as described by the header of its source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique key across the catalog.
    pub title: String,
    #[serde(default)]
    pub course_link: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == number)
    }
}

/// A piece of course text ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl CourseChunk {
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            course_title: self.course_title.clone(),
            lesson_number: self.lesson_number,
            chunk_index: self.chunk_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl ChunkMetadata {
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert(KEY_COURSE_TITLE.to_string(), Value::from(self.course_title.clone()));
        if let Some(n) = self.lesson_number {
            map.insert(KEY_LESSON_NUMBER.to_string(), Value::from(n));
        }
        map.insert(KEY_CHUNK_INDEX.to_string(), Value::from(self.chunk_index));
        map
    }

    /// Lenient read: missing keys become defaults rather than errors.
    pub fn from_map(map: &HashMap<String, Value>) -> Self {
        Self {
            course_title: map
                .get(KEY_COURSE_TITLE)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            lesson_number: map
                .get(KEY_LESSON_NUMBER)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
            chunk_index: map
                .get(KEY_CHUNK_INDEX)
                .and_then(Value::as_u64)
                .map_or(0, |n| n as usize),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Outcome of one course search: ranked hits, or an error string meant for
/// the model to read.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub error: Option<String>,
}

impl SearchResults {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    pub fn empty(error: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}
