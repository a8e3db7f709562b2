use crate::collection::{Collection, FileCollection, InMemoryCollection, MetadataFilter, Record};
use crate::embedding::EmbeddingProvider;
use crate::models::{
    ChunkMetadata, Course, CourseChunk, SearchHit, SearchResults, KEY_COURSE_TITLE,
    KEY_LESSON_NUMBER,
};
use lectern_core::{LecternError, LecternResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn content_record_id(chunk: &CourseChunk) -> String {
    format!("{}_{}", chunk.course_title.replace(' ', "_"), chunk.chunk_index)
}

pub const CATALOG_COLLECTION: &str = "course_catalog";
pub const CONTENT_COLLECTION: &str = "course_content";

const KEY_COURSE: &str = "course";

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Default number of chunks returned per search.
    pub max_results: usize,
    /// Minimum cosine similarity for a fuzzy course-name match.
    pub match_threshold: f32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            match_threshold: 0.2,
        }
    }
}

/// Course-aware search over two collections: a catalog with one record per
/// course (id = title) and the chunk content.
pub struct CourseStore {
    catalog: Arc<dyn Collection>,
    content: Arc<dyn Collection>,
    embedder: Arc<dyn EmbeddingProvider>,
    options: StoreOptions,
}

impl CourseStore {
    pub fn new(
        catalog: Arc<dyn Collection>,
        content: Arc<dyn Collection>,
        embedder: Arc<dyn EmbeddingProvider>,
        options: StoreOptions,
    ) -> Self {
        Self {
            catalog,
            content,
            embedder,
            options,
        }
    }

    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>, options: StoreOptions) -> Self {
        Self::new(
            Arc::new(InMemoryCollection::new(CATALOG_COLLECTION)),
            Arc::new(InMemoryCollection::new(CONTENT_COLLECTION)),
            embedder,
            options,
        )
    }

    /// Open JSONL-backed collections under `dir`.
    pub async fn open(
        dir: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        options: StoreOptions,
    ) -> LecternResult<Self> {
        let catalog = FileCollection::open(
            CATALOG_COLLECTION,
            dir.join(format!("{CATALOG_COLLECTION}.jsonl")),
        )
        .await?;
        let content = FileCollection::open(
            CONTENT_COLLECTION,
            dir.join(format!("{CONTENT_COLLECTION}.jsonl")),
        )
        .await?;
        let expected = embedder.dimension();
        for collection in [&catalog as &dyn Collection, &content] {
            if let Some(stored) = collection.embedding_dimension().await? {
                if stored != expected {
                    return Err(LecternError::Retrieval(format!(
                        "Collection '{}' in {} holds {stored}-dimensional embeddings but the \
                         embedder produces {expected}; clear the data directory or restore \
                         the previous embedding settings",
                        collection.name(),
                        dir.display()
                    )));
                }
            }
        }

        info!(path = %dir.display(), "Opened course collections");
        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(content),
            embedder,
            options,
        ))
    }

    /// Search course content. Failures are reported inside the results so the
    /// caller can hand them to the model verbatim.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
        limit: Option<usize>,
    ) -> SearchResults {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => {
                    return SearchResults::empty(format!("No course found matching '{name}'"));
                }
                Err(e) => {
                    warn!(error = %e, course = %name, "Course resolution failed");
                    return SearchResults::empty(format!("Search error: {e}"));
                }
            },
            None => None,
        };

        let filter = Self::build_filter(course_title.as_deref(), lesson_number);
        let top_k = limit.unwrap_or(self.options.max_results);

        match self.query_content(query, top_k, filter.as_ref()).await {
            Ok(hits) => {
                debug!(
                    query = %query,
                    course = ?course_title,
                    lesson = ?lesson_number,
                    hits = hits.len(),
                    "Course search"
                );
                SearchResults::new(hits)
            }
            Err(e) => SearchResults::empty(format!("Search error: {e}")),
        }
    }

    async fn query_content(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> LecternResult<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query).await?;
        let scored = self.content.query(&embedding, top_k, filter).await?;
        Ok(scored
            .into_iter()
            .map(|s| SearchHit {
                metadata: ChunkMetadata::from_map(&s.record.metadata),
                document: s.record.document,
                score: s.score,
            })
            .collect())
    }

    /// Map a user-supplied course name to a stored title: case-insensitive
    /// exact or substring match first, then the nearest catalog entry when it
    /// clears the similarity threshold.
    pub async fn resolve_course_name(&self, name: &str) -> LecternResult<Option<String>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }

        let titles = self.existing_course_titles().await?;
        if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == wanted) {
            return Ok(Some(exact.clone()));
        }
        if let Some(partial) = titles.iter().find(|t| t.to_lowercase().contains(&wanted)) {
            return Ok(Some(partial.clone()));
        }
        if titles.is_empty() {
            return Ok(None);
        }

        let embedding = self.embedder.embed(name).await?;
        let best = self.catalog.query(&embedding, 1, None).await?.into_iter().next();
        Ok(best
            .filter(|b| b.score >= self.options.match_threshold)
            .map(|b| b.record.id))
    }

    pub fn build_filter(
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Option<MetadataFilter> {
        let mut filters = Vec::new();
        if let Some(title) = course_title {
            filters.push(MetadataFilter::eq(KEY_COURSE_TITLE, title));
        }
        if let Some(n) = lesson_number {
            filters.push(MetadataFilter::eq(KEY_LESSON_NUMBER, n));
        }
        MetadataFilter::all(filters)
    }

    /// Store or replace the catalog entry for a course. Chunks stored for a
    /// previous version of the course are dropped.
    pub async fn add_course_metadata(&self, course: &Course) -> LecternResult<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let stale = self
            .content
            .delete_where(&MetadataFilter::eq(KEY_COURSE_TITLE, course.title.as_str()))
            .await?;
        if stale > 0 {
            debug!(course = %course.title, chunks = stale, "Dropped previous course content");
        }

        let mut metadata = HashMap::new();
        metadata.insert(KEY_COURSE.to_string(), serde_json::to_value(course)?);
        metadata.insert("lesson_count".to_string(), Value::from(course.lessons.len()));

        self.catalog
            .upsert(vec![Record {
                id: course.title.clone(),
                document: course.title.clone(),
                embedding,
                metadata,
            }])
            .await
    }

    /// Embed and store chunks. Returns the number stored.
    pub async fn add_course_content(&self, chunks: &[CourseChunk]) -> LecternResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(LecternError::Retrieval(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<Record> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Record {
                id: content_record_id(chunk),
                document: chunk.content.clone(),
                embedding,
                metadata: chunk.metadata().to_map(),
            })
            .collect();
        let count = records.len();
        self.content.upsert(records).await?;
        Ok(count)
    }

    pub async fn existing_course_titles(&self) -> LecternResult<Vec<String>> {
        Ok(self.catalog.list().await?.into_iter().map(|r| r.id).collect())
    }

    pub async fn course_count(&self) -> LecternResult<usize> {
        self.catalog.count().await
    }

    /// Full catalog entry for a (fuzzy) course name.
    pub async fn course_outline(&self, name: &str) -> LecternResult<Option<Course>> {
        let Some(title) = self.resolve_course_name(name).await? else {
            return Ok(None);
        };
        self.course_by_title(&title).await
    }

    pub async fn course_by_title(&self, title: &str) -> LecternResult<Option<Course>> {
        let Some(record) = self.catalog.get(title).await? else {
            return Ok(None);
        };
        let course = record
            .metadata
            .get(KEY_COURSE)
            .cloned()
            .map(serde_json::from_value::<Course>)
            .transpose()?;
        Ok(course)
    }

    pub async fn course_link(&self, title: &str) -> LecternResult<Option<String>> {
        Ok(self.course_by_title(title).await?.and_then(|c| c.course_link))
    }

    pub async fn lesson_link(
        &self,
        title: &str,
        lesson_number: u32,
    ) -> LecternResult<Option<String>> {
        Ok(self
            .course_by_title(title)
            .await?
            .and_then(|c| c.lesson(lesson_number).and_then(|l| l.lesson_link.clone())))
    }

    pub async fn clear_all_data(&self) -> LecternResult<()> {
        self.catalog.clear().await?;
        self.content.clear().await?;
        info!("Cleared course collections");
        Ok(())
    }
}
