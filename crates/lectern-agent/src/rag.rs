use crate::config::{ModelConfig, RagConfig};
use crate::generator::ResponseGenerator;
use crate::llm::LlmClient;
use lectern_core::{LecternError, LecternResult, SessionId};
use lectern_retrieval::{Course, CourseStore, DocumentProcessor, EmbeddingProvider};
use lectern_session::{InMemorySessionStore, SessionManager};
use lectern_tools::{CourseOutlineTool, CourseSearchTool, ToolManager};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<String>,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The orchestrator: sessions, retrieval tools and generation.
pub struct RagSystem {
    store: Arc<CourseStore>,
    processor: DocumentProcessor,
    generator: ResponseGenerator,
    sessions: SessionManager,
    tools: ToolManager,
}

impl RagSystem {
    /// Wire the system together. The search and outline tools are registered
    /// against `store`.
    pub fn new(
        store: Arc<CourseStore>,
        processor: DocumentProcessor,
        generator: ResponseGenerator,
        sessions: SessionManager,
    ) -> Self {
        let mut tools = ToolManager::new();
        tools.register(Arc::new(CourseSearchTool::new(store.clone())));
        tools.register(Arc::new(CourseOutlineTool::new(store.clone())));
        Self {
            store,
            processor,
            generator,
            sessions,
            tools,
        }
    }

    /// Build from configuration. Collections persist under `data_dir` when
    /// given, otherwise they live in memory.
    pub async fn from_config(
        model: ModelConfig,
        rag: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        data_dir: Option<&Path>,
    ) -> LecternResult<Self> {
        let store = match data_dir {
            Some(dir) => CourseStore::open(dir, embedder, rag.store_options()).await?,
            None => CourseStore::in_memory(embedder, rag.store_options()),
        };
        let sessions = SessionManager::new(Arc::new(InMemorySessionStore::new()), rag.max_history);
        Ok(Self::new(
            Arc::new(store),
            DocumentProcessor::new(rag.chunk_size, rag.chunk_overlap),
            ResponseGenerator::new(LlmClient::new(model)),
            sessions,
        ))
    }

    /// Answer a question, creating a session when none is given.
    pub async fn query(
        &self,
        query: &str,
        session_id: Option<SessionId>,
    ) -> LecternResult<QueryOutcome> {
        let session_id = match session_id {
            Some(id) => id,
            None => self.sessions.create_session().await?,
        };

        let history = self.sessions.conversation_history(&session_id).await?;
        let prompt = format!("Answer this question about course materials: {query}");

        let generation = self
            .generator
            .generate(
                &prompt,
                history.as_deref(),
                &self.tools.definitions(),
                Some(&self.tools),
            )
            .await?;
        self.tools.reset_sources();

        self.sessions
            .add_exchange(&session_id, query, generation.answer.clone())
            .await?;

        info!(
            session_id = %session_id,
            sources = generation.sources.len(),
            "Answered query"
        );
        Ok(QueryOutcome {
            answer: generation.answer,
            sources: generation.sources,
            session_id,
        })
    }

    /// Ingest one course file, replacing its catalog entry if present.
    /// Returns the course and the number of chunks stored.
    pub async fn add_course_document(&self, path: &Path) -> LecternResult<(Course, usize)> {
        let (course, chunks) = self.processor.process_file(path).await?;
        self.store.add_course_metadata(&course).await?;
        let added = self.store.add_course_content(&chunks).await?;
        info!(course = %course.title, chunks = added, "Added course document");
        Ok((course, added))
    }

    /// Ingest every supported file in `dir`, skipping courses already stored.
    /// Returns (courses added, chunks added).
    pub async fn add_course_folder(
        &self,
        dir: &Path,
        clear_existing: bool,
    ) -> LecternResult<(usize, usize)> {
        if !dir.is_dir() {
            return Err(LecternError::Document(format!(
                "Course folder not found: {}",
                dir.display()
            )));
        }
        if clear_existing {
            self.store.clear_all_data().await?;
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && DocumentProcessor::is_supported(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut known = self.store.existing_course_titles().await?;
        let (mut courses, mut chunks) = (0, 0);
        for path in paths {
            let (course, course_chunks) = match self.processor.process_file(&path).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping course file");
                    continue;
                }
            };
            if known.contains(&course.title) {
                info!(course = %course.title, "Course already stored, skipping");
                continue;
            }

            self.store.add_course_metadata(&course).await?;
            chunks += self.store.add_course_content(&course_chunks).await?;
            courses += 1;
            known.push(course.title);
        }

        info!(courses, chunks, path = %dir.display(), "Ingested course folder");
        Ok((courses, chunks))
    }

    pub async fn course_analytics(&self) -> LecternResult<CourseAnalytics> {
        let course_titles = self.store.existing_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<CourseStore> {
        &self.store
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }
}
