use async_trait::async_trait;
use lectern_core::{LecternError, LecternResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// A single embedded document stored in a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: Record,
    pub score: f32,
}

/// Equality filter over record metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    Eq { key: String, value: Value },
    And(Vec<MetadataFilter>),
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Combine filters; a single filter is returned as-is and none yields `None`.
    pub fn all(mut filters: Vec<MetadataFilter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::And(filters)),
        }
    }

    pub fn matches(&self, metadata: &HashMap<String, Value>) -> bool {
        match self {
            Self::Eq { key, value } => metadata.get(key) == Some(value),
            Self::And(filters) => filters.iter().all(|f| f.matches(metadata)),
        }
    }
}

/// Trait for embedded record collections.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert records, replacing any existing record with the same id.
    async fn upsert(&self, records: Vec<Record>) -> LecternResult<()>;

    /// Top-k records by cosine similarity, restricted by the optional filter.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> LecternResult<Vec<ScoredRecord>>;

    async fn get(&self, id: &str) -> LecternResult<Option<Record>>;

    /// All records in insertion order.
    async fn list(&self) -> LecternResult<Vec<Record>>;

    async fn count(&self) -> LecternResult<usize>;

    /// Length of the stored embeddings, taken from the first record.
    async fn embedding_dimension(&self) -> LecternResult<Option<usize>>;

    /// Remove every record matching `filter`. Returns how many were removed.
    async fn delete_where(&self, filter: &MetadataFilter) -> LecternResult<usize>;

    async fn clear(&self) -> LecternResult<()>;
}

/// Brute-force collection held in memory.
pub struct InMemoryCollection {
    name: String,
    records: RwLock<Vec<Record>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Returns true when at least one record was replaced rather than appended.
    async fn upsert_inner(&self, incoming: Vec<Record>) -> bool {
        let mut records = self.records.write().await;
        let mut replaced = false;
        for record in incoming {
            if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
                replaced = true;
            } else {
                records.push(record);
            }
        }
        replaced
    }

    async fn delete_where_inner(&self, filter: &MetadataFilter) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !filter.matches(&r.metadata));
        before - records.len()
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: Vec<Record>) -> LecternResult<()> {
        self.upsert_inner(records).await;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> LecternResult<Vec<ScoredRecord>> {
        if embedding.is_empty() {
            return Err(LecternError::Retrieval("Empty query embedding".to_string()));
        }

        let records = self.records.read().await;
        let mut scored: Vec<ScoredRecord> = records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredRecord {
                score: cosine_similarity(embedding, &r.embedding),
                record: r.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get(&self, id: &str) -> LecternResult<Option<Record>> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> LecternResult<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    async fn count(&self) -> LecternResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn embedding_dimension(&self) -> LecternResult<Option<usize>> {
        Ok(self.records.read().await.first().map(|r| r.embedding.len()))
    }

    async fn delete_where(&self, filter: &MetadataFilter) -> LecternResult<usize> {
        Ok(self.delete_where_inner(filter).await)
    }

    async fn clear(&self) -> LecternResult<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

/// Collection persisted as JSONL on disk.
/// Loads everything on open; appends new records, rewrites on replace, delete or clear.
pub struct FileCollection {
    path: PathBuf,
    inner: InMemoryCollection,
}

impl FileCollection {
    pub async fn open(name: impl Into<String>, path: PathBuf) -> LecternResult<Self> {
        let inner = InMemoryCollection::new(name);

        if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            let mut records = Vec::new();
            for line in data.lines().filter(|l| !l.trim().is_empty()) {
                let record: Record = serde_json::from_str(line).map_err(|e| {
                    LecternError::Retrieval(format!(
                        "Invalid record in {}: {e}",
                        path.display()
                    ))
                })?;
                records.push(record);
            }
            inner.upsert_inner(records).await;
        } else if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(Self { path, inner })
    }

    async fn append_to_file(&self, records: &[Record]) -> LecternResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut data = String::new();
        for record in records {
            data.push_str(&serde_json::to_string(record)?);
            data.push('\n');
        }
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn rewrite_file(&self) -> LecternResult<()> {
        let mut data = String::new();
        for record in self.inner.list().await? {
            data.push_str(&serde_json::to_string(&record)?);
            data.push('\n');
        }
        tokio::fs::write(&self.path, data.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl Collection for FileCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn upsert(&self, records: Vec<Record>) -> LecternResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        if self.inner.upsert_inner(records.clone()).await {
            self.rewrite_file().await
        } else {
            self.append_to_file(&records).await
        }
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> LecternResult<Vec<ScoredRecord>> {
        self.inner.query(embedding, top_k, filter).await
    }

    async fn get(&self, id: &str) -> LecternResult<Option<Record>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> LecternResult<Vec<Record>> {
        self.inner.list().await
    }

    async fn count(&self) -> LecternResult<usize> {
        self.inner.count().await
    }

    async fn embedding_dimension(&self) -> LecternResult<Option<usize>> {
        self.inner.embedding_dimension().await
    }

    async fn delete_where(&self, filter: &MetadataFilter) -> LecternResult<usize> {
        let removed = self.inner.delete_where_inner(filter).await;
        if removed > 0 {
            self.rewrite_file().await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> LecternResult<()> {
        self.inner.clear().await?;
        tokio::fs::write(&self.path, b"").await?;
        Ok(())
    }
}

/// Cosine similarity; mismatched or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>, course: &str, lesson: u32) -> Record {
        let mut metadata = HashMap::new();
        metadata.insert("course_title".to_string(), Value::from(course));
        metadata.insert("lesson_number".to_string(), Value::from(lesson));
        Record {
            id: id.to_string(),
            document: format!("doc {id}"),
            embedding,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let col = InMemoryCollection::new("content");
        col.upsert(vec![
            record("far", vec![0.0, 0.0, 1.0], "A", 1),
            record("close", vec![0.9, 0.1, 0.0], "A", 1),
        ])
        .await
        .unwrap();

        let hits = col.query(&[1.0, 0.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits[0].record.id, "close");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_query_applies_conjunctive_filter() {
        let col = InMemoryCollection::new("content");
        col.upsert(vec![
            record("a1", vec![1.0, 0.0], "A", 1),
            record("a2", vec![1.0, 0.0], "A", 2),
            record("b1", vec![1.0, 0.0], "B", 1),
        ])
        .await
        .unwrap();

        let filter = MetadataFilter::all(vec![
            MetadataFilter::eq("course_title", "A"),
            MetadataFilter::eq("lesson_number", 1),
        ])
        .unwrap();
        let hits = col.query(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.id, "a1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let col = InMemoryCollection::new("catalog");
        col.upsert(vec![record("x", vec![1.0], "A", 1)]).await.unwrap();
        col.upsert(vec![record("x", vec![1.0], "B", 1)]).await.unwrap();

        assert_eq!(col.count().await.unwrap(), 1);
        let got = col.get("x").await.unwrap().unwrap();
        assert_eq!(got.metadata["course_title"], "B");
    }

    #[tokio::test]
    async fn test_delete_where_removes_only_matches() {
        let col = InMemoryCollection::new("content");
        col.upsert(vec![
            record("a1", vec![1.0, 0.0], "A", 1),
            record("a2", vec![1.0, 0.0], "A", 2),
            record("b1", vec![1.0, 0.0], "B", 1),
        ])
        .await
        .unwrap();

        let removed = col
            .delete_where(&MetadataFilter::eq("course_title", "A"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let left: Vec<String> = col.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(left, vec!["b1".to_string()]);

        let none = col
            .delete_where(&MetadataFilter::eq("course_title", "Z"))
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn test_query_rejects_empty_embedding() {
        let col = InMemoryCollection::new("content");
        assert!(col.query(&[], 5, None).await.is_err());
    }

    #[test]
    fn test_filter_all_collapses() {
        assert!(MetadataFilter::all(vec![]).is_none());
        let single = MetadataFilter::all(vec![MetadataFilter::eq("k", 1)]).unwrap();
        assert!(matches!(single, MetadataFilter::Eq { .. }));
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_file_collection_persists_and_rewrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("content.jsonl");

        {
            let col = FileCollection::open("content", path.clone()).await.unwrap();
            col.upsert(vec![
                record("a", vec![1.0, 0.0], "A", 1),
                record("b", vec![0.0, 1.0], "A", 2),
            ])
            .await
            .unwrap();
            col.upsert(vec![record("a", vec![1.0, 0.0], "Renamed", 1)])
                .await
                .unwrap();
        }

        let reopened = FileCollection::open("content", path.clone()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        let a = reopened.get("a").await.unwrap().unwrap();
        assert_eq!(a.metadata["course_title"], "Renamed");

        let removed = reopened
            .delete_where(&MetadataFilter::eq("lesson_number", 2))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let after_delete = FileCollection::open("content", path.clone()).await.unwrap();
        assert_eq!(after_delete.count().await.unwrap(), 1);
        assert!(after_delete.get("b").await.unwrap().is_none());

        reopened.clear().await.unwrap();
        let emptied = FileCollection::open("content", path).await.unwrap();
        assert_eq!(emptied.count().await.unwrap(), 0);
    }
}
