use async_trait::async_trait;
use lectern_core::{LecternError, LecternResult};
use std::collections::HashMap;
use std::time::Duration;

/// Trait for computing text embeddings (vector representations).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> LecternResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> LecternResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Hashed bag-of-words embedding computed locally.
///
/// Each distinct word contributes its term frequency at three hashed slots
/// (weights 1.0, 0.7, 0.5); the vector is L2-normalised. Texts sharing
/// vocabulary land close together, which is enough for course-title
/// resolution and chunk ranking without a model server.
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    const SLOT_WEIGHTS: [f32; 3] = [1.0, 0.7, 0.5];

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn term_frequencies(text: &str) -> HashMap<String, f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .collect();
        let mut freq: HashMap<String, f32> = HashMap::new();
        if words.is_empty() {
            return freq;
        }
        let share = 1.0 / words.len() as f32;
        for word in words {
            *freq.entry(word.to_string()).or_insert(0.0) += share;
        }
        freq
    }

    fn slot(&self, word: &str, salt: u8) -> usize {
        let mut hash = fnv1a(word.as_bytes());
        if salt > 0 {
            hash ^= u32::from(salt);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash as usize % self.dimension
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> LecternResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LecternError::Retrieval("Cannot embed empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (word, tf) in Self::term_frequencies(text) {
            for (salt, weight) in Self::SLOT_WEIGHTS.iter().enumerate() {
                vector[self.slot(&word, salt as u8)] += tf * weight;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

fn fnv1a(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Client for any OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedding {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        dimension: usize,
    ) -> LecternResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LecternError::Http(format!("Failed to build embedding client: {e}")))?;
        Ok(Self {
            http,
            url: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> LecternResult<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| LecternError::Retrieval("Empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> LecternResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LecternError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LecternError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(LecternError::Http(format!(
                "Embedding API error {status}: {resp_body}"
            )));
        }

        parse_embedding_response(&resp_body, texts.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn parse_embedding_response(
    body: &serde_json::Value,
    expected: usize,
) -> LecternResult<Vec<Vec<f32>>> {
    let data = body["data"]
        .as_array()
        .ok_or_else(|| LecternError::Retrieval("Missing data in embedding response".into()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item["index"].as_u64().map_or(pos, |i| i as usize);
            let vector = item["embedding"]
                .as_array()
                .map(|values| {
                    values
                        .iter()
                        .filter_map(serde_json::Value::as_f64)
                        .map(|v| v as f32)
                        .collect()
                })
                .unwrap_or_default();
            (index, vector)
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    if indexed.len() != expected {
        return Err(LecternError::Retrieval(format!(
            "Embedding response had {} vectors for {} inputs",
            indexed.len(),
            expected
        )));
    }
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
