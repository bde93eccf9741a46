use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sibyl_core::SibylError;

/// One cached question/answer pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub question: String,
    pub embedding: Vec<f32>,
    pub answer: String,
    /// Full structured response, replayed verbatim on a hit.
    pub response_data: Value,
    /// Seconds since the Unix epoch at insertion time.
    pub created_at: f64,
}

/// The five aligned sequences that make up the cache. This struct is also
/// the persisted JSON schema: position `i` in every field refers to the same
/// logical entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheRecords {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub response_data: Vec<Value>,
    #[serde(default)]
    pub timestamps: Vec<f64>,
}

impl CacheRecords {
    fn len(&self) -> usize {
        self.questions.len()
    }

    /// All five sequences must agree on the entry count.
    fn is_aligned(&self) -> bool {
        let n = self.questions.len();
        self.embeddings.len() == n
            && self.answers.len() == n
            && self.response_data.len() == n
            && self.timestamps.len() == n
    }
}

/// Durable, append-only storage for cache entries.
///
/// The backing file is rewritten wholesale on every mutation, via a
/// temporary file and an atomic rename, so a reader or a crash never
/// observes a half-written cache.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    records: CacheRecords,
}

impl CacheStore {
    /// Load the persisted cache, falling back to an empty one when the file
    /// is missing (normal on first run) or unreadable (logged, data loss
    /// accepted).
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<CacheRecords>(&contents) {
                Ok(records) if records.is_aligned() => {
                    tracing::info!(
                        entries = records.len(),
                        path = %path.display(),
                        "loaded cache"
                    );
                    records
                }
                Ok(records) => {
                    tracing::warn!(
                        questions = records.questions.len(),
                        embeddings = records.embeddings.len(),
                        path = %path.display(),
                        "cache file sequences are misaligned, starting empty"
                    );
                    CacheRecords::default()
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "failed to parse cache file, starting empty"
                    );
                    CacheRecords::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no cache file, starting empty");
                CacheRecords::default()
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to read cache file, starting empty"
                );
                CacheRecords::default()
            }
        };

        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    pub fn records(&self) -> &CacheRecords {
        &self.records
    }

    /// The stored response payload at position `ordinal`.
    pub fn response_at(&self, ordinal: usize) -> Option<&Value> {
        self.records.response_data.get(ordinal)
    }

    /// The original question at position `ordinal`.
    pub fn question_at(&self, ordinal: usize) -> Option<&str> {
        self.records.questions.get(ordinal).map(String::as_str)
    }

    /// Add one entry and rewrite the backing file.
    ///
    /// The entry is always appended in memory; an error means only that the
    /// rewrite to disk failed, so durability for the entry is not guaranteed.
    pub async fn append(&mut self, entry: CacheEntry) -> Result<(), SibylError> {
        self.records.questions.push(entry.question);
        self.records.embeddings.push(entry.embedding);
        self.records.answers.push(entry.answer);
        self.records.response_data.push(entry.response_data);
        self.records.timestamps.push(entry.created_at);
        self.persist().await
    }

    /// Reset to empty and rewrite the backing file.
    pub async fn clear(&mut self) -> Result<(), SibylError> {
        self.records = CacheRecords::default();
        self.persist().await
    }

    /// Drop all in-memory entries without touching the file. Used when the
    /// loaded contents turn out to be unusable (e.g. wrong dimension).
    pub(crate) fn reset_in_memory(&mut self) {
        self.records = CacheRecords::default();
    }

    async fn persist(&self) -> Result<(), SibylError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    SibylError::Store(format!("failed to create cache directory: {e}"))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| SibylError::Store(format!("failed to serialize cache: {e}")))?;

        // Write to a sibling temp file, then rename over the target so the
        // cache file is always either the old or the new complete state.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            SibylError::Store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            SibylError::Store(format!(
                "failed to move {} into place: {e}",
                tmp.display()
            ))
        })
    }
}
