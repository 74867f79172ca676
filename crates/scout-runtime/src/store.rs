//! Outcome and learning stores.
//!
//! The core only needs three outcome operations (save/load/list) and an
//! idempotent merge for learned selectors. Both seams are traits so tests
//! and the binary can inject in-memory impls; schema and connection
//! management stay an external concern.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use scout_core::outcome::OrchestratorOutcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-level failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Payload (de)serialization failed.
    #[error("serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcome store
// ─────────────────────────────────────────────────────────────────────────────

/// Persistence seam for terminal outcomes.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Persist `outcome` under `key`, replacing any previous value.
    async fn save_outcome(&self, key: &str, outcome: &OrchestratorOutcome)
    -> Result<(), StoreError>;

    /// Load the outcome stored under `key`, if any.
    async fn load_outcome(&self, key: &str) -> Result<Option<OrchestratorOutcome>, StoreError>;

    /// Map of stored keys to document titles.
    async fn list_keys(&self) -> Result<BTreeMap<String, String>, StoreError>;
}

/// In-memory outcome store.
#[derive(Default)]
pub struct MemoryOutcomeStore {
    outcomes: Mutex<HashMap<String, OrchestratorOutcome>>,
}

impl MemoryOutcomeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeStore for MemoryOutcomeStore {
    async fn save_outcome(
        &self,
        key: &str,
        outcome: &OrchestratorOutcome,
    ) -> Result<(), StoreError> {
        let _ = self
            .outcomes
            .lock()
            .insert(key.to_string(), outcome.clone());
        Ok(())
    }

    async fn load_outcome(&self, key: &str) -> Result<Option<OrchestratorOutcome>, StoreError> {
        Ok(self.outcomes.lock().get(key).cloned())
    }

    async fn list_keys(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .outcomes
            .lock()
            .iter()
            .map(|(key, outcome)| (key.clone(), outcome.doc_pack.title.clone()))
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Learning store
// ─────────────────────────────────────────────────────────────────────────────

/// The best replacement learned for one test's broken selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedSelector {
    /// Replacement selector text.
    pub selector: String,
    /// Confidence of the winning candidate.
    pub confidence: f64,
}

/// Durable store of learned selector replacements, keyed by test id.
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Merge `entries` into the store (never replaces unrelated keys).
    async fn merge(&self, entries: &BTreeMap<String, LearnedSelector>) -> Result<(), StoreError>;

    /// Current contents.
    async fn snapshot(&self) -> Result<BTreeMap<String, LearnedSelector>, StoreError>;
}

/// In-memory learning store.
#[derive(Default)]
pub struct MemoryLearningStore {
    selectors: Mutex<BTreeMap<String, LearnedSelector>>,
}

impl MemoryLearningStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearningStore for MemoryLearningStore {
    async fn merge(&self, entries: &BTreeMap<String, LearnedSelector>) -> Result<(), StoreError> {
        let mut selectors = self.selectors.lock();
        for (test_id, learned) in entries {
            let _ = selectors.insert(test_id.clone(), learned.clone());
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, LearnedSelector>, StoreError> {
        Ok(self.selectors.lock().clone())
    }
}

/// On-disk JSON file layout for [`JsonLearningStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct LearningFile {
    selectors: BTreeMap<String, LearnedSelector>,
}

/// JSON-file learning store.
///
/// Writes go to a sibling temp file first and are moved into place, so a
/// crash mid-write never truncates the store.
pub struct JsonLearningStore {
    path: PathBuf,
}

impl JsonLearningStore {
    /// Store backed by the JSON file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_file(&self) -> Result<LearningFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(LearningFile::default()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl LearningStore for JsonLearningStore {
    async fn merge(&self, entries: &BTreeMap<String, LearnedSelector>) -> Result<(), StoreError> {
        let mut file = self.read_file().await?;
        for (test_id, learned) in entries {
            let _ = file.selectors.insert(test_id.clone(), learned.clone());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<BTreeMap<String, LearnedSelector>, StoreError> {
        Ok(self.read_file().await?.selectors)
    }
}

impl std::fmt::Debug for JsonLearningStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLearningStore")
            .field("path", &self.path.display())
            .finish()
    }
}

/// Path helper for the default learning store location.
#[must_use]
pub fn default_learning_store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("learning_store.json")
}
