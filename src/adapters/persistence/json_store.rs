//! Implements CycleStore using a single JSON document.
//!
//! Every commit builds the next document on a copy, writes it to disk, and only then
//! swaps it into the cache. Without a path the store lives in memory only.

use crate::domain::{
    CompiledNewsletter, DomainError, QuestionSchema, ReleaseCycle, Response,
};
use crate::ports::CycleStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// group_id -> records
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreData {
    schemas: HashMap<String, QuestionSchema>,
    cycles: HashMap<String, ReleaseCycle>,
    responses: HashMap<String, Vec<Response>>,
    newsletters: HashMap<String, Vec<CompiledNewsletter>>,
}

/// JSON file-based store.
pub struct JsonStore {
    path: Option<PathBuf>,
    cache: tokio::sync::RwLock<StoreData>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            cache: tokio::sync::RwLock::new(StoreData::default()),
        }
    }

    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cache: tokio::sync::RwLock::new(StoreData::default()),
        }
    }

    /// Load the document from disk. A missing file is an empty store; a corrupt one is an error.
    pub async fn load(&self) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let data = match fs::read_to_string(path).await {
            Ok(s) => serde_json::from_str(&s)
                .map_err(|e| DomainError::store(format!("parse {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(DomainError::store(format!("read {}: {}", path.display(), e))),
        };
        *self.cache.write().await = data;
        Ok(())
    }

    /// Atomic save using write-replace:
    /// 1. Write to temp file
    /// 2. sync_all() to flush to disk
    /// 3. Rename over the target path
    async fn persist(&self, data: &StoreData) -> Result<(), DomainError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data).map_err(|e| DomainError::store(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::store(format!("create dir: {}", e)))?;
        }
        let temp_path = path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::store(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::store(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::store(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| DomainError::store(format!("atomic rename failed: {}", e)))?;
        debug!(path = %path.display(), bytes = json.len(), "store saved");
        Ok(())
    }

    async fn commit<F>(&self, change: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut StoreData) -> Result<(), DomainError>,
    {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *cache = next;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CycleStore for JsonStore {
    async fn load_schema(&self, group_id: &str) -> Result<QuestionSchema, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.schemas.get(group_id).cloned().unwrap_or_default())
    }

    async fn save_schema(
        &self,
        group_id: &str,
        schema: &QuestionSchema,
    ) -> Result<(), DomainError> {
        self.commit(|data| {
            data.schemas.insert(group_id.to_string(), schema.clone());
            Ok(())
        })
        .await
    }

    async fn load_cycle(&self, group_id: &str) -> Result<Option<ReleaseCycle>, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.cycles.get(group_id).cloned())
    }

    async fn save_cycle(&self, cycle: &ReleaseCycle) -> Result<(), DomainError> {
        self.commit(|data| {
            data.cycles.insert(cycle.group_id.clone(), cycle.clone());
            Ok(())
        })
        .await
    }

    async fn load_responses(
        &self,
        group_id: &str,
        cycle_number: u32,
    ) -> Result<Vec<Response>, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache
            .responses
            .get(group_id)
            .map(|all| {
                all.iter()
                    .filter(|r| r.cycle_number == cycle_number)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit_submission(
        &self,
        cycle: &ReleaseCycle,
        response: &Response,
    ) -> Result<(), DomainError> {
        self.commit(|data| {
            let responses = data.responses.entry(cycle.group_id.clone()).or_default();
            if responses.iter().any(|r| {
                r.cycle_number == response.cycle_number && r.responder_id == response.responder_id
            }) {
                return Err(DomainError::DuplicateSubmission(
                    response.responder_id.clone(),
                ));
            }
            responses.push(response.clone());
            data.cycles.insert(cycle.group_id.clone(), cycle.clone());
            Ok(())
        })
        .await
    }

    async fn commit_release(
        &self,
        cycle: &ReleaseCycle,
        newsletter: &CompiledNewsletter,
    ) -> Result<(), DomainError> {
        self.commit(|data| {
            data.newsletters
                .entry(cycle.group_id.clone())
                .or_default()
                .push(newsletter.clone());
            data.cycles.insert(cycle.group_id.clone(), cycle.clone());
            Ok(())
        })
        .await
    }

    async fn load_newsletters(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompiledNewsletter>, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.newsletters.get(group_id).cloned().unwrap_or_default())
    }
}
