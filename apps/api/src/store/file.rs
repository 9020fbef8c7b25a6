use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use super::{has_id, AnalysisStore, RecordEdit};
use crate::models::analysis::AnalysisRecord;

/// Whole history kept as one JSON array document on disk, one element per record.
///
/// Writes go to a sibling temp file which is then renamed over the original.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_collection(&self) -> Result<Vec<Value>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Value = serde_json::from_str(&text)
            .with_context(|| format!("history document {} is not valid JSON", self.path.display()))?;
        match document {
            Value::Array(entries) => Ok(entries),
            other => bail!(
                "history document {} must be a JSON array, found {}",
                self.path.display(),
                crate::analysis::schema::type_name(&other)
            ),
        }
    }

    async fn write_collection(&self, entries: &[Value]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let body = serde_json::to_vec_pretty(entries).context("failed to serialize history")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move {} into place", tmp.display()))?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for JsonFileStore {
    async fn load_raw(&self) -> Result<Vec<Value>> {
        let _guard = self.lock.lock().await;
        self.read_collection().await
    }

    async fn append(&self, record: &AnalysisRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_collection().await?;
        entries.push(record.to_document());
        self.write_collection(&entries).await?;
        info!("Saved analysis {} ({} stored)", record.id, entries.len());
        Ok(())
    }

    async fn update(&self, id: &str, edit: RecordEdit<'_>) -> Result<Option<AnalysisRecord>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_collection().await?;
        let Some(slot) = entries.iter_mut().find(|doc| has_id(doc, id)) else {
            return Ok(None);
        };
        let Some(record) = edit(&*slot)? else {
            return Ok(None);
        };
        *slot = record.to_document();
        self.write_collection(&entries).await?;
        Ok(Some(record))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_collection().await?;
        let before = entries.len();
        entries.retain(|doc| !has_id(doc, id));
        if entries.len() == before {
            return Ok(false);
        }
        self.write_collection(&entries).await?;
        info!("Deleted analysis {id}");
        Ok(true)
    }
}
