use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{has_id, AnalysisStore, RecordEdit};
use crate::models::analysis::AnalysisRecord;

/// Process-local store. Seedable with raw documents for legacy scenarios.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn load_raw(&self) -> Result<Vec<Value>> {
        Ok(self.documents.read().await.clone())
    }

    async fn append(&self, record: &AnalysisRecord) -> Result<()> {
        self.documents.write().await.push(record.to_document());
        Ok(())
    }

    async fn update(&self, id: &str, edit: RecordEdit<'_>) -> Result<Option<AnalysisRecord>> {
        let mut documents = self.documents.write().await;
        let Some(slot) = documents.iter_mut().find(|doc| has_id(doc, id)) else {
            return Ok(None);
        };
        let Some(record) = edit(&*slot)? else {
            return Ok(None);
        };
        *slot = record.to_document();
        Ok(Some(record))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| !has_id(doc, id));
        Ok(documents.len() < before)
    }
}
