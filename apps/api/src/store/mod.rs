//! Persistence for the analysis history collection.
//!
//! Stores hand back raw documents: older entries may predate the current
//! schema and are only upgraded by the history loader.

pub mod file;
pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::analysis::migrate::entry_id;
use crate::models::analysis::AnalysisRecord;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PgAnalysisStore;

/// Turns a stored document into its replacement record.
/// `Ok(None)` leaves the document untouched.
pub type RecordEdit<'a> = Box<dyn FnOnce(&Value) -> Result<Option<AnalysisRecord>> + Send + 'a>;

/// Ordered collection of analysis documents keyed by `id`.
///
/// Carried in `AppState` as `Arc<dyn AnalysisStore>`.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Every stored document, in save order.
    async fn load_raw(&self) -> Result<Vec<Value>>;

    /// Appends a record at the end of the collection.
    async fn append(&self, record: &AnalysisRecord) -> Result<()>;

    /// Rewrites the document with this id in place. Read, edit and write
    /// happen under one lock (one transaction for Postgres).
    /// Returns `None` when the id is absent or the edit declined.
    async fn update(&self, id: &str, edit: RecordEdit<'_>) -> Result<Option<AnalysisRecord>>;

    /// Deletes the document with this id. Returns false if absent.
    async fn remove(&self, id: &str) -> Result<bool>;
}

fn has_id(document: &Value, id: &str) -> bool {
    entry_id(document).as_deref() == Some(id)
}
