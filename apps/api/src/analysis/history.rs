//! History service: the store-facing paths around the integrity core.
//!
//! Validation and migration failures come back as data (`SaveOutcome`,
//! dropped counts) so one bad entry never fails a whole load. Only store
//! I/O surfaces as `Err`.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::migrate::{migrate_old_entry, migrate_old_entry_at};
use crate::analysis::now_millis;
use crate::analysis::validation::{validate, ValidationReport};
use crate::models::analysis::{AnalysisRecord, Confidence};
use crate::store::{AnalysisStore, RecordEdit};

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(AnalysisRecord),
    Rejected(ValidationReport),
}

/// Result of reading the stored collection through the migrator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLoad {
    /// Surviving records, in save order.
    pub entries: Vec<AnalysisRecord>,
    pub raw_count: usize,
    pub valid_count: usize,
}

impl HistoryLoad {
    pub fn dropped_count(&self) -> usize {
        self.raw_count - self.valid_count
    }

    pub fn has_data_loss(&self) -> bool {
        self.valid_count < self.raw_count
    }

    /// Non-blocking, user-facing notice when some entries could not be loaded.
    pub fn notice(&self) -> Option<String> {
        match self.dropped_count() {
            0 => None,
            1 => Some("One saved entry couldn't be loaded and was skipped.".to_string()),
            n => Some(format!("{n} saved entries couldn't be loaded and were skipped.")),
        }
    }
}

/// Validates and persists a record. Invalid records are never written.
pub async fn save_analysis(store: &dyn AnalysisStore, record: AnalysisRecord) -> Result<SaveOutcome> {
    let report = validate(&record.to_document());
    if !report.is_valid {
        warn!(
            "Refusing to save analysis {}: {}",
            record.id,
            report.errors.join("; ")
        );
        return Ok(SaveOutcome::Rejected(report));
    }
    store.append(&record).await?;
    Ok(SaveOutcome::Saved(record))
}

/// Migrates every raw entry and keeps the ones that survive.
pub fn history_from_raw(raw: &[Value]) -> HistoryLoad {
    let entries: Vec<AnalysisRecord> = raw.iter().filter_map(migrate_old_entry).collect();
    HistoryLoad {
        raw_count: raw.len(),
        valid_count: entries.len(),
        entries,
    }
}

pub async fn load_history(store: &dyn AnalysisStore) -> Result<HistoryLoad> {
    let raw = store.load_raw().await?;
    let history = history_from_raw(&raw);
    if history.has_data_loss() {
        warn!(
            "Loaded {} of {} history entries ({} dropped)",
            history.valid_count,
            history.raw_count,
            history.dropped_count()
        );
    }
    Ok(history)
}

pub async fn find_analysis(store: &dyn AnalysisStore, id: &str) -> Result<Option<AnalysisRecord>> {
    let history = load_history(store).await?;
    Ok(history.entries.into_iter().find(|record| record.id == id))
}

/// Applies one confidence mark and persists the re-scored record.
/// Returns `None` when no record has this id.
pub async fn update_confidence(
    store: &dyn AnalysisStore,
    id: &str,
    skill: &str,
    mark: Confidence,
) -> Result<Option<AnalysisRecord>> {
    let updated = edit_record(
        store,
        id,
        Box::new(move |record: &mut AnalysisRecord| {
            record.set_confidence(skill, mark, now_millis())
        }),
    )
    .await?;
    if let Some(record) = &updated {
        info!(
            "Analysis {id}: {skill} marked {mark:?}, final score {}",
            record.final_score
        );
    }
    Ok(updated)
}

/// Swaps in a whole confidence map, e.g. to reset every mark at once.
pub async fn replace_confidence(
    store: &dyn AnalysisStore,
    id: &str,
    marks: BTreeMap<String, Confidence>,
) -> Result<Option<AnalysisRecord>> {
    let updated = edit_record(
        store,
        id,
        Box::new(move |record: &mut AnalysisRecord| {
            record.replace_confidence_map(marks, now_millis())
        }),
    )
    .await?;
    if let Some(record) = &updated {
        info!(
            "Analysis {id}: confidence map replaced ({} marks), final score {}",
            record.skill_confidence_map.len(),
            record.final_score
        );
    }
    Ok(updated)
}

/// Migrates the stored document, applies `change` and re-validates, all
/// within one store update. Legacy documents are written back in current form.
async fn edit_record<'a>(
    store: &'a dyn AnalysisStore,
    id: &'a str,
    change: Box<dyn FnOnce(&mut AnalysisRecord) + Send + 'a>,
) -> Result<Option<AnalysisRecord>> {
    let edit: RecordEdit<'a> = Box::new(move |raw: &Value| -> Result<Option<AnalysisRecord>> {
        let Some(mut record) = migrate_old_entry_at(raw, now_millis()) else {
            return Ok(None);
        };
        change(&mut record);
        let report = validate(&record.to_document());
        if !report.is_valid {
            bail!(
                "analysis {id} failed validation after update: {}",
                report.errors.join("; ")
            );
        }
        Ok(Some(record))
    });
    store.update(id, edit).await
}

pub async fn delete_analysis(store: &dyn AnalysisStore, id: &str) -> Result<bool> {
    store.remove(id).await
}
