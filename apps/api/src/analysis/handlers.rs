//! Axum route handlers for the Analysis API.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::analysis::builder::build_analysis_entry;
use crate::analysis::content::{AnalysisContent, ContentRequest};
use crate::analysis::history::{
    delete_analysis, find_analysis, load_history, replace_confidence, save_analysis,
    update_confidence, SaveOutcome,
};
use crate::analysis::normalize::normalize;
use crate::analysis::schema::JD_MIN_CHARS;
use crate::analysis::validation::{validate, ValidationReport};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRecord, Confidence};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisRequest {
    pub jd_text: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_intel: Option<Map<String, Value>>,
    /// Pre-generated content. When absent the configured generator is used.
    #[serde(default)]
    pub analysis_content: Option<AnalysisContent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// Newest first.
    pub entries: Vec<AnalysisRecord>,
    pub raw_count: usize,
    pub valid_count: usize,
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfidenceUpdate {
    pub skill: String,
    pub confidence: Confidence,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub record: AnalysisRecord,
    pub validation: ValidationReport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceReplace {
    pub skill_confidence_map: BTreeMap<String, Confidence>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyses
///
/// Rejects short job descriptions before any record is built.
pub async fn handle_create_analysis(
    State(state): State<AppState>,
    Json(request): Json<CreateAnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisRecord>), AppError> {
    if request.jd_text.trim().chars().count() < JD_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "jdText must be at least {JD_MIN_CHARS} characters"
        )));
    }

    let company = request.company.unwrap_or_default();
    let role = request.role.unwrap_or_default();

    let content = match request.analysis_content {
        Some(content) => content,
        None => {
            state
                .generator
                .generate(ContentRequest {
                    jd_text: &request.jd_text,
                    company: &company,
                    role: &role,
                })
                .await?
        }
    };

    let record = build_analysis_entry(
        &content,
        &company,
        &role,
        &request.jd_text,
        request.company_intel,
    );

    match save_analysis(state.store.as_ref(), record).await? {
        SaveOutcome::Saved(record) => {
            info!(
                "Created analysis {} (base score {}, {} skills)",
                record.id,
                record.base_score,
                record.extracted_skills.total()
            );
            Ok((StatusCode::CREATED, Json(record)))
        }
        SaveOutcome::Rejected(report) => Err(AppError::InvalidRecord(report.errors)),
    }
}

/// GET /api/v1/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = load_history(state.store.as_ref()).await?;
    let notice = history.notice();
    let mut entries = history.entries;
    entries.reverse();

    Ok(Json(HistoryResponse {
        entries,
        raw_count: history.raw_count,
        valid_count: history.valid_count,
        notice,
    }))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisRecord>, AppError> {
    find_analysis(state.store.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}

/// PATCH /api/v1/analyses/:id/confidence
pub async fn handle_update_confidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ConfidenceUpdate>,
) -> Result<Json<AnalysisRecord>, AppError> {
    let skill = update.skill.trim();
    if skill.is_empty() {
        return Err(AppError::Validation("skill cannot be empty".to_string()));
    }

    update_confidence(state.store.as_ref(), &id, skill, update.confidence)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}

/// PUT /api/v1/analyses/:id/confidence
pub async fn handle_replace_confidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConfidenceReplace>,
) -> Result<Json<AnalysisRecord>, AppError> {
    if body.skill_confidence_map.keys().any(|skill| skill.trim().is_empty()) {
        return Err(AppError::Validation("skill cannot be empty".to_string()));
    }

    replace_confidence(state.store.as_ref(), &id, body.skill_confidence_map)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}

/// DELETE /api/v1/analyses/:id
pub async fn handle_delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if delete_analysis(state.store.as_ref(), &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Analysis {id} not found")))
    }
}

/// POST /api/v1/analyses/validate
///
/// Reports schema violations for any JSON document without storing it.
pub async fn handle_validate(Json(document): Json<Value>) -> Json<ValidationReport> {
    Json(validate(&document))
}

/// POST /api/v1/analyses/normalize
///
/// Repairs any JSON document into the canonical shape and reports whether the
/// result would be accepted. Nothing is stored.
pub async fn handle_normalize(Json(document): Json<Value>) -> Json<NormalizeResponse> {
    let record = normalize(&document);
    let validation = validate(&record.to_document());
    Json(NormalizeResponse { record, validation })
}
