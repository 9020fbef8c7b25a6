use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::analysis::content::AnalysisContent;
use crate::analysis::normalize::normalize_at;
use crate::analysis::now_millis;
use crate::models::analysis::AnalysisRecord;

/// Assembles a fresh record from generated content.
///
/// `baseScore` is copied verbatim from the content and `finalScore` starts
/// equal to it. The draft is normalized before it is returned.
pub fn build_analysis_entry(
    content: &AnalysisContent,
    company: &str,
    role: &str,
    jd_text: &str,
    company_intel: Option<Map<String, Value>>,
) -> AnalysisRecord {
    build_analysis_entry_at(content, company, role, jd_text, company_intel, now_millis())
}

pub fn build_analysis_entry_at(
    content: &AnalysisContent,
    company: &str,
    role: &str,
    jd_text: &str,
    company_intel: Option<Map<String, Value>>,
    now: i64,
) -> AnalysisRecord {
    if content.extracted_skills.is_empty() {
        debug!("Building analysis with no extracted skills");
    }
    let draft = json!({
        "id": Uuid::new_v4().to_string(),
        "createdAt": now,
        "updatedAt": now,
        "company": company,
        "role": role,
        "jdText": jd_text,
        "extractedSkills": content.extracted_skills,
        "baseScore": content.base_score,
        "finalScore": content.base_score,
        "skillConfidenceMap": {},
        "roundMapping": content.round_mapping,
        "checklist": content.checklist,
        "plan7Days": content.plan_7_days,
        "questions": content.questions,
        "companyIntel": company_intel.unwrap_or_default(),
    });
    normalize_at(&draft, now)
}
