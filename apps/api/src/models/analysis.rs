use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user's self-assessment for one skill. Drives the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Know,
    Practice,
    #[default]
    Unset,
}

impl Confidence {
    /// Score delta contributed by a single mark.
    pub fn adjustment(self) -> i64 {
        match self {
            Confidence::Know => 2,
            Confidence::Practice => -2,
            Confidence::Unset => 0,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "know" => Some(Confidence::Know),
            "practice" => Some(Confidence::Practice),
            "unset" => Some(Confidence::Unset),
            _ => None,
        }
    }
}

/// The seven skill buckets. Key names must stay in sync with
/// `analysis::schema::SKILL_CATEGORIES`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedSkills {
    #[serde(rename = "Core_CS")]
    pub core_cs: Vec<String>,
    #[serde(rename = "Languages")]
    pub languages: Vec<String>,
    #[serde(rename = "Web")]
    pub web: Vec<String>,
    #[serde(rename = "Data")]
    pub data: Vec<String>,
    #[serde(rename = "Cloud_DevOps")]
    pub cloud_devops: Vec<String>,
    #[serde(rename = "Testing")]
    pub testing: Vec<String>,
    #[serde(rename = "other")]
    pub other: Vec<String>,
}

impl ExtractedSkills {
    /// All skills routed into `other`, the remaining categories empty.
    pub fn uncategorized(skills: Vec<String>) -> Self {
        Self {
            other: skills,
            ..Self::default()
        }
    }

    pub fn total(&self) -> usize {
        self.core_cs.len()
            + self.languages.len()
            + self.web.len()
            + self.data.len()
            + self.cloud_devops.len()
            + self.testing.len()
            + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Which interview round probes which skill areas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundFocus {
    pub round_title: String,
    pub focus_areas: Vec<String>,
    pub why_it_matters: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistRound {
    pub round_title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanDay {
    pub day: String,
    pub focus: String,
    pub tasks: Vec<String>,
}

/// Canonical persisted analysis record.
///
/// `base_score` is fixed at creation. `final_score` is derived from
/// `base_score` and `skill_confidence_map` and is only ever recomputed,
/// see `analysis::scoring`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, never earlier than `created_at`.
    pub updated_at: i64,
    pub company: String,
    pub role: String,
    pub jd_text: String,
    pub extracted_skills: ExtractedSkills,
    pub base_score: i64,
    pub final_score: i64,
    pub skill_confidence_map: BTreeMap<String, Confidence>,
    pub round_mapping: Vec<RoundFocus>,
    pub checklist: Vec<ChecklistRound>,
    #[serde(rename = "plan7Days")]
    pub plan_7_days: Vec<PlanDay>,
    pub questions: Vec<String>,
    pub company_intel: Map<String, Value>,
}

impl AnalysisRecord {
    /// Self-describing document form, as persisted and as fed to the validator.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
