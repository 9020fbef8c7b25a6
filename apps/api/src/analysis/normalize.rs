//! Normalizer: repairs partial or loosely-typed records into the canonical shape.
//!
//! Present, valid fields are carried over untouched. Absent or wrongly-typed
//! fields get the registry default. `finalScore` is always re-derived.

use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::now_millis;
use crate::analysis::schema::{
    as_integer, FieldKind, ItemFieldKind, ItemShape, ANALYSIS_SCHEMA, CONFIDENCE_VALUES,
    OTHER_CATEGORY, SKILL_CATEGORIES,
};
use crate::models::analysis::{AnalysisRecord, ExtractedSkills};

pub fn normalize(partial: &Value) -> AnalysisRecord {
    normalize_at(partial, now_millis())
}

/// Same as [`normalize`] with an explicit clock, used for absent timestamps.
pub fn normalize_at(partial: &Value, now: i64) -> AnalysisRecord {
    let empty = Map::new();
    let source = partial.as_object().unwrap_or(&empty);

    let mut doc = Map::new();
    for spec in ANALYSIS_SCHEMA {
        if let Some(value) = canonical_value(spec.kind, source.get(spec.name)) {
            doc.insert(spec.name.to_string(), value);
        }
    }
    fill_timestamps(&mut doc, now);
    fill_scores(&mut doc);

    match serde_json::from_value::<AnalysisRecord>(Value::Object(doc)) {
        Ok(mut record) => {
            record.recompute_final_score();
            record
        }
        Err(e) => {
            // Canonical values always match the record shape; reaching this is a registry bug.
            warn!("Normalized document did not match record shape: {e}");
            empty_record(now)
        }
    }
}

/// Canonical form of one field, or `None` when only a cross-field default applies
/// (timestamps and scores).
fn canonical_value(kind: FieldKind, value: Option<&Value>) -> Option<Value> {
    let value = value.filter(|v| !v.is_null());
    match kind {
        FieldKind::Id => Some(Value::String(
            value
                .and_then(coerce_id)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        )),
        FieldKind::Timestamp => value.and_then(coerce_timestamp).map(Value::from),
        FieldKind::Text { .. } => Some(Value::String(
            value
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default(),
        )),
        FieldKind::Score => value.and_then(coerce_score).map(Value::from),
        FieldKind::SkillCategories => Some(canonical_skills(value)),
        FieldKind::ConfidenceMap => Some(Value::Object(
            value
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter(|(_, mark)| {
                            mark.as_str().is_some_and(|m| CONFIDENCE_VALUES.contains(&m))
                        })
                        .map(|(skill, mark)| (skill.clone(), mark.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        )),
        FieldKind::Sequence { item, .. } => Some(Value::Array(
            value
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|e| canonical_item(item, e)).collect())
                .unwrap_or_default(),
        )),
        FieldKind::Object => Some(Value::Object(
            value.and_then(Value::as_object).cloned().unwrap_or_default(),
        )),
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        // Older clients used `Date.now()` as the id.
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis())
            .filter(|ts| *ts >= 0),
        other => as_integer(other).filter(|ts| *ts >= 0),
    }
}

/// Fractional scores are rounded to the nearest integer. Out-of-range
/// values are kept so the validator can reject them.
fn coerce_score(value: &Value) -> Option<i64> {
    let score = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => match n.as_i64() {
            Some(exact) => return Some(exact),
            None => n.as_f64()?,
        },
        _ => return None,
    };
    score.is_finite().then(|| score.round() as i64)
}

fn canonical_skills(value: Option<&Value>) -> Value {
    let mut categories: Map<String, Value> = SKILL_CATEGORIES
        .iter()
        .map(|key| (key.to_string(), Value::Array(Vec::new())))
        .collect();

    match value {
        // Flat legacy list: this layer cannot categorize, so everything lands in `other`.
        Some(Value::Array(flat)) => {
            let skills = ExtractedSkills::uncategorized(string_items(flat));
            debug!("Routed {} flat skills into '{OTHER_CATEGORY}'", skills.other.len());
            return serde_json::to_value(skills).unwrap_or(Value::Object(categories));
        }
        Some(Value::Object(given)) => {
            let mut extra = Vec::new();
            for (key, list) in given {
                let skills = match list {
                    Value::Array(items) => string_items(items),
                    Value::String(s) => vec![s.clone()],
                    _ => Vec::new(),
                };
                if SKILL_CATEGORIES.contains(&key.as_str()) {
                    categories.insert(key.clone(), Value::from(skills));
                } else {
                    extra.extend(skills);
                }
            }
            if !extra.is_empty() {
                if let Some(Value::Array(other)) = categories.get_mut(OTHER_CATEGORY) {
                    other.extend(extra.into_iter().map(Value::String));
                }
            }
        }
        _ => {}
    }

    Value::Object(categories)
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn canonical_item(shape: ItemShape, element: &Value) -> Option<Value> {
    if shape == ItemShape::Text {
        return element.as_str().map(|s| Value::String(s.to_string()));
    }

    let mut item = Map::new();
    match element {
        Value::Object(obj) => {
            for field in shape.fields() {
                let value = obj.get(field.name);
                let canonical = match field.kind {
                    ItemFieldKind::Text => Value::String(
                        value
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_default(),
                    ),
                    ItemFieldKind::TextList => Value::from(match value {
                        Some(Value::Array(items)) => string_items(items),
                        Some(Value::String(s)) => vec![s.clone()],
                        _ => Vec::new(),
                    }),
                };
                item.insert(field.name.to_string(), canonical);
            }
        }
        Value::String(text) => {
            for field in shape.fields() {
                let canonical = if Some(field.name) == shape.promote_field() {
                    Value::String(text.clone())
                } else {
                    match field.kind {
                        ItemFieldKind::Text => Value::String(String::new()),
                        ItemFieldKind::TextList => Value::Array(Vec::new()),
                    }
                };
                item.insert(field.name.to_string(), canonical);
            }
        }
        _ => return None,
    }
    Some(Value::Object(item))
}

fn fill_timestamps(doc: &mut Map<String, Value>, now: i64) {
    let created = doc.get("createdAt").and_then(Value::as_i64);
    let updated = doc.get("updatedAt").and_then(Value::as_i64);
    let (created, updated) = match (created, updated) {
        (Some(c), Some(u)) => (c, u.max(c)),
        (Some(c), None) => (c, now.max(c)),
        (None, Some(u)) => (u, u),
        (None, None) => (now, now),
    };
    doc.insert("createdAt".to_string(), Value::from(created));
    doc.insert("updatedAt".to_string(), Value::from(updated));
}

fn fill_scores(doc: &mut Map<String, Value>) {
    let stored_final = doc.get("finalScore").and_then(Value::as_i64);
    let base = doc
        .get("baseScore")
        .and_then(Value::as_i64)
        .or(stored_final)
        .unwrap_or(0);
    doc.insert("baseScore".to_string(), Value::from(base));
    // Placeholder; the typed record re-derives it from the confidence map.
    doc.insert("finalScore".to_string(), Value::from(base));
}

fn empty_record(now: i64) -> AnalysisRecord {
    AnalysisRecord {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        company: String::new(),
        role: String::new(),
        jd_text: String::new(),
        extracted_skills: ExtractedSkills::default(),
        base_score: 0,
        final_score: 0,
        skill_confidence_map: Default::default(),
        round_mapping: Vec::new(),
        checklist: Vec::new(),
        plan_7_days: Vec::new(),
        questions: Vec::new(),
        company_intel: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::validation::validate;
    use crate::models::analysis::Confidence;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;
    const JD: &str = "Looking for a backend engineer comfortable with Java, SQL and Docker.";

    fn samples() -> Vec<Value> {
        vec![
            json!(null),
            json!("not a record"),
            json!({}),
            json!({ "jdText": JD }),
            json!({ "jdText": JD, "extractedSkills": ["Java", "React", 7] }),
            json!({
                "id": 17,
                "jdText": JD,
                "createdAt": "2024-03-01T10:00:00Z",
                "baseScore": 55.0,
                "skillConfidenceMap": { "Java": "know", "Go": "expert" },
                "checklist": ["Round 1", { "roundTitle": "Round 2", "items": "DSA" }, 4],
                "questions": ["Why us?", { "q": 1 }],
                "extractedSkills": { "Web": ["React"], "Mobile": ["Kotlin"], "Data": "SQL" }
            }),
            json!({
                "id": "keep-me",
                "createdAt": 10,
                "updatedAt": 5,
                "company": 42,
                "jdText": JD,
                "baseScore": 150,
                "finalScore": 3,
                "plan7Days": [{ "day": "Day 1", "tasks": ["Arrays"] }]
            }),
        ]
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in samples() {
            let once = normalize_at(&sample, NOW);
            let twice = normalize_at(&once.to_document(), NOW + 60_000);
            assert_eq!(once, twice, "not idempotent for {sample}");
        }
    }

    #[test]
    fn test_always_seven_categories() {
        for sample in samples() {
            let doc = normalize_at(&sample, NOW).to_document();
            let skills = doc["extractedSkills"].as_object().unwrap();
            assert_eq!(skills.len(), 7);
            for key in SKILL_CATEGORIES {
                assert!(skills[key].is_array(), "{key} missing for {sample}");
            }
        }
    }

    #[test]
    fn test_flat_skills_go_to_other() {
        let record = normalize_at(&json!({ "jdText": JD, "extractedSkills": ["Java", "React"] }), NOW);
        assert_eq!(record.extracted_skills.other, vec!["Java", "React"]);
        assert!(record.extracted_skills.core_cs.is_empty());
        assert!(record.extracted_skills.languages.is_empty());
        assert!(record.extracted_skills.web.is_empty());
        assert!(record.extracted_skills.data.is_empty());
        assert!(record.extracted_skills.cloud_devops.is_empty());
        assert!(record.extracted_skills.testing.is_empty());
    }

    #[test]
    fn test_unknown_categories_merge_into_other() {
        let record = normalize_at(
            &json!({
                "jdText": JD,
                "extractedSkills": { "other": ["Figma"], "Mobile": ["Kotlin", "Swift"] }
            }),
            NOW,
        );
        assert_eq!(record.extracted_skills.other, vec!["Figma", "Kotlin", "Swift"]);
    }

    #[test]
    fn test_categorized_skills_keep_order_and_duplicates() {
        let record = normalize_at(
            &json!({ "jdText": JD, "extractedSkills": { "Languages": ["Java", "Go", "Java"] } }),
            NOW,
        );
        assert_eq!(record.extracted_skills.languages, vec!["Java", "Go", "Java"]);
    }

    #[test]
    fn test_defaults_for_empty_input() {
        let record = normalize_at(&json!({}), NOW);
        assert!(!record.id.is_empty());
        assert_eq!(record.created_at, NOW);
        assert_eq!(record.updated_at, NOW);
        assert_eq!(record.base_score, 0);
        assert_eq!(record.final_score, 0);
        assert_eq!(record.company, "");
        assert_eq!(record.jd_text, "");
        assert!(record.skill_confidence_map.is_empty());
        assert!(record.company_intel.is_empty());
    }

    #[test]
    fn test_present_valid_fields_untouched() {
        let input = json!({
            "id": "abc",
            "createdAt": 100,
            "updatedAt": 200,
            "company": "Acme",
            "role": "SDE",
            "jdText": JD,
            "baseScore": 64,
            "questions": ["Tell me about yourself."],
            "companyIntel": { "industry": "Fintech" }
        });
        let record = normalize_at(&input, NOW);
        assert_eq!(record.id, "abc");
        assert_eq!(record.created_at, 100);
        assert_eq!(record.updated_at, 200);
        assert_eq!(record.company, "Acme");
        assert_eq!(record.role, "SDE");
        assert_eq!(record.jd_text, JD);
        assert_eq!(record.base_score, 64);
        assert_eq!(record.final_score, 64);
        assert_eq!(record.questions, vec!["Tell me about yourself."]);
        assert_eq!(record.company_intel["industry"], "Fintech");
    }

    #[test]
    fn test_final_score_rederived() {
        let record = normalize_at(
            &json!({
                "jdText": JD,
                "baseScore": 50,
                "finalScore": 99,
                "skillConfidenceMap": { "Java": "know", "SQL": "know", "Go": "practice" }
            }),
            NOW,
        );
        assert_eq!(record.final_score, 52);
        assert_eq!(record.base_score, 50);
    }

    #[test]
    fn test_missing_base_takes_final() {
        let record = normalize_at(&json!({ "jdText": JD, "finalScore": 48 }), NOW);
        assert_eq!(record.base_score, 48);
        assert_eq!(record.final_score, 48);
    }

    #[test]
    fn test_unknown_marks_dropped() {
        let record = normalize_at(
            &json!({ "jdText": JD, "skillConfidenceMap": { "Java": "know", "Go": "expert", "C": 3 } }),
            NOW,
        );
        assert_eq!(record.skill_confidence_map.len(), 1);
        assert_eq!(record.skill_confidence_map["Java"], Confidence::Know);
    }

    #[test]
    fn test_legacy_timestamp_and_numeric_id() {
        let record = normalize_at(
            &json!({ "id": 1709287200000_i64, "createdAt": "2024-03-01T10:00:00Z", "jdText": JD }),
            NOW,
        );
        assert_eq!(record.id, "1709287200000");
        assert_eq!(record.created_at, 1_709_287_200_000);
        // NOW predates createdAt, so updatedAt is pinned to createdAt.
        assert_eq!(record.updated_at, 1_709_287_200_000);
    }

    #[test]
    fn test_only_updated_at_present() {
        let record = normalize_at(&json!({ "jdText": JD, "updatedAt": 500 }), NOW);
        assert_eq!(record.created_at, 500);
        assert_eq!(record.updated_at, 500);
    }

    #[test]
    fn test_string_items_promoted() {
        let record = normalize_at(
            &json!({
                "jdText": JD,
                "checklist": ["Aptitude round"],
                "plan7Days": ["Revise OOP"]
            }),
            NOW,
        );
        assert_eq!(record.checklist[0].round_title, "Aptitude round");
        assert!(record.checklist[0].items.is_empty());
        assert_eq!(record.plan_7_days[0].focus, "Revise OOP");
        assert_eq!(record.plan_7_days[0].day, "");
    }

    #[test]
    fn test_out_of_range_score_kept_for_validator() {
        let record = normalize_at(&json!({ "jdText": JD, "baseScore": 150 }), NOW);
        assert_eq!(record.base_score, 150);
        assert_eq!(record.final_score, 100);
        assert!(!validate(&record.to_document()).is_valid);
    }

    #[test]
    fn test_normalized_record_with_jd_is_valid() {
        for sample in samples().into_iter().skip(3).take(3) {
            let doc = normalize_at(&sample, NOW).to_document();
            let report = validate(&doc);
            assert!(report.is_valid, "{sample}: {:?}", report.errors);
        }
    }

    #[test]
    fn test_fractional_scores_rounded() {
        let record = normalize_at(&json!({ "jdText": JD, "baseScore": 72.4 }), NOW);
        assert_eq!(record.base_score, 72);
        let record = normalize_at(&json!({ "jdText": JD, "baseScore": "65.5" }), NOW);
        assert_eq!(record.base_score, 66);
        let record = normalize_at(&json!({ "jdText": JD, "finalScore": 40.6 }), NOW);
        assert_eq!(record.base_score, 41);
        assert!(validate(&record.to_document()).is_valid);
    }

    #[test]
    fn test_non_numeric_score_falls_back() {
        for junk in [json!("n/a"), json!("NaN"), json!(true), json!([70])] {
            let record = normalize_at(&json!({ "jdText": JD, "baseScore": junk }), NOW);
            assert_eq!(record.base_score, 0, "{junk}");
        }
    }

    #[test]
    fn test_idempotent_for_every_field_and_value_shape() {
        let palette = [
            json!(null),
            json!(0),
            json!(-5),
            json!(72.5),
            json!(""),
            json!("text"),
            json!("2024-03-01T10:00:00Z"),
            json!([]),
            json!(["a", 1]),
            json!([{ "roundTitle": "R1", "items": "x", "day": 3 }]),
            json!({}),
            json!({ "Web": "React", "Java": "know", "Go": "expert" }),
        ];
        let base = json!({
            "id": "grid",
            "createdAt": 100,
            "updatedAt": 200,
            "jdText": JD,
            "baseScore": 60
        });
        for spec in ANALYSIS_SCHEMA {
            for value in &palette {
                let mut sample = base.clone();
                sample[spec.name] = value.clone();
                let once = normalize_at(&sample, NOW);
                let twice = normalize_at(&once.to_document(), NOW + 1);
                assert_eq!(once, twice, "{} = {value}", spec.name);
                assert_eq!(
                    once.to_document()["extractedSkills"].as_object().unwrap().len(),
                    SKILL_CATEGORIES.len()
                );
            }
        }
    }

    #[test]
    fn test_input_not_mutated() {
        let input = json!({ "jdText": JD, "extractedSkills": ["Java"] });
        let before = input.clone();
        let _ = normalize_at(&input, NOW);
        assert_eq!(input, before);
    }
}
