//! Migrator: upgrades records written under retired shapes.
//!
//! Old records carry no version tag; they are recognised by retired field
//! names (`LEGACY_FIELDS`) or a flat `extractedSkills` list. A current field
//! that is present and valid always wins over its retired counterpart; among
//! retired fields the oldest generation (earliest in `LEGACY_FIELDS`) claims a
//! target first.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::analysis::normalize::normalize_at;
use crate::analysis::now_millis;
use crate::analysis::schema::{field, LEGACY_FIELDS};
use crate::analysis::validation::{check_field, validate};
use crate::models::analysis::AnalysisRecord;

/// Returns a canonical, valid record or `None` when the entry cannot be recovered.
pub fn migrate_old_entry(raw: &Value) -> Option<AnalysisRecord> {
    migrate_old_entry_at(raw, now_millis())
}

pub fn migrate_old_entry_at(raw: &Value, now: i64) -> Option<AnalysisRecord> {
    let Some(doc) = raw.as_object() else {
        warn!("Dropping history entry: not an object");
        return None;
    };
    let id = entry_id(raw)?;

    let mut upgraded = if is_legacy(doc) {
        debug!("Upgrading legacy entry {id}");
        rewrite_legacy_fields(doc)
    } else {
        doc.clone()
    };
    upgraded.insert("id".to_string(), Value::String(id.clone()));

    let record = normalize_at(&Value::Object(upgraded), now);
    let report = validate(&record.to_document());
    if report.is_valid {
        Some(record)
    } else {
        warn!("Dropping history entry {id}: {}", report.errors.join("; "));
        None
    }
}

/// Id a stored document is known by.
///
/// Entries written without a usable id get a UUID v5 of their own content,
/// so the same stored document maps to the same id on every load.
pub fn entry_id(raw: &Value) -> Option<String> {
    match raw.as_object()?.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        // Older clients used `Date.now()` as the id.
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => {
            let content = serde_json::to_vec(raw).ok()?;
            Some(Uuid::new_v5(&Uuid::NAMESPACE_OID, &content).to_string())
        }
    }
}

pub fn is_legacy(doc: &Map<String, Value>) -> bool {
    LEGACY_FIELDS.iter().any(|legacy| doc.contains_key(legacy.name))
        || doc.get("extractedSkills").is_some_and(Value::is_array)
}

/// Moves retired fields onto their current names. Retired names are removed.
fn rewrite_legacy_fields(doc: &Map<String, Value>) -> Map<String, Value> {
    let mut current = doc.clone();
    for legacy in LEGACY_FIELDS {
        let Some(value) = current.remove(legacy.name) else {
            continue;
        };
        for target in legacy.replaced_by {
            if !has_valid(&current, target) {
                current.insert(target.to_string(), value.clone());
            }
        }
    }
    current
}

fn has_valid(doc: &Map<String, Value>, name: &str) -> bool {
    match (field(name), doc.get(name)) {
        (Some(spec), Some(value)) if !value.is_null() => check_field(spec, value).is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;
    const JD: &str = "Campus hiring for SDE-1: Java, React, SQL, problem solving and OOP.";

    #[test]
    fn test_legacy_score_and_flat_skills() {
        let raw = json!({
            "id": "old-1",
            "jdText": JD,
            "readinessScore": 65,
            "extractedSkills": ["Java", "React"]
        });
        let record = migrate_old_entry_at(&raw, NOW).expect("should migrate");
        assert_eq!(record.base_score, 65);
        assert_eq!(record.final_score, 65);
        assert_eq!(record.extracted_skills.other, vec!["Java", "React"]);
        assert!(record.extracted_skills.core_cs.is_empty());
        assert!(record.extracted_skills.languages.is_empty());
        assert!(record.extracted_skills.web.is_empty());
        assert!(record.extracted_skills.data.is_empty());
        assert!(record.extracted_skills.cloud_devops.is_empty());
        assert!(record.extracted_skills.testing.is_empty());
        assert!(validate(&record.to_document()).is_valid);
    }

    #[test]
    fn test_legacy_plan_and_skills_fields() {
        let raw = json!({
            "id": "old-2",
            "jdText": JD,
            "plan": [{ "day": "Day 1", "focus": "OOP", "tasks": ["Classes"] }],
            "skills": ["SQL"]
        });
        let record = migrate_old_entry_at(&raw, NOW).unwrap();
        assert_eq!(record.plan_7_days.len(), 1);
        assert_eq!(record.plan_7_days[0].focus, "OOP");
        assert_eq!(record.extracted_skills.other, vec!["SQL"]);
        let doc = record.to_document();
        assert!(doc.get("plan").is_none());
        assert!(doc.get("skills").is_none());
        assert!(doc.get("readinessScore").is_none());
    }

    #[test]
    fn test_current_field_wins_over_retired() {
        let raw = json!({
            "id": "mixed",
            "jdText": JD,
            "readinessScore": 40,
            "baseScore": 70,
            "finalScore": 70
        });
        let record = migrate_old_entry_at(&raw, NOW).unwrap();
        assert_eq!(record.base_score, 70);
        assert_eq!(record.final_score, 70);
    }

    #[test]
    fn test_retired_fills_invalid_current_field() {
        let raw = json!({ "id": "bad-base", "jdText": JD, "readinessScore": 40, "baseScore": "n/a" });
        let record = migrate_old_entry_at(&raw, NOW).unwrap();
        assert_eq!(record.base_score, 40);
    }

    #[test]
    fn test_missing_jd_text_dropped() {
        let raw = json!({ "id": "old-3", "readinessScore": 65, "skills": ["Java"] });
        assert!(migrate_old_entry_at(&raw, NOW).is_none());
    }

    #[test]
    fn test_out_of_range_legacy_score_dropped() {
        let raw = json!({ "id": "old-4", "jdText": JD, "readinessScore": 140 });
        assert!(migrate_old_entry_at(&raw, NOW).is_none());
    }

    #[test]
    fn test_non_object_dropped() {
        for raw in [json!(null), json!(3), json!("x"), json!([{ "jdText": JD }])] {
            assert!(migrate_old_entry_at(&raw, NOW).is_none());
        }
    }

    #[test]
    fn test_current_record_passes_through() {
        let raw = json!({
            "id": "cur-1",
            "createdAt": 10,
            "updatedAt": 20,
            "jdText": JD,
            "extractedSkills": { "Languages": ["Java"] },
            "baseScore": 60,
            "finalScore": 62,
            "skillConfidenceMap": { "Java": "know" }
        });
        let doc = raw.as_object().unwrap();
        assert!(!is_legacy(doc));
        let record = migrate_old_entry_at(&raw, NOW).unwrap();
        assert_eq!(record.id, "cur-1");
        assert_eq!(record.created_at, 10);
        assert_eq!(record.updated_at, 20);
        assert_eq!(record.final_score, 62);
    }

    #[test]
    fn test_migrated_records_always_validate() {
        let inputs = vec![
            json!({ "jdText": JD }),
            json!({ "jdText": JD, "readinessScore": "72" }),
            json!({ "jdText": JD, "plan": "not a list", "skills": "Java" }),
            json!({ "jdText": 5 }),
            json!({ "jdText": JD, "company": "x".repeat(300) }),
            json!({ "jdText": JD, "questions": vec!["Q"; 12] }),
            json!({}),
        ];
        for raw in inputs {
            if let Some(record) = migrate_old_entry_at(&raw, NOW) {
                let report = validate(&record.to_document());
                assert!(report.is_valid, "{raw}: {:?}", report.errors);
            }
        }
    }

    #[test]
    fn test_short_jd_legacy_entry_dropped() {
        let raw = json!({ "id": "old-6", "jdText": "Java dev", "readinessScore": 60 });
        assert!(migrate_old_entry_at(&raw, NOW).is_none());
    }

    #[test]
    fn test_fractional_legacy_score_rounded() {
        let raw = json!({ "id": "old-7", "jdText": JD, "readinessScore": 65.5 });
        let record = migrate_old_entry_at(&raw, NOW).unwrap();
        assert_eq!(record.base_score, 66);
        assert_eq!(record.final_score, 66);
    }

    #[test]
    fn test_entry_without_id_gets_stable_id() {
        let raw = json!({ "jdText": JD, "readinessScore": 65 });
        let first = migrate_old_entry_at(&raw, NOW).unwrap();
        let second = migrate_old_entry(&raw).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(Some(first.id), entry_id(&raw));

        let other = json!({ "jdText": JD, "readinessScore": 66 });
        assert_ne!(entry_id(&raw), entry_id(&other));
    }

    #[test]
    fn test_entry_id_variants() {
        assert_eq!(entry_id(&json!({ "id": "abc" })).as_deref(), Some("abc"));
        assert_eq!(entry_id(&json!({ "id": 1709 })).as_deref(), Some("1709"));
        let blank = entry_id(&json!({ "id": "  " })).unwrap();
        assert_eq!(Uuid::parse_str(&blank).unwrap().get_version_num(), 5);
        assert_eq!(entry_id(&json!([1])), None);
    }

    #[test]
    fn test_migration_is_stable() {
        let raw = json!({ "id": "old-5", "jdText": JD, "readinessScore": 65, "skills": ["Go"] });
        let first = migrate_old_entry_at(&raw, NOW).unwrap();
        let second = migrate_old_entry_at(&first.to_document(), NOW + 1).unwrap();
        assert_eq!(first, second);
    }
}
