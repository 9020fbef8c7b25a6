use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::schema::{
    as_integer, type_name, FieldKind, FieldSpec, ItemFieldKind, ItemShape, Presence,
    ANALYSIS_SCHEMA, CONFIDENCE_VALUES, SCORE_MAX, SCORE_MIN, SKILL_CATEGORIES,
};
use crate::analysis::scoring::calculate_final_score;
use crate::models::analysis::Confidence;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks an arbitrary JSON value against `ANALYSIS_SCHEMA`.
///
/// Never fails: a non-object input yields a single top-level error.
/// Extra top-level fields and extra skill categories are tolerated.
pub fn validate(value: &Value) -> ValidationReport {
    let Some(doc) = value.as_object() else {
        return ValidationReport::from_errors(vec![format!(
            "record must be an object, got {}",
            type_name(value)
        )]);
    };

    let mut errors = Vec::new();
    for spec in ANALYSIS_SCHEMA {
        match doc.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.presence == Presence::Required {
                    errors.push(format!(
                        "missing required field '{}': expected {}",
                        spec.name,
                        spec.kind.expectation()
                    ));
                }
            }
            Some(v) => errors.extend(check_field(spec, v)),
        }
    }
    errors.extend(check_consistency(doc));

    ValidationReport::from_errors(errors)
}

/// Errors for a single present field value. Empty means the value is valid.
pub fn check_field(spec: &FieldSpec, value: &Value) -> Vec<String> {
    let name = spec.name;
    let mut errors = Vec::new();

    match spec.kind {
        FieldKind::Id => {
            if !value.as_str().is_some_and(|s| !s.trim().is_empty()) {
                errors.push(format!("field '{name}' must be a non-empty string"));
            }
        }
        FieldKind::Timestamp => match as_integer(value) {
            Some(ts) if ts >= 0 => {}
            _ => errors.push(format!(
                "field '{name}' must be a non-negative integer timestamp, got {}",
                type_name(value)
            )),
        },
        FieldKind::Text {
            min_chars,
            max_chars,
        } => match value.as_str() {
            None => errors.push(format!(
                "field '{name}' must be a string, got {}",
                type_name(value)
            )),
            Some(text) => {
                if let Some(min) = min_chars {
                    let len = text.trim().chars().count();
                    if len == 0 {
                        errors.push(format!("field '{name}' must not be empty"));
                    } else if len < min {
                        errors.push(format!(
                            "field '{name}' must be at least {min} characters, got {len}"
                        ));
                    }
                }
                if let Some(max) = max_chars {
                    let len = text.chars().count();
                    if len > max {
                        errors.push(format!(
                            "field '{name}' must be at most {max} characters, got {len}"
                        ));
                    }
                }
            }
        },
        FieldKind::Score => match as_integer(value) {
            None => errors.push(format!(
                "field '{name}' must be an integer, got {}",
                type_name(value)
            )),
            Some(score) if !(SCORE_MIN..=SCORE_MAX).contains(&score) => errors.push(format!(
                "field '{name}' must be within [{SCORE_MIN}, {SCORE_MAX}], got {score}"
            )),
            Some(_) => {}
        },
        FieldKind::SkillCategories => match value.as_object() {
            None => errors.push(format!(
                "field '{name}' must be an object with categories {}, got {}",
                SKILL_CATEGORIES.join(", "),
                type_name(value)
            )),
            Some(categories) => {
                for key in SKILL_CATEGORIES {
                    match categories.get(key) {
                        None => errors.push(format!("{name} is missing category '{key}'")),
                        Some(list) if !is_string_list(list) => {
                            errors.push(format!("{name}.{key} must be a sequence of strings"))
                        }
                        Some(_) => {}
                    }
                }
            }
        },
        FieldKind::ConfidenceMap => match value.as_object() {
            None => errors.push(format!(
                "field '{name}' must be an object, got {}",
                type_name(value)
            )),
            Some(map) => {
                for (skill, mark) in map {
                    let known = mark.as_str().is_some_and(|m| CONFIDENCE_VALUES.contains(&m));
                    if !known {
                        errors.push(format!(
                            "{name}.{skill} must be one of {}",
                            CONFIDENCE_VALUES.join(", ")
                        ));
                    }
                }
            }
        },
        FieldKind::Sequence { item, max_items } => match value.as_array() {
            None => errors.push(format!(
                "field '{name}' must be a sequence, got {}",
                type_name(value)
            )),
            Some(items) => {
                if items.len() > max_items {
                    errors.push(format!(
                        "field '{name}' must have at most {max_items} items, got {}",
                        items.len()
                    ));
                }
                for (i, element) in items.iter().enumerate() {
                    if !item_matches(item, element) {
                        errors.push(format!("{name}[{i}] must be {}", item.describe()));
                    }
                }
            }
        },
        FieldKind::Object => {
            if !value.is_object() {
                errors.push(format!(
                    "field '{name}' must be an object, got {}",
                    type_name(value)
                ));
            }
        }
    }

    errors
}

/// Cross-field rules: timestamp ordering and the derived final score.
fn check_consistency(doc: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();

    let created = doc.get("createdAt").and_then(as_integer);
    let updated = doc.get("updatedAt").and_then(as_integer);
    if let (Some(created), Some(updated)) = (created, updated) {
        if updated < created {
            errors.push(format!(
                "updatedAt ({updated}) must not be earlier than createdAt ({created})"
            ));
        }
    }

    let base = doc.get("baseScore").and_then(as_integer);
    let stored_final = doc.get("finalScore").and_then(as_integer);
    let marks = doc.get("skillConfidenceMap").and_then(parse_marks);
    if let (Some(base), Some(stored_final), Some(marks)) = (base, stored_final, marks) {
        let expected = calculate_final_score(base, &marks);
        if stored_final != expected {
            errors.push(format!(
                "finalScore ({stored_final}) does not match baseScore plus confidence adjustments (expected {expected})"
            ));
        }
    }

    errors
}

/// Parses a confidence map, `None` if any entry is malformed.
fn parse_marks(value: &Value) -> Option<BTreeMap<String, Confidence>> {
    value
        .as_object()?
        .iter()
        .map(|(skill, mark)| Some((skill.clone(), Confidence::parse(mark.as_str()?)?)))
        .collect()
}

fn is_string_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}

fn item_matches(shape: ItemShape, element: &Value) -> bool {
    if shape == ItemShape::Text {
        return element.is_string();
    }
    let Some(obj) = element.as_object() else {
        return false;
    };
    shape.fields().iter().all(|field| match obj.get(field.name) {
        None | Some(Value::Null) => true,
        Some(v) => match field.kind {
            ItemFieldKind::Text => v.is_string(),
            ItemFieldKind::TextList => is_string_list(v),
        },
    })
}
