//! Schema Registry: the single declaration of what a valid analysis record looks like.
//!
//! Both the validator and the normalizer walk `ANALYSIS_SCHEMA` instead of
//! carrying their own field lists.

use serde_json::Value;

pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 100;

/// Upper bound for the free-text `company` / `role` fields.
pub const SHORT_TEXT_MAX_CHARS: usize = 200;

/// Shortest job description an analysis can be built from, counted after trimming.
pub const JD_MIN_CHARS: usize = 50;

pub const SKILL_CATEGORIES: [&str; 7] = [
    "Core_CS",
    "Languages",
    "Web",
    "Data",
    "Cloud_DevOps",
    "Testing",
    "other",
];

/// Catch-all bucket for skills this layer cannot categorize.
pub const OTHER_CATEGORY: &str = "other";

pub const CONFIDENCE_VALUES: [&str; 3] = ["know", "practice", "unset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFieldKind {
    Text,
    TextList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemField {
    pub name: &'static str,
    pub kind: ItemFieldKind,
}

/// Shape of one element inside a sequence field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    Text,
    RoundFocus,
    ChecklistRound,
    PlanDay,
}

const ROUND_FOCUS_FIELDS: &[ItemField] = &[
    ItemField { name: "roundTitle", kind: ItemFieldKind::Text },
    ItemField { name: "focusAreas", kind: ItemFieldKind::TextList },
    ItemField { name: "whyItMatters", kind: ItemFieldKind::Text },
];

const CHECKLIST_ROUND_FIELDS: &[ItemField] = &[
    ItemField { name: "roundTitle", kind: ItemFieldKind::Text },
    ItemField { name: "items", kind: ItemFieldKind::TextList },
];

const PLAN_DAY_FIELDS: &[ItemField] = &[
    ItemField { name: "day", kind: ItemFieldKind::Text },
    ItemField { name: "focus", kind: ItemFieldKind::Text },
    ItemField { name: "tasks", kind: ItemFieldKind::TextList },
];

impl ItemShape {
    /// Sub-fields of an object-shaped item. Empty for `Text` items.
    pub fn fields(self) -> &'static [ItemField] {
        match self {
            ItemShape::Text => &[],
            ItemShape::RoundFocus => ROUND_FOCUS_FIELDS,
            ItemShape::ChecklistRound => CHECKLIST_ROUND_FIELDS,
            ItemShape::PlanDay => PLAN_DAY_FIELDS,
        }
    }

    /// Sub-field a bare string is promoted into when an object was expected.
    pub fn promote_field(self) -> Option<&'static str> {
        match self {
            ItemShape::Text => None,
            ItemShape::RoundFocus | ItemShape::ChecklistRound => Some("roundTitle"),
            ItemShape::PlanDay => Some("focus"),
        }
    }

    pub fn describe(self) -> String {
        match self {
            ItemShape::Text => "a string".to_string(),
            shape => {
                let names: Vec<&str> = shape.fields().iter().map(|f| f.name).collect();
                format!("an object with {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque non-empty string identifier.
    Id,
    /// Non-negative integer, epoch milliseconds.
    Timestamp,
    /// `min_chars` counts trimmed characters and implies non-empty.
    Text {
        min_chars: Option<usize>,
        max_chars: Option<usize>,
    },
    /// Integer within `SCORE_MIN..=SCORE_MAX`.
    Score,
    /// Mapping with exactly the `SKILL_CATEGORIES` keys, each a list of strings.
    SkillCategories,
    /// Mapping of skill name to one of `CONFIDENCE_VALUES`.
    ConfidenceMap,
    Sequence {
        item: ItemShape,
        max_items: usize,
    },
    /// Free-form structured object.
    Object,
}

impl FieldKind {
    /// Human-readable expectation used in validation messages.
    pub fn expectation(self) -> String {
        match self {
            FieldKind::Id => "a non-empty string".to_string(),
            FieldKind::Timestamp => "a non-negative integer timestamp".to_string(),
            FieldKind::Text {
                min_chars: Some(min),
                ..
            } => format!("a string of at least {min} characters"),
            FieldKind::Text { .. } => "a string".to_string(),
            FieldKind::Score => format!("an integer in [{SCORE_MIN}, {SCORE_MAX}]"),
            FieldKind::SkillCategories => format!(
                "an object with categories {}",
                SKILL_CATEGORIES.join(", ")
            ),
            FieldKind::ConfidenceMap => format!(
                "an object mapping skills to {}",
                CONFIDENCE_VALUES.join(" | ")
            ),
            FieldKind::Sequence { item, max_items } => {
                format!("a sequence of at most {max_items} items, each {}", item.describe())
            }
            FieldKind::Object => "an object".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
    pub kind: FieldKind,
}

pub const ANALYSIS_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "id",
        presence: Presence::Required,
        kind: FieldKind::Id,
    },
    FieldSpec {
        name: "createdAt",
        presence: Presence::Required,
        kind: FieldKind::Timestamp,
    },
    FieldSpec {
        name: "updatedAt",
        presence: Presence::Required,
        kind: FieldKind::Timestamp,
    },
    FieldSpec {
        name: "company",
        presence: Presence::Optional,
        kind: FieldKind::Text {
            min_chars: None,
            max_chars: Some(SHORT_TEXT_MAX_CHARS),
        },
    },
    FieldSpec {
        name: "role",
        presence: Presence::Optional,
        kind: FieldKind::Text {
            min_chars: None,
            max_chars: Some(SHORT_TEXT_MAX_CHARS),
        },
    },
    FieldSpec {
        name: "jdText",
        presence: Presence::Required,
        kind: FieldKind::Text {
            min_chars: Some(JD_MIN_CHARS),
            max_chars: None,
        },
    },
    FieldSpec {
        name: "extractedSkills",
        presence: Presence::Required,
        kind: FieldKind::SkillCategories,
    },
    FieldSpec {
        name: "baseScore",
        presence: Presence::Required,
        kind: FieldKind::Score,
    },
    FieldSpec {
        name: "finalScore",
        presence: Presence::Required,
        kind: FieldKind::Score,
    },
    FieldSpec {
        name: "skillConfidenceMap",
        presence: Presence::Required,
        kind: FieldKind::ConfidenceMap,
    },
    FieldSpec {
        name: "roundMapping",
        presence: Presence::Required,
        kind: FieldKind::Sequence {
            item: ItemShape::RoundFocus,
            max_items: 4,
        },
    },
    FieldSpec {
        name: "checklist",
        presence: Presence::Required,
        kind: FieldKind::Sequence {
            item: ItemShape::ChecklistRound,
            max_items: 4,
        },
    },
    FieldSpec {
        name: "plan7Days",
        presence: Presence::Required,
        kind: FieldKind::Sequence {
            item: ItemShape::PlanDay,
            max_items: 5,
        },
    },
    FieldSpec {
        name: "questions",
        presence: Presence::Required,
        kind: FieldKind::Sequence {
            item: ItemShape::Text,
            max_items: 10,
        },
    },
    FieldSpec {
        name: "companyIntel",
        presence: Presence::Optional,
        kind: FieldKind::Object,
    },
];

/// A field name from a retired record shape and the current fields it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyField {
    pub name: &'static str,
    pub replaced_by: &'static [&'static str],
}

/// Retired field names, oldest generation first.
pub const LEGACY_FIELDS: &[LegacyField] = &[
    LegacyField {
        name: "readinessScore",
        replaced_by: &["baseScore", "finalScore"],
    },
    LegacyField {
        name: "plan",
        replaced_by: &["plan7Days"],
    },
    LegacyField {
        name: "skills",
        replaced_by: &["extractedSkills"],
    },
];

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    ANALYSIS_SCHEMA.iter().find(|spec| spec.name == name)
}

/// Reads a JSON number as an integer, accepting integral floats
/// (`72.0`) written by older clients.
pub fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// JSON type name for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
