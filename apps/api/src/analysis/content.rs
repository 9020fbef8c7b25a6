//! Analysis content: the payload a generator produces for the record builder.
//!
//! Keyword-driven generators live outside this crate. The default
//! `FallbackContentGenerator` serves a fixed, structurally complete
//! `AnalysisContent` injected at startup.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::analysis::{ChecklistRound, ExtractedSkills, PlanDay, RoundFocus};

/// Base score reported when no skill in the JD could be matched.
pub const FALLBACK_BASE_SCORE: i64 = 35;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisContent {
    pub extracted_skills: ExtractedSkills,
    pub base_score: i64,
    pub round_mapping: Vec<RoundFocus>,
    pub checklist: Vec<ChecklistRound>,
    #[serde(rename = "plan7Days")]
    pub plan_7_days: Vec<PlanDay>,
    pub questions: Vec<String>,
}

/// Inputs a generator may look at.
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub jd_text: &'a str,
    pub company: &'a str,
    pub role: &'a str,
}

/// Produces analysis content for a job description.
///
/// Implementations must always return every section populated, falling back
/// to generic content when nothing in the JD matches.
/// Carried in `AppState` as `Arc<dyn ContentGenerator>`.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: ContentRequest<'_>) -> Result<AnalysisContent, AppError>;
}

/// Always answers with the injected fallback content.
pub struct FallbackContentGenerator {
    fallback: Arc<AnalysisContent>,
}

impl FallbackContentGenerator {
    pub fn new(fallback: Arc<AnalysisContent>) -> Self {
        Self { fallback }
    }
}

impl Default for FallbackContentGenerator {
    fn default() -> Self {
        Self::new(Arc::new(fallback_content()))
    }
}

#[async_trait]
impl ContentGenerator for FallbackContentGenerator {
    async fn generate(&self, request: ContentRequest<'_>) -> Result<AnalysisContent, AppError> {
        tracing::debug!(
            "Serving fallback content for '{}' at '{}' ({} chars of JD text)",
            request.role,
            request.company,
            request.jd_text.chars().count()
        );
        Ok(self.fallback.as_ref().clone())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Generic preparation content used when no skills were detected.
pub fn fallback_content() -> AnalysisContent {
    let round_mapping = vec![
        RoundFocus {
            round_title: "Round 1: Online Assessment".to_string(),
            focus_areas: strings(&["Aptitude", "Basic coding"]),
            why_it_matters: "Filters candidates on fundamentals before interviews.".to_string(),
        },
        RoundFocus {
            round_title: "Round 2: Technical Interview".to_string(),
            focus_areas: strings(&["Data structures", "Problem solving"]),
            why_it_matters: "Checks how you reason through unfamiliar problems.".to_string(),
        },
        RoundFocus {
            round_title: "Round 3: Projects and Fundamentals".to_string(),
            focus_areas: strings(&["Project deep dive", "Core CS"]),
            why_it_matters: "Verifies that claimed work is really yours.".to_string(),
        },
        RoundFocus {
            round_title: "Round 4: HR / Managerial".to_string(),
            focus_areas: strings(&["Communication", "Culture fit"]),
            why_it_matters: "Confirms motivation, attitude and expectations.".to_string(),
        },
    ];

    let checklist = vec![
        ChecklistRound {
            round_title: "Round 1: Aptitude / Basics".to_string(),
            items: strings(&[
                "Practice quantitative aptitude",
                "Revise logical reasoning",
                "Solve 10 easy coding problems",
            ]),
        },
        ChecklistRound {
            round_title: "Round 2: DSA + Core CS".to_string(),
            items: strings(&[
                "Arrays, strings and hashing",
                "Recursion and sorting",
                "Revise OOP concepts",
            ]),
        },
        ChecklistRound {
            round_title: "Round 3: Tech Interview (Projects + Stack)".to_string(),
            items: strings(&[
                "Prepare a 2-minute walkthrough per project",
                "List trade-offs you made",
                "Revise the tools on your resume",
            ]),
        },
        ChecklistRound {
            round_title: "Round 4: Managerial / HR".to_string(),
            items: strings(&[
                "Prepare your introduction",
                "Draft STAR stories",
                "Research the company",
            ]),
        },
    ];

    let plan_7_days = vec![
        PlanDay {
            day: "Day 1-2".to_string(),
            focus: "Basics + core CS".to_string(),
            tasks: strings(&["Revise OOP", "Revise DBMS and OS basics"]),
        },
        PlanDay {
            day: "Day 3-4".to_string(),
            focus: "DSA + coding practice".to_string(),
            tasks: strings(&["Solve 5 problems a day", "Review time complexity"]),
        },
        PlanDay {
            day: "Day 5".to_string(),
            focus: "Project + resume alignment".to_string(),
            tasks: strings(&["Align resume bullets with the JD", "Rehearse project demo"]),
        },
        PlanDay {
            day: "Day 6".to_string(),
            focus: "Mock interview questions".to_string(),
            tasks: strings(&["Run one timed mock", "Note weak areas"]),
        },
        PlanDay {
            day: "Day 7".to_string(),
            focus: "Revision + weak areas".to_string(),
            tasks: strings(&["Revisit weak topics", "Rest before the interview"]),
        },
    ];

    let questions = strings(&[
        "Walk me through a project you are proud of.",
        "Explain the four pillars of object-oriented programming.",
        "How would you find a duplicate in an array?",
        "What happens when you type a URL into a browser?",
        "Explain the difference between a process and a thread.",
        "How do database indexes speed up queries?",
        "Describe a bug that took you long to fix.",
        "How do you approach a problem you have never seen before?",
        "Tell me about a time you disagreed with a teammate.",
        "Why do you want to work here?",
    ]);

    AnalysisContent {
        extracted_skills: ExtractedSkills::default(),
        base_score: FALLBACK_BASE_SCORE,
        round_mapping,
        checklist,
        plan_7_days,
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::schema::{field, FieldKind};
    use serde_json::json;

    fn max_items(name: &str) -> usize {
        match field(name).unwrap().kind {
            FieldKind::Sequence { max_items, .. } => max_items,
            other => panic!("{name} is not a sequence: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_is_structurally_complete() {
        let content = fallback_content();
        assert!(content.extracted_skills.is_empty());
        assert_eq!(content.base_score, FALLBACK_BASE_SCORE);
        assert_eq!(content.round_mapping.len(), max_items("roundMapping"));
        assert_eq!(content.checklist.len(), max_items("checklist"));
        assert_eq!(content.plan_7_days.len(), max_items("plan7Days"));
        assert_eq!(content.questions.len(), max_items("questions"));
    }

    #[test]
    fn test_partial_content_deserializes_with_defaults() {
        let content: AnalysisContent =
            serde_json::from_value(json!({ "baseScore": 58, "questions": ["Why Rust?"] })).unwrap();
        assert_eq!(content.base_score, 58);
        assert_eq!(content.questions, vec!["Why Rust?"]);
        assert!(content.checklist.is_empty());
        assert!(content.extracted_skills.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_generator_serves_injected_content() {
        let injected = AnalysisContent {
            base_score: 41,
            questions: vec!["Q".to_string()],
            ..AnalysisContent::default()
        };
        let generator = FallbackContentGenerator::new(Arc::new(injected.clone()));
        let produced = generator
            .generate(ContentRequest {
                jd_text: "anything",
                company: "",
                role: "",
            })
            .await
            .unwrap();
        assert_eq!(produced, injected);
    }
}
