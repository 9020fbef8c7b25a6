use std::collections::BTreeMap;

use crate::analysis::schema::{SCORE_MAX, SCORE_MIN};
use crate::models::analysis::{AnalysisRecord, Confidence};

/// Final score = base + Σ(know +2, practice −2, unset 0), clamped to [0, 100].
///
/// Always recomputed from the full map; never patched incrementally.
pub fn calculate_final_score(base_score: i64, confidence_map: &BTreeMap<String, Confidence>) -> i64 {
    let adjustment: i64 = confidence_map.values().map(|c| c.adjustment()).sum();
    base_score.saturating_add(adjustment).clamp(SCORE_MIN, SCORE_MAX)
}

impl AnalysisRecord {
    /// Records a confidence mark for one skill and re-derives `final_score`.
    /// `base_score` is left untouched.
    pub fn set_confidence(&mut self, skill: &str, mark: Confidence, now: i64) {
        self.skill_confidence_map.insert(skill.to_string(), mark);
        self.recompute_final_score();
        self.touch(now);
    }

    /// Replaces the whole confidence map.
    pub fn replace_confidence_map(&mut self, map: BTreeMap<String, Confidence>, now: i64) {
        self.skill_confidence_map = map;
        self.recompute_final_score();
        self.touch(now);
    }

    pub fn recompute_final_score(&mut self) {
        self.final_score = calculate_final_score(self.base_score, &self.skill_confidence_map);
    }

    /// Bumps `updated_at`, strictly increasing even if the clock stalls or goes back.
    fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.updated_at.saturating_add(1));
    }
}
