//! The discovery questionnaire: section metadata, questions, and
//! completion rules.
//!
//! The catalog is immutable input to the auto-save engine. Two different
//! notions of "answered" coexist:
//!
//! - progress (the heartbeat metric) counts questions holding any
//!   non-empty value;
//! - the per-kind predicate [`Question::is_answered`] is stricter (a
//!   percentage split must allocate every option and total 100) and
//!   drives per-question status display.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::answer::{Answer, AnswerValue};

/// The seven response shapes a question can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// One option from a fixed list.
    SingleChoice,
    /// Any number of options from a fixed list.
    MultiChoice,
    /// A single numeric value.
    Scale,
    /// Short free text.
    FreeText,
    /// Multi-line free text.
    LongText,
    /// Percentages allocated across the options, totalling 100.
    PercentSplit,
    /// Every option placed in rank order.
    Ranking,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::Scale => "scale",
            QuestionKind::FreeText => "free_text",
            QuestionKind::LongText => "long_text",
            QuestionKind::PercentSplit => "percent_split",
            QuestionKind::Ranking => "ranking",
        }
    }
}

/// How urgently a section's answers are needed for the engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// One questionnaire section and who in the company should answer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u32,
    pub title: String,
    pub suggested_role: String,
    pub department: String,
    pub priority: Priority,
}

/// One question in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub section: u32,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    pub required: bool,
    /// Whether the form offers a free-text observations field alongside.
    #[serde(default)]
    pub observations: bool,
}

impl Question {
    /// The per-kind "fully answered" predicate.
    pub fn is_answered(&self, value: &AnswerValue) -> bool {
        match self.kind {
            QuestionKind::PercentSplit => match value {
                AnswerValue::Split(map) => {
                    let all_allocated = self
                        .options
                        .iter()
                        .all(|opt| map.get(opt).is_some_and(|v| *v > 0.0));
                    all_allocated && (self.split_total(map) - 100.0).abs() < 1e-9
                }
                _ => false,
            },
            QuestionKind::Scale => matches!(value, AnswerValue::Number(_)),
            QuestionKind::MultiChoice => {
                matches!(value, AnswerValue::Selection(items) if !items.is_empty())
            }
            QuestionKind::SingleChoice => {
                matches!(value, AnswerValue::Text(s) if !s.is_empty())
            }
            QuestionKind::FreeText | QuestionKind::LongText => {
                matches!(value, AnswerValue::Text(s) if !s.trim().is_empty())
            }
            QuestionKind::Ranking => match value {
                AnswerValue::Split(map) => self
                    .options
                    .iter()
                    .all(|opt| map.get(opt).is_some_and(|v| *v != 0.0)),
                _ => false,
            },
        }
    }

    /// Started but not complete. Only the map-shaped kinds have a real
    /// partial state; every other kind is either answered or untouched.
    pub fn is_partially_answered(&self, value: &AnswerValue) -> bool {
        if self.is_answered(value) {
            return false;
        }
        match self.kind {
            QuestionKind::PercentSplit => match value {
                AnswerValue::Split(map) => {
                    let filled = self
                        .options
                        .iter()
                        .filter(|opt| map.get(*opt).is_some_and(|v| *v > 0.0))
                        .count();
                    let total = self.split_total(map);
                    filled > 0 && (filled < self.options.len() || total < 100.0)
                }
                _ => false,
            },
            QuestionKind::Ranking => match value {
                AnswerValue::Split(map) => {
                    let placed = self
                        .options
                        .iter()
                        .filter(|opt| map.get(*opt).is_some_and(|v| *v != 0.0))
                        .count();
                    placed > 0 && placed < self.options.len()
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Sum of the percentages allocated to this question's own options.
    /// Stray keys in the map do not count.
    fn split_total(&self, map: &BTreeMap<String, f64>) -> f64 {
        self.options.iter().filter_map(|opt| map.get(opt)).sum()
    }
}

/// The full questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    sections: Vec<Section>,
    questions: Vec<Question>,
}

static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_json(include_str!("../data/catalog.json")).expect("built-in catalog parses")
});

impl Catalog {
    /// The questionnaire shipped with the binary: 17 sections,
    /// 109 questions.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn section(&self, id: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn questions_in_section(&self, section: u32) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.section == section)
    }

    /// Share of catalog questions holding a non-empty value, rounded to
    /// the nearest whole percent. Pushed to the session row as the
    /// progress heartbeat on every edit.
    pub fn completion_percent(&self, answers: &BTreeMap<u32, Answer>) -> u8 {
        if self.questions.is_empty() {
            return 0;
        }
        let answered = self
            .questions
            .iter()
            .filter(|q| answers.get(&q.id).is_some_and(|a| !a.value.is_empty()))
            .count();
        percent(answered, self.questions.len())
    }

    /// Per-section completion map, same non-empty rule as
    /// [`Catalog::completion_percent`].
    pub fn section_progress(&self, answers: &BTreeMap<u32, Answer>) -> BTreeMap<u32, u8> {
        let mut progress = BTreeMap::new();
        for section in &self.sections {
            let mut total = 0usize;
            let mut answered = 0usize;
            for question in self.questions_in_section(section.id) {
                total += 1;
                if answers.get(&question.id).is_some_and(|a| !a.value.is_empty()) {
                    answered += 1;
                }
            }
            let pct = if total == 0 { 0 } else { percent(answered, total) };
            progress.insert(section.id, pct);
        }
        progress
    }
}

fn percent(answered: usize, total: usize) -> u8 {
    ((100.0 * answered as f64) / total as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "sections": [
                    {"id": 1, "title": "Services", "suggested_role": "Partners", "department": "Strategy", "priority": "critical"},
                    {"id": 2, "title": "Knowledge", "suggested_role": "CTO", "department": "Technology", "priority": "high"}
                ],
                "questions": [
                    {"id": 1, "section": 1, "text": "Split your workload.", "kind": "percent_split", "options": ["RCT", "Audit"], "required": true, "observations": true},
                    {"id": 2, "section": 1, "text": "Strongest specialty?", "kind": "single_choice", "options": ["ICMS", "PIS/COFINS"], "required": true, "observations": true},
                    {"id": 3, "section": 2, "text": "Where are documents stored?", "kind": "multi_choice", "options": ["Local server", "Cloud"], "required": true, "observations": true},
                    {"id": 4, "section": 2, "text": "Rank the rollout order.", "kind": "ranking", "options": ["BDR", "SDR", "Closer"], "required": true, "observations": false}
                ]
            }"#,
        )
        .unwrap()
    }

    fn split(pairs: &[(&str, f64)]) -> AnswerValue {
        AnswerValue::Split(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        )
    }

    #[test]
    fn builtin_catalog_shape() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.sections().len(), 17);
        assert_eq!(catalog.total_questions(), 109);

        // Question ids are unique and each references a real section.
        let mut seen = std::collections::BTreeSet::new();
        for question in catalog.questions() {
            assert!(seen.insert(question.id), "duplicate id {}", question.id);
            assert!(
                catalog.section(question.section).is_some(),
                "question {} references unknown section {}",
                question.id,
                question.section
            );
        }

        // Every section has at least one question.
        for section in catalog.sections() {
            assert!(
                catalog.questions_in_section(section.id).count() > 0,
                "section {} is empty",
                section.id
            );
        }

        // Option-driven kinds always carry options.
        for question in catalog.questions() {
            match question.kind {
                QuestionKind::SingleChoice
                | QuestionKind::MultiChoice
                | QuestionKind::PercentSplit
                | QuestionKind::Ranking => {
                    assert!(!question.options.is_empty(), "question {} has no options", question.id);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn builtin_lookups() {
        let catalog = Catalog::builtin();
        let q = catalog.question(104).unwrap();
        assert_eq!(q.kind, QuestionKind::Ranking);
        assert_eq!(q.section, 16);

        assert_eq!(catalog.questions_in_section(1).count(), 6);
        assert_eq!(catalog.questions_in_section(2).count(), 8);
        assert!(catalog.question(110).is_none());
        assert!(catalog.section(18).is_none());
    }

    #[test]
    fn percent_split_answered_needs_full_allocation() {
        let catalog = small_catalog();
        let q = catalog.question(1).unwrap();

        assert!(q.is_answered(&split(&[("RCT", 60.0), ("Audit", 40.0)])));
        // One option left at zero.
        assert!(!q.is_answered(&split(&[("RCT", 100.0)])));
        assert!(!q.is_answered(&split(&[("RCT", 100.0), ("Audit", 0.0)])));
        // Allocated everywhere but short of 100.
        assert!(!q.is_answered(&split(&[("RCT", 30.0), ("Audit", 40.0)])));
        // Stray keys do not contribute to the total.
        assert!(!q.is_answered(&split(&[("RCT", 50.0), ("Audit", 40.0), ("Other", 10.0)])));
        // Wrong shape entirely.
        assert!(!q.is_answered(&AnswerValue::Text("60/40".into())));
    }

    #[test]
    fn percent_split_partial_states() {
        let catalog = small_catalog();
        let q = catalog.question(1).unwrap();

        assert!(q.is_partially_answered(&split(&[("RCT", 60.0)])));
        assert!(q.is_partially_answered(&split(&[("RCT", 30.0), ("Audit", 40.0)])));
        // Complete is not partial.
        assert!(!q.is_partially_answered(&split(&[("RCT", 60.0), ("Audit", 40.0)])));
        // Untouched is not partial.
        assert!(!q.is_partially_answered(&split(&[])));
    }

    #[test]
    fn ranking_answered_when_every_option_placed() {
        let catalog = small_catalog();
        let q = catalog.question(4).unwrap();

        assert!(q.is_answered(&split(&[("BDR", 1.0), ("SDR", 2.0), ("Closer", 3.0)])));
        assert!(!q.is_answered(&split(&[("BDR", 1.0), ("SDR", 2.0)])));
        assert!(q.is_partially_answered(&split(&[("BDR", 1.0)])));
        assert!(!q.is_partially_answered(&split(&[])));
    }

    #[test]
    fn choice_and_text_predicates() {
        let catalog = small_catalog();
        let single = catalog.question(2).unwrap();
        let multi = catalog.question(3).unwrap();

        assert!(single.is_answered(&AnswerValue::Text("ICMS".into())));
        assert!(!single.is_answered(&AnswerValue::Text(String::new())));
        assert!(!single.is_answered(&AnswerValue::Number(1.0)));

        assert!(multi.is_answered(&AnswerValue::Selection(vec!["Cloud".into()])));
        assert!(!multi.is_answered(&AnswerValue::Selection(vec![])));

        // Neither kind has a partial state.
        assert!(!single.is_partially_answered(&AnswerValue::Text(String::new())));
        assert!(!multi.is_partially_answered(&AnswerValue::Selection(vec![])));
    }

    #[test]
    fn completion_counts_non_empty_values() {
        let catalog = small_catalog();
        let mut answers = BTreeMap::new();
        assert_eq!(catalog.completion_percent(&answers), 0);

        answers.insert(2, Answer::new(2, "ICMS"));
        assert_eq!(catalog.completion_percent(&answers), 25);

        // An incomplete split still counts for progress: the value is
        // non-empty even though the per-kind predicate says unanswered.
        answers.insert(1, Answer::new(1, split(&[("RCT", 10.0)])));
        assert_eq!(catalog.completion_percent(&answers), 50);

        // Empty values never count.
        answers.insert(3, Answer::new(3, AnswerValue::Selection(vec![])));
        assert_eq!(catalog.completion_percent(&answers), 50);

        // Re-answering an already-counted question changes nothing.
        answers.insert(2, Answer::new(2, "PIS/COFINS"));
        assert_eq!(catalog.completion_percent(&answers), 50);
    }

    #[test]
    fn completion_rounds_to_nearest() {
        let catalog = Catalog::builtin();
        let mut answers = BTreeMap::new();
        for question in catalog.questions().iter().take(33) {
            answers.insert(question.id, Answer::new(question.id, "x"));
        }
        // 100 * 33 / 109 = 30.27...
        assert_eq!(catalog.completion_percent(&answers), 30);

        for question in catalog.questions().iter().take(55) {
            answers.insert(question.id, Answer::new(question.id, "x"));
        }
        // 100 * 55 / 109 = 50.45...
        assert_eq!(catalog.completion_percent(&answers), 50);
    }

    #[test]
    fn section_progress_is_per_section() {
        let catalog = small_catalog();
        let mut answers = BTreeMap::new();
        answers.insert(2, Answer::new(2, "ICMS"));
        answers.insert(3, Answer::new(3, vec!["Cloud".to_string()]));

        let progress = catalog.section_progress(&answers);
        assert_eq!(progress.get(&1), Some(&50));
        assert_eq!(progress.get(&2), Some(&50));

        answers.insert(4, Answer::new(4, split(&[("BDR", 1.0)])));
        let progress = catalog.section_progress(&answers);
        assert_eq!(progress.get(&2), Some(&100));
    }
}
