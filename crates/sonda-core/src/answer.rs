//! Answer values and the in-memory draft held by the auto-save engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A respondent's value for one question.
///
/// Serialised untagged: the wire form is whatever JSON shape the question
/// kind produces — a string, a list of chosen options, a number, or an
/// option→number map (percentage splits and rankings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Selection(Vec<String>),
    Number(f64),
    Split(BTreeMap<String, f64>),
}

impl AnswerValue {
    /// True when the value carries no information yet.
    ///
    /// Empty values are never flushed to the store and never count
    /// towards completion.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Selection(items) => items.is_empty(),
            AnswerValue::Number(_) => false,
            AnswerValue::Split(map) => map.is_empty(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        AnswerValue::Text(s)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(items: Vec<String>) -> Self {
        AnswerValue::Selection(items)
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        AnswerValue::Number(n)
    }
}

/// One question's draft state inside the auto-save engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: u32,
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    /// Opaque derived metadata; carried through unchanged, never
    /// interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<serde_json::Value>,
}

impl Answer {
    pub fn new(question: u32, value: impl Into<AnswerValue>) -> Self {
        Answer {
            question,
            value: value.into(),
            observations: None,
            annotation: None,
        }
    }
}
