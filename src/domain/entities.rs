//! Domain entities. Pure data structures for the questionnaire and its answers.
//!
//! No storage/transport types here; adapters map to and from these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Input type of a question. Decides answer shape, validation and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Text,
    Image,
    Date,
    Time,
    Checkbox,
    Dropdown,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::Text,
        QuestionType::Image,
        QuestionType::Date,
        QuestionType::Time,
        QuestionType::Checkbox,
        QuestionType::Dropdown,
    ];

    /// Checkbox and dropdown questions carry a list of options.
    pub fn is_multiple_option(self) -> bool {
        matches!(self, QuestionType::Checkbox | QuestionType::Dropdown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Text => "TEXT",
            QuestionType::Image => "IMAGE",
            QuestionType::Date => "DATE",
            QuestionType::Time => "TIME",
            QuestionType::Checkbox => "CHECKBOX",
            QuestionType::Dropdown => "DROPDOWN",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single question of a group's questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    /// Position in the schema (0-based, dense). Answers correlate by position.
    pub index: usize,
    pub prompt: String,
    pub hint: Option<String>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Present and non-empty iff the type is CHECKBOX or DROPDOWN.
    pub options: Option<Vec<String>>,
}

impl Question {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options().iter().any(|o| o == value)
    }
}

/// Image answer: either the uploaded file or the codec's encoded data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAnswer {
    Raw { mime: String, bytes: Vec<u8> },
    Encoded(String),
}

/// Answer to one question. The variant must match the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "response", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerValue {
    Text(String),
    Image(ImageAnswer),
    /// ISO date, e.g. 2024-05-01.
    Date(String),
    /// ISO time, e.g. 18:30.
    Time(String),
    Checkbox(BTreeSet<String>),
    Dropdown(String),
}

impl AnswerValue {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerValue::Text(_) => QuestionType::Text,
            AnswerValue::Image(_) => QuestionType::Image,
            AnswerValue::Date(_) => QuestionType::Date,
            AnswerValue::Time(_) => QuestionType::Time,
            AnswerValue::Checkbox(_) => QuestionType::Checkbox,
            AnswerValue::Dropdown(_) => QuestionType::Dropdown,
        }
    }
}

/// Raw input from a responder, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawAnswer {
    Absent,
    Text(String),
    Choices(Vec<String>),
    Image { mime: String, bytes: Vec<u8> },
}

impl RawAnswer {
    pub fn kind(&self) -> &'static str {
        match self {
            RawAnswer::Absent => "no answer",
            RawAnswer::Text(_) => "text",
            RawAnswer::Choices(_) => "a list of choices",
            RawAnswer::Image { .. } => "an image",
        }
    }
}

/// One responder's complete answers for a cycle, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub responder_id: String,
    pub group_id: String,
    pub cycle_number: u32,
    pub answers: Vec<AnswerValue>,
    pub submitted_at: DateTime<Utc>,
}

/// Output of the newsletter compiler for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledNewsletter {
    pub group_id: String,
    pub cycle_number: u32,
    pub title: String,
    pub body: String,
    /// Where the compiler published it (file path, URL), if anywhere.
    pub location: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_value_tagged_by_type() {
        let value = AnswerValue::Checkbox(BTreeSet::from(["A".to_string()]));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "CHECKBOX");
        assert_eq!(json["response"], serde_json::json!(["A"]));

        let back: AnswerValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_untagged_value_is_rejected() {
        let parsed = serde_json::from_value::<AnswerValue>(serde_json::json!("hello"));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_multiple_option_types() {
        let multi: Vec<_> = QuestionType::ALL
            .into_iter()
            .filter(|t| t.is_multiple_option())
            .collect();
        assert_eq!(multi, vec![QuestionType::Checkbox, QuestionType::Dropdown]);
    }
}
