//! Domain errors. Returned by the engine, services and ports.
//!
//! Adapters map infrastructure errors into `CollaboratorError`. Every variant is a
//! rejected operation; none of them leaves a half-applied state change behind.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Positional error list, one entry per schema question ("" = valid).
    #[error("There are error(s) in the response: {}", summarize(.0))]
    Validation(Vec<String>),

    #[error("Expected {expected} answers, got {actual}")]
    AnswerCount { expected: usize, actual: usize },

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Question {} does not exist", .0 + 1)]
    QuestionNotFound(usize),

    #[error("Questions cannot be released before at least one question is defined")]
    EmptySchema,

    #[error("Questions cannot be changed while responses are being collected")]
    SchemaLocked,

    #[error("A response from {0} was already recorded for this cycle")]
    DuplicateSubmission(String),

    #[error("Questions are already released for this cycle")]
    AlreadyOpen,

    #[error("The questionnaire for this group is closed")]
    AlreadyClosed,

    #[error("Next release can happen only after {days_left} days ({next_release_at})")]
    TooSoon {
        days_left: i64,
        next_release_at: DateTime<Utc>,
    },

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// The interactive front end could not read input.
    #[error("Input error: {0}")]
    Input(String),
}

fn summarize(errors: &[String]) -> String {
    errors
        .iter()
        .filter(|e| !e.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Failure turning a raw input into an answer value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("a {expected} question cannot take {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("\"{0}\" is not one of the question's options")]
    UnknownOption(String),

    #[error("unreadable image: {0}")]
    UnreadableImage(String),
}

/// Failure of an external collaborator. State is never advanced when one of these occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Membership provider error: {0}")]
    Membership(String),

    #[error("Newsletter compiler error: {0}")]
    Compiler(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Collaborator(CollaboratorError::Store(message.into()))
    }

    pub fn membership(message: impl Into<String>) -> Self {
        Self::Collaborator(CollaboratorError::Membership(message.into()))
    }

    pub fn compiler(message: impl Into<String>) -> Self {
        Self::Collaborator(CollaboratorError::Compiler(message.into()))
    }

    /// Positional messages when this is a validation failure.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
