//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the question schema, validation and the release-cycle rules live here.
//! Dependencies flow inward.

pub mod collector;
pub mod cycle;
pub mod entities;
pub mod errors;
pub mod schema;
pub mod validator;

pub use collector::{ResponseCollectionState, ResponseCollector};
pub use cycle::{CycleState, DEFAULT_MIN_INTERVAL_DAYS, ReleaseCycle, ReleaseGate};
pub use entities::{
    AnswerValue, CompiledNewsletter, ImageAnswer, Question, QuestionType, RawAnswer, Response,
};
pub use errors::{CollaboratorError, DomainError, EncodingError};
pub use schema::{QuestionDraft, QuestionSchema};
pub use validator::ResponseValidator;
