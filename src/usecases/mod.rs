//! Application use cases. Orchestrate domain logic via ports.

pub mod answer_codec;
pub mod group_locks;
pub mod questionnaire_service;
pub mod release_engine;
pub mod schema_service;

#[cfg(test)]
pub(crate) mod testing;

pub use answer_codec::{AnswerCodec, EncodedImage};
pub use group_locks::GroupLocks;
pub use questionnaire_service::{Questionnaire, QuestionnaireService};
pub use release_engine::{CollectionStatus, ReleaseCycleEngine, SubmissionReceipt};
pub use schema_service::SchemaService;
