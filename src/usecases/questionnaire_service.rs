//! Responder-facing flow: fetch the form, encode raw answers, submit.
//!
//! Encoding only starts once the engine says the window is open for this responder;
//! image answers are encoded on the blocking pool.

use crate::domain::{
    AnswerValue, CycleState, DomainError, EncodingError, QuestionSchema, QuestionType, RawAnswer,
    ResponseValidator,
};
use crate::ports::CycleStore;
use crate::usecases::answer_codec::AnswerCodec;
use crate::usecases::release_engine::{ReleaseCycleEngine, SubmissionReceipt};
use std::sync::Arc;
use tracing::{debug, info};

/// What a responder sees when opening the form.
#[derive(Debug, Clone, PartialEq)]
pub struct Questionnaire {
    pub group_id: String,
    pub cycle_number: u32,
    pub state: CycleState,
    pub questions: QuestionSchema,
    /// The responder already answered this cycle.
    pub already_taken: bool,
}

impl Questionnaire {
    pub fn accepting_responses(&self) -> bool {
        self.state.accepts_responses()
    }
}

pub struct QuestionnaireService {
    engine: Arc<ReleaseCycleEngine>,
    store: Arc<dyn CycleStore>,
    codec: AnswerCodec,
}

impl QuestionnaireService {
    pub fn new(
        engine: Arc<ReleaseCycleEngine>,
        store: Arc<dyn CycleStore>,
        codec: AnswerCodec,
    ) -> Self {
        Self {
            engine,
            store,
            codec,
        }
    }

    pub async fn questionnaire(
        &self,
        group_id: &str,
        responder_id: &str,
    ) -> Result<Questionnaire, DomainError> {
        let cycle = self.engine.cycle(group_id).await?;
        let questions = self.store.load_schema(group_id).await?;
        Ok(Questionnaire {
            group_id: group_id.to_string(),
            cycle_number: cycle.cycle_number,
            state: cycle.state,
            already_taken: cycle.accepting_responses()
                && cycle.collection.has_responded(responder_id),
            questions,
        })
    }

    /// Encode `raw` (positional, one per question) and submit it.
    pub async fn submit(
        &self,
        group_id: &str,
        responder_id: &str,
        raw: Vec<RawAnswer>,
    ) -> Result<SubmissionReceipt, DomainError> {
        self.engine.ensure_accepting(group_id, responder_id).await?;

        let schema = self.store.load_schema(group_id).await?;
        if raw.len() > schema.question_count() {
            return Err(DomainError::AnswerCount {
                expected: schema.question_count(),
                actual: raw.len(),
            });
        }

        let mut raw = raw.into_iter();
        let mut answers: Vec<Option<AnswerValue>> = Vec::with_capacity(schema.question_count());
        let mut encoding_errors: Vec<Option<String>> = Vec::with_capacity(schema.question_count());
        for question in &schema {
            let input = raw.next().unwrap_or(RawAnswer::Absent);
            let encoded = if question.question_type == QuestionType::Image {
                let codec = self.codec.clone();
                let question = question.clone();
                tokio::task::spawn_blocking(move || codec.encode(&question, input))
                    .await
                    .unwrap_or_else(|e| Err(EncodingError::UnreadableImage(e.to_string())))
            } else {
                self.codec.encode(question, input)
            };
            match encoded {
                Ok(value) => {
                    answers.push(value);
                    encoding_errors.push(None);
                }
                Err(e) => {
                    debug!(group_id, responder_id, position = question.index, error = %e, "answer encoding failed");
                    answers.push(None);
                    encoding_errors.push(Some(encoding_message(
                        question.question_type,
                        question.index + 1,
                        &e,
                    )));
                }
            }
        }

        if encoding_errors.iter().any(Option::is_some) {
            let mut errors = ResponseValidator::validate(&schema, &answers);
            for (slot, encoding_error) in errors.iter_mut().zip(encoding_errors) {
                if let Some(message) = encoding_error {
                    *slot = message;
                }
            }
            info!(group_id, responder_id, "submission rejected: answers could not be encoded");
            return Err(DomainError::Validation(errors));
        }

        self.engine
            .accept_submission(group_id, responder_id, answers)
            .await
    }
}

fn encoding_message(question_type: QuestionType, n: usize, error: &EncodingError) -> String {
    match (question_type, error) {
        (QuestionType::Image, _) => format!("Question {n} should have a valid image file."),
        (_, EncodingError::UnknownOption(option)) => {
            format!("Question {n}: \"{option}\" is not one of the options.")
        }
        (_, e) => format!("Question {n}: {e}."),
    }
}
