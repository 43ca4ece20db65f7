//! Response validation against a question schema.
//!
//! Produces one message per question (empty string = valid) in a single pass so the
//! caller can show every problem at once. Messages are user-facing and 1-based.

use crate::domain::{AnswerValue, ImageAnswer, Question, QuestionSchema, QuestionType};

pub struct ResponseValidator;

impl ResponseValidator {
    /// Validate positional answers. `answers[i]` answers `schema[i]`; missing positions
    /// count as absent. The result always has `schema.question_count()` entries.
    pub fn validate(schema: &QuestionSchema, answers: &[Option<AnswerValue>]) -> Vec<String> {
        schema
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let answer = answers.get(position).and_then(Option::as_ref);
                Self::check(question, position + 1, answer).unwrap_or_default()
            })
            .collect()
    }

    /// True when every entry of a validation result is empty.
    pub fn is_clean(errors: &[String]) -> bool {
        errors.iter().all(String::is_empty)
    }

    fn check(question: &Question, n: usize, answer: Option<&AnswerValue>) -> Option<String> {
        let Some(answer) = answer else {
            return Some(format!("Question {n} cannot be empty."));
        };
        if answer.question_type() != question.question_type {
            return Some(format!("Question {n} has an answer of the wrong type."));
        }

        match (question.question_type, answer) {
            (QuestionType::Text, AnswerValue::Text(text)) if is_blank(text) => {
                Some(format!("Question {n} cannot be empty."))
            }
            (QuestionType::Image, AnswerValue::Image(image)) if !is_image_payload(image) => {
                Some(format!("Question {n} should have a valid image file."))
            }
            (QuestionType::Date, AnswerValue::Date(date)) if is_blank(date) => {
                Some(format!("Please choose a date for Question {n}."))
            }
            (QuestionType::Time, AnswerValue::Time(time)) if is_blank(time) => {
                Some(format!("Please choose a time for Question {n}."))
            }
            (QuestionType::Dropdown, AnswerValue::Dropdown(choice)) if is_blank(choice) => {
                Some(format!("Please choose an option for Question {n}."))
            }
            (QuestionType::Checkbox, AnswerValue::Checkbox(selected)) if selected.is_empty() => {
                Some(format!("Please choose at least one option for Question {n}."))
            }
            _ => None,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Raw uploads must declare an image mime type; encoded answers must be a base64
/// image data URL as produced by the codec.
fn is_image_payload(image: &ImageAnswer) -> bool {
    match image {
        ImageAnswer::Raw { mime, bytes } => mime.starts_with("image/") && !bytes.is_empty(),
        ImageAnswer::Encoded(data_url) => data_url
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .is_some_and(|(subtype, payload)| !subtype.is_empty() && !payload.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuestionDraft;

    fn schema_of(types: &[QuestionType]) -> QuestionSchema {
        QuestionSchema::from_drafts(
            types
                .iter()
                .map(|t| QuestionDraft::new(format!("{t} question"), *t).with_options(["A", "B"]))
                .collect(),
        )
        .unwrap()
    }

    fn choices(values: &[&str]) -> AnswerValue {
        AnswerValue::Checkbox(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_text_and_empty_checkbox() {
        let schema = schema_of(&[QuestionType::Text, QuestionType::Checkbox]);
        let errors = ResponseValidator::validate(
            &schema,
            &[Some(AnswerValue::Text("hello".into())), Some(choices(&[]))],
        );
        assert_eq!(
            errors,
            vec![
                "".to_string(),
                "Please choose at least one option for Question 2.".to_string()
            ]
        );
    }

    #[test]
    fn test_valid_answers_yield_all_empty() {
        let schema = schema_of(&QuestionType::ALL);
        let answers = vec![
            Some(AnswerValue::Text("news".into())),
            Some(AnswerValue::Image(ImageAnswer::Encoded(
                "data:image/jpeg;base64,/9j/4AAQ".into(),
            ))),
            Some(AnswerValue::Date("2024-05-01".into())),
            Some(AnswerValue::Time("18:30".into())),
            Some(choices(&["A"])),
            Some(AnswerValue::Dropdown("B".into())),
        ];
        let errors = ResponseValidator::validate(&schema, &answers);
        assert_eq!(errors.len(), schema.question_count());
        assert!(ResponseValidator::is_clean(&errors));
    }

    #[test]
    fn test_reports_every_error_in_one_pass() {
        let schema = schema_of(&QuestionType::ALL);
        let answers = vec![
            Some(AnswerValue::Text("   ".into())),
            Some(AnswerValue::Image(ImageAnswer::Encoded("not-an-image".into()))),
            Some(AnswerValue::Date("".into())),
            Some(AnswerValue::Time(" ".into())),
            None,
            Some(AnswerValue::Dropdown("".into())),
        ];
        let errors = ResponseValidator::validate(&schema, &answers);
        assert_eq!(
            errors,
            vec![
                "Question 1 cannot be empty.",
                "Question 2 should have a valid image file.",
                "Please choose a date for Question 3.",
                "Please choose a time for Question 4.",
                "Question 5 cannot be empty.",
                "Please choose an option for Question 6.",
            ]
        );
    }

    #[test]
    fn test_missing_positions_are_empty_errors() {
        let schema = schema_of(&[QuestionType::Text, QuestionType::Date]);
        let errors = ResponseValidator::validate(&schema, &[]);
        assert_eq!(
            errors,
            vec!["Question 1 cannot be empty.", "Question 2 cannot be empty."]
        );
    }

    #[test]
    fn test_raw_image_payload_rules() {
        let schema = schema_of(&[QuestionType::Image, QuestionType::Image]);
        let answers = vec![
            Some(AnswerValue::Image(ImageAnswer::Raw {
                mime: "image/png".into(),
                bytes: vec![1, 2, 3],
            })),
            Some(AnswerValue::Image(ImageAnswer::Raw {
                mime: "application/pdf".into(),
                bytes: vec![1, 2, 3],
            })),
        ];
        let errors = ResponseValidator::validate(&schema, &answers);
        assert_eq!(errors[0], "");
        assert_eq!(errors[1], "Question 2 should have a valid image file.");
    }

    #[test]
    fn test_mismatched_variant_is_rejected() {
        let schema = schema_of(&[QuestionType::Date]);
        let errors =
            ResponseValidator::validate(&schema, &[Some(AnswerValue::Text("2024-01-01".into()))]);
        assert_eq!(errors, vec!["Question 1 has an answer of the wrong type."]);
    }
}
