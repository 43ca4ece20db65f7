//! Answer encoding per question type, including the size-bounded image search.
//!
//! Images are downscaled to 800x600 and re-encoded as JPEG, starting at quality 90 and
//! stepping down by 10 until the estimated payload fits 2 MiB. The last rung is the
//! floor quality 5, which is accepted whatever its size, so the search always ends
//! after a fixed number of renders.

use crate::domain::{AnswerValue, EncodingError, ImageAnswer, Question, QuestionType, RawAnswer};
use crate::ports::ImageEncoder;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const START_QUALITY: u8 = 90;
pub const QUALITY_STEP: u8 = 10;
pub const QUALITY_FLOOR: u8 = 5;
pub const MAX_IMAGE_WIDTH: u32 = 800;
pub const MAX_IMAGE_HEIGHT: u32 = 600;
/// Budget for the decoded payload (2 MiB).
pub const IMAGE_BUDGET_BYTES: usize = 2 * 1024 * 1024;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Accepted result of the quality search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_url: String,
    pub quality: u8,
    pub estimated_bytes: usize,
    pub attempts: usize,
}

impl EncodedImage {
    pub fn within_budget(&self) -> bool {
        self.estimated_bytes <= IMAGE_BUDGET_BYTES
    }
}

/// Qualities tried in order: 90, 80, ..., 10, then the floor.
pub fn quality_ladder() -> Vec<u8> {
    let mut ladder: Vec<u8> = (QUALITY_FLOOR + 1..=START_QUALITY)
        .rev()
        .step_by(usize::from(QUALITY_STEP))
        .collect();
    ladder.push(QUALITY_FLOOR);
    ladder
}

/// Decoded size of a base64 string, as bytes.
fn estimated_bytes(data_url: &str) -> usize {
    data_url.len() * 3 / 4
}

#[derive(Clone)]
pub struct AnswerCodec {
    images: Arc<dyn ImageEncoder>,
}

impl AnswerCodec {
    pub fn new(images: Arc<dyn ImageEncoder>) -> Self {
        Self { images }
    }

    /// Encode a raw input for `question`. `Absent` yields `None`; emptiness is left
    /// to the validator.
    pub fn encode(
        &self,
        question: &Question,
        raw: RawAnswer,
    ) -> Result<Option<AnswerValue>, EncodingError> {
        let value = match (question.question_type, raw) {
            (_, RawAnswer::Absent) => return Ok(None),
            (QuestionType::Text, RawAnswer::Text(s)) => AnswerValue::Text(s.trim().to_string()),
            (QuestionType::Date, RawAnswer::Text(s)) => AnswerValue::Date(s.trim().to_string()),
            (QuestionType::Time, RawAnswer::Text(s)) => AnswerValue::Time(s.trim().to_string()),
            (QuestionType::Dropdown, RawAnswer::Text(s)) => {
                AnswerValue::Dropdown(s.trim().to_string())
            }
            (QuestionType::Checkbox, RawAnswer::Choices(choices)) => {
                let mut selected = BTreeSet::new();
                for choice in choices {
                    let choice = choice.trim();
                    if !question.has_option(choice) {
                        return Err(EncodingError::UnknownOption(choice.to_string()));
                    }
                    selected.insert(choice.to_string());
                }
                AnswerValue::Checkbox(selected)
            }
            (QuestionType::Image, RawAnswer::Image { mime, bytes }) => {
                if !mime.starts_with("image/") {
                    return Err(EncodingError::UnreadableImage(format!(
                        "{mime} is not an image type"
                    )));
                }
                let encoded = self.encode_image(&bytes)?;
                AnswerValue::Image(ImageAnswer::Encoded(encoded.data_url))
            }
            (expected, raw) => {
                return Err(EncodingError::TypeMismatch {
                    expected: expected.as_str(),
                    found: raw.kind(),
                });
            }
        };
        Ok(Some(value))
    }

    /// Run the bounded quality search over `image`.
    pub fn encode_image(&self, image: &[u8]) -> Result<EncodedImage, EncodingError> {
        let mut last = None;
        for (attempt, quality) in quality_ladder().into_iter().enumerate() {
            let payload =
                self.images
                    .render_jpeg(image, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, quality)?;
            let data_url = format!("{JPEG_DATA_URL_PREFIX}{payload}");
            let encoded = EncodedImage {
                estimated_bytes: estimated_bytes(&data_url),
                data_url,
                quality,
                attempts: attempt + 1,
            };
            debug!(
                quality,
                bytes = encoded.estimated_bytes,
                "image render attempt"
            );
            if encoded.within_budget() {
                info!(
                    quality,
                    bytes = encoded.estimated_bytes,
                    attempts = encoded.attempts,
                    "image encoded within budget"
                );
                return Ok(encoded);
            }
            last = Some(encoded);
        }

        // Floor render is accepted as is.
        let encoded = last.ok_or_else(|| EncodingError::UnreadableImage("no render".into()))?;
        warn!(
            quality = encoded.quality,
            bytes = encoded.estimated_bytes,
            "image still over budget at floor quality; accepting"
        );
        Ok(encoded)
    }

    /// Display form of an answer. No re-validation.
    pub fn decode(answer: &AnswerValue) -> String {
        match answer {
            AnswerValue::Text(s)
            | AnswerValue::Date(s)
            | AnswerValue::Time(s)
            | AnswerValue::Dropdown(s) => s.clone(),
            AnswerValue::Checkbox(selected) => selected
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            AnswerValue::Image(ImageAnswer::Encoded(data_url)) => data_url.clone(),
            AnswerValue::Image(ImageAnswer::Raw { mime, bytes }) => {
                format!("data:{mime};base64,{}", STANDARD.encode(bytes))
            }
        }
    }
}
