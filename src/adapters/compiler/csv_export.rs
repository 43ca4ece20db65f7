//! Answers of one cycle as CSV. Uses the `csv` crate for quoting.
//!
//! Format: `Responder;Submitted;<question 1>;<question 2>;...` (semicolon-delimited).

use crate::domain::{AnswerValue, QuestionSchema, Response};
use crate::usecases::AnswerCodec;

/// Images are written as a placeholder; the data URL lives in the Markdown file.
const IMAGE_CELL: &str = "[image]";

pub fn responses_to_csv(
    schema: &QuestionSchema,
    responses: &[Response],
) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    let mut header = vec!["Responder".to_string(), "Submitted".to_string()];
    header.extend(schema.iter().map(|q| q.prompt.clone()));
    wtr.write_record(&header)?;

    for response in responses {
        let mut record = vec![
            response.responder_id.clone(),
            response.submitted_at.format("%Y-%m-%d %H:%M").to_string(),
        ];
        for position in 0..schema.question_count() {
            record.push(
                response
                    .answers
                    .get(position)
                    .map(cell)
                    .unwrap_or_default(),
            );
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

fn cell(answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Image(_) => IMAGE_CELL.to_string(),
        other => AnswerCodec::decode(other).replace('\n', " ").replace('\r', ""),
    }
}
