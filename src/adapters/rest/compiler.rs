//! Newsletter compilation delegated to `POST /api/newsletter/compile`.

use crate::adapters::rest::envelope::ApiClient;
use crate::domain::{CompiledNewsletter, DomainError, QuestionSchema, ReleaseCycle, Response};
use crate::ports::NewsletterCompiler;
use crate::usecases::AnswerCodec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileRequest<'a> {
    group_id: &'a str,
    cycle_number: u32,
    questions: Vec<&'a str>,
    responses: Vec<CompileResponse<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompileResponse<'a> {
    user_email_address: &'a str,
    answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompiledBody {
    title: String,
    body: String,
    #[serde(default)]
    url: Option<String>,
}

pub struct RestCompiler {
    api: ApiClient,
}

impl RestCompiler {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn request<'a>(
    cycle: &'a ReleaseCycle,
    schema: &'a QuestionSchema,
    responses: &'a [Response],
) -> CompileRequest<'a> {
    CompileRequest {
        group_id: &cycle.group_id,
        cycle_number: cycle.cycle_number,
        questions: schema.iter().map(|q| q.prompt.as_str()).collect(),
        responses: responses
            .iter()
            .map(|r| CompileResponse {
                user_email_address: &r.responder_id,
                answers: r.answers.iter().map(AnswerCodec::decode).collect(),
            })
            .collect(),
    }
}

#[async_trait::async_trait]
impl NewsletterCompiler for RestCompiler {
    async fn compile(
        &self,
        cycle: &ReleaseCycle,
        schema: &QuestionSchema,
        responses: &[Response],
        generated_at: DateTime<Utc>,
    ) -> Result<CompiledNewsletter, DomainError> {
        let compiled: CompiledBody = self
            .api
            .post(
                &["api", "newsletter", "compile"],
                &request(cycle, schema, responses),
            )
            .await
            .map_err(DomainError::compiler)?;
        info!(
            group_id = %cycle.group_id,
            cycle = cycle.cycle_number,
            responses = responses.len(),
            "newsletter compiled remotely"
        );
        Ok(CompiledNewsletter {
            group_id: cycle.group_id.clone(),
            cycle_number: cycle.cycle_number,
            title: compiled.title,
            body: compiled.body,
            location: compiled.url,
            generated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnswerValue, QuestionDraft, QuestionType};
    use std::collections::BTreeSet;

    #[test]
    fn test_request_shape() {
        let mut cycle = ReleaseCycle::new("g1", 30);
        cycle.open(["ann"]).unwrap();
        let schema = QuestionSchema::from_drafts(vec![
            QuestionDraft::new("News?", QuestionType::Text),
            QuestionDraft::new("Pick", QuestionType::Checkbox).with_options(["A", "B"]),
        ])
        .unwrap();
        let responses = vec![Response {
            responder_id: "ann".into(),
            group_id: "g1".into(),
            cycle_number: 1,
            answers: vec![
                AnswerValue::Text("Moved".into()),
                AnswerValue::Checkbox(BTreeSet::from(["A".to_string(), "B".to_string()])),
            ],
            submitted_at: Utc::now(),
        }];

        let json = serde_json::to_value(request(&cycle, &schema, &responses)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "groupId": "g1",
                "cycleNumber": 1,
                "questions": ["News?", "Pick"],
                "responses": [{"userEmailAddress": "ann", "answers": ["Moved", "A, B"]}]
            })
        );
    }

    #[test]
    fn test_compiled_body_url_is_optional() {
        let body: CompiledBody =
            serde_json::from_str(r##"{"title": "June", "body": "# June"}"##).unwrap();
        assert_eq!(body.url, None);
    }
}
