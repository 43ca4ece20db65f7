//! Local newsletter compiler: one Markdown file per cycle plus a CSV of all answers.

use crate::adapters::compiler::csv_export::responses_to_csv;
use crate::domain::{
    AnswerValue, CompiledNewsletter, DomainError, ImageAnswer, QuestionSchema, ReleaseCycle,
    Response,
};
use crate::ports::NewsletterCompiler;
use crate::usecases::AnswerCodec;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

pub struct MarkdownCompiler {
    output_dir: PathBuf,
}

impl MarkdownCompiler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn title(cycle: &ReleaseCycle) -> String {
        format!("{} Newsletter #{}", cycle.group_id, cycle.cycle_number)
    }

    fn render(
        cycle: &ReleaseCycle,
        schema: &QuestionSchema,
        responses: &[Response],
        generated_at: DateTime<Utc>,
    ) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", Self::title(cycle)));
        md.push_str(&format!(
            "**Responses:** {} of {} | **Generated:** {}\n\n",
            responses.len(),
            cycle.collection.expected_count(),
            generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        md.push_str("---\n\n");

        for question in schema {
            md.push_str(&format!("## {}. {}\n\n", question.index + 1, question.prompt));
            let mut answered = false;
            for response in responses {
                let Some(answer) = response.answers.get(question.index) else {
                    continue;
                };
                answered = true;
                match answer {
                    AnswerValue::Image(ImageAnswer::Encoded(url)) => {
                        md.push_str(&format!(
                            "**{}**\n\n![{}]({})\n\n",
                            response.responder_id, response.responder_id, url
                        ));
                    }
                    other => {
                        md.push_str(&format!(
                            "- **{}**: {}\n",
                            response.responder_id,
                            AnswerCodec::decode(other)
                        ));
                    }
                }
            }
            if !answered {
                md.push_str("*No answers.*\n");
            }
            md.push('\n');
        }

        md.push_str("---\n");
        md
    }
}

/// `<group>_cycle<n>` with every character outside `[A-Za-z0-9_-]` replaced by `_`.
fn file_stem(group_id: &str, cycle_number: u32) -> String {
    let group: String = group_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_cycle{}", group, cycle_number)
}

#[async_trait::async_trait]
impl NewsletterCompiler for MarkdownCompiler {
    async fn compile(
        &self,
        cycle: &ReleaseCycle,
        schema: &QuestionSchema,
        responses: &[Response],
        generated_at: DateTime<Utc>,
    ) -> Result<CompiledNewsletter, DomainError> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| DomainError::compiler(format!("create newsletter dir: {}", e)))?;

        let body = Self::render(cycle, schema, responses, generated_at);
        let stem = file_stem(&cycle.group_id, cycle.cycle_number);
        let md_path = self.output_dir.join(format!("{}.md", stem));
        let csv_path = self.output_dir.join(format!("{}.csv", stem));

        let csv = responses_to_csv(schema, responses)
            .map_err(|e| DomainError::compiler(format!("CSV export failed: {}", e)))?;
        fs::write(&md_path, &body)
            .await
            .map_err(|e| DomainError::compiler(format!("Failed to write newsletter: {}", e)))?;
        fs::write(&csv_path, csv)
            .await
            .map_err(|e| DomainError::compiler(format!("Failed to write CSV: {}", e)))?;

        info!(path = %md_path.display(), responses = responses.len(), "newsletter written");

        Ok(CompiledNewsletter {
            group_id: cycle.group_id.clone(),
            cycle_number: cycle.cycle_number,
            title: Self::title(cycle),
            body,
            location: Some(md_path.display().to_string()),
            generated_at,
        })
    }
}
