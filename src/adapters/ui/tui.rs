//! Implements InputPort. Inquire-based interactive menu.
//!
//! Every outcome is printed from the value (or error) returned by the use cases.

use crate::adapters::ui::progress::with_spinner;
use crate::domain::{DomainError, Question, QuestionDraft, QuestionType, RawAnswer};
use crate::ports::InputPort;
use crate::usecases::{
    CollectionStatus, QuestionnaireService, ReleaseCycleEngine, SchemaService,
};
use async_trait::async_trait;
use crossterm::style::Stylize;
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::{Confirm, InquireError, MultiSelect, Select, Text};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

const NEON_PURPLE: Color = Color::Rgb {
    r: 0xbc,
    g: 0x13,
    b: 0xfe,
};
const CYBER_GREEN: Color = Color::Rgb {
    r: 0x0f,
    g: 0xf0,
    b: 0xfc,
};

/// Neon theme for every inquire prompt.
pub fn apply_theme() {
    let mut config = RenderConfig::default();
    config.prompt_prefix = Styled::new("◆").with_fg(NEON_PURPLE);
    config.answered_prompt_prefix = Styled::new("✔").with_fg(CYBER_GREEN);
    config.highlighted_option_prefix = Styled::new("➤").with_fg(CYBER_GREEN);
    config.selected_checkbox = Styled::new("[x]").with_fg(CYBER_GREEN);
    config.unselected_checkbox = Styled::new("[ ]");
    config.answer = StyleSheet::new().with_fg(CYBER_GREEN);
    config.help_message = StyleSheet::new().with_fg(NEON_PURPLE);
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    EditQuestions,
    Release,
    Fill,
    Status,
    Generate,
    Archive,
    SwitchGroup,
    Quit,
}

impl MenuItem {
    const ALL: [MenuItem; 8] = [
        MenuItem::EditQuestions,
        MenuItem::Release,
        MenuItem::Fill,
        MenuItem::Status,
        MenuItem::Generate,
        MenuItem::Archive,
        MenuItem::SwitchGroup,
        MenuItem::Quit,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuItem::EditQuestions => "Edit questions",
            MenuItem::Release => "Release questions",
            MenuItem::Fill => "Fill the questionnaire",
            MenuItem::Status => "Response status & reminders",
            MenuItem::Generate => "Generate newsletter",
            MenuItem::Archive => "Past newsletters",
            MenuItem::SwitchGroup => "Switch group",
            MenuItem::Quit => "Quit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditItem {
    Add,
    Change,
    Remove,
    Back,
}

impl fmt::Display for EditItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EditItem::Add => "Add a question",
            EditItem::Change => "Change a question",
            EditItem::Remove => "Remove a question",
            EditItem::Back => "Back",
        })
    }
}

/// Esc -> `None`; Ctrl-C and I/O failures -> `DomainError::Input`.
fn ask<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(DomainError::Input(e.to_string())),
    }
}

fn question_label(q: &Question) -> String {
    format!("{}. [{}] {}", q.index + 1, q.question_type, q.prompt)
}

fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

fn print_ok(message: &str) {
    println!("{}", message.green());
}

fn print_error(error: &DomainError) {
    match error.validation_messages() {
        Some(messages) => {
            println!("{}", "There are error(s) in the response:".red());
            for message in messages.iter().filter(|m| !m.is_empty()) {
                println!("  {}", message.as_str().red());
            }
        }
        None => println!("{}", error.to_string().red()),
    }
}

fn print_status(status: &CollectionStatus, reminders: &[String]) {
    println!(
        "Group {} | cycle #{} | {}",
        status.group_id, status.cycle_number, status.state
    );
    if status.cycle_number == 0 {
        println!("No questions have been released yet.");
        return;
    }
    println!(
        "Responses: {}/{} ({:.0}%)",
        status.received,
        status.expected,
        status.completion_ratio * 100.0
    );
    if !reminders.is_empty() {
        println!("Waiting on (send reminders to):");
        for responder in reminders {
            println!("  - {}", responder);
        }
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    groups: Vec<String>,
    schemas: Arc<SchemaService>,
    engine: Arc<ReleaseCycleEngine>,
    questionnaire: Arc<QuestionnaireService>,
}

impl TuiInputPort {
    /// `groups` are offered for selection; when empty, the group id is typed in.
    pub fn new(
        groups: Vec<String>,
        schemas: Arc<SchemaService>,
        engine: Arc<ReleaseCycleEngine>,
        questionnaire: Arc<QuestionnaireService>,
    ) -> Self {
        Self {
            groups,
            schemas,
            engine,
            questionnaire,
        }
    }

    fn choose_group(&self) -> Result<Option<String>, DomainError> {
        if self.groups.is_empty() {
            let id = ask(Text::new("Group id:").prompt())?;
            return Ok(id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
        }
        ask(Select::new("Group:", self.groups.clone()).prompt())
    }

    async fn dispatch(&self, group_id: &str, item: MenuItem) -> Result<(), DomainError> {
        match item {
            MenuItem::EditQuestions => self.edit_questions(group_id).await,
            MenuItem::Release => {
                let cycle = self.engine.open_for_responses(group_id).await?;
                print_ok(&format!(
                    "Questions released (cycle #{}); waiting on {} member(s).",
                    cycle.cycle_number,
                    cycle.collection.expected_count()
                ));
                Ok(())
            }
            MenuItem::Fill => self.fill(group_id).await,
            MenuItem::Status => {
                let status = self.engine.collection_status(group_id).await?;
                let reminders = self.engine.reminder_targets(group_id).await?;
                print_status(&status, &reminders);
                let gate = self.engine.release_gate(group_id).await?;
                if !gate.can_release {
                    println!("Next release can happen only after {} days.", gate.days_left);
                }
                Ok(())
            }
            MenuItem::Generate => {
                let newsletter = with_spinner(
                    "Compiling newsletter...",
                    self.engine.generate_newsletter(group_id),
                )
                .await?;
                print_ok(&format!("Generated \"{}\".", newsletter.title));
                if let Some(location) = &newsletter.location {
                    println!("Saved to {}", location);
                }
                Ok(())
            }
            MenuItem::Archive => {
                let newsletters = self.engine.newsletters(group_id).await?;
                if newsletters.is_empty() {
                    println!("No newsletters yet.");
                }
                for n in newsletters {
                    println!(
                        "#{} {} ({}){}",
                        n.cycle_number,
                        n.title,
                        n.generated_at.format("%Y-%m-%d"),
                        n.location.map(|l| format!(" -> {}", l)).unwrap_or_default()
                    );
                }
                Ok(())
            }
            MenuItem::SwitchGroup | MenuItem::Quit => Ok(()),
        }
    }

    async fn edit_questions(&self, group_id: &str) -> Result<(), DomainError> {
        loop {
            let schema = self.schemas.schema(group_id).await?;
            if schema.is_empty() {
                println!("No questions yet.");
            }
            for question in &schema {
                println!("  {}", question_label(question));
            }

            let items = vec![EditItem::Add, EditItem::Change, EditItem::Remove, EditItem::Back];
            let Some(item) = ask(Select::new("Questions:", items).prompt())? else {
                return Ok(());
            };
            let result = match item {
                EditItem::Back => return Ok(()),
                EditItem::Add => match self.prompt_draft(None)? {
                    Some(draft) => self.schemas.append_question(group_id, draft).await.map(|_| ()),
                    None => Ok(()),
                },
                EditItem::Change => {
                    let Some(question) = Self::pick_question(schema.questions())? else {
                        continue;
                    };
                    match self.prompt_draft(Some(&question))? {
                        Some(draft) => self
                            .schemas
                            .update_question(group_id, question.index, draft)
                            .await
                            .map(|_| ()),
                        None => Ok(()),
                    }
                }
                EditItem::Remove => {
                    let Some(question) = Self::pick_question(schema.questions())? else {
                        continue;
                    };
                    let confirmed = ask(Confirm::new(&format!("Remove \"{}\"?", question.prompt))
                        .with_default(false)
                        .prompt())?
                    .unwrap_or(false);
                    if confirmed {
                        self.schemas
                            .remove_question(group_id, question.index)
                            .await
                            .map(|_| ())
                    } else {
                        Ok(())
                    }
                }
            };
            if let Err(e) = result {
                if matches!(e, DomainError::Input(_)) {
                    return Err(e);
                }
                print_error(&e);
            }
        }
    }

    fn pick_question(questions: &[Question]) -> Result<Option<Question>, DomainError> {
        if questions.is_empty() {
            return Ok(None);
        }
        let labels: Vec<String> = questions.iter().map(question_label).collect();
        let Some(choice) = ask(Select::new("Which question?", labels.clone()).prompt())? else {
            return Ok(None);
        };
        Ok(labels
            .iter()
            .position(|l| *l == choice)
            .and_then(|i| questions.get(i).cloned()))
    }

    fn prompt_draft(&self, current: Option<&Question>) -> Result<Option<QuestionDraft>, DomainError> {
        let mut prompt = Text::new("Question:");
        if let Some(q) = current {
            prompt = prompt.with_initial_value(&q.prompt);
        }
        let Some(text) = ask(prompt.prompt())? else {
            return Ok(None);
        };

        let mut types = Select::new("Type:", QuestionType::ALL.to_vec());
        if let Some(q) = current {
            let start = QuestionType::ALL
                .iter()
                .position(|t| *t == q.question_type)
                .unwrap_or(0);
            types = types.with_starting_cursor(start);
        }
        let Some(question_type) = ask(types.prompt())? else {
            return Ok(None);
        };

        let current_hint = current.and_then(|q| q.hint.clone()).unwrap_or_default();
        let hint = ask(Text::new("Hint (optional):")
            .with_initial_value(&current_hint)
            .prompt())?
        .unwrap_or_default();

        let mut draft = QuestionDraft::new(text, question_type);
        if !hint.trim().is_empty() {
            draft = draft.with_hint(hint);
        }
        if question_type.is_multiple_option() {
            let current_options = current.map(|q| q.options().join(", ")).unwrap_or_default();
            let Some(options) = ask(Text::new("Options (comma separated):")
                .with_initial_value(&current_options)
                .prompt())?
            else {
                return Ok(None);
            };
            draft = draft.with_options(options.split(','));
        }
        Ok(Some(draft))
    }

    async fn fill(&self, group_id: &str) -> Result<(), DomainError> {
        let Some(responder) = ask(Text::new("Your email address:").prompt())? else {
            return Ok(());
        };
        let responder = responder.trim().to_string();
        let form = self.questionnaire.questionnaire(group_id, &responder).await?;
        if !form.accepting_responses() {
            println!("Questions are not released for this group right now.");
            return Ok(());
        }
        if form.already_taken {
            println!("You have already answered this cycle's questions.");
            return Ok(());
        }

        let mut answers = Vec::with_capacity(form.questions.question_count());
        for question in &form.questions {
            answers.push(Self::prompt_answer(question).await?);
        }

        let receipt = with_spinner(
            "Submitting...",
            self.questionnaire.submit(group_id, &responder, answers),
        )
        .await?;
        print_ok(receipt.message());
        Ok(())
    }

    /// Esc skips the question; the validator reports it.
    async fn prompt_answer(question: &Question) -> Result<RawAnswer, DomainError> {
        let label = format!("{}. {}", question.index + 1, question.prompt);
        let hint = question.hint.as_deref();
        let answer = match question.question_type {
            QuestionType::Text | QuestionType::Date | QuestionType::Time => {
                let default_help = match question.question_type {
                    QuestionType::Date => "YYYY-MM-DD",
                    QuestionType::Time => "HH:MM",
                    _ => "",
                };
                let help = hint.unwrap_or(default_help);
                let mut prompt = Text::new(&label);
                if !help.is_empty() {
                    prompt = prompt.with_help_message(help);
                }
                ask(prompt.prompt())?.map(RawAnswer::Text)
            }
            QuestionType::Dropdown => {
                let mut prompt = Select::new(&label, question.options().to_vec());
                if let Some(h) = hint {
                    prompt = prompt.with_help_message(h);
                }
                ask(prompt.prompt())?.map(RawAnswer::Text)
            }
            QuestionType::Checkbox => {
                let mut prompt = MultiSelect::new(&label, question.options().to_vec());
                if let Some(h) = hint {
                    prompt = prompt.with_help_message(h);
                }
                ask(prompt.prompt())?.map(RawAnswer::Choices)
            }
            QuestionType::Image => {
                let help = hint.unwrap_or("Path to an image file");
                match ask(Text::new(&label).with_help_message(help).prompt())? {
                    Some(path) if !path.trim().is_empty() => {
                        let path = Path::new(path.trim());
                        match tokio::fs::read(path).await {
                            Ok(bytes) => Some(RawAnswer::Image {
                                mime: mime_from_path(path).to_string(),
                                bytes,
                            }),
                            Err(e) => {
                                warn!(path = %path.display(), error = %e, "cannot read image");
                                None
                            }
                        }
                    }
                    _ => None,
                }
            }
        };
        Ok(answer.unwrap_or(RawAnswer::Absent))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let Some(mut group_id) = self.choose_group()? else {
            return Ok(());
        };
        loop {
            let title = format!("[{}] What next?", group_id);
            let Some(item) = ask(Select::new(&title, MenuItem::ALL.to_vec()).prompt())? else {
                continue;
            };
            match item {
                MenuItem::Quit => return Ok(()),
                MenuItem::SwitchGroup => {
                    if let Some(next) = self.choose_group()? {
                        group_id = next;
                    }
                }
                other => match self.dispatch(&group_id, other).await {
                    Ok(()) => {}
                    Err(DomainError::Input(message)) => {
                        warn!(error = %message, "input closed");
                        return Ok(());
                    }
                    Err(e) => print_error(&e),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("cat.png")), "image/png");
        assert_eq!(
            mime_from_path(Path::new("notes.txt")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        assert_eq!(ask::<String>(Err(InquireError::OperationCanceled)), Ok(None));
        assert!(matches!(
            ask::<String>(Err(InquireError::OperationInterrupted)),
            Err(DomainError::Input(_))
        ));
    }

    #[test]
    fn test_question_label() {
        let q = Question {
            id: "q1".into(),
            index: 2,
            prompt: "Photo of the month".into(),
            hint: None,
            question_type: QuestionType::Image,
            options: None,
        };
        assert_eq!(question_label(&q), "3. [IMAGE] Photo of the month");
    }
}
