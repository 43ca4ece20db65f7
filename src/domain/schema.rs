//! Question schema: the ordered questions of a group.
//!
//! Indices stay dense (0..n) after every edit so that response positions keep
//! lining up with questions. Whether an edit is allowed at all (cycle closed) is
//! decided by `SchemaService`, not here.

use crate::domain::{DomainError, Question, QuestionType};
use serde::{Deserialize, Serialize};

/// Question as submitted by the group owner, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub prompt: String,
    pub hint: Option<String>,
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
}

impl QuestionDraft {
    pub fn new(prompt: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            prompt: prompt.into(),
            hint: None,
            question_type,
            options: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Trim text, dedupe options (first occurrence wins) and check the options rule.
    fn normalize(self) -> Result<NormalizedDraft, DomainError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(DomainError::InvalidQuestion(
                "question text cannot be empty".into(),
            ));
        }
        let hint = self
            .hint
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        let options = if self.question_type.is_multiple_option() {
            let mut cleaned: Vec<String> = Vec::new();
            for option in self.options.unwrap_or_default() {
                let option = option.trim();
                if !option.is_empty() && !cleaned.iter().any(|o| o == option) {
                    cleaned.push(option.to_string());
                }
            }
            if cleaned.is_empty() {
                return Err(DomainError::InvalidQuestion(format!(
                    "options not found for {} question \"{}\"",
                    self.question_type, prompt
                )));
            }
            Some(cleaned)
        } else {
            None
        };

        Ok(NormalizedDraft {
            prompt,
            hint,
            question_type: self.question_type,
            options,
        })
    }
}

struct NormalizedDraft {
    prompt: String,
    hint: Option<String>,
    question_type: QuestionType,
    options: Option<Vec<String>>,
}

impl NormalizedDraft {
    fn into_question(self, id: String, index: usize) -> Question {
        Question {
            id,
            index,
            prompt: self.prompt,
            hint: self.hint,
            question_type: self.question_type,
            options: self.options,
        }
    }
}

/// Ordered questions of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSchema {
    questions: Vec<Question>,
}

impl QuestionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from drafts in order.
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> Result<Self, DomainError> {
        let mut schema = Self::new();
        schema.replace_all(drafts)?;
        Ok(schema)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Add a question at the end. Returns its index.
    pub fn append(&mut self, draft: QuestionDraft) -> Result<usize, DomainError> {
        let normalized = draft.normalize()?;
        let index = self.questions.len();
        self.questions
            .push(normalized.into_question(new_question_id(), index));
        Ok(index)
    }

    /// Replace the question at `index`, keeping its id.
    pub fn update(&mut self, index: usize, draft: QuestionDraft) -> Result<(), DomainError> {
        let normalized = draft.normalize()?;
        let slot = self
            .questions
            .get_mut(index)
            .ok_or(DomainError::QuestionNotFound(index))?;
        let id = std::mem::take(&mut slot.id);
        *slot = normalized.into_question(id, index);
        Ok(())
    }

    /// Remove the question at `index`; later questions shift down by one.
    pub fn remove(&mut self, index: usize) -> Result<Question, DomainError> {
        if index >= self.questions.len() {
            return Err(DomainError::QuestionNotFound(index));
        }
        let removed = self.questions.remove(index);
        self.reindex();
        Ok(removed)
    }

    /// Replace every question. All drafts are checked before anything changes.
    pub fn replace_all(&mut self, drafts: Vec<QuestionDraft>) -> Result<(), DomainError> {
        let normalized = drafts
            .into_iter()
            .map(QuestionDraft::normalize)
            .collect::<Result<Vec<_>, _>>()?;
        self.questions = normalized
            .into_iter()
            .enumerate()
            .map(|(index, draft)| draft.into_question(new_question_id(), index))
            .collect();
        Ok(())
    }

    fn reindex(&mut self) {
        for (index, question) in self.questions.iter_mut().enumerate() {
            question.index = index;
        }
    }
}

impl<'a> IntoIterator for &'a QuestionSchema {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn new_question_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QuestionSchema {
        QuestionSchema::from_drafts(vec![
            QuestionDraft::new("What did you do this month?", QuestionType::Text),
            QuestionDraft::new("Best photo", QuestionType::Image),
            QuestionDraft::new("Mood", QuestionType::Dropdown).with_options(["Good", "Bad"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_indices_are_dense_after_remove() {
        let mut schema = sample();
        let removed = schema.remove(1).unwrap();
        assert_eq!(removed.prompt, "Best photo");
        assert_eq!(schema.question_count(), 2);
        let indices: Vec<usize> = schema.iter().map(|q| q.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(schema.get(1).unwrap().prompt, "Mood");
    }

    #[test]
    fn test_multiple_option_requires_options() {
        let mut schema = QuestionSchema::new();
        let err = schema
            .append(QuestionDraft::new("Pick", QuestionType::Checkbox))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuestion(_)));

        let err = schema
            .append(QuestionDraft::new("Pick", QuestionType::Checkbox).with_options(["  ", ""]))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuestion(_)));
        assert!(schema.is_empty());
    }

    #[test]
    fn test_options_normalized_and_dropped_for_plain_types() {
        let mut schema = QuestionSchema::new();
        schema
            .append(
                QuestionDraft::new(" Pick ", QuestionType::Checkbox)
                    .with_options(["A", " B", "A", ""]),
            )
            .unwrap();
        schema
            .append(QuestionDraft::new("When?", QuestionType::Date).with_options(["x"]))
            .unwrap();

        let pick = schema.get(0).unwrap();
        assert_eq!(pick.prompt, "Pick");
        assert_eq!(pick.options(), ["A".to_string(), "B".to_string()]);
        assert_eq!(schema.get(1).unwrap().options, None);
    }

    #[test]
    fn test_update_keeps_id_and_index() {
        let mut schema = sample();
        let id = schema.get(0).unwrap().id.clone();
        schema
            .update(0, QuestionDraft::new("Highlights?", QuestionType::Text).with_hint("short"))
            .unwrap();
        let q = schema.get(0).unwrap();
        assert_eq!(q.id, id);
        assert_eq!(q.index, 0);
        assert_eq!(q.hint.as_deref(), Some("short"));

        assert_eq!(
            schema.update(7, QuestionDraft::new("x", QuestionType::Text)),
            Err(DomainError::QuestionNotFound(7))
        );
    }

    #[test]
    fn test_replace_all_is_all_or_nothing() {
        let mut schema = sample();
        let before = schema.clone();
        let err = schema.replace_all(vec![
            QuestionDraft::new("ok", QuestionType::Text),
            QuestionDraft::new("", QuestionType::Text),
        ]);
        assert!(err.is_err());
        assert_eq!(schema, before);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let schema = sample();
        let first: Vec<_> = schema.iter().map(|q| q.index).collect();
        let second: Vec<_> = (&schema).into_iter().map(|q| q.index).collect();
        assert_eq!(first, second);
    }
}
