//! Question editing for a group. Only allowed while no collection window is open.

use crate::domain::{DomainError, Question, QuestionDraft, QuestionSchema, ReleaseCycle};
use crate::ports::CycleStore;
use crate::usecases::group_locks::GroupLocks;
use std::sync::Arc;
use tracing::info;

pub struct SchemaService {
    store: Arc<dyn CycleStore>,
    locks: Arc<GroupLocks>,
}

impl SchemaService {
    pub fn new(store: Arc<dyn CycleStore>, locks: Arc<GroupLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn schema(&self, group_id: &str) -> Result<QuestionSchema, DomainError> {
        self.store.load_schema(group_id).await
    }

    pub async fn append_question(
        &self,
        group_id: &str,
        draft: QuestionDraft,
    ) -> Result<QuestionSchema, DomainError> {
        self.edit(group_id, |schema| schema.append(draft).map(|_| ()))
            .await
    }

    pub async fn update_question(
        &self,
        group_id: &str,
        index: usize,
        draft: QuestionDraft,
    ) -> Result<QuestionSchema, DomainError> {
        self.edit(group_id, |schema| schema.update(index, draft))
            .await
    }

    pub async fn remove_question(
        &self,
        group_id: &str,
        index: usize,
    ) -> Result<QuestionSchema, DomainError> {
        self.edit(group_id, |schema| schema.remove(index).map(|_: Question| ()))
            .await
    }

    /// Replace all questions at once.
    pub async fn replace_questions(
        &self,
        group_id: &str,
        drafts: Vec<QuestionDraft>,
    ) -> Result<QuestionSchema, DomainError> {
        self.edit(group_id, |schema| schema.replace_all(drafts))
            .await
    }

    async fn edit<F>(&self, group_id: &str, change: F) -> Result<QuestionSchema, DomainError>
    where
        F: FnOnce(&mut QuestionSchema) -> Result<(), DomainError>,
    {
        let _guard = self.locks.lock(group_id).await;
        let locked = self
            .store
            .load_cycle(group_id)
            .await?
            .as_ref()
            .is_some_and(ReleaseCycle::accepting_responses);
        if locked {
            return Err(DomainError::SchemaLocked);
        }

        let mut schema = self.store.load_schema(group_id).await?;
        change(&mut schema)?;
        self.store.save_schema(group_id, &schema).await?;
        info!(
            group_id,
            questions = schema.question_count(),
            "questions updated"
        );
        Ok(schema)
    }
}
