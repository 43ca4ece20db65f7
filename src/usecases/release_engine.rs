//! Release cycle engine: release questions -> collect responses -> generate newsletter.
//!
//! - Every transition of a group runs under that group's lock
//! - Candidate state is built on a copy and written with one store call, so a failed
//!   or abandoned call leaves the stored cycle untouched
//! - A compiler failure leaves the cycle open; the caller can retry

use crate::domain::{
    AnswerValue, CompiledNewsletter, CycleState, DomainError, ReleaseCycle, ReleaseGate,
    Response, ResponseValidator,
};
use crate::ports::{Clock, CycleStore, MembershipProvider, NewsletterCompiler};
use crate::usecases::group_locks::GroupLocks;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub cycle_number: u32,
    pub state: CycleState,
    pub received: usize,
    pub expected: usize,
    pub completion_ratio: f64,
}

impl SubmissionReceipt {
    pub fn message(&self) -> &'static str {
        match self.state {
            CycleState::Collected => {
                "Response saved successfully, everyone has responded and the newsletter can be generated"
            }
            _ => {
                "Response saved successfully, newsletter will be generated as soon as responses are collected from everyone"
            }
        }
    }
}

/// Snapshot of a group's collection window, for status and reminder screens.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStatus {
    pub group_id: String,
    pub cycle_number: u32,
    pub state: CycleState,
    pub accepting_responses: bool,
    pub received: usize,
    pub expected: usize,
    pub completion_ratio: f64,
    /// Expected responders without a response, in membership order.
    pub outstanding: Vec<String>,
}

pub struct ReleaseCycleEngine {
    store: Arc<dyn CycleStore>,
    members: Arc<dyn MembershipProvider>,
    compiler: Arc<dyn NewsletterCompiler>,
    clock: Arc<dyn Clock>,
    locks: Arc<GroupLocks>,
    min_interval_days: u32,
}

impl ReleaseCycleEngine {
    pub fn new(
        store: Arc<dyn CycleStore>,
        members: Arc<dyn MembershipProvider>,
        compiler: Arc<dyn NewsletterCompiler>,
        clock: Arc<dyn Clock>,
        locks: Arc<GroupLocks>,
        min_interval_days: u32,
    ) -> Self {
        Self {
            store,
            members,
            compiler,
            clock,
            locks,
            min_interval_days,
        }
    }

    /// Stored cycle of the group, or a fresh closed one.
    pub async fn cycle(&self, group_id: &str) -> Result<ReleaseCycle, DomainError> {
        Ok(self
            .store
            .load_cycle(group_id)
            .await?
            .unwrap_or_else(|| ReleaseCycle::new(group_id, self.min_interval_days)))
    }

    /// CLOSED -> OPEN. Expected responders are the group's members at this moment.
    pub async fn open_for_responses(&self, group_id: &str) -> Result<ReleaseCycle, DomainError> {
        let _guard = self.locks.lock(group_id).await;
        let cycle = self.cycle(group_id).await?;
        if cycle.state != CycleState::Closed {
            return Err(DomainError::AlreadyOpen);
        }
        let schema = self.store.load_schema(group_id).await?;
        if schema.is_empty() {
            return Err(DomainError::EmptySchema);
        }
        let members = self
            .members
            .list_members(group_id)
            .await
            .map_err(as_membership_error)?;

        let mut next = cycle;
        next.open(members)?;
        self.store.save_cycle(&next).await?;
        info!(
            group_id,
            cycle = next.cycle_number,
            expected = next.collection.expected_count(),
            questions = schema.question_count(),
            "questions released"
        );
        Ok(next)
    }

    /// Cheap pre-check before encoding answers. Not a reservation: `accept_submission`
    /// checks again under the lock.
    pub async fn ensure_accepting(
        &self,
        group_id: &str,
        responder_id: &str,
    ) -> Result<(), DomainError> {
        self.cycle(group_id).await?.ensure_accepting(responder_id)
    }

    /// Validate and record one responder's answers for the open cycle.
    pub async fn accept_submission(
        &self,
        group_id: &str,
        responder_id: &str,
        answers: Vec<Option<AnswerValue>>,
    ) -> Result<SubmissionReceipt, DomainError> {
        let _guard = self.locks.lock(group_id).await;
        let cycle = self.cycle(group_id).await?;
        cycle.ensure_accepting(responder_id)?;

        let schema = self.store.load_schema(group_id).await?;
        if answers.len() > schema.question_count() {
            return Err(DomainError::AnswerCount {
                expected: schema.question_count(),
                actual: answers.len(),
            });
        }
        let errors = ResponseValidator::validate(&schema, &answers);
        if !ResponseValidator::is_clean(&errors) {
            return Err(DomainError::Validation(errors));
        }
        let actual = answers.len();
        let answers: Vec<AnswerValue> =
            answers
                .into_iter()
                .collect::<Option<_>>()
                .ok_or(DomainError::AnswerCount {
                    expected: schema.question_count(),
                    actual,
                })?;

        let mut next = cycle;
        let state = next.accept(responder_id)?;
        let response = Response {
            responder_id: responder_id.to_string(),
            group_id: group_id.to_string(),
            cycle_number: next.cycle_number,
            answers,
            submitted_at: self.clock.now(),
        };
        self.store.commit_submission(&next, &response).await?;

        let receipt = SubmissionReceipt {
            cycle_number: next.cycle_number,
            state,
            received: next.collection.received_count(),
            expected: next.collection.expected_count(),
            completion_ratio: next.collection.completion_ratio(),
        };
        info!(
            group_id,
            responder_id,
            cycle = receipt.cycle_number,
            state = %receipt.state,
            received = receipt.received,
            expected = receipt.expected,
            "response accepted"
        );
        Ok(receipt)
    }

    /// Compile the newsletter and close the cycle. One-shot per cycle.
    pub async fn generate_newsletter(
        &self,
        group_id: &str,
    ) -> Result<CompiledNewsletter, DomainError> {
        let _guard = self.locks.lock(group_id).await;
        let cycle = self.cycle(group_id).await?;
        let now = self.clock.now();
        cycle.ensure_can_release(now)?;

        let schema = self.store.load_schema(group_id).await?;
        let responses = self
            .store
            .load_responses(group_id, cycle.cycle_number)
            .await?;
        info!(
            group_id,
            cycle = cycle.cycle_number,
            responses = responses.len(),
            "compiling newsletter"
        );
        let newsletter = match self.compiler.compile(&cycle, &schema, &responses, now).await {
            Ok(newsletter) => newsletter,
            Err(e) => {
                let e = as_compiler_error(e);
                warn!(group_id, cycle = cycle.cycle_number, error = %e, "newsletter compile failed; cycle left open");
                return Err(e);
            }
        };

        let mut next = cycle;
        next.finalize(now)?;
        self.store.commit_release(&next, &newsletter).await?;
        info!(
            group_id,
            cycle = next.cycle_number,
            location = newsletter.location.as_deref().unwrap_or("-"),
            "newsletter generated"
        );
        Ok(newsletter)
    }

    pub async fn release_gate(&self, group_id: &str) -> Result<ReleaseGate, DomainError> {
        Ok(self.cycle(group_id).await?.release_gate(self.clock.now()))
    }

    pub async fn collection_status(&self, group_id: &str) -> Result<CollectionStatus, DomainError> {
        let cycle = self.cycle(group_id).await?;
        let collection = &cycle.collection;
        Ok(CollectionStatus {
            group_id: cycle.group_id.clone(),
            cycle_number: cycle.cycle_number,
            state: cycle.state,
            accepting_responses: cycle.accepting_responses(),
            received: collection.received_count(),
            expected: collection.expected_count(),
            completion_ratio: collection.completion_ratio(),
            outstanding: collection.outstanding_responders(),
        })
    }

    /// Who should get a reminder. Empty when no collection window is open.
    pub async fn reminder_targets(&self, group_id: &str) -> Result<Vec<String>, DomainError> {
        let cycle = self.cycle(group_id).await?;
        if !cycle.accepting_responses() {
            return Ok(Vec::new());
        }
        Ok(cycle.collection.outstanding_responders())
    }

    /// Whether the responder already answered the current collection window.
    pub async fn has_responded(
        &self,
        group_id: &str,
        responder_id: &str,
    ) -> Result<bool, DomainError> {
        let cycle = self.cycle(group_id).await?;
        Ok(cycle.accepting_responses() && cycle.collection.has_responded(responder_id))
    }

    /// Responses of the group's latest cycle.
    pub async fn responses(&self, group_id: &str) -> Result<Vec<Response>, DomainError> {
        let cycle = self.cycle(group_id).await?;
        self.store
            .load_responses(group_id, cycle.cycle_number)
            .await
    }

    pub async fn newsletters(&self, group_id: &str) -> Result<Vec<CompiledNewsletter>, DomainError> {
        self.store.load_newsletters(group_id).await
    }
}

fn as_membership_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Collaborator(_) => e,
        other => DomainError::membership(other.to_string()),
    }
}

fn as_compiler_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Collaborator(_) => e,
        other => DomainError::compiler(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CollaboratorError, QuestionDraft, QuestionSchema, QuestionType};
    use crate::usecases::testing::Harness;
    use chrono::Duration;
    use std::collections::BTreeSet;

    fn text_and_checkbox() -> QuestionSchema {
        QuestionSchema::from_drafts(vec![
            QuestionDraft::new("News?", QuestionType::Text),
            QuestionDraft::new("Pick", QuestionType::Checkbox).with_options(["A", "B"]),
        ])
        .unwrap()
    }

    fn good_answers() -> Vec<Option<AnswerValue>> {
        vec![
            Some(AnswerValue::Text("hello".into())),
            Some(AnswerValue::Checkbox(BTreeSet::from(["A".to_string()]))),
        ]
    }

    async fn open_harness(members: &[&str]) -> Harness {
        let h = Harness::new(members).await;
        h.store.save_schema("g1", &text_and_checkbox()).await.unwrap();
        h.engine.open_for_responses("g1").await.unwrap();
        h
    }

    #[tokio::test]
    async fn test_open_requires_closed_and_questions() {
        let h = Harness::new(&["u1"]).await;
        assert_eq!(
            h.engine.open_for_responses("g1").await,
            Err(DomainError::EmptySchema)
        );

        h.store.save_schema("g1", &text_and_checkbox()).await.unwrap();
        let cycle = h.engine.open_for_responses("g1").await.unwrap();
        assert_eq!(cycle.state, CycleState::Open);
        assert_eq!(cycle.cycle_number, 1);
        assert_eq!(
            h.engine.open_for_responses("g1").await,
            Err(DomainError::AlreadyOpen)
        );
    }

    #[tokio::test]
    async fn test_everyone_responding_collects() {
        let h = open_harness(&["u1", "u2"]).await;
        let first = h
            .engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
        assert_eq!(first.state, CycleState::Open);
        assert_eq!(h.engine.reminder_targets("g1").await.unwrap(), vec!["u2"]);

        let second = h
            .engine
            .accept_submission("g1", "u2", good_answers())
            .await
            .unwrap();
        assert_eq!(second.state, CycleState::Collected);
        assert_eq!(second.completion_ratio, 1.0);

        let status = h.engine.collection_status("g1").await.unwrap();
        assert_eq!((status.received, status.expected), (2, 2));
        assert!(status.outstanding.is_empty());
        assert_eq!(h.engine.responses("g1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_submission_changes_nothing() {
        let h = open_harness(&["u1", "u2"]).await;
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
        let before = h.engine.collection_status("g1").await.unwrap();

        let err = h
            .engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateSubmission("u1".into()));
        assert_eq!(h.engine.collection_status("g1").await.unwrap(), before);
        assert_eq!(h.engine.responses("g1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_accept_once() {
        let h = open_harness(&["u1", "u2"]).await;
        let engine = Arc::clone(&h.engine);
        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine.accept_submission("g1", "u1", good_answers()).await
                })
            })
            .collect();

        let mut accepted = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(e, DomainError::DuplicateSubmission("u1".into())),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(h.engine.responses("g1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_answers_return_positional_errors() {
        let h = open_harness(&["u1"]).await;
        let err = h
            .engine
            .accept_submission(
                "g1",
                "u1",
                vec![
                    Some(AnswerValue::Text("hello".into())),
                    Some(AnswerValue::Checkbox(BTreeSet::new())),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(vec![
                "".into(),
                "Please choose at least one option for Question 2.".into()
            ])
        );
        assert!(!h.engine.has_responded("g1", "u1").await.unwrap());

        let mut too_many = good_answers();
        too_many.push(Some(AnswerValue::Text("extra".into())));
        assert_eq!(
            h.engine.accept_submission("g1", "u1", too_many).await,
            Err(DomainError::AnswerCount {
                expected: 2,
                actual: 3
            })
        );
    }

    #[tokio::test]
    async fn test_submission_rejected_when_closed() {
        let h = Harness::new(&["u1"]).await;
        h.store.save_schema("g1", &text_and_checkbox()).await.unwrap();
        assert_eq!(
            h.engine.accept_submission("g1", "u1", good_answers()).await,
            Err(DomainError::AlreadyClosed)
        );
    }

    #[tokio::test]
    async fn test_generate_twice_fails_closed() {
        let h = open_harness(&["u1", "u2"]).await;
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();

        let newsletter = h.engine.generate_newsletter("g1").await.unwrap();
        assert_eq!(newsletter.cycle_number, 1);
        assert_eq!(h.compiler.calls(), 1);

        let cycle = h.engine.cycle("g1").await.unwrap();
        assert_eq!(cycle.state, CycleState::Closed);
        assert!(!cycle.accepting_responses());
        assert_eq!(cycle.last_release_at, Some(h.clock.now()));

        h.clock.advance(Duration::days(45));
        assert_eq!(
            h.engine.generate_newsletter("g1").await,
            Err(DomainError::AlreadyClosed)
        );
        let after = h.engine.cycle("g1").await.unwrap();
        assert_eq!(after.last_release_at, cycle.last_release_at);
        assert_eq!(h.compiler.calls(), 1);
        assert_eq!(h.engine.newsletters("g1").await.unwrap().len(), 1);
        assert_eq!(
            h.engine.accept_submission("g1", "u2", good_answers()).await,
            Err(DomainError::AlreadyClosed)
        );
    }

    #[tokio::test]
    async fn test_release_gate_boundary() {
        let h = open_harness(&["u1"]).await;
        let mut cycle = h.engine.cycle("g1").await.unwrap();
        cycle.last_release_at = Some(h.clock.now() - Duration::days(29));
        h.store.save_cycle(&cycle).await.unwrap();

        let err = h.engine.generate_newsletter("g1").await.unwrap_err();
        assert!(matches!(err, DomainError::TooSoon { days_left: 1, .. }));
        assert_eq!(h.engine.cycle("g1").await.unwrap(), cycle);
        assert!(!h.engine.release_gate("g1").await.unwrap().can_release);

        cycle.last_release_at = Some(h.clock.now() - Duration::days(30));
        h.store.save_cycle(&cycle).await.unwrap();
        assert!(h.engine.release_gate("g1").await.unwrap().can_release);
        h.engine.generate_newsletter("g1").await.unwrap();
    }

    #[tokio::test]
    async fn test_compiler_failure_leaves_cycle_open() {
        let h = open_harness(&["u1"]).await;
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
        let before = h.engine.cycle("g1").await.unwrap();

        h.compiler.fail_next("renderer offline");
        let err = h.engine.generate_newsletter("g1").await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Collaborator(CollaboratorError::Compiler("renderer offline".into()))
        );
        assert_eq!(h.engine.cycle("g1").await.unwrap(), before);

        // retry succeeds
        h.engine.generate_newsletter("g1").await.unwrap();
        assert_eq!(
            h.engine.cycle("g1").await.unwrap().state,
            CycleState::Closed
        );
    }

    #[tokio::test]
    async fn test_abandoned_generation_leaves_no_trace() {
        let h = open_harness(&["u1"]).await;
        let before = h.engine.cycle("g1").await.unwrap();

        h.compiler.hang_next();
        let attempt = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            h.engine.generate_newsletter("g1"),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(h.engine.cycle("g1").await.unwrap(), before);
        assert!(h.engine.newsletters("g1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_membership_fixed_at_open() {
        let h = open_harness(&["u1"]).await;
        h.members.set("g1", &["u1", "late"]);
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
        let status = h.engine.collection_status("g1").await.unwrap();
        assert_eq!(status.state, CycleState::Collected);
        assert_eq!(status.expected, 1);

        // the late joiner can still answer this cycle
        h.engine
            .accept_submission("g1", "late", good_answers())
            .await
            .unwrap();
        assert_eq!(h.engine.responses("g1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_next_cycle_starts_fresh() {
        let h = open_harness(&["u1"]).await;
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
        h.engine.generate_newsletter("g1").await.unwrap();

        h.clock.advance(Duration::days(30));
        let cycle = h.engine.open_for_responses("g1").await.unwrap();
        assert_eq!(cycle.cycle_number, 2);
        assert_eq!(cycle.collection.received_count(), 0);
        assert!(h.engine.responses("g1").await.unwrap().is_empty());
        h.engine
            .accept_submission("g1", "u1", good_answers())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_membership_failure_is_collaborator_error() {
        let h = Harness::new(&["u1"]).await;
        h.store.save_schema("g1", &text_and_checkbox()).await.unwrap();
        h.members.fail("directory down");
        let err = h.engine.open_for_responses("g1").await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Collaborator(CollaboratorError::Membership("directory down".into()))
        );
        assert_eq!(
            h.engine.cycle("g1").await.unwrap().state,
            CycleState::Closed
        );
    }

    #[tokio::test]
    async fn test_newsletter_stamped_with_release_time() {
        let h = open_harness(&["u1"]).await;
        h.clock.advance(Duration::minutes(7));
        let released_at = h.clock.now();

        let newsletter = h.engine.generate_newsletter("g1").await.unwrap();
        assert_eq!(newsletter.generated_at, released_at);

        let cycle = h.engine.cycle("g1").await.unwrap();
        assert_eq!(cycle.last_release_at, Some(newsletter.generated_at));
        let archived = h.engine.newsletters("g1").await.unwrap();
        assert_eq!(archived[0].generated_at, released_at);
    }
}
