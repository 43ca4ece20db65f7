//! Test doubles for the use-case tests: fixed clock, scripted membership/compiler,
//! deterministic image encoder, all wired around an in-memory store.

use crate::adapters::persistence::json_store::JsonStore;
use crate::domain::{
    CompiledNewsletter, DomainError, EncodingError, QuestionSchema, ReleaseCycle, Response,
};
use crate::ports::{Clock, ImageEncoder, MembershipProvider, NewsletterCompiler};
use crate::usecases::{GroupLocks, ReleaseCycleEngine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct FakeMembership {
    groups: Mutex<HashMap<String, Vec<String>>>,
    failure: Mutex<Option<String>>,
}

impl FakeMembership {
    pub fn set(&self, group_id: &str, members: &[&str]) {
        self.groups.lock().unwrap().insert(
            group_id.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
    }

    pub fn fail(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait::async_trait]
impl MembershipProvider for FakeMembership {
    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, DomainError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(DomainError::membership(message));
        }
        Ok(self
            .groups
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeCompiler {
    calls: AtomicUsize,
    fail_next: Mutex<Option<String>>,
    hang_next: AtomicBool,
}

impl FakeCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn hang_next(&self) {
        self.hang_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NewsletterCompiler for FakeCompiler {
    async fn compile(
        &self,
        cycle: &ReleaseCycle,
        schema: &QuestionSchema,
        responses: &[Response],
        generated_at: DateTime<Utc>,
    ) -> Result<CompiledNewsletter, DomainError> {
        if self.hang_next.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failure = self.fail_next.lock().unwrap().take();
        if let Some(message) = failure {
            return Err(DomainError::compiler(message));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompiledNewsletter {
            group_id: cycle.group_id.clone(),
            cycle_number: cycle.cycle_number,
            title: format!("Edition {}", cycle.cycle_number),
            body: format!(
                "{} questions, {} responses",
                schema.question_count(),
                responses.len()
            ),
            location: None,
            generated_at,
        })
    }
}

/// Payload size fixed per call; empty input is unreadable.
pub struct FakeImageEncoder;

impl ImageEncoder for FakeImageEncoder {
    fn render_jpeg(
        &self,
        image: &[u8],
        _max_width: u32,
        _max_height: u32,
        _quality: u8,
    ) -> Result<String, EncodingError> {
        if image.is_empty() {
            return Err(EncodingError::UnreadableImage("empty file".into()));
        }
        Ok("/9j/4AAQSkZJRg".to_string())
    }
}

pub struct Harness {
    pub store: Arc<JsonStore>,
    pub members: Arc<FakeMembership>,
    pub compiler: Arc<FakeCompiler>,
    pub clock: Arc<FixedClock>,
    pub locks: Arc<GroupLocks>,
    pub engine: Arc<ReleaseCycleEngine>,
}

impl Harness {
    /// Group "g1" with the given members, 30-day release interval.
    pub async fn new(members: &[&str]) -> Self {
        let store = Arc::new(JsonStore::in_memory());
        let membership = Arc::new(FakeMembership::default());
        membership.set("g1", members);
        let compiler = Arc::new(FakeCompiler::default());
        let clock = Arc::new(FixedClock::new());
        let locks = Arc::new(GroupLocks::new());
        let engine = Arc::new(ReleaseCycleEngine::new(
            store.clone(),
            membership.clone(),
            compiler.clone(),
            clock.clone(),
            Arc::clone(&locks),
            30,
        ));
        Self {
            store,
            members: membership,
            compiler,
            clock,
            locks,
            engine,
        }
    }
}
