//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    CompiledNewsletter, DomainError, EncodingError, QuestionSchema, ReleaseCycle, Response,
};
use chrono::{DateTime, Utc};

/// Group membership. Seeds the expected responders when questions are released.
#[async_trait::async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Current members of the group, in a stable display order.
    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, DomainError>;
}

/// Turns a cycle's responses into a newsletter. Called once per successful generation.
#[async_trait::async_trait]
pub trait NewsletterCompiler: Send + Sync {
    async fn compile(
        &self,
        cycle: &ReleaseCycle,
        schema: &QuestionSchema,
        responses: &[Response],
        generated_at: DateTime<Utc>,
    ) -> Result<CompiledNewsletter, DomainError>;
}

/// Durable store for schemas, cycles, responses and compiled newsletters, keyed by group.
///
/// Each `save_*`/`commit_*` call is all-or-nothing. The engine serializes calls per
/// group and relies on read-your-writes within that serialization.
#[async_trait::async_trait]
pub trait CycleStore: Send + Sync {
    /// Schema of the group; empty if none was saved yet.
    async fn load_schema(&self, group_id: &str) -> Result<QuestionSchema, DomainError>;

    async fn save_schema(&self, group_id: &str, schema: &QuestionSchema)
    -> Result<(), DomainError>;

    async fn load_cycle(&self, group_id: &str) -> Result<Option<ReleaseCycle>, DomainError>;

    async fn save_cycle(&self, cycle: &ReleaseCycle) -> Result<(), DomainError>;

    /// Responses recorded for the given cycle, in submission order.
    async fn load_responses(
        &self,
        group_id: &str,
        cycle_number: u32,
    ) -> Result<Vec<Response>, DomainError>;

    /// Store the response and the updated cycle together. Fails with
    /// `DuplicateSubmission` if (group, cycle, responder) already exists.
    async fn commit_submission(
        &self,
        cycle: &ReleaseCycle,
        response: &Response,
    ) -> Result<(), DomainError>;

    /// Store the closed cycle and its newsletter together.
    async fn commit_release(
        &self,
        cycle: &ReleaseCycle,
        newsletter: &CompiledNewsletter,
    ) -> Result<(), DomainError>;

    /// Newsletters of the group, oldest first.
    async fn load_newsletters(&self, group_id: &str)
    -> Result<Vec<CompiledNewsletter>, DomainError>;
}

/// Single resize + JPEG render of an image. CPU-bound, no I/O.
pub trait ImageEncoder: Send + Sync {
    /// Downscale `image` to fit within `max_width` x `max_height` (never upscale) and
    /// encode it as JPEG at `quality` (1-100). Returns the base64 payload without prefix.
    fn render_jpeg(
        &self,
        image: &[u8],
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> Result<String, EncodingError>;
}

/// Source of "now" for the release gate.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
