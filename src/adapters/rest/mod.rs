//! Collaborators behind the newsletter console REST API.
//!
//! Every endpoint answers with the `{success, data, message}` envelope.

pub mod compiler;
pub mod envelope;
pub mod membership;

pub use compiler::RestCompiler;
pub use envelope::{ApiClient, ApiResult};
pub use membership::RestMembership;
