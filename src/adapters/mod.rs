//! Infrastructure adapters. Implement outbound ports.
//!
//! Storage, image rendering, membership, newsletter compilation, terminal UI.
//! Map errors to DomainError.

pub mod clock;
pub mod compiler;
pub mod imaging;
pub mod membership;
pub mod persistence;
pub mod rest;
pub mod ui;
