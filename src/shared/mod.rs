//! Shared configuration.

pub mod config;
