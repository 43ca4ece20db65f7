//! newsletter-cycle: group questionnaires, response collection and periodic newsletter
//! releases with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
