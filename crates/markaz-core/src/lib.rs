//! Markaz Core — domain models, capability-scope authorization, Arabic
//! name canonicalization, and repository trait definitions for the
//! tutoring-center local data engine.
//!
//! Everything in this crate is storage-agnostic. The SurrealDB layer
//! lives in `markaz-db`.

pub mod authz;
pub mod error;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod validate;
