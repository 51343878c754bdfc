//! Markaz Database — SurrealDB connection management, schema compilation,
//! access guard, write hooks, and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`DbManager`])
//! - Schema compilation and migrations ([`compile`], [`run_migrations`])
//! - Fresh-per-request authorization ([`AccessGuard`])
//! - The replication outbox surface ([`SyncOutbox`])
//! - First-run bootstrap ([`initialize_center`], [`initialize_local_admin`])
//! - Repository implementations for the `markaz-core` traits

mod connection;
mod error;
mod guard;
mod hooks;
mod init;
mod outbox;
mod schema;

pub mod repository;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use guard::AccessGuard;
pub use init::{initialize_center, initialize_local_admin};
pub use outbox::{SyncOutbox, SyncRecord};
pub use schema::{CATALOG, CompiledSchema, TableDef, compile, is_synced, run_migrations};
