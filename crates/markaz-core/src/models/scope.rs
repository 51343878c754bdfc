//! Scope (capability grant) domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::ScopeName;

/// A capability grant binding a user to a named permission, optionally
/// restricted to a space. Duplicate grants are idempotent in effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: Uuid,
    pub scope_name: ScopeName,
    pub user: Uuid,
    pub space: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScope {
    pub scope_name: ScopeName,
    pub user: Uuid,
    pub space: Option<Uuid>,
}
