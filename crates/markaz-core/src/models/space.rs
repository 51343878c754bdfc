//! Space domain model.
//!
//! A space is the tenancy boundary for scoped resources — a branch or a
//! department of the center. Every academic year, course, group, student,
//! and enrollment belongs to exactly one space.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpace {
    pub name: String,
}
