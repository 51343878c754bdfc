//! Enrollment domain model.
//!
//! An enrollment joins a student to a course for an academic year. Its
//! `name`/`search_name` pair is a cached copy of the owning student's
//! pair, kept in sync by the rename propagation hook so that enrollment
//! search does not fan out to the student table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    /// Cached copy of the owning student's display name.
    pub name: String,
    /// Cached copy of the owning student's search key.
    #[serde(rename = "_name")]
    pub search_name: String,
    pub student: Uuid,
    pub default_group: Uuid,
    pub academic_year: Uuid,
    pub course: Uuid,
    pub space: Uuid,
}

/// Creation payload. The name pair is copied from the student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnrollment {
    pub student: Uuid,
    pub default_group: Uuid,
    pub academic_year: Uuid,
    pub course: Uuid,
    pub space: Uuid,
}
