//! SurrealDB repository implementations.
//!
//! Every mutating operation follows the same shape: validate the
//! payload, check the access policy against freshly loaded grants, then
//! run the write and its hooks (outbox append, rename propagation) as
//! one SurrealDB transaction. A denied check returns before anything is
//! written; a failing statement aborts the whole transaction.

mod academic_year;
mod academic_year_course;
mod enrollment;
mod group;
mod scope;
mod space;
mod student;
mod user;

pub use academic_year::SurrealAcademicYearRepository;
pub use academic_year_course::SurrealAcademicYearCourseRepository;
pub use enrollment::SurrealEnrollmentRepository;
pub use group::SurrealGroupRepository;
pub use scope::SurrealScopeRepository;
pub use space::SurrealSpaceRepository;
pub use student::SurrealStudentRepository;
pub use user::{SurrealUserRepository, verify_password};
pub(crate) use user::hash_password;

use uuid::Uuid;

use crate::error::DbError;

/// Parse a record key returned by `meta::id` back into a UUID.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}
