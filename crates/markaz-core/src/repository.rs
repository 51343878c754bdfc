//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and take an explicit [`Actor`]
//! context — there is no ambient session. Implementations must
//! re-authorize every call against freshly loaded grants so that a
//! revoked scope is rejected on the very next operation, and a denied
//! check must abort before any write happens.

use uuid::Uuid;

use crate::authz::Actor;
use crate::error::MarkazResult;
use crate::models::{
    academic_year::{AcademicYear, CreateAcademicYear},
    academic_year_course::{AcademicYearCourse, CreateAcademicYearCourse},
    enrollment::{CreateEnrollment, Enrollment},
    group::{CreateGroup, Group},
    scope::{CreateScope, Scope},
    space::{CreateSpace, Space},
    student::{CreateStudent, Student},
    user::{CreateUser, PasswordResetter, PublicUserInfo, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Global tables
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(
        &self,
        actor: Actor,
        input: CreateUser,
    ) -> impl Future<Output = MarkazResult<User>> + Send;
    fn get_by_id(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<User>> + Send;
    /// Users may update their own row; the center manager may update
    /// anyone's.
    fn update(
        &self,
        actor: Actor,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = MarkazResult<User>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
    /// Directory listing with capability summaries per user.
    fn list_users(&self, actor: Actor)
    -> impl Future<Output = MarkazResult<Vec<PublicUserInfo>>> + Send;
    /// Who may reset the password of the user holding `phone_number`:
    /// every center manager, plus the managers of every space the user
    /// belongs to. The user themselves is excluded from the space-manager
    /// pass; the result is deduplicated by user id.
    fn who_can_reset_password_for(
        &self,
        phone_number: &str,
    ) -> impl Future<Output = MarkazResult<Vec<PasswordResetter>>> + Send;
}

pub trait ScopeRepository: Send + Sync {
    /// Grant a capability. Duplicate grants are tolerated and idempotent
    /// in effect.
    fn grant(
        &self,
        actor: Actor,
        input: CreateScope,
    ) -> impl Future<Output = MarkazResult<Scope>> + Send;
    fn list_for_user(
        &self,
        actor: Actor,
        user: Uuid,
    ) -> impl Future<Output = MarkazResult<Vec<Scope>>> + Send;
    /// Revoke a grant. Takes effect on the next authorization check.
    fn revoke(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

pub trait SpaceRepository: Send + Sync {
    fn create(
        &self,
        actor: Actor,
        input: CreateSpace,
    ) -> impl Future<Output = MarkazResult<Space>> + Send;
    fn rename(
        &self,
        actor: Actor,
        id: Uuid,
        name: String,
    ) -> impl Future<Output = MarkazResult<Space>> + Send;
    fn list(&self, actor: Actor) -> impl Future<Output = MarkazResult<Vec<Space>>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Space-scoped tables
// ---------------------------------------------------------------------------

pub trait AcademicYearRepository: Send + Sync {
    fn create(
        &self,
        actor: Actor,
        input: CreateAcademicYear,
    ) -> impl Future<Output = MarkazResult<AcademicYear>> + Send;
    fn list_by_space(
        &self,
        actor: Actor,
        space: Uuid,
    ) -> impl Future<Output = MarkazResult<Vec<AcademicYear>>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

pub trait AcademicYearCourseRepository: Send + Sync {
    fn create(
        &self,
        actor: Actor,
        input: CreateAcademicYearCourse,
    ) -> impl Future<Output = MarkazResult<AcademicYearCourse>> + Send;
    fn list_by_academic_year(
        &self,
        actor: Actor,
        academic_year: Uuid,
    ) -> impl Future<Output = MarkazResult<Vec<AcademicYearCourse>>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

pub trait GroupRepository: Send + Sync {
    fn create(
        &self,
        actor: Actor,
        input: CreateGroup,
    ) -> impl Future<Output = MarkazResult<Group>> + Send;
    fn list_by_course(
        &self,
        actor: Actor,
        course: Uuid,
    ) -> impl Future<Output = MarkazResult<Vec<Group>>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

pub trait StudentRepository: Send + Sync {
    /// Create a student; the canonical search key is derived from the
    /// display name.
    fn create(
        &self,
        actor: Actor,
        input: CreateStudent,
    ) -> impl Future<Output = MarkazResult<Student>> + Send;
    fn get(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<Student>> + Send;
    fn list(
        &self,
        actor: Actor,
        space: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = MarkazResult<PaginatedResult<Student>>> + Send;
    /// Full-text search over the canonical search key. The query is
    /// normalized with the autocomplete fold before matching.
    fn search(
        &self,
        actor: Actor,
        space: Uuid,
        query: &str,
        limit: u64,
    ) -> impl Future<Output = MarkazResult<Vec<Student>>> + Send;
    /// Rename a student. Synchronously recomputes the search key and
    /// pushes the new name pair into every referencing enrollment within
    /// the same transaction. Renaming to the identical name is a no-op.
    fn rename(
        &self,
        actor: Actor,
        id: Uuid,
        name: String,
    ) -> impl Future<Output = MarkazResult<Student>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}

pub trait EnrollmentRepository: Send + Sync {
    /// Enroll a student; the enrollment's name pair is copied from the
    /// student at creation time.
    fn create(
        &self,
        actor: Actor,
        input: CreateEnrollment,
    ) -> impl Future<Output = MarkazResult<Enrollment>> + Send;
    fn list_by_course(
        &self,
        actor: Actor,
        course: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = MarkazResult<Vec<Enrollment>>> + Send;
    fn search(
        &self,
        actor: Actor,
        space: Uuid,
        query: &str,
        limit: u64,
    ) -> impl Future<Output = MarkazResult<Vec<Enrollment>>> + Send;
    fn delete(&self, actor: Actor, id: Uuid) -> impl Future<Output = MarkazResult<()>> + Send;
}
