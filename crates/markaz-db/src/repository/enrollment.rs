//! SurrealDB implementation of [`EnrollmentRepository`].
//!
//! An enrollment's name pair is copied from the owning student at
//! creation time; afterwards the rename propagation hook keeps it in
//! sync.

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::enrollment::{CreateEnrollment, Enrollment};
use markaz_core::normalize;
use markaz_core::repository::{EnrollmentRepository, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::guard::AccessGuard;
use crate::hooks;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct SpaceRefRow {
    space: String,
}

#[derive(Debug, SurrealValue)]
struct StudentNameRow {
    name: String,
    _name: String,
}

#[derive(Debug, SurrealValue)]
struct EnrollmentRowWithId {
    record_id: String,
    name: String,
    _name: String,
    student: String,
    default_group: String,
    academic_year: String,
    course: String,
    space: String,
}

impl EnrollmentRowWithId {
    fn try_into_enrollment(self) -> Result<Enrollment, DbError> {
        Ok(Enrollment {
            id: parse_uuid(&self.record_id, "enrollment")?,
            name: self.name,
            search_name: self._name,
            student: parse_uuid(&self.student, "student")?,
            default_group: parse_uuid(&self.default_group, "group")?,
            academic_year: parse_uuid(&self.academic_year, "academic_year")?,
            course: parse_uuid(&self.course, "academic_year_course")?,
            space: parse_uuid(&self.space, "space")?,
        })
    }
}

const ENROLLMENT_PROJECTION: &str = "\
meta::id(id) AS record_id, name, _name, meta::id(student) AS student, \
meta::id(default_group) AS default_group, \
meta::id(academic_year) AS academic_year, meta::id(course) AS course, \
meta::id(space) AS space";

/// SurrealDB implementation of the Enrollment repository.
#[derive(Clone)]
pub struct SurrealEnrollmentRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealEnrollmentRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch_space(&self, id: Uuid) -> MarkazResult<Uuid> {
        let mut result = self
            .db
            .query("SELECT meta::id(space) AS space FROM type::record('enrollment', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "enrollment".into(),
            id: id.to_string(),
        })?;
        Ok(parse_uuid(&row.space, "space")?)
    }
}

impl<C: Connection> EnrollmentRepository for SurrealEnrollmentRepository<C> {
    async fn create(&self, actor: Actor, input: CreateEnrollment) -> MarkazResult<Enrollment> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Create,
                Table::Enrollment,
                Target::space(input.space),
            )
            .await?;

        // Copy the owning student's name pair.
        let mut result = self
            .db
            .query("SELECT name, _name FROM type::record('student', $id)")
            .bind(("id", input.student.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<StudentNameRow> = result.take(0).map_err(DbError::from)?;
        let student = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "student".into(),
            id: input.student.to_string(),
        })?;

        let id = Uuid::new_v4();
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('enrollment', $id) SET name = $name, \
             _name = $search_name, \
             student = type::record('student', $student), \
             default_group = type::record('group', $default_group), \
             academic_year = type::record('academic_year', $academic_year), \
             course = type::record('academic_year_course', $course), \
             space = type::record('space', $space); \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::Enrollment),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", student.name.clone()))
            .bind(("search_name", student._name.clone()))
            .bind(("student", input.student.to_string()))
            .bind(("default_group", input.default_group.to_string()))
            .bind(("academic_year", input.academic_year.to_string()))
            .bind(("course", input.course.to_string()))
            .bind(("space", input.space.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Enrollment {
            id,
            name: student.name,
            search_name: student._name,
            student: input.student,
            default_group: input.default_group,
            academic_year: input.academic_year,
            course: input.course,
            space: input.space,
        })
    }

    async fn list_by_course(
        &self,
        actor: Actor,
        course: Uuid,
        pagination: Pagination,
    ) -> MarkazResult<Vec<Enrollment>> {
        // Resolve the course's space to authorize the read.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(space) AS space \
                 FROM type::record('academic_year_course', $id)",
            )
            .bind(("id", course.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let course_row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "academic_year_course".into(),
            id: course.to_string(),
        })?;
        let space = parse_uuid(&course_row.space, "space")?;

        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::Enrollment,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT {ENROLLMENT_PROJECTION} FROM enrollment \
                 WHERE course = type::record('academic_year_course', $course) \
                 ORDER BY _name ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("course", course.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EnrollmentRowWithId::try_into_enrollment)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn search(
        &self,
        actor: Actor,
        space: Uuid,
        query: &str,
        limit: u64,
    ) -> MarkazResult<Vec<Enrollment>> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::Enrollment,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT {ENROLLMENT_PROJECTION} FROM enrollment \
                 WHERE space = type::record('space', $space) AND _name @@ $query \
                 LIMIT $limit"
            ))
            .bind(("space", space.to_string()))
            .bind(("query", normalize::search_key(query)))
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<EnrollmentRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(EnrollmentRowWithId::try_into_enrollment)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let space = self.fetch_space(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::Enrollment,
                Target::space(space),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('enrollment', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::Enrollment),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}
