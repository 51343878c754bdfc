//! SurrealDB implementation of [`AcademicYearCourseRepository`].

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::academic_year_course::{AcademicYearCourse, CreateAcademicYearCourse};
use markaz_core::repository::AcademicYearCourseRepository;
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
struct CourseRowWithId {
    record_id: String,
    grade: String,
    subjects: Vec<String>,
    academic_year: String,
    space: String,
}

impl CourseRowWithId {
    fn try_into_course(self) -> Result<AcademicYearCourse, DbError> {
        Ok(AcademicYearCourse {
            id: parse_uuid(&self.record_id, "academic_year_course")?,
            grade: self.grade,
            subjects: self.subjects,
            academic_year: parse_uuid(&self.academic_year, "academic_year")?,
            space: parse_uuid(&self.space, "space")?,
        })
    }
}

/// SurrealDB implementation of the AcademicYearCourse repository.
#[derive(Clone)]
pub struct SurrealAcademicYearCourseRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealAcademicYearCourseRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch_space(&self, id: Uuid) -> MarkazResult<Uuid> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(space) AS space \
                 FROM type::record('academic_year_course', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "academic_year_course".into(),
            id: id.to_string(),
        })?;
        Ok(parse_uuid(&row.space, "space")?)
    }
}

impl<C: Connection> AcademicYearCourseRepository for SurrealAcademicYearCourseRepository<C> {
    async fn create(
        &self,
        actor: Actor,
        input: CreateAcademicYearCourse,
    ) -> MarkazResult<AcademicYearCourse> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Create,
                Table::AcademicYearCourse,
                Target::space(input.space),
            )
            .await?;

        let id = Uuid::new_v4();
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('academic_year_course', $id) SET grade = $grade, \
             subjects = $subjects, \
             academic_year = type::record('academic_year', $academic_year), \
             space = type::record('space', $space); \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::AcademicYearCourse),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("grade", input.grade.clone()))
            .bind(("subjects", input.subjects.clone()))
            .bind(("academic_year", input.academic_year.to_string()))
            .bind(("space", input.space.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(AcademicYearCourse {
            id,
            grade: input.grade,
            subjects: input.subjects,
            academic_year: input.academic_year,
            space: input.space,
        })
    }

    async fn list_by_academic_year(
        &self,
        actor: Actor,
        academic_year: Uuid,
    ) -> MarkazResult<Vec<AcademicYearCourse>> {
        // Resolve the year's space to authorize the read.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(space) AS space \
                 FROM type::record('academic_year', $id)",
            )
            .bind(("id", academic_year.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let year_row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "academic_year".into(),
            id: academic_year.to_string(),
        })?;
        let space = parse_uuid(&year_row.space, "space")?;

        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::AcademicYearCourse,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, grade, subjects, \
                 meta::id(academic_year) AS academic_year, meta::id(space) AS space \
                 FROM academic_year_course \
                 WHERE academic_year = type::record('academic_year', $academic_year) \
                 ORDER BY grade ASC",
            )
            .bind(("academic_year", academic_year.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CourseRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(CourseRowWithId::try_into_course)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let space = self.fetch_space(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::AcademicYearCourse,
                Target::space(space),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('academic_year_course', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::AcademicYearCourse),
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
