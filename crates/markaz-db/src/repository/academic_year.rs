//! SurrealDB implementation of [`AcademicYearRepository`].

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::academic_year::{AcademicYear, CreateAcademicYear};
use markaz_core::repository::AcademicYearRepository;
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
struct AcademicYearRowWithId {
    record_id: String,
    year: i64,
    space: String,
}

impl AcademicYearRowWithId {
    fn try_into_academic_year(self) -> Result<AcademicYear, DbError> {
        Ok(AcademicYear {
            id: parse_uuid(&self.record_id, "academic_year")?,
            year: self.year,
            space: parse_uuid(&self.space, "space")?,
        })
    }
}

/// SurrealDB implementation of the AcademicYear repository.
#[derive(Clone)]
pub struct SurrealAcademicYearRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealAcademicYearRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch_space(&self, id: Uuid) -> MarkazResult<Uuid> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(space) AS space \
                 FROM type::record('academic_year', $id)",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "academic_year".into(),
            id: id.to_string(),
        })?;
        Ok(parse_uuid(&row.space, "space")?)
    }
}

impl<C: Connection> AcademicYearRepository for SurrealAcademicYearRepository<C> {
    async fn create(&self, actor: Actor, input: CreateAcademicYear) -> MarkazResult<AcademicYear> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Create,
                Table::AcademicYear,
                Target::space(input.space),
            )
            .await?;

        let id = Uuid::new_v4();
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('academic_year', $id) SET year = $year, \
             space = type::record('space', $space); \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::AcademicYear),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("year", input.year))
            .bind(("space", input.space.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(AcademicYear {
            id,
            year: input.year,
            space: input.space,
        })
    }

    async fn list_by_space(&self, actor: Actor, space: Uuid) -> MarkazResult<Vec<AcademicYear>> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::AcademicYear,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, year, meta::id(space) AS space \
                 FROM academic_year WHERE space = type::record('space', $space) \
                 ORDER BY year ASC",
            )
            .bind(("space", space.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AcademicYearRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(AcademicYearRowWithId::try_into_academic_year)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let space = self.fetch_space(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::AcademicYear,
                Target::space(space),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('academic_year', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::AcademicYear),
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
