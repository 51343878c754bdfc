//! SurrealDB implementation of [`GroupRepository`].

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::group::{ClassSchedule, CreateGroup, Group};
use markaz_core::repository::GroupRepository;
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
struct GroupRowWithId {
    record_id: String,
    schedule: serde_json::Value,
    academic_year: String,
    course: String,
    space: String,
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        let schedule: Vec<ClassSchedule> = serde_json::from_value(self.schedule)
            .map_err(|e| DbError::Decode(format!("invalid group schedule: {e}")))?;
        Ok(Group {
            id: parse_uuid(&self.record_id, "group")?,
            schedule,
            academic_year: parse_uuid(&self.academic_year, "academic_year")?,
            course: parse_uuid(&self.course, "academic_year_course")?,
            space: parse_uuid(&self.space, "space")?,
        })
    }
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch_space(&self, id: Uuid) -> MarkazResult<Uuid> {
        let mut result = self
            .db
            .query("SELECT meta::id(space) AS space FROM type::record('group', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRefRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "group".into(),
            id: id.to_string(),
        })?;
        Ok(parse_uuid(&row.space, "space")?)
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, actor: Actor, input: CreateGroup) -> MarkazResult<Group> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Create,
                Table::Group,
                Target::space(input.space),
            )
            .await?;

        let id = Uuid::new_v4();
        let schedule = serde_json::to_value(&input.schedule)
            .map_err(|e| DbError::Decode(format!("invalid group schedule: {e}")))?;

        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('group', $id) SET schedule = $schedule, \
             academic_year = type::record('academic_year', $academic_year), \
             course = type::record('academic_year_course', $course), \
             space = type::record('space', $space); \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::Group),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("schedule", schedule))
            .bind(("academic_year", input.academic_year.to_string()))
            .bind(("course", input.course.to_string()))
            .bind(("space", input.space.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Group {
            id,
            schedule: input.schedule,
            academic_year: input.academic_year,
            course: input.course,
            space: input.space,
        })
    }

    async fn list_by_course(&self, actor: Actor, course: Uuid) -> MarkazResult<Vec<Group>> {
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
                Table::Group,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, schedule, \
                 meta::id(academic_year) AS academic_year, meta::id(course) AS course, \
                 meta::id(space) AS space \
                 FROM group \
                 WHERE course = type::record('academic_year_course', $course)",
            )
            .bind(("course", course.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(GroupRowWithId::try_into_group)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let space = self.fetch_space(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::Group,
                Target::space(space),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('group', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::Group),
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
