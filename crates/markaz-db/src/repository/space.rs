//! SurrealDB implementation of [`SpaceRepository`].

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::space::{CreateSpace, Space};
use markaz_core::repository::SpaceRepository;
use markaz_core::validate;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::guard::AccessGuard;
use crate::hooks;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct SpaceRow {
    name: String,
}

#[derive(Debug, SurrealValue)]
struct SpaceRowWithId {
    record_id: String,
    name: String,
}

impl SpaceRowWithId {
    fn try_into_space(self) -> Result<Space, DbError> {
        Ok(Space {
            id: parse_uuid(&self.record_id, "space")?,
            name: self.name,
        })
    }
}

/// SurrealDB implementation of the Space repository.
#[derive(Clone)]
pub struct SurrealSpaceRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealSpaceRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch_name(&self, id: Uuid) -> MarkazResult<String> {
        let mut result = self
            .db
            .query("SELECT name FROM type::record('space', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "space".into(),
            id: id.to_string(),
        })?;
        Ok(row.name)
    }
}

impl<C: Connection> SpaceRepository for SurrealSpaceRepository<C> {
    async fn create(&self, actor: Actor, input: CreateSpace) -> MarkazResult<Space> {
        validate::display_name(&input.name)?;
        self.guard
            .check(&self.db, actor, Action::Create, Table::Space, Target::none())
            .await?;

        let id = Uuid::new_v4();
        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('space', $id) SET name = $name; \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::Space),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Space {
            id,
            name: input.name,
        })
    }

    async fn rename(&self, actor: Actor, id: Uuid, name: String) -> MarkazResult<Space> {
        validate::display_name(&name)?;
        self.fetch_name(id).await?;
        // A space is its own tenancy boundary.
        self.guard
            .check(
                &self.db,
                actor,
                Action::Update,
                Table::Space,
                Target::record_in_space(id, id),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             UPDATE type::record('space', $id) SET name = $name; \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_update(Table::Space),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", name.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Space { id, name })
    }

    async fn list(&self, actor: Actor) -> MarkazResult<Vec<Space>> {
        self.guard
            .check(&self.db, actor, Action::Select, Table::Space, Target::none())
            .await?;

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, name FROM space ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SpaceRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(SpaceRowWithId::try_into_space)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        self.fetch_name(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::Space,
                Target::record_in_space(id, id),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('space', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::Space),
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
