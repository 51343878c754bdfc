//! SurrealDB implementation of [`ScopeRepository`].
//!
//! Grants are the data the access policy evaluates over, and they are
//! themselves gated by it: the center manager may manage any grant, a
//! space manager only grants within their own space. Revoking a grant
//! takes effect on the next authorization check — nothing is cached.

use markaz_core::authz::{Action, Actor, ScopeName, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::scope::{CreateScope, Scope};
use markaz_core::repository::ScopeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::guard::AccessGuard;
use crate::hooks;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct ScopeRowWithId {
    record_id: String,
    scope_name: String,
    user: String,
    space: Option<String>,
}

impl ScopeRowWithId {
    fn try_into_scope(self) -> Result<Scope, DbError> {
        let scope_name = ScopeName::parse(&self.scope_name)
            .ok_or_else(|| DbError::Decode(format!("unknown scope name: {}", self.scope_name)))?;
        Ok(Scope {
            id: parse_uuid(&self.record_id, "scope")?,
            scope_name,
            user: parse_uuid(&self.user, "user")?,
            space: self
                .space
                .map(|s| parse_uuid(&s, "space"))
                .transpose()?,
        })
    }
}

const SCOPE_PROJECTION: &str = "\
meta::id(id) AS record_id, scope_name, meta::id(user) AS user, \
IF space = NONE THEN NONE ELSE meta::id(space) END AS space";

/// SurrealDB implementation of the Scope repository.
#[derive(Clone)]
pub struct SurrealScopeRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealScopeRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }
}

impl<C: Connection> ScopeRepository for SurrealScopeRepository<C> {
    async fn grant(&self, actor: Actor, input: CreateScope) -> MarkazResult<Scope> {
        let target = match input.space {
            Some(space) => Target::space(space),
            None => Target::none(),
        };
        self.guard
            .check(&self.db, actor, Action::Create, Table::Scope, target)
            .await?;

        let id = Uuid::new_v4();
        let assignment = match input.space {
            Some(_) => {
                "CREATE type::record('scope', $id) SET scope_name = $scope_name, \
                 user = type::record('user', $user), \
                 space = type::record('space', $space)"
            }
            None => {
                "CREATE type::record('scope', $id) SET scope_name = $scope_name, \
                 user = type::record('user', $user)"
            }
        };
        let query = format!(
            "BEGIN TRANSACTION; {}; {}; COMMIT TRANSACTION;",
            assignment,
            hooks::record_create(Table::Scope),
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("scope_name", input.scope_name.as_str().to_string()))
            .bind(("user", input.user.to_string()));
        if let Some(space) = input.space {
            builder = builder.bind(("space", space.to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(
            scope_name = input.scope_name.as_str(),
            user = %input.user,
            "Granted scope"
        );

        Ok(Scope {
            id,
            scope_name: input.scope_name,
            user: input.user,
            space: input.space,
        })
    }

    async fn list_for_user(&self, actor: Actor, user: Uuid) -> MarkazResult<Vec<Scope>> {
        self.guard
            .check(&self.db, actor, Action::Select, Table::Scope, Target::none())
            .await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT {SCOPE_PROJECTION} FROM scope \
                 WHERE user = type::record('user', $user)"
            ))
            .bind(("user", user.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ScopeRowWithId::try_into_scope)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn revoke(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {SCOPE_PROJECTION} FROM type::record('scope', $id)"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRowWithId> = result.take(0).map_err(DbError::from)?;
        let existing = rows
            .into_iter()
            .next()
            .ok_or(DbError::NotFound {
                entity: "scope".into(),
                id: id.to_string(),
            })?
            .try_into_scope()?;

        let target = match existing.space {
            Some(space) => Target::space(space),
            None => Target::none(),
        };
        self.guard
            .check(&self.db, actor, Action::Delete, Table::Scope, target)
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('scope', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::Scope),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(
            scope_name = existing.scope_name.as_str(),
            user = %existing.user,
            "Revoked scope"
        );

        Ok(())
    }
}
