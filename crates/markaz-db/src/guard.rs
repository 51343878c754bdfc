//! Fresh-per-request access checks.
//!
//! The guard resolves the actor's grants from the `scope` table and
//! evaluates the compiled access policy against them. Grants are loaded
//! on every check and never cached across operations — revoking a scope
//! takes effect on the very next request.

use markaz_core::authz::{AccessPolicy, Action, Actor, Grant, ScopeName, Table, Target};
use markaz_core::error::MarkazResult;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GrantRow {
    scope_name: String,
    space: Option<String>,
}

impl GrantRow {
    fn try_into_grant(self) -> Result<Grant, DbError> {
        let scope_name = ScopeName::parse(&self.scope_name)
            .ok_or_else(|| DbError::Decode(format!("unknown scope name: {}", self.scope_name)))?;
        let space = self
            .space
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Decode(format!("invalid space UUID: {e}")))
            })
            .transpose()?;
        Ok(Grant { scope_name, space })
    }
}

/// Load the grants a user currently holds.
pub(crate) async fn load_grants<C: Connection>(
    db: &Surreal<C>,
    user: Uuid,
) -> Result<Vec<Grant>, DbError> {
    let mut result = db
        .query(
            "SELECT scope_name, \
             IF space = NONE THEN NONE ELSE meta::id(space) END AS space \
             FROM scope WHERE user = type::record('user', $user)",
        )
        .bind(("user", user.to_string()))
        .await?;

    let rows: Vec<GrantRow> = result.take(0)?;
    rows.into_iter().map(GrantRow::try_into_grant).collect()
}

/// Evaluates the compiled access policy for one operation at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard {
    policy: AccessPolicy,
}

impl AccessGuard {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    /// Check one access request against freshly loaded grants. A denied
    /// check must abort the operation before any write is attempted.
    pub async fn check<C: Connection>(
        &self,
        db: &Surreal<C>,
        actor: Actor,
        action: Action,
        table: Table,
        target: Target,
    ) -> MarkazResult<()> {
        let grants = load_grants(db, actor.user_id).await?;
        self.policy.authorize(actor, &grants, action, table, target)
    }
}
