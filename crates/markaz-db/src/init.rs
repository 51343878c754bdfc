//! First-run initialization.
//!
//! A fresh center has no users and therefore no one to authorize
//! against; bootstrapping applies the schema and creates the initial
//! admin together with their `manage_center` grant directly. Both writes
//! are sync-tracked like any other mutation so the remote store receives
//! the admin account too.

use markaz_core::authz::{ScopeName, Table};
use markaz_core::error::MarkazResult;
use markaz_core::models::scope::Scope;
use markaz_core::models::user::{CreateUser, User};
use markaz_core::validate;
use surrealdb::{Connection, Surreal};
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::hooks;
use crate::repository::hash_password;
use crate::schema;

/// Apply the compiled schema to a fresh (or already initialized) center
/// database. Safe to re-run.
pub async fn initialize_center<C: Connection>(db: &Surreal<C>) -> MarkazResult<()> {
    info!("Initializing center database");
    schema::run_migrations(db).await?;
    Ok(())
}

/// Create the initial admin user and their center-manager grant.
///
/// Runs as one transaction: user, grant, and both outbox records commit
/// together or not at all.
pub async fn initialize_local_admin<C: Connection>(
    db: &Surreal<C>,
    input: CreateUser,
) -> MarkazResult<(User, Scope)> {
    validate::display_name(&input.name)?;
    validate::phone_number(&input.phone_number)?;

    info!(phone_number = %input.phone_number, "Creating local admin user");

    let user_id = Uuid::new_v4();
    let scope_id = Uuid::new_v4();
    let password = hash_password(&input.password)?;

    let query = format!(
        "BEGIN TRANSACTION; \
         CREATE type::record('user', $id) SET name = $name, \
         phone_number = $phone_number, password = $password; \
         {user_record}; \
         CREATE type::record('scope', $scope_id) SET \
         scope_name = 'manage_center', user = type::record('user', $id); \
         {scope_record}; \
         COMMIT TRANSACTION;",
        user_record = hooks::record_create(Table::User),
        scope_record = hooks::record_create_as(Table::Scope, "scope_id"),
    );

    db.query(query)
        .bind(("id", user_id.to_string()))
        .bind(("name", input.name.clone()))
        .bind(("phone_number", input.phone_number.clone()))
        .bind(("password", password))
        .bind(("scope_id", scope_id.to_string()))
        .await
        .map_err(DbError::from)?
        .check()
        .map_err(DbError::from)?;

    Ok((
        User {
            id: user_id,
            name: input.name,
            phone_number: input.phone_number,
        },
        Scope {
            id: scope_id,
            scope_name: ScopeName::ManageCenter,
            user: user_id,
            space: None,
        },
    ))
}
