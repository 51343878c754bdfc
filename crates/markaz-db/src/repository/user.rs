//! SurrealDB implementation of [`UserRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. The password column is declared select-NONE and
//! never leaves the database — not in reads, not in outbox snapshots.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::{MarkazError, MarkazResult};
use markaz_core::models::user::{
    CreateUser, PasswordResetter, PublicUserInfo, UpdateUser, User,
};
use markaz_core::repository::UserRepository;
use markaz_core::validate;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use crate::error::DbError;
use crate::guard::AccessGuard;
use crate::hooks;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct UserRow {
    name: String,
    phone_number: String,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    name: String,
    phone_number: String,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            name: self.name,
            phone_number: self.phone_number,
        })
    }
}

/// Row shape for grant queries that resolve the granted user.
#[derive(Debug, SurrealValue)]
struct GrantedUserRow {
    id: String,
    name: String,
    phone_number: String,
}

#[derive(Debug, SurrealValue)]
struct ManagerRow {
    user: String,
}

#[derive(Debug, SurrealValue)]
struct SpaceGrantRow {
    user: String,
    space_name: String,
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
/// The salt is randomly generated for each call.
pub(crate) fn hash_password(password: &str) -> MarkazResult<String> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| MarkazError::Database(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| MarkazError::Database(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
///
/// Public for use by the sign-in layer.
pub fn verify_password(password: &str, hash: &str) -> MarkazResult<bool> {
    use argon2::PasswordVerifier;

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| MarkazError::Database(format!("invalid hash format: {e}")))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(MarkazError::Database(format!("verify error: {e}"))),
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch(&self, id: Uuid) -> MarkazResult<User> {
        let mut result = self
            .db
            .query("SELECT name, phone_number FROM type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "user".into(),
            id: id.to_string(),
        })?;
        Ok(User {
            id,
            name: row.name,
            phone_number: row.phone_number,
        })
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, actor: Actor, input: CreateUser) -> MarkazResult<User> {
        validate::display_name(&input.name)?;
        validate::phone_number(&input.phone_number)?;
        self.guard
            .check(&self.db, actor, Action::Create, Table::User, Target::none())
            .await?;

        let id = Uuid::new_v4();
        let password = hash_password(&input.password)?;

        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('user', $id) SET name = $name, \
             phone_number = $phone_number, password = $password; \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::User),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("phone_number", input.phone_number.clone()))
            .bind(("password", password))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        info!(phone_number = %input.phone_number, "Created user");

        Ok(User {
            id,
            name: input.name,
            phone_number: input.phone_number,
        })
    }

    async fn get_by_id(&self, actor: Actor, id: Uuid) -> MarkazResult<User> {
        self.guard
            .check(&self.db, actor, Action::Select, Table::User, Target::none())
            .await?;
        self.fetch(id).await
    }

    async fn update(&self, actor: Actor, id: Uuid, input: UpdateUser) -> MarkazResult<User> {
        if let Some(name) = &input.name {
            validate::display_name(name)?;
        }
        if let Some(phone_number) = &input.phone_number {
            validate::phone_number(phone_number)?;
        }

        self.fetch(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Update,
                Table::User,
                Target::record(id),
            )
            .await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.phone_number.is_some() {
            sets.push("phone_number = $phone_number");
        }
        if input.password.is_some() {
            sets.push("password = $password");
        }
        if sets.is_empty() {
            return self.fetch(id).await;
        }

        let query = format!(
            "BEGIN TRANSACTION; \
             UPDATE type::record('user', $id) SET {}; \
             {}; \
             COMMIT TRANSACTION;",
            sets.join(", "),
            hooks::record_update(Table::User),
        );

        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(phone_number) = input.phone_number {
            builder = builder.bind(("phone_number", phone_number));
        }
        if let Some(password) = input.password {
            builder = builder.bind(("password", hash_password(&password)?));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        self.fetch(id).await
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        self.fetch(id).await?;
        self.guard
            .check(&self.db, actor, Action::Delete, Table::User, Target::none())
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('user', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::User),
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

    async fn list_users(&self, actor: Actor) -> MarkazResult<Vec<PublicUserInfo>> {
        self.guard
            .check(&self.db, actor, Action::Select, Table::User, Target::none())
            .await?;

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, name, phone_number FROM user")
            .await
            .map_err(DbError::from)?;
        let user_rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(user) AS user FROM scope \
                 WHERE scope_name = 'manage_center'",
            )
            .await
            .map_err(DbError::from)?;
        let manager_rows: Vec<ManagerRow> = result.take(0).map_err(DbError::from)?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(user) AS user, space.name AS space_name FROM scope \
                 WHERE scope_name = 'manage_space' AND space != NONE",
            )
            .await
            .map_err(DbError::from)?;
        let space_manager_rows: Vec<SpaceGrantRow> = result.take(0).map_err(DbError::from)?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(user) AS user, space.name AS space_name FROM scope \
                 WHERE scope_name NOT IN ['manage_center', 'manage_space'] \
                 AND space != NONE",
            )
            .await
            .map_err(DbError::from)?;
        let member_rows: Vec<SpaceGrantRow> = result.take(0).map_err(DbError::from)?;

        let mut users = Vec::with_capacity(user_rows.len());
        for row in user_rows {
            let user = row.try_into_user()?;
            let key = user.id.to_string();

            let is_center_manager = manager_rows.iter().any(|m| m.user == key);

            let mut manages_spaces: Vec<String> = Vec::new();
            for grant in space_manager_rows.iter().filter(|g| g.user == key) {
                if !manages_spaces.contains(&grant.space_name) {
                    manages_spaces.push(grant.space_name.clone());
                }
            }

            // Managed spaces are excluded from plain membership so a
            // space never shows up twice for the same user.
            let mut member_of_spaces: Vec<String> = Vec::new();
            for grant in member_rows.iter().filter(|g| g.user == key) {
                if !manages_spaces.contains(&grant.space_name)
                    && !member_of_spaces.contains(&grant.space_name)
                {
                    member_of_spaces.push(grant.space_name.clone());
                }
            }

            users.push(PublicUserInfo {
                id: user.id,
                name: user.name,
                phone_number: user.phone_number,
                is_center_manager,
                manages_spaces,
                member_of_spaces,
            });
        }

        Ok(users)
    }

    async fn who_can_reset_password_for(
        &self,
        phone_number: &str,
    ) -> MarkazResult<Vec<PasswordResetter>> {
        info!(phone_number = %phone_number, "Checking who can reset password");

        let mut resetters: Vec<PasswordResetter> = Vec::new();

        // Every center manager qualifies.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(user) AS id, user.name AS name, \
                 user.phone_number AS phone_number FROM scope \
                 WHERE scope_name = 'manage_center'",
            )
            .await
            .map_err(DbError::from)?;
        let manager_rows: Vec<GrantedUserRow> = result.take(0).map_err(DbError::from)?;

        for row in manager_rows {
            let id = parse_uuid(&row.id, "user")?;
            if !resetters.iter().any(|r| r.id == id) {
                resetters.push(PasswordResetter {
                    id,
                    name: row.name,
                    phone_number: row.phone_number,
                });
            }
        }

        // Managers of every space the subject belongs to, minus the
        // subject themselves.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(user) AS id, user.name AS name, \
                 user.phone_number AS phone_number FROM scope \
                 WHERE scope_name = 'manage_space' AND space IN \
                 (SELECT space FROM scope WHERE user IN \
                 (SELECT id FROM user WHERE phone_number = $phone_number).id).space",
            )
            .bind(("phone_number", phone_number.to_string()))
            .await
            .map_err(DbError::from)?;
        let space_manager_rows: Vec<GrantedUserRow> = result.take(0).map_err(DbError::from)?;

        for row in space_manager_rows {
            if row.phone_number == phone_number {
                continue;
            }
            let id = parse_uuid(&row.id, "user")?;
            if !resetters.iter().any(|r| r.id == id) {
                resetters.push(PasswordResetter {
                    id,
                    name: row.name,
                    phone_number: row.phone_number,
                });
            }
        }

        Ok(resetters)
    }
}
