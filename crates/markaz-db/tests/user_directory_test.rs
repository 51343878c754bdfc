//! Integration tests for the user directory and password-reset helper.
//!
//! Mirrors the onboarding flow: a center admin, a space with a manager,
//! and a secretary holding a students scope.

use markaz_core::authz::{Actor, ScopeName};
use markaz_core::models::scope::CreateScope;
use markaz_core::models::space::CreateSpace;
use markaz_core::models::user::CreateUser;
use markaz_core::repository::{ScopeRepository, SpaceRepository, UserRepository};
use markaz_db::AccessGuard;
use markaz_db::repository::{
    SurrealScopeRepository, SurrealSpaceRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

const ADMIN_PHONE: &str = "+201096707442";
const MANAGER_PHONE: &str = "+201151002051";
const SECRETARY_PHONE: &str = "+201151002052";

struct Center {
    db: Surreal<Db>,
    guard: AccessGuard,
    admin: Actor,
    manager: Uuid,
    secretary: Uuid,
}

async fn setup() -> Center {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    markaz_db::initialize_center(&db).await.unwrap();

    let (admin, _) = markaz_db::initialize_local_admin(
        &db,
        CreateUser {
            name: "Test Admin".into(),
            phone_number: ADMIN_PHONE.into(),
            password: "0000".into(),
        },
    )
    .await
    .unwrap();
    let admin = Actor::new(admin.id);

    let guard = AccessGuard::new(markaz_db::compile().policy);
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let scopes = SurrealScopeRepository::new(db.clone(), guard);

    let space = spaces
        .create(admin, CreateSpace { name: "Test Space".into() })
        .await
        .unwrap();

    let manager = users
        .create(
            admin,
            CreateUser {
                name: "Test Manager".into(),
                phone_number: MANAGER_PHONE.into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();
    scopes
        .grant(
            admin,
            CreateScope {
                scope_name: ScopeName::ManageSpace,
                user: manager.id,
                space: Some(space.id),
            },
        )
        .await
        .unwrap();

    let secretary = users
        .create(
            admin,
            CreateUser {
                name: "Test Secretary".into(),
                phone_number: SECRETARY_PHONE.into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();
    scopes
        .grant(
            admin,
            CreateScope {
                scope_name: ScopeName::ManageStudents,
                user: secretary.id,
                space: Some(space.id),
            },
        )
        .await
        .unwrap();

    Center {
        db,
        guard,
        admin,
        manager: manager.id,
        secretary: secretary.id,
    }
}

#[tokio::test]
async fn directory_summarizes_capabilities_per_user() {
    let center = setup().await;
    let users = SurrealUserRepository::new(center.db.clone(), center.guard);

    let listed = users.list_users(center.admin).await.unwrap();
    assert_eq!(listed.len(), 3);

    let admin = listed
        .iter()
        .find(|u| u.phone_number == ADMIN_PHONE)
        .unwrap();
    assert!(admin.is_center_manager);
    assert!(admin.manages_spaces.is_empty());

    let manager = listed
        .iter()
        .find(|u| u.phone_number == MANAGER_PHONE)
        .unwrap();
    assert!(!manager.is_center_manager);
    assert_eq!(manager.manages_spaces, vec!["Test Space".to_string()]);
    // A managed space never doubles as plain membership.
    assert!(manager.member_of_spaces.is_empty());

    let secretary = listed
        .iter()
        .find(|u| u.phone_number == SECRETARY_PHONE)
        .unwrap();
    assert!(!secretary.is_center_manager);
    assert!(secretary.manages_spaces.is_empty());
    assert_eq!(secretary.member_of_spaces, vec!["Test Space".to_string()]);
}

#[tokio::test]
async fn directory_is_readable_without_any_grant() {
    let center = setup().await;
    let users = SurrealUserRepository::new(center.db.clone(), center.guard);

    // The secretary holds no user-table capability, but the directory is
    // center-wide readable.
    let listed = users.list_users(Actor::new(center.secretary)).await.unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
async fn only_the_admin_can_reset_the_space_manager_password() {
    let center = setup().await;
    let users = SurrealUserRepository::new(center.db.clone(), center.guard);

    let resetters = users
        .who_can_reset_password_for(MANAGER_PHONE)
        .await
        .unwrap();

    // The manager would qualify through their own space, but never for
    // themselves.
    assert_eq!(resetters.len(), 1);
    assert_eq!(resetters[0].phone_number, ADMIN_PHONE);
}

#[tokio::test]
async fn admin_and_space_manager_can_reset_the_secretary_password() {
    let center = setup().await;
    let users = SurrealUserRepository::new(center.db.clone(), center.guard);

    let resetters = users
        .who_can_reset_password_for(SECRETARY_PHONE)
        .await
        .unwrap();

    assert_eq!(resetters.len(), 2);
    assert!(resetters.iter().any(|r| r.phone_number == ADMIN_PHONE));
    assert!(resetters.iter().any(|r| r.phone_number == MANAGER_PHONE));
}

#[tokio::test]
async fn resetters_are_deduplicated_by_identity() {
    let center = setup().await;
    let users = SurrealUserRepository::new(center.db.clone(), center.guard);
    let scopes = SurrealScopeRepository::new(center.db.clone(), center.guard);

    // Make the admin a space manager of the secretary's space as well;
    // the admin must still appear exactly once.
    let listed = scopes
        .list_for_user(center.admin, center.manager)
        .await
        .unwrap();
    let space = listed[0].space.unwrap();

    scopes
        .grant(
            center.admin,
            CreateScope {
                scope_name: ScopeName::ManageSpace,
                user: center.admin.user_id,
                space: Some(space),
            },
        )
        .await
        .unwrap();

    let resetters = users
        .who_can_reset_password_for(SECRETARY_PHONE)
        .await
        .unwrap();

    assert_eq!(resetters.len(), 2);
    assert_eq!(
        resetters
            .iter()
            .filter(|r| r.phone_number == ADMIN_PHONE)
            .count(),
        1
    );
}

#[tokio::test]
async fn stored_passwords_verify_and_are_hashed() {
    let center = setup().await;

    #[derive(Debug, surrealdb_types::SurrealValue)]
    struct PasswordRow {
        password: String,
    }

    let mut result = center
        .db
        .query("SELECT password FROM user WHERE phone_number = $phone_number")
        .bind(("phone_number", ADMIN_PHONE.to_string()))
        .await
        .unwrap();
    let rows: Vec<PasswordRow> = result.take(0).unwrap();
    assert_eq!(rows.len(), 1);

    let hash = &rows[0].password;
    assert!(hash.starts_with("$argon2id$"));
    assert!(markaz_db::repository::verify_password("0000", hash).unwrap());
    assert!(!markaz_db::repository::verify_password("1234", hash).unwrap());
}
