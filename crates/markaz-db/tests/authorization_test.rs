//! Integration tests for scope authorization using in-memory SurrealDB.
//!
//! Covers the capability precedence rules end to end: center manager,
//! space manager, feature scopes, default deny, and immediate revocation.

use markaz_core::authz::{Actor, ScopeName};
use markaz_core::error::MarkazError;
use markaz_core::models::academic_year::CreateAcademicYear;
use markaz_core::models::group::CreateGroup;
use markaz_core::models::scope::CreateScope;
use markaz_core::models::space::CreateSpace;
use markaz_core::models::student::CreateStudent;
use markaz_core::models::user::CreateUser;
use markaz_core::repository::{
    AcademicYearRepository, GroupRepository, ScopeRepository, SpaceRepository, StudentRepository,
    UserRepository,
};
use markaz_db::AccessGuard;
use markaz_db::repository::{
    SurrealAcademicYearRepository, SurrealGroupRepository, SurrealScopeRepository,
    SurrealSpaceRepository, SurrealStudentRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Helper: spin up an in-memory center with a bootstrapped admin.
async fn setup() -> (Surreal<Db>, AccessGuard, Actor) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    markaz_db::initialize_center(&db).await.unwrap();

    let (admin, _) = markaz_db::initialize_local_admin(
        &db,
        CreateUser {
            name: "Test Admin".into(),
            phone_number: "+201096707442".into(),
            password: "0000".into(),
        },
    )
    .await
    .unwrap();

    let guard = AccessGuard::new(markaz_db::compile().policy);
    (db, guard, Actor::new(admin.id))
}

fn assert_denied<T: std::fmt::Debug>(result: Result<T, MarkazError>) {
    match result {
        Err(MarkazError::AuthorizationDenied { .. }) => {}
        other => panic!("expected AuthorizationDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn students_scope_does_not_unlock_groups() {
    let (db, guard, admin) = setup().await;
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let scopes = SurrealScopeRepository::new(db.clone(), guard);
    let students = SurrealStudentRepository::new(db.clone(), guard);
    let groups = SurrealGroupRepository::new(db.clone(), guard);
    let years = SurrealAcademicYearRepository::new(db.clone(), guard);

    let space = spaces
        .create(admin, CreateSpace { name: "Downtown".into() })
        .await
        .unwrap();
    let year = years
        .create(
            admin,
            CreateAcademicYear {
                year: 2024,
                space: space.id,
            },
        )
        .await
        .unwrap();

    let secretary = users
        .create(
            admin,
            CreateUser {
                name: "Secretary".into(),
                phone_number: "+201151002052".into(),
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

    let secretary = Actor::new(secretary.id);

    // Creating a student in the granted space is allowed.
    students
        .create(
            secretary,
            CreateStudent {
                name: "أحمد محمد".into(),
                phone_numbers: vec![],
                space: space.id,
            },
        )
        .await
        .unwrap();

    // Creating a group in the same space is not.
    assert_denied(
        groups
            .create(
                secretary,
                CreateGroup {
                    schedule: vec![],
                    academic_year: year.id,
                    course: uuid::Uuid::new_v4(),
                    space: space.id,
                },
            )
            .await,
    );
}

#[tokio::test]
async fn space_manager_is_confined_to_their_space() {
    let (db, guard, admin) = setup().await;
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let scopes = SurrealScopeRepository::new(db.clone(), guard);
    let students = SurrealStudentRepository::new(db.clone(), guard);

    let managed = spaces
        .create(admin, CreateSpace { name: "Managed".into() })
        .await
        .unwrap();
    let other = spaces
        .create(admin, CreateSpace { name: "Other".into() })
        .await
        .unwrap();

    let manager = users
        .create(
            admin,
            CreateUser {
                name: "Space Manager".into(),
                phone_number: "+201151002051".into(),
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
                space: Some(managed.id),
            },
        )
        .await
        .unwrap();

    let manager = Actor::new(manager.id);

    // Create and update inside the managed space.
    let student = students
        .create(
            manager,
            CreateStudent {
                name: "علي حسن".into(),
                phone_numbers: vec![],
                space: managed.id,
            },
        )
        .await
        .unwrap();
    students
        .rename(manager, student.id, "علي حسين".into())
        .await
        .unwrap();

    // Denied in any other space.
    assert_denied(
        students
            .create(
                manager,
                CreateStudent {
                    name: "خالد".into(),
                    phone_numbers: vec![],
                    space: other.id,
                },
            )
            .await,
    );
}

#[tokio::test]
async fn revoking_a_grant_takes_effect_on_the_next_request() {
    let (db, guard, admin) = setup().await;
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let scopes = SurrealScopeRepository::new(db.clone(), guard);
    let students = SurrealStudentRepository::new(db.clone(), guard);

    let space = spaces
        .create(admin, CreateSpace { name: "Branch".into() })
        .await
        .unwrap();
    let secretary = users
        .create(
            admin,
            CreateUser {
                name: "Secretary".into(),
                phone_number: "+201151002052".into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();
    let grant = scopes
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

    let secretary = Actor::new(secretary.id);

    students
        .create(
            secretary,
            CreateStudent {
                name: "سارة".into(),
                phone_numbers: vec![],
                space: space.id,
            },
        )
        .await
        .unwrap();

    scopes.revoke(admin, grant.id).await.unwrap();

    // The very next request depending solely on that grant is denied.
    assert_denied(
        students
            .create(
                secretary,
                CreateStudent {
                    name: "منى".into(),
                    phone_numbers: vec![],
                    space: space.id,
                },
            )
            .await,
    );
}

#[tokio::test]
async fn denied_writes_leave_no_trace() {
    let (db, guard, admin) = setup().await;
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let students = SurrealStudentRepository::new(db.clone(), guard);

    let space = spaces
        .create(admin, CreateSpace { name: "Branch".into() })
        .await
        .unwrap();
    let outsider = users
        .create(
            admin,
            CreateUser {
                name: "Outsider".into(),
                phone_number: "+201151002053".into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();

    assert_denied(
        students
            .create(
                Actor::new(outsider.id),
                CreateStudent {
                    name: "غادة".into(),
                    phone_numbers: vec![],
                    space: space.id,
                },
            )
            .await,
    );

    // No student row and no student sync record was written.
    let mut result = db.query("SELECT * FROM student").await.unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert!(rows.is_empty());

    let mut result = db
        .query("SELECT * FROM sync WHERE meta::tb(record_id) = 'student'")
        .await
        .unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn members_can_read_but_not_write_other_features() {
    let (db, guard, admin) = setup().await;
    let spaces = SurrealSpaceRepository::new(db.clone(), guard);
    let users = SurrealUserRepository::new(db.clone(), guard);
    let scopes = SurrealScopeRepository::new(db.clone(), guard);
    let students = SurrealStudentRepository::new(db.clone(), guard);
    let years = SurrealAcademicYearRepository::new(db.clone(), guard);

    let space = spaces
        .create(admin, CreateSpace { name: "Branch".into() })
        .await
        .unwrap();
    years
        .create(
            admin,
            CreateAcademicYear {
                year: 2024,
                space: space.id,
            },
        )
        .await
        .unwrap();
    students
        .create(
            admin,
            CreateStudent {
                name: "أحمد".into(),
                phone_numbers: vec![],
                space: space.id,
            },
        )
        .await
        .unwrap();

    let clerk = users
        .create(
            admin,
            CreateUser {
                name: "Groups Clerk".into(),
                phone_number: "+201151002054".into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();
    scopes
        .grant(
            admin,
            CreateScope {
                scope_name: ScopeName::ManageGroups,
                user: clerk.id,
                space: Some(space.id),
            },
        )
        .await
        .unwrap();

    let clerk = Actor::new(clerk.id);

    // Any grant in the space allows reading its resources.
    let listed = students
        .list(clerk, space.id, Default::default())
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    let listed_years = years.list_by_space(clerk, space.id).await.unwrap();
    assert_eq!(listed_years.len(), 1);

    // But not writing outside the granted feature.
    assert_denied(
        students
            .create(
                clerk,
                CreateStudent {
                    name: "هالة".into(),
                    phone_numbers: vec![],
                    space: space.id,
                },
            )
            .await,
    );
}

#[tokio::test]
async fn users_update_themselves_but_not_others() {
    let (db, guard, admin) = setup().await;
    let users = SurrealUserRepository::new(db.clone(), guard);

    let user = users
        .create(
            admin,
            CreateUser {
                name: "Plain User".into(),
                phone_number: "+201151002055".into(),
                password: "0000".into(),
            },
        )
        .await
        .unwrap();

    let actor = Actor::new(user.id);

    // Self-update works without any grant.
    let updated = users
        .update(
            actor,
            user.id,
            markaz_core::models::user::UpdateUser {
                name: Some("Renamed User".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed User");

    // Updating the admin's row is denied.
    let admin_id = admin.user_id;
    assert_denied(
        users
            .update(
                actor,
                admin_id,
                markaz_core::models::user::UpdateUser {
                    name: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .await,
    );

    // The center manager may update anyone.
    let updated = users
        .update(
            admin,
            user.id,
            markaz_core::models::user::UpdateUser {
                name: Some("Managed Rename".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Managed Rename");
}
