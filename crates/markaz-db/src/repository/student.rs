//! SurrealDB implementation of [`StudentRepository`].
//!
//! The canonical search key `_name` is derived on every write that
//! touches `name`. A rename additionally pushes the new name pair into
//! every referencing enrollment — mutation, cascade, and outbox appends
//! commit as one transaction.

use markaz_core::authz::{Action, Actor, Table, Target};
use markaz_core::error::MarkazResult;
use markaz_core::models::student::{CreateStudent, Student, StudentPhoneNumber};
use markaz_core::normalize;
use markaz_core::repository::{PaginatedResult, Pagination, StudentRepository};
use markaz_core::validate;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::guard::AccessGuard;
use crate::hooks;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct StudentRowWithId {
    record_id: String,
    name: String,
    _name: String,
    phone_numbers: serde_json::Value,
    space: String,
}

impl StudentRowWithId {
    fn try_into_student(self) -> Result<Student, DbError> {
        let phone_numbers: Vec<StudentPhoneNumber> = serde_json::from_value(self.phone_numbers)
            .map_err(|e| DbError::Decode(format!("invalid student phone numbers: {e}")))?;
        Ok(Student {
            id: parse_uuid(&self.record_id, "student")?,
            name: self.name,
            search_name: self._name,
            phone_numbers,
            space: parse_uuid(&self.space, "space")?,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

const STUDENT_PROJECTION: &str = "\
meta::id(id) AS record_id, name, _name, phone_numbers, meta::id(space) AS space";

/// SurrealDB implementation of the Student repository.
#[derive(Clone)]
pub struct SurrealStudentRepository<C: Connection> {
    db: Surreal<C>,
    guard: AccessGuard,
}

impl<C: Connection> SurrealStudentRepository<C> {
    pub fn new(db: Surreal<C>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    async fn fetch(&self, id: Uuid) -> MarkazResult<Student> {
        let mut result = self
            .db
            .query(format!(
                "SELECT {STUDENT_PROJECTION} FROM type::record('student', $id)"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "student".into(),
            id: id.to_string(),
        })?;
        Ok(row.try_into_student()?)
    }
}

impl<C: Connection> StudentRepository for SurrealStudentRepository<C> {
    async fn create(&self, actor: Actor, input: CreateStudent) -> MarkazResult<Student> {
        validate::display_name(&input.name)?;
        for phone in &input.phone_numbers {
            validate::phone_number(&phone.number)?;
        }
        self.guard
            .check(
                &self.db,
                actor,
                Action::Create,
                Table::Student,
                Target::space(input.space),
            )
            .await?;

        let id = Uuid::new_v4();
        let search_name = normalize::search_key(&input.name);
        let phone_numbers = serde_json::to_value(&input.phone_numbers)
            .map_err(|e| DbError::Decode(format!("invalid student phone numbers: {e}")))?;

        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('student', $id) SET name = $name, \
             _name = $search_name, phone_numbers = $phone_numbers, \
             space = type::record('space', $space); \
             {}; \
             COMMIT TRANSACTION;",
            hooks::record_create(Table::Student),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("search_name", search_name.clone()))
            .bind(("phone_numbers", phone_numbers))
            .bind(("space", input.space.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Student {
            id,
            name: input.name,
            search_name,
            phone_numbers: input.phone_numbers,
            space: input.space,
        })
    }

    async fn get(&self, actor: Actor, id: Uuid) -> MarkazResult<Student> {
        let student = self.fetch(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::Student,
                Target::space(student.space),
            )
            .await?;
        Ok(student)
    }

    async fn list(
        &self,
        actor: Actor,
        space: Uuid,
        pagination: Pagination,
    ) -> MarkazResult<PaginatedResult<Student>> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::Student,
                Target::space(space),
            )
            .await?;

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM student \
                 WHERE space = type::record('space', $space) GROUP ALL",
            )
            .bind(("space", space.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT {STUDENT_PROJECTION} FROM student \
                 WHERE space = type::record('space', $space) \
                 ORDER BY _name ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("space", space.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(StudentRowWithId::try_into_student)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn search(
        &self,
        actor: Actor,
        space: Uuid,
        query: &str,
        limit: u64,
    ) -> MarkazResult<Vec<Student>> {
        self.guard
            .check(
                &self.db,
                actor,
                Action::Select,
                Table::Student,
                Target::space(space),
            )
            .await?;

        let mut result = self
            .db
            .query(format!(
                "SELECT {STUDENT_PROJECTION} FROM student \
                 WHERE space = type::record('space', $space) AND _name @@ $query \
                 LIMIT $limit"
            ))
            .bind(("space", space.to_string()))
            .bind(("query", normalize::search_key(query)))
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StudentRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(StudentRowWithId::try_into_student)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn rename(&self, actor: Actor, id: Uuid, name: String) -> MarkazResult<Student> {
        validate::display_name(&name)?;
        let current = self.fetch(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Update,
                Table::Student,
                Target::space(current.space),
            )
            .await?;

        // A rename to the identical name must not retrigger the cascade.
        if current.name == name {
            return Ok(current);
        }

        let search_name = normalize::search_key(&name);
        let query = format!(
            "BEGIN TRANSACTION; \
             UPDATE type::record('student', $id) SET name = $name, \
             _name = $search_name; \
             {propagate}; \
             {fanout}; \
             {record}; \
             COMMIT TRANSACTION;",
            propagate = hooks::PROPAGATE_STUDENT_NAME,
            fanout = hooks::RECORD_PROPAGATED_ENROLLMENTS,
            record = hooks::record_update(Table::Student),
        );

        self.db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("name", name.clone()))
            .bind(("search_name", search_name.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(Student {
            id,
            name,
            search_name,
            phone_numbers: current.phone_numbers,
            space: current.space,
        })
    }

    async fn delete(&self, actor: Actor, id: Uuid) -> MarkazResult<()> {
        let current = self.fetch(id).await?;
        self.guard
            .check(
                &self.db,
                actor,
                Action::Delete,
                Table::Student,
                Target::space(current.space),
            )
            .await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             {}; \
             DELETE type::record('student', $id); \
             COMMIT TRANSACTION;",
            hooks::record_delete(Table::Student),
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
