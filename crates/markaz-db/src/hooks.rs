//! Write hooks composed into mutating transactions.
//!
//! The database schema historically expressed outbox appends and the
//! student-rename cascade as database-side event definitions. Here they
//! are explicit statements that repositories splice into the same
//! transaction as the triggering write, so mutation, denormalization,
//! and outbox append commit or abort as one atomic unit.
//!
//! All statements bind the mutated record's key as `$id`.

use markaz_core::authz::Table;

use crate::schema;

/// Columns captured in an outbox snapshot. The user's password column is
/// declared select-NONE and stays out of replication as well.
fn snapshot_projection(table: Table) -> &'static str {
    match table {
        Table::User => "name, phone_number",
        _ => "*",
    }
}

/// Append one outbox record for a just-created row, capturing the
/// post-mutation snapshot.
pub(crate) fn record_create(table: Table) -> String {
    record_create_as(table, "id")
}

/// Like [`record_create`], binding the record key under a different
/// parameter name. For transactions that create more than one record.
pub(crate) fn record_create_as(table: Table, id_param: &str) -> String {
    debug_assert!(schema::is_synced(table));
    format!(
        "CREATE sync SET record_id = type::record('{t}', ${i}), event = 'create', \
         content = (SELECT {p} FROM ONLY type::record('{t}', ${i})), pushed = false",
        t = table.name(),
        i = id_param,
        p = snapshot_projection(table),
    )
}

/// Append one outbox record for a just-updated row, capturing the
/// post-mutation snapshot.
pub(crate) fn record_update(table: Table) -> String {
    debug_assert!(schema::is_synced(table));
    format!(
        "CREATE sync SET record_id = type::record('{t}', $id), event = 'update', \
         content = (SELECT {p} FROM ONLY type::record('{t}', $id)), pushed = false",
        t = table.name(),
        p = snapshot_projection(table),
    )
}

/// Append one outbox record for a row about to be deleted, capturing the
/// pre-mutation snapshot. Must precede the DELETE inside the transaction.
pub(crate) fn record_delete(table: Table) -> String {
    debug_assert!(schema::is_synced(table));
    format!(
        "CREATE sync SET record_id = type::record('{t}', $id), event = 'delete', \
         content = (SELECT {p} FROM ONLY type::record('{t}', $id)), pushed = false",
        t = table.name(),
        p = snapshot_projection(table),
    )
}

/// Push a student's new name pair into every referencing enrollment.
/// Binds `$name` and `$search_name` alongside the student's `$id`.
pub(crate) const PROPAGATE_STUDENT_NAME: &str = "\
UPDATE enrollment SET name = $name, _name = $search_name \
 WHERE student = type::record('student', $id)";

/// Append one outbox record per enrollment touched by the rename cascade.
/// Each touched enrollment is itself a mutation of a tracked table.
pub(crate) const RECORD_PROPAGATED_ENROLLMENTS: &str = "\
FOR $row IN (SELECT * FROM enrollment WHERE student = type::record('student', $id)) { \
 CREATE sync SET record_id = $row.id, event = 'update', content = $row, pushed = false; \
}";
