//! Schema compiler and migration runner.
//!
//! The schema is assembled from a declarative per-table catalog: each
//! entry carries the table's DDL fragment and whether its mutations are
//! recorded in the sync outbox. Compiling the catalog yields the DDL
//! document applied at initialization together with the access policy
//! the guard evaluates — one definition drives the storage layout, the
//! permission checks, and the outbox tracking.
//!
//! All table definitions use SCHEMAFULL mode for data integrity. Record
//! keys are UUIDs stored as record ids; enums are stored as strings with
//! ASSERT constraints.

use markaz_core::authz::{AccessPolicy, Table};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

// -----------------------------------------------------------------------
// Table catalog
// -----------------------------------------------------------------------

/// One table in the declarative schema catalog.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub table: Table,
    /// DDL fragment: table, field, and index definitions.
    pub ddl: &'static str,
    /// Whether mutations of this table are appended to the sync outbox.
    pub synced: bool,
}

const USER_DDL: &str = "\
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD phone_number ON TABLE user TYPE string;
DEFINE FIELD password ON TABLE user TYPE string \
    PERMISSIONS FOR select NONE;
DEFINE INDEX user_phone_number_index ON TABLE user \
    COLUMNS phone_number UNIQUE;
";

const SCOPE_DDL: &str = "\
DEFINE TABLE scope SCHEMAFULL;
DEFINE FIELD scope_name ON TABLE scope TYPE string \
    ASSERT $value IN ['manage_center', 'manage_space', 'manage_students', \
    'manage_groups', 'manage_academic_years', 'manage_academic_year_courses'];
DEFINE FIELD user ON TABLE scope TYPE record<user>;
DEFINE FIELD space ON TABLE scope TYPE option<record<space>>;
";

const SPACE_DDL: &str = "\
DEFINE TABLE space SCHEMAFULL;
DEFINE FIELD name ON TABLE space TYPE string;
";

const ACADEMIC_YEAR_DDL: &str = "\
DEFINE TABLE academic_year SCHEMAFULL;
DEFINE FIELD year ON TABLE academic_year TYPE int;
DEFINE FIELD space ON TABLE academic_year TYPE record<space>;
";

const ACADEMIC_YEAR_COURSE_DDL: &str = "\
DEFINE TABLE academic_year_course SCHEMAFULL;
DEFINE FIELD grade ON TABLE academic_year_course TYPE string;
DEFINE FIELD subjects ON TABLE academic_year_course TYPE array<string>;
DEFINE FIELD academic_year ON TABLE academic_year_course \
    TYPE record<academic_year>;
DEFINE FIELD space ON TABLE academic_year_course TYPE record<space>;
";

const GROUP_DDL: &str = "\
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD schedule ON TABLE group TYPE array<object> FLEXIBLE;
DEFINE FIELD academic_year ON TABLE group TYPE record<academic_year>;
DEFINE FIELD course ON TABLE group TYPE record<academic_year_course>;
DEFINE FIELD space ON TABLE group TYPE record<space>;
";

const STUDENT_DDL: &str = "\
DEFINE TABLE student SCHEMAFULL;
DEFINE FIELD name ON TABLE student TYPE string;
DEFINE FIELD _name ON TABLE student TYPE string;
DEFINE FIELD phone_numbers ON TABLE student TYPE array<object> FLEXIBLE;
DEFINE FIELD space ON TABLE student TYPE record<space>;
DEFINE INDEX student_name_index ON TABLE student FIELDS _name \
    SEARCH ANALYZER name_analyzer BM25;
";

const ENROLLMENT_DDL: &str = "\
DEFINE TABLE enrollment SCHEMAFULL;
DEFINE FIELD name ON TABLE enrollment TYPE string;
DEFINE FIELD _name ON TABLE enrollment TYPE string;
DEFINE FIELD student ON TABLE enrollment TYPE record<student>;
DEFINE FIELD default_group ON TABLE enrollment TYPE record<group>;
DEFINE FIELD academic_year ON TABLE enrollment TYPE record<academic_year>;
DEFINE FIELD course ON TABLE enrollment TYPE record<academic_year_course>;
DEFINE FIELD space ON TABLE enrollment TYPE record<space>;
DEFINE INDEX enrollment_student_name_index ON TABLE enrollment FIELDS _name \
    SEARCH ANALYZER name_analyzer BM25;
";

/// Edge-ngram analyzer backing the `_name` search indexes. Defined ahead
/// of the table fragments that reference it.
const NAME_ANALYZER_DDL: &str = "\
DEFINE ANALYZER name_analyzer TOKENIZERS blank FILTERS edgengram(2, 10);
";

/// The replication outbox. Append-only: client-level sessions may write
/// and read records but never change or remove them; the root-level
/// pusher flips `pushed` once delivery is confirmed, and nothing else.
const SYNC_DDL: &str = "\
DEFINE TABLE sync SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD record_id ON TABLE sync TYPE record;
DEFINE FIELD event ON TABLE sync TYPE string \
    ASSERT $value IN ['create', 'update', 'delete'];
DEFINE FIELD content ON TABLE sync TYPE object FLEXIBLE;
DEFINE FIELD created_at ON TABLE sync TYPE datetime DEFAULT time::now();
DEFINE FIELD pushed ON TABLE sync TYPE bool DEFAULT false;
DEFINE INDEX idx_sync_pushed ON TABLE sync COLUMNS pushed;
";

/// The full table catalog, one entry per resource table.
pub const CATALOG: [TableDef; 8] = [
    TableDef {
        table: Table::User,
        ddl: USER_DDL,
        synced: true,
    },
    TableDef {
        table: Table::Scope,
        ddl: SCOPE_DDL,
        synced: true,
    },
    TableDef {
        table: Table::Space,
        ddl: SPACE_DDL,
        synced: true,
    },
    TableDef {
        table: Table::AcademicYear,
        ddl: ACADEMIC_YEAR_DDL,
        synced: true,
    },
    TableDef {
        table: Table::AcademicYearCourse,
        ddl: ACADEMIC_YEAR_COURSE_DDL,
        synced: true,
    },
    TableDef {
        table: Table::Group,
        ddl: GROUP_DDL,
        synced: true,
    },
    TableDef {
        table: Table::Student,
        ddl: STUDENT_DDL,
        synced: true,
    },
    TableDef {
        table: Table::Enrollment,
        ddl: ENROLLMENT_DDL,
        synced: true,
    },
];

/// Whether mutations of `table` must be recorded in the sync outbox.
pub fn is_synced(table: Table) -> bool {
    CATALOG
        .iter()
        .find(|def| def.table == table)
        .is_some_and(|def| def.synced)
}

// -----------------------------------------------------------------------
// Compilation
// -----------------------------------------------------------------------

/// The compiled schema: the DDL document the migration runner applies and
/// the access policy the guard evaluates.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub ddl: String,
    pub policy: AccessPolicy,
}

/// Assemble the catalog into one declarative definition.
///
/// The analyzer comes first (the search indexes reference it), then every
/// table fragment in catalog order, then the sync outbox table.
pub fn compile() -> CompiledSchema {
    let mut ddl = String::from(NAME_ANALYZER_DDL);
    for def in CATALOG {
        ddl.push_str(def.ddl);
    }
    ddl.push_str(SYNC_DDL);

    CompiledSchema {
        ddl,
        policy: AccessPolicy::new(),
    }
}

// -----------------------------------------------------------------------
// Migration runner
// -----------------------------------------------------------------------

struct Migration {
    version: u32,
    name: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
}];

fn migration_sql(version: u32) -> String {
    match version {
        1 => compile().ddl,
        other => unreachable!("unknown migration version {other}"),
    }
}

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies each
/// migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration_sql(migration.version))
                .await?
                .check()
                .map_err(|e| {
                    DbError::Migration(format!(
                        "Migration v{} '{}' failed: {}",
                        migration.version, migration.name, e,
                    ))
                })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}
