//! Replication outbox reader.
//!
//! Repositories append sync records inside their write transactions (see
//! `hooks`); this module is the surface the external replication pusher
//! consumes. The pusher reads unpushed records in commit order, uploads
//! them, and flips `pushed` once delivery is confirmed — the only write
//! the outbox permits after insert. A crash between upload and flip
//! re-sends the same records on the next run, so delivery is
//! at-least-once and the remote side deduplicates by record id and
//! creation time.

use chrono::{DateTime, Utc};
use markaz_core::error::MarkazResult;
use markaz_core::models::sync::SyncEvent;
use surrealdb::{Connection, Surreal};
use surrealdb_types::{RecordId, SurrealValue};
use tracing::debug;

use crate::error::DbError;

/// One committed mutation awaiting replication.
#[derive(Debug, Clone)]
pub struct SyncRecord {
    /// The mutated entity's record id.
    pub record_id: RecordId,
    pub event: SyncEvent,
    /// Snapshot at event time; for deletes, the pre-mutation snapshot.
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub pushed: bool,
}

#[derive(Debug, SurrealValue)]
struct SyncRow {
    record_id: RecordId,
    event: String,
    content: serde_json::Value,
    created_at: DateTime<Utc>,
    pushed: bool,
}

impl SyncRow {
    fn try_into_record(self) -> Result<SyncRecord, DbError> {
        let event = match self.event.as_str() {
            "create" => SyncEvent::Create,
            "update" => SyncEvent::Update,
            "delete" => SyncEvent::Delete,
            other => {
                return Err(DbError::Decode(format!("unknown sync event: {other}")));
            }
        };
        Ok(SyncRecord {
            record_id: self.record_id,
            event,
            content: self.content,
            created_at: self.created_at,
            pushed: self.pushed,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Pusher-facing view of the sync table.
#[derive(Clone)]
pub struct SyncOutbox<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SyncOutbox<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Unpushed records in commit order, up to `limit`.
    pub async fn unpushed(&self, limit: u64) -> MarkazResult<Vec<SyncRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM sync WHERE pushed = false \
                 ORDER BY created_at ASC LIMIT $limit",
            )
            .bind(("limit", limit))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SyncRow> = result.take(0).map_err(DbError::from)?;
        debug!(count = rows.len(), "Collected unpushed sync records");

        Ok(rows
            .into_iter()
            .map(SyncRow::try_into_record)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    /// Number of records still awaiting replication.
    pub async fn count_unpushed(&self) -> MarkazResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM sync WHERE pushed = false \
                 GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    /// Mark every record of one entity as delivered. Safe to repeat; a
    /// record never transitions back to unpushed.
    pub async fn mark_pushed(&self, record_id: &RecordId) -> MarkazResult<()> {
        self.db
            .query("UPDATE sync SET pushed = true WHERE record_id = $record_id")
            .bind(("record_id", record_id.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        debug!(record_id = ?record_id, "Marked sync records as pushed");
        Ok(())
    }
}
