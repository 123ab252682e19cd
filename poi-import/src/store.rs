//! Storage gateway
//!
//! The reconciler talks to storage through [`StorageGateway`] and one
//! [`BatchSession`] per batch. A session is a transaction: nothing it writes
//! is visible until [`BatchSession::commit`], and dropping it uncommitted
//! discards everything.
//!
//! [`SqliteGateway`] is the production implementation over the shared `pois`
//! table.

use crate::error::ImportResult;
use crate::record::CanonicalRecord;
use async_trait::async_trait;
use poi_common::db::{PoiField, StoredPoi, POI_COLUMNS};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// Rows per multi-row INSERT (6 bound parameters each)
///
/// Keeps every statement well under SQLite's bound-parameter limit.
const INSERT_ROWS_PER_STATEMENT: usize = 500;

/// Identifiers per `IN (...)` lookup
const FETCH_IDS_PER_STATEMENT: usize = 900;

/// Entry point to the persisted store
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Open a transactional session for one batch
    async fn begin(&self) -> ImportResult<Box<dyn BatchSession>>;
}

/// Bulk primitives available inside one batch transaction
#[async_trait]
pub trait BatchSession: Send {
    /// Insert records whose `external_id` is not stored yet
    ///
    /// Existing identifiers are skipped, never overwritten. Returns the
    /// number of rows actually inserted.
    async fn insert_ignoring_conflicts(&mut self, records: &[&CanonicalRecord]) -> ImportResult<u64>;

    /// Load the stored records for exactly these identifiers
    async fn fetch_by_external_ids(&mut self, external_ids: &[String]) -> ImportResult<Vec<StoredPoi>>;

    /// Write `fields` of each record back, keyed by its surrogate id
    async fn update_fields(&mut self, records: &[StoredPoi], fields: &[PoiField]) -> ImportResult<()>;

    /// Make every write of this session visible
    async fn commit(self: Box<Self>) -> ImportResult<()>;
}

/// SQLite-backed gateway
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    /// Create new gateway with database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StorageGateway for SqliteGateway {
    async fn begin(&self) -> ImportResult<Box<dyn BatchSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteBatch { tx }))
    }
}

/// One batch transaction on SQLite
///
/// Dropping it without [`BatchSession::commit`] rolls the transaction back.
pub struct SqliteBatch {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl BatchSession for SqliteBatch {
    async fn insert_ignoring_conflicts(&mut self, records: &[&CanonicalRecord]) -> ImportResult<u64> {
        let mut inserted = 0u64;

        for rows in records.chunks(INSERT_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO pois (external_id, name, category, latitude, longitude, avg_rating) ",
            );
            builder.push_values(rows, |mut row, record| {
                row.push_bind(record.external_id().to_string())
                    .push_bind(record.name().to_string())
                    .push_bind(record.category().to_string())
                    .push_bind(record.latitude())
                    .push_bind(record.longitude())
                    .push_bind(record.avg_rating_f64());
            });

            let result = builder.build().execute(&mut *self.tx).await?;
            inserted += result.rows_affected();
        }

        debug!(offered = records.len(), inserted, "Bulk insert");
        Ok(inserted)
    }

    async fn fetch_by_external_ids(&mut self, external_ids: &[String]) -> ImportResult<Vec<StoredPoi>> {
        let mut stored = Vec::with_capacity(external_ids.len());

        for ids in external_ids.chunks(FETCH_IDS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {} FROM pois WHERE external_id IN (",
                POI_COLUMNS
            ));
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");

            let rows = builder
                .build_query_as::<StoredPoi>()
                .fetch_all(&mut *self.tx)
                .await?;
            stored.extend(rows);
        }

        Ok(stored)
    }

    async fn update_fields(&mut self, records: &[StoredPoi], fields: &[PoiField]) -> ImportResult<()> {
        if records.is_empty() || fields.is_empty() {
            return Ok(());
        }

        let assignments: Vec<String> = fields
            .iter()
            .map(|field| format!("{} = ?", field.column()))
            .collect();
        let sql = format!(
            "UPDATE pois SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            assignments.join(", ")
        );

        for record in records {
            let mut query = sqlx::query(&sql);
            for field in fields {
                query = match field {
                    PoiField::Name => query.bind(record.name.clone()),
                    PoiField::Category => query.bind(record.category.clone()),
                    PoiField::Latitude => query.bind(record.latitude),
                    PoiField::Longitude => query.bind(record.longitude),
                    PoiField::AvgRating => query.bind(record.avg_rating),
                };
            }
            query.bind(record.id).execute(&mut *self.tx).await?;
        }

        debug!(updated = records.len(), "Bulk update");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> ImportResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
