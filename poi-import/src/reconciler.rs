//! Batch reconciliation
//!
//! Applies one batch of canonical records to storage as an idempotent,
//! diff-aware upsert:
//! 1. Deduplicate by `external_id` (last record in the batch wins)
//! 2. Bulk insert, ignoring identifiers that already exist
//! 3. Re-fetch the stored rows for exactly this batch's identifiers
//! 4. Field-by-field exact comparison of the mutable fields
//! 5. One bulk update carrying only the rows that differ
//!
//! Steps 2–5 run in a single [`BatchSession`], so a failed batch leaves no
//! trace. Re-importing unchanged data performs no updates at all.

use crate::error::ImportResult;
use crate::record::CanonicalRecord;
use crate::store::{BatchSession, StorageGateway};
use poi_common::db::{PoiField, StoredPoi};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Counts for one applied batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Distinct identifiers in the batch (inserted, updated or unchanged)
    pub processed: usize,
    /// Rows newly created
    pub inserted: u64,
    /// Existing rows whose mutable fields changed
    pub updated: usize,
}

impl BatchOutcome {
    /// Identifiers that were already stored with identical values
    pub fn unchanged(&self) -> usize {
        self.processed
            .saturating_sub(self.updated)
            .saturating_sub(self.inserted as usize)
    }
}

/// Per-run context shared by every batch of one import run
///
/// Owned by the caller, so two runs never share state. Tracks which
/// identifiers earlier batches already applied, and running totals.
#[derive(Debug, Default)]
pub struct ImportRun {
    seen: HashSet<String>,
    batches: usize,
    processed: usize,
    inserted: u64,
    updated: usize,
}

impl ImportRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an earlier batch of this run already applied `external_id`
    pub fn has_seen(&self, external_id: &str) -> bool {
        self.seen.contains(external_id)
    }

    /// Distinct identifiers applied during the run
    pub fn distinct_identifiers(&self) -> usize {
        self.seen.len()
    }

    /// Batches applied during the run
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Sum of per-batch processed counts
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub fn updated(&self) -> usize {
        self.updated
    }

    fn record_batch<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>, outcome: &BatchOutcome) {
        self.seen.extend(ids.into_iter().map(str::to_string));
        self.batches += 1;
        self.processed += outcome.processed;
        self.inserted += outcome.inserted;
        self.updated += outcome.updated;
    }
}

/// Applies batches of canonical records through a [`StorageGateway`]
pub struct BatchReconciler<G> {
    gateway: G,
}

impl<G: StorageGateway> BatchReconciler<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Reconcile one batch, all-or-nothing
    ///
    /// Returns the per-batch counts; `processed` is the number of distinct
    /// identifiers in the batch. An empty batch never opens a transaction.
    /// A storage error rolls the batch back and is returned unchanged.
    pub async fn reconcile(
        &self,
        run: &mut ImportRun,
        batch: &[CanonicalRecord],
    ) -> ImportResult<BatchOutcome> {
        let incoming = dedupe_last_wins(batch);
        if incoming.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let repeated = incoming
            .iter()
            .filter(|record| run.has_seen(record.external_id()))
            .count();
        if repeated > 0 {
            warn!(
                repeated,
                "Batch repeats identifiers applied earlier in this run; later values win"
            );
        }

        let mut session = self.gateway.begin().await?;
        let outcome = apply(session.as_mut(), &incoming).await?;
        session.commit().await?;

        debug!(
            processed = outcome.processed,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged(),
            "Batch reconciled"
        );

        run.record_batch(incoming.iter().map(|r| r.external_id()), &outcome);
        Ok(outcome)
    }
}

/// Steps 2–5 inside an open session
async fn apply(
    session: &mut dyn BatchSession,
    incoming: &[&CanonicalRecord],
) -> ImportResult<BatchOutcome> {
    let inserted = session.insert_ignoring_conflicts(incoming).await?;

    let ids: Vec<String> = incoming.iter().map(|r| r.external_id().to_string()).collect();
    let by_id: HashMap<&str, &CanonicalRecord> =
        incoming.iter().map(|r| (r.external_id(), *r)).collect();

    let stored = session.fetch_by_external_ids(&ids).await?;
    if stored.len() != incoming.len() {
        warn!(
            expected = incoming.len(),
            fetched = stored.len(),
            "Stored rows missing after insert"
        );
    }

    let mut to_update = Vec::new();
    for mut row in stored {
        let Some(record) = by_id.get(row.external_id.as_str()) else {
            continue;
        };
        if apply_changes(&mut row, record) {
            to_update.push(row);
        }
    }

    if !to_update.is_empty() {
        session
            .update_fields(&to_update, &PoiField::UPDATABLE)
            .await?;
    }

    Ok(BatchOutcome {
        processed: incoming.len(),
        inserted,
        updated: to_update.len(),
    })
}

/// Deduplicate by `external_id`, keeping the last record for each key
///
/// Output order follows the first appearance of each identifier.
pub fn dedupe_last_wins(records: &[CanonicalRecord]) -> Vec<&CanonicalRecord> {
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<&CanonicalRecord> = Vec::with_capacity(records.len());

    for record in records {
        match position.get(record.external_id()) {
            Some(&index) => unique[index] = record,
            None => {
                position.insert(record.external_id(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Copy differing mutable fields from `incoming` into `stored`
///
/// Exact equality on every field; returns true if anything changed.
/// `external_id` is never touched.
pub fn apply_changes(stored: &mut StoredPoi, incoming: &CanonicalRecord) -> bool {
    let mut changed = false;

    if stored.name != incoming.name() {
        stored.name = incoming.name().to_string();
        changed = true;
    }
    if stored.category != incoming.category() {
        stored.category = incoming.category().to_string();
        changed = true;
    }
    if stored.latitude != incoming.latitude() {
        stored.latitude = incoming.latitude();
        changed = true;
    }
    if stored.longitude != incoming.longitude() {
        stored.longitude = incoming.longitude();
        changed = true;
    }
    let avg_rating = incoming.avg_rating_f64();
    if stored.avg_rating != avg_rating {
        stored.avg_rating = avg_rating;
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(id: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord::new(id, name, "cat", Some(1.0), Some(2.0), vec![Decimal::from(4)]).unwrap()
    }

    fn stored_from(record: &CanonicalRecord) -> StoredPoi {
        let now = chrono::DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        StoredPoi {
            id: 1,
            external_id: record.external_id().to_string(),
            name: record.name().to_string(),
            category: record.category().to_string(),
            latitude: record.latitude(),
            longitude: record.longitude(),
            avg_rating: record.avg_rating_f64(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_dedupe_keeps_last_value_first_position() {
        let records = vec![record("a", "first"), record("b", "b"), record("a", "second")];
        let unique = dedupe_last_wins(&records);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].external_id(), "a");
        assert_eq!(unique[0].name(), "second");
        assert_eq!(unique[1].external_id(), "b");
    }

    #[test]
    fn test_identical_record_is_unchanged() {
        let incoming = record("a", "Cafe");
        let mut stored = stored_from(&incoming);
        assert!(!apply_changes(&mut stored, &incoming));
    }

    #[test]
    fn test_single_field_change_detected() {
        let incoming = record("a", "Cafe");
        let mut stored = stored_from(&incoming);
        stored.category = "old".to_string();

        assert!(apply_changes(&mut stored, &incoming));
        assert_eq!(stored.category, "cat");
        assert_eq!(stored.external_id, "a");
    }

    #[test]
    fn test_rating_cleared_is_a_change() {
        let incoming = CanonicalRecord::new("a", "Cafe", "cat", Some(1.0), Some(2.0), vec![]).unwrap();
        let mut stored = stored_from(&record("a", "Cafe"));

        assert!(apply_changes(&mut stored, &incoming));
        assert_eq!(stored.avg_rating, None);
    }

    #[test]
    fn test_outcome_unchanged() {
        let outcome = BatchOutcome {
            processed: 10,
            inserted: 3,
            updated: 2,
        };
        assert_eq!(outcome.unchanged(), 5);
    }

    #[test]
    fn test_run_tracks_totals() {
        let mut run = ImportRun::new();
        let outcome = BatchOutcome {
            processed: 2,
            inserted: 1,
            updated: 1,
        };
        run.record_batch(["a", "b"], &outcome);
        run.record_batch(["b"], &BatchOutcome { processed: 1, ..Default::default() });

        assert!(run.has_seen("a"));
        assert!(!run.has_seen("c"));
        assert_eq!(run.distinct_identifiers(), 2);
        assert_eq!(run.batches(), 2);
        assert_eq!(run.processed(), 3);
        assert_eq!(run.inserted(), 1);
        assert_eq!(run.updated(), 1);
    }
}
