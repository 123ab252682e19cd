//! File import pipeline
//!
//! read all rows → normalize → drop invalid → dedupe across the file →
//! plan batch size → apply batches sequentially.
//!
//! Deduplicating before chunking keeps batches on disjoint identifier sets.
//! A storage failure stops the file at the failing batch; batches committed
//! before it stay committed.

use crate::chunking::{chunk, plan_batch_size};
use crate::error::ImportResult;
use crate::normalizer::normalize;
use crate::readers::read_rows;
use crate::reconciler::{dedupe_last_wins, BatchReconciler, ImportRun};
use crate::record::{CanonicalRecord, RawRow, SourceFormat};
use crate::store::StorageGateway;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Import behavior switches
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Log progress after each batch when a file needs more than one batch
    pub show_progress: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { show_progress: true }
    }
}

/// Result of importing one file (or one row set)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    /// Raw rows produced by the reader
    pub rows_read: usize,
    /// Rows dropped for lacking an external identifier
    pub skipped_invalid: usize,
    /// Distinct identifiers applied to storage
    pub processed: usize,
    /// Rows newly created
    pub inserted: u64,
    /// Existing rows changed
    pub updated: usize,
    /// Batches applied
    pub batches: usize,
    /// Planned batch size (0 when nothing was applied)
    pub batch_size: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl FileSummary {
    fn empty(rows_read: usize, skipped_invalid: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            rows_read,
            skipped_invalid,
            processed: 0,
            inserted: 0,
            updated: 0,
            batches: 0,
            batch_size: 0,
            started_at,
            elapsed_ms: 0,
        }
    }

    /// Identifiers already stored with identical values
    pub fn unchanged(&self) -> usize {
        self.processed
            .saturating_sub(self.updated)
            .saturating_sub(self.inserted as usize)
    }
}

/// Progress line printed between batches
pub fn progress_message(processed: usize, total: usize) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        processed as f64 * 100.0 / total as f64
    };
    format!("Processed {}/{} records ({:.0}%)", processed, total, percent)
}

/// Drives normalization, chunking and reconciliation for whole inputs
pub struct Importer<G> {
    reconciler: BatchReconciler<G>,
    options: ImportOptions,
}

impl<G: StorageGateway> Importer<G> {
    pub fn new(gateway: G, options: ImportOptions) -> Self {
        Self {
            reconciler: BatchReconciler::new(gateway),
            options,
        }
    }

    pub fn reconciler(&self) -> &BatchReconciler<G> {
        &self.reconciler
    }

    /// Import one file, picking the reader by extension
    pub async fn import_file(&self, run: &mut ImportRun, path: &Path) -> ImportResult<FileSummary> {
        let format = SourceFormat::from_path(path)?;
        let rows = read_rows(path, format)?;
        info!(
            file = %path.display(),
            format = %format,
            rows = rows.len(),
            "Read source file"
        );
        self.import_rows(run, rows).await
    }

    /// Import an already materialized row set
    pub async fn import_rows(&self, run: &mut ImportRun, rows: Vec<RawRow>) -> ImportResult<FileSummary> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let rows_read = rows.len();

        let records: Vec<CanonicalRecord> = rows.iter().filter_map(normalize).collect();
        let skipped_invalid = rows_read - records.len();
        if skipped_invalid > 0 {
            debug!(skipped_invalid, "Rows without external identifier skipped");
        }

        let unique: Vec<CanonicalRecord> = dedupe_last_wins(&records).into_iter().cloned().collect();
        let total = unique.len();
        if total == 0 {
            return Ok(FileSummary::empty(rows_read, skipped_invalid, started_at));
        }

        let batch_size = plan_batch_size(total);
        let mut summary = FileSummary::empty(rows_read, skipped_invalid, started_at);
        summary.batch_size = batch_size;

        for batch in chunk(&unique, batch_size) {
            let outcome = self.reconciler.reconcile(run, batch).await?;
            summary.processed += outcome.processed;
            summary.inserted += outcome.inserted;
            summary.updated += outcome.updated;
            summary.batches += 1;

            if self.options.show_progress && batch_size != total {
                info!("{}", progress_message(summary.processed.min(total), total));
            }
        }

        summary.elapsed_ms = timer.elapsed().as_millis() as u64;
        info!(
            processed = summary.processed,
            inserted = summary.inserted,
            updated = summary.updated,
            skipped_invalid = summary.skipped_invalid,
            batches = summary.batches,
            elapsed_ms = summary.elapsed_ms,
            "Import complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message() {
        assert_eq!(progress_message(2500, 5000), "Processed 2500/5000 records (50%)");
        assert_eq!(progress_message(0, 0), "Processed 0/0 records (100%)");
    }

    #[test]
    fn test_summary_unchanged() {
        let mut summary = FileSummary::empty(10, 1, Utc::now());
        summary.processed = 9;
        summary.inserted = 4;
        summary.updated = 2;
        assert_eq!(summary.unchanged(), 3);
    }
}
