//! Shared test utilities
//!
//! - temporary SQLite databases
//! - an in-memory gateway that records every bulk call

#![allow(dead_code)]

use async_trait::async_trait;
use poi_common::db::{init_database, PoiField, StoredPoi};
use poi_import::{BatchSession, CanonicalRecord, ImportError, ImportResult, StorageGateway};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create temporary test database with the pois table
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_database(&temp_dir.path().join("test_pois.db"))
        .await
        .expect("Failed to initialize test database");
    (temp_dir, pool)
}

/// Canonical record with ratings given as decimal text
pub fn record(
    id: &str,
    name: &str,
    category: &str,
    coords: Option<(f64, f64)>,
    ratings: &[&str],
) -> CanonicalRecord {
    let ratings = ratings
        .iter()
        .map(|r| Decimal::from_str(r).expect("valid decimal"))
        .collect();
    CanonicalRecord::new(
        id,
        name,
        category,
        coords.map(|c| c.0),
        coords.map(|c| c.1),
        ratings,
    )
    .expect("record must have an id")
}

#[derive(Default)]
struct State {
    rows: BTreeMap<String, StoredPoi>,
    next_id: i64,
    begins: usize,
    commits: usize,
    insert_calls: usize,
    update_calls: Vec<Vec<String>>,
    fail_updates: bool,
}

/// In-memory gateway recording each bulk call
///
/// Sessions work on a copy of the rows and publish it on commit, so an
/// uncommitted session leaves nothing behind.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    state: Arc<Mutex<State>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `update_fields` call fail
    pub fn fail_updates(&self, fail: bool) {
        self.state.lock().unwrap().fail_updates = fail;
    }

    /// External ids carried by each `update_fields` call, in call order
    pub fn update_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().update_calls.clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn begins(&self) -> usize {
        self.state.lock().unwrap().begins
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn stored(&self, external_id: &str) -> Option<StoredPoi> {
        self.state.lock().unwrap().rows.get(external_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }
}

#[async_trait]
impl StorageGateway for RecordingGateway {
    async fn begin(&self) -> ImportResult<Box<dyn BatchSession>> {
        let mut state = self.state.lock().unwrap();
        state.begins += 1;
        Ok(Box::new(RecordingSession {
            gateway: self.clone(),
            rows: state.rows.clone(),
            next_id: state.next_id,
        }))
    }
}

struct RecordingSession {
    gateway: RecordingGateway,
    rows: BTreeMap<String, StoredPoi>,
    next_id: i64,
}

#[async_trait]
impl BatchSession for RecordingSession {
    async fn insert_ignoring_conflicts(&mut self, records: &[&CanonicalRecord]) -> ImportResult<u64> {
        self.gateway.state.lock().unwrap().insert_calls += 1;

        let now = chrono::Utc::now().naive_utc();
        let mut inserted = 0;
        for record in records {
            if self.rows.contains_key(record.external_id()) {
                continue;
            }
            self.next_id += 1;
            self.rows.insert(
                record.external_id().to_string(),
                StoredPoi {
                    id: self.next_id,
                    external_id: record.external_id().to_string(),
                    name: record.name().to_string(),
                    category: record.category().to_string(),
                    latitude: record.latitude(),
                    longitude: record.longitude(),
                    avg_rating: record.avg_rating_f64(),
                    created_at: now,
                    updated_at: now,
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn fetch_by_external_ids(&mut self, external_ids: &[String]) -> ImportResult<Vec<StoredPoi>> {
        Ok(external_ids
            .iter()
            .filter_map(|id| self.rows.get(id).cloned())
            .collect())
    }

    async fn update_fields(&mut self, records: &[StoredPoi], fields: &[PoiField]) -> ImportResult<()> {
        assert_eq!(fields, &PoiField::UPDATABLE[..], "unexpected field set");

        let fail = {
            let mut state = self.gateway.state.lock().unwrap();
            state
                .update_calls
                .push(records.iter().map(|r| r.external_id.clone()).collect());
            state.fail_updates
        };
        if fail {
            return Err(ImportError::Storage(sqlx::Error::Protocol(
                "injected update failure".to_string(),
            )));
        }

        for record in records {
            self.rows.insert(record.external_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> ImportResult<()> {
        let mut state = self.gateway.state.lock().unwrap();
        state.rows = self.rows;
        state.next_id = self.next_id;
        state.commits += 1;
        Ok(())
    }
}
