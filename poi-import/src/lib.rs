//! poi-import library interface
//!
//! Normalization and reconciliation engine for points-of-interest imports.
//! Exposed as a library for the CLI and for integration testing.

pub mod chunking;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod rating;
pub mod readers;
pub mod reconciler;
pub mod record;
pub mod store;

pub use crate::error::{ImportError, ImportResult};
pub use crate::pipeline::{FileSummary, ImportOptions, Importer};
pub use crate::reconciler::{BatchOutcome, BatchReconciler, ImportRun};
pub use crate::record::{CanonicalRecord, RawRow, SourceFormat};
pub use crate::store::{BatchSession, SqliteGateway, StorageGateway};
