//! Repository trait for archive record storage.

use crate::domain::entities::{ArchiveRecord, Collection, UpsertOutcome};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Storage port for archive records.
///
/// The admission gate never touches storage; handlers behind it do.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryArchiveRepository`] - in-process store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveRepository: Send + Sync {
    /// Inserts or updates records by natural key.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn upsert(
        &self,
        collection: Collection,
        items: Vec<Value>,
    ) -> Result<UpsertOutcome, AppError>;

    /// Lists records in insertion order.
    async fn list(
        &self,
        collection: Collection,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ArchiveRecord>, usize), AppError>;

    /// Deletes a record.
    ///
    /// Returns `Ok(false)` if no record with `id` exists.
    async fn delete(&self, collection: Collection, id: u64) -> Result<bool, AppError>;

    /// Connectivity probe for the readiness endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}
