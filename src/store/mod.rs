//! Document-store abstraction over the hosted backend.
//!
//! The backing service is a remote document database with no cross-document
//! transactions: documents are fetched and re-saved wholesale, keyed by
//! (collection, id). Every document carries a version; writes are
//! compare-and-swap against the version observed at fetch time, so a stale
//! snapshot surfaces as `Conflict` instead of silently clobbering.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod remote;
pub mod sqlite;

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use sqlite::{init_store, SqliteStore};

/// Collection names used by the settlement core.
pub mod collections {
    /// One document per (owner, counterparty) pair, id `owner:counterparty`.
    pub const RELATIONS: &str = "relations";
    /// One document per transaction, id = transaction id.
    pub const TRANSACTIONS: &str = "transactions";
    /// One document per group, id = group id.
    pub const GROUPS: &str = "groups";
}

/// A fetched document body plus the version to CAS against on write.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub body: Value,
    pub version: i64,
}

/// Error type for store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The expected version did not match; refetch and retry the whole
    /// operation.
    #[error("version conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("rate limited")]
    RateLimited,
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for version conflicts, which are retryable after a refetch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Db(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}

/// Key-value document fetch/write interface supplied by the persistence
/// layer.
///
/// `put` semantics: `expected = Some(v)` succeeds only when the stored
/// version is exactly `v`; `expected = None` succeeds only when the
/// document does not exist yet. Both return the new version.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Fetch a document, or None if it does not exist.
    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError>;

    /// Compare-and-swap write. See the trait docs for `expected` semantics.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// List documents whose id starts with `id_prefix`, with their ids.
    async fn list(
        &self,
        collection: &str,
        id_prefix: &str,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError>;
}

/// Fetch and deserialize a document, returning the value with its version.
pub async fn fetch_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<Option<(T, i64)>, StoreError> {
    match store.fetch(collection, id).await? {
        Some(doc) => {
            let value = serde_json::from_value(doc.body)?;
            Ok(Some((value, doc.version)))
        }
        None => Ok(None),
    }
}

/// Serialize and write a document with CAS semantics.
pub async fn put_typed<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    value: &T,
    expected: Option<i64>,
) -> Result<i64, StoreError> {
    let body = serde_json::to_value(value)?;
    store.put(collection, id, body, expected).await
}
