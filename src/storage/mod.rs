//! Storage Engine Module
//!
//! This module provides the core storage functionality for flashdrop:
//! the backend-agnostic storage contract, the metadata model, the two
//! concrete backends, and the background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Storage (trait)                          │
//! │   key_exists / get_metadata / save / read                   │
//! │        ▲                              ▲                     │
//! │        │                              │                     │
//! │  ┌─────┴────────┐            ┌────────┴───────┐             │
//! │  │ LocalStorage │            │ MemoryStorage  │             │
//! │  │ (dir of      │            │ (RwLock'd map, │             │
//! │  │  key + .meta │            │  test double / │             │
//! │  │  file pairs) │            │  alt backend)  │             │
//! │  └──────────────┘            └────────────────┘             │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ Sweep::sweep_expired
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Expiry Model
//!
//! Objects with an expiry are removed in two ways:
//! 1. **Lazy**: any access that discovers `now > expires_on` deletes the
//!    object and reports it absent. An expired object is never observable.
//! 2. **Eager**: the [`ExpirySweeper`] periodically walks the whole store
//!    and drives every entry through the same lazy-expiry path, so both
//!    mechanisms share one code path and one set of invariants.
//!
//! ## Example
//!
//! ```no_run
//! use flashdrop::storage::{LocalStorage, Metadata, Storage, start_expiry_sweeper};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), flashdrop::storage::StorageError> {
//! let store = Arc::new(LocalStorage::open("drops").await?);
//! let _sweeper = start_expiry_sweeper(store.clone());
//!
//! let meta = Metadata::new("text/plain");
//! let mut payload: &[u8] = b"hello";
//! let saved = store.save("lolipopa", meta, &mut payload).await?;
//! assert_eq!(saved.file_size, 5);
//! # Ok(())
//! # }
//! ```

pub mod local;
pub mod memory;
pub mod meta;
pub mod sweeper;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

// Re-export commonly used types
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use meta::Metadata;
pub use sweeper::{start_expiry_sweeper, ExpirySweeper, SweepConfig};

/// Errors surfaced by storage backends.
///
/// Every variant carries the key (and where useful, the operation) so
/// failures can be logged with enough context for operator diagnosis.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No live object is stored under this key. Covers both "never existed"
    /// and "existed but expired" - an expired object is indistinguishable
    /// from an absent one.
    #[error("no object stored under key {key:?}")]
    NotFound { key: String },

    /// The key contains characters outside `[a-z]` (or is empty) and was
    /// rejected before any backend resource was addressed.
    #[error("invalid key {key:?}")]
    InvalidKey { key: String },

    /// The metadata record exists but cannot be deserialized.
    #[error("corrupt metadata for key {key:?}: {source}")]
    CorruptMetadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// An I/O operation against the backing store failed.
    #[error("{op} failed for key {key:?}: {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Returns `true` if this error means the object is cleanly absent,
    /// as opposed to a backend failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// The storage contract every backend implements.
///
/// Upstream request handlers depend only on this trait, so backends can be
/// swapped at process startup without touching callers. Implementations must
/// be safe to share across concurrent tasks; no cross-operation locking is
/// provided or expected (see the race notes on [`Storage::save`]).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns whether a live (non-expired) object exists under `key`.
    async fn key_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Fetches the metadata record for `key`, or `None` if absent.
    ///
    /// Performs lazy expiry: a record past its expiry is deleted as a side
    /// effect (best-effort; deletion failures are logged, never propagated)
    /// and reported as `None` rather than returned stale.
    async fn get_metadata(&self, key: &str) -> Result<Option<Metadata>, StorageError>;

    /// Persists `payload` and its metadata under `key` as a unit.
    ///
    /// The payload is written first, with its byte count recorded into
    /// `file_size` of the returned record; metadata is written second and
    /// only on full success. Any failure removes the partial payload, so a
    /// half-saved object is never observable as valid.
    ///
    /// Concurrent saves to the *same* key race without engine-level locking:
    /// the last writer of each resource wins independently. Per-key
    /// uniqueness comes from random generation (see
    /// [`find_free_key`](crate::key::find_free_key)), not from allocation.
    async fn save(
        &self,
        key: &str,
        meta: Metadata,
        payload: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Metadata, StorageError>;

    /// Streams the full payload for `key` into `sink`.
    ///
    /// Re-confirms via [`get_metadata`](Storage::get_metadata) that the
    /// object is live before streaming; absent or expired objects fail with
    /// [`StorageError::NotFound`] rather than yielding stale bytes. Returns
    /// the number of bytes copied.
    async fn read(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, StorageError>;
}

/// Counters reported by one eager sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Metadata records examined.
    pub scanned: u64,
    /// Objects removed because their expiry had passed.
    pub expired: u64,
    /// Objects removed because metadata or payload was corrupt or orphaned.
    pub corrupt: u64,
}

/// Capability for backends that support an eager full-store expiry pass.
///
/// The background [`ExpirySweeper`] drives backends only through this public
/// operation, and implementations route every entry through the same lazy
/// expiry used by on-demand accesses, so the sweep cannot diverge from
/// request-driven behavior.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Walks the whole store, deleting expired and corrupt objects.
    ///
    /// Per-object failures are logged and skipped; one bad entry must never
    /// halt expiry processing for the rest of the store.
    async fn sweep_expired(&self) -> Result<SweepStats, StorageError>;
}
