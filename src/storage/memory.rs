//! In-memory storage backend.
//!
//! Holds whole objects in a `RwLock`'d map. Everything is lost on process
//! exit, which makes this backend a fast test double and a demonstration
//! that the [`Storage`] contract carries no filesystem assumptions. Expiry
//! semantics are identical to the local backend: lazy on access, eager via
//! [`Sweep::sweep_expired`].

use crate::key::validate_key;
use crate::storage::{Metadata, Storage, StorageError, Sweep, SweepStats};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One stored object: the metadata record plus the full payload.
#[derive(Debug, Clone)]
struct StoredObject {
    meta: Metadata,
    payload: Bytes,
}

/// Storage backend keeping all objects in process memory.
///
/// # Example
///
/// ```
/// use flashdrop::storage::{MemoryStorage, Metadata, Storage};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStorage::new();
///
/// let mut payload: &[u8] = b"hello";
/// let saved = store.save("lolipopa", Metadata::new("text/plain"), &mut payload).await.unwrap();
/// assert_eq!(saved.file_size, 5);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, counting expired-but-unswept objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || !validate_key(key) {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn key_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_metadata(key).await?.is_some())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<Metadata>, StorageError> {
        Self::check_key(key)?;

        // Fast path: read lock for live objects.
        {
            let objects = self.objects.read().unwrap();
            match objects.get(key) {
                Some(object) if !object.meta.is_expired(Utc::now()) => {
                    return Ok(Some(object.meta.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: take the write lock and delete it.
        let mut objects = self.objects.write().unwrap();
        if let Some(object) = objects.get(key) {
            if object.meta.is_expired(Utc::now()) {
                objects.remove(key);
                return Ok(None);
            }
            // Another task replaced the object since the read probe.
            return Ok(Some(object.meta.clone()));
        }

        Ok(None)
    }

    async fn save(
        &self,
        key: &str,
        mut meta: Metadata,
        payload: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Metadata, StorageError> {
        Self::check_key(key)?;

        let mut buf = Vec::new();
        payload
            .read_to_end(&mut buf)
            .await
            .map_err(|source| StorageError::Io {
                op: "write payload",
                key: key.to_string(),
                source,
            })?;

        meta.file_size = buf.len() as u64;

        let mut objects = self.objects.write().unwrap();
        objects.insert(
            key.to_string(),
            StoredObject {
                meta: meta.clone(),
                payload: Bytes::from(buf),
            },
        );

        Ok(meta)
    }

    async fn read(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, StorageError> {
        if self.get_metadata(key).await?.is_none() {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }

        // Clone out of the lock; Bytes clones are cheap reference bumps and
        // the sink write must not happen under the lock.
        let payload = {
            let objects = self.objects.read().unwrap();
            match objects.get(key) {
                Some(object) => object.payload.clone(),
                None => {
                    return Err(StorageError::NotFound {
                        key: key.to_string(),
                    })
                }
            }
        };

        sink.write_all(&payload)
            .await
            .map_err(|source| StorageError::Io {
                op: "stream payload",
                key: key.to_string(),
                source,
            })?;
        sink.flush().await.map_err(|source| StorageError::Io {
            op: "stream payload",
            key: key.to_string(),
            source,
        })?;

        Ok(payload.len() as u64)
    }
}

#[async_trait]
impl Sweep for MemoryStorage {
    async fn sweep_expired(&self) -> Result<SweepStats, StorageError> {
        let now = Utc::now();
        let mut objects = self.objects.write().unwrap();

        let before = objects.len() as u64;
        objects.retain(|_, object| !object.meta.is_expired(now));

        Ok(SweepStats {
            scanned: before,
            expired: before - objects.len() as u64,
            corrupt: 0,
        })
    }
}
