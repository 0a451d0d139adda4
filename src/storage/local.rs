//! Directory-of-files reference backend.
//!
//! Each stored object is two co-located files in the root directory, named
//! by the key: the payload at `<key>` and the metadata record at
//! `<key>.meta`. There is no in-memory index or cache shadowing the
//! directory - every operation's view is the current on-disk truth, at the
//! cost of a filesystem round-trip per operation.
//!
//! ## Concurrency
//!
//! No cross-operation locking. Two concurrent saves to the same key
//! interleave at the filesystem-call level; the last writer of each file
//! wins independently. A read racing the sweeper can lose its data file
//! after passing the metadata check; that surfaces as a clean
//! [`StorageError::NotFound`], retryable by the caller.

use crate::key::validate_key;
use crate::storage::{Metadata, Storage, StorageError, Sweep, SweepStats};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

/// Suffix distinguishing metadata files from payload files.
const META_SUFFIX: &str = ".meta";

/// Storage backend persisting objects as file pairs under a root directory.
///
/// # Example
///
/// ```no_run
/// use flashdrop::storage::{LocalStorage, Metadata, Storage};
///
/// # async fn demo() -> Result<(), flashdrop::storage::StorageError> {
/// let store = LocalStorage::open("drops").await?;
///
/// let mut payload: &[u8] = b"hello";
/// let saved = store.save("lolipopa", Metadata::new("text/plain"), &mut payload).await?;
/// assert_eq!(saved.file_size, 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Opens (creating if necessary) a store rooted at `root` and runs one
    /// eager expiry sweep so restarts do not serve stale objects until the
    /// first periodic tick.
    ///
    /// The periodic sweep itself is the caller's to start, via
    /// [`start_expiry_sweeper`](crate::storage::start_expiry_sweeper).
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|source| StorageError::Io {
            op: "create store directory",
            key: String::new(),
            source,
        })?;

        let store = Self { root };
        let stats = store.sweep_expired().await?;
        debug!(
            root = %store.root.display(),
            scanned = stats.scanned,
            expired = stats.expired,
            corrupt = stats.corrupt,
            "opened local store"
        );

        Ok(store)
    }

    /// The directory this store persists into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{META_SUFFIX}"))
    }

    /// Rejects keys that could escape the root directory before any path is
    /// built from them.
    fn check_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || !validate_key(key) {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Removes both files of an object. Missing files are not errors; both
    /// removals are attempted even if the first fails.
    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        let data = remove_if_present(&self.data_path(key)).await;
        let meta = remove_if_present(&self.meta_path(key)).await;

        data.and(meta).map_err(|source| StorageError::Io {
            op: "delete",
            key: key.to_string(),
            source,
        })
    }

    /// Expiry-triggered deletion. Best-effort: a deletion hiccup is logged
    /// and never masks the "absent" result the caller needs.
    async fn remove_expired(&self, key: &str) {
        if let Err(err) = self.remove_object(key).await {
            warn!(key, %err, "failed to delete expired object");
        }
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn key_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get_metadata(key).await?.is_some())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<Metadata>, StorageError> {
        Self::check_key(key)?;

        let bytes = match fs::read(self.meta_path(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    op: "read metadata",
                    key: key.to_string(),
                    source,
                })
            }
        };

        let meta: Metadata =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::CorruptMetadata {
                key: key.to_string(),
                source,
            })?;

        if meta.is_expired(Utc::now()) {
            self.remove_expired(key).await;
            return Ok(None);
        }

        Ok(Some(meta))
    }

    async fn save(
        &self,
        key: &str,
        mut meta: Metadata,
        payload: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Metadata, StorageError> {
        Self::check_key(key)?;

        let data_path = self.data_path(key);
        let mut file = fs::File::create(&data_path)
            .await
            .map_err(|source| StorageError::Io {
                op: "create payload",
                key: key.to_string(),
                source,
            })?;

        // Payload first. If the copy fails the partial file must not be
        // left behind to pair with a later metadata write.
        let copied = match io::copy(payload, &mut file).await {
            Ok(n) => n,
            Err(source) => {
                drop(file);
                if let Err(err) = remove_if_present(&data_path).await {
                    warn!(key, %err, "failed to remove partial payload");
                }
                return Err(StorageError::Io {
                    op: "write payload",
                    key: key.to_string(),
                    source,
                });
            }
        };

        if let Err(source) = file.flush().await {
            drop(file);
            if let Err(err) = remove_if_present(&data_path).await {
                warn!(key, %err, "failed to remove partial payload");
            }
            return Err(StorageError::Io {
                op: "write payload",
                key: key.to_string(),
                source,
            });
        }
        drop(file);

        meta.file_size = copied;

        // Metadata second, and only on full success; a failure here removes
        // the payload so the object can never be observed half-saved.
        let json = serde_json::to_vec(&meta).map_err(|source| StorageError::CorruptMetadata {
            key: key.to_string(),
            source,
        })?;

        if let Err(source) = fs::write(self.meta_path(key), &json).await {
            if let Err(err) = self.remove_object(key).await {
                warn!(key, %err, "failed to clean up after metadata write failure");
            }
            return Err(StorageError::Io {
                op: "write metadata",
                key: key.to_string(),
                source,
            });
        }

        Ok(meta)
    }

    async fn read(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, StorageError> {
        // get_metadata performs the key check and lazy expiry.
        if self.get_metadata(key).await?.is_none() {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }

        let mut file = match fs::File::open(self.data_path(key)).await {
            Ok(file) => file,
            // The sweeper (or a lazy expiry elsewhere) can win a race and
            // delete the payload between our metadata check and this open.
            // That is a clean not-found, not an I/O failure.
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(source) => {
                return Err(StorageError::Io {
                    op: "open payload",
                    key: key.to_string(),
                    source,
                })
            }
        };

        let copied = io::copy(&mut file, sink)
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

        Ok(copied)
    }
}

#[async_trait]
impl Sweep for LocalStorage {
    /// Walks the root directory once, deleting everything past its expiry
    /// plus corrupt and orphaned entries.
    ///
    /// Expiry decisions are delegated to [`Storage::get_metadata`], so the
    /// sweep and on-demand accesses share one expiry code path. Files whose
    /// names are not valid keys are foreign to the store and left alone.
    async fn sweep_expired(&self) -> Result<SweepStats, StorageError> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|source| StorageError::Io {
            op: "list store directory",
            key: String::new(),
            source,
        })?;

        let mut stats = SweepStats::default();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "failed to advance directory listing during sweep");
                    break;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }

            match name.strip_suffix(META_SUFFIX) {
                Some(key) => {
                    if !validate_key(key) || key.is_empty() {
                        continue;
                    }
                    stats.scanned += 1;

                    match self.get_metadata(key).await {
                        // Lazy expiry inside get_metadata already deleted it.
                        Ok(None) => stats.expired += 1,
                        Ok(Some(_)) => {
                            // Live record; verify the payload actually exists.
                            if !fs::try_exists(self.data_path(key)).await.unwrap_or(true) {
                                debug!(key, "metadata without payload, deleting");
                                self.remove_expired(key).await;
                                stats.corrupt += 1;
                            }
                        }
                        Err(StorageError::CorruptMetadata { .. }) => {
                            debug!(key, "undecodable metadata, deleting");
                            self.remove_expired(key).await;
                            stats.corrupt += 1;
                        }
                        // One broken entry never halts the rest of the sweep.
                        Err(err) => error!(key, %err, "sweep failed to inspect object"),
                    }
                }
                None => {
                    // Payload file. If its metadata sibling is gone the save
                    // never completed (or a deletion half-failed); drop it.
                    if !validate_key(&name) || name.is_empty() {
                        continue;
                    }
                    let meta_present =
                        fs::try_exists(self.meta_path(&name)).await.unwrap_or(true);
                    let data_present =
                        fs::try_exists(self.data_path(&name)).await.unwrap_or(false);
                    if !meta_present && data_present {
                        debug!(key = %name, "payload without metadata, deleting");
                        if let Err(err) = remove_if_present(&self.data_path(&name)).await {
                            warn!(key = %name, %err, "failed to delete orphaned payload");
                        } else {
                            stats.corrupt += 1;
                        }
                    }
                }
            }
        }

        Ok(stats)
    }
}
