//! Upload and fetch orchestration over any [`Storage`] backend.

use crate::key::{find_free_key, validate_key, KeyError};
use crate::storage::{Metadata, Storage, StorageError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

/// Shortest expiry an uploader may request.
pub const MIN_EXPIRY: Duration = Duration::from_secs(60);

/// Longest expiry an uploader may request (365 days).
pub const MAX_EXPIRY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// MIME type used when the uploader supplies none.
pub const DEFAULT_MIME: &str = "text/plain";

/// Longest accepted MIME string, in bytes.
pub const MAX_MIME_LEN: usize = 255;

/// How long an uploaded object should live.
///
/// The validated entry point is [`FromStr`]: the empty string is rejected,
/// the literal `never` means no expiry, and anything else must be a
/// duration string within [`MIN_EXPIRY`]..=[`MAX_EXPIRY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// The object never expires.
    Never,
    /// The object expires this long after upload.
    After(Duration),
}

/// Rejections produced while parsing an [`ExpiryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("missing expiry")]
    Missing,

    #[error("invalid expiry {0:?}")]
    Invalid(String),

    #[error("minimum expiry is 1 minute")]
    TooShort,

    #[error("maximum expiry is 365 days")]
    TooLong,
}

impl FromStr for ExpiryPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(PolicyError::Missing),
            "never" => Ok(ExpiryPolicy::Never),
            other => {
                let ttl =
                    parse_duration(other).ok_or_else(|| PolicyError::Invalid(other.to_string()))?;
                if ttl < MIN_EXPIRY {
                    return Err(PolicyError::TooShort);
                }
                if ttl > MAX_EXPIRY {
                    return Err(PolicyError::TooLong);
                }
                Ok(ExpiryPolicy::After(ttl))
            }
        }
    }
}

/// Parses duration strings like `90s`, `5m`, `12h`, `7d`, or compound forms
/// like `1h30m`. Units: `ms`, `s`, `m`, `h`, `d`.
fn parse_duration(s: &str) -> Option<Duration> {
    let bytes = s.as_bytes();
    let mut total = Duration::ZERO;
    let mut i = 0;

    if bytes.is_empty() {
        return None;
    }

    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let value: u64 = s[digits_start..i].parse().ok()?;

        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let per_unit = match &s[unit_start..i] {
            "ms" => Duration::from_millis(1),
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(60 * 60),
            "d" => Duration::from_secs(24 * 60 * 60),
            _ => return None,
        };

        total = total.checked_add(per_unit.checked_mul(value.try_into().ok()?)?)?;
    }

    Some(total)
}

/// Classification of a [`ShareError`], for transport layers mapping errors
/// to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareErrorKind {
    /// Malformed input; never retried, produced before any side effect.
    Validation,
    /// The object is cleanly absent (or expired), distinct from failure.
    NotFound,
    /// Opaque internal failure; never retried automatically.
    Backend,
}

/// Errors surfaced by the share service.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("mime type is {0} bytes, maximum is {MAX_MIME_LEN}")]
    MimeTooLong(usize),

    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("no object stored under key {0:?}")]
    NotFound(String),

    #[error("key allocation failed: {0}")]
    Allocation(#[source] KeyError),

    #[error(transparent)]
    Storage(StorageError),
}

impl ShareError {
    /// Buckets this error into the coarse taxonomy transports care about.
    pub fn kind(&self) -> ShareErrorKind {
        match self {
            ShareError::Policy(_) | ShareError::MimeTooLong(_) | ShareError::InvalidKey(_) => {
                ShareErrorKind::Validation
            }
            ShareError::NotFound(_) => ShareErrorKind::NotFound,
            ShareError::Allocation(_) | ShareError::Storage(_) => ShareErrorKind::Backend,
        }
    }
}

impl From<StorageError> for ShareError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => ShareError::NotFound(key),
            StorageError::InvalidKey { key } => ShareError::InvalidKey(key),
            other => ShareError::Storage(other),
        }
    }
}

impl From<KeyError> for ShareError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::Storage(storage) => storage.into(),
            exhausted => ShareError::Allocation(exhausted),
        }
    }
}

/// Upload/fetch front end over a shared storage backend.
///
/// Cheap to clone per task; all state lives in the backend.
///
/// # Example
///
/// ```
/// use flashdrop::service::{ExpiryPolicy, ShareService};
/// use flashdrop::storage::MemoryStorage;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let service = ShareService::new(Arc::new(MemoryStorage::new()));
///
/// let mut payload: &[u8] = b"hello";
/// let (key, meta) = service
///     .upload(ExpiryPolicy::Never, Some("text/plain"), &mut payload)
///     .await
///     .unwrap();
/// assert_eq!(meta.file_size, 5);
///
/// let fetched = service.fetch_metadata(&key).await.unwrap();
/// assert_eq!(fetched, meta);
/// # });
/// ```
#[derive(Debug)]
pub struct ShareService<S: Storage + ?Sized> {
    store: Arc<S>,
}

impl<S: Storage + ?Sized> Clone for ShareService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Storage + ?Sized> ShareService<S> {
    /// Creates a service over the given backend.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stores an upload and returns its newly allocated key alongside the
    /// completed metadata record.
    ///
    /// An empty or absent MIME type defaults to [`DEFAULT_MIME`]; one longer
    /// than [`MAX_MIME_LEN`] bytes is rejected before the engine is touched.
    pub async fn upload(
        &self,
        policy: ExpiryPolicy,
        mime_type: Option<&str>,
        payload: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(String, Metadata), ShareError> {
        let mime_type = match mime_type {
            None | Some("") => DEFAULT_MIME,
            Some(mime) => mime,
        };
        if mime_type.len() > MAX_MIME_LEN {
            return Err(ShareError::MimeTooLong(mime_type.len()));
        }

        let key = find_free_key(self.store.as_ref()).await?;

        let meta = match policy {
            ExpiryPolicy::Never => Metadata::new(mime_type),
            ExpiryPolicy::After(ttl) => {
                let ttl = chrono::Duration::from_std(ttl).map_err(|_| PolicyError::TooLong)?;
                Metadata::with_expiry(mime_type, ttl)
            }
        };

        let saved = self.store.save(&key, meta, payload).await?;
        info!(key, size = saved.file_size, mime = saved.mime_type, "stored upload");

        Ok((key, saved))
    }

    /// Fetches the metadata record for `key`.
    ///
    /// Absent and expired objects both surface as [`ShareError::NotFound`].
    pub async fn fetch_metadata(&self, key: &str) -> Result<Metadata, ShareError> {
        if key.is_empty() || !validate_key(key) {
            return Err(ShareError::InvalidKey(key.to_string()));
        }

        self.store
            .get_metadata(key)
            .await?
            .ok_or_else(|| ShareError::NotFound(key.to_string()))
    }

    /// Streams the payload for `key` into `sink` and returns its metadata.
    ///
    /// The metadata is fetched first so callers can emit download headers
    /// (content type, length, attachment name) before or after streaming.
    pub async fn fetch_raw(
        &self,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata, ShareError> {
        let meta = self.fetch_metadata(key).await?;
        self.store.read(key, sink).await?;
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KEY_LENGTH;
    use crate::storage::MemoryStorage;

    fn service() -> ShareService<MemoryStorage> {
        ShareService::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("".parse::<ExpiryPolicy>(), Err(PolicyError::Missing));
        assert_eq!("never".parse::<ExpiryPolicy>(), Ok(ExpiryPolicy::Never));
        assert_eq!(
            "5m".parse::<ExpiryPolicy>(),
            Ok(ExpiryPolicy::After(Duration::from_secs(300)))
        );
        assert_eq!(
            "1h30m".parse::<ExpiryPolicy>(),
            Ok(ExpiryPolicy::After(Duration::from_secs(5400)))
        );
        assert_eq!("30s".parse::<ExpiryPolicy>(), Err(PolicyError::TooShort));
        assert_eq!("366d".parse::<ExpiryPolicy>(), Err(PolicyError::TooLong));
        assert_eq!(
            "zzz".parse::<ExpiryPolicy>(),
            Err(PolicyError::Invalid("zzz".to_string()))
        );
        assert_eq!(
            "5".parse::<ExpiryPolicy>(),
            Err(PolicyError::Invalid("5".to_string()))
        );
    }

    #[test]
    fn test_policy_bounds_are_inclusive() {
        assert_eq!(
            "1m".parse::<ExpiryPolicy>(),
            Ok(ExpiryPolicy::After(MIN_EXPIRY))
        );
        assert_eq!(
            "365d".parse::<ExpiryPolicy>(),
            Ok(ExpiryPolicy::After(MAX_EXPIRY))
        );
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("1500ms"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("1d12h"), Some(Duration::from_secs(129_600)));
        assert_eq!(parse_duration("m5"), None);
        assert_eq!(parse_duration("5x"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let service = service();

        let mut payload: &[u8] = b"hello";
        let (key, meta) = service
            .upload(ExpiryPolicy::Never, Some("text/plain"), &mut payload)
            .await
            .unwrap();

        assert_eq!(key.len(), KEY_LENGTH);
        assert_eq!(meta.file_size, 5);
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.expires_on, None);

        let mut sink = Vec::new();
        let fetched = service.fetch_raw(&key, &mut sink).await.unwrap();
        assert_eq!(fetched, meta);
        assert_eq!(sink, b"hello");
    }

    #[tokio::test]
    async fn test_upload_with_expiry_sets_expires_on() {
        let service = service();

        let mut payload: &[u8] = b"temporary";
        let (_key, meta) = service
            .upload(
                ExpiryPolicy::After(Duration::from_secs(3600)),
                None,
                &mut payload,
            )
            .await
            .unwrap();

        let expiry = meta.expires_on.expect("expiry should be set");
        assert!(expiry > meta.uploaded_on);
    }

    #[tokio::test]
    async fn test_mime_defaults_when_absent() {
        let service = service();

        let mut payload: &[u8] = b"x";
        let (_, meta) = service
            .upload(ExpiryPolicy::Never, None, &mut payload)
            .await
            .unwrap();
        assert_eq!(meta.mime_type, DEFAULT_MIME);

        let mut payload: &[u8] = b"x";
        let (_, meta) = service
            .upload(ExpiryPolicy::Never, Some(""), &mut payload)
            .await
            .unwrap();
        assert_eq!(meta.mime_type, DEFAULT_MIME);
    }

    #[tokio::test]
    async fn test_oversized_mime_rejected() {
        let service = service();
        let huge = "x".repeat(MAX_MIME_LEN + 1);

        let mut payload: &[u8] = b"x";
        let err = service
            .upload(ExpiryPolicy::Never, Some(&huge), &mut payload)
            .await
            .unwrap_err();

        assert!(matches!(err, ShareError::MimeTooLong(_)));
        assert_eq!(err.kind(), ShareErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_fetch_unknown_key_is_not_found() {
        let service = service();

        let err = service.fetch_metadata("wabezoki").await.unwrap_err();
        assert!(matches!(err, ShareError::NotFound(_)));
        assert_eq!(err.kind(), ShareErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_malformed_key_is_validation_error() {
        let service = service();

        for key in ["", "NotAKey", "../../etc/passwd"] {
            let err = service.fetch_metadata(key).await.unwrap_err();
            assert!(matches!(err, ShareError::InvalidKey(_)), "key {key:?}");
            assert_eq!(err.kind(), ShareErrorKind::Validation);
        }
    }
}
