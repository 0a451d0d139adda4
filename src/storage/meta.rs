//! The metadata record describing a stored object.
//!
//! One record per key, 1:1, co-located with the payload by the backend.
//! Records are immutable once saved: they are created at save time (the
//! engine fills in `file_size` as it copies bytes), read on every access,
//! and destroyed only by expiry-driven deletion.
//!
//! ## Wire Format
//!
//! Serialized as a flat JSON record:
//!
//! ```json
//! {"uploaded_on":"2026-08-29T10:00:00Z","mime_type":"text/plain","file_size":5}
//! ```
//!
//! `expires_on` is present only when an expiry is set; an absent field means
//! the object never expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// When the object expires. `None` means it never expires.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires_on: Option<DateTime<Utc>>,

    /// When the object was uploaded. Always set at creation.
    pub uploaded_on: DateTime<Utc>,

    /// MIME type supplied by the uploader (or defaulted upstream).
    pub mime_type: String,

    /// Payload size in bytes. Populated by the engine during save, not by
    /// the caller; the value passed into `save` is ignored.
    pub file_size: u64,
}

impl Metadata {
    /// Creates a record for an object that never expires, uploaded now.
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            expires_on: None,
            uploaded_on: Utc::now(),
            mime_type: mime_type.into(),
            file_size: 0,
        }
    }

    /// Creates a record for an object expiring `ttl` from now.
    pub fn with_expiry(mime_type: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            expires_on: Some(now + ttl),
            uploaded_on: now,
            mime_type: mime_type.into(),
            file_size: 0,
        }
    }

    /// Returns `true` if the object is past its expiry at `now`.
    ///
    /// The comparison is strict: an object whose expiry equals `now` exactly
    /// is not yet expired. Objects without an expiry never expire.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_on, Some(expiry) if now > expiry)
    }
}
