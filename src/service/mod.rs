//! Share Service Module
//!
//! This module is the layer upstream request handlers call. It owns the
//! validation that must happen before the storage engine is touched (expiry
//! policy bounds, MIME sanity, key syntax) and the orchestration of an
//! upload: find a free key, build the metadata record, save.
//!
//! ## Architecture
//!
//! ```text
//! Upstream handler (HTTP, CLI, ...)
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  ShareService   │  (this module)
//! │                 │
//! │  - Validate     │
//! │  - Allocate key │
//! │  - Orchestrate  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Storage (trait) │  (storage module)
//! └─────────────────┘
//! ```
//!
//! The service has no knowledge of HTTP. Errors carry a
//! [`kind()`](share::ShareError::kind) classification (validation /
//! not-found / backend) so a transport layer can map them to its own status
//! codes without matching individual variants.

pub mod share;

// Re-export commonly used types
pub use share::{ExpiryPolicy, PolicyError, ShareError, ShareErrorKind, ShareService};
