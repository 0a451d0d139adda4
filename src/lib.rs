//! # flashdrop - An Ephemeral File-Sharing Storage Engine
//!
//! flashdrop stores uploaded files under short random keys and forgets them
//! when their expiry passes. Clients upload a payload with an optional
//! expiry, receive a human-typable 20-character key, and later retrieve the
//! bytes or the metadata by that key.
//!
//! ## Features
//!
//! - **Pronounceable Keys**: alternating consonant/vowel pairs drawn from a
//!   105^10 key space, collision-avoided by probing the backend
//! - **Atomic Persistence**: payload and metadata are committed as a unit;
//!   a half-saved object is never observable
//! - **Lazy + Eager Expiry**: expired objects vanish on first access, and a
//!   background sweeper reclaims the ones nobody asks for
//! - **Backend-Agnostic**: callers depend on a small storage contract, not
//!   on the directory-of-files reference backend
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             flashdrop                               │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────────┐     │
//! │  │  Upstream   │───>│   Share     │───>│   Storage (trait)    │     │
//! │  │  handlers   │    │   Service   │    │ exists / metadata /  │     │
//! │  │ (HTTP, CLI) │    │             │    │    save / read       │     │
//! │  └─────────────┘    └──────┬──────┘    └──────────┬───────────┘     │
//! │                           │                      │                  │
//! │                           ▼                      ▼                  │
//! │                    ┌─────────────┐    ┌──────────────────────┐      │
//! │                    │  Key Codec  │    │ LocalStorage         │      │
//! │                    │ generate /  │    │  <key>      payload  │      │
//! │                    │ validate /  │    │  <key>.meta metadata │      │
//! │                    │ find free   │    └──────────┬───────────┘      │
//! │                    └─────────────┘               ▲                  │
//! │                                                  │                  │
//! │                              ┌───────────────────┴────────────────┐ │
//! │                              │          ExpirySweeper             │ │
//! │                              │      (Background Tokio Task)       │ │
//! │                              └────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use flashdrop::service::{ExpiryPolicy, ShareService};
//! use flashdrop::storage::{start_expiry_sweeper, LocalStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Open the store (this also sweeps leftovers from a previous run)
//!     let store = Arc::new(LocalStorage::open("drops").await?);
//!
//!     // Start the background expiry sweeper
//!     let _sweeper = start_expiry_sweeper(store.clone());
//!
//!     // Upload a payload that lives for one hour
//!     let service = ShareService::new(store);
//!     let mut payload: &[u8] = b"hello";
//!     let (key, meta) = service
//!         .upload("1h".parse::<ExpiryPolicy>()?, Some("text/plain"), &mut payload)
//!         .await?;
//!     println!("stored {} ({} bytes)", key, meta.file_size);
//!
//!     // Stream it back
//!     let mut sink = Vec::new();
//!     service.fetch_raw(&key, &mut sink).await?;
//!     assert_eq!(sink, b"hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`key`]: random key generation, syntax validation, free-key search
//! - [`storage`]: the storage contract, metadata model, local and in-memory
//!   backends, and the background expiry sweeper
//! - [`service`]: pre-engine validation (expiry policy, MIME) and the
//!   upload/fetch operations upstream handlers call
//!
//! ## Design Highlights
//!
//! ### One Expiry Code Path
//!
//! Every access runs lazy expiry inside `get_metadata`, and the eager sweep
//! routes each entry through the same call. Expiry is strict: an object
//! whose expiry equals the current instant is still alive; one nanosecond
//! later it is gone, and its absence is indistinguishable from never having
//! existed.
//!
//! ### Honest Races
//!
//! There is no cross-operation locking. Key allocation is probabilistic
//! (probe-and-retry over an astronomically large key space), same-key saves
//! race at the filesystem level, and a read can lose its payload to the
//! sweeper mid-flight - each of these windows is documented where it lives
//! rather than papered over.

pub mod key;
pub mod service;
pub mod storage;

// Re-export commonly used types for convenience
pub use key::{find_free_key, generate_key, validate_key, KeyError};
pub use service::{ExpiryPolicy, ShareError, ShareService};
pub use storage::{
    start_expiry_sweeper, ExpirySweeper, LocalStorage, MemoryStorage, Metadata, Storage,
    StorageError, Sweep, SweepConfig,
};

/// The default directory the CLI persists into
pub const DEFAULT_STORE_DIR: &str = "drops";

/// Version of flashdrop
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
