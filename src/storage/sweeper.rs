//! Background Expiry Sweeper
//!
//! Lazy expiry (checking on access) has a gap: an object that expires and
//! is never accessed again would sit on disk forever. The sweeper closes it
//! by periodically walking the whole store and deleting everything past its
//! expiry, independently of request traffic.
//!
//! ## Design
//!
//! The sweeper runs as a single long-lived Tokio task for the lifetime of
//! the process, concurrently with all request handling:
//! 1. Sleeps for the configured interval (default: one hour)
//! 2. Wakes up and calls [`Sweep::sweep_expired`] on the backend
//! 3. Logs the result and goes back to sleep
//!
//! It talks to the backend only through the public [`Sweep`] capability,
//! and the backend routes sweep decisions through the same lazy-expiry path
//! used on reads, so the two deletion mechanisms cannot disagree.
//!
//! A failed pass is logged and the loop continues to its next tick; no
//! per-object or per-pass error is fatal to the process.

use crate::storage::Sweep;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Fixed interval between sweep passes (default: 1 hour).
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task is stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Returns a handle that can be used to stop the sweeper; it also stops
    /// automatically when the handle is dropped.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use flashdrop::storage::{LocalStorage, ExpirySweeper, SweepConfig};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(LocalStorage::open("drops").await?);
    /// let sweeper = ExpirySweeper::start(store, SweepConfig::default());
    ///
    /// // Sweeper runs in the background...
    ///
    /// // Dropping the handle stops it
    /// drop(sweeper);
    /// ```
    pub fn start(store: Arc<dyn Sweep>, config: SweepConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(store, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("Background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    store: Arc<dyn Sweep>,
    config: SweepConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        match store.sweep_expired().await {
            Ok(stats) => {
                if stats.expired > 0 || stats.corrupt > 0 {
                    debug!(
                        scanned = stats.scanned,
                        expired = stats.expired,
                        corrupt = stats.corrupt,
                        "Sweep pass removed objects"
                    );
                }
            }
            // Never fatal: log and try again next tick.
            Err(err) => error!(%err, "Sweep pass failed"),
        }
    }
}

/// Starts the expiry sweeper with default configuration.
///
/// This is a convenience function for simple use cases.
pub fn start_expiry_sweeper(store: Arc<dyn Sweep>) -> ExpirySweeper {
    ExpirySweeper::start(store, SweepConfig::default())
}
