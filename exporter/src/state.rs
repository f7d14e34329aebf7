//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinError;

use collector::{Scrape, Snapshot};

/// Shared state held by the HTTP handlers.
///
/// Collection is blocking, so each scrape runs on the blocking pool. The
/// scrape lock guarantees at most one collection in flight: the guard moves
/// into the blocking task, so a client hanging up mid-scrape does not let a
/// second collection start early.
pub struct AppState {
    /// Collector driven once per `/metrics` request.
    pub collector: Arc<dyn Scrape>,
    scrape_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(collector: Arc<dyn Scrape>) -> Self {
        Self {
            collector,
            scrape_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one collection, waiting for any scrape already in flight.
    pub async fn scrape(&self) -> Result<Snapshot, JoinError> {
        let guard = self.scrape_lock.clone().lock_owned().await;
        let collector = self.collector.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            collector.scrape()
        })
        .await
    }
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
