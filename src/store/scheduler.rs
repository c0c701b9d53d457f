use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::store::TodoStore;

/// Re-runs the reconciliation protocol on a fixed interval. Failed passes
/// are logged inside the store and never break the loop; when no backend is
/// configured each pass is a no-op.
pub struct SyncScheduler {
    store: Arc<TodoStore>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(store: Arc<TodoStore>, interval_secs: u64) -> Self {
        Self {
            store,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn start(self) {
        info!("starting sync scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            self.store.sync_with_backend().await;
            debug!(
                "sync pass complete, {} todos in collection",
                self.store.stats().total
            );
        }
    }
}
