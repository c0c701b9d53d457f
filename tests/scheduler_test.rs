use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use todo_sync::db::{SettingsRepository, SqliteStore};
use todo_sync::error::Error;
use todo_sync::models::Settings;
use todo_sync::probe::ConnectivityProbe;
use todo_sync::remote::NoopBackendClient;
use todo_sync::settings::SettingsStore;
use todo_sync::store::TodoStore;
use todo_sync::store::scheduler::SyncScheduler;

struct NullRepo;

#[async_trait]
impl SettingsRepository for NullRepo {
    async fn load(&self) -> Option<Settings> {
        Some(Settings {
            backend_url: "http://localhost:3001".to_string(),
            ..Default::default()
        })
    }

    async fn save(&self, _settings: &Settings) -> Result<(), Error> {
        Ok(())
    }
}

struct DeadProbe;

#[async_trait]
impl ConnectivityProbe for DeadProbe {
    async fn check(&self, _base_url: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn test_scheduler_survives_failing_sync_passes() {
    let local = Arc::new(
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to create local store"),
    );
    // Configured backend whose every call resolves absent, so each sync
    // pass fails.
    let settings = SettingsStore::load(Arc::new(NullRepo), Arc::new(DeadProbe)).await;
    let store = TodoStore::new(local, Arc::new(NoopBackendClient), settings);

    let scheduler = SyncScheduler::new(store.clone(), 1);
    let handle = tokio::spawn(async move {
        scheduler.start().await;
    });

    // Let a couple of passes run; the loop must still be alive afterwards.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!handle.is_finished());
    assert!(!store.is_syncing());

    handle.abort();
}
