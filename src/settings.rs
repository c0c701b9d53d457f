use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info};

use crate::db::SettingsRepository;
use crate::models::{Settings, SettingsPatch};
use crate::probe::ConnectivityProbe;

/// Holds the application settings slot: backend endpoint, user identity, and
/// last-known connectivity. Loaded once at startup, persisted on every
/// mutation.
pub struct SettingsStore {
    // Shared with detached connectivity checks, which outlive the borrow of
    // the call that spawned them.
    inner: Arc<RwLock<Settings>>,
    repo: Arc<dyn SettingsRepository>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl SettingsStore {
    pub async fn load(
        repo: Arc<dyn SettingsRepository>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Arc<Self> {
        let settings = repo.load().await.unwrap_or_default();
        Arc::new(Self {
            inner: Arc::new(RwLock::new(settings)),
            repo,
            probe,
        })
    }

    pub fn snapshot(&self) -> Settings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn backend_url(&self) -> String {
        self.snapshot().backend_url
    }

    pub fn user_id(&self) -> String {
        self.snapshot().user_id
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().is_connected
    }

    /// True iff a backend endpoint is set.
    pub fn is_configured(&self) -> bool {
        !self.snapshot().backend_url.is_empty()
    }

    /// Probes the configured endpoint and records the result. Unconfigured
    /// forces the flag to false without probing.
    pub async fn check_connection(&self) -> bool {
        Self::run_check(Arc::clone(&self.inner), Arc::clone(&self.probe)).await
    }

    async fn run_check(
        inner: Arc<RwLock<Settings>>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> bool {
        let url = inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .backend_url
            .clone();

        let connected = if url.is_empty() {
            debug!("not configured, skipping connection check");
            false
        } else {
            let connected = probe.check(&url).await;
            info!("connection check against {}: {}", url, connected);
            connected
        };

        inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .is_connected = connected;
        connected
    }

    /// Merges the patch into the current settings and persists the result.
    /// A change to the backend URL re-triggers the connectivity check as a
    /// detached task; the flag is eventually consistent and this call does
    /// not wait for it.
    pub async fn update(&self, patch: SettingsPatch) {
        let url_changed = patch.backend_url.is_some();

        let snapshot = {
            let mut settings = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(backend_url) = patch.backend_url {
                settings.backend_url = backend_url;
            }
            if let Some(user_id) = patch.user_id {
                settings.user_id = user_id;
            }
            settings.clone()
        };

        if let Err(err) = self.repo.save(&snapshot).await {
            error!("failed to persist settings: {}", err);
        }

        if url_changed {
            let inner = Arc::clone(&self.inner);
            let probe = Arc::clone(&self.probe);
            tokio::spawn(async move {
                Self::run_check(inner, probe).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::error::Error;

    #[derive(Default)]
    struct MemoryRepo {
        saved: Mutex<Option<Settings>>,
    }

    #[async_trait]
    impl SettingsRepository for MemoryRepo {
        async fn load(&self) -> Option<Settings> {
            self.saved.lock().expect("lock").clone()
        }

        async fn save(&self, settings: &Settings) -> Result<(), Error> {
            *self.saved.lock().expect("lock") = Some(settings.clone());
            Ok(())
        }
    }

    struct FakeProbe {
        reachable: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(reachable: bool) -> Self {
            Self {
                reachable: AtomicBool::new(reachable),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConnectivityProbe for FakeProbe {
        async fn check(&self, _base_url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_persisted() {
        let store = SettingsStore::load(
            Arc::new(MemoryRepo::default()),
            Arc::new(FakeProbe::new(true)),
        )
        .await;

        assert!(!store.is_configured());
        assert!(!store.is_connected());
        assert_eq!(store.user_id(), "default-user");
    }

    #[tokio::test]
    async fn test_check_connection_forces_false_when_unconfigured() {
        let probe = Arc::new(FakeProbe::new(true));
        let store =
            SettingsStore::load(Arc::new(MemoryRepo::default()), probe.clone()).await;

        assert!(!store.check_connection().await);
        assert!(!store.is_connected());
        // The probe must not even be asked.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_connection_records_probe_result() {
        let probe = Arc::new(FakeProbe::new(true));
        let repo = Arc::new(MemoryRepo::default());
        repo.save(&Settings {
            backend_url: "http://localhost:3001".to_string(),
            ..Default::default()
        })
        .await
        .expect("save failed");

        let store = SettingsStore::load(repo, probe.clone()).await;
        assert!(store.check_connection().await);
        assert!(store.is_connected());

        probe.reachable.store(false, Ordering::SeqCst);
        assert!(!store.check_connection().await);
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_update_merges_and_persists() {
        let repo = Arc::new(MemoryRepo::default());
        let store = SettingsStore::load(repo.clone(), Arc::new(FakeProbe::new(true))).await;

        store
            .update(SettingsPatch {
                user_id: Some("alice".to_string()),
                ..Default::default()
            })
            .await;

        let saved = repo.load().await.expect("nothing persisted");
        assert_eq!(saved.user_id, "alice");
        assert_eq!(saved.backend_url, "");
        // No URL in the patch, so no connectivity check was scheduled.
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_url_update_triggers_detached_check() {
        let probe = Arc::new(FakeProbe::new(true));
        let store =
            SettingsStore::load(Arc::new(MemoryRepo::default()), probe.clone()).await;

        store
            .update(SettingsPatch {
                backend_url: Some("http://localhost:3001".to_string()),
                ..Default::default()
            })
            .await;

        // The check runs detached; give it a moment to land.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert!(store.is_connected());
    }
}
