use std::path::PathBuf;
use std::sync::Arc;

use crate::db::{JsonStore, LocalStore, SqliteStore};
use crate::error::Error;
use crate::probe::{ConnectivityProbe, HttpProbe};
use crate::remote::{BackendClient, HttpBackendClient};
use crate::settings::SettingsStore;
use crate::store::TodoStore;

/// Which local persistence variant backs the todo collection. Chosen once
/// at startup; nothing sniffs the environment per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    JsonFile,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
}

/// Process-lifetime application root: owns settings and the todo store and
/// wires persistence, probe, and backend client together. Settings always
/// live in the key-value file; the todo collection lives wherever the
/// configured backend puts it.
pub struct AppContext {
    pub settings: Arc<SettingsStore>,
    pub store: Arc<TodoStore>,
}

impl AppContext {
    pub async fn init(config: AppConfig) -> Result<Self, Error> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let kv = Arc::new(JsonStore::new(config.data_dir.join("app.json")));
        let probe: Arc<dyn ConnectivityProbe> = Arc::new(HttpProbe::new());
        let settings = SettingsStore::load(kv.clone(), probe).await;

        let local: Arc<dyn LocalStore> = match config.storage {
            StorageBackend::Sqlite => {
                Arc::new(SqliteStore::open(&config.data_dir.join("todo.db")).await?)
            }
            StorageBackend::JsonFile => kv,
        };
        let remote: Arc<dyn BackendClient> =
            Arc::new(HttpBackendClient::new(settings.clone()));

        let store = TodoStore::new(local, remote, settings.clone());

        Ok(Self { settings, store })
    }
}
