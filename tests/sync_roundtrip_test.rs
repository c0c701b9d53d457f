use std::sync::Arc;

use tempfile::TempDir;

use todo_sync::db::{JsonStore, SqliteStore};
use todo_sync::models::{CreateTodoRequest, SettingsPatch, UpdateTodoRequest};
use todo_sync::probe::{ConnectivityProbe, HttpProbe};
use todo_sync::remote::{BackendClient, HttpBackendClient};
use todo_sync::server::{self, AppState};
use todo_sync::settings::SettingsStore;
use todo_sync::store::TodoStore;
use todo_sync::{AppConfig, AppContext, StorageBackend};

/// Serves the reference backend on an ephemeral loopback port and returns
/// its base URL.
async fn spawn_server() -> String {
    let pool = server::init_db("sqlite::memory:")
        .await
        .expect("Failed to create server database");
    let app = server::router(AppState { db: pool });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server died");
    });
    format!("http://{}", addr)
}

/// One simulated device: its own settings file, local database, and HTTP
/// client against the shared backend.
struct Device {
    store: Arc<TodoStore>,
    settings: Arc<SettingsStore>,
    remote: Arc<HttpBackendClient>,
    _dir: TempDir,
}

async fn device(base_url: &str, user: &str) -> Device {
    let dir = tempfile::tempdir().expect("tempdir");
    let kv = Arc::new(JsonStore::new(dir.path().join("app.json")));
    let probe: Arc<dyn ConnectivityProbe> = Arc::new(HttpProbe::new());
    let settings = SettingsStore::load(kv, probe).await;
    settings
        .update(SettingsPatch {
            backend_url: Some(base_url.to_string()),
            user_id: Some(user.to_string()),
        })
        .await;

    let local = Arc::new(
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to create local store"),
    );
    let remote = Arc::new(HttpBackendClient::new(settings.clone()));
    let store = TodoStore::new(local, remote.clone(), settings.clone());

    Device {
        store,
        settings,
        remote,
        _dir: dir,
    }
}

fn request(title: &str) -> CreateTodoRequest {
    CreateTodoRequest {
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_connectivity_against_live_server() {
    let base_url = spawn_server().await;
    let device = device(&base_url, "alice").await;

    assert!(device.settings.check_connection().await);
    assert!(device.settings.is_connected());
    assert!(device.remote.health_check().await);
}

#[tokio::test]
async fn test_create_adopts_server_canonical_record() {
    let base_url = spawn_server().await;
    let device = device(&base_url, "alice").await;

    let created = device
        .store
        .create_todo(request("Buy milk"))
        .await
        .expect("create failed");

    // The server assigned the id; the collection holds exactly that record.
    let server_copy = device.remote.list_todos().await.expect("list failed");
    assert_eq!(server_copy.len(), 1);
    assert_eq!(created.id, server_copy[0].id);

    let todos = device.store.todos();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, server_copy[0].id);
    assert_eq!(todos[0].title, "Buy milk");
}

#[tokio::test]
async fn test_two_devices_converge_through_sync() {
    let base_url = spawn_server().await;

    let first = device(&base_url, "alice").await;
    let created = first
        .store
        .create_todo(request("shared task"))
        .await
        .expect("create failed");
    first.store.sync_with_backend().await;

    // A second device for the same user starts empty and reconciles on
    // load.
    let second = device(&base_url, "alice").await;
    second.store.load_todos().await;

    let todos = second.store.todos();
    assert_eq!(todos.len(), 1, "no duplicates after reconciliation");
    assert_eq!(todos[0].id, created.id);
    assert_eq!(todos[0].title, "shared task");
    assert!(second.store.last_sync().is_some());

    // Completion toggled on one device is visible to the other after its
    // next sync pass.
    second.store.toggle_todo(&created.id).await.expect("toggle failed");
    first.store.sync_with_backend().await;
    let seen = first
        .store
        .todos()
        .iter()
        .find(|t| t.id == created.id)
        .expect("todo missing")
        .completed;
    assert!(seen);
}

#[tokio::test]
async fn test_unreachable_backend_falls_back_to_local() {
    // Nothing listens on this address.
    let device = device("http://127.0.0.1:1", "alice").await;

    assert!(!device.settings.check_connection().await);

    let created = device
        .store
        .create_todo(request("offline work"))
        .await
        .expect("create failed");
    let updated = device
        .store
        .update_todo(
            &created.id,
            UpdateTodoRequest {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .expect("update failed");

    assert!(updated.completed);
    assert_eq!(updated.id, created.id);
    assert_eq!(device.store.todos().len(), 1);
}

#[tokio::test]
async fn test_app_context_wires_json_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        storage: StorageBackend::JsonFile,
    };

    let context = AppContext::init(config.clone()).await.expect("init failed");
    assert!(!context.settings.is_configured());
    context
        .store
        .create_todo(request("persists across contexts"))
        .await
        .expect("create failed");

    // A fresh context over the same data directory sees the collection.
    let reopened = AppContext::init(config).await.expect("init failed");
    reopened.store.load_todos().await;
    let todos = reopened.store.todos();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "persists across contexts");
}

#[tokio::test]
async fn test_app_context_wires_sqlite_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        storage: StorageBackend::Sqlite,
    };

    let context = AppContext::init(config.clone()).await.expect("init failed");
    context
        .store
        .create_todo(request("sqlite-backed"))
        .await
        .expect("create failed");

    let reopened = AppContext::init(config).await.expect("init failed");
    reopened.store.load_todos().await;
    assert_eq!(reopened.store.todos().len(), 1);
}
