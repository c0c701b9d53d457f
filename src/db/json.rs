use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::db::{LocalStore, SettingsRepository};
use crate::error::Error;
use crate::models::{CreateTodoRequest, Settings, Todo, UpdateTodoRequest};

const TODOS_KEY: &str = "todos";
const SETTINGS_KEY: &str = "todo_app_settings";

/// Browser-storage persistence variant: a flat key-value file with the todo
/// collection serialized as one array under a single key and settings under
/// a separate key.
pub struct JsonStore {
    path: PathBuf,
    // Serializes read-modify-write cycles against the backing file.
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, Value>, Error> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, Value>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(map)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    async fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let map = self.read_map().await?;
        match map.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    async fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_map(&map).await
    }

    async fn read_todos(&self) -> Result<Vec<Todo>, Error> {
        Ok(self.read_key(TODOS_KEY).await?.unwrap_or_default())
    }
}

#[async_trait]
impl LocalStore for JsonStore {
    async fn list(&self) -> Result<Vec<Todo>, Error> {
        let _guard = self.lock.lock().await;
        self.read_todos().await
    }

    async fn create(&self, request: CreateTodoRequest) -> Result<Todo, Error> {
        let _guard = self.lock.lock().await;
        let todo = Todo::from_request(request);
        let mut todos = self.read_todos().await?;
        todos.insert(0, todo.clone());
        self.write_key(TODOS_KEY, &todos).await?;
        Ok(todo)
    }

    async fn update(
        &self,
        id: &str,
        request: UpdateTodoRequest,
    ) -> Result<Option<Todo>, Error> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read_todos().await?;
        let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        todo.apply(request);
        let updated = todo.clone();
        self.write_key(TODOS_KEY, &todos).await?;
        Ok(Some(updated))
    }

    async fn toggle(&self, id: &str) -> Result<Option<Todo>, Error> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read_todos().await?;
        let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        todo.completed = !todo.completed;
        todo.updated_at = chrono::Utc::now();
        let updated = todo.clone();
        self.write_key(TODOS_KEY, &todos).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read_todos().await?;
        todos.retain(|t| t.id != id);
        self.write_key(TODOS_KEY, &todos).await
    }

    async fn clear_completed(&self) -> Result<Vec<Todo>, Error> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read_todos().await?;
        todos.retain(|t| !t.completed);
        self.write_key(TODOS_KEY, &todos).await?;
        Ok(todos)
    }

    async fn replace_all(&self, todos: Vec<Todo>) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        self.write_key(TODOS_KEY, &todos).await
    }
}

#[async_trait]
impl SettingsRepository for JsonStore {
    async fn load(&self) -> Option<Settings> {
        let _guard = self.lock.lock().await;
        match self.read_key(SETTINGS_KEY).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!("failed to read persisted settings, using defaults: {}", err);
                None
            }
        }
    }

    async fn save(&self, settings: &Settings) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        self.write_key(SETTINGS_KEY, settings).await
    }
}
