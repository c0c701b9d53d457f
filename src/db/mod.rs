pub mod json;
pub mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Error;
use crate::models::{CreateTodoRequest, Settings, Todo, UpdateTodoRequest};

/// Local persistence for the todo collection. Implementations are stateless
/// pass-throughs: the store owns the in-memory collection, adapters only
/// read and write the durable copy.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, Error>;
    async fn create(&self, request: CreateTodoRequest) -> Result<Todo, Error>;
    async fn update(&self, id: &str, request: UpdateTodoRequest) -> Result<Option<Todo>, Error>;
    async fn toggle(&self, id: &str) -> Result<Option<Todo>, Error>;
    async fn delete(&self, id: &str) -> Result<(), Error>;
    /// Removes every completed todo and returns the remaining collection.
    async fn clear_completed(&self) -> Result<Vec<Todo>, Error>;
    /// Replaces the entire durable collection, atomically where the backend
    /// allows it.
    async fn replace_all(&self, todos: Vec<Todo>) -> Result<(), Error>;
}

/// Read/write contract for persisted settings.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns the persisted settings, or `None` when absent or unreadable.
    async fn load(&self) -> Option<Settings>;
    async fn save(&self, settings: &Settings) -> Result<(), Error>;
}
