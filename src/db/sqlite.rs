use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::db::LocalStore;
use crate::error::Error;
use crate::models::{CreateTodoRequest, Todo, UpdateTodoRequest};

/// Embedded-runtime persistence variant backed by a local SQLite database.
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) a database file and its schema.
    pub async fn open(path: &Path) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    /// Connects to an explicit database URL; used by tests with
    /// `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        // One connection: the store serializes mutations, and an in-memory
        // database only exists on the connection that created it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                completed BOOLEAN NOT NULL DEFAULT 0,
                priority TEXT NOT NULL DEFAULT 'medium',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                due_date TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { db: pool })
    }

    async fn fetch(&self, id: &str) -> Result<Option<Todo>, Error> {
        let todo = sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(todo)
    }

    async fn persist_update(&self, todo: &Todo) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE todos
            SET title = ?, description = ?, completed = ?, priority = ?, updated_at = ?, due_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority)
        .bind(todo.updated_at)
        .bind(todo.due_date)
        .bind(&todo.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn list(&self) -> Result<Vec<Todo>, Error> {
        let todos = sqlx::query_as::<_, Todo>("SELECT * FROM todos ORDER BY created_at DESC")
            .fetch_all(&self.db)
            .await?;
        Ok(todos)
    }

    async fn create(&self, request: CreateTodoRequest) -> Result<Todo, Error> {
        let todo = Todo::from_request(request);

        sqlx::query(
            r#"
            INSERT INTO todos (id, title, description, completed, priority, created_at, updated_at, due_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&todo.id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .bind(todo.due_date)
        .execute(&self.db)
        .await?;

        Ok(todo)
    }

    async fn update(
        &self,
        id: &str,
        request: UpdateTodoRequest,
    ) -> Result<Option<Todo>, Error> {
        let Some(mut todo) = self.fetch(id).await? else {
            return Ok(None);
        };
        todo.apply(request);
        self.persist_update(&todo).await?;
        Ok(Some(todo))
    }

    async fn toggle(&self, id: &str) -> Result<Option<Todo>, Error> {
        let Some(mut todo) = self.fetch(id).await? else {
            return Ok(None);
        };
        todo.completed = !todo.completed;
        todo.updated_at = chrono::Utc::now();
        self.persist_update(&todo).await?;
        Ok(Some(todo))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn clear_completed(&self) -> Result<Vec<Todo>, Error> {
        sqlx::query("DELETE FROM todos WHERE completed = 1")
            .execute(&self.db)
            .await?;
        self.list().await
    }

    async fn replace_all(&self, todos: Vec<Todo>) -> Result<(), Error> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM todos").execute(&mut *tx).await?;

        for todo in &todos {
            sqlx::query(
                r#"
                INSERT INTO todos (id, title, description, completed, priority, created_at, updated_at, due_date)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&todo.id)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(todo.priority)
            .bind(todo.created_at)
            .bind(todo.updated_at)
            .bind(todo.due_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    async fn setup_test_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("Failed to create test store")
    }

    fn request(title: &str) -> CreateTodoRequest {
        CreateTodoRequest {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_list_order() {
        let store = setup_test_store().await;

        let first = store.create(request("first")).await.expect("create failed");
        assert_eq!(first.priority, Priority::Medium);
        assert!(!first.completed);
        assert!(first.updated_at >= first.created_at);

        let second = store.create(request("second")).await.expect("create failed");

        let todos = store.list().await.expect("list failed");
        assert_eq!(todos.len(), 2);
        // Newest created first.
        assert_eq!(todos[0].id, second.id);
        assert_eq!(todos[1].id, first.id);
    }

    #[tokio::test]
    async fn test_create_honors_client_supplied_id() {
        let store = setup_test_store().await;

        let req = CreateTodoRequest {
            id: Some("client-id-1".to_string()),
            title: "correlated".to_string(),
            ..Default::default()
        };
        let todo = store.create(req).await.expect("create failed");
        assert_eq!(todo.id, "client-id-1");
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = setup_test_store().await;
        let todo = store.create(request("original")).await.expect("create failed");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoRequest {
                    title: Some("renamed".to_string()),
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .expect("update failed")
            .expect("todo not found");

        assert_eq!(updated.title, "renamed");
        assert!(updated.completed);
        // Untouched fields survive the merge.
        assert_eq!(updated.priority, todo.priority);
        assert_eq!(updated.created_at, todo.created_at);
        assert!(updated.updated_at >= todo.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_none() {
        let store = setup_test_store().await;
        let result = store
            .update("missing", UpdateTodoRequest::default())
            .await
            .expect("update failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_toggle_flips_completion() {
        let store = setup_test_store().await;
        let todo = store.create(request("toggle me")).await.expect("create failed");

        let toggled = store
            .toggle(&todo.id)
            .await
            .expect("toggle failed")
            .expect("todo not found");
        assert!(toggled.completed);

        let toggled_back = store
            .toggle(&todo.id)
            .await
            .expect("toggle failed")
            .expect("todo not found");
        assert!(!toggled_back.completed);
    }

    #[tokio::test]
    async fn test_delete_and_clear_completed() {
        let store = setup_test_store().await;
        let keep = store.create(request("keep")).await.expect("create failed");
        let done = store.create(request("done")).await.expect("create failed");
        let gone = store.create(request("gone")).await.expect("create failed");

        store.toggle(&done.id).await.expect("toggle failed");
        store.delete(&gone.id).await.expect("delete failed");

        let remaining = store.clear_completed().await.expect("clear failed");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_replace_all_is_wholesale() {
        let store = setup_test_store().await;
        store.create(request("stale")).await.expect("create failed");

        let fresh = vec![
            Todo::new("from server".to_string(), None, Priority::High),
            Todo::new("also from server".to_string(), None, Priority::Low),
        ];
        store
            .replace_all(fresh.clone())
            .await
            .expect("replace failed");

        let todos = store.list().await.expect("list failed");
        assert_eq!(todos.len(), 2);
        assert!(todos.iter().all(|t| t.title.contains("server")));
    }
}
