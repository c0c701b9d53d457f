pub mod handlers;
pub mod repository;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post, put};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::Error;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
}

/// Opens the server database and creates its schema.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    // An in-memory database only exists on the connection that created it.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
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

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_todos_user_id ON todos(user_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_todos_updated_at ON todos(updated_at)")
        .execute(&pool)
        .await?;

    Ok(pool)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/users/{user_id}/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/api/users/{user_id}/todos/{todo_id}",
            put(handlers::update_todo).delete(handlers::delete_todo),
        )
        .route("/api/users/{user_id}/sync", post(handlers::sync_todos))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
