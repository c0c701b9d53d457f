use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{CreateTodoRequest, SyncRequest, SyncResponse, Todo, UpdateTodoRequest};

const TODO_COLUMNS: &str =
    "id, title, description, completed, priority, created_at, updated_at, due_date";

pub async fn fetch_todos(db: &SqlitePool, user_id: &str) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn find_todo_by_id(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(&format!(
        "SELECT {TODO_COLUMNS} FROM todos WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Inserts a new todo for the user. The server assigns the id; a
/// client-supplied correlation id in the request is deliberately ignored.
pub async fn insert_todo(
    db: &SqlitePool,
    user_id: &str,
    request: CreateTodoRequest,
) -> Result<Todo, sqlx::Error> {
    let mut todo = Todo::new(
        request.title,
        request.description,
        request.priority.unwrap_or_default(),
    );
    todo.due_date = request.due_date;

    sqlx::query(
        r#"
        INSERT INTO todos (id, user_id, title, description, completed, priority, created_at, updated_at, due_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&todo.id)
    .bind(user_id)
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.completed)
    .bind(todo.priority)
    .bind(todo.created_at)
    .bind(todo.updated_at)
    .bind(todo.due_date)
    .execute(db)
    .await?;

    Ok(todo)
}

pub async fn update_todo(
    db: &SqlitePool,
    user_id: &str,
    id: &str,
    request: UpdateTodoRequest,
) -> Result<Option<Todo>, sqlx::Error> {
    let Some(mut todo) = find_todo_by_id(db, user_id, id).await? else {
        return Ok(None);
    };
    todo.apply(request);

    sqlx::query(
        r#"
        UPDATE todos
        SET title = ?, description = ?, completed = ?, priority = ?, updated_at = ?, due_date = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.completed)
    .bind(todo.priority)
    .bind(todo.updated_at)
    .bind(todo.due_date)
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(Some(todo))
}

pub async fn delete_todo(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Bulk-sync merge: unknown uploaded ids are inserted as-is; on a collision
/// the strictly newer `updated_at` wins. The reply is the user's collection
/// (full, or the `updated_at > last_sync` window when the client sent one)
/// plus the server-side sync time.
pub async fn sync_todos(
    db: &SqlitePool,
    user_id: &str,
    request: SyncRequest,
) -> Result<SyncResponse, sqlx::Error> {
    let now = Utc::now();

    for todo in request.todos {
        match find_todo_by_id(db, user_id, &todo.id).await? {
            Some(existing) => {
                if todo.updated_at > existing.updated_at {
                    sqlx::query(
                        r#"
                        UPDATE todos
                        SET title = ?, description = ?, completed = ?, priority = ?, updated_at = ?, due_date = ?
                        WHERE id = ? AND user_id = ?
                        "#,
                    )
                    .bind(&todo.title)
                    .bind(&todo.description)
                    .bind(todo.completed)
                    .bind(todo.priority)
                    .bind(todo.updated_at)
                    .bind(todo.due_date)
                    .bind(&todo.id)
                    .bind(user_id)
                    .execute(db)
                    .await?;
                }
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO todos (id, user_id, title, description, completed, priority, created_at, updated_at, due_date)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&todo.id)
                .bind(user_id)
                .bind(&todo.title)
                .bind(&todo.description)
                .bind(todo.completed)
                .bind(todo.priority)
                .bind(todo.created_at)
                .bind(todo.updated_at)
                .bind(todo.due_date)
                .execute(db)
                .await?;
            }
        }
    }

    let todos = fetch_window(db, user_id, request.last_sync).await?;

    Ok(SyncResponse {
        todos,
        sync_time: now,
    })
}

async fn fetch_window(
    db: &SqlitePool,
    user_id: &str,
    last_sync: Option<DateTime<Utc>>,
) -> Result<Vec<Todo>, sqlx::Error> {
    match last_sync {
        Some(last_sync) => {
            sqlx::query_as::<_, Todo>(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? AND updated_at > ? ORDER BY updated_at DESC"
            ))
            .bind(user_id)
            .bind(last_sync)
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, Todo>(&format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ? ORDER BY updated_at DESC"
            ))
            .bind(user_id)
            .fetch_all(db)
            .await
        }
    }
}
