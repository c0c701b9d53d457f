use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::Error;
use crate::models::{
    ApiResponse, CreateTodoRequest, SyncRequest, SyncResponse, Todo, UpdateTodoRequest,
};
use crate::server::{AppState, repository};

pub async fn health(State(state): State<AppState>) -> Result<StatusCode, Error> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

pub async fn list_todos(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Todo>>>, Error> {
    let todos = repository::fetch_todos(&state.db, &user_id).await?;
    Ok(Json(ApiResponse::success(todos)))
}

pub async fn create_todo(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<CreateTodoRequest>,
) -> Result<Json<ApiResponse<Todo>>, Error> {
    if request.title.trim().is_empty() {
        return Err(Error::BadRequest("title must not be empty".to_string()));
    }
    let todo = repository::insert_todo(&state.db, &user_id, request).await?;
    Ok(Json(ApiResponse::success(todo)))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path((user_id, todo_id)): Path<(String, String)>,
    Json(request): Json<UpdateTodoRequest>,
) -> Result<Json<ApiResponse<Todo>>, Error> {
    let todo = repository::update_todo(&state.db, &user_id, &todo_id, request)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(ApiResponse::success(todo)))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path((user_id, todo_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let deleted = repository::delete_todo(&state.db, &user_id, &todo_id).await?;
    if !deleted {
        return Err(Error::NotFound);
    }
    Ok(Json(ApiResponse::success(())))
}

pub async fn sync_todos(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<ApiResponse<SyncResponse>>, Error> {
    let response = repository::sync_todos(&state.db, &user_id, request).await?;
    Ok(Json(ApiResponse::success(response)))
}
