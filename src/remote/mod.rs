use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{
    ApiResponse, CreateTodoRequest, SyncRequest, SyncResponse, Todo, UpdateTodoRequest,
};
use crate::settings::SettingsStore;

/// Remote CRUD + bulk-sync operations behind the uniform envelope contract.
/// Every failure mode — transport error, non-2xx status, `success=false`
/// envelope — resolves to an absent result and logs the detail; nothing
/// escapes as an error. The health check is envelope-exempt.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn health_check(&self) -> bool;
    async fn list_todos(&self) -> Option<Vec<Todo>>;
    async fn create_todo(&self, request: &CreateTodoRequest) -> Option<Todo>;
    async fn update_todo(&self, id: &str, request: &UpdateTodoRequest) -> Option<Todo>;
    async fn delete_todo(&self, id: &str) -> bool;
    async fn sync_todos(
        &self,
        todos: Vec<Todo>,
        last_sync: Option<DateTime<Utc>>,
    ) -> Option<SyncResponse>;
}

/// HTTP implementation; reads the endpoint and user identity from settings
/// on every call, so reconfiguration takes effect immediately.
pub struct HttpBackendClient {
    client: reqwest::Client,
    settings: Arc<SettingsStore>,
}

impl HttpBackendClient {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn base_url(&self) -> Option<String> {
        let url = self.settings.backend_url();
        if url.is_empty() {
            return None;
        }
        Some(url.trim_end_matches('/').to_string())
    }

    /// Performs one enveloped request and resolves it to the envelope's
    /// `data` field (JSON null when the operation carries no payload).
    /// Failures are logged here so callers only see presence or absence.
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Option<Value> {
        match self.try_request(method, path, body).await {
            Ok(data) => Some(data),
            Err(Error::NotConfigured) => {
                debug!("no backend configured, skipping {}", path);
                None
            }
            Err(err) => {
                warn!("backend call {} failed: {}", path, err);
                None
            }
        }
    }

    async fn try_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let base_url = self.base_url().ok_or(Error::NotConfigured)?;
        let url = format!("{}{}", base_url, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("X-User-ID", self.settings.user_id());
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!("{}: {}", status, detail)));
        }

        let envelope: ApiResponse<Value> = response.json().await?;
        if !envelope.success {
            return Err(Error::Remote(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(envelope.data.unwrap_or(Value::Null))
    }

    fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("unexpected payload shape for {}: {}", path, err);
                None
            }
        }
    }

    fn todos_path(&self) -> String {
        format!("/api/users/{}/todos", self.settings.user_id())
    }

    fn todo_path(&self, id: &str) -> String {
        format!("/api/users/{}/todos/{}", self.settings.user_id(), id)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn health_check(&self) -> bool {
        let Some(base_url) = self.base_url() else {
            return false;
        };
        let url = format!("{}/health", base_url);
        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!("health check {}: {}", url, response.status());
                response.status().is_success()
            }
            Err(err) => {
                debug!("health check failed: {}", err);
                false
            }
        }
    }

    async fn list_todos(&self) -> Option<Vec<Todo>> {
        let path = self.todos_path();
        let data = self.request(Method::GET, &path, None).await?;
        Self::decode(&path, data)
    }

    async fn create_todo(&self, request: &CreateTodoRequest) -> Option<Todo> {
        let path = self.todos_path();
        let body = serde_json::to_value(request).ok()?;
        let data = self.request(Method::POST, &path, Some(body)).await?;
        Self::decode(&path, data)
    }

    async fn update_todo(&self, id: &str, request: &UpdateTodoRequest) -> Option<Todo> {
        let path = self.todo_path(id);
        let body = serde_json::to_value(request).ok()?;
        let data = self.request(Method::PUT, &path, Some(body)).await?;
        Self::decode(&path, data)
    }

    async fn delete_todo(&self, id: &str) -> bool {
        let path = self.todo_path(id);
        // Success is the envelope's success flag; the payload is null.
        self.request(Method::DELETE, &path, None).await.is_some()
    }

    async fn sync_todos(
        &self,
        todos: Vec<Todo>,
        last_sync: Option<DateTime<Utc>>,
    ) -> Option<SyncResponse> {
        let path = format!("/api/users/{}/sync", self.settings.user_id());
        let body = serde_json::to_value(SyncRequest { last_sync, todos }).ok()?;
        let data = self.request(Method::POST, &path, Some(body)).await?;
        Self::decode(&path, data)
    }
}

/// Stand-in for "no backend": every operation resolves absent.
pub struct NoopBackendClient;

#[async_trait]
impl BackendClient for NoopBackendClient {
    async fn health_check(&self) -> bool {
        false
    }

    async fn list_todos(&self) -> Option<Vec<Todo>> {
        None
    }

    async fn create_todo(&self, _request: &CreateTodoRequest) -> Option<Todo> {
        None
    }

    async fn update_todo(&self, _id: &str, _request: &UpdateTodoRequest) -> Option<Todo> {
        None
    }

    async fn delete_todo(&self, _id: &str) -> bool {
        false
    }

    async fn sync_todos(
        &self,
        _todos: Vec<Todo>,
        _last_sync: Option<DateTime<Utc>>,
    ) -> Option<SyncResponse> {
        None
    }
}
