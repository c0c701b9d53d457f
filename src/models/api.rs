use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Todo;

/// Uniform response envelope for every backend operation except the health
/// check.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Bulk-sync upload: the client's entire collection, plus the window it
/// wants back. No `last_sync` means a full snapshot reply.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    pub todos: Vec<Todo>,
}

/// Bulk-sync reply: the reconciled collection and the server-side sync time.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub todos: Vec<Todo>,
    pub sync_time: DateTime<Utc>,
}
