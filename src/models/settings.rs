use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_ID: &str = "default-user";

/// Application settings. An empty `backend_url` means no remote is
/// configured; `is_connected` is the last-known connectivity result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    pub user_id: String,
    pub is_connected: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            user_id: DEFAULT_USER_ID.to_string(),
            is_connected: false,
        }
    }
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub backend_url: Option<String>,
    pub user_id: Option<String>,
}
