pub mod api;
pub mod settings;
pub mod todo;

pub use api::{ApiResponse, SyncRequest, SyncResponse};
pub use settings::{Settings, SettingsPatch};
pub use todo::{CreateTodoRequest, Filter, Priority, SortKey, Stats, Todo, UpdateTodoRequest};
