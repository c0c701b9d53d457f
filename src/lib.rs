//! Local-first todo client with optional remote synchronization, plus the
//! matching reference backend. Local persistence stays authoritative when
//! offline; a configured, reachable backend is reconciled on load and on
//! explicit sync.

pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod probe;
pub mod remote;
pub mod server;
pub mod settings;
pub mod store;

pub use context::{AppConfig, AppContext, StorageBackend};
pub use error::Error;
