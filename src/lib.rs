pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::{AppConfig, Cli};
pub use crate::core::{SyncConfig, SyncEngine, SyncPlan, SyncReport};
pub use error::{ConfigError, RemoteError, SyncError};
pub use storage::{AlistClient, FileRecord, MemoryFs, RemoteFs};
