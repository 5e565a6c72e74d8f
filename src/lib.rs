pub mod access_log;
pub mod args;
pub mod commands;
pub mod countdown;
pub mod domain;
pub mod error;
pub mod gatekeeper;
pub mod grants;
pub mod host;
pub mod settings;
pub mod sqlite;
pub mod stats;
pub mod storage;
pub mod utils;

pub use args::Args;
pub use error::{GateError, StoreError};
pub use gatekeeper::{Decision, Gatekeeper, Navigation};
pub use grants::{TabGrantStore, TabId};
pub use settings::Settings;
pub use sqlite::SqliteStore;
pub use storage::{KeyValueStore, MemoryStore};
