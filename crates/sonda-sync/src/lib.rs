mod engine;

pub use engine::{CreationState, SessionSync, SyncConfig, SyncStatus};
