//! Offline map lifecycle: list, delete, install and prepare for display

pub mod manager;
pub mod ready;
pub mod state;

pub use manager::OfflineMapLifecycle;
pub use ready::ReadyOfflineMap;
pub use state::LifecycleState;
