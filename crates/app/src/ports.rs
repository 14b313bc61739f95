//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the hub core and the outside world.
//! They are defined here (in `app`) so that both the hub and the adapter
//! crates can depend on them without creating circular dependencies.

pub mod automation;
pub mod backend;
pub mod controller;
pub mod history_store;
pub mod settings;

pub use automation::{Automation, SceneInfo, SceneOutcome, SceneRef};
pub use backend::{
    BackendCommand, BackendNode, BackendValue, ConnectParams, ProtocolBackend, Session,
    ValueChange,
};
pub use controller::Controller;
pub use history_store::HistoryStore;
pub use settings::SettingsStore;
