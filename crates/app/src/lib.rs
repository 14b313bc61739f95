//! # homelink-app
//!
//! Application layer — the controller hub and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Controller` — the capability set of every protocol adapter
//!   - `ProtocolBackend` — typed get/set access to one device network
//!   - `HistoryStore` — record value changes and query them back
//!   - `Automation` — receive triggers, activate scenes
//!   - `SettingsStore` — per-controller string settings
//! - Own the shared runtime state:
//!   - `ControllerRegistry` — live controllers keyed by identifier, concurrent boot
//!   - `ConnectedClients` — outbound channels of every connected client
//!   - `Hub` — routing, broadcast and client bootstrap
//! - Provide the trigger engine (`TriggerPublisher`, `SunSchedule`) and the
//!   virtual-value synthesizer (`VirtualValueCache`)
//! - Provide in-process collaborators that need no IO (automation bus,
//!   in-memory settings and history) and the built-in `general` controller
//!
//! ## Dependency rule
//! Depends on `homelink-domain` only (plus tokio/dashmap for concurrency).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation_bus;
pub mod clients;
pub mod context;
pub mod controllers;
pub mod history;
pub mod hub;
pub mod lifecycle;
pub mod ports;
pub mod registry;
pub mod settings;
pub mod synthesizer;
pub mod trigger;
