//! # homelink-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `HistoryStore` port defined in `homelink-app::ports`
//! - Manage the `SQLite` connection pool lifecycle
//! - Run the embedded migrations (`home_history` table)
//!
//! ## Dependency rule
//! Depends on `homelink-app` (for port traits) and `homelink-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod history_repo;
pub mod pool;

pub use history_repo::SqliteHistoryStore;
pub use pool::{Config, Database};
