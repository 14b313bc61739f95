//! Settings port — per-controller string settings.

use homelink_domain::controller::Setting;
use homelink_domain::error::HubError;

/// Settings collaborator. Keys are scoped by controller identifier.
pub trait SettingsStore: Send + Sync {
    /// Stored value, or `default` when the key is unknown.
    fn get_string(&self, controller: &str, key: &str, default: &str) -> String;

    /// Store a value in memory. Call [`persist`](Self::persist) to save it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Settings`] if the store rejects the write.
    fn set_string(&self, controller: &str, key: &str, value: &str) -> Result<(), HubError>;

    /// Seed declared defaults for keys not stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Settings`] if the store rejects the write.
    fn register(&self, controller: &str, settings: &[Setting]) -> Result<(), HubError>;

    /// Flush to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Settings`] if writing fails.
    fn persist(&self) -> Result<(), HubError>;
}
