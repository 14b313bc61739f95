//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! via `From` when crossing a port boundary.

use crate::address::AddressError;

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Base error for the controller hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// No registered, enabled controller owns the requested identifier.
    #[error("no enabled controller registered for `{controller}`")]
    Routing { controller: String },

    /// A controller failed while initialising or handling a message.
    #[error("controller `{controller}` failed: {reason}")]
    Adapter { controller: String, reason: String },

    /// An inbound payload could not be decoded into a message.
    #[error("malformed message")]
    Malformed(#[from] serde_json::Error),

    /// A canonical address key could not be parsed.
    #[error("invalid address")]
    InvalidAddress(#[from] AddressError),

    /// A value could not be interpreted (colour, number, coordinate, …).
    #[error("invalid value `{value}`: {reason}")]
    InvalidValue { value: String, reason: &'static str },

    /// The persistence collaborator failed.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// A protocol backend rejected or failed an operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// The settings collaborator failed.
    #[error("settings error")]
    Settings(#[source] BoxError),
}

impl HubError {
    /// Shorthand for an [`HubError::Adapter`] error.
    #[must_use]
    pub fn adapter(controller: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Adapter {
            controller: controller.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`HubError::InvalidValue`] error.
    #[must_use]
    pub fn invalid_value(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidValue {
            value: value.into(),
            reason,
        }
    }
}
