//! In-memory settings store.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use homelink_domain::controller::Setting;
use homelink_domain::error::HubError;

use crate::ports::SettingsStore;

/// Settings grouped by controller identifier, then key.
pub type SettingsMap = BTreeMap<String, BTreeMap<String, String>>;

/// Settings kept in memory only. `persist` is a no-op.
///
/// File-backed stores wrap this type and serialize [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<SettingsMap>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(values: SettingsMap) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Copy of everything stored.
    #[must_use]
    pub fn snapshot(&self) -> SettingsMap {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SettingsStore for MemorySettings {
    fn get_string(&self, controller: &str, key: &str, default: &str) -> String {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(controller)
            .and_then(|section| section.get(key))
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, controller: &str, key: &str, value: &str) -> Result<(), HubError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(controller.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn register(&self, controller: &str, settings: &[Setting]) -> Result<(), HubError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let section = values.entry(controller.to_string()).or_default();
        for setting in settings {
            section
                .entry(setting.key.clone())
                .or_insert_with(|| setting.default.clone());
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), HubError> {
        Ok(())
    }
}
