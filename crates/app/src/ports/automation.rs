//! Automation port — where triggers go and scenes come from.
//!
//! The hub never evaluates rules itself; it forwards normalized
//! [`TriggerEvent`]s and asks the collaborator to activate scenes.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use homelink_domain::trigger::TriggerEvent;

/// A scene known to the automation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: String,
    pub name: String,
}

impl SceneInfo {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How a scene is referred to by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneRef {
    Id(String),
    /// Spoken or typed name, matched case-insensitively.
    Name(String),
}

impl fmt::Display for SceneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "scene #{id}"),
            Self::Name(name) => write!(f, "scene \"{name}\""),
        }
    }
}

/// Result of a scene activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneOutcome {
    Activated { name: String },
    NotFound,
    /// A name matched zero or several scenes.
    Ambiguous { matches: usize },
}

/// Automation collaborator.
#[async_trait]
pub trait Automation: Send + Sync {
    /// Forward a trigger. Must not block.
    fn publish_event(&self, event: TriggerEvent);

    /// Activate a scene by id or name.
    async fn activate_scene(&self, scene: &SceneRef) -> SceneOutcome;

    /// Scenes that can be activated.
    fn scenes(&self) -> Vec<SceneInfo>;
}
