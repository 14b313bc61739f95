//! Controller listing.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::node::Node;

use crate::state::AppState;

/// One controller as seen by API clients.
#[derive(Debug, Serialize)]
pub struct ControllerSummary {
    pub identifier: String,
    pub name: String,
    pub enabled: bool,
    pub initialized: bool,
    pub state: ControllerState,
    pub nodes: Vec<Node>,
    pub triggers: Vec<Node>,
    pub settings: Vec<Setting>,
}

/// `GET /api/controllers`
pub async fn list(State(state): State<AppState>) -> Json<Vec<ControllerSummary>> {
    let summaries = state
        .hub
        .registry()
        .all()
        .into_iter()
        .map(|controller| ControllerSummary {
            identifier: controller.identifier().to_string(),
            name: controller.display_name().to_string(),
            enabled: controller.enabled(),
            initialized: controller.initialized(),
            state: controller.state(),
            nodes: controller.nodes(),
            triggers: controller.triggers(),
            settings: controller.settings(),
        })
        .collect();
    Json(summaries)
}
