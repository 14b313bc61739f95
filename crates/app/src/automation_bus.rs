//! In-process automation collaborator backed by a tokio broadcast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;

use homelink_domain::trigger::{CATEGORY_SCENES, TriggerEvent};

use crate::ports::{Automation, SceneInfo, SceneOutcome, SceneRef};

/// Trigger bus plus the table of known scenes.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). Rule evaluation happens in whatever
/// subscribes to [`subscribe`](Self::subscribe).
pub struct InProcessAutomation {
    sender: broadcast::Sender<TriggerEvent>,
    scenes: Vec<SceneInfo>,
}

impl InProcessAutomation {
    /// Create a bus with the given channel capacity and scene table.
    #[must_use]
    pub fn new(capacity: usize, scenes: Vec<SceneInfo>) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, scenes }
    }

    /// Receive every trigger published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerEvent> {
        self.sender.subscribe()
    }

    fn find(&self, scene: &SceneRef) -> Result<&SceneInfo, SceneOutcome> {
        match scene {
            SceneRef::Id(id) => self
                .scenes
                .iter()
                .find(|s| s.id == id.trim())
                .ok_or(SceneOutcome::NotFound),
            SceneRef::Name(name) => {
                let wanted = name.trim();
                let mut matches = self
                    .scenes
                    .iter()
                    .filter(|s| s.name.eq_ignore_ascii_case(wanted));
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Ok(only),
                    (None, _) => Err(SceneOutcome::Ambiguous { matches: 0 }),
                    (Some(_), Some(_)) => Err(SceneOutcome::Ambiguous {
                        matches: 2 + matches.count(),
                    }),
                }
            }
        }
    }
}

#[async_trait]
impl Automation for InProcessAutomation {
    fn publish_event(&self, event: TriggerEvent) {
        // Fails only when nobody listens.
        let _ = self.sender.send(event);
    }

    async fn activate_scene(&self, scene: &SceneRef) -> SceneOutcome {
        match self.find(scene) {
            Ok(info) => {
                tracing::info!(scene = %info.id, name = %info.name, "activating scene");
                if let Ok(event) = TriggerEvent::new(CATEGORY_SCENES, &info.id) {
                    self.publish_event(event);
                }
                SceneOutcome::Activated {
                    name: info.name.clone(),
                }
            }
            Err(outcome) => {
                tracing::warn!(%scene, ?outcome, "scene activation refused");
                outcome
            }
        }
    }

    fn scenes(&self) -> Vec<SceneInfo> {
        self.scenes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> InProcessAutomation {
        InProcessAutomation::new(
            16,
            vec![
                SceneInfo::new("1", "Movie"),
                SceneInfo::new("2", "Dinner"),
                SceneInfo::new("3", "dinner"),
            ],
        )
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = bus();
        let mut rx = bus.subscribe();

        bus.publish_event(TriggerEvent::new("Music", "MusicStarted").unwrap());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.key, "MusicStarted");
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = bus();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish_event(TriggerEvent::new("Time", "Sunset").unwrap());

        assert_eq!(rx1.recv().await.unwrap().key, "Sunset");
        assert_eq!(rx2.recv().await.unwrap().key, "Sunset");
    }

    #[tokio::test]
    async fn should_not_fail_when_no_subscribers() {
        let bus = bus();
        bus.publish_event(TriggerEvent::new("Time", "Sunrise").unwrap());
    }

    #[tokio::test]
    async fn should_activate_scene_by_id_and_publish_trigger() {
        let bus = bus();
        let mut rx = bus.subscribe();

        let outcome = bus.activate_scene(&SceneRef::Id("1".to_string())).await;

        assert_eq!(
            outcome,
            SceneOutcome::Activated {
                name: "Movie".to_string()
            }
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.category, CATEGORY_SCENES);
        assert_eq!(event.key, "1");
    }

    #[tokio::test]
    async fn should_activate_scene_by_name_ignoring_case() {
        let bus = bus();
        let outcome = bus.activate_scene(&SceneRef::Name("MOVIE".to_string())).await;
        assert!(matches!(outcome, SceneOutcome::Activated { .. }));
    }

    #[tokio::test]
    async fn should_report_unknown_id() {
        let bus = bus();
        let mut rx = bus.subscribe();
        let outcome = bus.activate_scene(&SceneRef::Id("42".to_string())).await;
        assert_eq!(outcome, SceneOutcome::NotFound);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_refuse_ambiguous_or_unmatched_names() {
        let bus = bus();
        assert_eq!(
            bus.activate_scene(&SceneRef::Name("dinner".to_string())).await,
            SceneOutcome::Ambiguous { matches: 2 }
        );
        assert_eq!(
            bus.activate_scene(&SceneRef::Name("party".to_string())).await,
            SceneOutcome::Ambiguous { matches: 0 }
        );
    }
}
