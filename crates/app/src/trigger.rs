//! Trigger engine — discrete trigger publishing and the sunrise/sunset cycle.
//!
//! Discrete triggers are normalized into [`TriggerEvent`]s and handed to the
//! automation collaborator without blocking. Time triggers come from a
//! [`SunSchedule`]: a single task that sleeps until the next solar event,
//! publishes it, then schedules the following one.

use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use homelink_domain::sun::{SolarTime, SunCalculator};
use homelink_domain::time::{self, Timestamp};
use homelink_domain::trigger::TriggerEvent;

use crate::ports::Automation;

/// Normalizes and forwards triggers to the automation collaborator.
#[derive(Clone)]
pub struct TriggerPublisher {
    automation: Arc<dyn Automation>,
}

impl TriggerPublisher {
    pub fn new(automation: Arc<dyn Automation>) -> Self {
        Self { automation }
    }

    /// Publish `{category, key}`. Blank parts are logged and dropped.
    pub fn publish(&self, category: &str, key: &str) -> bool {
        match TriggerEvent::new(category, key) {
            Ok(event) => {
                self.publish_event(event);
                true
            }
            Err(err) => {
                tracing::warn!(category, key, error = %err, "dropping invalid trigger");
                false
            }
        }
    }

    pub fn publish_event(&self, event: TriggerEvent) {
        tracing::debug!(trigger = %event, "publish trigger");
        self.automation.publish_event(event);
    }
}

/// Source of upcoming solar events.
pub trait SolarCalendar: Send + Sync {
    /// First event strictly after `after`, or `None` if there is none
    /// in the foreseeable future.
    fn next_event(&self, after: Timestamp) -> Option<SolarTime>;
}

impl SolarCalendar for SunCalculator {
    fn next_event(&self, after: Timestamp) -> Option<SolarTime> {
        SunCalculator::next_event(self, after)
    }
}

/// Handle of a running sunrise/sunset cycle.
///
/// Dropping the handle cancels the cycle.
pub struct SunSchedule {
    cancel: CancellationToken,
    next: Arc<Mutex<Option<SolarTime>>>,
}

impl SunSchedule {
    /// Spawn the cycle on the current tokio runtime.
    ///
    /// The first event is computed synchronously so [`next`](Self::next) is
    /// meaningful as soon as this returns.
    pub fn start(calendar: Arc<dyn SolarCalendar>, publisher: TriggerPublisher) -> Self {
        let cancel = CancellationToken::new();
        let first = calendar.next_event(time::now());
        let next = Arc::new(Mutex::new(first));
        tokio::spawn(run_cycle(
            calendar,
            publisher,
            cancel.clone(),
            Arc::clone(&next),
            first,
        ));
        Self { cancel, next }
    }

    /// The event the cycle is currently waiting for.
    #[must_use]
    pub fn next(&self) -> Option<SolarTime> {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the cycle. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("cancelling sun schedule");
        }
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for SunSchedule {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_cycle(
    calendar: Arc<dyn SolarCalendar>,
    publisher: TriggerPublisher,
    cancel: CancellationToken,
    next: Arc<Mutex<Option<SolarTime>>>,
    first: Option<SolarTime>,
) {
    let mut upcoming = first;
    loop {
        let Some(event) = upcoming else {
            tracing::warn!("no upcoming solar event, time triggers stopped");
            break;
        };
        *next.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
        tracing::info!(event = %event.event, at = %event.at, "next solar event scheduled");

        let wait = time::until(event.at, time::now());
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }

        publisher.publish_event(event.event.trigger());

        // Never ask for an instant before the fired event, even if the
        // timer woke early.
        let cursor = time::now().max(event.at);
        upcoming = calendar.next_event(cursor);
    }
    *next.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use homelink_domain::trigger::{CATEGORY_TIME, SolarEvent};

    use super::*;
    use crate::ports::{SceneInfo, SceneOutcome, SceneRef};

    // ── Recording automation ───────────────────────────────────────

    struct Recorder {
        sender: broadcast::Sender<TriggerEvent>,
    }

    impl Recorder {
        fn new() -> (Arc<Self>, broadcast::Receiver<TriggerEvent>) {
            let (sender, rx) = broadcast::channel(16);
            (Arc::new(Self { sender }), rx)
        }
    }

    #[async_trait]
    impl Automation for Recorder {
        fn publish_event(&self, event: TriggerEvent) {
            let _ = self.sender.send(event);
        }
        async fn activate_scene(&self, _scene: &SceneRef) -> SceneOutcome {
            SceneOutcome::NotFound
        }
        fn scenes(&self) -> Vec<SceneInfo> {
            Vec::new()
        }
    }

    // ── Fast calendar: alternating events a few ms apart ───────────

    struct FastCalendar {
        step: chrono::Duration,
        calls: AtomicUsize,
    }

    impl FastCalendar {
        fn every(millis: i64) -> Arc<Self> {
            Arc::new(Self {
                step: chrono::Duration::milliseconds(millis),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SolarCalendar for FastCalendar {
        fn next_event(&self, after: Timestamp) -> Option<SolarTime> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let event = if n % 2 == 0 {
                SolarEvent::Sunrise
            } else {
                SolarEvent::Sunset
            };
            Some(SolarTime {
                event,
                at: after + self.step,
            })
        }
    }

    struct NeverCalendar;

    impl SolarCalendar for NeverCalendar {
        fn next_event(&self, _after: Timestamp) -> Option<SolarTime> {
            None
        }
    }

    async fn recv(rx: &mut broadcast::Receiver<TriggerEvent>) -> TriggerEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for trigger")
            .unwrap()
    }

    #[tokio::test]
    async fn should_publish_normalized_discrete_trigger() {
        let (recorder, mut rx) = Recorder::new();
        let publisher = TriggerPublisher::new(recorder);

        assert!(publisher.publish(" Music ", "MusicStarted"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.category, "Music");
        assert_eq!(event.key, "MusicStarted");
    }

    #[tokio::test]
    async fn should_drop_blank_trigger() {
        let (recorder, mut rx) = Recorder::new();
        let publisher = TriggerPublisher::new(recorder);

        assert!(!publisher.publish("Scenes", ""));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_alternate_sunrise_and_sunset_without_rearming() {
        let (recorder, mut rx) = Recorder::new();
        let schedule = SunSchedule::start(FastCalendar::every(20), TriggerPublisher::new(recorder));

        let first = recv(&mut rx).await;
        let second = recv(&mut rx).await;
        let third = recv(&mut rx).await;

        assert_eq!(first.category, CATEGORY_TIME);
        assert_eq!(first.key, "Sunrise");
        assert_eq!(second.key, "Sunset");
        assert_eq!(third.key, "Sunrise");
        schedule.cancel();
    }

    #[tokio::test]
    async fn should_expose_pending_event() {
        let (recorder, _rx) = Recorder::new();
        let schedule =
            SunSchedule::start(FastCalendar::every(60_000), TriggerPublisher::new(recorder));

        let next = schedule.next().unwrap();
        assert_eq!(next.event, SolarEvent::Sunrise);
        assert!(next.at > time::now());
        schedule.cancel();
    }

    #[tokio::test]
    async fn should_stop_publishing_after_cancel() {
        let (recorder, mut rx) = Recorder::new();
        let schedule = SunSchedule::start(FastCalendar::every(50), TriggerPublisher::new(recorder));

        schedule.cancel();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(rx.try_recv().is_err());
        assert!(schedule.is_cancelled());
    }

    #[tokio::test]
    async fn should_allow_cancel_any_number_of_times() {
        let (recorder, _rx) = Recorder::new();
        let schedule = SunSchedule::start(FastCalendar::every(10), TriggerPublisher::new(recorder));

        tokio::time::sleep(Duration::from_millis(30)).await;
        schedule.cancel();
        schedule.cancel();
        drop(schedule);
    }

    #[tokio::test]
    async fn should_report_nothing_when_calendar_has_no_events() {
        let (recorder, _rx) = Recorder::new();
        let schedule = SunSchedule::start(Arc::new(NeverCalendar), TriggerPublisher::new(recorder));
        assert!(schedule.next().is_none());
    }
}
