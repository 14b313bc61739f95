//! Controller registry — the live set of controllers, keyed by identifier.
//!
//! Controllers are not discovered by scanning types: the composition root
//! hands [`ControllerRegistry::boot`] an explicit table of [`Registration`]s.
//! Each controller then initialises on its own task so one slow or failing
//! backend never holds up the others.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use tokio::task::JoinHandle;

use homelink_domain::error::HubError;

use crate::context::ControllerContext;
use crate::ports::Controller;

type Factory = Box<dyn FnOnce() -> Arc<dyn Controller> + Send>;

/// One row of the registration table: how to build a controller.
pub struct Registration {
    label: &'static str,
    factory: Factory,
}

impl Registration {
    /// Build the controller lazily at boot.
    pub fn new(
        label: &'static str,
        factory: impl FnOnce() -> Arc<dyn Controller> + Send + 'static,
    ) -> Self {
        Self {
            label,
            factory: Box::new(factory),
        }
    }

    /// Register an already constructed controller.
    pub fn instance(label: &'static str, controller: Arc<dyn Controller>) -> Self {
        Self::new(label, move || controller)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// How one controller's boot ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    Ready,
    Failed(String),
    Panicked,
}

/// Boot tasks in flight. [`finish`](Self::finish) waits for all of them.
pub struct Booting {
    tasks: Vec<(String, JoinHandle<Result<(), HubError>>)>,
}

impl Booting {
    /// Identifiers still booting or booted by this handle.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.tasks.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Wait for every boot task and report one outcome per controller.
    pub async fn finish(self) -> Vec<(String, BootOutcome)> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (id, task) in self.tasks {
            let outcome = match task.await {
                Ok(Ok(())) => BootOutcome::Ready,
                Ok(Err(err)) => BootOutcome::Failed(err.to_string()),
                Err(join) if join.is_panic() => BootOutcome::Panicked,
                Err(join) => BootOutcome::Failed(join.to_string()),
            };
            outcomes.push((id, outcome));
        }
        outcomes
    }
}

/// Concurrent map of live controllers.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: DashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` under its identifier.
    ///
    /// The first registration of an identifier wins; later ones are logged
    /// and dropped. Returns whether `controller` was stored.
    pub fn register(&self, controller: Arc<dyn Controller>) -> bool {
        let id = controller.identifier().to_string();
        match self.controllers.entry(id) {
            Entry::Occupied(entry) => {
                tracing::warn!(controller = %entry.key(), "duplicate controller identifier, keeping the first");
                false
            }
            Entry::Vacant(entry) => {
                tracing::debug!(controller = %entry.key(), "controller registered");
                entry.insert(controller);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every controller, ordered by identifier.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Controller>> {
        let mut all: Vec<_> = self
            .controllers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Build, register and initialise every controller of `table`.
    ///
    /// Factories run in table order on the calling task; a panicking factory
    /// is logged and skipped. Each registered controller then seeds its
    /// settings and runs `init` on its own tokio task.
    pub fn boot(&self, table: Vec<Registration>, ctx: &ControllerContext) -> Booting {
        let mut tasks = Vec::new();
        for registration in table {
            let label = registration.label;
            let controller = match std::panic::catch_unwind(AssertUnwindSafe(registration.factory)) {
                Ok(controller) => controller,
                Err(_) => {
                    tracing::error!(registration = label, "controller factory panicked");
                    continue;
                }
            };
            if !self.register(Arc::clone(&controller)) {
                continue;
            }
            let id = controller.identifier().to_string();
            let task = tokio::spawn(init_controller(controller, ctx.clone()));
            tasks.push((id, task));
        }
        Booting { tasks }
    }

    /// Destroy every controller. Used on shutdown.
    pub async fn destroy_all(&self) {
        for controller in self.all() {
            tracing::debug!(controller = %controller.identifier(), "destroying controller");
            controller.destroy().await;
        }
    }
}

async fn init_controller(
    controller: Arc<dyn Controller>,
    ctx: ControllerContext,
) -> Result<(), HubError> {
    let id = controller.identifier().to_string();
    if let Err(err) = ctx.settings().register(&id, &controller.settings()) {
        tracing::warn!(controller = %id, error = %err, "failed to load controller settings");
    }

    let result = AssertUnwindSafe(controller.init(ctx)).catch_unwind().await;
    match result {
        Ok(Ok(())) => {
            tracing::info!(controller = %id, enabled = controller.enabled(), "controller ready");
            Ok(())
        }
        Ok(Err(err)) => {
            tracing::error!(controller = %id, error = %err, "controller init failed");
            Err(err)
        }
        Err(panic) => {
            tracing::error!(controller = %id, "controller init panicked");
            std::panic::resume_unwind(panic)
        }
    }
}
