use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::use_cases::{AnnotationCaptureUseCase, AnnotationRestorerUseCase, RestoreReport};
use crate::domain::{
    annotations::LayoutData,
    chart::ChartHandle,
    errors::{AnnotationError, AppError, PersistenceError},
    events::{EventDispatcher, SessionEvent},
    logging::{LogComponent, LogLevel, get_logger},
    ownership::{OperationKind, OwnershipGuard, SharedOwnership},
    scheduling::Timer,
    trading_config::{BotListener, ConfigId, ConfigRepository, ConfigSelection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Saving { config_id: ConfigId, seq: u64 },
    Reloading { config_id: ConfigId },
    Aborted { config_id: ConfigId },
}

impl OrchestratorState {
    pub fn config_id(&self) -> Option<ConfigId> {
        match self {
            Self::Idle => None,
            Self::Saving { config_id, .. } | Self::Reloading { config_id } | Self::Aborted { config_id } => {
                Some(*config_id)
            }
        }
    }

    /// A save or reload for `id` is in flight.
    pub fn is_busy_with(&self, id: ConfigId) -> bool {
        match self {
            Self::Saving { config_id, .. } | Self::Reloading { config_id } => *config_id == id,
            Self::Idle | Self::Aborted { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Out-of-order sequence number or a save for this id already running
    Ignored,
    /// Persisted and redrawn from the backend's copy
    Applied(RestoreReport),
    /// Persisted, but the chart was left alone because ownership moved on
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored(RestoreReport),
    /// A newer selection took over before this load touched the chart
    Superseded,
}

/// Collaborators shared with the rest of the session
pub struct OrchestratorDeps {
    pub chart: ChartHandle,
    pub ownership: SharedOwnership,
    pub selection: Rc<RefCell<ConfigSelection>>,
    pub bot: Rc<dyn BotListener>,
    pub events: Rc<dyn EventDispatcher>,
    pub timer: Rc<dyn Timer>,
    pub initial_load_settle_ms: u64,
}

/// Save/load state machine: capture, persist, reload, guarded by ownership tokens
pub struct SaveLoadOrchestrator<R> {
    repository: Rc<R>,
    capture: AnnotationCaptureUseCase,
    restorer: AnnotationRestorerUseCase,
    deps: OrchestratorDeps,
    state: Cell<OrchestratorState>,
    last_seq: Cell<u64>,
}

impl<R: ConfigRepository> SaveLoadOrchestrator<R> {
    pub fn new(
        repository: Rc<R>,
        capture: AnnotationCaptureUseCase,
        restorer: AnnotationRestorerUseCase,
        deps: OrchestratorDeps,
    ) -> Self {
        Self {
            repository,
            capture,
            restorer,
            deps,
            state: Cell::new(OrchestratorState::Idle),
            last_seq: Cell::new(0),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state.get()
    }

    pub fn selected(&self) -> Option<ConfigId> {
        self.deps.selection.borrow().selected()
    }

    /// A save, reload or selection load for `id` is in flight.
    pub fn is_busy_with(&self, id: ConfigId) -> bool {
        self.state().is_busy_with(id) || self.deps.ownership.borrow().is_owner(OperationKind::Loading, id)
    }

    /// Switch the displayed configuration and restore its drawings.
    ///
    /// The loading token is claimed before the first await, so any older
    /// load or reload stops at its next checkpoint.
    pub async fn select_config(&self, id: ConfigId) -> Result<LoadOutcome, AppError> {
        self.deps.selection.borrow_mut().select(id);
        let guard = OwnershipGuard::claim(&self.deps.ownership, OperationKind::Loading, id);

        get_logger().info(LogComponent::Application("SaveLoadOrchestrator"), &format!("🔄 loading config {}", id));

        let config = match self.repository.get_config(id).await {
            Ok(config) => config,
            Err(e) => {
                if !guard.is_current() {
                    return Ok(LoadOutcome::Superseded);
                }
                guard.release();
                self.publish(SessionEvent::LoadFailed { config_id: id, reason: e.to_string() });
                crate::log_error!(LogComponent::Application("SaveLoadOrchestrator"), "loading config {} failed: {}", id, e);
                return Err(PersistenceError::from(e).into());
            }
        };
        if !guard.is_current() {
            return Ok(LoadOutcome::Superseded);
        }

        self.deps.selection.borrow_mut().remember(config.clone());
        self.publish(SessionEvent::ConfigLoaded { config_id: id });

        self.deps.timer.sleep(self.deps.initial_load_settle_ms).await;

        let layout = config.layout_data.clone().unwrap_or_default();
        let outcome = self.restore_guarded(&layout, &guard).await;
        guard.release();
        match outcome? {
            Some(report) => Ok(LoadOutcome::Restored(report)),
            None => Ok(LoadOutcome::Superseded),
        }
    }

    /// Capture the chart and persist it for the selected configuration.
    ///
    /// `seq` must grow strictly between calls; stale or duplicate requests are
    /// ignored, as is a request while a save, reload or load for the same id runs.
    pub async fn request_save(&self, seq: u64) -> Result<SaveOutcome, AppError> {
        if seq <= self.last_seq.get() {
            crate::log_debug!(LogComponent::Application("SaveLoadOrchestrator"), "ignoring stale save #{}", seq);
            return Ok(SaveOutcome::Ignored);
        }
        let id = self.selected().ok_or(PersistenceError::NoSelection)?;
        if self.is_busy_with(id) {
            crate::log_debug!(
                LogComponent::Application("SaveLoadOrchestrator"),
                "save #{} for config {} skipped, cycle in flight",
                seq,
                id
            );
            return Ok(SaveOutcome::Ignored);
        }
        self.last_seq.set(seq);

        self.state.set(OrchestratorState::Saving { config_id: id, seq });
        let saving = OwnershipGuard::claim(&self.deps.ownership, OperationKind::Saving, id);
        self.publish(SessionEvent::SaveStarted { config_id: id, seq });

        let cached = self.deps.selection.borrow().current_config().cloned();
        let base = match cached {
            Some(config) => config,
            None => match self.repository.get_config(id).await {
                Ok(config) => config,
                Err(e) => return Err(self.fail_save(id, saving, PersistenceError::from(e).into())),
            },
        };
        if !self.owns_save(&saving) {
            return Ok(self.abort_save(id, saving, "selection changed before capture"));
        }

        let layout = match self.capture.capture(&self.deps.chart, base.layout_data.as_ref()) {
            Ok(layout) => layout,
            Err(e) => return Err(self.fail_save(id, saving, e.into())),
        };
        let capture_method = layout.other_drawings.capture_method;
        let outgoing = base.with_layout(layout);

        let stored = self.repository.put_config(&outgoing).await;

        if !self.owns_save(&saving) {
            return Ok(self.abort_save(id, saving, "selection changed while saving"));
        }
        let stored = match stored {
            Ok(stored) => stored,
            Err(e) => return Err(self.fail_save(id, saving, PersistenceError::from(e).into())),
        };

        self.deps.selection.borrow_mut().remember(stored.clone());
        saving.release();
        self.publish(SessionEvent::SaveCompleted { config_id: id, capture_method });
        get_logger().log_with_metadata(
            LogLevel::Info,
            LogComponent::Application("SaveLoadOrchestrator"),
            "💾 layout saved",
            &format!("config={} seq={} capture={}", id, seq, capture_method),
        );

        self.transition(id, OrchestratorState::Reloading { config_id: id });
        let loading = OwnershipGuard::claim(&self.deps.ownership, OperationKind::Loading, id);
        let layout = stored.layout_data.clone().unwrap_or_default();
        let restored = self.restore_guarded(&layout, &loading).await;
        loading.release();

        match restored {
            Ok(Some(report)) => {
                self.deps.bot.on_lines_updated(&stored);
                self.transition(id, OrchestratorState::Idle);
                Ok(SaveOutcome::Applied(report))
            }
            Ok(None) => {
                self.transition(id, OrchestratorState::Aborted { config_id: id });
                Ok(SaveOutcome::Aborted)
            }
            Err(e) => {
                self.transition(id, OrchestratorState::Idle);
                Err(e)
            }
        }
    }

    /// Drop every token and go back to `Idle`. Safe to call repeatedly.
    pub fn reset(&self) {
        self.deps.ownership.borrow_mut().clear();
        self.state.set(OrchestratorState::Idle);
    }

    /// Restore under `guard`. `Ok(None)` when ownership or the chart was lost.
    async fn restore_guarded(
        &self,
        layout: &LayoutData,
        guard: &OwnershipGuard,
    ) -> Result<Option<RestoreReport>, AppError> {
        match self.restorer.restore(&self.deps.chart, layout, guard).await {
            Ok(report) => {
                self.publish(SessionEvent::LayoutRestored { config_id: guard.id(), shapes: report.shapes_on_chart });
                Ok(Some(report))
            }
            Err(AnnotationError::StaleOperation) | Err(AnnotationError::EngineDetached) => {
                crate::log_debug!(
                    LogComponent::Application("SaveLoadOrchestrator"),
                    "restore for config {} abandoned",
                    guard.id()
                );
                Ok(None)
            }
            Err(e) => {
                crate::log_warn!(
                    LogComponent::Application("SaveLoadOrchestrator"),
                    "restore for config {} failed: {}",
                    guard.id(),
                    e
                );
                Err(e.into())
            }
        }
    }

    fn owns_save(&self, saving: &OwnershipGuard) -> bool {
        saving.is_current() && self.selected() == Some(saving.id())
    }

    fn abort_save(&self, id: ConfigId, saving: OwnershipGuard, reason: &str) -> SaveOutcome {
        saving.release();
        self.transition(id, OrchestratorState::Aborted { config_id: id });
        crate::log_debug!(LogComponent::Application("SaveLoadOrchestrator"), "save for config {} aborted: {}", id, reason);
        self.publish(SessionEvent::SaveAborted { config_id: id, reason: reason.to_string() });
        SaveOutcome::Aborted
    }

    fn fail_save(&self, id: ConfigId, saving: OwnershipGuard, error: AppError) -> AppError {
        saving.release();
        self.transition(id, OrchestratorState::Aborted { config_id: id });
        crate::log_error!(LogComponent::Application("SaveLoadOrchestrator"), "save for config {} failed: {}", id, error);
        self.publish(SessionEvent::SaveAborted { config_id: id, reason: error.to_string() });
        error
    }

    /// Move to `next` unless a cycle for another id has taken the state over.
    fn transition(&self, id: ConfigId, next: OrchestratorState) {
        if self.state().config_id() == Some(id) {
            self.state.set(next);
        }
    }

    fn publish(&self, event: SessionEvent) {
        self.deps.events.publish_session_event(event);
    }
}

impl<R> SaveLoadOrchestrator<R> {
    pub fn chart(&self) -> &ChartHandle {
        &self.deps.chart
    }
}
