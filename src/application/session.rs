use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::coordinator::{LoadOutcome, OrchestratorDeps, SaveLoadOrchestrator, SaveOutcome};
use super::datafeed::Datafeed;
use super::use_cases::{
    AnnotationCaptureUseCase, AnnotationRestorerUseCase, HistoryProviderUseCase, PollerDeps,
    RealtimePollerUseCase, RequestTimeouts, SymbolResolverUseCase,
};
use crate::domain::{
    chart::ChartHandle,
    errors::{AnnotationError, AppError},
    events::EventDispatcher,
    logging::{LogComponent, get_logger},
    market_data::repositories::MarketDataRepository,
    ownership::SharedOwnership,
    scheduling::{Clock, TaskSpawner, Timer},
    trading_config::{BotListener, ConfigId, ConfigRepository, ConfigSelection},
};
use crate::settings::DatafeedSettings;

/// Platform services a session runs on
#[derive(Clone)]
pub struct SessionServices {
    pub clock: Rc<dyn Clock>,
    pub timer: Rc<dyn Timer>,
    pub spawner: Rc<dyn TaskSpawner>,
    pub bot: Rc<dyn BotListener>,
    pub events: Rc<dyn EventDispatcher>,
}

/// One mounted chart widget: datafeed, save/load cycle and shared state
pub struct ChartSession<R> {
    datafeed: Rc<Datafeed<R>>,
    orchestrator: Rc<SaveLoadOrchestrator<R>>,
    chart: ChartHandle,
    selection: Rc<RefCell<ConfigSelection>>,
    torn_down: Cell<bool>,
}

impl<R> ChartSession<R>
where
    R: MarketDataRepository + ConfigRepository + 'static,
{
    pub fn new(repository: Rc<R>, chart: ChartHandle, settings: &DatafeedSettings, services: SessionServices) -> Self {
        let selection: Rc<RefCell<ConfigSelection>> = Rc::default();
        let ownership: SharedOwnership = Rc::default();
        let timeouts = RequestTimeouts {
            first_request_ms: settings.first_request_timeout_ms,
            request_ms: settings.request_timeout_ms,
        };

        let poller = RealtimePollerUseCase::new(
            Rc::clone(&repository),
            PollerDeps {
                clock: Rc::clone(&services.clock),
                timer: Rc::clone(&services.timer),
                spawner: Rc::clone(&services.spawner),
                bot: Rc::clone(&services.bot),
                selection: Rc::clone(&selection),
                request_timeout_ms: settings.request_timeout_ms,
            },
        );
        let datafeed = Datafeed::new(
            SymbolResolverUseCase::new(Rc::clone(&repository)),
            HistoryProviderUseCase::new(
                Rc::clone(&repository),
                Rc::clone(&services.clock),
                Rc::clone(&services.timer),
                timeouts,
            ),
            poller,
        );

        let orchestrator = SaveLoadOrchestrator::new(
            repository,
            AnnotationCaptureUseCase::new(Rc::clone(&services.clock)),
            AnnotationRestorerUseCase::new(
                Rc::clone(&services.clock),
                Rc::clone(&services.timer),
                settings.settle_delay_ms,
            ),
            OrchestratorDeps {
                chart: chart.clone(),
                ownership,
                selection: Rc::clone(&selection),
                bot: services.bot,
                events: services.events,
                timer: services.timer,
                initial_load_settle_ms: settings.initial_load_settle_ms,
            },
        );

        Self {
            datafeed: Rc::new(datafeed),
            orchestrator: Rc::new(orchestrator),
            chart,
            selection,
            torn_down: Cell::new(false),
        }
    }

    pub fn datafeed(&self) -> Rc<Datafeed<R>> {
        Rc::clone(&self.datafeed)
    }

    pub fn orchestrator(&self) -> Rc<SaveLoadOrchestrator<R>> {
        Rc::clone(&self.orchestrator)
    }

    pub fn selected(&self) -> Option<ConfigId> {
        self.selection.borrow().selected()
    }

    pub async fn select_config(&self, id: ConfigId) -> Result<LoadOutcome, AppError> {
        self.ensure_live()?;
        self.orchestrator.select_config(id).await
    }

    pub async fn request_save(&self, seq: u64) -> Result<SaveOutcome, AppError> {
        self.ensure_live()?;
        self.orchestrator.request_save(seq).await
    }

    /// Stop every poll task, release the chart and drop ownership tokens.
    ///
    /// Continuations still in flight see a detached chart and stale tokens and
    /// finish without side effects. Repeated calls are no-ops.
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        let active = self.datafeed.poller().active_count();
        self.datafeed.poller().unsubscribe_all();
        self.chart.detach();
        self.orchestrator.reset();
        self.selection.borrow_mut().clear();

        get_logger().info(
            LogComponent::Application("ChartSession"),
            &format!("🧹 session torn down, {} subscriptions cancelled", active),
        );
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    fn ensure_live(&self) -> Result<(), AppError> {
        if self.torn_down.get() {
            Err(AnnotationError::EngineDetached.into())
        } else {
            Ok(())
        }
    }
}
