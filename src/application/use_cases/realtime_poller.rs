use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};

use crate::domain::{
    logging::{LogComponent, LogLevel, get_logger},
    market_data::{
        Bar, FetchWindow, HistoryQuery, Resolution, repositories::MarketDataRepository,
        services::BarSequenceService,
    },
    scheduling::{Clock, TaskSpawner, Timer, with_timeout},
    trading_config::{BotListener, ConfigSelection},
};
use crate::time_utils::{MINUTE_SECS, secs_to_millis};

/// Engine callback receiving realtime bars
pub type BarCallback = Rc<dyn Fn(Bar)>;

/// Poll cadence for a resolution tier.
pub fn poll_interval_ms(resolution: Resolution) -> u64 {
    match resolution.minutes() {
        m if m <= 5 => 10_000,
        m if m <= 15 => 15_000,
        m if m <= 30 => 20_000,
        _ => 30_000,
    }
}

/// Bar-count hint for the small recent window fetched on each tick.
pub fn recent_bar_count(resolution: Resolution) -> u32 {
    match resolution {
        Resolution::OneMinute => 5,
        Resolution::FiveMinutes => 6,
        Resolution::FifteenMinutes => 8,
        Resolution::ThirtyMinutes => 10,
        _ => 12,
    }
}

/// Whether `candidate` is worth emitting after `last`.
///
/// The first bar always goes out, as does a newer bar. A bar with the same
/// time goes out only when a field moved, except on the finest resolution
/// where every poll is emitted. Older bars never go out.
pub fn should_emit(last: Option<&Bar>, candidate: &Bar, resolution: Resolution) -> bool {
    let Some(last) = last else {
        return true;
    };
    if candidate.time > last.time {
        return true;
    }
    if candidate.time < last.time {
        return false;
    }
    resolution.is_finest() || candidate.differs_from(last)
}

/// Active realtime subscription
struct SubscriptionHandle {
    symbol: String,
    resolution: Resolution,
    generation: u64,
    last_bar: Option<Bar>,
    on_bar: BarCallback,
    abort: AbortHandle,
}

struct PollerInner<R> {
    repository: Rc<R>,
    clock: Rc<dyn Clock>,
    timer: Rc<dyn Timer>,
    spawner: Rc<dyn TaskSpawner>,
    bot: Rc<dyn BotListener>,
    selection: Rc<RefCell<ConfigSelection>>,
    request_timeout_ms: u64,
    subscriptions: RefCell<HashMap<String, SubscriptionHandle>>,
    next_generation: Cell<u64>,
}

/// Use case polling the backend for live bars, one task per subscriber id
pub struct RealtimePollerUseCase<R> {
    inner: Rc<PollerInner<R>>,
}

impl<R> Clone for RealtimePollerUseCase<R> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

pub struct PollerDeps {
    pub clock: Rc<dyn Clock>,
    pub timer: Rc<dyn Timer>,
    pub spawner: Rc<dyn TaskSpawner>,
    pub bot: Rc<dyn BotListener>,
    pub selection: Rc<RefCell<ConfigSelection>>,
    pub request_timeout_ms: u64,
}

impl<R: MarketDataRepository + 'static> RealtimePollerUseCase<R> {
    pub fn new(repository: Rc<R>, deps: PollerDeps) -> Self {
        Self {
            inner: Rc::new(PollerInner {
                repository,
                clock: deps.clock,
                timer: deps.timer,
                spawner: deps.spawner,
                bot: deps.bot,
                selection: deps.selection,
                request_timeout_ms: deps.request_timeout_ms,
                subscriptions: RefCell::new(HashMap::new()),
                next_generation: Cell::new(0),
            }),
        }
    }

    /// Start polling for `subscriber_id`, replacing an existing subscription with the same id.
    pub fn subscribe(&self, subscriber_id: &str, symbol: &str, resolution: Resolution, on_bar: BarCallback) {
        self.unsubscribe(subscriber_id);

        let generation = self.inner.next_generation.get() + 1;
        self.inner.next_generation.set(generation);

        let (abort, registration) = AbortHandle::new_pair();
        self.inner.subscriptions.borrow_mut().insert(
            subscriber_id.to_string(),
            SubscriptionHandle {
                symbol: symbol.to_string(),
                resolution,
                generation,
                last_bar: None,
                on_bar,
                abort,
            },
        );

        let inner = Rc::clone(&self.inner);
        let id = subscriber_id.to_string();
        let interval = poll_interval_ms(resolution);
        let poll_loop = async move {
            loop {
                inner.timer.sleep(interval).await;
                if !inner.poll_once(&id, generation).await {
                    break;
                }
            }
        };

        self.inner.spawner.spawn(Box::pin(async move {
            let _ = Abortable::new(poll_loop, registration).await;
        }));

        get_logger().info(
            LogComponent::Application("RealtimePoller"),
            &format!("📡 {} polling {} {} every {} ms", subscriber_id, symbol, resolution, interval),
        );
    }

    /// Cancel the poll task. Unknown ids are ignored.
    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        let removed = self.inner.subscriptions.borrow_mut().remove(subscriber_id);
        match removed {
            Some(handle) => {
                handle.abort.abort();
                crate::log_debug!(
                    LogComponent::Application("RealtimePoller"),
                    "{} unsubscribed from {}",
                    subscriber_id,
                    handle.symbol
                );
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe_all(&self) {
        let drained: Vec<SubscriptionHandle> =
            self.inner.subscriptions.borrow_mut().drain().map(|(_, handle)| handle).collect();
        for handle in drained {
            handle.abort.abort();
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    pub fn is_active(&self, subscriber_id: &str) -> bool {
        self.inner.subscriptions.borrow().contains_key(subscriber_id)
    }

    /// Run one tick for `subscriber_id` right away.
    pub async fn poll_now(&self, subscriber_id: &str) -> bool {
        let generation = self.inner.subscriptions.borrow().get(subscriber_id).map(|s| s.generation);
        match generation {
            Some(generation) => self.inner.poll_once(subscriber_id, generation).await,
            None => false,
        }
    }
}

impl<R: MarketDataRepository> PollerInner<R> {
    fn is_current(&self, id: &str, generation: u64) -> bool {
        self.subscriptions.borrow().get(id).is_some_and(|s| s.generation == generation)
    }

    /// One poll tick. Returns `false` when the loop should stop.
    async fn poll_once(&self, id: &str, generation: u64) -> bool {
        let target = self
            .subscriptions
            .borrow()
            .get(id)
            .filter(|s| s.generation == generation)
            .map(|s| (s.symbol.clone(), s.resolution));
        let Some((symbol, resolution)) = target else {
            return false;
        };

        let count = recent_bar_count(resolution);
        let now = self.clock.now_secs();
        let span = i64::from(count) * resolution.duration_secs().max(MINUTE_SECS);
        let query = HistoryQuery {
            symbol: symbol.clone(),
            resolution,
            window: FetchWindow { from: now - span, to: now, count_back: Some(count) },
        };

        let fetched = with_timeout(self.timer.as_ref(), self.request_timeout_ms, self.repository.fetch_history(&query))
            .await;

        if !self.is_current(id, generation) {
            return false;
        }

        let payload = match fetched {
            Some(Ok(payload)) => payload,
            Some(Err(e)) if e.is_fatal() => {
                crate::log_error!(
                    LogComponent::Application("RealtimePoller"),
                    "{} stopped polling {}: {}",
                    id,
                    symbol,
                    e
                );
                return false;
            }
            Some(Err(e)) => {
                let level = if e.is_retryable() { LogLevel::Warn } else { LogLevel::Error };
                get_logger().log_with_metadata(
                    level,
                    LogComponent::Application("RealtimePoller"),
                    &format!("poll failed, retrying next tick: {}", e),
                    &format!("subscriber={} symbol={} resolution={}", id, symbol, resolution),
                );
                return true;
            }
            None => {
                crate::log_warn!(
                    LogComponent::Application("RealtimePoller"),
                    "{} poll timed out after {} ms",
                    id,
                    self.request_timeout_ms
                );
                return true;
            }
        };

        let Some(latest) = BarSequenceService::normalize(payload.bars).pop() else {
            return true;
        };
        // Sanity: never emit a bar from the future.
        if latest.time > secs_to_millis(now + resolution.duration_secs()) {
            return true;
        }

        let callback = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let Some(handle) = subscriptions.get_mut(id) else {
                return false;
            };
            if !should_emit(handle.last_bar.as_ref(), &latest, resolution) {
                return true;
            }
            handle.last_bar = Some(latest);
            Rc::clone(&handle.on_bar)
        };

        callback(latest);

        let bot_key = self.selection.borrow().bot_key();
        if let Some(config_id) = bot_key {
            self.bot.on_bar(config_id, &latest);
        }
        true
    }
}
