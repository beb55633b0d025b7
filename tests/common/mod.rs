#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::LocalSpawner;
use futures::future::{self, LocalBoxFuture};
use futures::task::LocalSpawnExt;

use tradeline_datafeed::domain::{
    annotations::{Point, RawShape},
    chart::{ChartEngine, EngineCapabilities, ShapeId},
    errors::{AnnotationError, AnnotationResult, DatafeedError, DatafeedResult},
    events::{EventDispatcher, SessionEvent},
    market_data::{
        Bar, HistoryPayload, HistoryQuery, HistoryStatus, SymbolRecord, SymbolSummary,
        repositories::MarketDataRepository,
    },
    scheduling::{Clock, TaskSpawner, Timer},
    trading_config::{BotListener, ConfigId, ConfigRepository, TradingConfig},
};

pub const NOW_SECS: i64 = 1_700_000_000;

pub fn bar(time_ms: i64, close: f64) -> Bar {
    Bar::new(time_ms, close, close + 1.0, close - 1.0, close, 10.0)
}

pub fn ok_payload(bars: Vec<Bar>) -> HistoryPayload {
    HistoryPayload { status: HistoryStatus::Ok, bars }
}

// ---------------------------------------------------------------- clock / timer

pub struct ManualClock {
    now_ms: Cell<i64>,
}

impl ManualClock {
    pub fn at_secs(secs: i64) -> Rc<Self> {
        Rc::new(Self { now_ms: Cell::new(secs * 1000) })
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now_ms.set(self.now_ms.get() + secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }
}

/// Completes the first `budget` sleeps immediately, then never again.
pub struct StepTimer {
    budget: Cell<usize>,
    pub requested: RefCell<Vec<u64>>,
}

impl StepTimer {
    pub fn unlimited() -> Rc<Self> {
        Self::with_budget(usize::MAX)
    }

    pub fn with_budget(budget: usize) -> Rc<Self> {
        Rc::new(Self { budget: Cell::new(budget), requested: RefCell::new(Vec::new()) })
    }

    pub fn add_budget(&self, extra: usize) {
        self.budget.set(self.budget.get().saturating_add(extra));
    }
}

impl Timer for StepTimer {
    fn sleep(&self, ms: u64) -> LocalBoxFuture<'static, ()> {
        self.requested.borrow_mut().push(ms);
        let left = self.budget.get();
        if left == 0 {
            return Box::pin(future::pending());
        }
        self.budget.set(left - 1);
        Box::pin(future::ready(()))
    }
}

pub struct PoolSpawner(pub LocalSpawner);

impl TaskSpawner for PoolSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.0.spawn_local(task).expect("local pool is alive");
    }
}

// ---------------------------------------------------------------- repository

pub enum Reply<T> {
    Now(DatafeedResult<T>),
    Hang,
    Gate(oneshot::Receiver<()>, DatafeedResult<T>),
}

#[derive(Default)]
pub struct FakeBackend {
    pub history: RefCell<VecDeque<Reply<HistoryPayload>>>,
    /// Served once `history` runs dry
    pub default_history: RefCell<Option<HistoryPayload>>,
    pub history_queries: RefCell<Vec<HistoryQuery>>,
    pub symbols: RefCell<HashMap<String, SymbolRecord>>,
    pub symbol_calls: Cell<usize>,
    pub search: RefCell<Option<DatafeedResult<Vec<SymbolSummary>>>>,
    pub configs: RefCell<HashMap<ConfigId, TradingConfig>>,
    pub get_failures: RefCell<HashMap<ConfigId, DatafeedError>>,
    pub get_gates: RefCell<HashMap<ConfigId, oneshot::Receiver<()>>>,
    pub put_replies: RefCell<VecDeque<Reply<()>>>,
    pub puts: RefCell<Vec<TradingConfig>>,
}

impl FakeBackend {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push_history(&self, reply: Reply<HistoryPayload>) {
        self.history.borrow_mut().push_back(reply);
    }

    pub fn insert_config(&self, config: TradingConfig) {
        self.configs.borrow_mut().insert(config.id, config);
    }

    /// Holds the next GET for `id` until the returned sender fires.
    pub fn gate_next_get(&self, id: ConfigId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.get_gates.borrow_mut().insert(id, rx);
        tx
    }

    /// Holds the next PUT until the returned sender fires.
    pub fn gate_next_put(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.put_replies.borrow_mut().push_back(Reply::Gate(rx, Ok(())));
        tx
    }
}

async fn settle<T>(reply: Reply<T>) -> DatafeedResult<T> {
    match reply {
        Reply::Now(result) => result,
        Reply::Hang => future::pending().await,
        Reply::Gate(gate, result) => {
            let _ = gate.await;
            result
        }
    }
}

impl MarketDataRepository for FakeBackend {
    async fn fetch_history(&self, query: &HistoryQuery) -> DatafeedResult<HistoryPayload> {
        self.history_queries.borrow_mut().push(query.clone());
        let next = self.history.borrow_mut().pop_front();
        match next {
            Some(reply) => settle(reply).await,
            None => Ok(self.default_history.borrow().clone().unwrap_or_else(HistoryPayload::no_data)),
        }
    }

    async fn resolve_symbol(&self, symbol: &str) -> DatafeedResult<SymbolRecord> {
        self.symbol_calls.set(self.symbol_calls.get() + 1);
        self.symbols
            .borrow()
            .get(symbol)
            .cloned()
            .ok_or(DatafeedError::Backend { status: 404, message: "not found".into() })
    }

    async fn search_symbols(&self, _query: &str, _limit: usize) -> DatafeedResult<Vec<SymbolSummary>> {
        self.search.borrow().clone().unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl ConfigRepository for FakeBackend {
    async fn get_config(&self, id: ConfigId) -> DatafeedResult<TradingConfig> {
        let gate = self.get_gates.borrow_mut().remove(&id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(error) = self.get_failures.borrow().get(&id) {
            return Err(error.clone());
        }
        self.configs
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(DatafeedError::Backend { status: 404, message: "no config".into() })
    }

    async fn put_config(&self, config: &TradingConfig) -> DatafeedResult<TradingConfig> {
        self.puts.borrow_mut().push(config.clone());
        let reply = self.put_replies.borrow_mut().pop_front().unwrap_or(Reply::Now(Ok(())));
        settle(reply).await?;
        let mut stored = config.clone();
        stored.extra.insert("version".into(), serde_json::json!(self.puts.borrow().len()));
        self.configs.borrow_mut().insert(stored.id, stored.clone());
        Ok(stored)
    }
}

// ---------------------------------------------------------------- chart engine

#[derive(Default)]
pub struct FakeEngine {
    pub caps: Cell<EngineCapabilities>,
    pub shapes: RefCell<Vec<(ShapeId, RawShape)>>,
    next_id: Cell<u32>,
    /// Number of upcoming `remove_all_shapes` calls that silently do nothing
    pub stuck_clears: Cell<u32>,
    pub fail_set_points: Cell<bool>,
    /// Number of upcoming creations that return an id but never reach the chart
    pub drop_created: Cell<u32>,
    pub fail_bulk_read: Cell<bool>,
    pub ops: RefCell<Vec<String>>,
}

impl FakeEngine {
    pub fn with_caps(caps: EngineCapabilities) -> Rc<Self> {
        let engine = Self::default();
        engine.caps.set(caps);
        Rc::new(engine)
    }

    pub fn full() -> Rc<Self> {
        Self::with_caps(EngineCapabilities::full())
    }

    pub fn add(&self, shape: RawShape) -> ShapeId {
        let id = format!("s{}", self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        let mut stored = shape;
        stored.id = Some(id.clone());
        self.shapes.borrow_mut().push((id.clone(), stored));
        id
    }

    pub fn count(&self) -> usize {
        self.shapes.borrow().len()
    }

    pub fn snapshot(&self) -> Vec<RawShape> {
        self.shapes.borrow().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn mutations(&self) -> usize {
        self.ops.borrow().iter().filter(|op| !op.starts_with("read")).count()
    }

    fn log(&self, op: &str) {
        self.ops.borrow_mut().push(op.to_string());
    }

    fn store_created(&self, shape: RawShape) -> ShapeId {
        if self.drop_created.get() > 0 {
            self.drop_created.set(self.drop_created.get() - 1);
            let id = format!("s{}", self.next_id.get());
            self.next_id.set(self.next_id.get() + 1);
            return id;
        }
        self.add(shape)
    }
}

impl ChartEngine for FakeEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.caps.get()
    }

    fn shape_ids(&self) -> AnnotationResult<Vec<ShapeId>> {
        self.log("read:ids");
        Ok(self.shapes.borrow().iter().map(|(id, _)| id.clone()).collect())
    }

    fn read_all_shapes(&self) -> AnnotationResult<Vec<RawShape>> {
        self.log("read:all");
        if !self.caps.get().can_bulk_read_shapes || self.fail_bulk_read.get() {
            return Err(AnnotationError::EngineCapabilityMissing("bulk shape read"));
        }
        Ok(self.snapshot())
    }

    fn read_shape(&self, id: &str) -> AnnotationResult<RawShape> {
        self.log("read:shape");
        self.shapes
            .borrow()
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| AnnotationError::Engine(format!("no shape {}", id)))
    }

    fn save_layout(&self) -> AnnotationResult<serde_json::Value> {
        self.log("read:layout");
        if !self.caps.get().can_serialize_layout {
            return Err(AnnotationError::EngineCapabilityMissing("layout serialization"));
        }
        Ok(serde_json::json!({ "sources": self.snapshot() }))
    }

    fn load_layout(&self, layout: &serde_json::Value) -> AnnotationResult<()> {
        self.log("load_layout");
        let shapes: Vec<RawShape> = serde_json::from_value(layout["sources"].clone())
            .map_err(|e| AnnotationError::Engine(e.to_string()))?;
        self.shapes.borrow_mut().clear();
        for shape in shapes {
            self.add(shape);
        }
        Ok(())
    }

    fn remove_all_shapes(&self) -> AnnotationResult<()> {
        self.log("remove_all");
        if self.stuck_clears.get() > 0 {
            self.stuck_clears.set(self.stuck_clears.get() - 1);
            return Ok(());
        }
        self.shapes.borrow_mut().clear();
        Ok(())
    }

    fn remove_shape(&self, id: &str) -> AnnotationResult<()> {
        self.log("remove");
        self.shapes.borrow_mut().retain(|(sid, _)| sid != id);
        Ok(())
    }

    fn create_multipoint_shape(&self, shape: &RawShape) -> AnnotationResult<ShapeId> {
        self.log("create_multipoint");
        Ok(self.store_created(shape.clone()))
    }

    fn create_shape(&self, name: &str, point: Point, properties: &serde_json::Value) -> AnnotationResult<ShapeId> {
        self.log("create");
        let mut shape = RawShape::new(name, vec![point]);
        shape.properties = properties.clone();
        Ok(self.store_created(shape))
    }

    fn set_shape_points(&self, id: &str, points: &[Point]) -> AnnotationResult<()> {
        self.log("set_points");
        if self.fail_set_points.get() {
            return Err(AnnotationError::Engine("set points rejected".into()));
        }
        let mut shapes = self.shapes.borrow_mut();
        let (_, shape) = shapes
            .iter_mut()
            .find(|(sid, _)| sid == id)
            .ok_or_else(|| AnnotationError::Engine(format!("no shape {}", id)))?;
        shape.points = points.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------- listeners

#[derive(Default)]
pub struct RecordingBot {
    pub bars: RefCell<Vec<(ConfigId, Bar)>>,
    pub line_updates: RefCell<Vec<TradingConfig>>,
}

impl BotListener for RecordingBot {
    fn on_bar(&self, config_id: ConfigId, bar: &Bar) {
        self.bars.borrow_mut().push((config_id, *bar));
    }

    fn on_lines_updated(&self, config: &TradingConfig) {
        self.line_updates.borrow_mut().push(config.clone());
    }
}

#[derive(Default)]
pub struct RecordingEvents {
    pub events: RefCell<Vec<SessionEvent>>,
}

impl EventDispatcher for RecordingEvents {
    fn publish_session_event(&self, event: SessionEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl RecordingEvents {
    pub fn names(&self) -> Vec<&'static str> {
        use tradeline_datafeed::domain::events::DomainEvent;
        self.events.borrow().iter().map(|e| e.event_type()).collect()
    }
}
