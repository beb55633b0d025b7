mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{FakeBackend, ManualClock, NOW_SECS, PoolSpawner, StepTimer, bar, ok_payload};
use futures::executor::{LocalPool, block_on};
use insta::assert_json_snapshot;
use tradeline_datafeed::application::{
    Datafeed, HistoryProviderUseCase, PollerDeps, RealtimePollerUseCase, RequestTimeouts, SymbolResolverUseCase,
};
use tradeline_datafeed::domain::market_data::{Bar, PeriodParams, Resolution, SymbolInfo, SymbolRecord};
use tradeline_datafeed::domain::trading_config::{ConfigSelection, NoopBotListener};

fn datafeed(backend: &Rc<FakeBackend>, pool: &LocalPool) -> Datafeed<FakeBackend> {
    let clock = ManualClock::at_secs(NOW_SECS);
    let timer = StepTimer::with_budget(0);
    Datafeed::new(
        SymbolResolverUseCase::new(Rc::clone(backend)),
        HistoryProviderUseCase::new(Rc::clone(backend), clock.clone(), timer.clone(), RequestTimeouts::default()),
        RealtimePollerUseCase::new(
            Rc::clone(backend),
            PollerDeps {
                clock,
                timer,
                spawner: Rc::new(PoolSpawner(pool.spawner())),
                bot: Rc::new(NoopBotListener),
                selection: Rc::new(RefCell::new(ConfigSelection::default())),
                request_timeout_ms: 30_000,
            },
        ),
    )
}

#[test]
fn configuration_advertised_to_engine() {
    let pool = LocalPool::new();
    let feed = datafeed(&FakeBackend::new(), &pool);
    assert_json_snapshot!(feed.configure(), @r#"
    {
      "supportsSearch": true,
      "supportsGroupRequest": false,
      "supportedResolutions": [
        "1",
        "5",
        "15",
        "30",
        "60",
        "D",
        "W",
        "M"
      ]
    }
    "#);
}

#[test]
fn history_depth_hints() {
    let pool = LocalPool::new();
    let feed = datafeed(&FakeBackend::new(), &pool);
    assert_json_snapshot!(feed.history_depth(Resolution::OneMinute), @r#"
    {
      "resolutionBack": "D",
      "intervalBack": 1
    }
    "#);
    assert_json_snapshot!(feed.history_depth(Resolution::OneWeek), @r#"
    {
      "resolutionBack": "M",
      "intervalBack": 3
    }
    "#);
}

#[test]
fn resolve_then_load_first_page() {
    let backend = FakeBackend::new();
    backend.symbols.borrow_mut().insert("SOLUSDT".into(), SymbolRecord::default());
    let recent = bar((NOW_SECS - 3_600) * 1000, 150.0);
    backend.push_history(common::Reply::Now(Ok(ok_payload(vec![recent]))));
    let pool = LocalPool::new();
    let feed = datafeed(&backend, &pool);

    let info = block_on(feed.resolve_symbol("SOLUSDT")).unwrap();
    let params = PeriodParams { from: NOW_SECS - 86_400, to: NOW_SECS, first_data_request: true, count_back: Some(300) };
    let page = block_on(feed.get_bars(&info, Resolution::FiveMinutes, &params)).unwrap();

    assert_eq!(page.bars, vec![recent]);
    assert_eq!(backend.history_queries.borrow()[0].symbol, "SOLUSDT");
    assert_eq!(backend.history_queries.borrow()[0].window.count_back, Some(300));
}

#[test]
fn subscribe_and_unsubscribe_through_facade() {
    let pool = LocalPool::new();
    let feed = datafeed(&FakeBackend::new(), &pool);
    let info = SymbolInfo::from_record("BTCUSDT", SymbolRecord::default());

    feed.subscribe_bars(&info, Resolution::OneMinute, "chart-1", Rc::new(|_: Bar| {}));
    assert!(feed.poller().is_active("chart-1"));
    feed.unsubscribe_bars("chart-1");
    assert_eq!(feed.poller().active_count(), 0);
}
