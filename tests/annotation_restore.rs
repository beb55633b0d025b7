mod common;

use std::rc::Rc;

use common::{FakeEngine, ManualClock, NOW_SECS, StepTimer};
use futures::executor::block_on;
use tradeline_datafeed::application::{AnnotationCaptureUseCase, AnnotationRestorerUseCase, RoleRestoration};
use tradeline_datafeed::domain::annotations::services::line_matches;
use tradeline_datafeed::domain::annotations::{
    HORIZONTAL_LINE, LayoutData, LevelType, Line, OtherDrawings, Point, RawShape, TREND_LINE, TpSlSettings,
};
use tradeline_datafeed::domain::chart::{ChartHandle, EngineCapabilities};
use tradeline_datafeed::domain::errors::AnnotationError;
use tradeline_datafeed::domain::ownership::{OperationKind, OwnershipGuard, SharedOwnership};
use tradeline_datafeed::domain::trading_config::ConfigId;
use tradeline_datafeed::time_utils::{HOUR_SECS, YEAR_SECS};

fn restorer() -> AnnotationRestorerUseCase {
    AnnotationRestorerUseCase::new(ManualClock::at_secs(NOW_SECS), StepTimer::unlimited(), 300)
}

fn guard() -> OwnershipGuard {
    let map: SharedOwnership = Rc::default();
    OwnershipGuard::claim(&map, OperationKind::Loading, ConfigId(1))
}

fn entry_line() -> Line {
    Line::new(Point::new(NOW_SECS - 2 * HOUR_SECS, 100.0), Point::new(NOW_SECS - HOUR_SECS, 105.0))
}

fn exit_line() -> Line {
    Line::new(Point::new(NOW_SECS - HOUR_SECS, 108.0), Point::new(NOW_SECS - 600, 104.0))
}

fn trend(line: &Line) -> RawShape {
    RawShape::new(TREND_LINE, line.points().to_vec())
}

fn with_drawings(drawings: Vec<RawShape>) -> LayoutData {
    LayoutData {
        other_drawings: OtherDrawings { tradingview_drawings: Some(drawings), ..OtherDrawings::default() },
        ..LayoutData::default()
    }
}

#[test]
fn entry_without_drawings_yields_exactly_one_line() {
    let engine = FakeEngine::full();
    engine.add(trend(&exit_line()));
    engine.add(RawShape::new(HORIZONTAL_LINE, vec![Point::new(NOW_SECS, 99.0)]));
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData { entry_line: Some(entry_line()), ..LayoutData::default() };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.entry, RoleRestoration::Redrawn);
    assert_eq!(report.exit, RoleRestoration::NotRequested);
    assert_eq!(engine.count(), 1);
    assert_eq!(report.shapes_on_chart, 1);
    let drawn = engine.snapshot();
    assert_eq!(drawn[0].as_line(), Some(entry_line()));
}

#[test]
fn recreated_drawing_within_tolerance_counts_as_the_role() {
    let engine = FakeEngine::full();
    let chart = ChartHandle::new(engine.clone());
    let nudged = Line::new(
        Point::new(entry_line().p1.time + 30, 100.005),
        Point::new(entry_line().p2.time - 30, 104.995),
    );
    let layout = LayoutData { entry_line: Some(entry_line()), ..with_drawings(vec![trend(&nudged)]) };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.entry, RoleRestoration::Matched);
    assert_eq!(report.recreated, 1);
    assert_eq!(engine.count(), 1);
}

#[test]
fn create_then_set_is_used_without_multipoint_support() {
    let engine = FakeEngine::with_caps(EngineCapabilities {
        can_create_and_set_point: true,
        ..EngineCapabilities::default()
    });
    let chart = ChartHandle::new(engine.clone());
    let layout = with_drawings(vec![trend(&entry_line())]);

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.recreated, 1);
    let ops = engine.ops.borrow();
    assert!(ops.iter().any(|op| op == "create"));
    assert!(ops.iter().any(|op| op == "set_points"));
    assert!(!ops.iter().any(|op| op == "create_multipoint"));
    assert_eq!(engine.snapshot()[0].points.len(), 2);
}

#[test]
fn half_created_shapes_are_removed() {
    let engine = FakeEngine::with_caps(EngineCapabilities {
        can_create_and_set_point: true,
        ..EngineCapabilities::default()
    });
    engine.fail_set_points.set(true);
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData { entry_line: Some(entry_line()), ..with_drawings(vec![trend(&exit_line())]) };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.recreated, 0);
    assert_eq!(report.entry, RoleRestoration::Failed);
    assert!(!report.entry.is_satisfied());
    assert_eq!(engine.count(), 0);
}

#[test]
fn shapes_surviving_bulk_clear_are_removed_one_by_one() {
    let engine = FakeEngine::full();
    for i in 0..3 {
        engine.add(RawShape::new(TREND_LINE, vec![Point::new(i, 1.0), Point::new(i + 60, 2.0)]));
    }
    engine.stuck_clears.set(1);
    let chart = ChartHandle::new(engine.clone());

    let report = block_on(restorer().restore(&chart, &LayoutData::default(), &guard())).unwrap();

    assert_eq!(engine.count(), 0);
    assert_eq!(report.shapes_on_chart, 0);
    assert_eq!(engine.ops.borrow().iter().filter(|op| *op == "remove").count(), 3);
}

#[test]
fn superseded_restore_leaves_chart_untouched() {
    let engine = FakeEngine::full();
    engine.add(trend(&exit_line()));
    let chart = ChartHandle::new(engine.clone());
    let map: SharedOwnership = Rc::default();
    let stale = OwnershipGuard::claim(&map, OperationKind::Loading, ConfigId(7));
    let _newer = OwnershipGuard::claim(&map, OperationKind::Loading, ConfigId(9));
    let layout = LayoutData { entry_line: Some(entry_line()), ..LayoutData::default() };

    let result = block_on(restorer().restore(&chart, &layout, &stale));

    assert_eq!(result, Err(AnnotationError::StaleOperation));
    assert_eq!(engine.mutations(), 0);
    assert_eq!(engine.count(), 1);
}

#[test]
fn detached_chart_is_reported() {
    let layout = LayoutData { entry_line: Some(entry_line()), ..LayoutData::default() };
    let result = block_on(restorer().restore(&ChartHandle::detached(), &layout, &guard()));
    assert_eq!(result, Err(AnnotationError::EngineDetached));
}

#[test]
fn take_profit_and_stop_loss_levels_are_drawn() {
    let engine = FakeEngine::full();
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData {
        entry_line: Some(entry_line()),
        tpsl_settings: Some(TpSlSettings {
            tp_type: LevelType::Percent,
            tp_value: Some(10.0),
            sl_type: LevelType::Absolute,
            sl_value: Some(90.0),
        }),
        ..LayoutData::default()
    };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.levels, 2);
    assert_eq!(engine.count(), 3);
    let levels: Vec<Point> = engine
        .snapshot()
        .into_iter()
        .filter(RawShape::is_horizontal_level)
        .map(|s| s.points[0])
        .collect();
    assert_eq!(levels.len(), 2);
    assert!((levels[0].price - 110.0).abs() < 1e-9);
    assert_eq!(levels[1].price, 90.0);
    assert!(levels.iter().all(|p| p.time == entry_line().p1.time));
}

#[test]
fn native_layout_is_loaded_without_recreating_drawings() {
    let engine = FakeEngine::full();
    let chart = ChartHandle::new(engine.clone());
    let stale_level = RawShape::new(HORIZONTAL_LINE, vec![Point::new(NOW_SECS, 120.0)]);
    let native = serde_json::json!({ "sources": vec![trend(&entry_line()), stale_level] });
    let layout = LayoutData {
        entry_line: Some(entry_line()),
        other_drawings: OtherDrawings {
            tradingview_layout: Some(native),
            tradingview_drawings: Some(vec![trend(&exit_line())]),
            ..OtherDrawings::default()
        },
        ..LayoutData::default()
    };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert!(report.layout_loaded);
    assert_eq!(report.entry, RoleRestoration::Matched);
    assert_eq!(engine.count(), 1);
    assert!(!engine.ops.borrow().iter().any(|op| op == "create_multipoint"));
}

#[test]
fn drawings_outside_age_window_are_dropped() {
    let engine = FakeEngine::full();
    let chart = ChartHandle::new(engine.clone());
    let ancient = Line::new(Point::new(NOW_SECS - YEAR_SECS - 10, 100.0), Point::new(NOW_SECS - YEAR_SECS + 10, 101.0));
    let layout = LayoutData { entry_line: Some(ancient), ..with_drawings(vec![trend(&ancient)]) };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.recreated, 0);
    // Role lines only need finite prices.
    assert_eq!(report.entry, RoleRestoration::Redrawn);
    assert_eq!(engine.count(), 1);
}

#[test]
fn capture_after_restore_reproduces_roles() {
    let engine = FakeEngine::full();
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData {
        entry_line: Some(entry_line()),
        exit_line: Some(exit_line()),
        tpsl_settings: Some(TpSlSettings { tp_value: Some(120.0), ..TpSlSettings::default() }),
        ..with_drawings(vec![trend(&entry_line()), trend(&exit_line())])
    };

    block_on(restorer().restore(&chart, &layout, &guard())).unwrap();
    let captured = AnnotationCaptureUseCase::new(ManualClock::at_secs(NOW_SECS))
        .capture(&chart, Some(&layout))
        .unwrap();

    assert!(line_matches(&captured.entry_line.unwrap(), &entry_line()));
    assert!(line_matches(&captured.exit_line.unwrap(), &exit_line()));
    assert_eq!(captured.other_drawings.tradingview_drawings.map(|d| d.len()), Some(2));
    assert_eq!(captured.tpsl_settings, layout.tpsl_settings);
}

#[test]
fn shapes_missing_after_recreation_force_role_redraw() {
    let engine = FakeEngine::full();
    engine.drop_created.set(1);
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData { entry_line: Some(entry_line()), ..with_drawings(vec![trend(&entry_line())]) };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.recreated, 1);
    assert_eq!(report.entry, RoleRestoration::Redrawn);
    assert_eq!(engine.count(), 1);
    assert_eq!(engine.snapshot()[0].as_line(), Some(entry_line()));
}

#[test]
fn read_only_engine_reports_roles_as_failed() {
    let engine = FakeEngine::with_caps(EngineCapabilities { can_bulk_read_shapes: true, ..EngineCapabilities::default() });
    let chart = ChartHandle::new(engine.clone());
    let layout = LayoutData { entry_line: Some(entry_line()), ..with_drawings(vec![trend(&exit_line())]) };

    let report = block_on(restorer().restore(&chart, &layout, &guard())).unwrap();

    assert_eq!(report.recreated, 0);
    assert_eq!(report.entry, RoleRestoration::Failed);
    assert!(!engine.ops.borrow().iter().any(|op| op.starts_with("create")));
}
