use quickcheck_macros::quickcheck;
use tradeline_datafeed::domain::market_data::{
    PeriodParams, Resolution, services::HistoryWindowPlanner,
};
use tradeline_datafeed::time_utils::{DAY_SECS, HOUR_SECS};

const NOW: i64 = 1_700_000_000;

fn first(from: i64, to: i64) -> PeriodParams {
    PeriodParams { from, to, first_data_request: true, count_back: None }
}

fn scroll(from: i64, to: i64) -> PeriodParams {
    PeriodParams { from, to, first_data_request: false, count_back: None }
}

#[test]
fn first_five_minute_request_is_clamped_to_two_days() {
    let window = HistoryWindowPlanner::plan(&first(NOW - 30 * DAY_SECS, NOW), Resolution::FiveMinutes, NOW);
    assert_eq!(window.to, NOW);
    assert_eq!(window.from, NOW - 2 * DAY_SECS);
}

#[test]
fn first_request_lookback_scales_with_resolution() {
    let cases = [
        (Resolution::OneMinute, 12 * HOUR_SECS),
        (Resolution::FifteenMinutes, 3 * DAY_SECS),
        (Resolution::OneHour, 7 * DAY_SECS),
        (Resolution::OneDay, 30 * DAY_SECS),
    ];
    for (resolution, lookback) in cases {
        let window = HistoryWindowPlanner::plan(&first(NOW - 400 * DAY_SECS, NOW + 3_600), resolution, NOW);
        assert_eq!(window.span_secs(), lookback, "{}", resolution);
        assert_eq!(window.to, NOW);
    }
}

#[test]
fn deep_scroll_expands_backwards_by_capped_amount() {
    let params = scroll(NOW - 40 * DAY_SECS, NOW - 39 * DAY_SECS);
    let window = HistoryWindowPlanner::plan(&params, Resolution::FiveMinutes, NOW);
    assert_eq!(window.from, params.from - 5 * DAY_SECS);
    assert_eq!(window.to, params.to + 10 * 60);
}

#[test]
fn recent_scroll_gets_symmetric_buffer() {
    let params = scroll(NOW - 6 * HOUR_SECS, NOW - 3 * HOUR_SECS);
    let window = HistoryWindowPlanner::plan(&params, Resolution::OneMinute, NOW);
    assert_eq!(window.from, params.from - 50 * 60);
    assert_eq!(window.to, params.to + 50 * 60);
}

#[test]
fn count_back_is_forwarded_only_when_sane() {
    let mut params = first(NOW - DAY_SECS, NOW);
    params.count_back = Some(300);
    assert_eq!(HistoryWindowPlanner::plan(&params, Resolution::OneHour, NOW).count_back, Some(300));
    params.count_back = Some(5_000);
    assert_eq!(HistoryWindowPlanner::plan(&params, Resolution::OneHour, NOW).count_back, None);
    params.count_back = Some(0);
    assert_eq!(HistoryWindowPlanner::plan(&params, Resolution::OneHour, NOW).count_back, None);
}

#[quickcheck]
fn planned_window_never_reaches_past_now(offset_from: u32, span: u32, first_request: bool, pick: u8) -> bool {
    let resolutions = Resolution::supported();
    let resolution = resolutions[pick as usize % resolutions.len()];
    let from = NOW - i64::from(offset_from % (400 * DAY_SECS as u32));
    let to = from + i64::from(span % (60 * DAY_SECS as u32));
    let params = PeriodParams { from, to, first_data_request: first_request, count_back: None };
    let window = HistoryWindowPlanner::plan(&params, resolution, NOW);
    window.to <= NOW && window.from < window.to
}
