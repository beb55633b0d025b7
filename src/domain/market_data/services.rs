use super::entities::Bar;
use super::history::{FetchWindow, PeriodParams};
use super::value_objects::Resolution;
use crate::time_utils::{DAY_SECS, HOUR_SECS};

/// Domain service translating engine requests into backend fetch windows
pub struct HistoryWindowPlanner;

impl HistoryWindowPlanner {
    pub const MAX_COUNT_BACK: u32 = 500;
    const SYMMETRIC_BUFFER_BARS: i64 = 50;
    const FORWARD_BUFFER_BARS: i64 = 2;

    pub fn plan(params: &PeriodParams, resolution: Resolution, now: i64) -> FetchWindow {
        let count_back = Self::count_back_hint(params.count_back);
        if params.first_data_request {
            Self::plan_first(params, resolution, now, count_back)
        } else {
            Self::plan_scroll(params, resolution, now, count_back)
        }
    }

    /// Trailing window fetched on the first request for a symbol.
    pub fn initial_lookback_secs(resolution: Resolution) -> i64 {
        match resolution.minutes() {
            m if m <= 1 => 12 * HOUR_SECS,
            m if m <= 5 => 2 * DAY_SECS,
            m if m <= 15 => 3 * DAY_SECS,
            m if m <= 60 => 7 * DAY_SECS,
            _ => 30 * DAY_SECS,
        }
    }

    pub fn max_expansion_secs(resolution: Resolution) -> i64 {
        match resolution.minutes() {
            m if m <= 5 => 5 * DAY_SECS,
            m if m <= 60 => 10 * DAY_SECS,
            _ => 20 * DAY_SECS,
        }
    }

    pub fn forward_buffer_secs(resolution: Resolution) -> i64 {
        (Self::FORWARD_BUFFER_BARS * resolution.duration_secs()).min(HOUR_SECS)
    }

    pub fn symmetric_buffer_secs(resolution: Resolution) -> i64 {
        (Self::SYMMETRIC_BUFFER_BARS * resolution.duration_secs()).min(DAY_SECS)
    }

    pub fn count_back_hint(count_back: Option<u32>) -> Option<u32> {
        count_back.filter(|n| (1..=Self::MAX_COUNT_BACK).contains(n))
    }

    fn plan_first(
        params: &PeriodParams,
        resolution: Resolution,
        now: i64,
        count_back: Option<u32>,
    ) -> FetchWindow {
        let lookback = Self::initial_lookback_secs(resolution);
        let to = params.to.min(now);
        let from = (now - lookback).min(to - lookback);
        FetchWindow { from, to, count_back }
    }

    fn plan_scroll(
        params: &PeriodParams,
        resolution: Resolution,
        now: i64,
        count_back: Option<u32>,
    ) -> FetchWindow {
        let gap = now - params.from;
        let (from, to) = if gap > DAY_SECS {
            let expansion = Self::max_expansion_secs(resolution).min(gap / 2);
            (params.from - expansion, params.to + Self::forward_buffer_secs(resolution))
        } else {
            let buffer = Self::symmetric_buffer_secs(resolution);
            (params.from - buffer, params.to + buffer)
        };

        let to = to.min(now);
        let from = if from >= to { to - Self::symmetric_buffer_secs(resolution) } else { from };
        FetchWindow { from, to, count_back }
    }
}

/// Domain service enforcing the bar-sequence invariants
pub struct BarSequenceService;

impl BarSequenceService {
    /// Drop invalid bars, sort ascending and keep the last bar per timestamp.
    pub fn normalize(bars: Vec<Bar>) -> Vec<Bar> {
        let mut valid: Vec<Bar> = bars.into_iter().filter(Bar::is_valid).collect();
        valid.sort_by_key(|bar| bar.time);

        let mut out: Vec<Bar> = Vec::with_capacity(valid.len());
        for bar in valid {
            match out.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => out.push(bar),
            }
        }
        out
    }

    /// Bars whose time falls inside `[from_ms, to_ms]`.
    pub fn slice(bars: &[Bar], from_ms: i64, to_ms: i64) -> Vec<Bar> {
        bars.iter().filter(|bar| bar.time >= from_ms && bar.time <= to_ms).copied().collect()
    }

    pub fn is_strictly_ascending(bars: &[Bar]) -> bool {
        bars.windows(2).all(|pair| pair[0].time < pair[1].time)
    }
}
