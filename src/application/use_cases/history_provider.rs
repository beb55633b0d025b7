use std::rc::Rc;

use crate::domain::{
    errors::{DatafeedError, DatafeedResult},
    logging::LogComponent,
    market_data::{
        HistoryQuery, HistoryResult, HistoryStatus, PeriodParams, Resolution,
        repositories::MarketDataRepository,
        services::{BarSequenceService, HistoryWindowPlanner},
    },
    scheduling::{Clock, Timer, with_timeout},
};
use crate::time_utils::{format_utc, secs_to_millis};

/// Per-request time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub first_request_ms: u64,
    pub request_ms: u64,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self { first_request_ms: 60_000, request_ms: 30_000 }
    }
}

impl RequestTimeouts {
    pub fn for_request(&self, first_data_request: bool) -> u64 {
        if first_data_request { self.first_request_ms } else { self.request_ms }
    }
}

/// Use case answering the engine's history requests
pub struct HistoryProviderUseCase<R> {
    repository: Rc<R>,
    clock: Rc<dyn Clock>,
    timer: Rc<dyn Timer>,
    timeouts: RequestTimeouts,
}

impl<R: MarketDataRepository> HistoryProviderUseCase<R> {
    pub fn new(repository: Rc<R>, clock: Rc<dyn Clock>, timer: Rc<dyn Timer>, timeouts: RequestTimeouts) -> Self {
        Self { repository, clock, timer, timeouts }
    }

    /// Fetch, validate and slice bars for the engine's `[from, to]` window.
    ///
    /// On the first request any non-fatal failure degrades to an empty result
    /// that still lets the engine initialize; later failures are returned.
    pub async fn get_bars(
        &self,
        symbol: &str,
        resolution: Resolution,
        params: &PeriodParams,
    ) -> DatafeedResult<HistoryResult> {
        let window = HistoryWindowPlanner::plan(params, resolution, self.clock.now_secs());
        let query = HistoryQuery { symbol: symbol.to_string(), resolution, window };
        let timeout_ms = self.timeouts.for_request(params.first_data_request);

        crate::log_debug!(
            LogComponent::Application("HistoryProvider"),
            "{} {} requested [{}, {}] fetching [{}, {}]",
            symbol,
            resolution,
            params.from,
            params.to,
            format_utc(window.from),
            format_utc(window.to)
        );

        let fetched = with_timeout(self.timer.as_ref(), timeout_ms, self.repository.fetch_history(&query))
            .await
            .unwrap_or(Err(DatafeedError::Timeout { timeout_ms }));

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) if params.first_data_request => {
                crate::log_warn!(
                    LogComponent::Application("HistoryProvider"),
                    "first load for {} degraded to empty: {}",
                    symbol,
                    e
                );
                return Ok(HistoryResult::more_possible());
            }
            Err(e) => {
                crate::log_error!(
                    LogComponent::Application("HistoryProvider"),
                    "history for {} failed: {}",
                    symbol,
                    e
                );
                return Err(e);
            }
        };

        if payload.status == HistoryStatus::NoData {
            return Ok(HistoryResult::no_data());
        }

        let bars = BarSequenceService::normalize(payload.bars);
        if bars.is_empty() {
            return Ok(HistoryResult::no_data());
        }

        let slice = BarSequenceService::slice(&bars, secs_to_millis(params.from), secs_to_millis(params.to));
        if slice.is_empty() && params.first_data_request {
            return Ok(HistoryResult { bars, no_data: false });
        }
        Ok(HistoryResult { bars: slice, no_data: false })
    }
}
