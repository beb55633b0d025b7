use super::use_cases::{
    BarCallback, HistoryProviderUseCase, RealtimePollerUseCase, SymbolResolverUseCase,
};
use crate::domain::{
    errors::DatafeedResult,
    market_data::{
        DatafeedConfiguration, HistoryDepth, HistoryResult, PeriodParams, Resolution, SymbolInfo,
        SymbolSummary, repositories::MarketDataRepository,
    },
};

/// Datafeed protocol surface consumed by the charting engine.
///
/// Every operation returns a `Result`; the presentation layer maps it onto the
/// engine's success/error callbacks.
pub struct Datafeed<R> {
    resolver: SymbolResolverUseCase<R>,
    history: HistoryProviderUseCase<R>,
    poller: RealtimePollerUseCase<R>,
}

impl<R: MarketDataRepository + 'static> Datafeed<R> {
    pub fn new(
        resolver: SymbolResolverUseCase<R>,
        history: HistoryProviderUseCase<R>,
        poller: RealtimePollerUseCase<R>,
    ) -> Self {
        Self { resolver, history, poller }
    }

    pub fn configure(&self) -> DatafeedConfiguration {
        DatafeedConfiguration::default()
    }

    pub async fn search_symbols(&self, query: &str) -> Vec<SymbolSummary> {
        self.resolver.search(query).await
    }

    pub async fn resolve_symbol(&self, name: &str) -> DatafeedResult<SymbolInfo> {
        self.resolver.resolve(name).await
    }

    pub async fn get_bars(
        &self,
        symbol: &SymbolInfo,
        resolution: Resolution,
        params: &PeriodParams,
    ) -> DatafeedResult<HistoryResult> {
        self.history.get_bars(&symbol.ticker, resolution, params).await
    }

    pub fn subscribe_bars(&self, symbol: &SymbolInfo, resolution: Resolution, subscriber_id: &str, on_bar: BarCallback) {
        self.poller.subscribe(subscriber_id, &symbol.ticker, resolution, on_bar);
    }

    pub fn unsubscribe_bars(&self, subscriber_id: &str) {
        self.poller.unsubscribe(subscriber_id);
    }

    pub fn history_depth(&self, resolution: Resolution) -> HistoryDepth {
        HistoryDepth::for_resolution(resolution)
    }

    pub fn poller(&self) -> &RealtimePollerUseCase<R> {
        &self.poller
    }
}
