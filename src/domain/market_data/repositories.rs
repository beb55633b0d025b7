use super::history::{HistoryPayload, HistoryQuery};
use super::symbols::{SymbolRecord, SymbolSummary};
use crate::domain::errors::DatafeedResult;

/// Backend market-data endpoints the datafeed pulls from
#[allow(async_fn_in_trait)]
pub trait MarketDataRepository {
    async fn fetch_history(&self, query: &HistoryQuery) -> DatafeedResult<HistoryPayload>;

    async fn resolve_symbol(&self, symbol: &str) -> DatafeedResult<SymbolRecord>;

    async fn search_symbols(&self, query: &str, limit: usize) -> DatafeedResult<Vec<SymbolSummary>>;
}
