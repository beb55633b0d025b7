use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::domain::{
    errors::{DatafeedError, DatafeedResult},
    logging::{LogComponent, get_logger},
    market_data::{Symbol, SymbolInfo, SymbolSummary, repositories::MarketDataRepository},
};

/// Use case turning tickers and free-text queries into engine metadata
pub struct SymbolResolverUseCase<R> {
    repository: Rc<R>,
    cache: RefCell<HashMap<String, SymbolInfo>>,
}

impl<R: MarketDataRepository> SymbolResolverUseCase<R> {
    pub const SEARCH_LIMIT: usize = 30;

    pub fn new(repository: Rc<R>) -> Self {
        Self { repository, cache: RefCell::new(HashMap::new()) }
    }

    /// Resolve a ticker, memoizing successful lookups.
    ///
    /// Backend failures become `UnresolvedSymbol` except for an expired
    /// session, which is passed through unchanged.
    pub async fn resolve(&self, name: &str) -> DatafeedResult<SymbolInfo> {
        let symbol = Symbol::new(name).map_err(|_| DatafeedError::UnresolvedSymbol(name.to_string()))?;

        if let Some(info) = self.cache.borrow().get(symbol.value()) {
            return Ok(info.clone());
        }

        match self.repository.resolve_symbol(symbol.value()).await {
            Ok(record) => {
                let info = SymbolInfo::from_record(symbol.value(), record);
                self.cache.borrow_mut().insert(symbol.value().to_string(), info.clone());
                get_logger().debug(
                    LogComponent::Application("SymbolResolver"),
                    &format!("resolved {} (pricescale {})", info.ticker, info.pricescale),
                );
                Ok(info)
            }
            Err(DatafeedError::SessionExpired) => Err(DatafeedError::SessionExpired),
            Err(e) => {
                get_logger().warn(
                    LogComponent::Application("SymbolResolver"),
                    &format!("cannot resolve {}: {}", symbol, e),
                );
                Err(DatafeedError::UnresolvedSymbol(symbol.value().to_string()))
            }
        }
    }

    /// Search never fails; backend errors yield an empty list.
    pub async fn search(&self, query: &str) -> Vec<SymbolSummary> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.repository.search_symbols(query, Self::SEARCH_LIMIT).await {
            Ok(mut results) => {
                results.truncate(Self::SEARCH_LIMIT);
                results
            }
            Err(e) => {
                crate::log_warn!(
                    LogComponent::Application("SymbolResolver"),
                    "search '{}' failed: {}",
                    query,
                    e
                );
                Vec::new()
            }
        }
    }

    pub fn cached(&self, ticker: &str) -> Option<SymbolInfo> {
        self.cache.borrow().get(ticker).cloned()
    }
}
