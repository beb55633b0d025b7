//! Backend REST client: UDF market data plus configuration persistence.

pub mod dto;

use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use self::dto::{UdfHistoryResponse, status_error};
use crate::domain::{
    errors::{DatafeedError, DatafeedResult},
    logging::{LogComponent, get_logger},
    market_data::{HistoryPayload, HistoryQuery, SymbolRecord, SymbolSummary, repositories::MarketDataRepository},
    trading_config::{ConfigId, ConfigRepository, TradingConfig},
};
use crate::settings::DatafeedSettings;

/// HTTP client for the trading backend, bearer token on every call
#[derive(Debug, Clone)]
pub struct BackendHttpClient {
    base_url: String,
    auth_token: Option<String>,
}

impl BackendHttpClient {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), auth_token }
    }

    pub fn from_settings(settings: &DatafeedSettings) -> Self {
        Self::new(settings.base_url(), settings.auth_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(&self, request: Result<Request, gloo_net::Error>) -> DatafeedResult<Response> {
        let request = request.map_err(|e| DatafeedError::Transport(format!("Failed to build request: {}", e)))?;
        let url = request.url();
        let response = request
            .send()
            .await
            .map_err(|e| DatafeedError::Transport(format!("Failed to send request: {}", e)))?;

        if let Some(error) = status_error(response.status(), &response.status_text()) {
            get_logger().error(LogComponent::Infrastructure("BackendHttpClient"), &format!("{} -> {}", url, error));
            return Err(error);
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DatafeedResult<T> {
        let response = self.send(self.authorize(builder).build()).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DatafeedError::MalformedResponse(format!("Failed to parse JSON: {}", e)))
    }
}

impl MarketDataRepository for BackendHttpClient {
    async fn fetch_history(&self, query: &HistoryQuery) -> DatafeedResult<HistoryPayload> {
        let mut params = vec![
            ("symbol", query.symbol.clone()),
            ("resolution", query.resolution.to_string()),
            ("from", query.window.from.to_string()),
            ("to", query.window.to.to_string()),
        ];
        if let Some(count_back) = query.window.count_back {
            params.push(("countback", count_back.to_string()));
        }

        let builder = Request::get(&self.url("/udf/history")).query(params);
        let response: UdfHistoryResponse = self.get_json(builder).await?;
        let payload = response.into_payload()?;

        crate::log_debug!(
            LogComponent::Infrastructure("BackendHttpClient"),
            "history {} {}: {} raw bars",
            query.symbol,
            query.resolution,
            payload.bars.len()
        );
        Ok(payload)
    }

    async fn resolve_symbol(&self, symbol: &str) -> DatafeedResult<SymbolRecord> {
        let builder = Request::get(&self.url("/udf/symbols")).query([("symbol", symbol)]);
        self.get_json(builder).await
    }

    async fn search_symbols(&self, query: &str, limit: usize) -> DatafeedResult<Vec<SymbolSummary>> {
        let limit = limit.to_string();
        let builder = Request::get(&self.url("/udf/search")).query([("query", query), ("limit", limit.as_str())]);
        self.get_json(builder).await
    }
}

impl ConfigRepository for BackendHttpClient {
    async fn get_config(&self, id: ConfigId) -> DatafeedResult<TradingConfig> {
        let builder = Request::get(&self.url(&format!("/configs/{}", id)));
        self.get_json(builder).await
    }

    async fn put_config(&self, config: &TradingConfig) -> DatafeedResult<TradingConfig> {
        let builder = self.authorize(Request::put(&self.url(&format!("/configs/{}", config.id))));
        let response = self.send(builder.json(config)).await?;
        let stored: TradingConfig = response
            .json()
            .await
            .map_err(|e| DatafeedError::MalformedResponse(format!("Failed to parse JSON: {}", e)))?;

        get_logger().info(
            LogComponent::Infrastructure("BackendHttpClient"),
            &format!("💾 config {} stored", stored.id),
        );
        Ok(stored)
    }
}
