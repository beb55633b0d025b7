use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use super::annotations::LayoutData;
use super::errors::DatafeedResult;
use super::market_data::Bar;

/// Backend identifier of a trading configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub u64);

/// Backend-owned trading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    pub id: ConfigId,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub layout_data: Option<LayoutData>,
    /// Backend fields this client does not interpret, sent back untouched on PUT
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TradingConfig {
    pub fn new(id: ConfigId, symbol: &str, interval: &str) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            layout_data: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_layout(mut self, layout: LayoutData) -> Self {
        self.layout_data = Some(layout);
        self
    }
}

/// Backend persistence surface for configurations
#[allow(async_fn_in_trait)]
pub trait ConfigRepository {
    async fn get_config(&self, id: ConfigId) -> DatafeedResult<TradingConfig>;

    /// Returns the backend's stored copy, which is authoritative.
    async fn put_config(&self, config: &TradingConfig) -> DatafeedResult<TradingConfig>;
}

/// External trading-bot collaborator notified about bars and line changes
pub trait BotListener {
    fn on_bar(&self, config_id: ConfigId, bar: &Bar);

    fn on_lines_updated(&self, config: &TradingConfig);
}

/// Listener used when no bot is connected
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBotListener;

impl BotListener for NoopBotListener {
    fn on_bar(&self, _config_id: ConfigId, _bar: &Bar) {}

    fn on_lines_updated(&self, _config: &TradingConfig) {}
}

/// Client-side view of which configuration is displayed
#[derive(Debug, Default, Clone)]
pub struct ConfigSelection {
    selected: Option<ConfigId>,
    last_known: Option<TradingConfig>,
}

impl ConfigSelection {
    pub fn selected(&self) -> Option<ConfigId> {
        self.selected
    }

    pub fn select(&mut self, id: ConfigId) {
        self.selected = Some(id);
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.last_known = None;
    }

    pub fn last_known(&self) -> Option<&TradingConfig> {
        self.last_known.as_ref()
    }

    pub fn remember(&mut self, config: TradingConfig) {
        self.last_known = Some(config);
    }

    /// Cached config for the current selection, if the cache holds that one.
    pub fn current_config(&self) -> Option<&TradingConfig> {
        self.last_known.as_ref().filter(|c| Some(c.id) == self.selected)
    }

    /// Key for bot notifications: the selection, else the last cached config.
    pub fn bot_key(&self) -> Option<ConfigId> {
        self.selected.or_else(|| self.last_known.as_ref().map(|c| c.id))
    }
}
