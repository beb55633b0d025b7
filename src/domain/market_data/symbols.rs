use serde::{Deserialize, Serialize};

use super::value_objects::Resolution;

/// What `configure()` hands the charting engine on startup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatafeedConfiguration {
    pub supports_search: bool,
    pub supports_group_request: bool,
    pub supported_resolutions: Vec<Resolution>,
}

impl Default for DatafeedConfiguration {
    fn default() -> Self {
        Self {
            supports_search: true,
            supports_group_request: false,
            supported_resolutions: Resolution::supported(),
        }
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(rename = "type", default)]
    pub symbol_type: String,
}

/// Backend view of a symbol; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SymbolRecord {
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub symbol_type: Option<String>,
    pub exchange: Option<String>,
    pub session: Option<String>,
    pub timezone: Option<String>,
    pub tick_size: Option<f64>,
    pub pricescale: Option<u64>,
    pub volume_precision: Option<u32>,
    pub supported_resolutions: Option<Vec<Resolution>>,
}

/// Engine-facing symbol metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub ticker: String,
    pub description: String,
    #[serde(rename = "type")]
    pub symbol_type: String,
    pub session: String,
    pub timezone: String,
    pub exchange: String,
    pub listed_exchange: String,
    pub format: String,
    pub minmov: u32,
    pub pricescale: u64,
    pub has_intraday: bool,
    pub has_weekly_and_monthly: bool,
    pub supported_resolutions: Vec<Resolution>,
    pub volume_precision: u32,
    pub data_status: String,
}

impl SymbolInfo {
    pub const DEFAULT_SESSION: &'static str = "24x7";
    pub const DEFAULT_TIMEZONE: &'static str = "Etc/UTC";
    pub const DEFAULT_PRICESCALE: u64 = 100;
    pub const DEFAULT_VOLUME_PRECISION: u32 = 8;

    /// Fill the gaps of a backend record with crypto-market defaults.
    pub fn from_record(requested: &str, record: SymbolRecord) -> Self {
        let ticker = record.ticker.clone().unwrap_or_else(|| requested.to_string());
        let name = record.name.unwrap_or_else(|| ticker.clone());
        let pricescale = record
            .pricescale
            .or_else(|| record.tick_size.and_then(pricescale_from_tick))
            .unwrap_or(Self::DEFAULT_PRICESCALE);
        let exchange = record.exchange.unwrap_or_default();

        Self {
            description: record.description.unwrap_or_else(|| name.clone()),
            name,
            ticker,
            symbol_type: record.symbol_type.unwrap_or_else(|| "crypto".to_string()),
            session: record.session.unwrap_or_else(|| Self::DEFAULT_SESSION.to_string()),
            timezone: record.timezone.unwrap_or_else(|| Self::DEFAULT_TIMEZONE.to_string()),
            listed_exchange: exchange.clone(),
            exchange,
            format: "price".to_string(),
            minmov: 1,
            pricescale,
            has_intraday: true,
            has_weekly_and_monthly: true,
            supported_resolutions: record
                .supported_resolutions
                .filter(|list| !list.is_empty())
                .unwrap_or_else(Resolution::supported),
            volume_precision: record.volume_precision.unwrap_or(Self::DEFAULT_VOLUME_PRECISION),
            data_status: "streaming".to_string(),
        }
    }
}

/// Convert a tick size like `0.01` into the engine's integer price scale (`100`).
pub fn pricescale_from_tick(tick: f64) -> Option<u64> {
    if !tick.is_finite() || tick <= 0.0 || tick > 1.0 {
        return None;
    }
    let decimals = (-tick.log10()).round().clamp(0.0, 12.0) as u32;
    Some(10u64.pow(decimals))
}

/// How far back the engine may scroll for a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryDepth {
    #[serde(rename = "resolutionBack")]
    pub unit: DepthUnit,
    #[serde(rename = "intervalBack")]
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthUnit {
    #[serde(rename = "D")]
    Day,
    #[serde(rename = "M")]
    Month,
}

impl HistoryDepth {
    pub fn for_resolution(resolution: Resolution) -> Self {
        if resolution.is_intraday() {
            Self { unit: DepthUnit::Day, amount: 1 }
        } else {
            Self { unit: DepthUnit::Month, amount: 3 }
        }
    }
}
