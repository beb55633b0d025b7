use serde::{Deserialize, Serialize};

use super::entities::Bar;
use super::value_objects::Resolution;

/// Range the charting engine asks for, in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodParams {
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub first_data_request: bool,
    #[serde(default)]
    pub count_back: Option<u32>,
}

/// Range actually requested from the backend, in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: i64,
    pub to: i64,
    pub count_back: Option<u32>,
}

impl FetchWindow {
    pub fn span_secs(&self) -> i64 {
        self.to - self.from
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub resolution: Resolution,
    pub window: FetchWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Ok,
    NoData,
}

/// Decoded backend answer before validation; fields the backend left out are NaN
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPayload {
    pub status: HistoryStatus,
    pub bars: Vec<Bar>,
}

impl HistoryPayload {
    pub fn no_data() -> Self {
        Self { status: HistoryStatus::NoData, bars: Vec::new() }
    }
}

/// What `getBars` reports to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    pub bars: Vec<Bar>,
    pub no_data: bool,
}

impl HistoryResult {
    pub fn no_data() -> Self {
        Self { bars: Vec::new(), no_data: true }
    }

    /// Empty slice that still tells the engine to keep scrolling.
    pub fn more_possible() -> Self {
        Self { bars: Vec::new(), no_data: false }
    }
}
