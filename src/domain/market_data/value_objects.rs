use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};

use crate::time_utils::{DAY_SECS, MINUTE_SECS};

/// Value Object - Ticker as understood by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: &str) -> Result<Self, String> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err("Symbol cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// Value Object - Bar granularity in the engine's notation
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    StrumDisplay,
    EnumIter,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum Resolution {
    #[strum(serialize = "1")]
    #[serde(rename = "1")]
    OneMinute,

    #[strum(serialize = "5")]
    #[serde(rename = "5")]
    FiveMinutes,

    #[strum(serialize = "15")]
    #[serde(rename = "15")]
    FifteenMinutes,

    #[strum(serialize = "30")]
    #[serde(rename = "30")]
    ThirtyMinutes,

    #[strum(serialize = "60")]
    #[serde(rename = "60")]
    OneHour,

    #[strum(serialize = "1D", to_string = "D")]
    #[serde(rename = "D", alias = "1D")]
    OneDay,

    #[strum(serialize = "1W", to_string = "W")]
    #[serde(rename = "W", alias = "1W")]
    OneWeek,

    #[strum(serialize = "1M", to_string = "M")]
    #[serde(rename = "M", alias = "1M")]
    OneMonth,
}

impl Resolution {
    /// Resolutions advertised to the charting engine, finest first.
    pub fn supported() -> Vec<Resolution> {
        Resolution::iter().collect()
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::ThirtyMinutes => 30,
            Self::OneHour => 60,
            Self::OneDay => 24 * 60,
            Self::OneWeek => 7 * 24 * 60,
            Self::OneMonth => 30 * 24 * 60, // approximate
        }
    }

    pub fn duration_secs(&self) -> i64 {
        self.minutes() * MINUTE_SECS
    }

    pub fn is_intraday(&self) -> bool {
        self.duration_secs() < DAY_SECS
    }

    /// The tier whose realtime polls are always forwarded.
    pub fn is_finest(&self) -> bool {
        matches!(self, Self::OneMinute)
    }
}
