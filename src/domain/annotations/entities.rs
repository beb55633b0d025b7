use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay, EnumString};

/// Engine shape name for two-point trade lines
pub const TREND_LINE: &str = "trend_line";
/// Engine shape name for single-price reference lines
pub const HORIZONTAL_LINE: &str = "horizontal_line";

/// Drawing anchor: epoch seconds and price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: i64,
    pub price: f64,
}

impl Point {
    pub fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

/// Directed two-point annotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn points(&self) -> [Point; 2] {
        [self.p1, self.p2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelType {
    #[default]
    Absolute,
    /// Percent distance from the entry price
    Percent,
}

/// Take-profit / stop-loss levels attached to a configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TpSlSettings {
    #[serde(default)]
    pub tp_type: LevelType,
    #[serde(default)]
    pub tp_value: Option<f64>,
    #[serde(default)]
    pub sl_type: LevelType,
    #[serde(default)]
    pub sl_value: Option<f64>,
}

/// Which capture strategy produced a layout
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, StrumDisplay, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaptureMethod {
    AllShapes,
    NativeLayout,
    IndividualShapes,
    #[default]
    None,
}

/// Engine-agnostic snapshot of one drawn shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawShape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub points: Vec<Point>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl RawShape {
    pub fn new(name: &str, points: Vec<Point>) -> Self {
        Self { id: None, name: name.to_string(), points, properties: serde_json::Value::Null }
    }

    pub fn is_horizontal_level(&self) -> bool {
        self.name == HORIZONTAL_LINE
    }

    /// First two anchors as a line, for shapes that have them.
    pub fn as_line(&self) -> Option<Line> {
        match self.points.as_slice() {
            [p1, p2, ..] if !self.is_horizontal_level() => Some(Line::new(*p1, *p2)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OtherDrawings {
    #[serde(default)]
    pub capture_method: CaptureMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradingview_drawings: Option<Vec<RawShape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tradingview_layout: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_shapes: Option<Vec<RawShape>>,
}

/// Unit of annotation persistence per configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub entry_line: Option<Line>,
    #[serde(default)]
    pub exit_line: Option<Line>,
    #[serde(default)]
    pub tpsl_settings: Option<TpSlSettings>,
    #[serde(default)]
    pub other_drawings: OtherDrawings,
    #[serde(default)]
    pub timestamp: i64,
}

impl LayoutData {
    pub fn is_empty(&self) -> bool {
        self.entry_line.is_none()
            && self.exit_line.is_none()
            && self.tpsl_settings.is_none()
            && self.other_drawings.tradingview_drawings.as_ref().is_none_or(Vec::is_empty)
            && self.other_drawings.tradingview_layout.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
pub enum LineRole {
    #[strum(serialize = "entry")]
    Entry,
    #[strum(serialize = "exit")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
pub enum LevelRole {
    #[strum(serialize = "take_profit")]
    TakeProfit,
    #[strum(serialize = "stop_loss")]
    StopLoss,
}
