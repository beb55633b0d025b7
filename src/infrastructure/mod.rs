//! Browser-facing adapters: HTTP backend, chart widget binding, bot bridge
//! and platform services.

pub mod bot_bridge;
pub mod chart_engine;
pub mod http;
pub mod services;

pub use bot_bridge::JsBotBridge;
pub use chart_engine::{BrowserChartEngine, JsChartEngine};
pub use http::BackendHttpClient;
pub use services::*;
