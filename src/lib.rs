use wasm_bindgen::prelude::*;

use crate::domain::logging::{LogComponent, get_logger};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod settings;
pub mod time_utils;

/// Module start hook: panic hook and browser clock for log timestamps.
///
/// The console logger is installed by the first `WasmChartSession`, which
/// knows the configured log level.
#[wasm_bindgen(start)]
pub fn initialize() {
    infrastructure::services::install_panic_hook();
    domain::logging::init_time_provider(Box::new(infrastructure::services::BrowserTimeProvider::new()));

    get_logger().info(LogComponent::Presentation("Initialize"), "datafeed module loaded");
}
