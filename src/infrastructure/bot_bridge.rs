use gloo::utils::format::JsValueSerdeExt;
use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use crate::domain::{
    logging::{LogComponent, get_logger},
    market_data::Bar,
    trading_config::{BotListener, ConfigId, TradingConfig},
};

/// Forwards bars and line updates to the host page's trading bot.
///
/// The host passes an object with optional `onBar(configId, bar)` and
/// `onLinesUpdated(config)` functions.
pub struct JsBotBridge {
    on_bar: Option<Function>,
    on_lines_updated: Option<Function>,
}

impl JsBotBridge {
    pub fn new(listener: &JsValue) -> Self {
        Self {
            on_bar: method(listener, "onBar"),
            on_lines_updated: method(listener, "onLinesUpdated"),
        }
    }

    fn report(result: Result<JsValue, JsValue>, what: &str) {
        if let Err(e) = result {
            get_logger().warn(
                LogComponent::Infrastructure("JsBotBridge"),
                &format!("bot {} handler threw: {:?}", what, e),
            );
        }
    }
}

fn method(listener: &JsValue, name: &str) -> Option<Function> {
    if !listener.is_object() {
        return None;
    }
    Reflect::get(listener, &JsValue::from_str(name))
        .ok()
        .filter(JsValue::is_function)
        .map(|f| f.unchecked_into::<Function>())
}

impl BotListener for JsBotBridge {
    fn on_bar(&self, config_id: ConfigId, bar: &Bar) {
        let Some(callback) = &self.on_bar else {
            return;
        };
        match JsValue::from_serde(bar) {
            Ok(bar) => Self::report(callback.call2(&JsValue::NULL, &JsValue::from_f64(config_id.0 as f64), &bar), "onBar"),
            Err(e) => {
                crate::log_warn!(LogComponent::Infrastructure("JsBotBridge"), "bar not serializable: {}", e);
            }
        }
    }

    fn on_lines_updated(&self, config: &TradingConfig) {
        let Some(callback) = &self.on_lines_updated else {
            return;
        };
        match JsValue::from_serde(config) {
            Ok(config) => Self::report(callback.call1(&JsValue::NULL, &config), "onLinesUpdated"),
            Err(e) => {
                crate::log_warn!(LogComponent::Infrastructure("JsBotBridge"), "config not serializable: {}", e);
            }
        }
    }
}
