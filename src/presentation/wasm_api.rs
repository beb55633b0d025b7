use std::rc::Rc;
use std::str::FromStr;

use gloo::utils::format::JsValueSerdeExt;
use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::{
    application::{BarCallback, ChartSession, Datafeed, LoadOutcome, SaveOutcome, SessionServices},
    domain::{
        chart::ChartHandle,
        errors::{AppError, DatafeedError, PersistenceError},
        events::{InMemoryEventDispatcher, SessionEvent},
        logging::{LogComponent, get_logger, init_logger},
        market_data::{Bar, PeriodParams, Resolution, SymbolInfo},
        trading_config::ConfigId,
    },
    infrastructure::{
        BackendHttpClient, BrowserChartEngine, BrowserClock, ConsoleLogger, GlooTimer, JsBotBridge,
        JsChartEngine, LocalSpawner,
    },
    settings::DatafeedSettings,
};

type BrowserSession = ChartSession<BackendHttpClient>;

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    JsValue::from_serde(value).unwrap_or(JsValue::NULL)
}

fn call1(callback: &Function, arg: &JsValue) {
    if let Err(e) = callback.call1(&JsValue::NULL, arg) {
        get_logger().warn(LogComponent::Presentation("WasmDatafeed"), &format!("engine callback threw: {:?}", e));
    }
}

fn parse_resolution(resolution: &str) -> Result<Resolution, DatafeedError> {
    Resolution::from_str(resolution)
        .map_err(|_| DatafeedError::MalformedResponse(format!("unsupported resolution {}", resolution)))
}

/// Datafeed object handed to the charting engine's constructor
#[wasm_bindgen]
pub struct WasmDatafeed {
    datafeed: Rc<Datafeed<BackendHttpClient>>,
}

#[wasm_bindgen]
impl WasmDatafeed {
    #[wasm_bindgen(js_name = onReady)]
    pub fn on_ready(&self, callback: Function) {
        let configuration = to_js(&self.datafeed.configure());
        // The engine expects the callback to run asynchronously.
        spawn_local(async move {
            call1(&callback, &configuration);
        });
    }

    #[wasm_bindgen(js_name = searchSymbols)]
    pub fn search_symbols(&self, query: String, on_result: Function) {
        let datafeed = Rc::clone(&self.datafeed);
        spawn_local(async move {
            let results = datafeed.search_symbols(&query).await;
            call1(&on_result, &to_js(&results));
        });
    }

    #[wasm_bindgen(js_name = resolveSymbol)]
    pub fn resolve_symbol(&self, name: String, on_resolve: Function, on_error: Function) {
        let datafeed = Rc::clone(&self.datafeed);
        spawn_local(async move {
            match datafeed.resolve_symbol(&name).await {
                Ok(info) => call1(&on_resolve, &to_js(&info)),
                Err(_) => call1(&on_error, &JsValue::from_str("cannot resolve symbol")),
            }
        });
    }

    #[wasm_bindgen(js_name = getBars)]
    pub fn get_bars(
        &self,
        symbol_info: JsValue,
        resolution: String,
        period: JsValue,
        on_result: Function,
        on_error: Function,
    ) {
        let datafeed = Rc::clone(&self.datafeed);
        spawn_local(async move {
            let request = async {
                let symbol: SymbolInfo = symbol_info
                    .into_serde()
                    .map_err(|e| DatafeedError::MalformedResponse(format!("symbol info: {}", e)))?;
                let params: PeriodParams = period
                    .into_serde()
                    .map_err(|e| DatafeedError::MalformedResponse(format!("period params: {}", e)))?;
                let resolution = parse_resolution(&resolution)?;
                Ok::<_, DatafeedError>(datafeed.get_bars(&symbol, resolution, &params).await?)
            };

            match request.await {
                Ok(result) => {
                    let meta = to_js(&serde_json::json!({ "noData": result.no_data }));
                    if let Err(e) = on_result.call2(&JsValue::NULL, &to_js(&result.bars), &meta) {
                        get_logger().warn(
                            LogComponent::Presentation("WasmDatafeed"),
                            &format!("getBars callback threw: {:?}", e),
                        );
                    }
                }
                Err(e) => call1(&on_error, &JsValue::from_str(&e.to_string())),
            }
        });
    }

    #[wasm_bindgen(js_name = subscribeBars)]
    pub fn subscribe_bars(
        &self,
        symbol_info: JsValue,
        resolution: String,
        on_tick: Function,
        subscriber_id: String,
    ) -> Result<(), JsValue> {
        let symbol: SymbolInfo =
            symbol_info.into_serde().map_err(|e| JsValue::from_str(&format!("symbol info: {}", e)))?;
        let resolution = parse_resolution(&resolution).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let on_bar: BarCallback = Rc::new(move |bar: Bar| call1(&on_tick, &to_js(&bar)));
        self.datafeed.subscribe_bars(&symbol, resolution, &subscriber_id, on_bar);
        Ok(())
    }

    #[wasm_bindgen(js_name = unsubscribeBars)]
    pub fn unsubscribe_bars(&self, subscriber_id: String) {
        self.datafeed.unsubscribe_bars(&subscriber_id);
    }

    #[wasm_bindgen(js_name = calculateHistoryDepth)]
    pub fn calculate_history_depth(&self, resolution: String) -> JsValue {
        match parse_resolution(&resolution) {
            Ok(resolution) => to_js(&self.datafeed.history_depth(resolution)),
            Err(_) => JsValue::UNDEFINED,
        }
    }
}

/// One mounted chart widget as seen by the host page
#[wasm_bindgen]
pub struct WasmChartSession {
    session: Rc<BrowserSession>,
}

#[wasm_bindgen]
impl WasmChartSession {
    /// `settings` is a plain object; `bot` may carry `onBar` / `onLinesUpdated`;
    /// `on_event` receives every session event.
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue, chart: JsChartEngine, bot: JsValue, on_event: Option<Function>) -> WasmChartSession {
        let (settings, settings_error) = match settings.into_serde::<DatafeedSettings>() {
            Ok(settings) => (settings, None),
            Err(e) => (DatafeedSettings::default(), Some(e)),
        };
        init_logger(Box::new(ConsoleLogger::new(settings.min_log_level())));
        if let Some(e) = settings_error {
            get_logger().warn(
                LogComponent::Presentation("WasmChartSession"),
                &format!("settings unreadable, using defaults: {}", e),
            );
        }

        let mut dispatcher = InMemoryEventDispatcher::new();
        if let Some(listener) = on_event {
            dispatcher.subscribe_to_session_events(move |event: &SessionEvent| {
                if let Err(e) = listener.call1(&JsValue::NULL, &to_js(event)) {
                    get_logger().warn(
                        LogComponent::Presentation("WasmChartSession"),
                        &format!("event listener threw: {:?}", e),
                    );
                }
            });
        }

        let services = SessionServices {
            clock: Rc::new(BrowserClock),
            timer: Rc::new(GlooTimer),
            spawner: Rc::new(LocalSpawner),
            bot: Rc::new(JsBotBridge::new(&bot)),
            events: Rc::new(dispatcher),
        };
        let chart = ChartHandle::new(Rc::new(BrowserChartEngine::new(chart)));
        let repository = Rc::new(BackendHttpClient::from_settings(&settings));

        get_logger().info(
            LogComponent::Presentation("WasmChartSession"),
            &format!("🚀 chart session ready against {}", settings.base_url()),
        );

        Self { session: Rc::new(ChartSession::new(repository, chart, &settings, services)) }
    }

    pub fn datafeed(&self) -> WasmDatafeed {
        WasmDatafeed { datafeed: self.session.datafeed() }
    }

    /// Resolves to `"restored"` or `"superseded"`; rejects with the error text.
    #[wasm_bindgen(js_name = selectConfig)]
    pub fn select_config(&self, config_id: f64) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let id = ConfigId(config_id as u64);
            match session.select_config(id).await {
                Ok(LoadOutcome::Restored(_)) => Ok(JsValue::from_str("restored")),
                Ok(LoadOutcome::Superseded) => Ok(JsValue::from_str("superseded")),
                Err(e) => Err(error_value(&e)),
            }
        })
    }

    /// Resolves to `"applied"`, `"aborted"` or `"ignored"`.
    #[wasm_bindgen(js_name = requestSave)]
    pub fn request_save(&self, seq: f64) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            match session.request_save(seq as u64).await {
                Ok(SaveOutcome::Applied(_)) => Ok(JsValue::from_str("applied")),
                Ok(SaveOutcome::Aborted) => Ok(JsValue::from_str("aborted")),
                Ok(SaveOutcome::Ignored) => Ok(JsValue::from_str("ignored")),
                Err(e) => Err(error_value(&e)),
            }
        })
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        format!("{:?}", self.session.orchestrator().state())
    }

    pub fn teardown(&self) {
        self.session.teardown();
    }
}

fn error_value(error: &AppError) -> JsValue {
    let session_expired = matches!(
        error,
        AppError::Datafeed(DatafeedError::SessionExpired)
            | AppError::Persistence(PersistenceError::Request(DatafeedError::SessionExpired))
    );
    let payload = serde_json::json!({
        "message": error.to_string(),
        "sessionExpired": session_expired,
    });
    to_js(&payload)
}
