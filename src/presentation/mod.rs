//! `#[wasm_bindgen]` surface: the datafeed object for the charting engine and
//! the session handle for the host page.

pub mod wasm_api;

pub use wasm_api::*;
