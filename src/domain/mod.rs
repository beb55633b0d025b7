pub mod annotations;
pub mod chart;
pub mod errors;
pub mod events;
pub mod logging;
pub mod market_data;
pub mod ownership;
pub mod scheduling;
pub mod trading_config;
