pub mod annotation_capture;
pub mod annotation_restorer;
pub mod history_provider;
pub mod realtime_poller;
pub mod symbol_resolver;

pub use annotation_capture::*;
pub use annotation_restorer::*;
pub use history_provider::*;
pub use realtime_poller::*;
pub use symbol_resolver::*;
