pub mod coordinator;
pub mod datafeed;
pub mod session;
pub mod use_cases;

pub use coordinator::*;
pub use datafeed::*;
pub use session::*;
pub use use_cases::*;
