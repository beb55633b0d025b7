//! Charting engine abstraction: capability flags, the drawing trait and a
//! detachable handle shared by capture, restore and teardown.

pub mod engine;
pub mod handle;

pub use engine::*;
pub use handle::*;
