//! Market data aggregate: bars, resolutions, symbol metadata and the rules
//! that shape history windows.

pub mod entities;
pub mod history;
pub mod repositories;
pub mod services;
pub mod symbols;
pub mod value_objects;

pub use entities::*;
pub use history::*;
pub use symbols::*;
pub use value_objects::*;
