//! Annotation aggregate: trade lines, TP/SL levels and the portable layout record.

pub mod entities;
pub mod services;

pub use entities::*;
