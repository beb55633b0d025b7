use std::cell::RefCell;
use std::rc::Rc;

use super::engine::ChartEngine;
use crate::domain::errors::{AnnotationError, AnnotationResult};

/// Shared, detachable reference to the live chart engine.
///
/// Clones observe the same slot, so `detach` makes every pending continuation
/// see `EngineDetached` on its next access.
#[derive(Clone, Default)]
pub struct ChartHandle {
    slot: Rc<RefCell<Option<Rc<dyn ChartEngine>>>>,
}

impl ChartHandle {
    pub fn new(engine: Rc<dyn ChartEngine>) -> Self {
        Self { slot: Rc::new(RefCell::new(Some(engine))) }
    }

    pub fn detached() -> Self {
        Self::default()
    }

    pub fn get(&self) -> AnnotationResult<Rc<dyn ChartEngine>> {
        self.slot.borrow().clone().ok_or(AnnotationError::EngineDetached)
    }

    /// Drops the engine reference. Safe to call repeatedly.
    pub fn detach(&self) {
        self.slot.borrow_mut().take();
    }

    pub fn is_attached(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl std::fmt::Debug for ChartHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartHandle").field("attached", &self.is_attached()).finish()
    }
}
