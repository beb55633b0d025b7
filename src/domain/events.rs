use std::fmt::Debug;

use serde::Serialize;

use crate::domain::annotations::CaptureMethod;
use crate::domain::trading_config::ConfigId;

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> u64 {
        use crate::domain::logging::get_time_provider;
        get_time_provider().current_timestamp()
    }
}

/// Progress of the save/load cycle, surfaced to the host page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SaveStarted { config_id: ConfigId, seq: u64 },
    SaveCompleted { config_id: ConfigId, capture_method: CaptureMethod },
    /// The save lost ownership or failed; nothing was applied to the chart
    SaveAborted { config_id: ConfigId, reason: String },
    LayoutRestored { config_id: ConfigId, shapes: usize },
    ConfigLoaded { config_id: ConfigId },
    LoadFailed { config_id: ConfigId, reason: String },
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SaveStarted { .. } => "SaveStarted",
            SessionEvent::SaveCompleted { .. } => "SaveCompleted",
            SessionEvent::SaveAborted { .. } => "SaveAborted",
            SessionEvent::LayoutRestored { .. } => "LayoutRestored",
            SessionEvent::ConfigLoaded { .. } => "ConfigLoaded",
            SessionEvent::LoadFailed { .. } => "LoadFailed",
        }
    }
}

/// Event dispatcher for publishing events
pub trait EventDispatcher {
    fn publish_session_event(&self, event: SessionEvent);
}

/// Simple in-memory event dispatcher
#[derive(Default)]
pub struct InMemoryEventDispatcher {
    session_handlers: Vec<Box<dyn Fn(&SessionEvent)>>,
}

impl InMemoryEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_to_session_events<F>(&mut self, handler: F)
    where
        F: Fn(&SessionEvent) + 'static,
    {
        self.session_handlers.push(Box::new(handler));
    }
}

impl EventDispatcher for InMemoryEventDispatcher {
    fn publish_session_event(&self, event: SessionEvent) {
        for handler in &self.session_handlers {
            handler(&event);
        }
    }
}
