//! Nullable event sink: remembers everything published to it.

use gravity_types::{BridgeEvent, EventSink};
use std::sync::Mutex;

#[derive(Default)]
pub struct NullEventSink {
    published: Mutex<Vec<BridgeEvent>>,
}

impl NullEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Names of published events, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.published.lock().unwrap().iter().map(|e| e.name).collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl EventSink for NullEventSink {
    fn publish(&self, event: &BridgeEvent) {
        self.published.lock().unwrap().push(event.clone());
    }
}
