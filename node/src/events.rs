//! Event publication for subscribers.

use gravity_types::{BridgeEvent, EventSink};
use std::sync::Arc;

/// Synchronous fan-out event bus for bridge events.
///
/// Listeners are invoked inline on the emitting thread; keep handlers fast to
/// avoid stalling command processing.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&BridgeEvent) + Send + Sync>>,
    sinks: Vec<Arc<dyn EventSink + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&BridgeEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    /// Attach a sink that receives every event.
    pub fn attach(&mut self, sink: Arc<dyn EventSink + Send + Sync>) {
        self.sinks.push(sink);
    }

    pub fn emit(&self, event: &BridgeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
        for sink in &self.sinks {
            sink.publish(event);
        }
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: &BridgeEvent) {
        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_nullables::NullEventSink;
    use gravity_types::event::{EVENT_OBSERVATION, EVENT_OUTGOING_BATCH};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_: &BridgeEvent| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_: &BridgeEvent| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&BridgeEvent::new(EVENT_OBSERVATION));

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&BridgeEvent::new(EVENT_OBSERVATION)); // should not panic
    }

    #[test]
    fn attached_sinks_see_events_in_order() {
        let sink = Arc::new(NullEventSink::new());
        let mut bus = EventBus::new();
        bus.attach(sink.clone());

        bus.publish(&BridgeEvent::new(EVENT_OUTGOING_BATCH));
        bus.publish(&BridgeEvent::new(EVENT_OBSERVATION));

        assert_eq!(sink.names(), vec![EVENT_OUTGOING_BATCH, EVENT_OBSERVATION]);
    }

    #[test]
    fn default_creates_empty_bus() {
        let bus = EventBus::default();
        assert!(bus.listeners.is_empty());
        assert!(bus.sinks.is_empty());
    }
}
