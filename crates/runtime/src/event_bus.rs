use std::collections::BTreeMap;

/// Host input, already translated into viewport pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerMove { x: f64, y: f64 },
    PointerDown { x: f64, y: f64, button: i16 },
    PointerUp { x: f64, y: f64 },
    PointerLeave,
    Wheel { delta_y: f64 },
    KeyDown { key: String },
}

impl InputEvent {
    pub fn kind(&self) -> InputKind {
        match self {
            InputEvent::PointerMove { .. }
            | InputEvent::PointerDown { .. }
            | InputEvent::PointerUp { .. }
            | InputEvent::PointerLeave => InputKind::Pointer,
            InputEvent::Wheel { .. } => InputKind::Wheel,
            InputEvent::KeyDown { .. } => InputKind::Key,
        }
    }
}

/// Listener families a host can attach.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputKind {
    Pointer,
    Wheel,
    Key,
}

/// Receipt for a registered listener; hand it back to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    kind: InputKind,
}

impl Subscription {
    pub fn kind(&self) -> InputKind {
        self.kind
    }
}

/// Where the viewer gets its input from.
///
/// Implementations must stop delivering a kind once its last subscription is
/// gone, so an unmounted viewer never sees stray events.
pub trait InputSource {
    fn subscribe(&mut self, kind: InputKind) -> Subscription;
    fn unsubscribe(&mut self, subscription: Subscription) -> bool;
    /// Pending events in arrival order.
    fn drain(&mut self) -> Vec<InputEvent>;
}

/// In-memory input source. Events of a kind nobody listens to are dropped on
/// arrival.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: BTreeMap<u64, InputKind>,
    events: Vec<InputEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event`; returns `false` when it was dropped.
    pub fn push(&mut self, event: InputEvent) -> bool {
        if !self.is_subscribed(event.kind()) {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn is_subscribed(&self, kind: InputKind) -> bool {
        self.subscriptions.values().any(|k| *k == kind)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }
}

impl InputSource for EventBus {
    fn subscribe(&mut self, kind: InputKind) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, kind);
        Subscription { id, kind }
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        if self.subscriptions.remove(&subscription.id).is_none() {
            return false;
        }
        if !self.is_subscribed(subscription.kind) {
            self.events.retain(|e| e.kind() != subscription.kind);
        }
        true
    }

    fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, InputEvent, InputKind, InputSource};

    #[test]
    fn drops_events_without_listener() {
        let mut bus = EventBus::new();
        assert!(!bus.push(InputEvent::Wheel { delta_y: 100.0 }));
        bus.subscribe(InputKind::Wheel);
        assert!(bus.push(InputEvent::Wheel { delta_y: 100.0 }));
        assert!(!bus.push(InputEvent::KeyDown { key: "n".into() }));
        assert_eq!(bus.events().len(), 1);
    }

    #[test]
    fn drain_preserves_arrival_order_and_clears() {
        let mut bus = EventBus::new();
        bus.subscribe(InputKind::Pointer);
        bus.subscribe(InputKind::Wheel);
        bus.push(InputEvent::PointerMove { x: 1.0, y: 2.0 });
        bus.push(InputEvent::Wheel { delta_y: -50.0 });
        bus.push(InputEvent::PointerLeave);
        let drained = bus.drain();
        assert_eq!(
            drained,
            vec![
                InputEvent::PointerMove { x: 1.0, y: 2.0 },
                InputEvent::Wheel { delta_y: -50.0 },
                InputEvent::PointerLeave,
            ]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn unsubscribe_discards_pending_events_of_that_kind() {
        let mut bus = EventBus::new();
        let wheel = bus.subscribe(InputKind::Wheel);
        bus.subscribe(InputKind::Key);
        bus.push(InputEvent::Wheel { delta_y: 1.0 });
        bus.push(InputEvent::KeyDown { key: "r".into() });
        assert!(bus.unsubscribe(wheel));
        assert!(!bus.unsubscribe(wheel));
        assert_eq!(bus.drain(), vec![InputEvent::KeyDown { key: "r".into() }]);
        assert!(!bus.push(InputEvent::Wheel { delta_y: 1.0 }));
    }

    #[test]
    fn kind_stays_live_while_any_subscription_remains() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(InputKind::Key);
        let _b = bus.subscribe(InputKind::Key);
        bus.unsubscribe(a);
        assert!(bus.is_subscribed(InputKind::Key));
        assert_eq!(bus.subscription_count(), 1);
    }
}
