use runtime::event_bus::{InputEvent, InputKind, InputSource, Subscription};
use tracing::debug;

use crate::config::KeyBindings;

/// Primary mouse button / touch contact.
const PRIMARY_BUTTON: i16 = 0;

/// Cursor position and the city under it.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct HoverState {
    pub city: Option<usize>,
    pub cursor: Option<[f64; 2]>,
}

/// What the viewer should do about a batch of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Re-pick under the cursor.
    Hover { x: f64, y: f64 },
    /// Cursor left the viewport.
    Leave,
    Orbit { dx: f64, dy: f64 },
    TimeScroll { delta_y: f64 },
    ToggleNight,
    ResetTime,
}

/// Case-insensitive key matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    night_toggle: String,
    reset: String,
}

impl KeyMap {
    pub fn new(bindings: &KeyBindings) -> Self {
        Self {
            night_toggle: bindings.night_toggle.trim().to_lowercase(),
            reset: bindings.reset.trim().to_lowercase(),
        }
    }

    pub fn intent(&self, key: &str) -> Option<Intent> {
        let key = key.to_lowercase();
        if key == self.night_toggle {
            Some(Intent::ToggleNight)
        } else if key == self.reset {
            Some(Intent::ResetTime)
        } else {
            None
        }
    }
}

/// Owns the input subscriptions of a mounted viewer and turns raw events
/// into intents.
///
/// Presses without movement produce no intent: click-to-select is left for
/// a future feature.
pub struct InteractionLayer<S: InputSource> {
    source: S,
    subscriptions: Vec<Subscription>,
    keys: KeyMap,
    hover: HoverState,
    drag_from: Option<[f64; 2]>,
}

impl<S: InputSource> InteractionLayer<S> {
    pub fn mount(mut source: S, keys: &KeyBindings) -> Self {
        let subscriptions = [InputKind::Pointer, InputKind::Wheel, InputKind::Key]
            .into_iter()
            .map(|kind| source.subscribe(kind))
            .collect();
        Self {
            source,
            subscriptions,
            keys: KeyMap::new(keys),
            hover: HoverState::default(),
            drag_from: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn set_hovered_city(&mut self, city: Option<usize>) {
        self.hover.city = city;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Drains the source and translates events in arrival order.
    pub fn poll(&mut self) -> Vec<Intent> {
        if !self.is_mounted() {
            return Vec::new();
        }
        let events = self.source.drain();
        let mut intents = Vec::with_capacity(events.len());
        for event in events {
            self.translate(event, &mut intents);
        }
        intents
    }

    fn translate(&mut self, event: InputEvent, out: &mut Vec<Intent>) {
        match event {
            InputEvent::PointerMove { x, y } => {
                if let Some([px, py]) = self.drag_from {
                    out.push(Intent::Orbit { dx: x - px, dy: y - py });
                    self.drag_from = Some([x, y]);
                }
                self.hover.cursor = Some([x, y]);
                out.push(Intent::Hover { x, y });
            }
            InputEvent::PointerDown { x, y, button } => {
                if button == PRIMARY_BUTTON {
                    self.drag_from = Some([x, y]);
                }
            }
            InputEvent::PointerUp { .. } => {
                self.drag_from = None;
            }
            InputEvent::PointerLeave => {
                self.drag_from = None;
                self.hover = HoverState::default();
                out.push(Intent::Leave);
            }
            InputEvent::Wheel { delta_y } => {
                if delta_y.is_finite() && delta_y != 0.0 {
                    out.push(Intent::TimeScroll { delta_y });
                }
            }
            InputEvent::KeyDown { key } => {
                if let Some(intent) = self.keys.intent(&key) {
                    out.push(intent);
                }
            }
        }
    }

    /// Removes every listener; returns how many were attached.
    pub fn unmount(&mut self) -> usize {
        let count = self.subscriptions.len();
        for subscription in self.subscriptions.drain(..) {
            self.source.unsubscribe(subscription);
        }
        self.hover = HoverState::default();
        self.drag_from = None;
        debug!(count, "input listeners removed");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::{HoverState, Intent, InteractionLayer};
    use crate::config::KeyBindings;
    use pretty_assertions::assert_eq;
    use runtime::event_bus::{EventBus, InputEvent, InputKind};

    fn layer() -> InteractionLayer<EventBus> {
        InteractionLayer::mount(EventBus::new(), &KeyBindings::default())
    }

    #[test]
    fn subscribes_every_kind_on_mount() {
        let layer = layer();
        for kind in [InputKind::Pointer, InputKind::Wheel, InputKind::Key] {
            assert!(layer.source().is_subscribed(kind));
        }
    }

    #[test]
    fn keys_match_case_insensitively() {
        let mut layer = layer();
        for key in ["N", "n", "R", "x"] {
            layer.source_mut().push(InputEvent::KeyDown { key: key.into() });
        }
        assert_eq!(
            layer.poll(),
            vec![Intent::ToggleNight, Intent::ToggleNight, Intent::ResetTime]
        );
    }

    #[test]
    fn drag_produces_orbit_deltas() {
        let mut layer = layer();
        let bus = layer.source_mut();
        bus.push(InputEvent::PointerMove { x: 10.0, y: 10.0 });
        bus.push(InputEvent::PointerDown {
            x: 10.0,
            y: 10.0,
            button: 0,
        });
        bus.push(InputEvent::PointerMove { x: 25.0, y: 5.0 });
        bus.push(InputEvent::PointerUp { x: 25.0, y: 5.0 });
        bus.push(InputEvent::PointerMove { x: 30.0, y: 5.0 });
        assert_eq!(
            layer.poll(),
            vec![
                Intent::Hover { x: 10.0, y: 10.0 },
                Intent::Orbit { dx: 15.0, dy: -5.0 },
                Intent::Hover { x: 25.0, y: 5.0 },
                Intent::Hover { x: 30.0, y: 5.0 },
            ]
        );
        assert!(!layer.is_dragging());
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let mut layer = layer();
        layer.source_mut().push(InputEvent::PointerDown {
            x: 0.0,
            y: 0.0,
            button: 2,
        });
        layer.source_mut().push(InputEvent::PointerMove { x: 5.0, y: 0.0 });
        assert_eq!(layer.poll(), vec![Intent::Hover { x: 5.0, y: 0.0 }]);
    }

    #[test]
    fn leave_clears_hover_and_zero_wheel_is_ignored() {
        let mut layer = layer();
        layer.source_mut().push(InputEvent::PointerMove { x: 1.0, y: 2.0 });
        layer.poll();
        layer.set_hovered_city(Some(3));
        layer.source_mut().push(InputEvent::Wheel { delta_y: 0.0 });
        layer.source_mut().push(InputEvent::PointerLeave);
        assert_eq!(layer.poll(), vec![Intent::Leave]);
        assert_eq!(layer.hover(), HoverState::default());
    }

    #[test]
    fn unmount_detaches_listeners() {
        let mut layer = layer();
        layer.source_mut().push(InputEvent::Wheel { delta_y: 100.0 });
        assert_eq!(layer.unmount(), 3);
        assert!(!layer.is_mounted());
        assert_eq!(layer.source().subscription_count(), 0);
        assert!(!layer.source_mut().push(InputEvent::Wheel { delta_y: 100.0 }));
        assert!(layer.poll().is_empty());
        assert_eq!(layer.unmount(), 0);
    }
}
