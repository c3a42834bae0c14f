//! Browser listeners feeding the viewer's input queue.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use runtime::event_bus::{EventBus, InputEvent, InputKind, InputSource, Subscription};
use tracing::{trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, EventTarget, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent};

type Handler = Closure<dyn FnMut(web_sys::Event)>;

/// One attached DOM listener; detaches itself on drop.
struct Listener {
    target: EventTarget,
    event: &'static str,
    handler: Handler,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event, self.handler.as_ref().unchecked_ref())
        {
            warn!(event = self.event, ?err, "failed to remove listener");
        }
    }
}

/// [`InputSource`] over the canvas (pointer and wheel) and the window
/// (keys). DOM listeners for a kind exist only while it has subscribers.
pub struct DomEventSource {
    canvas: HtmlCanvasElement,
    window: web_sys::Window,
    bus: Rc<RefCell<EventBus>>,
    listeners: BTreeMap<InputKind, Vec<Listener>>,
}

impl DomEventSource {
    pub fn new(window: web_sys::Window, canvas: HtmlCanvasElement) -> Self {
        Self {
            canvas,
            window,
            bus: Rc::new(RefCell::new(EventBus::new())),
            listeners: BTreeMap::new(),
        }
    }

    pub fn attached_kinds(&self) -> usize {
        self.listeners.len()
    }

    fn attach(&self, kind: InputKind) -> Result<Vec<Listener>, JsValue> {
        let canvas: &EventTarget = self.canvas.as_ref();
        let window: &EventTarget = self.window.as_ref();
        match kind {
            InputKind::Pointer => Ok(vec![
                self.listen(canvas, "pointermove", false, |e| {
                    let m = e.dyn_ref::<MouseEvent>()?;
                    Some(InputEvent::PointerMove {
                        x: m.offset_x() as f64,
                        y: m.offset_y() as f64,
                    })
                })?,
                self.listen(canvas, "pointerdown", false, |e| {
                    let m = e.dyn_ref::<MouseEvent>()?;
                    Some(InputEvent::PointerDown {
                        x: m.offset_x() as f64,
                        y: m.offset_y() as f64,
                        button: m.button(),
                    })
                })?,
                self.listen(canvas, "pointerup", false, |e| {
                    let m = e.dyn_ref::<MouseEvent>()?;
                    Some(InputEvent::PointerUp {
                        x: m.offset_x() as f64,
                        y: m.offset_y() as f64,
                    })
                })?,
                self.listen(canvas, "pointerleave", false, |_| Some(InputEvent::PointerLeave))?,
            ]),
            // Non-passive so the page does not scroll while time-travelling.
            InputKind::Wheel => Ok(vec![self.listen(canvas, "wheel", true, |e| {
                let w = e.dyn_ref::<WheelEvent>()?;
                Some(InputEvent::Wheel { delta_y: w.delta_y() })
            })?]),
            InputKind::Key => Ok(vec![self.listen(window, "keydown", false, |e| {
                let k = e.dyn_ref::<KeyboardEvent>()?;
                if k.repeat() || k.ctrl_key() || k.meta_key() || k.alt_key() {
                    return None;
                }
                Some(InputEvent::KeyDown { key: k.key() })
            })?]),
        }
    }

    fn listen(
        &self,
        target: &EventTarget,
        event: &'static str,
        prevent_default: bool,
        translate: impl Fn(&web_sys::Event) -> Option<InputEvent> + 'static,
    ) -> Result<Listener, JsValue> {
        let bus = Rc::clone(&self.bus);
        let handler: Handler = Closure::new(move |e: web_sys::Event| {
            let Some(input) = translate(&e) else {
                return;
            };
            if prevent_default {
                e.prevent_default();
            }
            match bus.try_borrow_mut() {
                Ok(mut bus) => {
                    bus.push(input);
                }
                Err(_) => trace!(event, "input queue busy; event dropped"),
            }
        });

        let options = AddEventListenerOptions::new();
        options.set_passive(!prevent_default);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            handler.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Listener {
            target: target.clone(),
            event,
            handler,
        })
    }
}

impl InputSource for DomEventSource {
    fn subscribe(&mut self, kind: InputKind) -> Subscription {
        let subscription = self.bus.borrow_mut().subscribe(kind);
        if !self.listeners.contains_key(&kind) {
            match self.attach(kind) {
                Ok(listeners) => {
                    self.listeners.insert(kind, listeners);
                }
                Err(err) => warn!(?kind, ?err, "failed to attach listeners"),
            }
        }
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let removed = self.bus.borrow_mut().unsubscribe(subscription);
        let kind = subscription.kind();
        if !self.bus.borrow().is_subscribed(kind) {
            self.listeners.remove(&kind);
        }
        removed
    }

    fn drain(&mut self) -> Vec<InputEvent> {
        self.bus.borrow_mut().drain()
    }
}
