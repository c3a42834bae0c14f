use std::cell::Cell;
use std::rc::Rc;

use chrono::Utc;
use foundation::time::Instant;

/// Source of "now".
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock (`Date.now()` on wasm).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::from_utc(Utc::now())
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, instant: Instant) {
        self.now.set(instant);
    }

    pub fn advance_minutes(&self, minutes: f64) {
        self.now.set(self.now.get().shifted_by_minutes(minutes));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use foundation::time::Instant;

    #[test]
    fn clones_share_time() {
        let start = Instant::from_ymd_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = ManualClock::new(start);
        let b = a.clone();
        a.advance_minutes(90.0);
        assert_eq!(b.now().millis_since(start), 90 * 60_000);
    }
}
