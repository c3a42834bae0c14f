//! Which instant the globe is showing.
//!
//! `Auto` follows the wall clock on a repeating tick. The first wheel input
//! switches to `Manual`, where wheel deltas move a frozen instant back and
//! forth. Only an explicit reset returns to `Auto`.

use ephemeris::solar::subsolar_point;
use foundation::math::GeoPoint;
use foundation::time::Instant;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::timer::{TimerId, TimerQueue};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TimeMode {
    Auto,
    Manual,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimeState {
    /// `instant` is the clock reading at the last tick.
    Auto { instant: Instant },
    /// `instant` only moves when a wheel delta is applied.
    Manual { instant: Instant },
}

impl TimeState {
    pub fn instant(&self) -> Instant {
        match *self {
            TimeState::Auto { instant } | TimeState::Manual { instant } => instant,
        }
    }

    pub fn mode(&self) -> TimeMode {
        match self {
            TimeState::Auto { .. } => TimeMode::Auto,
            TimeState::Manual { .. } => TimeMode::Manual,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeSettings {
    /// Seconds between Auto refreshes.
    pub tick_interval_s: f64,
    /// Wheel delta that counts as one step.
    pub scroll_step: f64,
    pub minutes_per_step: f64,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_s: 60.0,
            scroll_step: 100.0,
            minutes_per_step: 15.0,
        }
    }
}

impl TimeSettings {
    /// `(delta_y / scroll_step) * minutes_per_step`.
    pub fn minutes_for_wheel(&self, delta_y: f64) -> f64 {
        delta_y / self.scroll_step * self.minutes_per_step
    }
}

/// Emitted on every change of the displayed instant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolarUpdate {
    pub instant: Instant,
    pub subsolar: GeoPoint,
    pub mode: TimeMode,
}

impl SolarUpdate {
    fn from_state(state: TimeState) -> Self {
        let instant = state.instant();
        Self {
            instant,
            subsolar: subsolar_point(instant),
            mode: state.mode(),
        }
    }
}

pub struct TimeController<C: Clock> {
    clock: C,
    settings: TimeSettings,
    state: TimeState,
    timers: TimerQueue,
    tick: Option<TimerId>,
    shut_down: bool,
}

impl<C: Clock> TimeController<C> {
    /// Starts in `Auto` at the clock's current reading with the tick armed.
    pub fn new(clock: C, settings: TimeSettings) -> Self {
        let state = TimeState::Auto {
            instant: clock.now(),
        };
        let mut timers = TimerQueue::new();
        let tick = Some(timers.schedule_repeating(settings.tick_interval_s));
        Self {
            clock,
            settings,
            state,
            timers,
            tick,
            shut_down: false,
        }
    }

    pub fn state(&self) -> TimeState {
        self.state
    }

    pub fn mode(&self) -> TimeMode {
        self.state.mode()
    }

    pub fn settings(&self) -> &TimeSettings {
        &self.settings
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn is_tick_armed(&self) -> bool {
        self.tick.is_some_and(|id| self.timers.is_active(id))
    }

    /// The instant as of the last change, paired with its subsolar point.
    pub fn current(&self) -> SolarUpdate {
        SolarUpdate::from_state(self.state)
    }

    /// Instant used for tooltip text: the frozen instant in `Manual`, the live
    /// clock otherwise.
    pub fn display_instant(&self) -> Instant {
        match self.state {
            TimeState::Manual { instant } => instant,
            TimeState::Auto { .. } => self.clock.now(),
        }
    }

    /// Feeds elapsed host time to the tick timer.
    pub fn advance(&mut self, dt_s: f64) -> Option<SolarUpdate> {
        if self.shut_down {
            return None;
        }
        let fired = self.timers.advance(dt_s);
        let tick = self.tick?;
        if fired.contains(&tick) {
            self.on_tick()
        } else {
            None
        }
    }

    fn on_tick(&mut self) -> Option<SolarUpdate> {
        // The timer is cancelled on leaving Auto; this guards a stale id.
        let TimeState::Auto { .. } = self.state else {
            return None;
        };
        self.state = TimeState::Auto {
            instant: self.clock.now(),
        };
        debug!(instant = %self.state.instant().utc(), "auto tick");
        Some(SolarUpdate::from_state(self.state))
    }

    /// Applies one wheel event. The first one leaves `Auto`.
    pub fn scroll(&mut self, delta_y: f64) -> Option<SolarUpdate> {
        if self.shut_down || !delta_y.is_finite() {
            return None;
        }
        let minutes = self.settings.minutes_for_wheel(delta_y);
        let base = match self.state {
            TimeState::Manual { instant } => instant,
            TimeState::Auto { .. } => {
                self.disarm_tick();
                let now = self.clock.now();
                info!(seed = %now.utc(), "time travel: auto -> manual");
                now
            }
        };
        self.state = TimeState::Manual {
            instant: base.shifted_by_minutes(minutes),
        };
        Some(SolarUpdate::from_state(self.state))
    }

    /// Leaves `Manual` for the live clock. No-op in `Auto`.
    pub fn reset(&mut self) -> Option<SolarUpdate> {
        if self.shut_down {
            return None;
        }
        let TimeState::Manual { .. } = self.state else {
            return None;
        };
        self.state = TimeState::Auto {
            instant: self.clock.now(),
        };
        self.tick = Some(self.timers.schedule_repeating(self.settings.tick_interval_s));
        info!(now = %self.state.instant().utc(), "time travel reset: manual -> auto");
        Some(SolarUpdate::from_state(self.state))
    }

    /// Cancels every timer. Nothing changes the state afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let cancelled = self.timers.cancel_all();
        self.tick = None;
        self.shut_down = true;
        debug!(cancelled, "time controller shut down");
    }

    fn disarm_tick(&mut self) {
        if let Some(id) = self.tick.take() {
            self.timers.cancel(id);
        }
    }
}
