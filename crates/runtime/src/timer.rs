/// Identifies a scheduled timer. Ids are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Copy, Clone, PartialEq)]
struct Timer {
    id: TimerId,
    interval_s: f64,
    next_due_s: f64,
}

/// Cancellable repeating timers over host-supplied elapsed time.
///
/// Time only moves through [`TimerQueue::advance`], so firing is
/// deterministic and replayable. A timer that fell several intervals behind
/// (e.g. a backgrounded tab) fires once and is realigned, like a browser
/// interval.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now_s: f64,
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_s(&self) -> f64 {
        self.now_s
    }

    /// Schedules a timer that first fires `interval_s` from now.
    pub fn schedule_repeating(&mut self, interval_s: f64) -> TimerId {
        let interval_s = if interval_s.is_finite() && interval_s > 0.0 {
            interval_s
        } else {
            1.0
        };
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.timers.push(Timer {
            id,
            interval_s,
            next_due_s: self.now_s + interval_s,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Advances time and returns the timers that came due, ordered by
    /// `(due time, id)`.
    pub fn advance(&mut self, dt_s: f64) -> Vec<TimerId> {
        if dt_s.is_finite() && dt_s > 0.0 {
            self.now_s += dt_s;
        }

        let mut fired: Vec<(f64, TimerId)> = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due_s <= self.now_s {
                fired.push((timer.next_due_s, timer.id));
                let behind = ((self.now_s - timer.next_due_s) / timer.interval_s).floor();
                timer.next_due_s += (behind + 1.0) * timer.interval_s;
            }
        }

        fired.sort_by(|(ta, a), (tb, b)| ta.total_cmp(tb).then_with(|| a.cmp(b)));
        fired.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;

    #[test]
    fn fires_after_full_interval() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_repeating(60.0);
        assert!(timers.advance(59.0).is_empty());
        assert_eq!(timers.advance(1.0), vec![id]);
        assert!(timers.advance(30.0).is_empty());
        assert_eq!(timers.advance(30.0), vec![id]);
    }

    #[test]
    fn coalesces_missed_intervals() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_repeating(60.0);
        assert_eq!(timers.advance(600.0), vec![id]);
        assert!(timers.advance(59.0).is_empty());
        assert_eq!(timers.advance(1.0), vec![id]);
    }

    #[test]
    fn fires_in_due_order_then_id_order() {
        let mut timers = TimerQueue::new();
        let slow = timers.schedule_repeating(10.0);
        let fast = timers.schedule_repeating(5.0);
        let same = timers.schedule_repeating(10.0);
        assert_eq!(timers.advance(10.0), vec![fast, slow, same]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_repeating(1.0);
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_active(id));
        assert!(timers.advance(100.0).is_empty());
    }

    #[test]
    fn cancel_all_clears_queue() {
        let mut timers = TimerQueue::new();
        timers.schedule_repeating(1.0);
        timers.schedule_repeating(2.0);
        assert_eq!(timers.cancel_all(), 2);
        assert_eq!(timers.active_count(), 0);
        assert!(timers.advance(10.0).is_empty());
    }

    #[test]
    fn ignores_non_finite_advance() {
        let mut timers = TimerQueue::new();
        timers.schedule_repeating(1.0);
        assert!(timers.advance(f64::NAN).is_empty());
        assert_eq!(timers.now_s(), 0.0);
    }
}
