/// Per-frame timing handed down from the host's animation loop.
///
/// Kept small and pure so a sequence of frames can be recorded and replayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame.
    pub dt_s: f64,
    /// Seconds since the first frame.
    pub elapsed_s: f64,
}

impl Frame {
    /// Host frames arrive with wildly varying gaps (tab switches, debugger
    /// pauses); anything longer is clamped.
    pub const MAX_DT_S: f64 = 1.0;

    pub fn first() -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            elapsed_s: 0.0,
        }
    }

    pub fn next(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() {
            dt_s.clamp(0.0, Self::MAX_DT_S)
        } else {
            0.0
        };
        Self {
            index: self.index + 1,
            dt_s,
            elapsed_s: self.elapsed_s + dt_s,
        }
    }

    /// Frame following one stamped `prev_ms`, for hosts that report
    /// timestamps (`requestAnimationFrame`) instead of deltas.
    pub fn next_from_timestamps(self, prev_ms: f64, now_ms: f64) -> Self {
        self.next((now_ms - prev_ms) / 1000.0)
    }
}
