use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

/// An absolute UTC instant, millisecond resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Instant(dt)
    }

    pub fn from_unix_ms(ms: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(ms).map(Instant)
    }

    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Instant)
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn unix_ms(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// `hour + minute/60 + second/3600` of the UTC wall clock.
    pub fn utc_decimal_hours(&self) -> f64 {
        self.0.hour() as f64 + self.0.minute() as f64 / 60.0 + self.0.second() as f64 / 3600.0
    }

    /// 1-based ordinal day of the UTC year.
    pub fn day_of_year(&self) -> u32 {
        self.0.ordinal()
    }

    /// Shift by a signed number of minutes, rounded to whole milliseconds.
    ///
    /// Rounding is symmetric around zero, so shifting by `m` and then `-m`
    /// lands on the starting instant. Shifts leaving chrono's range are
    /// ignored.
    pub fn shifted_by_minutes(self, minutes: f64) -> Self {
        let ms = (minutes * 60_000.0).round();
        if !ms.is_finite() {
            return self;
        }
        self.0
            .checked_add_signed(Duration::milliseconds(ms as i64))
            .map(Instant)
            .unwrap_or(self)
    }

    /// Signed milliseconds from `earlier` to `self`.
    pub fn millis_since(&self, earlier: Instant) -> i64 {
        (self.0 - earlier.0).num_milliseconds()
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(dt: DateTime<Utc>) -> Self {
        Instant(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::Instant;

    #[test]
    fn decimal_hours_and_ordinal() {
        let t = Instant::from_ymd_hms(2024, 2, 1, 13, 30, 36).unwrap();
        assert!((t.utc_decimal_hours() - 13.51).abs() < 1e-12);
        assert_eq!(t.day_of_year(), 32);
    }

    #[test]
    fn minute_shift_round_trips() {
        let t = Instant::from_ymd_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let minutes = 15.0 * 1.234_567;
        let back = t.shifted_by_minutes(minutes).shifted_by_minutes(-minutes);
        assert_eq!(back, t);
        assert_eq!(t.shifted_by_minutes(15.0).millis_since(t), 900_000);
    }

    #[test]
    fn non_finite_shift_is_ignored() {
        let t = Instant::from_unix_ms(1_700_000_000_000).unwrap();
        assert_eq!(t.shifted_by_minutes(f64::NAN), t);
        assert_eq!(t.shifted_by_minutes(f64::INFINITY), t);
    }
}
