//! Local civil time for a point on the globe.

use chrono::Offset;
use chrono_tz::Tz;
use foundation::math::GeoPoint;
use foundation::time::Instant;

use crate::timezone::{TimezoneLookup, TzfLookup, resolve_zone};

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%a, %b %-d, %Y";

/// Tooltip-ready local time at a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityTime {
    pub zone: Tz,
    /// `HH:MM`, 24-hour.
    pub local_time: String,
    /// `UTC+9`, `UTC+5.5`, `UTC-3.5`, `UTC+0`.
    pub offset_label: String,
    /// `Fri, Jun 21, 2024`.
    pub date: String,
}

impl CityTime {
    pub fn zone_name(&self) -> &'static str {
        self.zone.name()
    }
}

/// Stateless resolver; every call is independent.
#[derive(Debug, Default, Clone)]
pub struct CityTimeResolver<L = TzfLookup> {
    lookup: L,
}

impl CityTimeResolver<TzfLookup> {
    pub fn new() -> Self {
        Self { lookup: TzfLookup }
    }
}

impl<L: TimezoneLookup> CityTimeResolver<L> {
    pub fn with_lookup(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, location: GeoPoint, instant: Instant) -> CityTime {
        let zone = resolve_zone(&self.lookup, location);
        let local = instant.utc().with_timezone(&zone);
        let offset_s = local.offset().fix().local_minus_utc();
        CityTime {
            zone,
            local_time: local.format(TIME_FORMAT).to_string(),
            offset_label: format_offset_label(offset_s),
            date: local.format(DATE_FORMAT).to_string(),
        }
    }
}

/// `UTC±N` where `N` is the offset in hours without trailing zeros.
pub fn format_offset_label(offset_seconds: i32) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let abs = offset_seconds.unsigned_abs();
    if abs % 3600 == 0 {
        return format!("UTC{sign}{}", abs / 3600);
    }
    let hours = format!("{:.2}", abs as f64 / 3600.0);
    let hours = hours.trim_end_matches('0').trim_end_matches('.');
    format!("UTC{sign}{hours}")
}

#[cfg(test)]
mod tests {
    use super::{CityTimeResolver, format_offset_label};
    use foundation::math::GeoPoint;
    use foundation::time::Instant;
    use pretty_assertions::assert_eq;

    #[test]
    fn offset_labels() {
        assert_eq!(format_offset_label(0), "UTC+0");
        assert_eq!(format_offset_label(9 * 3600), "UTC+9");
        assert_eq!(format_offset_label(-5 * 3600), "UTC-5");
        assert_eq!(format_offset_label(5 * 3600 + 1800), "UTC+5.5");
        assert_eq!(format_offset_label(5 * 3600 + 2700), "UTC+5.75");
        assert_eq!(format_offset_label(-(3 * 3600 + 1800)), "UTC-3.5");
    }

    #[test]
    fn tokyo_at_utc_midnight() {
        let resolver = CityTimeResolver::new();
        let t = Instant::from_ymd_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let city = resolver.resolve(GeoPoint::new(35.68, 139.65), t);
        assert_eq!(city.zone_name(), "Asia/Tokyo");
        assert_eq!(city.local_time, "09:00");
        assert_eq!(city.offset_label, "UTC+9");
        assert_eq!(city.date, "Fri, Jun 21, 2024");
    }

    #[test]
    fn new_york_tracks_daylight_saving() {
        let resolver = CityTimeResolver::new();
        let nyc = GeoPoint::new(40.71, -74.01);
        let winter = Instant::from_ymd_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let summer = Instant::from_ymd_hms(2024, 7, 15, 12, 0, 0).unwrap();
        assert_eq!(resolver.resolve(nyc, winter).offset_label, "UTC-5");
        assert_eq!(resolver.resolve(nyc, summer).offset_label, "UTC-4");
        assert_eq!(resolver.resolve(nyc, summer).local_time, "08:00");
    }

    #[test]
    fn date_rolls_over_with_zone() {
        let resolver = CityTimeResolver::new();
        let t = Instant::from_ymd_hms(2024, 12, 31, 20, 0, 0).unwrap();
        let sydney = resolver.resolve(GeoPoint::new(-33.87, 151.21), t);
        assert_eq!(sydney.date, "Wed, Jan 1, 2025");
        assert_eq!(sydney.offset_label, "UTC+11");
    }

    #[test]
    fn failed_lookup_reports_utc() {
        let resolver = CityTimeResolver::with_lookup(|_: GeoPoint| None);
        let t = Instant::from_ymd_hms(2024, 6, 21, 14, 5, 0).unwrap();
        let city = resolver.resolve(GeoPoint::new(0.0, -140.0), t);
        assert_eq!(city.zone_name(), "UTC");
        assert_eq!(city.offset_label, "UTC+0");
        assert_eq!(city.local_time, "14:05");
    }

    #[test]
    fn resolution_is_idempotent() {
        let resolver = CityTimeResolver::new();
        let t = Instant::from_ymd_hms(2024, 3, 10, 6, 45, 0).unwrap();
        let p = GeoPoint::new(51.51, -0.13);
        assert_eq!(resolver.resolve(p, t), resolver.resolve(p, t));
    }
}
