//! Coordinate → IANA timezone lookup.

use chrono_tz::Tz;
use foundation::math::GeoPoint;
use once_cell::sync::Lazy;
use tracing::warn;
use tzf_rs::DefaultFinder;

/// Maps a coordinate to an IANA zone name such as `"Asia/Tokyo"`.
pub trait TimezoneLookup {
    fn zone_name(&self, point: GeoPoint) -> Option<String>;
}

impl<F> TimezoneLookup for F
where
    F: Fn(GeoPoint) -> Option<String>,
{
    fn zone_name(&self, point: GeoPoint) -> Option<String> {
        self(point)
    }
}

// Building the finder decodes the embedded boundary data; do it once.
static FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// Lookup backed by the timezone boundary polygons shipped with `tzf-rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TzfLookup;

impl TimezoneLookup for TzfLookup {
    fn zone_name(&self, point: GeoPoint) -> Option<String> {
        if !point.is_valid() {
            return None;
        }
        let name = FINDER.get_tz_name(point.lon, point.lat);
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Resolves `point` to a zone, degrading to UTC when the lookup has no answer
/// or answers with a name chrono-tz does not know.
pub fn resolve_zone(lookup: &impl TimezoneLookup, point: GeoPoint) -> Tz {
    let Some(name) = lookup.zone_name(point) else {
        warn!(lat = point.lat, lon = point.lon, "no timezone for coordinate, using UTC");
        return Tz::UTC;
    };
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(err) => {
            warn!(zone = %name, %err, "unknown timezone name, using UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TzfLookup, resolve_zone};
    use chrono_tz::Tz;
    use foundation::math::GeoPoint;

    #[test]
    fn tokyo_resolves_to_asia_tokyo() {
        let tz = resolve_zone(&TzfLookup, GeoPoint::new(35.68, 139.65));
        assert_eq!(tz, Tz::Asia__Tokyo);
    }

    #[test]
    fn missing_zone_falls_back_to_utc() {
        let lookup = |_: GeoPoint| None;
        assert_eq!(resolve_zone(&lookup, GeoPoint::new(0.0, -140.0)), Tz::UTC);
    }

    #[test]
    fn unparseable_zone_falls_back_to_utc() {
        let lookup = |_: GeoPoint| Some("Atlantis/Lost_City".to_string());
        assert_eq!(resolve_zone(&lookup, GeoPoint::new(10.0, 10.0)), Tz::UTC);
    }

    #[test]
    fn out_of_range_coordinates_fall_back_to_utc() {
        assert_eq!(resolve_zone(&TzfLookup, GeoPoint::new(f64::NAN, 0.0)), Tz::UTC);
        assert_eq!(resolve_zone(&TzfLookup, GeoPoint::new(0.0, 400.0)), Tz::UTC);
    }
}
