//! Low-cost subsolar point approximation.
//!
//! Longitude follows the UTC clock at 15° per hour; latitude is the solar
//! declination from a sine fit over the year. Accurate to roughly a degree,
//! which is plenty for shading a globe.

use std::f64::consts::TAU;

use foundation::math::{GeoPoint, Vec3};
use foundation::time::Instant;

/// Earth's axial tilt used as the declination amplitude (degrees).
pub const AXIAL_TILT_DEG: f64 = 23.44;

/// Day of year the declination fit crosses zero (March equinox).
const EQUINOX_DAY: f64 = 81.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Geographic point directly beneath the sun at `instant`.
pub fn subsolar_point(instant: Instant) -> GeoPoint {
    GeoPoint::new(
        solar_declination_deg(instant.day_of_year()),
        subsolar_longitude_deg(instant.utc_decimal_hours()),
    )
}

/// `23.44° · sin(2π · (day − 81) / 365)` for a 1-based day of year.
pub fn solar_declination_deg(day_of_year: u32) -> f64 {
    AXIAL_TILT_DEG * (TAU * (day_of_year as f64 - EQUINOX_DAY) / DAYS_PER_YEAR).sin()
}

/// `-15° · hours`, wrapped once into `[-180, 180]`.
///
/// Input is a UTC decimal hour in `[0, 24)`, so the raw value lies in
/// `(-360, 0]` and a single wrap is enough.
pub fn subsolar_longitude_deg(utc_decimal_hours: f64) -> f64 {
    let lon = -15.0 * utc_decimal_hours;
    if lon < -180.0 { lon + 360.0 } else { lon }
}

/// Unit vector pointing from the globe center toward the sun.
pub fn sun_direction(instant: Instant) -> Vec3 {
    subsolar_point(instant).to_unit_vector()
}

#[cfg(test)]
mod tests {
    use super::{subsolar_longitude_deg, subsolar_point, sun_direction};
    use foundation::time::Instant;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn june_solstice_is_tropic_of_cancer() {
        for year in [2023, 2024, 2025] {
            for hour in 0..24 {
                let t = Instant::from_ymd_hms(year, 6, 21, hour, 0, 0).unwrap();
                assert_close(subsolar_point(t).lat, 23.44, 0.1);
            }
        }
    }

    #[test]
    fn december_solstice_is_tropic_of_capricorn() {
        for year in [2023, 2024, 2025] {
            for hour in 0..24 {
                let t = Instant::from_ymd_hms(year, 12, 21, hour, 30, 0).unwrap();
                assert_close(subsolar_point(t).lat, -23.44, 0.1);
            }
        }
    }

    #[test]
    fn longitude_stays_in_range_over_a_day() {
        let start = Instant::from_ymd_hms(2024, 3, 1, 0, 0, 0).unwrap();
        for step in 0..(24 * 60) {
            let t = start.shifted_by_minutes(step as f64);
            let lon = subsolar_point(t).lon;
            assert!((-180.0..=180.0).contains(&lon), "lon {lon} at step {step}");
        }
    }

    #[test]
    fn longitude_wraps_once_past_noon() {
        assert_close(subsolar_longitude_deg(6.0), -90.0, 1e-12);
        assert_close(subsolar_longitude_deg(12.0), -180.0, 1e-12);
        assert_close(subsolar_longitude_deg(18.0), 90.0, 1e-12);
        assert_close(subsolar_longitude_deg(23.5), 7.5, 1e-12);
    }

    #[test]
    fn midnight_utc_on_june_solstice() {
        let t = Instant::from_ymd_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let p = subsolar_point(t);
        assert_close(p.lat, 23.44, 0.1);
        assert_close(p.lon, 0.0, 1e-12);

        let dir = sun_direction(t);
        assert_close(dir.length(), 1.0, 1e-12);
        assert!(dir.x > 0.9 && dir.y > 0.39);
    }
}
