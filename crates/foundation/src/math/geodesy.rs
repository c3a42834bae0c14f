use super::Vec3;

/// Geographic coordinate in degrees on a spherical globe.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Projects onto the unit sphere (y up):
    /// `x = cos(lat)·cos(lon)`, `y = sin(lat)`, `z = cos(lat)·sin(lon)`.
    pub fn to_unit_vector(self) -> Vec3 {
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        let cos_lat = lat.cos();
        Vec3::new(cos_lat * lon.cos(), lat.sin(), cos_lat * lon.sin())
    }

    /// Point on a sphere of `radius` centered at the origin.
    pub fn to_sphere_point(self, radius: f64) -> Vec3 {
        self.to_unit_vector().scale(radius)
    }
}
