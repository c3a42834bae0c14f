use foundation::math::{GeoPoint, Vec3};
use gpu::Camera3D;

use crate::config::CameraConfig;

const NEAR: f64 = 0.05;
const FAR_MARGIN: f64 = 1.5;

/// Camera on a fixed-distance orbit around the globe, aimed at its center.
///
/// Only rotation is exposed; the wheel belongs to time travel, so there is
/// no zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    center: GeoPoint,
    distance: f64,
    fov_y_deg: f64,
    drag_deg_per_px: f64,
    max_pitch_deg: f64,
    far: f64,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, starfield_radius: f64) -> Self {
        let mut camera = Self {
            center: GeoPoint::new(0.0, 0.0),
            distance: config.distance,
            fov_y_deg: config.fov_y_deg,
            drag_deg_per_px: config.drag_deg_per_px,
            max_pitch_deg: config.max_pitch_deg,
            far: starfield_radius * FAR_MARGIN,
        };
        camera.face(GeoPoint::new(config.lat_deg, config.lon_deg));
        camera
    }

    /// Surface point under the screen center.
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Turns the globe so `point` sits under the screen center.
    pub fn face(&mut self, point: GeoPoint) {
        self.center = GeoPoint::new(
            point.lat.clamp(-self.max_pitch_deg, self.max_pitch_deg),
            wrap_lon(point.lon),
        );
    }

    /// Rotates by a pointer drag of `(dx, dy)` pixels. The surface follows
    /// the pointer: dragging right brings western longitudes into view.
    pub fn orbit(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let lat = self.center.lat + dy * self.drag_deg_per_px;
        let lon = self.center.lon - dx * self.drag_deg_per_px;
        self.face(GeoPoint::new(lat, lon));
    }

    pub fn eye(&self) -> Vec3 {
        self.center.to_sphere_point(self.distance)
    }

    pub fn camera(&self) -> Camera3D {
        Camera3D::look_at(
            self.eye(),
            Vec3::new(0.0, 0.0, 0.0),
            self.fov_y_deg.to_radians(),
            NEAR,
            self.far,
        )
    }
}

fn wrap_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}
