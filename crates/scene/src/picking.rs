use foundation::math::{GeoPoint, Mat4, Vec3, mat4_transform_point};

/// Viewport size in CSS pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Projects a world point to pixel coordinates (origin top-left, y down).
/// `None` when the point is behind the camera.
pub fn project_to_screen(view_proj: Mat4, point: Vec3, viewport: Viewport) -> Option<[f64; 2]> {
    let [x, y, _, w] = mat4_transform_point(view_proj, point);
    if w <= 1e-9 {
        return None;
    }
    let ndc_x = x / w;
    let ndc_y = y / w;
    Some([
        (ndc_x + 1.0) * 0.5 * viewport.width,
        (1.0 - ndc_y) * 0.5 * viewport.height,
    ])
}

/// Whether a point on a sphere of `radius` faces a camera at `eye`.
pub fn faces_camera(point: Vec3, eye: Vec3, radius: f64) -> bool {
    point.dot(eye) > radius * radius
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub radius_px: f64,
    /// Sphere the markers sit on.
    pub globe_radius: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            radius_px: 12.0,
            globe_radius: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerHit {
    pub index: usize,
    pub distance_px: f64,
    pub screen: [f64; 2],
}

/// Nearest visible marker within `radius_px` of `cursor`.
///
/// Markers on the far hemisphere are skipped. Equal distances go to the
/// lower index.
pub fn pick_marker(
    markers: &[GeoPoint],
    view_proj: Mat4,
    eye: Vec3,
    viewport: Viewport,
    cursor: [f64; 2],
    opts: PickOptions,
) -> Option<MarkerHit> {
    let mut best: Option<MarkerHit> = None;
    for (index, marker) in markers.iter().enumerate() {
        let world = marker.to_sphere_point(opts.globe_radius);
        if !faces_camera(world, eye, opts.globe_radius) {
            continue;
        }
        let Some(screen) = project_to_screen(view_proj, world, viewport) else {
            continue;
        };
        let distance_px = (screen[0] - cursor[0]).hypot(screen[1] - cursor[1]);
        if distance_px.is_nan() || distance_px > opts.radius_px {
            continue;
        }
        let closer = match best {
            None => true,
            Some(b) => distance_px.total_cmp(&b.distance_px).then(index.cmp(&b.index)).is_lt(),
        };
        if closer {
            best = Some(MarkerHit {
                index,
                distance_px,
                screen,
            });
        }
    }
    best
}
