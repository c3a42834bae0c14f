use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    pub position: [f32; 3],
    /// 0.0 normal, 1.0 hovered.
    pub highlight: f32,
}

/// Largest segment counts whose vertex indices still fit in `u16`.
pub const MAX_LAT_SEGMENTS: u32 = 128;
pub const MAX_LON_SEGMENTS: u32 = 256;

/// UV sphere in globe space, matching `GeoPoint::to_unit_vector`.
///
/// `uv = ((lon + 180) / 360, (90 - lat) / 180)`, so an equirectangular map
/// lines up with geographic coordinates. Triangles wind counter-clockwise
/// seen from inside; the screen flip in the camera makes them
/// counter-clockwise from outside on screen.
pub fn sphere_mesh(radius: f32, lat_segments: u32, lon_segments: u32) -> (Vec<SurfaceVertex>, Vec<u16>) {
    let lat_segments = lat_segments.clamp(3, MAX_LAT_SEGMENTS);
    let lon_segments = lon_segments.clamp(3, MAX_LON_SEGMENTS);

    let mut vertices = Vec::with_capacity(((lat_segments + 1) * (lon_segments + 1)) as usize);
    for lat in 0..=lat_segments {
        let v = lat as f32 / lat_segments as f32;
        let lat_rad = std::f32::consts::FRAC_PI_2 - v * std::f32::consts::PI;
        let (sin_lat, cos_lat) = lat_rad.sin_cos();

        for lon in 0..=lon_segments {
            let u = lon as f32 / lon_segments as f32;
            let lon_rad = u * std::f32::consts::TAU - std::f32::consts::PI;
            let (sin_lon, cos_lon) = lon_rad.sin_cos();

            let n = [cos_lat * cos_lon, sin_lat, cos_lat * sin_lon];
            vertices.push(SurfaceVertex {
                position: [n[0] * radius, n[1] * radius, n[2] * radius],
                normal: n,
                uv: [u, v],
            });
        }
    }

    let stride = lon_segments + 1;
    let mut indices = Vec::with_capacity((lat_segments * lon_segments * 6) as usize);
    for lat in 0..lat_segments {
        for lon in 0..lon_segments {
            let i0 = lat * stride + lon;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;

            indices.extend([i0, i2, i1, i1, i2, i3].map(|i| i as u16));
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::{MAX_LAT_SEGMENTS, MAX_LON_SEGMENTS, SurfaceVertex, sphere_mesh};
    use foundation::math::GeoPoint;

    #[test]
    fn counts_match_segments() {
        let (v, i) = sphere_mesh(1.0, 4, 8);
        assert_eq!(v.len(), 5 * 9);
        assert_eq!(i.len(), 4 * 8 * 6);
        assert!(i.iter().all(|&idx| (idx as usize) < v.len()));
    }

    #[test]
    fn largest_mesh_fits_u16() {
        let (v, _) = sphere_mesh(1.0, 10_000, 10_000);
        assert_eq!(v.len() as u32, (MAX_LAT_SEGMENTS + 1) * (MAX_LON_SEGMENTS + 1));
        assert!(v.len() <= u16::MAX as usize + 1);
    }

    #[test]
    fn uv_lines_up_with_geographic_projection() {
        let (v, _) = sphere_mesh(2.0, 4, 8);
        for SurfaceVertex { position, normal, uv } in v {
            let lat = 90.0 - 180.0 * uv[1] as f64;
            let lon = 360.0 * uv[0] as f64 - 180.0;
            let expect = GeoPoint::new(lat, lon).to_unit_vector();
            assert!((normal[0] as f64 - expect.x).abs() < 1e-5);
            assert!((normal[1] as f64 - expect.y).abs() < 1e-5);
            assert!((normal[2] as f64 - expect.z).abs() < 1e-5);
            assert!((position[1] - 2.0 * normal[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 32);
        assert_eq!(std::mem::size_of::<super::MarkerInstance>(), 16);
    }
}
