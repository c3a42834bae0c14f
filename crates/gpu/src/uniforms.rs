use bytemuck::{Pod, Zeroable};
use foundation::math::{Mat4, Vec3};
use scene::resources::{Light, Material, SceneResources};
use scene::SceneGeneration;

/// Uniform block read by every shader (`GLOBALS_WGSL`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: Mat4,
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub lighting: [f32; 4],
    pub viewport: [f32; 4],
}

impl Globals {
    /// Lighting comes from the live scene generation; without one the
    /// light terms stay zero.
    pub fn new(
        view_proj: Mat4,
        camera_pos: Vec3,
        scene: Option<&SceneGeneration>,
        resources: &SceneResources,
        viewport: [f32; 2],
        marker_size_px: f32,
    ) -> Self {
        let [cx, cy, cz] = camera_pos.to_f32();
        let mut globals = Self {
            view_proj,
            camera_pos: [cx, cy, cz, 1.0],
            light_dir: [1.0, 0.0, 0.0, 0.0],
            lighting: [0.0; 4],
            viewport: [viewport[0], viewport[1], marker_size_px, 0.0],
        };

        let Some(scene) = scene else {
            return globals;
        };
        let [lx, ly, lz] = scene.light_direction.to_f32();
        let directional = match resources.light(scene.lights.directional) {
            Some(Light::Directional { intensity, .. }) => *intensity,
            _ => 0.0,
        };
        globals.light_dir = [lx, ly, lz, directional];

        if let Some(Light::Ambient { intensity }) = resources.light(scene.lights.ambient) {
            globals.lighting[0] = *intensity;
        }
        if let Some(Material::Starfield { opacity, .. }) =
            scene.starfield.and_then(|s| resources.material(s.material))
        {
            globals.lighting[1] = *opacity;
        }
        if let Some(Material::DayNight(m)) = resources.material(scene.globe.material) {
            globals.lighting[2] = m.bump_scale;
        }
        globals
    }
}
