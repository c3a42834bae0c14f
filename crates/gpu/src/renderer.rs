use foundation::handles::Handle;
use foundation::math::{Mat4, Vec3, mat4_look_at_rh, mat4_mul, mat4_perspective_rh_z0};
use scene::resources::{Blend, Material, MeshRole, SceneResources, Side};
use scene::SceneGeneration;

use crate::mesh::MarkerInstance;
use crate::uniforms::Globals;

/// Globe space is left-handed on the surface (east is +z at lon 0), so the
/// image is mirrored horizontally after the view transform.
pub const SCREEN_FLIP_X: Mat4 = [
    [-1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_rad: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up: Vec3::new(0.0, 1.0, 0.0),
            fov_y_rad,
            near,
            far,
        }
    }

    pub fn view_proj(&self, aspect: f64) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        let view = mat4_look_at_rh(self.position, self.target, self.up);
        let proj = mat4_perspective_rh_z0(self.fov_y_rad, aspect, self.near, self.far);
        mat4_mul(proj, mat4_mul(SCREEN_FLIP_X, view))
    }
}

/// Which shader family draws a mesh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Pass {
    GlobeDayNight { terminator_exponent: f32 },
    GlobeFlat { color: [f32; 3] },
    Starfield,
    Atmosphere,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RenderCommand {
    Mesh {
        role: MeshRole,
        pass: Pass,
        mesh: Handle,
        material: Handle,
        radius: f64,
        side: Side,
        blend: Blend,
    },
    Markers {
        count: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub globals: Globals,
    pub commands: Vec<RenderCommand>,
}

pub struct Renderer;

impl Renderer {
    /// Draw list for one frame: starfield, globe, atmosphere, then markers.
    ///
    /// An invisible starfield (day mode) is skipped. Without a live scene
    /// only markers are drawn.
    pub fn collect(
        scene: Option<&SceneGeneration>,
        resources: &SceneResources,
        camera: &Camera3D,
        viewport: [f32; 2],
        marker_size_px: f32,
        markers: &[MarkerInstance],
    ) -> RenderFrame {
        let aspect = viewport[0] as f64 / viewport[1].max(1.0) as f64;
        let globals = Globals::new(
            camera.view_proj(aspect),
            camera.position,
            scene,
            resources,
            viewport,
            marker_size_px,
        );

        let mut commands = Vec::new();
        if let Some(scene) = scene {
            let mut meshes = vec![scene.globe.mesh, scene.atmosphere.mesh];
            if let Some(starfield) = scene.starfield {
                meshes.push(starfield.mesh);
            }
            for handle in meshes {
                let Some(mesh) = resources.mesh(handle) else {
                    continue;
                };
                let pass = match resources.material(mesh.material) {
                    Some(Material::DayNight(m)) => Pass::GlobeDayNight {
                        terminator_exponent: m.terminator_exponent,
                    },
                    Some(Material::Flat { color }) => Pass::GlobeFlat { color: *color },
                    Some(Material::Starfield { opacity, .. }) if *opacity > 0.0 => Pass::Starfield,
                    Some(Material::Atmosphere(_)) => Pass::Atmosphere,
                    _ => continue,
                };
                commands.push(RenderCommand::Mesh {
                    role: mesh.role,
                    pass,
                    mesh: handle,
                    material: mesh.material,
                    radius: mesh.radius,
                    side: mesh.side,
                    blend: mesh.blend,
                });
            }
            commands.sort_by_key(|c| match c {
                RenderCommand::Mesh { role, .. } => *role,
                RenderCommand::Markers { .. } => MeshRole::Atmosphere,
            });
        }
        if !markers.is_empty() {
            commands.push(RenderCommand::Markers {
                count: markers.len() as u32,
            });
        }

        RenderFrame { globals, commands }
    }
}
