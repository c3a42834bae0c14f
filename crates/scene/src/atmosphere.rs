use foundation::handles::Handle;

use crate::resources::{Blend, Material, Mesh, MeshRole, Resource, SceneResources, Side};

/// Rim glow `color * (c - dot(normal, view_axis))^p`, blended additively.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtmosphereMaterial {
    pub color: [f32; 3],
    pub c: f32,
    pub p: f32,
}

impl Default for AtmosphereMaterial {
    fn default() -> Self {
        Self {
            color: [0.3, 0.6, 1.0],
            c: 0.7,
            p: 2.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AtmosphereSettings {
    /// Shell radius relative to the globe.
    pub scale: f64,
    pub material: AtmosphereMaterial,
}

impl Default for AtmosphereSettings {
    fn default() -> Self {
        Self {
            scale: 1.1,
            material: AtmosphereMaterial::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtmosphereShell {
    pub material: Handle,
    pub mesh: Handle,
}

impl AtmosphereShell {
    pub fn create(resources: &mut SceneResources, settings: AtmosphereSettings, globe_radius: f64) -> Self {
        let material = resources.insert(Resource::Material(Material::Atmosphere(settings.material)));
        let mesh = resources.insert(Resource::Mesh(Mesh {
            role: MeshRole::Atmosphere,
            radius: globe_radius * settings.scale,
            side: Side::Back,
            blend: Blend::Additive,
            material,
        }));
        Self { material, mesh }
    }

    pub fn release(self, resources: &mut SceneResources) {
        resources.release(self.mesh);
        resources.release(self.material);
    }
}

#[cfg(test)]
mod tests {
    use super::{AtmosphereSettings, AtmosphereShell};
    use crate::resources::{Blend, SceneResources};

    #[test]
    fn shell_is_additive_and_scaled() {
        let mut res = SceneResources::new();
        let shell = AtmosphereShell::create(&mut res, AtmosphereSettings::default(), 2.0);
        let mesh = res.mesh(shell.mesh).copied().unwrap();
        assert_eq!(mesh.blend, Blend::Additive);
        assert!((mesh.radius - 2.2).abs() < 1e-12);
        shell.release(&mut res);
        assert!(res.is_empty());
    }
}
