use foundation::handles::Handle;
use foundation::math::Vec3;

use crate::lighting::ShadingProfile;
use crate::resources::{Blend, Material, Mesh, MeshRole, Resource, SceneResources, Side};

pub const GLOBE_RADIUS: f64 = 1.0;

/// Ocean blue used when the surface textures could not be loaded.
pub const FLAT_COLOR: [f32; 3] = [0.12, 0.34, 0.58];

/// Blends the night map into the day map across the terminator.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DayNightMaterial {
    pub day: Handle,
    pub night: Handle,
    pub bump: Handle,
    /// Unit vector toward the sun.
    pub light_direction: Vec3,
    pub terminator_exponent: f32,
    pub bump_scale: f32,
}

/// Textures of one generation's day/night material.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceTextures {
    pub day: Handle,
    pub bump: Handle,
    pub night: Handle,
}

/// Globe sphere plus its material for one generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlobeSurface {
    pub mesh: Handle,
    pub material: Handle,
    pub textures: Option<SurfaceTextures>,
}

impl GlobeSurface {
    pub fn day_night(
        resources: &mut SceneResources,
        textures: SurfaceTextures,
        light_direction: Vec3,
        profile: ShadingProfile,
        bump_scale: f32,
    ) -> Self {
        let material = resources.insert(Resource::Material(Material::DayNight(DayNightMaterial {
            day: textures.day,
            night: textures.night,
            bump: textures.bump,
            light_direction,
            terminator_exponent: profile.terminator_exponent,
            bump_scale,
        })));
        Self::with_material(resources, material, Some(textures))
    }

    pub fn flat(resources: &mut SceneResources) -> Self {
        let material = resources.insert(Resource::Material(Material::Flat { color: FLAT_COLOR }));
        Self::with_material(resources, material, None)
    }

    fn with_material(
        resources: &mut SceneResources,
        material: Handle,
        textures: Option<SurfaceTextures>,
    ) -> Self {
        let mesh = resources.insert(Resource::Mesh(Mesh {
            role: MeshRole::Globe,
            radius: GLOBE_RADIUS,
            side: Side::Front,
            blend: Blend::Opaque,
            material,
        }));
        Self {
            mesh,
            material,
            textures,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.textures.is_none()
    }

    pub fn release(self, resources: &mut SceneResources) {
        resources.release(self.mesh);
        resources.release(self.material);
        if let Some(t) = self.textures {
            resources.release(t.day);
            resources.release(t.bump);
            resources.release(t.night);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GlobeSurface;
    use crate::resources::{Material, SceneResources};

    #[test]
    fn flat_surface_has_no_textures() {
        let mut res = SceneResources::new();
        let globe = GlobeSurface::flat(&mut res);
        assert!(globe.is_flat());
        assert!(matches!(res.material(globe.material), Some(Material::Flat { .. })));
        globe.release(&mut res);
        assert!(res.is_empty());
    }
}
