use foundation::handles::Handle;

use crate::resources::{Blend, Material, Mesh, MeshRole, Resource, SceneResources, Side, TextureImage};

pub const DEFAULT_STARFIELD_RADIUS: f64 = 90.0;

/// Stars only show in night mode.
pub fn starfield_opacity(night_mode: bool) -> f32 {
    if night_mode { 1.0 } else { 0.0 }
}

/// Inward-facing sky sphere textured with the star map.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Starfield {
    pub texture: Handle,
    pub material: Handle,
    pub mesh: Handle,
}

impl Starfield {
    pub fn create(
        resources: &mut SceneResources,
        stars: TextureImage,
        radius: f64,
        night_mode: bool,
    ) -> Self {
        let texture = resources.insert(Resource::Texture(stars));
        let material = resources.insert(Resource::Material(Material::Starfield {
            texture,
            opacity: starfield_opacity(night_mode),
        }));
        let mesh = resources.insert(Resource::Mesh(Mesh {
            role: MeshRole::Starfield,
            radius,
            side: Side::Back,
            blend: Blend::Alpha,
            material,
        }));
        Self {
            texture,
            material,
            mesh,
        }
    }

    pub fn opacity(&self, resources: &SceneResources) -> Option<f32> {
        match resources.material(self.material)? {
            Material::Starfield { opacity, .. } => Some(*opacity),
            _ => None,
        }
    }

    /// Mesh first, then material, then texture.
    pub fn release(self, resources: &mut SceneResources) {
        resources.release(self.mesh);
        resources.release(self.material);
        resources.release(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::Starfield;
    use crate::resources::{ResourceKind, SceneResources, Side, TextureImage, TextureRole};

    #[test]
    fn opacity_follows_night_mode() {
        let mut res = SceneResources::new();
        let stars = TextureImage::solid(TextureRole::Stars, [255, 255, 255, 255]);
        let day = Starfield::create(&mut res, stars.clone(), 90.0, false);
        let night = Starfield::create(&mut res, stars, 90.0, true);
        assert_eq!(day.opacity(&res), Some(0.0));
        assert_eq!(night.opacity(&res), Some(1.0));
        assert_eq!(res.mesh(night.mesh).map(|m| m.side), Some(Side::Back));
    }

    #[test]
    fn release_drops_all_three_parts() {
        let mut res = SceneResources::new();
        let sf = Starfield::create(
            &mut res,
            TextureImage::solid(TextureRole::Stars, [0, 0, 0, 255]),
            50.0,
            true,
        );
        sf.release(&mut res);
        assert!(res.is_empty());
        assert_eq!(res.drain_released(), vec![sf.mesh, sf.material, sf.texture]);
        assert_eq!(res.live_count(ResourceKind::Mesh), 0);
    }
}
