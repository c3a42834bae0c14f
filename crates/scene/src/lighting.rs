use foundation::handles::Handle;
use foundation::math::{GeoPoint, Vec3};

use crate::resources::{Light, Resource, SceneResources};

/// Light levels and terminator sharpness for one display mode.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadingProfile {
    pub ambient: f32,
    pub directional: f32,
    /// Exponent applied to `clamp(dot(n, l), 0, 1)`. Lower is a softer
    /// terminator.
    pub terminator_exponent: f32,
}

impl ShadingProfile {
    pub const DAY: ShadingProfile = ShadingProfile {
        ambient: 0.4,
        directional: 1.2,
        terminator_exponent: 1.5,
    };

    pub const NIGHT: ShadingProfile = ShadingProfile {
        ambient: 0.1,
        directional: 0.6,
        terminator_exponent: 0.6,
    };
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadingProfiles {
    pub day: ShadingProfile,
    pub night: ShadingProfile,
}

impl Default for ShadingProfiles {
    fn default() -> Self {
        Self {
            day: ShadingProfile::DAY,
            night: ShadingProfile::NIGHT,
        }
    }
}

impl ShadingProfiles {
    pub fn for_mode(&self, night_mode: bool) -> ShadingProfile {
        if night_mode { self.night } else { self.day }
    }
}

/// Unit vector from the globe center toward the subsolar point.
pub fn light_direction(subsolar: GeoPoint) -> Vec3 {
    subsolar.to_unit_vector()
}

/// The ambient and directional light of one scene generation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LightingRig {
    pub ambient: Handle,
    pub directional: Handle,
}

impl LightingRig {
    pub fn create(
        resources: &mut SceneResources,
        profile: ShadingProfile,
        subsolar: GeoPoint,
        distance: f64,
    ) -> Self {
        let ambient = resources.insert(Resource::Light(Light::Ambient {
            intensity: profile.ambient,
        }));
        let directional = resources.insert(Resource::Light(Light::Directional {
            intensity: profile.directional,
            position: light_direction(subsolar).scale(distance),
        }));
        Self {
            ambient,
            directional,
        }
    }

    pub fn release(self, resources: &mut SceneResources) {
        resources.release(self.ambient);
        resources.release(self.directional);
    }
}

#[cfg(test)]
mod tests {
    use super::{LightingRig, ShadingProfile, ShadingProfiles};
    use crate::resources::{Light, ResourceKind, SceneResources};
    use foundation::math::GeoPoint;

    #[test]
    fn night_is_dimmer_and_softer() {
        let p = ShadingProfiles::default();
        assert!(p.night.ambient < p.day.ambient);
        assert!(p.night.directional < p.day.directional);
        assert!(p.night.terminator_exponent < p.day.terminator_exponent);
        assert_eq!(p.for_mode(true), ShadingProfile::NIGHT);
    }

    #[test]
    fn directional_light_sits_along_sun_direction() {
        let mut res = SceneResources::new();
        let rig = LightingRig::create(&mut res, ShadingProfile::DAY, GeoPoint::new(0.0, 90.0), 5.0);
        let Some(Light::Directional { position, intensity }) = res.light(rig.directional) else {
            panic!("missing directional light");
        };
        assert!(position.x.abs() < 1e-9);
        assert!((position.z - 5.0).abs() < 1e-9);
        assert_eq!(*intensity, ShadingProfile::DAY.directional);

        rig.release(&mut res);
        assert_eq!(res.live_count(ResourceKind::Light), 0);
    }
}
