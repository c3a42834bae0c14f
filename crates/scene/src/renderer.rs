//! Owns the globe's scene resources and rebuilds them when the sun moves or
//! night mode flips.
//!
//! A rebuild is split in two. `request_rebuild` hands out a ticket while the
//! host loads textures; `complete_rebuild` applies the result. Only the most
//! recent ticket may touch the live scene. Anything that arrives for an older
//! ticket is dropped on the spot, so a slow load can never overwrite a newer
//! scene.

use foundation::math::{GeoPoint, Vec3};
use tracing::{debug, error, info};

use crate::atmosphere::{AtmosphereSettings, AtmosphereShell};
use crate::error::TextureError;
use crate::globe::{GLOBE_RADIUS, GlobeSurface, SurfaceTextures};
use crate::lighting::{LightingRig, ShadingProfile, ShadingProfiles, light_direction};
use crate::resources::{Resource, SceneResources, TextureImage, TextureRole};
use crate::starfield::{DEFAULT_STARFIELD_RADIUS, Starfield};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneSettings {
    pub profiles: ShadingProfiles,
    pub atmosphere: AtmosphereSettings,
    pub starfield_radius: f64,
    /// Distance of the directional light from the globe center.
    pub light_distance: f64,
    pub bump_scale: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            profiles: ShadingProfiles::default(),
            atmosphere: AtmosphereSettings::default(),
            starfield_radius: DEFAULT_STARFIELD_RADIUS,
            light_distance: 5.0,
            bump_scale: 0.05,
        }
    }
}

/// Orbit controls exposed to the host. Zoom stays off because the wheel
/// drives time travel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ViewportControls {
    pub rotate_enabled: bool,
    pub zoom_enabled: bool,
}

impl Default for ViewportControls {
    fn default() -> Self {
        Self {
            rotate_enabled: true,
            zoom_enabled: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RebuildTicket(u64);

impl RebuildTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// The four images a rebuild needs, decoded.
#[derive(Debug, Clone)]
pub struct LoadedTextures {
    pub day: TextureImage,
    pub bump: TextureImage,
    pub night: TextureImage,
    pub stars: TextureImage,
}

impl LoadedTextures {
    pub fn get(&self, role: TextureRole) -> &TextureImage {
        match role {
            TextureRole::Day => &self.day,
            TextureRole::Bump => &self.bump,
            TextureRole::Night => &self.night,
            TextureRole::Stars => &self.stars,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Applied { generation: u64 },
    /// Textures failed; the globe is drawn with a flat material.
    Fallback { generation: u64 },
    /// A newer request superseded this one; its textures were discarded.
    Stale { generation: u64, latest: u64, discarded: usize },
    Unmounted,
}

/// Everything the live scene is made of, by handle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneGeneration {
    pub generation: u64,
    pub subsolar: GeoPoint,
    pub night_mode: bool,
    pub light_direction: Vec3,
    pub profile: ShadingProfile,
    pub lights: LightingRig,
    pub globe: GlobeSurface,
    pub starfield: Option<Starfield>,
    pub atmosphere: AtmosphereShell,
}

impl SceneGeneration {
    fn release(self, resources: &mut SceneResources) {
        self.lights.release(resources);
        if let Some(starfield) = self.starfield {
            starfield.release(resources);
        }
        self.globe.release(resources);
        self.atmosphere.release(resources);
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct PendingRebuild {
    ticket: RebuildTicket,
    subsolar: GeoPoint,
    night_mode: bool,
}

#[derive(Debug)]
pub struct SceneRenderer {
    settings: SceneSettings,
    controls: ViewportControls,
    resources: SceneResources,
    latest: u64,
    pending: Option<PendingRebuild>,
    live: Option<SceneGeneration>,
    mounted: bool,
}

impl SceneRenderer {
    pub fn new(settings: SceneSettings) -> Self {
        Self {
            settings,
            controls: ViewportControls::default(),
            resources: SceneResources::new(),
            latest: 0,
            pending: None,
            live: None,
            mounted: true,
        }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn controls(&self) -> ViewportControls {
        self.controls
    }

    pub fn resources(&self) -> &SceneResources {
        &self.resources
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn live(&self) -> Option<&SceneGeneration> {
        self.live.as_ref()
    }

    /// Inputs of the newest request, applied or not.
    pub fn latest_inputs(&self) -> Option<(GeoPoint, bool)> {
        match (self.pending, self.live) {
            (Some(p), _) => Some((p.subsolar, p.night_mode)),
            (None, Some(g)) => Some((g.subsolar, g.night_mode)),
            (None, None) => None,
        }
    }

    pub fn is_current(&self, ticket: RebuildTicket) -> bool {
        self.pending.is_some_and(|p| p.ticket == ticket)
    }

    /// Starts a rebuild. Supersedes any request still waiting on textures.
    pub fn request_rebuild(&mut self, subsolar: GeoPoint, night_mode: bool) -> Option<RebuildTicket> {
        if !self.mounted {
            return None;
        }
        self.latest += 1;
        let ticket = RebuildTicket(self.latest);
        if let Some(old) = self.pending.replace(PendingRebuild {
            ticket,
            subsolar,
            night_mode,
        }) {
            debug!(
                superseded = old.ticket.generation(),
                generation = ticket.generation(),
                "rebuild superseded"
            );
        }
        Some(ticket)
    }

    pub fn complete_rebuild(
        &mut self,
        ticket: RebuildTicket,
        result: Result<LoadedTextures, TextureError>,
    ) -> RebuildOutcome {
        if !self.mounted {
            debug!(generation = ticket.generation(), "texture load finished after unmount");
            return RebuildOutcome::Unmounted;
        }
        let Some(pending) = self.pending.filter(|p| p.ticket == ticket) else {
            let discarded = if result.is_ok() { TextureRole::ALL.len() } else { 0 };
            debug!(
                generation = ticket.generation(),
                latest = self.latest,
                discarded,
                "stale texture load discarded"
            );
            return RebuildOutcome::Stale {
                generation: ticket.generation(),
                latest: self.latest,
                discarded,
            };
        };
        self.pending = None;

        if let Some(old) = self.live.take() {
            old.release(&mut self.resources);
        }

        let profile = self.settings.profiles.for_mode(pending.night_mode);
        let direction = light_direction(pending.subsolar);
        let lights = LightingRig::create(
            &mut self.resources,
            profile,
            pending.subsolar,
            self.settings.light_distance,
        );

        let (globe, starfield, outcome) = match result {
            Ok(textures) => {
                let surface = SurfaceTextures {
                    day: self.resources.insert(Resource::Texture(textures.day)),
                    bump: self.resources.insert(Resource::Texture(textures.bump)),
                    night: self.resources.insert(Resource::Texture(textures.night)),
                };
                let globe = GlobeSurface::day_night(
                    &mut self.resources,
                    surface,
                    direction,
                    profile,
                    self.settings.bump_scale,
                );
                let starfield = Starfield::create(
                    &mut self.resources,
                    textures.stars,
                    self.settings.starfield_radius,
                    pending.night_mode,
                );
                let outcome = RebuildOutcome::Applied {
                    generation: ticket.generation(),
                };
                (globe, Some(starfield), outcome)
            }
            Err(err) => {
                error!(%err, generation = ticket.generation(), "texture load failed, using flat globe");
                let outcome = RebuildOutcome::Fallback {
                    generation: ticket.generation(),
                };
                (GlobeSurface::flat(&mut self.resources), None, outcome)
            }
        };

        let atmosphere = AtmosphereShell::create(&mut self.resources, self.settings.atmosphere, GLOBE_RADIUS);

        self.live = Some(SceneGeneration {
            generation: ticket.generation(),
            subsolar: pending.subsolar,
            night_mode: pending.night_mode,
            light_direction: direction,
            profile,
            lights,
            globe,
            starfield,
            atmosphere,
        });
        info!(
            generation = ticket.generation(),
            night_mode = pending.night_mode,
            lat = pending.subsolar.lat,
            lon = pending.subsolar.lon,
            flat = globe.is_flat(),
            "scene rebuilt"
        );
        outcome
    }

    /// Handles released since the last call, for the GPU backend.
    pub fn drain_released(&mut self) -> Vec<foundation::handles::Handle> {
        self.resources.drain_released()
    }

    /// Disposes every resource. Later requests and completions are ignored.
    pub fn unmount(&mut self) -> usize {
        if !self.mounted {
            return 0;
        }
        self.mounted = false;
        self.pending = None;
        let released = self.resources.len();
        if let Some(live) = self.live.take() {
            live.release(&mut self.resources);
        }
        let leftover = self.resources.release_all();
        info!(released, leftover, "scene unmounted");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadedTextures, RebuildOutcome, SceneRenderer, SceneSettings};
    use crate::error::TextureError;
    use crate::lighting::ShadingProfile;
    use crate::resources::{Light, Material, ResourceKind, TextureImage, TextureRole};
    use foundation::math::GeoPoint;
    use pretty_assertions::assert_eq;

    fn textures() -> LoadedTextures {
        LoadedTextures {
            day: TextureImage::solid(TextureRole::Day, [0, 80, 200, 255]),
            bump: TextureImage::solid(TextureRole::Bump, [128, 128, 128, 255]),
            night: TextureImage::solid(TextureRole::Night, [10, 10, 0, 255]),
            stars: TextureImage::solid(TextureRole::Stars, [255, 255, 255, 255]),
        }
    }

    fn counts(r: &SceneRenderer) -> [usize; 4] {
        let res = r.resources();
        [
            res.live_count(ResourceKind::Texture),
            res.live_count(ResourceKind::Material),
            res.live_count(ResourceKind::Light),
            res.live_count(ResourceKind::Mesh),
        ]
    }

    fn fetch_error() -> TextureError {
        TextureError::Fetch {
            url: "day.jpg".into(),
            reason: "404".into(),
        }
    }

    #[test]
    fn nothing_exists_before_textures_arrive() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let ticket = r.request_rebuild(GeoPoint::new(23.44, 0.0), false).unwrap();
        assert!(r.resources().is_empty());
        assert!(r.is_current(ticket));
        assert_eq!(
            r.complete_rebuild(ticket, Ok(textures())),
            RebuildOutcome::Applied { generation: 1 }
        );
        // textures: day, bump, night, stars; materials: globe, stars, atmosphere
        assert_eq!(counts(&r), [4, 3, 2, 3]);
    }

    #[test]
    fn rebuilds_replace_previous_generation() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let t1 = r.request_rebuild(GeoPoint::new(0.0, 0.0), false).unwrap();
        r.complete_rebuild(t1, Ok(textures()));
        let old = *r.live().unwrap();
        r.drain_released();

        for step in 1..=5 {
            let t = r.request_rebuild(GeoPoint::new(0.0, -15.0 * step as f64), step % 2 == 0).unwrap();
            r.complete_rebuild(t, Ok(textures()));
            assert_eq!(counts(&r), [4, 3, 2, 3]);
        }

        let released = r.drain_released();
        assert!(released.contains(&old.lights.ambient));
        assert!(released.contains(&old.lights.directional));
        assert!(released.contains(&old.starfield.unwrap().mesh));
        assert!(released.contains(&old.globe.material));
        assert!(r.resources().get(old.lights.ambient).is_none());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let first = r.request_rebuild(GeoPoint::new(0.0, 0.0), false).unwrap();
        let second = r.request_rebuild(GeoPoint::new(0.0, 10.0), true).unwrap();
        assert!(!r.is_current(first));

        assert_eq!(
            r.complete_rebuild(first, Ok(textures())),
            RebuildOutcome::Stale {
                generation: 1,
                latest: 2,
                discarded: 4
            }
        );
        assert!(r.resources().is_empty());

        r.complete_rebuild(second, Ok(textures()));
        let before = counts(&r);
        let live = *r.live().unwrap();
        assert!(matches!(
            r.complete_rebuild(first, Ok(textures())),
            RebuildOutcome::Stale { .. }
        ));
        assert!(matches!(
            r.complete_rebuild(second, Ok(textures())),
            RebuildOutcome::Stale { .. }
        ));
        assert_eq!(counts(&r), before);
        assert_eq!(r.live(), Some(&live));
        assert!(live.night_mode);
    }

    #[test]
    fn texture_failure_falls_back_to_flat_globe() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let t = r.request_rebuild(GeoPoint::new(0.0, 0.0), true).unwrap();
        assert_eq!(
            r.complete_rebuild(t, Err(fetch_error())),
            RebuildOutcome::Fallback { generation: 1 }
        );
        let live = r.live().unwrap();
        assert!(live.globe.is_flat());
        assert!(live.starfield.is_none());
        assert!(matches!(
            r.resources().material(live.globe.material),
            Some(Material::Flat { .. })
        ));
        // globe + atmosphere meshes, both lights, no textures
        assert_eq!(counts(&r), [0, 2, 2, 2]);
    }

    #[test]
    fn stale_failure_discards_nothing() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let a = r.request_rebuild(GeoPoint::new(0.0, 0.0), false).unwrap();
        r.request_rebuild(GeoPoint::new(0.0, 0.0), true).unwrap();
        assert_eq!(
            r.complete_rebuild(a, Err(fetch_error())),
            RebuildOutcome::Stale {
                generation: 1,
                latest: 2,
                discarded: 0
            }
        );
        assert!(r.live().is_none());
    }

    #[test]
    fn night_toggle_flips_stars_and_lights() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let p = GeoPoint::new(10.0, 20.0);
        for (night, opacity, profile) in [
            (true, 1.0, ShadingProfile::NIGHT),
            (false, 0.0, ShadingProfile::DAY),
            (true, 1.0, ShadingProfile::NIGHT),
        ] {
            let t = r.request_rebuild(p, night).unwrap();
            r.complete_rebuild(t, Ok(textures()));
            let live = *r.live().unwrap();
            assert_eq!(live.starfield.unwrap().opacity(r.resources()), Some(opacity));
            assert_eq!(
                r.resources().light(live.lights.ambient),
                Some(&Light::Ambient {
                    intensity: profile.ambient
                })
            );
            let Some(Light::Directional { intensity, .. }) = r.resources().light(live.lights.directional)
            else {
                panic!("missing directional light");
            };
            assert_eq!(*intensity, profile.directional);
            let Some(Material::DayNight(m)) = r.resources().material(live.globe.material) else {
                panic!("missing globe material");
            };
            assert_eq!(m.terminator_exponent, profile.terminator_exponent);
        }
    }

    #[test]
    fn unmount_disposes_everything_and_ignores_late_loads() {
        let mut r = SceneRenderer::new(SceneSettings::default());
        let t = r.request_rebuild(GeoPoint::new(0.0, 0.0), false).unwrap();
        r.complete_rebuild(t, Ok(textures()));
        let pending = r.request_rebuild(GeoPoint::new(0.0, 1.0), false).unwrap();

        assert_eq!(r.unmount(), 12);
        assert!(r.resources().is_empty());
        assert_eq!(r.complete_rebuild(pending, Ok(textures())), RebuildOutcome::Unmounted);
        assert!(r.request_rebuild(GeoPoint::new(0.0, 0.0), false).is_none());
        assert_eq!(r.unmount(), 0);
    }

    #[test]
    fn zoom_is_disabled() {
        let r = SceneRenderer::new(SceneSettings::default());
        assert!(!r.controls().zoom_enabled);
        assert!(r.controls().rotate_enabled);
    }
}
