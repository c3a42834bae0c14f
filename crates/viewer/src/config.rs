//! Viewer configuration, loaded from JSON handed over by the host page.
//!
//! Every section has defaults, so `{}` is a complete configuration.

use runtime::time_controller::TimeSettings;
use scene::atmosphere::{AtmosphereMaterial, AtmosphereSettings};
use scene::lighting::{ShadingProfile, ShadingProfiles};
use scene::SceneSettings;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: `{field}` {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a positive number, got {v}")))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be zero or more, got {v}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureUrls {
    pub day: String,
    pub bump: String,
    pub night: String,
    pub stars: String,
}

impl Default for TextureUrls {
    fn default() -> Self {
        Self {
            day: "textures/earth_day.jpg".to_string(),
            bump: "textures/earth_bump.jpg".to_string(),
            night: "textures/earth_night.jpg".to_string(),
            stars: "textures/stars.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub tick_interval_s: f64,
    pub scroll_step: f64,
    pub minutes_per_step: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        let s = TimeSettings::default();
        Self {
            tick_interval_s: s.tick_interval_s,
            scroll_step: s.scroll_step,
            minutes_per_step: s.minutes_per_step,
        }
    }
}

/// One shading profile. Fields left out of the JSON keep the default of the
/// profile being configured, not a shared default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileConfig {
    pub ambient: f32,
    pub directional: f32,
    pub terminator_exponent: f32,
}

impl From<ShadingProfile> for ProfileConfig {
    fn from(p: ShadingProfile) -> Self {
        Self {
            ambient: p.ambient,
            directional: p.directional,
            terminator_exponent: p.terminator_exponent,
        }
    }
}

impl From<ProfileConfig> for ShadingProfile {
    fn from(p: ProfileConfig) -> Self {
        Self {
            ambient: p.ambient,
            directional: p.directional,
            terminator_exponent: p.terminator_exponent,
        }
    }
}

impl ProfileConfig {
    fn patched(base: ShadingProfile, patch: ProfilePatch) -> Self {
        Self {
            ambient: patch.ambient.unwrap_or(base.ambient),
            directional: patch.directional.unwrap_or(base.directional),
            terminator_exponent: patch.terminator_exponent.unwrap_or(base.terminator_exponent),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfilePatch {
    ambient: Option<f32>,
    directional: Option<f32>,
    terminator_exponent: Option<f32>,
}

fn day_profile<'de, D: Deserializer<'de>>(d: D) -> Result<ProfileConfig, D::Error> {
    Ok(ProfileConfig::patched(ShadingProfile::DAY, ProfilePatch::deserialize(d)?))
}

fn night_profile<'de, D: Deserializer<'de>>(d: D) -> Result<ProfileConfig, D::Error> {
    Ok(ProfileConfig::patched(ShadingProfile::NIGHT, ProfilePatch::deserialize(d)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    #[serde(deserialize_with = "day_profile")]
    pub day: ProfileConfig,
    #[serde(deserialize_with = "night_profile")]
    pub night: ProfileConfig,
    pub bump_scale: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            day: ShadingProfile::DAY.into(),
            night: ShadingProfile::NIGHT.into(),
            bump_scale: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereConfig {
    pub scale: f64,
    pub c: f32,
    pub p: f32,
    pub color: [f32; 3],
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        let s = AtmosphereSettings::default();
        Self {
            scale: s.scale,
            c: s.material.c,
            p: s.material.p,
            color: s.material.color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub radius: f64,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            radius: scene::starfield::DEFAULT_STARFIELD_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    pub offset: [f64; 2],
    pub margin: f64,
    pub card: [f64; 2],
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            offset: [16.0, 16.0],
            margin: 12.0,
            card: [220.0, 96.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub night_toggle: String,
    pub reset: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            night_toggle: "n".to_string(),
            reset: "r".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// How many catalog cities are shown.
    pub limit: usize,
    pub pick_radius_px: f64,
    pub size_px: f32,
    /// Markers float this far above the surface (globe radii).
    pub altitude: f64,
    pub color: [f32; 3],
    pub highlight_color: [f32; 3],
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            limit: 24,
            pick_radius_px: 12.0,
            size_px: 5.0,
            altitude: 0.01,
            color: [1.0, 0.78, 0.3],
            highlight_color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance from the globe center, in globe radii.
    pub distance: f64,
    pub fov_y_deg: f64,
    /// Initial view center.
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub drag_deg_per_px: f64,
    pub max_pitch_deg: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 3.2,
            fov_y_deg: 45.0,
            lat_deg: 20.0,
            lon_deg: 0.0,
            drag_deg_per_px: 0.25,
            max_pitch_deg: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub textures: TextureUrls,
    pub time: TimeConfig,
    pub shading: ShadingConfig,
    pub atmosphere: AtmosphereConfig,
    pub starfield: StarfieldConfig,
    pub light_distance: f64,
    pub tooltip: TooltipConfig,
    pub keys: KeyBindings,
    pub markers: MarkerConfig,
    pub camera: CameraConfig,
    /// Viewports narrower than this show a static image instead.
    pub narrow_breakpoint_px: f64,
    pub log_filter: String,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            textures: TextureUrls::default(),
            time: TimeConfig::default(),
            shading: ShadingConfig::default(),
            atmosphere: AtmosphereConfig::default(),
            starfield: StarfieldConfig::default(),
            light_distance: 5.0,
            tooltip: TooltipConfig::default(),
            keys: KeyBindings::default(),
            markers: MarkerConfig::default(),
            camera: CameraConfig::default(),
            narrow_breakpoint_px: 768.0,
            log_filter: "info".to_string(),
        }
    }
}

impl GlobeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GlobeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("textures.day", &self.textures.day),
            ("textures.bump", &self.textures.bump),
            ("textures.night", &self.textures.night),
            ("textures.stars", &self.textures.stars),
        ] {
            if url.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        positive("time.tick_interval_s", self.time.tick_interval_s)?;
        positive("time.scroll_step", self.time.scroll_step)?;
        if !self.time.minutes_per_step.is_finite() {
            return Err(invalid("time.minutes_per_step", "must be finite"));
        }

        for (name, p) in [("shading.day", self.shading.day), ("shading.night", self.shading.night)] {
            non_negative(name, p.ambient as f64)?;
            non_negative(name, p.directional as f64)?;
            positive(name, p.terminator_exponent as f64)?;
        }
        non_negative("shading.bump_scale", self.shading.bump_scale as f64)?;

        if !(self.atmosphere.scale.is_finite() && self.atmosphere.scale > 1.0) {
            return Err(invalid("atmosphere.scale", "must be greater than 1"));
        }
        positive("atmosphere.p", self.atmosphere.p as f64)?;
        if !self.atmosphere.c.is_finite() {
            return Err(invalid("atmosphere.c", "must be finite"));
        }

        positive("light_distance", self.light_distance)?;

        positive("camera.distance", self.camera.distance)?;
        if self.camera.distance <= self.atmosphere.scale {
            return Err(invalid("camera.distance", "must be outside the atmosphere"));
        }
        if self.starfield.radius <= self.camera.distance {
            return Err(invalid("starfield.radius", "must enclose the camera"));
        }
        if !(self.camera.fov_y_deg > 0.0 && self.camera.fov_y_deg < 180.0) {
            return Err(invalid("camera.fov_y_deg", "must be between 0 and 180"));
        }
        positive("camera.drag_deg_per_px", self.camera.drag_deg_per_px)?;
        if !(0.0..90.0).contains(&self.camera.max_pitch_deg) {
            return Err(invalid("camera.max_pitch_deg", "must be in [0, 90)"));
        }

        non_negative("tooltip.margin", self.tooltip.margin)?;
        positive("tooltip.card", self.tooltip.card[0])?;
        positive("tooltip.card", self.tooltip.card[1])?;

        let toggle = self.keys.night_toggle.trim().to_lowercase();
        let reset = self.keys.reset.trim().to_lowercase();
        if toggle.is_empty() || reset.is_empty() {
            return Err(invalid("keys", "bindings must not be empty"));
        }
        if toggle == reset {
            return Err(invalid("keys", "night toggle and reset share a key"));
        }

        positive("markers.pick_radius_px", self.markers.pick_radius_px)?;
        positive("markers.size_px", self.markers.size_px as f64)?;
        non_negative("markers.altitude", self.markers.altitude)?;

        non_negative("narrow_breakpoint_px", self.narrow_breakpoint_px)?;
        Ok(())
    }

    pub fn time_settings(&self) -> TimeSettings {
        TimeSettings {
            tick_interval_s: self.time.tick_interval_s,
            scroll_step: self.time.scroll_step,
            minutes_per_step: self.time.minutes_per_step,
        }
    }

    pub fn scene_settings(&self) -> SceneSettings {
        SceneSettings {
            profiles: ShadingProfiles {
                day: self.shading.day.into(),
                night: self.shading.night.into(),
            },
            atmosphere: AtmosphereSettings {
                scale: self.atmosphere.scale,
                material: AtmosphereMaterial {
                    color: self.atmosphere.color,
                    c: self.atmosphere.c,
                    p: self.atmosphere.p,
                },
            },
            starfield_radius: self.starfield.radius,
            light_distance: self.light_distance,
            bump_scale: self.shading.bump_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GlobeConfig, ProfileConfig};
    use pretty_assertions::assert_eq;
    use runtime::time_controller::TimeSettings;
    use scene::SceneSettings;
    use scene::lighting::ShadingProfile;

    #[test]
    fn empty_object_is_default() {
        let config = GlobeConfig::from_json("{}").unwrap();
        assert_eq!(config, GlobeConfig::default());
        assert_eq!(config.time_settings(), TimeSettings::default());
        assert_eq!(config.scene_settings(), SceneSettings::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GlobeConfig::from_json(
            r#"{"time": {"minutes_per_step": 30}, "keys": {"reset": "Escape"}, "log_filter": "debug"}"#,
        )
        .unwrap();
        assert_eq!(config.time.minutes_per_step, 30.0);
        assert_eq!(config.time.scroll_step, 100.0);
        assert_eq!(config.keys.reset, "Escape");
        assert_eq!(config.keys.night_toggle, "n");
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(GlobeConfig::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            GlobeConfig::from_json(r#"{"time": {"tick_interval_s": "soon"}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_bad_values() {
        for json in [
            r#"{"time": {"tick_interval_s": 0}}"#,
            r#"{"time": {"scroll_step": -100}}"#,
            r#"{"shading": {"night": {"terminator_exponent": 0}}}"#,
            r#"{"atmosphere": {"scale": 0.9}}"#,
            r#"{"keys": {"night_toggle": "R", "reset": "r"}}"#,
            r#"{"keys": {"reset": " "}}"#,
            r#"{"camera": {"distance": 1.05}}"#,
            r#"{"starfield": {"radius": 2}}"#,
            r#"{"tooltip": {"card": [0, 10]}}"#,
            r#"{"textures": {"day": ""}}"#,
        ] {
            assert!(
                matches!(GlobeConfig::from_json(json), Err(ConfigError::Invalid { .. })),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn partial_profile_keeps_its_own_defaults() {
        let config = GlobeConfig::from_json(r#"{"shading": {"night": {"ambient": 0.05}}}"#).unwrap();
        let profiles = config.scene_settings().profiles;
        assert_eq!(profiles.night.ambient, 0.05);
        assert_eq!(profiles.night.directional, ShadingProfile::NIGHT.directional);
        assert_eq!(profiles.night.terminator_exponent, ShadingProfile::NIGHT.terminator_exponent);
        assert_eq!(profiles.day, ShadingProfile::DAY);

        let config = GlobeConfig::from_json(r#"{"shading": {"day": {"terminator_exponent": 3}}}"#).unwrap();
        assert_eq!(config.shading.day.ambient, ShadingProfile::DAY.ambient);
        assert_eq!(config.shading.day.terminator_exponent, 3.0);
        assert_eq!(config.shading.night, ProfileConfig::from(ShadingProfile::NIGHT));
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = GlobeConfig::default();
        config.shading.night.ambient = 0.05;
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(GlobeConfig::from_json(&json).unwrap(), config);
    }
}
