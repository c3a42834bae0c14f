//! WGSL sources built from templates with typed numeric parameters.
//!
//! Placeholders are written `{{NAME}}`. Rendering fails unless every
//! placeholder receives exactly one value and every value has a placeholder.

use std::collections::BTreeSet;

use scene::atmosphere::AtmosphereMaterial;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("{shader}: placeholder `{name}` has no value")]
    Unbound { shader: String, name: String },

    #[error("{shader}: no placeholder named `{name}`")]
    Unknown { shader: String, name: String },

    #[error("{shader}: `{name}` bound more than once")]
    Duplicate { shader: String, name: String },

    #[error("{shader}: `{name}` is not finite")]
    NonFinite { shader: String, name: String },

    #[error("{shader}: unterminated placeholder at byte {offset}")]
    Unterminated { shader: String, offset: usize },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ShaderValue {
    F32(f32),
    U32(u32),
    Vec3([f32; 3]),
}

impl ShaderValue {
    fn is_finite(&self) -> bool {
        match self {
            ShaderValue::F32(v) => v.is_finite(),
            ShaderValue::U32(_) => true,
            ShaderValue::Vec3(v) => v.iter().all(|c| c.is_finite()),
        }
    }

    pub fn to_wgsl(&self) -> String {
        match self {
            ShaderValue::F32(v) => wgsl_float(*v),
            ShaderValue::U32(v) => format!("{v}u"),
            ShaderValue::Vec3([x, y, z]) => format!(
                "vec3<f32>({}, {}, {})",
                wgsl_float(*x),
                wgsl_float(*y),
                wgsl_float(*z)
            ),
        }
    }
}

/// `f32` as a WGSL float literal. Integral values keep a `.0` so they are
/// not parsed as integers.
pub fn wgsl_float(v: f32) -> String {
    let s = format!("{v}");
    if s.contains('.') { s } else { format!("{s}.0") }
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderTemplate {
    name: String,
    pieces: Vec<Piece>,
}

impl ShaderTemplate {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, ShaderError> {
        let name = name.into();
        let mut pieces = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                return Err(ShaderError::Unterminated {
                    shader: name,
                    offset: offset + start,
                });
            };
            if start > 0 {
                pieces.push(Piece::Text(rest[..start].to_string()));
            }
            let slot = rest[start + 2..start + 2 + len].trim().to_string();
            pieces.push(Piece::Slot(slot));
            let consumed = start + 2 + len + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest.to_string()));
        }
        Ok(Self { name, pieces })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distinct placeholder names, sorted.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Slot(s) => Some(s.as_str()),
                Piece::Text(_) => None,
            })
            .collect()
    }

    pub fn render(&self, params: &[(&str, ShaderValue)]) -> Result<String, ShaderError> {
        let placeholders = self.placeholders();
        let mut seen = BTreeSet::new();
        for (name, value) in params {
            let err_name = || (self.name.clone(), name.to_string());
            if !placeholders.contains(name) {
                let (shader, name) = err_name();
                return Err(ShaderError::Unknown { shader, name });
            }
            if !seen.insert(*name) {
                let (shader, name) = err_name();
                return Err(ShaderError::Duplicate { shader, name });
            }
            if !value.is_finite() {
                let (shader, name) = err_name();
                return Err(ShaderError::NonFinite { shader, name });
            }
        }
        if let Some(missing) = placeholders.iter().find(|p| !seen.contains(*p)) {
            return Err(ShaderError::Unbound {
                shader: self.name.clone(),
                name: missing.to_string(),
            });
        }

        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Slot(s) => {
                    if let Some((_, v)) = params.iter().find(|(n, _)| *n == s.as_str()) {
                        out.push_str(&v.to_wgsl());
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Uniform block shared by every pipeline; mirrors `uniforms::Globals`.
pub const GLOBALS_WGSL: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    // xyz: unit vector toward the sun, w: directional intensity
    light_dir: vec4<f32>,
    // x: ambient, y: starfield opacity, z: bump scale
    lighting: vec4<f32>,
    // x, y: viewport px, z: marker size px
    viewport: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

const SURFACE_VS: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VsOut {
    return VsOut(globals.view_proj * vec4<f32>(position, 1.0), normal, uv);
}
"#;

const GLOBE_DAY_NIGHT_FS: &str = r#"
@group(1) @binding(0) var day_tex: texture_2d<f32>;
@group(1) @binding(1) var night_tex: texture_2d<f32>;
@group(1) @binding(2) var bump_tex: texture_2d<f32>;
@group(1) @binding(3) var surface_sampler: sampler;

const TERMINATOR_EXPONENT: f32 = {{TERMINATOR_EXPONENT}};

fn bumped_normal(n: vec3<f32>, uv: vec2<f32>) -> vec3<f32> {
    let texel = 1.0 / vec2<f32>(textureDimensions(bump_tex));
    let h = textureSample(bump_tex, surface_sampler, uv).r;
    let hx = textureSample(bump_tex, surface_sampler, uv + vec2<f32>(texel.x, 0.0)).r;
    let hy = textureSample(bump_tex, surface_sampler, uv + vec2<f32>(0.0, texel.y)).r;
    let raw_east = cross(n, vec3<f32>(0.0, 1.0, 0.0));
    let east = select(vec3<f32>(1.0, 0.0, 0.0), normalize(raw_east), length(raw_east) > 1e-4);
    let north = cross(east, n);
    let scale = globals.lighting.z;
    return normalize(n - scale * ((hx - h) * east - (hy - h) * north));
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let n = bumped_normal(normalize(in.normal), in.uv);
    let l = normalize(globals.light_dir.xyz);
    let intensity = pow(clamp(dot(n, l), 0.0, 1.0), TERMINATOR_EXPONENT);
    let lit = globals.lighting.x + globals.light_dir.w * intensity;
    let day = textureSample(day_tex, surface_sampler, in.uv).rgb * lit;
    let night = textureSample(night_tex, surface_sampler, in.uv).rgb;
    return vec4<f32>(mix(night, day, intensity), 1.0);
}
"#;

const GLOBE_FLAT_FS: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>({{COLOR}}, 1.0);
}
"#;

const STARFIELD_FS: &str = r#"
@group(1) @binding(0) var stars_tex: texture_2d<f32>;
@group(1) @binding(1) var stars_sampler: sampler;

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let c = textureSample(stars_tex, stars_sampler, in.uv).rgb;
    return vec4<f32>(c, globals.lighting.y);
}
"#;

const ATMOSPHERE_FS: &str = r#"
const GLOW_C: f32 = {{GLOW_C}};
const GLOW_P: f32 = {{GLOW_P}};

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let view_axis = normalize(globals.camera_pos.xyz);
    let base = max(GLOW_C - dot(normalize(in.normal), view_axis), 0.0);
    let intensity = pow(base, GLOW_P);
    return vec4<f32>({{COLOR}} * intensity, intensity);
}
"#;

const MARKERS_WGSL: &str = r#"
struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) highlight: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vid: u32,
    @location(0) position: vec3<f32>,
    @location(1) highlight: f32,
) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, -1.0), vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, 1.0), vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vid];
    let clip = globals.view_proj * vec4<f32>(position, 1.0);
    let size = globals.viewport.z * (1.0 + 0.5 * highlight);
    let offset = corner * size / globals.viewport.xy * clip.w;
    return VsOut(vec4<f32>(clip.xy + offset, clip.zw), corner, highlight);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let r = length(in.corner);
    if r > 1.0 {
        discard;
    }
    let color = mix({{COLOR}}, {{HIGHLIGHT_COLOR}}, in.highlight);
    return vec4<f32>(color, 1.0 - smoothstep(0.8, 1.0, r));
}
"#;

fn surface_template(name: &str, fragment: &str) -> Result<ShaderTemplate, ShaderError> {
    ShaderTemplate::parse(name, &format!("{GLOBALS_WGSL}{SURFACE_VS}{fragment}"))
}

pub fn globe_day_night_source(terminator_exponent: f32) -> Result<String, ShaderError> {
    surface_template("globe_day_night", GLOBE_DAY_NIGHT_FS)?
        .render(&[("TERMINATOR_EXPONENT", ShaderValue::F32(terminator_exponent))])
}

pub fn globe_flat_source(color: [f32; 3]) -> Result<String, ShaderError> {
    surface_template("globe_flat", GLOBE_FLAT_FS)?.render(&[("COLOR", ShaderValue::Vec3(color))])
}

pub fn starfield_source() -> Result<String, ShaderError> {
    surface_template("starfield", STARFIELD_FS)?.render(&[])
}

pub fn atmosphere_source(material: &AtmosphereMaterial) -> Result<String, ShaderError> {
    surface_template("atmosphere", ATMOSPHERE_FS)?.render(&[
        ("GLOW_C", ShaderValue::F32(material.c)),
        ("GLOW_P", ShaderValue::F32(material.p)),
        ("COLOR", ShaderValue::Vec3(material.color)),
    ])
}

pub fn markers_source(color: [f32; 3], highlight_color: [f32; 3]) -> Result<String, ShaderError> {
    ShaderTemplate::parse("markers", &format!("{GLOBALS_WGSL}{MARKERS_WGSL}"))?.render(&[
        ("COLOR", ShaderValue::Vec3(color)),
        ("HIGHLIGHT_COLOR", ShaderValue::Vec3(highlight_color)),
    ])
}
