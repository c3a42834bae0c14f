//! GPU-facing objects owned by the scene renderer.
//!
//! Everything lives in one generational arena. Releasing a handle removes the
//! object and queues the handle so the GPU backend can drop whatever it
//! created for it.

use std::fmt;
use std::rc::Rc;

use foundation::arena::Arena;
use foundation::handles::Handle;
use foundation::math::Vec3;
use tracing::trace;

use crate::atmosphere::AtmosphereMaterial;
use crate::error::TextureError;
use crate::globe::DayNightMaterial;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureRole {
    Day,
    Bump,
    Night,
    Stars,
}

impl TextureRole {
    pub const ALL: [TextureRole; 4] = [
        TextureRole::Day,
        TextureRole::Bump,
        TextureRole::Night,
        TextureRole::Stars,
    ];
}

/// Decoded RGBA8 image. Clones share the pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct TextureImage {
    role: TextureRole,
    width: u32,
    height: u32,
    pixels: Rc<[u8]>,
}

impl TextureImage {
    pub fn from_rgba8(
        role: TextureRole,
        width: u32,
        height: u32,
        pixels: impl Into<Rc<[u8]>>,
    ) -> Result<Self, TextureError> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected || expected == 0 {
            return Err(TextureError::Size {
                role,
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            role,
            width,
            height,
            pixels,
        })
    }

    /// 1x1 image of a single color.
    pub fn solid(role: TextureRole, rgba: [u8; 4]) -> Self {
        Self {
            role,
            width: 1,
            height: 1,
            pixels: Rc::from(rgba.as_slice()),
        }
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Identity of the shared pixel buffer, for upload caches.
    pub fn pixel_key(&self) -> usize {
        Rc::as_ptr(&self.pixels) as *const u8 as usize
    }
}

impl fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureImage")
            .field("role", &self.role)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient { intensity: f32 },
    /// Positioned along the sun direction, pointing at the globe center.
    Directional { intensity: f32, position: Vec3 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Material {
    DayNight(DayNightMaterial),
    /// Unlit fallback used when textures are unavailable.
    Flat { color: [f32; 3] },
    Starfield { texture: Handle, opacity: f32 },
    Atmosphere(AtmosphereMaterial),
}

/// Which faces of a mesh are drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Blend {
    Opaque,
    Alpha,
    Additive,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshRole {
    Starfield,
    Globe,
    Atmosphere,
}

/// A sphere centered at the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mesh {
    pub role: MeshRole,
    pub radius: f64,
    pub side: Side,
    pub blend: Blend,
    pub material: Handle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Texture(TextureImage),
    Material(Material),
    Light(Light),
    Mesh(Mesh),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Material,
    Light,
    Mesh,
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Texture(_) => ResourceKind::Texture,
            Resource::Material(_) => ResourceKind::Material,
            Resource::Light(_) => ResourceKind::Light,
            Resource::Mesh(_) => ResourceKind::Mesh,
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneResources {
    arena: Arena<Resource>,
    released: Vec<Handle>,
}

impl SceneResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) -> Handle {
        let kind = resource.kind();
        let handle = self.arena.alloc(resource);
        trace!(?kind, ?handle, "scene resource created");
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&Resource> {
        self.arena.get(handle)
    }

    pub fn texture(&self, handle: Handle) -> Option<&TextureImage> {
        match self.get(handle)? {
            Resource::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn material(&self, handle: Handle) -> Option<&Material> {
        match self.get(handle)? {
            Resource::Material(m) => Some(m),
            _ => None,
        }
    }

    pub fn light(&self, handle: Handle) -> Option<&Light> {
        match self.get(handle)? {
            Resource::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn mesh(&self, handle: Handle) -> Option<&Mesh> {
        match self.get(handle)? {
            Resource::Mesh(m) => Some(m),
            _ => None,
        }
    }

    /// Removes `handle`; `false` if it was already gone.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(resource) = self.arena.remove(handle) else {
            return false;
        };
        trace!(kind = ?resource.kind(), ?handle, "scene resource released");
        self.released.push(handle);
        true
    }

    pub fn release_all(&mut self) -> usize {
        let handles: Vec<Handle> = self.arena.iter().map(|(h, _)| h).collect();
        handles.into_iter().filter(|h| self.release(*h)).count()
    }

    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.arena.iter().filter(|(_, r)| r.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Resource)> {
        self.arena.iter()
    }

    /// Handles released since the last call, in release order.
    pub fn drain_released(&mut self) -> Vec<Handle> {
        std::mem::take(&mut self.released)
    }
}

#[cfg(test)]
mod tests {
    use super::{Light, Resource, ResourceKind, SceneResources, TextureImage, TextureRole};
    use crate::error::TextureError;
    use pretty_assertions::assert_eq;

    #[test]
    fn release_queues_handle_once() {
        let mut res = SceneResources::new();
        let light = res.insert(Resource::Light(Light::Ambient { intensity: 0.5 }));
        let tex = res.insert(Resource::Texture(TextureImage::solid(
            TextureRole::Day,
            [0, 0, 255, 255],
        )));
        assert_eq!(res.live_count(ResourceKind::Light), 1);

        assert!(res.release(light));
        assert!(!res.release(light));
        assert_eq!(res.light(light), None);
        assert!(res.texture(tex).is_some());
        assert_eq!(res.drain_released(), vec![light]);
        assert!(res.drain_released().is_empty());
    }

    #[test]
    fn typed_accessors_check_kind() {
        let mut res = SceneResources::new();
        let light = res.insert(Resource::Light(Light::Ambient { intensity: 1.0 }));
        assert!(res.texture(light).is_none());
        assert!(res.mesh(light).is_none());
        assert!(res.light(light).is_some());
    }

    #[test]
    fn release_all_empties_arena() {
        let mut res = SceneResources::new();
        for i in 0..3 {
            res.insert(Resource::Light(Light::Ambient { intensity: i as f32 }));
        }
        assert_eq!(res.release_all(), 3);
        assert!(res.is_empty());
        assert_eq!(res.drain_released().len(), 3);
    }

    #[test]
    fn image_size_is_checked() {
        let err = TextureImage::from_rgba8(TextureRole::Night, 2, 2, vec![0u8; 15]).unwrap_err();
        assert_eq!(
            err,
            TextureError::Size {
                role: TextureRole::Night,
                width: 2,
                height: 2,
                expected: 16,
                actual: 15,
            }
        );
        assert!(TextureImage::from_rgba8(TextureRole::Night, 2, 2, vec![0u8; 16]).is_ok());
    }

    #[test]
    fn clones_share_pixels() {
        let a = TextureImage::from_rgba8(TextureRole::Day, 1, 1, vec![1u8, 2, 3, 4]).unwrap();
        let b = a.clone();
        assert_eq!(a.pixel_key(), b.pixel_key());
        assert_eq!(b.pixels(), &[1, 2, 3, 4]);
    }
}
