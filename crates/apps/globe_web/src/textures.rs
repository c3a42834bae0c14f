//! Texture fetch and decode for scene rebuilds.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::future::try_join4;
use gloo_net::http::Request;
use image::imageops::FilterType;
use scene::{LoadedTextures, TextureError, TextureImage, TextureRole};
use tracing::debug;
use viewer::config::TextureUrls;

/// WebGL2 guarantees 2D textures up to this size.
pub const MAX_TEXTURE_DIM: u32 = 2048;

/// Decoded images by URL, so rebuilds after the first skip the network.
#[derive(Debug, Default)]
pub struct TextureCache {
    images: HashMap<(TextureRole, String), TextureImage>,
}

impl TextureCache {
    pub fn get(&self, role: TextureRole, url: &str) -> Option<TextureImage> {
        self.images.get(&(role, url.to_string())).cloned()
    }

    pub fn insert(&mut self, url: &str, image: TextureImage) {
        self.images.insert((image.role(), url.to_string()), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Loads all four textures in parallel. Any failure fails the whole set.
pub async fn load_textures(
    urls: &TextureUrls,
    cache: &RefCell<TextureCache>,
) -> Result<LoadedTextures, TextureError> {
    let (day, bump, night, stars) = try_join4(
        load_texture(TextureRole::Day, &urls.day, cache),
        load_texture(TextureRole::Bump, &urls.bump, cache),
        load_texture(TextureRole::Night, &urls.night, cache),
        load_texture(TextureRole::Stars, &urls.stars, cache),
    )
    .await?;
    Ok(LoadedTextures {
        day,
        bump,
        night,
        stars,
    })
}

async fn load_texture(
    role: TextureRole,
    url: &str,
    cache: &RefCell<TextureCache>,
) -> Result<TextureImage, TextureError> {
    if let Some(image) = cache.borrow().get(role, url) {
        return Ok(image);
    }
    let bytes = fetch_bytes(url).await?;
    let image = decode_texture(role, url, &bytes)?;
    debug!(?role, url, width = image.width(), height = image.height(), "texture loaded");
    cache.borrow_mut().insert(url, image.clone());
    Ok(image)
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, TextureError> {
    let fetch_err = |reason: String| TextureError::Fetch {
        url: url.to_string(),
        reason,
    };
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    if !resp.ok() {
        return Err(fetch_err(format!("HTTP {}", resp.status())));
    }
    resp.binary().await.map_err(|e| fetch_err(e.to_string()))
}

/// Decodes PNG/JPEG bytes to RGBA8, downscaling anything larger than
/// [`MAX_TEXTURE_DIM`] on either side.
pub fn decode_texture(role: TextureRole, url: &str, bytes: &[u8]) -> Result<TextureImage, TextureError> {
    let mut decoded = image::load_from_memory(bytes).map_err(|e| TextureError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if decoded.width() > MAX_TEXTURE_DIM || decoded.height() > MAX_TEXTURE_DIM {
        decoded = decoded.resize(MAX_TEXTURE_DIM, MAX_TEXTURE_DIM, FilterType::Triangle);
    }
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    TextureImage::from_rgba8(role, width, height, rgba.into_raw())
}

/// Shared between the app state and in-flight loads.
pub type SharedTextureCache = Rc<RefCell<TextureCache>>;
