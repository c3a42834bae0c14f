use thiserror::Error;

use crate::resources::TextureRole;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("decoding {url} failed: {reason}")]
    Decode { url: String, reason: String },

    #[error("{role:?} texture has {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    Size {
        role: TextureRole,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
