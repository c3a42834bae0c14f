pub mod mesh;
pub mod renderer;
pub mod shaders;
pub mod uniforms;

pub use renderer::*;
pub use shaders::*;
pub use uniforms::*;
