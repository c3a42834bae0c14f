pub mod atmosphere;
pub mod error;
pub mod globe;
pub mod lighting;
pub mod picking;
pub mod renderer;
pub mod resources;
pub mod starfield;

pub use error::*;
pub use renderer::*;
pub use resources::*;
