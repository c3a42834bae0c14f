pub mod camera;
pub mod config;
pub mod interaction;
pub mod tooltip;
pub mod viewer;

pub use config::{ConfigError, GlobeConfig};
pub use viewer::*;
