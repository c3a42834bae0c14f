pub mod arena;
pub mod bounds;
pub mod handles;
pub mod math;
pub mod time;

// Handles, time and geometry shared by every globe crate.
pub use arena::*;
pub use bounds::*;
pub use handles::*;
pub use time::*;
