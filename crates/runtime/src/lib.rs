pub mod clock;
pub mod event_bus;
pub mod frame;
pub mod time_controller;
pub mod timer;

pub use clock::*;
pub use event_bus::*;
pub use frame::*;
pub use time_controller::*;
pub use timer::*;
