//! Sun position and civil time on the globe.

pub mod city_time;
pub mod solar;
pub mod timezone;

pub use city_time::*;
pub use solar::*;
pub use timezone::*;
