//! Foundation utilities shared across the engine

pub mod logging;
pub mod time;

pub use time::Timer;
