//! Domain types for barrierlab

pub mod bar;
pub mod session;

pub use bar::Bar;
pub use session::{SessionClock, DEFAULT_SESSION_TZ};
