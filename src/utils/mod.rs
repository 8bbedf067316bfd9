//! Various utility functions and types

pub mod geometry;
pub mod listeners;
pub mod serial;

pub use self::geometry::{Point, Rectangle, Size};
pub use self::listeners::{ListenerKey, Listeners};
pub use self::serial::{Serial, SerialCounter, SERIAL_COUNTER};
