//! Protocol serials.

use std::sync::atomic::{AtomicU32, Ordering};

/// The counter behind every serial this crate hands out.
///
/// Configure events draw their serials from here so that acknowledgements can
/// be matched without a per-surface counter.
pub static SERIAL_COUNTER: SerialCounter = SerialCounter {
    serial: AtomicU32::new(1),
};

/// A protocol serial.
///
/// Serials are `u32` values handed out in sequence. Comparison accounts for
/// the counter wrapping around: a serial issued just after an overflow still
/// orders after one issued just before it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Serial(u32);

impl PartialOrd for Serial {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.0.abs_diff(other.0) < u32::MAX / 2 {
            self.0.partial_cmp(&other.0)
        } else {
            other.0.partial_cmp(&self.0)
        }
    }
}

impl From<u32> for Serial {
    #[inline]
    fn from(value: u32) -> Self {
        Serial(value)
    }
}

impl From<Serial> for u32 {
    #[inline]
    fn from(serial: Serial) -> u32 {
        serial.0
    }
}

/// Hands out serials in sequence.
///
/// The counter skips 0 on wrap-around, so 0 stays available as a "no serial"
/// marker on the wire.
#[derive(Debug)]
pub struct SerialCounter {
    serial: AtomicU32,
}

impl SerialCounter {
    /// Retrieve the next serial from the counter.
    pub fn next_serial(&self) -> Serial {
        let _ = self
            .serial
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::SeqCst);
        Serial(self.serial.fetch_add(1, Ordering::AcqRel))
    }
}
