//! Host clock adapter.
//!
//! Milliseconds since construction, from `std::time::Instant`. Firmware
//! ports provide their own [`Clock`] over the platform timer.

use crate::ports::Clock;

pub struct SystemClock {
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
