use std::sync::Arc;
use std::sync::Mutex;

use chrono::TimeDelta;
use log::debug;

use crate::time::{now, DateTime};

/// ClockSkew keeps the measured offset between the local clock and the server clock.
///
/// The value is shared by every request signed by one client. Only
/// [`ClockSkew::calibrate`] writes it; readers may observe the old value while a
/// calibration is in progress, which is fine because servers accept a generous window.
#[derive(Clone, Debug, Default)]
pub struct ClockSkew {
    offset_millis: Arc<Mutex<i64>>,
}

impl ClockSkew {
    /// Create a skew with zero offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a skew with a known offset, for example one persisted from a previous run.
    pub fn with_offset_millis(offset_millis: i64) -> Self {
        Self {
            offset_millis: Arc::new(Mutex::new(offset_millis)),
        }
    }

    /// Current offset in milliseconds. Positive means the server is ahead of us.
    pub fn offset_millis(&self) -> i64 {
        *self.offset_millis.lock().expect("lock poisoned")
    }

    /// Local now adjusted by the skew, the time every signature must use.
    pub fn now(&self) -> DateTime {
        self.adjust(now())
    }

    /// Adjust a local time by the skew.
    pub fn adjust(&self, local: DateTime) -> DateTime {
        local + TimeDelta::milliseconds(self.offset_millis())
    }

    /// Record a new offset from one round trip and return it.
    ///
    /// The server time is compared against the midpoint of the local times taken
    /// before and after the call.
    pub fn calibrate(&self, before: DateTime, server: DateTime, after: DateTime) -> i64 {
        let skew = calculate_skew(before, server, after);
        *self.offset_millis.lock().expect("lock poisoned") = skew;
        debug!("clock skew calibrated to {skew}ms");
        skew
    }
}

/// `server - midpoint(before, after)` in milliseconds.
pub fn calculate_skew(before: DateTime, server: DateTime, after: DateTime) -> i64 {
    let half_trip = (after - before) / 2;
    let midpoint = before + half_trip;
    (server - midpoint).num_milliseconds()
}
