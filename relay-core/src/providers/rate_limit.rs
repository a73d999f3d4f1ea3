//! Fixed-window request limiter
//!
//! Counts accepted requests per wall-clock second. A request arriving in a new
//! second resets the window; rejected requests are not counted.

use chrono::Utc;
use parking_lot::Mutex;

/// Process-wide requests-per-second limiter
#[derive(Debug)]
pub struct RequestRateLimiter {
    limit: u32,
    /// (epoch second, accepted requests in that second)
    window: Mutex<(i64, u32)>,
}

impl RequestRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limit: requests_per_second,
            window: Mutex::new((i64::MIN, 0)),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Try to admit a request now
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Utc::now().timestamp())
    }

    /// Try to admit a request arriving during epoch second `second`
    pub fn try_acquire_at(&self, second: i64) -> bool {
        let mut window = self.window.lock();
        if window.0 != second {
            *window = (second, 0);
        }
        if window.1 >= self.limit {
            return false;
        }
        window.1 += 1;
        true
    }
}
