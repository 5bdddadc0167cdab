//! Timing helpers for callers that pace bus traffic.
//!
//! [`millis`] is a wrapping 32-bit millisecond counter, so timestamps must be
//! compared with [`time_after`] and friends rather than `<`. Those take the
//! difference as a signed value, which stays correct across a wrap as long
//! as the two stamps are less than about 24 days apart.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Milliseconds since the process first asked for the time, wrapping.
pub type Millis = u32;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Current monotonic time in milliseconds.
pub fn millis() -> Millis {
    epoch().elapsed().as_millis() as Millis
}

/// Spin for `us` microseconds without yielding the thread.
pub fn delay_us(us: u64) {
    let deadline = Instant::now() + Duration::from_micros(us);
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

/// Same as [`delay_us`].
pub fn sleep_us(us: u64) {
    delay_us(us)
}

/// Put the thread to sleep for `ms` milliseconds.
pub fn sleep_ms(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}

/// True if `unknown` is later than `known`.
pub fn time_after(unknown: Millis, known: Millis) -> bool {
    (known.wrapping_sub(unknown) as i32) < 0
}

/// True if `unknown` is earlier than `known`.
pub fn time_before(unknown: Millis, known: Millis) -> bool {
    (unknown.wrapping_sub(known) as i32) < 0
}

/// True if `unknown` is later than or equal to `known`.
pub fn time_after_eq(unknown: Millis, known: Millis) -> bool {
    (unknown.wrapping_sub(known) as i32) >= 0
}

/// True if `unknown` is earlier than or equal to `known`.
pub fn time_before_eq(unknown: Millis, known: Millis) -> bool {
    (known.wrapping_sub(unknown) as i32) >= 0
}
