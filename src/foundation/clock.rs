use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source measured in seconds.
///
/// All timer bookkeeping (blink windows, random switches, idle detection, animation frames) is
/// expressed in seconds relative to the clock's own origin, so tests can substitute a
/// [`ManualClock`] and step time explicitly.
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock origin.
    fn now_secs(&self) -> f64;
}

/// Wall clock backed by [`Instant`], starting at zero when constructed.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a new clock at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    secs_bits: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `secs`.
    pub fn new(secs: f64) -> Self {
        Self {
            secs_bits: AtomicU64::new(secs.to_bits()),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: f64) {
        self.secs_bits.store(secs.to_bits(), Ordering::Release);
    }

    /// Move forward by `delta` seconds.
    pub fn advance(&self, delta: f64) {
        let _ = self
            .secs_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.secs_bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/clock.rs"]
mod tests;
