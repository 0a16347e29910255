//! Token-bucket request throttle (gateway-style burst + steady rate).

use parking_lot::Mutex;
use std::time::Instant;

#[derive(Debug)]
pub struct Throttle { burst: f64, rate_per_sec: f64, bucket: Mutex<Bucket> }

#[derive(Debug)]
struct Bucket { available: f64, last_refill: Instant }

impl Throttle {
    /// `rate_per_sec == 0` disables throttling.
    pub fn new(burst: u64, rate_per_sec: u64) -> Self {
        let burst = burst.max(1) as f64;
        Self { burst, rate_per_sec: rate_per_sec as f64, bucket: Mutex::new(Bucket { available: burst, last_refill: Instant::now() }) }
    }

    pub fn is_enabled(&self) -> bool { self.rate_per_sec > 0.0 }

    pub fn try_acquire(&self) -> bool {
        if !self.is_enabled() { return true; }
        let mut b = self.bucket.lock();
        let now = Instant::now();
        let refill = now.duration_since(b.last_refill).as_secs_f64() * self.rate_per_sec;
        b.available = (b.available + refill).min(self.burst);
        b.last_refill = now;
        if b.available < 1.0 { return false; }
        b.available -= 1.0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_then_reject() {
        let t = Throttle::new(3, 1);
        assert!(t.try_acquire());
        assert!(t.try_acquire());
        assert!(t.try_acquire());
        assert!(!t.try_acquire());
    }

    #[test]
    fn refills_over_time() {
        let t = Throttle::new(1, 50);
        assert!(t.try_acquire());
        assert!(!t.try_acquire());
        std::thread::sleep(Duration::from_millis(60));
        assert!(t.try_acquire());
    }

    #[test]
    fn zero_rate_disables() {
        let t = Throttle::new(1, 0);
        for _ in 0..100 { assert!(t.try_acquire()); }
    }
}
