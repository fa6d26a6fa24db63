//! Inbound command throttling

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Commands per second a session may send (movement toggles, shots, upgrades)
pub const INPUT_RATE_LIMIT: u32 = 60;

/// Per-session throttle. Counts what it drops so a flood is logged once per
/// burst instead of once per frame.
pub struct InputThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    dropped: u64,
}

impl InputThrottle {
    pub fn per_second(rate: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
            dropped: 0,
        }
    }

    /// Admit one command. `Err(n)` carries the length of the current drop streak.
    pub fn admit(&mut self) -> Result<(), u64> {
        match self.limiter.check() {
            Ok(()) => {
                self.dropped = 0;
                Ok(())
            }
            Err(_) => {
                self.dropped += 1;
                Err(self.dropped)
            }
        }
    }
}

impl Default for InputThrottle {
    fn default() -> Self {
        Self::per_second(INPUT_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_beyond_quota_is_dropped() {
        let mut throttle = InputThrottle::per_second(3);
        for _ in 0..3 {
            assert_eq!(throttle.admit(), Ok(()));
        }
        assert_eq!(throttle.admit(), Err(1));
        assert_eq!(throttle.admit(), Err(2));
    }

    #[test]
    fn test_zero_rate_still_admits_one() {
        let mut throttle = InputThrottle::per_second(0);
        assert!(throttle.admit().is_ok());
        assert!(throttle.admit().is_err());
    }
}
