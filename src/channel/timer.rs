//! Time source and expiry arithmetic for the challenge period.
//!
//! Time is in seconds. The window after a close or challenge is half-open:
//! challenges are accepted while `now < expiry`, redeem is possible once
//! `now >= expiry`.

use super::Error;
use core::cell::Cell;

pub trait Clock {
    /// Current time in seconds.
    fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Wall clock time as seconds since the Unix epoch.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to, for tests and simulations.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get().saturating_add(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

pub fn expiry(now: u64, challenge_period: u64) -> Result<u64, Error> {
    now.checked_add(challenge_period)
        .ok_or(Error::TimestampOverflow)
}

pub fn is_expired(now: u64, expiry: u64) -> bool {
    now >= expiry
}
