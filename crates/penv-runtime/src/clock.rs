//! Clocks
//!
//! The scheduler reads time and sleeps only through a [`Clock`], so tests can
//! swap in a [`ManualClock`] whose sleeps are instant.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic milliseconds
    fn now_ms(&self) -> u64;

    /// Block for `ms` milliseconds
    fn sleep_ms(&self, ms: u64);
}

/// Real time, measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Virtual time; clones share the same reading
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    slept: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u64) -> Self {
        let clock = Self::default();
        clock.now.set(ms);
        clock
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// Total virtual time spent in `sleep_ms`
    pub fn slept_ms(&self) -> u64 {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: u64) {
        self.slept.set(self.slept.get() + ms);
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::starting_at(50);
        let view = clock.clone();
        clock.advance(25);
        view.sleep_ms(10);
        assert_eq!(clock.now_ms(), 85);
        assert_eq!(clock.slept_ms(), 10);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        clock.sleep_ms(2);
        assert!(clock.now_ms() >= a + 2);
    }
}
