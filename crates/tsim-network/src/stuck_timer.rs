//! `StuckTimer` — watchdog for a blocked buffer head.
//!
//! The timer starts the first time a link offers a vehicle that cannot move
//! (downstream full) and resets whenever the head vehicle does leave.  Once
//! `now - start ≥ threshold` the node discards the vehicle as stuck instead
//! of letting a grid-locked cycle stall forever.  A threshold of `u32::MAX`
//! disables the watchdog.

use tsim_core::SimTime;

#[derive(Debug, Clone)]
pub struct StuckTimer {
    threshold: u32,
    since: Option<SimTime>,
}

impl StuckTimer {
    pub fn new(threshold: u32) -> Self {
        Self { threshold, since: None }
    }

    /// Start timing if not already running.
    pub fn start(&mut self, now: SimTime) {
        if self.since.is_none() {
            self.since = Some(now);
        }
    }

    /// Stop timing; called when the buffer head moves.
    pub fn reset(&mut self) {
        self.since = None;
    }

    /// `true` once the head vehicle has been blocked for the threshold.
    pub fn is_stuck(&self, now: SimTime) -> bool {
        if self.threshold == u32::MAX {
            return false;
        }
        match self.since {
            Some(since) => now.since(since) >= self.threshold,
            None => false,
        }
    }
}
