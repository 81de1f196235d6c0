//! `StorageCap` — atomic link occupancy accounting.
//!
//! Occupancy is tracked in fixed-point milli-vehicle-equivalents inside an
//! `AtomicU64` so that any thread holding the shared handle can attempt an
//! admission.  `try_consume` is a compare-exchange loop: either the whole
//! vehicle fits under the capacity or nothing is consumed, so
//! `used ≤ capacity` holds after every successful admission even under
//! cross-partition contention.
//!
//! Release happens on the owning partition when the node pops the vehicle
//! from the link's buffer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-point scale: 1 vehicle-equivalent = 1000 units.
const MILLI: f64 = 1000.0;

#[inline]
fn to_milli(ve: f64) -> u64 {
    (ve * MILLI).round() as u64
}

#[derive(Debug)]
pub struct StorageCap {
    cap_milli: u64,
    used_milli: AtomicU64,
}

impl StorageCap {
    /// `capacity` in vehicle-equivalents.
    pub fn new(capacity: f64) -> Self {
        Self {
            cap_milli: to_milli(capacity),
            used_milli: AtomicU64::new(0),
        }
    }

    /// Atomically admit `pce` vehicle-equivalents, or reject if the link
    /// would exceed its capacity.
    pub fn try_consume(&self, pce: f64) -> bool {
        let p = to_milli(pce);
        let mut cur = self.used_milli.load(Ordering::Acquire);
        loop {
            if cur + p > self.cap_milli {
                return false;
            }
            match self.used_milli.compare_exchange_weak(
                cur,
                cur + p,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Give back `pce` vehicle-equivalents when a vehicle leaves the link.
    pub fn release(&self, pce: f64) {
        let p = to_milli(pce);
        let prev = self.used_milli.fetch_sub(p, Ordering::AcqRel);
        debug_assert!(prev >= p, "storage release without matching consume");
    }

    /// Current occupancy in vehicle-equivalents.
    pub fn used(&self) -> f64 {
        self.used_milli.load(Ordering::Acquire) as f64 / MILLI
    }

    /// Capacity in vehicle-equivalents.
    pub fn capacity(&self) -> f64 {
        self.cap_milli as f64 / MILLI
    }

    /// `true` while at least some storage is free.  A peek only — admission
    /// itself must go through [`try_consume`](Self::try_consume).
    pub fn is_available(&self) -> bool {
        self.used_milli.load(Ordering::Acquire) < self.cap_milli
    }
}
