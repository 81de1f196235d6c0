//! `FlowCap` — the buffer discharge budget.
//!
//! The budget accrues `flow_cap × elapsed` vehicle-equivalents on every
//! update and is capped at one tick's burst, `max(flow_cap × Δt, 1 VE)`, so
//! an idle link cannot bank capacity and dump it all at once.  A vehicle may
//! be offered to the downstream node while the budget holds at least one
//! vehicle-equivalent; consuming subtracts the vehicle's own PCE and may
//! drive the budget negative, which delays the next discharge by the time
//! needed to pay off the debt.
//!
//! Accounting is fixed-point milli-vehicle-equivalents (matching
//! [`StorageCap`][crate::StorageCap]) so repeated fractional accruals stay
//! exact: a 0.1 VE/s link banks one vehicle in precisely 10 seconds, not
//! 10 ± one ULP.
//!
//! The budget starts full so the first vehicle on an empty link is never
//! artificially held back.

use tsim_core::SimTime;

/// Fixed-point scale: 1 vehicle-equivalent = 1000 units.
const MILLI: f64 = 1000.0;

#[inline]
fn to_milli(ve: f64) -> i64 {
    (ve * MILLI).round() as i64
}

#[derive(Debug, Clone)]
pub struct FlowCap {
    /// Discharge rate in milli-VE per second.
    rate_milli: i64,
    /// Upper bound on the banked budget: `max(rate × Δt, 1 VE)`.
    burst_milli: i64,
    accumulated_milli: i64,
    last_update: SimTime,
}

impl FlowCap {
    /// `rate` in vehicle-equivalents per second; `timestep` is the engine Δt.
    pub fn new(rate: f64, timestep: u32) -> Self {
        let rate_milli = to_milli(rate);
        let burst_milli = (rate_milli * timestep as i64).max(to_milli(1.0));
        Self {
            rate_milli,
            burst_milli,
            accumulated_milli: burst_milli,
            last_update: SimTime::ZERO,
        }
    }

    /// Bank capacity for the time elapsed since the last update.
    pub fn accrue(&mut self, now: SimTime) {
        let elapsed = now.since(self.last_update);
        if elapsed > 0 {
            self.accumulated_milli = (self.accumulated_milli
                + self.rate_milli * elapsed as i64)
                .min(self.burst_milli);
            self.last_update = now;
        }
    }

    /// `true` while at least one vehicle-equivalent is banked.
    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.accumulated_milli >= to_milli(1.0)
    }

    /// Spend the budget for one discharged vehicle.  May go negative.
    #[inline]
    pub fn consume(&mut self, pce: f64) {
        self.accumulated_milli -= to_milli(pce);
    }

    /// Change the discharge rate (time-variant network change).  Accrues at
    /// the old rate up to `now` first, then re-derives the burst cap.
    pub fn set_rate(&mut self, rate: f64, timestep: u32, now: SimTime) {
        self.accrue(now);
        self.rate_milli = to_milli(rate);
        self.burst_milli = (self.rate_milli * timestep as i64).max(to_milli(1.0));
        self.accumulated_milli = self.accumulated_milli.min(self.burst_milli);
    }

    /// Discharge rate in vehicle-equivalents per second.
    pub fn rate(&self) -> f64 {
        self.rate_milli as f64 / MILLI
    }

    #[cfg(test)]
    pub fn accumulated(&self) -> f64 {
        self.accumulated_milli as f64 / MILLI
    }
}
