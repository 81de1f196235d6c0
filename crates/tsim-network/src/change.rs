//! Time-variant network changes.
//!
//! The upstream scenario supplies an ordered-by-start-time feed of capacity
//! and freespeed changes.  Each partition keeps the changes affecting its
//! own links and applies them at the first tick whose time has reached the
//! change's start, immediately before moving links, so the new parameters
//! govern every exit-time stamp and budget accrual from that tick on.

use tsim_core::{LinkId, SimTime};

/// One change record.  `None` fields leave the current value untouched.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkChange {
    /// First simulated second at which the new values apply.
    pub at: SimTime,
    pub link: LinkId,
    /// New free-flow speed in m/s.
    pub freespeed: Option<f64>,
    /// New discharge capacity in vehicle-equivalents per second.
    pub flow_cap: Option<f64>,
}

impl NetworkChange {
    pub fn freespeed(at: SimTime, link: LinkId, freespeed: f64) -> Self {
        Self { at, link, freespeed: Some(freespeed), flow_cap: None }
    }

    pub fn flow_cap(at: SimTime, link: LinkId, flow_cap: f64) -> Self {
        Self { at, link, freespeed: None, flow_cap: Some(flow_cap) }
    }
}
