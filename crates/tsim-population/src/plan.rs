//! Plan types: `Activity`, `Leg`, `Route`, and the validated `Plan`.
//!
//! A plan is an alternating sequence Activity, Leg, Activity, …, always
//! starting with an activity.  Legs arrive with their routes already
//! resolved (an ordered link-id sequence for network modes, or a
//! distance/travel-time estimate for teleported modes) — the simulation
//! never computes paths.

use tsim_core::{LinkId, Mode, SimTime};

// ── Activity ──────────────────────────────────────────────────────────────────

/// One activity in a plan: something the agent does at a link for a while.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Activity {
    /// Application-defined type label ("home", "work", …).
    pub act_type: &'static str,

    /// The link at whose downstream end the activity takes place.
    pub link: LinkId,

    /// When the activity ends and the agent departs on the next leg.
    /// `None` means the activity never ends — the agent parks there for the
    /// rest of the run and is excluded from the liveness count.
    pub end_time: Option<SimTime>,
}

impl Activity {
    pub fn new(act_type: &'static str, link: LinkId, end_time: SimTime) -> Self {
        Self { act_type, link, end_time: Some(end_time) }
    }

    /// An activity that never ends (open-ended last activity).
    pub fn open_end(act_type: &'static str, link: LinkId) -> Self {
        Self { act_type, link, end_time: None }
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// How a leg is executed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Route {
    /// Simulated link-by-link on the network.  `links` is the full ordered
    /// sequence including the departure and arrival links.
    Network { links: Vec<LinkId> },

    /// Scheduled directly to its arrival time, bypassing the network.
    /// `travel_time` overrides the mode's speed model when present.
    Teleported {
        /// Beeline distance in metres.
        distance: f64,
        /// Pre-computed duration in seconds, if the upstream router supplied
        /// one.
        travel_time: Option<u32>,
    },
}

impl Route {
    /// `true` if this leg runs on the network graph.
    pub fn is_network(&self) -> bool {
        matches!(self, Route::Network { .. })
    }
}

// ── Leg ───────────────────────────────────────────────────────────────────────

/// One leg in a plan: a movement between two consecutive activities.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Leg {
    pub mode: Mode,
    pub route: Route,
}

impl Leg {
    /// A network leg over the given link sequence.
    pub fn network(mode: Mode, links: Vec<LinkId>) -> Self {
        Self { mode, route: Route::Network { links } }
    }

    /// A teleported leg over a beeline `distance`.
    pub fn teleported(mode: Mode, distance: f64) -> Self {
        Self { mode, route: Route::Teleported { distance, travel_time: None } }
    }

    /// A teleported leg with an explicit duration.
    pub fn teleported_timed(mode: Mode, distance: f64, travel_time: u32) -> Self {
        Self { mode, route: Route::Teleported { distance, travel_time: Some(travel_time) } }
    }
}

// ── Plan ──────────────────────────────────────────────────────────────────────

/// One element of the alternating activity/leg sequence.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PlanElement {
    Activity(Activity),
    Leg(Leg),
}

/// A validated plan: starts with an activity, alternates strictly.
///
/// Construct via [`PlanBuilder`]; the constructor is private so every `Plan`
/// in the system is structurally valid.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Plan {
    elements: Vec<PlanElement>,
}

impl Plan {
    pub fn elements(&self) -> &[PlanElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The activity at `idx`, or `None` if `idx` is out of range or a leg.
    pub fn activity_at(&self, idx: usize) -> Option<&Activity> {
        match self.elements.get(idx) {
            Some(PlanElement::Activity(a)) => Some(a),
            _ => None,
        }
    }

    /// The leg at `idx`, or `None` if `idx` is out of range or an activity.
    pub fn leg_at(&self, idx: usize) -> Option<&Leg> {
        match self.elements.get(idx) {
            Some(PlanElement::Leg(l)) => Some(l),
            _ => None,
        }
    }
}

// ── PlanBuilder ───────────────────────────────────────────────────────────────

/// Builds a [`Plan`], enforcing the alternation invariant at `build()`.
///
/// # Example
///
/// ```
/// use tsim_core::{LinkId, Mode, SimTime};
/// use tsim_population::{Activity, Leg, PlanBuilder};
///
/// let plan = PlanBuilder::new()
///     .activity(Activity::new("home", LinkId(0), SimTime::from_hms(8, 0, 0)))
///     .leg(Leg::network(Mode::Car, vec![LinkId(0), LinkId(1)]))
///     .activity(Activity::open_end("work", LinkId(1)))
///     .build()
///     .unwrap();
/// assert_eq!(plan.len(), 3);
/// ```
#[derive(Default)]
pub struct PlanBuilder {
    elements: Vec<PlanElement>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(mut self, activity: Activity) -> Self {
        self.elements.push(PlanElement::Activity(activity));
        self
    }

    pub fn leg(mut self, leg: Leg) -> Self {
        self.elements.push(PlanElement::Leg(leg));
        self
    }

    /// Validate alternation and produce the plan.
    ///
    /// Rules: non-empty; first element is an activity; activities and legs
    /// strictly alternate; the last element is an activity (a trailing leg
    /// would leave the agent with no destination activity).
    pub fn build(self) -> Result<Plan, crate::PlanError> {
        use crate::PlanError;

        if self.elements.is_empty() {
            return Err(PlanError::Empty);
        }
        for (i, el) in self.elements.iter().enumerate() {
            let want_activity = i % 2 == 0;
            let is_activity = matches!(el, PlanElement::Activity(_));
            if want_activity != is_activity {
                return Err(PlanError::NotAlternating { index: i });
            }
        }
        if matches!(self.elements.last(), Some(PlanElement::Leg(_))) {
            return Err(PlanError::TrailingLeg);
        }
        Ok(Plan { elements: self.elements })
    }
}
