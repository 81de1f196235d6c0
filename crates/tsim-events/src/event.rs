//! The `Event` sum type.
//!
//! One closed enum replaces a subtype-per-kind hierarchy: producers build
//! the variant for the transition they just performed, consumers match
//! exhaustively and pick out what they care about.

use tsim_core::{LinkId, Mode, PersonId, SimTime, VehicleId};

/// An immutable record of one simulation state transition.
///
/// Serde support is serialize-only: event streams are written out, never
/// read back in by the core.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Event {
    /// An agent began performing an activity.
    ActivityStart {
        time: SimTime,
        person: PersonId,
        link: LinkId,
        act_type: &'static str,
    },
    /// An agent finished an activity and is about to depart.
    ActivityEnd {
        time: SimTime,
        person: PersonId,
        link: LinkId,
        act_type: &'static str,
    },
    /// An agent started a leg.
    PersonDeparture {
        time: SimTime,
        person: PersonId,
        link: LinkId,
        mode: Mode,
    },
    /// An agent completed a leg at its destination.
    PersonArrival {
        time: SimTime,
        person: PersonId,
        link: LinkId,
        mode: Mode,
    },
    /// A driver took a seat in a vehicle.
    PersonEntersVehicle {
        time: SimTime,
        person: PersonId,
        vehicle: VehicleId,
    },
    /// A driver left a vehicle.
    PersonLeavesVehicle {
        time: SimTime,
        person: PersonId,
        vehicle: VehicleId,
    },
    /// A vehicle was dispatched onto its first link.
    VehicleEntersTraffic {
        time: SimTime,
        person: PersonId,
        vehicle: VehicleId,
        link: LinkId,
        mode: Mode,
    },
    /// A vehicle completed its route and left the network.
    VehicleLeavesTraffic {
        time: SimTime,
        person: PersonId,
        vehicle: VehicleId,
        link: LinkId,
        mode: Mode,
    },
    /// A vehicle crossed a node onto `link`.
    LinkEnter {
        time: SimTime,
        vehicle: VehicleId,
        link: LinkId,
    },
    /// A vehicle left `link` across its downstream node.
    LinkLeave {
        time: SimTime,
        vehicle: VehicleId,
        link: LinkId,
    },
    /// An agent was removed from the simulation without reaching its
    /// destination (blocked too long, invalid route, or end-of-run flush).
    /// `mode` is `None` when the agent was flushed mid-activity.
    PersonStuck {
        time: SimTime,
        person: PersonId,
        link: LinkId,
        mode: Option<Mode>,
    },
}

impl Event {
    /// The timestamp carried by every variant.
    pub fn time(&self) -> SimTime {
        match *self {
            Event::ActivityStart { time, .. }
            | Event::ActivityEnd { time, .. }
            | Event::PersonDeparture { time, .. }
            | Event::PersonArrival { time, .. }
            | Event::PersonEntersVehicle { time, .. }
            | Event::PersonLeavesVehicle { time, .. }
            | Event::VehicleEntersTraffic { time, .. }
            | Event::VehicleLeavesTraffic { time, .. }
            | Event::LinkEnter { time, .. }
            | Event::LinkLeave { time, .. }
            | Event::PersonStuck { time, .. } => time,
        }
    }

    /// The person this event concerns, if any (link events carry only the
    /// vehicle).
    pub fn person(&self) -> Option<PersonId> {
        match *self {
            Event::ActivityStart { person, .. }
            | Event::ActivityEnd { person, .. }
            | Event::PersonDeparture { person, .. }
            | Event::PersonArrival { person, .. }
            | Event::PersonEntersVehicle { person, .. }
            | Event::PersonLeavesVehicle { person, .. }
            | Event::VehicleEntersTraffic { person, .. }
            | Event::VehicleLeavesTraffic { person, .. }
            | Event::PersonStuck { person, .. } => Some(person),
            Event::LinkEnter { .. } | Event::LinkLeave { .. } => None,
        }
    }

    /// Short lowercase tag for log lines and compact dumps.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ActivityStart { .. }       => "actstart",
            Event::ActivityEnd { .. }         => "actend",
            Event::PersonDeparture { .. }     => "departure",
            Event::PersonArrival { .. }       => "arrival",
            Event::PersonEntersVehicle { .. } => "enters_vehicle",
            Event::PersonLeavesVehicle { .. } => "leaves_vehicle",
            Event::VehicleEntersTraffic { .. } => "veh_enters_traffic",
            Event::VehicleLeavesTraffic { .. } => "veh_leaves_traffic",
            Event::LinkEnter { .. }           => "link_enter",
            Event::LinkLeave { .. }           => "link_leave",
            Event::PersonStuck { .. }         => "stuck",
        }
    }
}
