//! `AgentDispatcher` — the agent-side half shared by both engines.
//!
//! Owns the two global scheduling queues (activity ends and teleportation
//! arrivals), launches legs, and takes arrivals and stuck discards back
//! from the network.  In the parallel engine all of this runs on the
//! coordinator thread, outside the barrier window, so the queues need no
//! internal synchronisation.
//!
//! # Liveness accounting
//!
//! `live` counts agents that still have something to do: waiting for a
//! finite activity end, teleporting, or on the network (including those
//! waiting for space on their first link).  Agents parked at an open-ended
//! activity, arrived, or aborted are not live; the engines stop as soon as
//! `live` reaches zero.

use std::collections::VecDeque;

use tsim_core::{LinkId, SimConfig, SimTime};
use tsim_events::{Event, EventsPublisher};
use tsim_network::{Network, TransferHub, VehicleExit};
use tsim_population::{NextStep, Population, Route, SimAgent, SimVehicle, VehicleType};

use crate::TimeQueue;

// ── AgentCounts ───────────────────────────────────────────────────────────────

/// Snapshot of the exhaustive agent partition at a tick boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AgentCounts {
    /// Waiting in the activity-end queue.
    pub at_activity: usize,
    /// In the teleportation queue.
    pub teleporting: usize,
    /// On the network, including departures waiting for first-link space.
    pub on_network: usize,
    /// Parked forever at an open-ended activity.
    pub parked: usize,
    pub arrived: usize,
    pub aborted: usize,
}

impl AgentCounts {
    /// Every agent is in exactly one bucket, so the sum is the population.
    pub fn sum(&self) -> usize {
        self.at_activity + self.teleporting + self.on_network + self.parked
            + self.arrived
            + self.aborted
    }
}

// ── AgentDispatcher ───────────────────────────────────────────────────────────

pub struct AgentDispatcher {
    config: SimConfig,
    link_count: usize,
    activity_q: TimeQueue<SimAgent>,
    teleport_q: TimeQueue<SimAgent>,
    /// Departures rejected by a full first link, retried every tick.
    deferred: VecDeque<SimVehicle>,
    /// Per-person vehicle type, indexed by `PersonId`.
    vehicle_types: Vec<VehicleType>,
    live: usize,
    teleporting: usize,
    on_network: usize,
    parked: usize,
    arrived: usize,
    aborted: usize,
}

impl AgentDispatcher {
    /// Seed the queues from the population.  Agents whose first activity
    /// never ends are parked immediately and never become live.
    pub fn new(population: Population, network: &Network, config: SimConfig) -> Self {
        let persons = population.into_persons();
        let mut dispatcher = Self {
            link_count: network.link_count(),
            config,
            activity_q: TimeQueue::new(),
            teleport_q: TimeQueue::new(),
            deferred: VecDeque::new(),
            vehicle_types: Vec::with_capacity(persons.len()),
            live: 0,
            teleporting: 0,
            on_network: 0,
            parked: 0,
            arrived: 0,
            aborted: 0,
        };

        for (i, person) in persons.into_iter().enumerate() {
            debug_assert_eq!(person.id.index(), i, "population ids must be dense");
            dispatcher.vehicle_types.push(person.vehicle_type);
            let agent = SimAgent::new(person.id, person.plan);
            let end = agent.activity_end_time();
            if end.is_never() {
                dispatcher.parked += 1;
            } else {
                dispatcher.live += 1;
                dispatcher.activity_q.push(end, agent);
            }
        }
        dispatcher
    }

    // ── Liveness & counters ───────────────────────────────────────────────

    /// Number of agents that still have something to do.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn counts(&self) -> AgentCounts {
        AgentCounts {
            at_activity: self.activity_q.len(),
            teleporting: self.teleporting,
            on_network: self.on_network,
            parked: self.parked,
            arrived: self.arrived,
            aborted: self.aborted,
        }
    }

    /// Departures currently waiting for space on their first link.
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    // ── Tick phases ───────────────────────────────────────────────────────

    /// Pop every teleporting agent whose arrival time is due and return it
    /// to its plan.
    pub fn handle_teleport_arrivals(&mut self, now: SimTime, events: &mut EventsPublisher) {
        while let Some(mut agent) = self.teleport_q.pop_due(now) {
            self.teleporting -= 1;
            let mode = agent.current_leg().mode;
            let act = agent.finish_leg();
            let (link, act_type) = (act.link, act.act_type);
            let person = agent.id;
            events.publish(Event::PersonArrival { time: now, person, link, mode });
            events.publish(Event::ActivityStart { time: now, person, link, act_type });
            self.schedule_activity(agent);
        }
    }

    /// Retry deferred departures, then wake every agent whose activity ends
    /// this tick and launch its next leg.
    pub fn handle_activity_ends(
        &mut self,
        now: SimTime,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
    ) {
        self.retry_deferred(now, hub, events);

        while let Some(mut agent) = self.activity_q.pop_due(now) {
            let act = agent.current_activity();
            let (origin, act_type) = (act.link, act.act_type);
            events.publish(Event::ActivityEnd {
                time: now,
                person: agent.id,
                link: origin,
                act_type,
            });

            match agent.end_activity() {
                NextStep::Finished => {
                    self.arrived += 1;
                    self.live -= 1;
                }
                NextStep::NetworkLeg => self.depart_network(agent, now, hub, events),
                NextStep::TeleportedLeg => self.depart_teleport(agent, origin, now, events),
            }
        }
    }

    /// Fold arrivals and stuck discards from the node phase back into the
    /// plans and counters.
    pub fn process_exits(
        &mut self,
        exits: Vec<VehicleExit>,
        now: SimTime,
        events: &mut EventsPublisher,
    ) {
        for exit in exits {
            match exit {
                VehicleExit::Arrived { vehicle } => {
                    self.on_network -= 1;
                    let person = vehicle.driver_id();
                    let (vid, mode) = (vehicle.id, vehicle.mode);
                    events.publish(Event::PersonLeavesVehicle {
                        time: now,
                        person,
                        vehicle: vid,
                    });
                    let mut agent = vehicle.into_driver();
                    let act = agent.finish_leg();
                    let (link, act_type) = (act.link, act.act_type);
                    events.publish(Event::PersonArrival { time: now, person, link, mode });
                    events.publish(Event::ActivityStart { time: now, person, link, act_type });
                    self.schedule_activity(agent);
                }
                VehicleExit::Stuck { vehicle } => {
                    // The node already published the stuck event.
                    self.on_network -= 1;
                    self.aborted += 1;
                    self.live -= 1;
                    log::warn!(
                        "agent {} lost: stuck on {} with a blocked buffer",
                        vehicle.driver_id(),
                        vehicle.current_link(),
                    );
                }
            }
        }
    }

    /// Flush vehicles recovered from the network at end of run as stuck.
    /// Callers pass them sorted by driver id so the event order is
    /// deterministic.
    pub fn flush_network(
        &mut self,
        vehicles: Vec<SimVehicle>,
        now: SimTime,
        events: &mut EventsPublisher,
    ) {
        for vehicle in vehicles {
            events.publish(Event::PersonStuck {
                time: now,
                person: vehicle.driver_id(),
                link: vehicle.current_link(),
                mode: Some(vehicle.mode),
            });
            self.on_network -= 1;
            self.aborted += 1;
            self.live -= 1;
        }
    }

    /// Flush everything still pending as stuck and settle the counters.
    /// Called once after the loop terminates.
    pub fn cleanup(&mut self, now: SimTime, events: &mut EventsPublisher) {
        for agent in self.activity_q.drain() {
            events.publish(Event::PersonStuck {
                time: now,
                person: agent.id,
                link: agent.current_link(),
                mode: None,
            });
            self.aborted += 1;
            self.live -= 1;
        }
        for agent in self.teleport_q.drain() {
            let link = agent
                .peek_next_activity()
                .map_or(LinkId::INVALID, |a| a.link);
            events.publish(Event::PersonStuck {
                time: now,
                person: agent.id,
                link,
                mode: Some(agent.current_leg().mode),
            });
            self.teleporting -= 1;
            self.aborted += 1;
            self.live -= 1;
        }
        for vehicle in std::mem::take(&mut self.deferred) {
            events.publish(Event::PersonStuck {
                time: now,
                person: vehicle.driver_id(),
                link: vehicle.current_link(),
                mode: Some(vehicle.mode),
            });
            self.on_network -= 1;
            self.aborted += 1;
            self.live -= 1;
        }
    }

    // ── Departures ────────────────────────────────────────────────────────

    fn depart_network(
        &mut self,
        mut agent: SimAgent,
        now: SimTime,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
    ) {
        let leg = agent.current_leg();
        let mode = leg.mode;
        let Route::Network { links } = &leg.route else {
            unreachable!("NextStep::NetworkLeg implies a network route");
        };

        // Per-agent routing failure: abort, count as lost, keep running.
        if links.is_empty() || links.iter().any(|l| l.index() >= self.link_count) {
            let link = links.first().copied().unwrap_or(LinkId::INVALID);
            events.publish(Event::PersonStuck {
                time: now,
                person: agent.id,
                link,
                mode: Some(mode),
            });
            log::warn!("agent {} aborted: {} leg has an invalid route", agent.id, mode);
            agent.abort();
            self.aborted += 1;
            self.live -= 1;
            return;
        }

        let route = links.clone();
        let first = route[0];
        events.publish(Event::PersonDeparture {
            time: now,
            person: agent.id,
            link: first,
            mode,
        });
        agent.start_network_leg();
        let vtype = self.vehicle_types[agent.id.index()];
        let vehicle = SimVehicle::new(vtype, mode, route, agent);
        self.on_network += 1;
        self.try_enter(vehicle, now, hub, events);
    }

    fn depart_teleport(
        &mut self,
        mut agent: SimAgent,
        origin: LinkId,
        now: SimTime,
        events: &mut EventsPublisher,
    ) {
        let leg = agent.current_leg();
        let mode = leg.mode;
        let (distance, travel_time) = match &leg.route {
            Route::Teleported { distance, travel_time } => (*distance, *travel_time),
            Route::Network { .. } => {
                unreachable!("NextStep::TeleportedLeg implies a teleported route")
            }
        };
        let duration = travel_time
            .unwrap_or_else(|| self.config.teleport_params(mode).travel_time(distance));

        events.publish(Event::PersonDeparture {
            time: now,
            person: agent.id,
            link: origin,
            mode,
        });
        agent.start_teleported_leg();
        self.teleporting += 1;
        self.teleport_q.push(now.offset(duration), agent);
    }

    /// Admit a vehicle onto its first link, or defer it when the link is
    /// full.  Entry events are published at actual admission time.
    fn try_enter(
        &mut self,
        vehicle: SimVehicle,
        now: SimTime,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
    ) {
        let first = vehicle.current_link();
        if hub.try_reserve(first, vehicle.pce) {
            let person = vehicle.driver_id();
            events.publish(Event::PersonEntersVehicle {
                time: now,
                person,
                vehicle: vehicle.id,
            });
            events.publish(Event::VehicleEntersTraffic {
                time: now,
                person,
                vehicle: vehicle.id,
                link: first,
                mode: vehicle.mode,
            });
            hub.push(first, vehicle);
        } else {
            // No space: retried next tick, in arrival order.
            self.deferred.push_back(vehicle);
        }
    }

    fn retry_deferred(&mut self, now: SimTime, hub: &mut TransferHub, events: &mut EventsPublisher) {
        let pending = std::mem::take(&mut self.deferred);
        for vehicle in pending {
            self.try_enter(vehicle, now, hub, events);
        }
    }

    /// Queue the agent for its (just started) activity's end, or park it
    /// forever if the activity is open-ended.
    fn schedule_activity(&mut self, agent: SimAgent) {
        let end = agent.activity_end_time();
        if end.is_never() {
            self.parked += 1;
            self.live -= 1;
        } else {
            self.activity_q.push(end, agent);
        }
    }
}
