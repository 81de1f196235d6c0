//! Integration tests for tsim-engine: reference scenarios plus
//! conservation, determinism, and partition-invariance checks.

use tsim_core::{LinkId, Mode, SimConfig, SimTime};
use tsim_events::{Event, EventsPublisher, SharedEventBuffer};
use tsim_network::{Network, NetworkBuilder, NetworkChange};
use tsim_population::{Activity, Leg, PlanBuilder, Population};

use crate::{EngineError, SimulationBuilder};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn cfg() -> SimConfig {
    SimConfig {
        start_time: SimTime::ZERO,
        end_time: SimTime(100_000),
        timestep: 1,
        status_interval: 0,
        ..SimConfig::default()
    }
}

/// 2 nodes, one 10 m link at 10 m/s with the given capacities.
fn one_link_net(flow: f64, storage: f64) -> (Network, LinkId) {
    let mut b = NetworkBuilder::new();
    let n0 = b.add_node();
    let n1 = b.add_node();
    let l0 = b.add_link(n0, n1, 10.0, 10.0, flow, storage);
    (b.build(), l0)
}

/// Chain of `n` 100 m links at 10 m/s.
fn chain_net(n: usize, flow: f64, storage: f64) -> (Network, Vec<LinkId>) {
    let mut b = NetworkBuilder::new();
    let mut nodes = vec![b.add_node()];
    let mut links = Vec::new();
    for i in 0..n {
        nodes.push(b.add_node());
        links.push(b.add_link(nodes[i], nodes[i + 1], 100.0, 10.0, flow, storage));
    }
    (b.build(), links)
}

fn car_person(pop: &mut Population, route: Vec<LinkId>, depart: u32) {
    let first = route[0];
    let last = *route.last().unwrap();
    let plan = PlanBuilder::new()
        .activity(Activity::new("home", first, SimTime(depart)))
        .leg(Leg::network(Mode::Car, route))
        .activity(Activity::open_end("work", last))
        .build()
        .unwrap();
    pop.add(plan);
}

fn walk_person(pop: &mut Population, link: LinkId, depart: u32, distance: f64) {
    let plan = PlanBuilder::new()
        .activity(Activity::new("home", link, SimTime(depart)))
        .leg(Leg::teleported(Mode::Walk, distance))
        .activity(Activity::open_end("shop", link))
        .build()
        .unwrap();
    pop.add(plan);
}

fn collecting_publisher(buffer: &SharedEventBuffer) -> EventsPublisher {
    let mut publisher = EventsPublisher::new();
    publisher.add_handler(buffer.clone());
    publisher
}

fn times_of(events: &[Event], kind: &str) -> Vec<u32> {
    events
        .iter()
        .filter(|e| e.kind() == kind)
        .map(|e| e.time().0)
        .collect()
}

/// `(time, person, link)` triples of all arrivals, sorted.
fn arrival_multiset(events: &[Event]) -> Vec<(u32, u32, u32)> {
    let mut out: Vec<(u32, u32, u32)> = events
        .iter()
        .filter_map(|e| match e {
            Event::PersonArrival { time, person, link, .. } => {
                Some((time.0, person.0, link.0))
            }
            _ => None,
        })
        .collect();
    out.sort_unstable();
    out
}

// ── Builder validation ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn empty_population_rejected() {
        let (net, _) = one_link_net(1.0, 10.0);
        let result = SimulationBuilder::new(cfg(), net, Population::new())
            .events(EventsPublisher::new())
            .build();
        assert!(matches!(result, Err(EngineError::EmptyPopulation)));
    }

    #[test]
    fn missing_events_sink_rejected() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        car_person(&mut pop, vec![l0], 0);
        let result = SimulationBuilder::new(cfg(), net, pop).build();
        assert!(matches!(result, Err(EngineError::NoEventsSink)));
    }

    #[test]
    fn zero_timestep_rejected() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        car_person(&mut pop, vec![l0], 0);
        let config = SimConfig { timestep: 0, ..cfg() };
        let result = SimulationBuilder::new(config, net, pop)
            .events(EventsPublisher::new())
            .build();
        assert!(matches!(result, Err(EngineError::ZeroTimestep)));
    }

    #[test]
    fn parallel_publisher_count_checked() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        car_person(&mut pop, vec![l0], 0);
        let config = SimConfig { num_partitions: 2, ..cfg() };
        let result = SimulationBuilder::new(config, net, pop)
            .events(EventsPublisher::new())
            .build_parallel(vec![EventsPublisher::new()]); // expected 2
        assert!(matches!(
            result,
            Err(EngineError::PublisherCount { expected: 2, got: 1 })
        ));
    }
}

// ── Reference scenario: 1-link spillback with 1 veh / 10 s flow ──────────────

#[cfg(test)]
mod spillback_scenario {
    use super::*;

    #[test]
    fn storage_and_flow_space_out_three_vehicles() {
        // storage 1 VE, flow 0.1 VE/s, departures at t = 0, 1, 2
        let (net, l0) = one_link_net(0.1, 1.0);
        let mut pop = Population::new();
        for depart in 0..3 {
            car_person(&mut pop, vec![l0], depart);
        }

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        let summary = sim.run();
        assert_eq!(summary.parked, 3);
        assert_eq!(summary.aborted, 0);

        let events = buffer.snapshot();
        let enters = times_of(&events, "veh_enters_traffic");
        let leaves = times_of(&events, "veh_leaves_traffic");
        assert_eq!(enters.len(), 3);
        assert_eq!(leaves.len(), 3);

        // discharge never beats the 1-per-10 s flow capacity
        for pair in leaves.windows(2) {
            assert!(pair[1] - pair[0] >= 10, "leaves too close: {leaves:?}");
        }
        // the first vehicle enters at its departure time; the others wait
        // for the single storage slot to free up
        assert_eq!(enters[0], 0);
        assert!(enters[1] >= leaves[0], "2nd entered before storage freed");
        assert!(enters[2] >= leaves[1], "3rd entered before storage freed");
    }
}

// ── Reference scenario: teleported leg ───────────────────────────────────────

#[cfg(test)]
mod teleport_scenario {
    use super::*;

    #[test]
    fn bike_leg_bypasses_network() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        // bike 1000 m beeline, no explicit travel time
        let plan = PlanBuilder::new()
            .activity(Activity::new("home", l0, SimTime(100)))
            .leg(Leg::teleported(Mode::Bike, 1_000.0))
            .activity(Activity::open_end("gym", l0))
            .build()
            .unwrap();
        pop.add(plan);

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        let summary = sim.run();
        assert_eq!(summary.parked, 1);

        let events = buffer.snapshot();
        let departures = times_of(&events, "departure");
        let arrivals = times_of(&events, "arrival");
        assert_eq!(departures, vec![100]);
        // 1000 m × 1.3 beeline / 4.17 m/s = 311.8 → 312 s
        assert_eq!(arrivals, vec![412]);
        // no network traffic at all
        assert!(times_of(&events, "link_enter").is_empty());
        assert!(times_of(&events, "link_leave").is_empty());
        assert!(times_of(&events, "veh_enters_traffic").is_empty());
    }

    #[test]
    fn explicit_travel_time_wins_over_speed_model() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        let plan = PlanBuilder::new()
            .activity(Activity::new("home", l0, SimTime(10)))
            .leg(Leg::teleported_timed(Mode::Walk, 5_000.0, 50))
            .activity(Activity::open_end("shop", l0))
            .build()
            .unwrap();
        pop.add(plan);

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        sim.run();
        assert_eq!(times_of(&buffer.snapshot(), "arrival"), vec![60]);
    }
}

// ── Reference scenario: open-ended activity ──────────────────────────────────

#[cfg(test)]
mod open_end_scenario {
    use super::*;

    #[test]
    fn never_ending_activity_parks_the_agent() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        let plan = PlanBuilder::new()
            .activity(Activity::open_end("home", l0))
            .build()
            .unwrap();
        pop.add(plan);

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();

        // never queued, so the loop terminates before its first tick
        assert_eq!(sim.counts().at_activity, 0);
        let summary = sim.run();
        assert_eq!(summary.parked, 1);
        assert_eq!(summary.end_time, SimTime::ZERO);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn finite_last_activity_completes_the_plan() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        let plan = PlanBuilder::new()
            .activity(Activity::new("home", l0, SimTime(10)))
            .build()
            .unwrap();
        pop.add(plan);

        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(EventsPublisher::new())
            .build()
            .unwrap();
        let summary = sim.run();
        assert_eq!(summary.arrived, 1);
        assert_eq!(summary.parked, 0);
    }
}

// ── Per-agent failures ────────────────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::*;

    #[test]
    fn invalid_route_aborts_agent_but_run_continues() {
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        // unreachable link id 99
        car_person(&mut pop, vec![LinkId(99)], 0);
        walk_person(&mut pop, l0, 5, 100.0);

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        let summary = sim.run();

        assert_eq!(summary.aborted, 1);
        assert_eq!(summary.parked, 1); // the walker finished its plan
        assert_eq!(times_of(&buffer.snapshot(), "stuck").len(), 1);
    }

    #[test]
    fn horizon_cutoff_flushes_stragglers_as_stuck() {
        // 1000 m at 1 m/s: nobody finishes before the 10 s horizon
        let mut b = NetworkBuilder::new();
        let n0 = b.add_node();
        let n1 = b.add_node();
        let l0 = b.add_link(n0, n1, 1_000.0, 1.0, 1.0, 1.0);
        let net = b.build();

        let mut pop = Population::new();
        car_person(&mut pop, vec![l0], 0); // on the link at cutoff
        car_person(&mut pop, vec![l0], 1); // deferred: link storage is full
        walk_person(&mut pop, l0, 50, 100.0); // still at its activity

        let buffer = SharedEventBuffer::new();
        let config = SimConfig { end_time: SimTime(10), ..cfg() };
        let mut sim = SimulationBuilder::new(config, net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        let summary = sim.run();

        assert_eq!(summary.arrived, 0);
        assert_eq!(summary.aborted, 3);
        assert_eq!(summary.end_time, SimTime(10));
        assert_eq!(times_of(&buffer.snapshot(), "stuck").len(), 3);
    }
}

// ── Time-variant network changes ─────────────────────────────────────────────

#[cfg(test)]
mod network_changes {
    use super::*;

    #[test]
    fn freespeed_change_delays_traversal() {
        // 10 m link, normally 1 s; throttled to 0.1 m/s before anyone departs
        let (net, l0) = one_link_net(1.0, 10.0);
        let mut pop = Population::new();
        car_person(&mut pop, vec![l0], 5);

        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .network_changes(vec![NetworkChange::freespeed(SimTime::ZERO, l0, 0.1)])
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        sim.run();

        let leaves = times_of(&buffer.snapshot(), "veh_leaves_traffic");
        assert_eq!(leaves.len(), 1);
        // entered at t=5, 100 s traversal at the throttled speed
        assert!(leaves[0] >= 105, "left too early at {}", leaves[0]);
    }
}

// ── Conservation ──────────────────────────────────────────────────────────────

/// Cars over a shared chain, two teleported walks, one agent parked from
/// the start, one that just completes its plan.  Settles well before tick
/// 600.
fn mixed_scenario() -> (Network, Population) {
    let (net, links) = chain_net(5, 0.5, 4.0);
    let mut pop = Population::new();
    for i in 0..6 {
        let start = i % 3;
        car_person(&mut pop, links[start..].to_vec(), (i as u32) * 7);
    }
    walk_person(&mut pop, links[0], 3, 400.0);
    walk_person(&mut pop, links[2], 20, 300.0);
    pop.add(
        PlanBuilder::new()
            .activity(Activity::open_end("home", links[0]))
            .build()
            .unwrap(),
    );
    pop.add(
        PlanBuilder::new()
            .activity(Activity::new("home", links[1], SimTime(40)))
            .build()
            .unwrap(),
    );
    (net, pop)
}

#[cfg(test)]
mod conservation {
    use super::*;

    #[test]
    fn agent_sets_partition_population_every_tick() {
        let (net, pop) = mixed_scenario();
        let total = pop.len();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(EventsPublisher::new())
            .build()
            .unwrap();

        for _ in 0..600 {
            sim.run_ticks(1);
            let counts = sim.counts();
            assert_eq!(counts.sum(), total, "agents leaked at {}", sim.now());
            assert_eq!(
                counts.on_network,
                sim.network_vehicle_count(),
                "network counter drifted at {}",
                sim.now()
            );
        }
        // by now everyone has settled
        let counts = sim.counts();
        assert_eq!(counts.on_network, 0);
        assert_eq!(counts.teleporting, 0);
        assert_eq!(counts.at_activity, 0);
        assert_eq!(counts.arrived + counts.parked, total);
    }

    #[test]
    fn storage_invariant_holds_every_tick() {
        let (net, pop) = mixed_scenario();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(EventsPublisher::new())
            .build()
            .unwrap();
        for _ in 0..600 {
            sim.run_ticks(1);
            for link in sim.partition().links() {
                assert!(
                    link.used_storage() <= link.storage_capacity() + 1e-9,
                    "storage exceeded on {:?} at {}",
                    link,
                    sim.now()
                );
            }
        }
    }
}

// ── Determinism ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod determinism {
    use super::*;

    fn run_once() -> Vec<Event> {
        let (net, pop) = mixed_scenario();
        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        sim.run();
        buffer.snapshot()
    }

    #[test]
    fn identical_runs_produce_identical_event_streams() {
        let first = run_once();
        let second = run_once();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}

// ── Parallel engine ───────────────────────────────────────────────────────────

#[cfg(test)]
mod parallel {
    use super::*;

    /// 5-link chain with enough storage that admission never races.
    fn scenario() -> (Network, Population) {
        let (net, links) = chain_net(5, 1.0, 50.0);
        let mut pop = Population::new();
        for i in 0..8 {
            let start = i % 3;
            car_person(&mut pop, links[start..].to_vec(), (i as u32) * 5);
        }
        walk_person(&mut pop, links[0], 2, 300.0);
        walk_person(&mut pop, links[4], 11, 700.0);
        (net, pop)
    }

    /// Run with `partitions` workers; returns (summary arrived, all-context
    /// event snapshots, merged arrival multiset).
    fn run_parallel(
        partitions: usize,
    ) -> (usize, Vec<Vec<Event>>, Vec<(u32, u32, u32)>) {
        let (net, pop) = scenario();
        let config = SimConfig { num_partitions: partitions, ..cfg() };

        let buffers: Vec<SharedEventBuffer> =
            (0..=partitions).map(|_| SharedEventBuffer::new()).collect();
        let worker_events: Vec<EventsPublisher> = buffers[..partitions]
            .iter()
            .map(collecting_publisher)
            .collect();

        let sim = SimulationBuilder::new(config, net, pop)
            .events(collecting_publisher(&buffers[partitions]))
            .build_parallel(worker_events)
            .unwrap();
        let summary = sim.run();

        let snapshots: Vec<Vec<Event>> = buffers.iter().map(|b| b.snapshot()).collect();
        let merged: Vec<Event> = snapshots.iter().flatten().cloned().collect();
        (summary.arrived + summary.parked, snapshots, arrival_multiset(&merged))
    }

    #[test]
    fn single_partition_matches_single_threaded_engine() {
        let (net, pop) = scenario();
        let buffer = SharedEventBuffer::new();
        let mut sim = SimulationBuilder::new(cfg(), net, pop)
            .events(collecting_publisher(&buffer))
            .build()
            .unwrap();
        sim.run();
        let reference = arrival_multiset(&buffer.snapshot());

        let (_, _, parallel) = run_parallel(1);
        assert_eq!(reference, parallel);
    }

    #[test]
    fn partition_count_does_not_change_arrivals() {
        let (done1, _, arrivals1) = run_parallel(1);
        let (done3, _, arrivals3) = run_parallel(3);
        assert_eq!(done1, done3);
        assert!(!arrivals1.is_empty());
        assert_eq!(arrivals1, arrivals3);
    }

    #[test]
    fn fixed_partition_count_is_deterministic() {
        let (_, first, _) = run_parallel(3);
        let (_, second, _) = run_parallel(3);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a, b);
        }
    }
}

// ── TimeQueue ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod time_queue {
    use crate::TimeQueue;
    use tsim_core::SimTime;

    #[test]
    fn pops_in_time_order() {
        let mut q = TimeQueue::new();
        q.push(SimTime(30), "c");
        q.push(SimTime(10), "a");
        q.push(SimTime(20), "b");
        assert_eq!(q.peek_time(), Some(SimTime(10)));
        assert_eq!(q.pop_due(SimTime(25)), Some("a"));
        assert_eq!(q.pop_due(SimTime(25)), Some("b"));
        assert_eq!(q.pop_due(SimTime(25)), None); // "c" not due yet
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut q = TimeQueue::new();
        for label in ["first", "second", "third"] {
            q.push(SimTime(5), label);
        }
        assert_eq!(q.pop_due(SimTime(5)), Some("first"));
        assert_eq!(q.pop_due(SimTime(5)), Some("second"));
        assert_eq!(q.pop_due(SimTime(5)), Some("third"));
        assert!(q.is_empty());
    }

    #[test]
    fn drain_returns_everything_earliest_first() {
        let mut q = TimeQueue::new();
        q.push(SimTime(9), 9);
        q.push(SimTime(1), 1);
        q.push(SimTime(5), 5);
        assert_eq!(q.drain(), vec![1, 5, 9]);
        assert!(q.is_empty());
    }
}
