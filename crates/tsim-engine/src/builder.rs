//! `SimulationBuilder` — validated construction for both engines.
//!
//! Missing collaborators are build-time failures (`EngineError`), never
//! mid-run surprises: an engine that builds will run.

use tsim_core::SimConfig;
use tsim_events::EventsPublisher;
use tsim_network::{build_partitions, Network, NetworkChange};
use tsim_population::Population;

use crate::dispatcher::AgentDispatcher;
use crate::{EngineError, EngineResult, ParallelSimulation, Simulation};

/// Builder shared by [`Simulation`] and [`ParallelSimulation`].
///
/// # Example
///
/// ```rust,ignore
/// let mut events = EventsPublisher::new();
/// events.add_handler(my_sink);
/// let mut sim = SimulationBuilder::new(config, network, population)
///     .events(events)
///     .build()?;
/// let summary = sim.run();
/// ```
pub struct SimulationBuilder {
    config: SimConfig,
    network: Network,
    population: Population,
    changes: Vec<NetworkChange>,
    events: Option<EventsPublisher>,
}

impl SimulationBuilder {
    pub fn new(config: SimConfig, network: Network, population: Population) -> Self {
        Self {
            config,
            network,
            population,
            changes: Vec::new(),
            events: None,
        }
    }

    /// Supply the time-variant network change feed (any order; the records
    /// are routed and sorted per partition at build time).
    pub fn network_changes(mut self, changes: Vec<NetworkChange>) -> Self {
        self.changes = changes;
        self
    }

    /// Supply the events sink.  Required for [`build`](Self::build); for
    /// [`build_parallel`](Self::build_parallel) this is the coordinator's
    /// publisher.
    pub fn events(mut self, events: EventsPublisher) -> Self {
        self.events = Some(events);
        self
    }

    fn validate(&self) -> EngineResult<()> {
        if self.config.timestep == 0 {
            return Err(EngineError::ZeroTimestep);
        }
        if self.population.is_empty() {
            return Err(EngineError::EmptyPopulation);
        }
        if self.events.is_none() {
            return Err(EngineError::NoEventsSink);
        }
        Ok(())
    }

    /// Build the single-threaded engine (`num_partitions` is ignored; the
    /// whole network forms one partition).
    pub fn build(self) -> EngineResult<Simulation> {
        self.validate()?;

        let config = SimConfig { num_partitions: 1, ..self.config };
        let (mut partitions, hub) = build_partitions(&self.network, &config, self.changes);
        let dispatcher = AgentDispatcher::new(self.population, &self.network, config.clone());

        Ok(Simulation {
            now: config.start_time,
            next_status: config.start_time,
            config,
            dispatcher,
            partition: partitions.remove(0),
            net_hub: hub.for_context(0),
            hub,
            events: self.events.expect("validated"),
        })
    }

    /// Build the partitioned engine with `config.num_partitions` workers.
    ///
    /// `worker_events` supplies one publisher per worker partition, in
    /// partition order; the coordinator's publisher comes from
    /// [`events`](Self::events).
    pub fn build_parallel(
        self,
        worker_events: Vec<EventsPublisher>,
    ) -> EngineResult<ParallelSimulation> {
        self.validate()?;

        let num_partitions = self.config.num_partitions.max(1);
        if worker_events.len() != num_partitions {
            return Err(EngineError::PublisherCount {
                expected: num_partitions,
                got: worker_events.len(),
            });
        }

        let config = SimConfig { num_partitions, ..self.config };
        let (partitions, hub) = build_partitions(&self.network, &config, self.changes);
        let dispatcher = AgentDispatcher::new(self.population, &self.network, config.clone());

        Ok(ParallelSimulation {
            now: config.start_time,
            next_status: config.start_time,
            config,
            dispatcher,
            partitions,
            worker_events,
            hub,
            events: self.events.expect("validated"),
        })
    }
}
