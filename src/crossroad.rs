use crate::direction::{Direction, DirectionMap};
use crate::network::Network;
use crate::phase::{PhaseId, PhaseSchema};
use crate::protocol::{Message, Packet, ProtocolError, Snapshot};
use crate::vehicle::Vehicle;
use crate::Address;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::VecDeque;

/// Timing and capacity settings for one intersection.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CrossroadConfig {
    /// The phase active at startup.
    pub initial_phase: PhaseId,
    /// Seconds between release attempts.
    pub release_period: f64,
    /// Seconds between status reports to the aggregator.
    pub report_interval: f64,
    /// Seconds to wait for a recommendation before rotating phases.
    pub phase_timeout: f64,
    /// Per-queue capacity; `None` queues without bound.
    pub queue_capacity: Option<usize>,
}

impl Default for CrossroadConfig {
    fn default() -> Self {
        Self {
            initial_phase: PhaseId(0),
            release_period: 2.0,
            report_interval: 3.0,
            phase_timeout: 10.0,
            queue_capacity: None,
        }
    }
}

/// What an inbound packet asked the node to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handled {
    /// Routine traffic; carry on.
    Continue,
    /// The active phase changed; the phase timer restarts.
    PhaseChanged,
    /// The operator asked the node to stop.
    Shutdown,
}

/// One signalized intersection: four vehicle queues and a light schedule.
///
/// All state is owned by the single thread driving the crossroad; peers
/// interact with it only through messages.
pub struct Crossroad {
    /// This node's mailbox address.
    addr: Address,
    /// Neighboring intersections; `None` marks the edge of the network.
    neighbors: DirectionMap<Option<Address>>,
    /// The sink collecting vehicles that leave the network.
    dispatcher: Address,
    /// The aggregator steering this intersection's schedule.
    aggregator: Address,
    /// Optional best-effort sink for queue-state updates.
    monitor: Option<Address>,
    /// Waiting vehicles, per entry direction.
    queues: DirectionMap<VecDeque<Vehicle>>,
    /// The signal schedule.
    schema: PhaseSchema,
    /// The active phase.
    active: PhaseId,
    config: CrossroadConfig,
}

impl Crossroad {
    /// Creates a crossroad with the given neighbors and schedule.
    pub fn new(
        addr: Address,
        neighbors: DirectionMap<Option<Address>>,
        dispatcher: Address,
        aggregator: Address,
        schema: PhaseSchema,
        config: CrossroadConfig,
    ) -> Self {
        let active = if schema.contains(config.initial_phase) {
            config.initial_phase
        } else {
            warn!(
                "{:?}: initial phase {} not in schema, starting at 0",
                addr, config.initial_phase.0
            );
            PhaseId(0)
        };
        Self {
            addr,
            neighbors,
            dispatcher,
            aggregator,
            monitor: None,
            queues: Default::default(),
            schema,
            active,
            config,
        }
    }

    /// Attaches a queue-state monitor.
    pub fn with_monitor(mut self, monitor: Address) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// This node's mailbox address.
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// The active phase.
    pub fn active_phase(&self) -> PhaseId {
        self.active
    }

    /// The number of vehicles waiting in one queue.
    pub fn queue_len(&self, dir: Direction) -> usize {
        self.queues[dir].len()
    }

    /// The total number of vehicles waiting at the intersection.
    pub fn queued(&self) -> usize {
        self.queues.iter().map(|(_, q)| q.len()).sum()
    }

    /// The timing configuration.
    pub fn config(&self) -> &CrossroadConfig {
        &self.config
    }

    /// Decodes and applies one inbound packet.
    ///
    /// A decode or validation failure leaves all state untouched; the
    /// caller logs and drops the packet.
    pub fn handle_packet(&mut self, packet: &Packet, net: &Network) -> Result<Handled, ProtocolError> {
        match Message::decode(&packet.body)? {
            Message::Move { vehicle } => {
                self.route_arrival(vehicle, packet.from);
                Ok(Handled::Continue)
            }
            Message::Recommendation { phase } => {
                if !self.schema.contains(phase) {
                    return Err(ProtocolError::UnknownPhase(phase.0));
                }
                if phase != self.active {
                    self.enter_phase(phase, net);
                    Ok(Handled::PhaseChanged)
                } else {
                    Ok(Handled::Continue)
                }
            }
            Message::Shutdown => Ok(Handled::Shutdown),
            Message::StatusReport(_) | Message::QueueUpdate { .. } => {
                warn!("{:?}: unexpected message from {:?}", self.addr, packet.from);
                Ok(Handled::Continue)
            }
        }
    }

    /// Enqueues an arriving vehicle.
    ///
    /// A vehicle from a known neighbor joins the queue facing that
    /// neighbor; anything else (generator traffic) joins the queue its
    /// record declares as the entry direction.
    fn route_arrival(&mut self, vehicle: Vehicle, from: Address) {
        let queue = self
            .neighbors
            .iter()
            .find(|(_, neighbor)| **neighbor == Some(from))
            .map(|(dir, _)| dir)
            .unwrap_or(vehicle.origin_direction);
        if let Some(capacity) = self.config.queue_capacity {
            if self.queues[queue].len() >= capacity {
                warn!(
                    "{:?}: queue {} full, dropping vehicle {}",
                    self.addr, queue, vehicle.id
                );
                return;
            }
        }
        debug!("{:?}: vehicle {} joins queue {}", self.addr, vehicle.id, queue);
        self.queues[queue].push_back(vehicle);
    }

    /// Releases at most one vehicle from each queue the active phase
    /// permits.
    ///
    /// The head of a queue is never skipped: if its next hop is not
    /// served by the active phase it keeps its place, and everything
    /// behind it waits. A vehicle is removed from its queue only once
    /// the forwarding send has succeeded.
    pub fn release_tick(&mut self, net: &Network) {
        let rules = match self.schema.get(self.active) {
            Some(spec) => spec.rules.clone(),
            None => return,
        };
        for rule in &rules {
            let prepared = match self.queues[rule.queue].front() {
                Some(head) => match head.next_hop() {
                    // end of route: leave the network via the dispatcher
                    None => Some((self.dispatcher, head.clone())),
                    Some(exit) if rule.exits.contains(exit) => {
                        let mut vehicle = head.clone();
                        vehicle.take_hop();
                        // a missing neighbor is the network edge
                        let to = self.neighbors[exit].unwrap_or(self.dispatcher);
                        Some((to, vehicle))
                    }
                    Some(_) => None,
                },
                None => None,
            };
            if let Some((to, vehicle)) = prepared {
                let id = vehicle.id;
                match net.send(self.addr, to, &Message::Move { vehicle }) {
                    Ok(()) => {
                        self.queues[rule.queue].pop_front();
                        debug!("{:?}: released vehicle {} to {:?}", self.addr, id, to);
                    }
                    Err(err) => {
                        warn!("{:?}: failed to forward vehicle {}: {}", self.addr, id, err);
                    }
                }
            }
        }
    }

    /// Falls back to the next phase in rotation after a recommendation
    /// timeout.
    pub fn rotate_phase(&mut self, net: &Network) {
        let next = self.schema.successor(self.active);
        self.enter_phase(next, net);
    }

    /// Activates `phase` and publishes the change.
    fn enter_phase(&mut self, phase: PhaseId, net: &Network) {
        self.active = phase;
        info!("{:?}: lights now {}", self.addr, self.schema.name(phase));
        self.publish_state(net);
    }

    /// Snapshots the queues and reports them to the aggregator.
    pub fn send_report(&mut self, net: &Network) {
        let snapshot = Snapshot {
            queues: DirectionMap::from_fn(|dir| self.queues[dir].iter().cloned().collect()),
            active_phase: self.active,
        };
        if let Err(err) = net.send(self.addr, self.aggregator, &Message::StatusReport(snapshot)) {
            warn!("{:?}: status report failed: {}", self.addr, err);
        }
        self.publish_state(net);
    }

    /// Best-effort queue-length update for an attached monitor.
    fn publish_state(&self, net: &Network) {
        if let Some(monitor) = self.monitor {
            let lengths = DirectionMap::from_fn(|dir| self.queues[dir].len());
            let update = Message::QueueUpdate {
                lengths,
                active_phase: self.active,
            };
            // correctness never depends on the monitor hearing this
            let _ = net.send(self.addr, monitor, &update);
        }
    }
}
