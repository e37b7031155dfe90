//! One thread per node, each a single event loop over its mailbox.
//!
//! A controller's periodic duties (release, report, phase rotation) are
//! monotonic deadlines checked after every receive; the receive itself
//! is bounded by the earliest deadline, so a quiet mailbox never stalls
//! the schedule and a timeout is an expected outcome, not an error.

use crate::aggregator::Aggregator;
use crate::crossroad::{Crossroad, Handled};
use crate::dispatcher::Dispatcher;
use crate::network::{Mailbox, Network};
use crate::protocol::Message;
use crate::util::unix_time;
use crate::Address;
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use slotmap::Key;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long an aggregator or dispatcher sleeps between mailbox checks.
const IDLE_TICK: Duration = Duration::from_millis(250);

/// A controller thread and the address it answers on.
pub struct CrossroadHandle {
    /// The node's mailbox address.
    pub addr: Address,
    thread: JoinHandle<Crossroad>,
}

/// An aggregator thread and the address it answers on.
pub struct AggregatorHandle {
    /// The aggregator's mailbox address.
    pub addr: Address,
    thread: JoinHandle<Aggregator>,
}

/// A dispatcher thread and the address it answers on.
pub struct DispatcherHandle {
    /// The sink's mailbox address.
    pub addr: Address,
    thread: JoinHandle<Dispatcher>,
}

impl CrossroadHandle {
    /// Requests shutdown and returns the final controller state.
    pub fn stop(self, net: &Network) -> Crossroad {
        request_shutdown(net, self.addr);
        join(self.thread)
    }
}

impl AggregatorHandle {
    /// Requests shutdown and returns the final aggregator state.
    pub fn stop(self, net: &Network) -> Aggregator {
        request_shutdown(net, self.addr);
        join(self.thread)
    }
}

impl DispatcherHandle {
    /// Requests shutdown and returns the dispatch log.
    pub fn stop(self, net: &Network) -> Dispatcher {
        request_shutdown(net, self.addr);
        join(self.thread)
    }
}

fn request_shutdown(net: &Network, addr: Address) {
    if let Err(err) = net.send(Address::null(), addr, &Message::Shutdown) {
        warn!("shutdown request to {:?} failed: {}", addr, err);
    }
}

fn join<T>(thread: JoinHandle<T>) -> T {
    thread
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

/// Spawns a controller on its own thread.
pub fn spawn_crossroad(crossroad: Crossroad, mailbox: Mailbox, net: Network) -> CrossroadHandle {
    let addr = mailbox.addr;
    let thread = thread::spawn(move || run_crossroad(crossroad, mailbox, net));
    CrossroadHandle { addr, thread }
}

/// Spawns an aggregator on its own thread.
pub fn spawn_aggregator(aggregator: Aggregator, mailbox: Mailbox, net: Network) -> AggregatorHandle {
    let addr = mailbox.addr;
    let thread = thread::spawn(move || run_aggregator(aggregator, mailbox, net));
    AggregatorHandle { addr, thread }
}

/// Spawns a dispatcher on its own thread.
pub fn spawn_dispatcher(dispatcher: Dispatcher, mailbox: Mailbox) -> DispatcherHandle {
    let addr = mailbox.addr;
    let thread = thread::spawn(move || run_dispatcher(dispatcher, mailbox));
    DispatcherHandle { addr, thread }
}

/// Drives a controller's mailbox and periodic duties until shutdown.
fn run_crossroad(mut crossroad: Crossroad, mailbox: Mailbox, net: Network) -> Crossroad {
    let release_period = Duration::from_secs_f64(crossroad.config().release_period);
    let report_interval = Duration::from_secs_f64(crossroad.config().report_interval);
    let phase_timeout = Duration::from_secs_f64(crossroad.config().phase_timeout);
    let mut next_release = Instant::now() + release_period;
    let mut next_report = Instant::now() + report_interval;
    let mut phase_deadline = Instant::now() + phase_timeout;
    info!("{:?}: crossroad up", mailbox.addr);
    loop {
        let deadline = next_release.min(next_report).min(phase_deadline);
        match mailbox.rx.recv_deadline(deadline) {
            Ok(packet) => match crossroad.handle_packet(&packet, &net) {
                Ok(Handled::Shutdown) => break,
                Ok(Handled::PhaseChanged) => {
                    phase_deadline = Instant::now() + phase_timeout;
                }
                Ok(Handled::Continue) => {}
                // one bad message never halts the node
                Err(err) => warn!(
                    "{:?}: dropping message from {:?}: {}",
                    mailbox.addr, packet.from, err
                ),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        if now >= next_release {
            crossroad.release_tick(&net);
            next_release = now + release_period;
        }
        if now >= next_report {
            crossroad.send_report(&net);
            next_report = now + report_interval;
        }
        if now >= phase_deadline {
            // no differing recommendation arrived in time
            crossroad.rotate_phase(&net);
            phase_deadline = now + phase_timeout;
        }
    }
    let left = crossroad.queued();
    if left > 0 {
        info!("{:?}: stopping with {} vehicles queued", mailbox.addr, left);
    }
    crossroad
}

/// Answers status reports with recommendations until shutdown.
fn run_aggregator(mut aggregator: Aggregator, mailbox: Mailbox, net: Network) -> Aggregator {
    loop {
        match mailbox.rx.recv_timeout(IDLE_TICK) {
            Ok(packet) => match Message::decode(&packet.body) {
                Ok(Message::StatusReport(snapshot)) => {
                    match aggregator.recommend(&snapshot, unix_time(), Instant::now()) {
                        Ok(phase) => {
                            let reply = Message::Recommendation { phase };
                            if let Err(err) = net.send(mailbox.addr, packet.from, &reply) {
                                warn!("{:?}: recommendation lost: {}", mailbox.addr, err);
                            }
                        }
                        Err(err) => warn!(
                            "{:?}: rejecting snapshot from {:?}: {}",
                            mailbox.addr, packet.from, err
                        ),
                    }
                }
                Ok(Message::Shutdown) => break,
                Ok(_) => warn!(
                    "{:?}: unexpected message from {:?}",
                    mailbox.addr, packet.from
                ),
                Err(err) => warn!(
                    "{:?}: dropping message from {:?}: {}",
                    mailbox.addr, packet.from, err
                ),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    aggregator
}

/// Collects dispatched vehicles until shutdown.
fn run_dispatcher(mut dispatcher: Dispatcher, mailbox: Mailbox) -> Dispatcher {
    loop {
        match mailbox.rx.recv_timeout(IDLE_TICK) {
            Ok(packet) => match Message::decode(&packet.body) {
                Ok(Message::Move { vehicle }) => dispatcher.receive(vehicle, unix_time()),
                Ok(Message::Shutdown) => break,
                Ok(_) => warn!(
                    "{:?}: unexpected message from {:?}",
                    mailbox.addr, packet.from
                ),
                Err(err) => warn!(
                    "{:?}: dropping message from {:?}: {}",
                    mailbox.addr, packet.from, err
                ),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("{:?}: {} vehicles dispatched", mailbox.addr, dispatcher.count());
    dispatcher
}
