use crossroad_sim::{
    spawn_aggregator, spawn_crossroad, spawn_dispatcher, Address, Aggregator, Crossroad,
    CrossroadConfig, Direction, Dispatcher, Key, Mailbox, Message, NetworkBuilder, PhaseSchema,
    Policy, Topology, Vehicle,
};
use itertools::iproduct;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

/// Demo settings, overridable with a JSON file passed as the first
/// argument.
#[derive(Deserialize)]
#[serde(default)]
struct DemoConfig {
    rows: usize,
    cols: usize,
    run_secs: f64,
    arrivals_per_sec: f64,
    starvation_timeout: f64,
    policy: Policy,
    crossroad: CrossroadConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            run_secs: 20.0,
            arrivals_per_sec: 2.0,
            starvation_timeout: 15.0,
            policy: Policy::LongestQueue,
            crossroad: CrossroadConfig {
                release_period: 0.5,
                report_interval: 1.0,
                phase_timeout: 4.0,
                ..Default::default()
            },
        }
    }
}

fn main() {
    env_logger::init();
    let config: DemoConfig = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap(),
        None => DemoConfig::default(),
    };

    let mut builder = NetworkBuilder::new();
    let dispatcher_mailbox = builder.register();
    let monitor_mailbox = builder.register();
    let monitor_addr = monitor_mailbox.addr;
    let cells: Vec<Mailbox> = (0..config.rows * config.cols)
        .map(|_| builder.register())
        .collect();
    let aggregator_mailboxes: Vec<Mailbox> = (0..cells.len()).map(|_| builder.register()).collect();

    let mut topology = Topology::new();
    for (row, col) in iproduct!(0..config.rows, 0..config.cols) {
        let here = cells[row * config.cols + col].addr;
        if col + 1 < config.cols {
            topology.connect(here, Direction::East, cells[row * config.cols + col + 1].addr);
        }
        if row + 1 < config.rows {
            topology.connect(here, Direction::South, cells[(row + 1) * config.cols + col].addr);
        }
    }

    let net = builder.build();
    let dispatcher = spawn_dispatcher(Dispatcher::new(), dispatcher_mailbox);
    let monitor = thread::spawn(move || loop {
        match monitor_mailbox.rx.recv() {
            Ok(packet) => match Message::decode(&packet.body) {
                Ok(Message::QueueUpdate { lengths, active_phase }) => {
                    let waiting: usize = lengths.iter().map(|(_, n)| n).sum();
                    debug!(
                        "{:?}: {} waiting, phase {}",
                        packet.from, waiting, active_phase.0
                    );
                }
                Ok(Message::Shutdown) => break,
                _ => {}
            },
            Err(_) => break,
        }
    });

    let schema = PhaseSchema::two_phase();
    let mut crossroads = Vec::new();
    let mut aggregators = Vec::new();
    for (cell, aggregator_mailbox) in cells.into_iter().zip(aggregator_mailboxes) {
        let aggregator = Aggregator::new(
            schema.clone(),
            config.policy,
            Duration::from_secs_f64(config.starvation_timeout),
            Instant::now(),
        );
        let crossroad = Crossroad::new(
            cell.addr,
            topology.neighbors(cell.addr),
            dispatcher.addr,
            aggregator_mailbox.addr,
            schema.clone(),
            config.crossroad.clone(),
        )
        .with_monitor(monitor_addr);
        aggregators.push(spawn_aggregator(aggregator, aggregator_mailbox, net.clone()));
        crossroads.push(spawn_crossroad(crossroad, cell, net.clone()));
    }
    info!(
        "simulating a {}x{} grid for {}s",
        config.rows, config.cols, config.run_secs
    );

    // random arrivals with exponential gaps, the whole run long
    let mut rng = rand::thread_rng();
    let gap = Exp::new(config.arrivals_per_sec).unwrap();
    let deadline = Instant::now() + Duration::from_secs_f64(config.run_secs);
    let entries: Vec<Address> = crossroads.iter().map(|handle| handle.addr).collect();
    let mut generated = 0u64;
    while Instant::now() < deadline {
        thread::sleep(Duration::from_secs_f64(gap.sample(&mut rng)));
        let entry = *entries.choose(&mut rng).unwrap();
        let origin = *Direction::ALL.choose(&mut rng).unwrap();
        let hops = rng.gen_range(1..=4);
        let path: Vec<Direction> = (0..hops)
            .map(|_| *Direction::ALL.choose(&mut rng).unwrap())
            .collect();
        generated += 1;
        let vehicle = Vehicle::new(generated, entry, origin, path);
        if let Err(err) = net.send(Address::null(), entry, &Message::Move { vehicle }) {
            warn!("arrival lost: {}", err);
        }
    }
    info!("generated {} vehicles", generated);

    for handle in crossroads {
        handle.stop(&net);
    }
    for handle in aggregators {
        handle.stop(&net);
    }
    let dispatcher = dispatcher.stop(&net);
    let _ = net.send(Address::null(), monitor_addr, &Message::Shutdown);
    monitor.join().unwrap();

    let stats = dispatcher.stats();
    println!(
        "{} of {} vehicles dispatched | transit mean {:.1}s min {:.1}s max {:.1}s",
        stats.count, generated, stats.mean_transit, stats.min_transit, stats.max_transit
    );
}
