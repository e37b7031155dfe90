//! End-to-end test of a threaded 2x2 grid.

use crossroad_sim::{
    spawn_aggregator, spawn_crossroad, spawn_dispatcher, Address, Aggregator, Crossroad,
    CrossroadConfig, Direction, Dispatcher, Key, Mailbox, Message, NetworkBuilder, PhaseSchema,
    Policy, Topology, Vehicle,
};
use std::thread;
use std::time::{Duration, Instant};

/// Vehicles injected at every corner of a running grid all reach the
/// dispatcher: each hop either lands at a neighbor or exits at the
/// boundary, and the schedule keeps every queue moving.
#[test]
fn every_vehicle_eventually_exits() {
    let mut builder = NetworkBuilder::new();
    let dispatcher_mailbox = builder.register();
    let cells: Vec<Mailbox> = (0..4).map(|_| builder.register()).collect();
    let aggregator_mailboxes: Vec<Mailbox> = (0..4).map(|_| builder.register()).collect();

    let mut topology = Topology::new();
    topology.connect(cells[0].addr, Direction::East, cells[1].addr);
    topology.connect(cells[2].addr, Direction::East, cells[3].addr);
    topology.connect(cells[0].addr, Direction::South, cells[2].addr);
    topology.connect(cells[1].addr, Direction::South, cells[3].addr);
    let net = builder.build();

    let config = CrossroadConfig {
        release_period: 0.02,
        report_interval: 0.05,
        phase_timeout: 0.1,
        ..Default::default()
    };
    let schema = PhaseSchema::two_phase();
    let dispatcher = spawn_dispatcher(Dispatcher::new(), dispatcher_mailbox);
    let mut crossroads = Vec::new();
    let mut aggregators = Vec::new();
    for (cell, aggregator_mailbox) in cells.into_iter().zip(aggregator_mailboxes) {
        let aggregator = Aggregator::new(
            schema.clone(),
            Policy::LongestQueue,
            Duration::from_secs(1),
            Instant::now(),
        );
        let crossroad = Crossroad::new(
            cell.addr,
            topology.neighbors(cell.addr),
            dispatcher.addr,
            aggregator_mailbox.addr,
            schema.clone(),
            config.clone(),
        );
        aggregators.push(spawn_aggregator(aggregator, aggregator_mailbox, net.clone()));
        crossroads.push(spawn_crossroad(crossroad, cell, net.clone()));
    }

    let paths: [&[Direction]; 3] = [
        &[Direction::East],
        &[Direction::South, Direction::East],
        &[],
    ];
    let mut injected = 0u64;
    for (i, handle) in crossroads.iter().enumerate() {
        for (j, path) in paths.iter().enumerate() {
            injected += 1;
            let origin = Direction::ALL[(i + j) % 4];
            let vehicle = Vehicle::new(injected, handle.addr, origin, path.iter().copied());
            net.send(Address::null(), handle.addr, &Message::Move { vehicle })
                .unwrap();
        }
    }

    // worst case is three hops, each waiting out at most one rotation
    thread::sleep(Duration::from_secs(3));

    for handle in crossroads {
        handle.stop(&net);
    }
    for handle in aggregators {
        handle.stop(&net);
    }
    let dispatcher = dispatcher.stop(&net);
    assert_eq!(dispatcher.count() as u64, injected);
    let stats = dispatcher.stats();
    assert_eq!(stats.count as u64, injected);
    assert!(stats.mean_transit >= 0.0);
    assert!(stats.max_transit >= stats.min_transit);
}
