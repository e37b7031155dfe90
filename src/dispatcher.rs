use crate::vehicle::Vehicle;
use itertools::{Itertools, MinMaxResult};
use log::debug;

/// Collects vehicles leaving the network and keeps exit statistics.
///
/// Sits at every network edge: controllers forward here when a route is
/// exhausted or points off the grid.
#[derive(Default)]
pub struct Dispatcher {
    dispatched: Vec<Vehicle>,
}

/// Transit-time summary of everything dispatched so far.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DispatchStats {
    /// Vehicles dispatched.
    pub count: usize,
    /// Mean seconds from creation to dispatch.
    pub mean_transit: f64,
    /// Fastest transit, in seconds.
    pub min_transit: f64,
    /// Slowest transit, in seconds.
    pub max_transit: f64,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a vehicle exiting the network at `now_secs`.
    pub fn receive(&mut self, mut vehicle: Vehicle, now_secs: f64) {
        vehicle.dispatched_at = Some(now_secs);
        debug!(
            "dispatched vehicle {} after {:.1}s, {} in total",
            vehicle.id,
            vehicle.age(now_secs),
            self.dispatched.len() + 1
        );
        self.dispatched.push(vehicle);
    }

    /// The number of vehicles dispatched.
    pub fn count(&self) -> usize {
        self.dispatched.len()
    }

    /// The dispatched vehicles, in arrival order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.dispatched
    }

    /// Summary statistics over everything dispatched so far.
    pub fn stats(&self) -> DispatchStats {
        let transits: Vec<f64> = self
            .dispatched
            .iter()
            .filter_map(|v| v.dispatched_at.map(|t| t - v.created_at))
            .collect();
        if transits.is_empty() {
            return DispatchStats::default();
        }
        let mean = transits.iter().sum::<f64>() / transits.len() as f64;
        let (min, max) = match transits.iter().copied().minmax() {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(only) => (only, only),
            MinMaxResult::NoElements => (0.0, 0.0),
        };
        DispatchStats {
            count: transits.len(),
            mean_transit: mean,
            min_transit: min,
            max_transit: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use crate::Address;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::Key;

    fn vehicle(id: u64, created_at: f64) -> Vehicle {
        let mut v = Vehicle::new(id, Address::null(), Direction::North, []);
        v.created_at = created_at;
        v
    }

    #[test]
    fn receive_stamps_the_exit_time() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.receive(vehicle(1, 10.0), 25.0);
        assert_eq!(dispatcher.count(), 1);
        assert_eq!(dispatcher.vehicles()[0].dispatched_at, Some(25.0));
    }

    #[test]
    fn stats_summarize_transit_times() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.receive(vehicle(1, 0.0), 10.0);
        dispatcher.receive(vehicle(2, 5.0), 25.0);
        let stats = dispatcher.stats();
        assert_eq!(stats.count, 2);
        assert_approx_eq!(stats.mean_transit, 15.0);
        assert_approx_eq!(stats.min_transit, 10.0);
        assert_approx_eq!(stats.max_transit, 20.0);
    }

    #[test]
    fn stats_of_an_empty_dispatcher_are_zero() {
        assert_eq!(Dispatcher::new().stats(), DispatchStats::default());
    }
}
