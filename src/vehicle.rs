use crate::direction::Direction;
use crate::util::unix_time;
use crate::Address;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A vehicle moving through the intersection network.
///
/// The remaining route is a sequence of compass directions consumed from
/// the front, exactly one per hop. A vehicle with an empty route has
/// reached its destination and leaves the network via the dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique ID, assigned by whichever generator created the vehicle.
    pub id: u64,
    /// The node where the vehicle entered the network.
    pub origin: Address,
    /// The queue the vehicle first joined, as declared by its generator.
    pub origin_direction: Direction,
    /// Unix timestamp of creation, in seconds.
    pub created_at: f64,
    /// Unix timestamp of network exit, stamped by the dispatcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<f64>,
    /// The compass directions remaining to traverse.
    pub path: SmallVec<[Direction; 8]>,
}

impl Vehicle {
    /// Creates a vehicle entering the network at `origin`.
    pub fn new(
        id: u64,
        origin: Address,
        origin_direction: Direction,
        path: impl IntoIterator<Item = Direction>,
    ) -> Self {
        Self {
            id,
            origin,
            origin_direction,
            created_at: unix_time(),
            dispatched_at: None,
            path: path.into_iter().collect(),
        }
    }

    /// The next hop, if any hops remain.
    pub fn next_hop(&self) -> Option<Direction> {
        self.path.first().copied()
    }

    /// Consumes and returns the next hop.
    pub fn take_hop(&mut self) -> Option<Direction> {
        if self.path.is_empty() {
            None
        } else {
            Some(self.path.remove(0))
        }
    }

    /// Seconds the vehicle has been in the network as of `now`.
    pub fn age(&self, now: f64) -> f64 {
        (now - self.created_at).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;

    fn vehicle(path: &[Direction]) -> Vehicle {
        Vehicle::new(1, Address::null(), Direction::North, path.iter().copied())
    }

    #[test]
    fn hops_are_consumed_from_the_front() {
        let mut v = vehicle(&[Direction::East, Direction::South]);
        assert_eq!(v.next_hop(), Some(Direction::East));
        assert_eq!(v.take_hop(), Some(Direction::East));
        assert_eq!(v.path.len(), 1);
        assert_eq!(v.take_hop(), Some(Direction::South));
        assert_eq!(v.take_hop(), None);
    }

    #[test]
    fn age_never_goes_negative() {
        let v = vehicle(&[]);
        assert_eq!(v.age(v.created_at - 100.0), 0.0);
        assert!(v.age(v.created_at + 5.0) >= 5.0);
    }
}
