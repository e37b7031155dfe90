use crate::direction::{Direction, DirectionMap};
use crate::Address;
use slotmap::SecondaryMap;

/// The road graph: which intersection sits in each direction of another.
///
/// Built by an external map source and handed to controllers at
/// construction. A missing entry is the edge of the network; traffic
/// released toward it exits via the dispatcher.
#[derive(Default)]
pub struct Topology {
    links: SecondaryMap<Address, DirectionMap<Option<Address>>>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Default::default()
    }

    /// Connects `a` to `b`, with `b` sitting in `dir` from `a`.
    /// The reverse link is installed as well.
    pub fn connect(&mut self, a: Address, dir: Direction, b: Address) {
        self.slot(a)[dir] = Some(b);
        self.slot(b)[dir.opposite()] = Some(a);
    }

    /// Removes the link from `a` toward `dir`, and its reverse.
    pub fn disconnect(&mut self, a: Address, dir: Direction) {
        if let Some(b) = self.slot(a)[dir].take() {
            self.slot(b)[dir.opposite()] = None;
        }
    }

    /// One node's neighbor map, by value.
    pub fn neighbors(&self, addr: Address) -> DirectionMap<Option<Address>> {
        self.links.get(addr).cloned().unwrap_or_default()
    }

    fn slot(&mut self, addr: Address) -> &mut DirectionMap<Option<Address>> {
        if !self.links.contains_key(addr) {
            self.links.insert(addr, DirectionMap::default());
        }
        &mut self.links[addr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkBuilder;

    #[test]
    fn connect_installs_both_directions() {
        let mut builder = NetworkBuilder::new();
        let a = builder.register().addr;
        let b = builder.register().addr;
        let mut topo = Topology::new();
        topo.connect(a, Direction::East, b);
        assert_eq!(topo.neighbors(a)[Direction::East], Some(b));
        assert_eq!(topo.neighbors(b)[Direction::West], Some(a));
        assert_eq!(topo.neighbors(a)[Direction::North], None);
    }

    #[test]
    fn disconnect_removes_both_directions() {
        let mut builder = NetworkBuilder::new();
        let a = builder.register().addr;
        let b = builder.register().addr;
        let mut topo = Topology::new();
        topo.connect(a, Direction::South, b);
        topo.disconnect(a, Direction::South);
        assert_eq!(topo.neighbors(a)[Direction::South], None);
        assert_eq!(topo.neighbors(b)[Direction::North], None);
    }
}
