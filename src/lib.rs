pub use aggregator::{Aggregator, Policy};
pub use crossroad::{Crossroad, CrossroadConfig, Handled};
pub use direction::{Direction, DirectionMap, DirectionSet};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use network::{Mailbox, Network, NetworkBuilder, NetworkError};
pub use phase::{PhaseId, PhaseSchema, PhaseSpec, ReleaseRule};
pub use protocol::{Message, Packet, ProtocolError, Snapshot};
pub use runtime::{
    spawn_aggregator, spawn_crossroad, spawn_dispatcher, AggregatorHandle, CrossroadHandle,
    DispatcherHandle,
};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use topology::Topology;
pub use util::unix_time;
pub use vehicle::Vehicle;

mod aggregator;
mod crossroad;
mod direction;
mod dispatcher;
mod network;
mod phase;
mod protocol;
mod runtime;
mod topology;
mod util;
mod vehicle;

new_key_type! {
    /// Unique address of a node's mailbox.
    pub struct Address;
}
