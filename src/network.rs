//! The in-process transport: addressed mailboxes over channels.
//!
//! Every node registers a mailbox before the fleet starts; the frozen
//! address table is then shared as a cheap-to-clone [Network] handle.
//! Delivery is fire-and-forget and unbounded; there is no backpressure
//! between senders and receivers.

use crate::protocol::{Message, Packet, ProtocolError};
use crate::Address;
use crossbeam_channel::{unbounded, Receiver, Sender};
use slotmap::SlotMap;
use std::fmt;
use std::sync::Arc;

/// Registers mailboxes before the network is frozen and shared.
#[derive(Default)]
pub struct NetworkBuilder {
    peers: SlotMap<Address, Sender<Packet>>,
}

impl NetworkBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Allocates an address and the receiving end of its mailbox.
    pub fn register(&mut self) -> Mailbox {
        let (tx, rx) = unbounded();
        let addr = self.peers.insert(tx);
        Mailbox { addr, rx }
    }

    /// Freezes the address table into a shareable send handle.
    pub fn build(self) -> Network {
        Network {
            peers: Arc::new(self.peers),
        }
    }
}

/// The receiving end of one node's mailbox.
pub struct Mailbox {
    /// The address peers send to.
    pub addr: Address,
    /// Inbound packets, in arrival order.
    pub rx: Receiver<Packet>,
}

/// Cheap-to-clone handle for sending messages to registered addresses.
#[derive(Clone)]
pub struct Network {
    peers: Arc<SlotMap<Address, Sender<Packet>>>,
}

impl Network {
    /// Encodes `message` and delivers it to `to`.
    pub fn send(&self, from: Address, to: Address, message: &Message) -> Result<(), NetworkError> {
        let tx = self
            .peers
            .get(to)
            .ok_or(NetworkError::UnknownAddress(to))?;
        let body = message.encode().map_err(NetworkError::Encode)?;
        tx.send(Packet { from, body })
            .map_err(|_| NetworkError::Disconnected(to))
    }
}

/// A message that could not be delivered.
#[derive(Debug)]
pub enum NetworkError {
    /// No mailbox is registered at the address.
    UnknownAddress(Address),
    /// The receiver's mailbox has been dropped.
    Disconnected(Address),
    /// The message could not be encoded.
    Encode(ProtocolError),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::UnknownAddress(addr) => write!(f, "no mailbox at {:?}", addr),
            NetworkError::Disconnected(addr) => write!(f, "mailbox at {:?} is gone", addr),
            NetworkError::Encode(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Encode(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;

    #[test]
    fn delivers_to_a_registered_mailbox() {
        let mut builder = NetworkBuilder::new();
        let mailbox = builder.register();
        let net = builder.build();
        net.send(Address::null(), mailbox.addr, &Message::Shutdown)
            .unwrap();
        let packet = mailbox.rx.try_recv().unwrap();
        assert!(packet.from.is_null());
        assert!(matches!(
            Message::decode(&packet.body).unwrap(),
            Message::Shutdown
        ));
    }

    #[test]
    fn unknown_address_fails() {
        let net = NetworkBuilder::new().build();
        let result = net.send(Address::null(), Address::null(), &Message::Shutdown);
        assert!(matches!(result, Err(NetworkError::UnknownAddress(_))));
    }

    #[test]
    fn dropped_mailbox_fails() {
        let mut builder = NetworkBuilder::new();
        let mailbox = builder.register();
        let addr = mailbox.addr;
        let net = builder.build();
        drop(mailbox);
        let result = net.send(Address::null(), addr, &Message::Shutdown);
        assert!(matches!(result, Err(NetworkError::Disconnected(_))));
    }
}
