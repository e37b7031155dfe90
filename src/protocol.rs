//! The wire protocol between controllers, aggregators, and sinks.
//!
//! Messages travel as JSON bodies inside a [Packet]. Decoding is the
//! point where malformed traffic is caught: a body that fails to parse
//! is reported to the caller and never reaches a node's state.

use crate::direction::DirectionMap;
use crate::phase::PhaseId;
use crate::vehicle::Vehicle;
use crate::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw transport frame: sender address plus JSON body.
#[derive(Clone, Debug)]
pub struct Packet {
    /// The sender's mailbox address; the null address marks operator
    /// or generator traffic with no registered sender.
    pub from: Address,
    /// The JSON-encoded [Message].
    pub body: String,
}

/// Point-in-time queue contents and active phase of one intersection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Queued vehicles per direction, head first.
    pub queues: DirectionMap<Vec<Vehicle>>,
    /// The phase active when the snapshot was taken.
    pub active_phase: PhaseId,
}

/// Everything that travels between nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Hands a vehicle to a neighbor controller or to the dispatcher.
    Move { vehicle: Vehicle },
    /// Periodic controller load report to its aggregator.
    StatusReport(Snapshot),
    /// Aggregator reply naming the phase it wants active.
    Recommendation { phase: PhaseId },
    /// Best-effort queue-length publication for monitors.
    QueueUpdate {
        lengths: DirectionMap<usize>,
        active_phase: PhaseId,
    },
    /// Operator request to stop a node's loop.
    Shutdown,
}

impl Message {
    /// Encodes the message as a JSON body.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Malformed)
    }

    /// Decodes a JSON body.
    pub fn decode(body: &str) -> Result<Message, ProtocolError> {
        serde_json::from_str(body).map_err(ProtocolError::Malformed)
    }
}

/// A message that could not be accepted.
#[derive(Debug)]
pub enum ProtocolError {
    /// The body was not a well-formed message.
    Malformed(serde_json::Error),
    /// A phase index outside the receiver's schema.
    UnknownPhase(usize),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(err) => write!(f, "malformed message: {}", err),
            ProtocolError::UnknownPhase(index) => write!(f, "unknown phase {}", index),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Malformed(err) => Some(err),
            ProtocolError::UnknownPhase(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction;
    use slotmap::Key;

    #[test]
    fn move_round_trips() {
        let vehicle = Vehicle::new(
            7,
            Address::null(),
            Direction::West,
            [Direction::East, Direction::North],
        );
        let body = Message::Move { vehicle: vehicle.clone() }.encode().unwrap();
        match Message::decode(&body).unwrap() {
            Message::Move { vehicle: back } => assert_eq!(back, vehicle),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Message::decode("not a message").is_err());
        assert!(Message::decode("{\"kind\":\"move\"}").is_err());
    }

    #[test]
    fn report_missing_a_queue_is_rejected() {
        // a snapshot must carry all four queues
        let body = r#"{"kind":"status_report","queues":{"N":[],"S":[],"E":[]},"active_phase":0}"#;
        assert!(Message::decode(body).is_err());
    }

    #[test]
    fn shutdown_is_a_bare_tag() {
        let body = Message::Shutdown.encode().unwrap();
        assert_eq!(body, r#"{"kind":"shutdown"}"#);
    }
}
