//! Lease message type module.

use std::{convert::TryFrom, fmt};

use crate::error::Error;

/// The five messages of a lease negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Discover = 1,
    Offer,
    Request,
    Ack,
    Nack,
}

impl MessageType {
    /// Whether the message travels from a client towards a server.
    pub fn is_client_message(self) -> bool {
        match self {
            MessageType::Discover | MessageType::Request => true,
            _ => false,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::MessageType::*;
        match self {
            Discover => write!(f, "DISCOVER"),
            Offer => write!(f, "OFFER"),
            Request => write!(f, "REQUEST"),
            Ack => write!(f, "ACK"),
            Nack => write!(f, "NACK"),
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use self::MessageType::*;
        Ok(match value {
            1 => Discover,
            2 => Offer,
            3 => Request,
            4 => Ack,
            5 => Nack,

            _ => return Err(Error::UnknownMessageType(value)),
        })
    }
}
