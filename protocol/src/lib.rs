//! The lease negotiation protocol shared by the client, server and relay.
//!
//! Contains the fixed-layout message codec and the collaborator traits the
//! engines are driven through: a timer service, a datagram transport and an
//! interface query.

pub mod error;
pub mod events;
pub mod message;
pub mod net;
pub mod timer;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use self::{
    error::Error,
    events::{LeaseEvent, Notifier},
    message::{constants::*, ClientId, LeaseMessage, MessageType},
    net::Ipv4Net,
    timer::{TimerHandle, TimerSet, Timers},
    transport::{Engine, InterfaceId, Interfaces, Received, StaticInterfaces, Transport},
};
