//! The datagram transport and interface query the engines are driven through.

use std::{
    collections::BTreeMap,
    fmt,
    io,
    net::{Ipv4Addr, SocketAddrV4},
};

use crate::{net::Ipv4Net, timer::TimerHandle};

/// A local network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Sends datagrams on behalf of an engine.
pub trait Transport {
    /// Sends `payload` to `destination`, out of `interface` if one is given.
    ///
    /// # Errors
    /// Whatever the underlying socket reports. Engines log and otherwise
    /// ignore send errors.
    fn send(&mut self, payload: &[u8], destination: SocketAddrV4, interface: Option<InterfaceId>) -> io::Result<()>;
}

/// Answers questions about the local interfaces.
pub trait Interfaces {
    /// The address and subnet configured on `interface`.
    fn address(&self, interface: InterfaceId) -> Option<Ipv4Net>;

    /// The interface owning `address`, or else the one whose subnet contains it.
    fn interface_with(&self, address: Ipv4Addr) -> Option<InterfaceId>;
}

/// A fixed interface table.
#[derive(Debug, Clone, Default)]
pub struct StaticInterfaces {
    table: BTreeMap<InterfaceId, Ipv4Net>,
}

impl StaticInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interface: InterfaceId, address: Ipv4Net) -> Self {
        self.insert(interface, address);
        self
    }

    pub fn insert(&mut self, interface: InterfaceId, address: Ipv4Net) -> Option<Ipv4Net> {
        self.table.insert(interface, address)
    }

    pub fn remove(&mut self, interface: InterfaceId) -> Option<Ipv4Net> {
        self.table.remove(&interface)
    }
}

impl Interfaces for StaticInterfaces {
    fn address(&self, interface: InterfaceId) -> Option<Ipv4Net> {
        self.table.get(&interface).copied()
    }

    fn interface_with(&self, address: Ipv4Addr) -> Option<InterfaceId> {
        self.table
            .iter()
            .find(|(_, net)| net.address() == address)
            .or_else(|| self.table.iter().find(|(_, net)| net.contains(address)))
            .map(|(interface, _)| *interface)
    }
}

/// A datagram delivered to an engine.
#[derive(Debug, Clone, Copy)]
pub struct Received<'a> {
    pub payload: &'a [u8],
    pub source: SocketAddrV4,
    /// The local port the datagram arrived on.
    pub local_port: u16,
    pub interface: InterfaceId,
}

/// The lifecycle shared by the client, server and relay.
///
/// Engines are single-threaded and run every call to completion.
pub trait Engine {
    /// The timer events the engine schedules.
    type Timer;

    fn start(&mut self);

    /// Cancels every timer. The engine ignores input until started again.
    fn stop(&mut self);

    fn handle_datagram(&mut self, datagram: Received<'_>);

    /// Delivers an expiry. Expiries of cancelled or superseded timers are ignored.
    fn handle_timer(&mut self, handle: TimerHandle, timer: Self::Timer);
}
