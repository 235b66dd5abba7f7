//! The lease message module.
pub mod constants;

mod client_id;
mod deserializer;
mod message_type;
mod serializer;
mod validator;

use std::{fmt, net::Ipv4Addr};

pub use self::{client_id::ClientId, message_type::MessageType};

/// The unit exchanged by clients, relays and servers.
///
/// Absent addresses travel as `0.0.0.0` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseMessage {
    pub message_type: MessageType,
    pub transaction_id: u32,
    pub client_id: ClientId,
    pub requested_address: Option<Ipv4Addr>,
    pub offered_address: Option<Ipv4Addr>,
    pub server_id: Option<Ipv4Addr>,
    /// Stamped by the relay the message passed through.
    pub gateway_address: Option<Ipv4Addr>,
    pub subnet_mask: Option<Ipv4Addr>,
    pub router: Option<Ipv4Addr>,
    pub lease_seconds: u32,
    pub renew_seconds: u32,
    pub rebind_seconds: u32,
    /// Seconds since the client began the current negotiation attempt.
    pub timestamp: u32,
}

impl LeaseMessage {
    /// Creates a message with every optional field absent and zero durations.
    pub fn new(message_type: MessageType, transaction_id: u32, client_id: ClientId) -> Self {
        LeaseMessage {
            message_type,
            transaction_id,
            client_id,
            requested_address: None,
            offered_address: None,
            server_id: None,
            gateway_address: None,
            subnet_mask: None,
            router: None,
            lease_seconds: 0,
            renew_seconds: 0,
            rebind_seconds: 0,
            timestamp: 0,
        }
    }

    /// Whether `renew < rebind < lease` holds.
    pub fn has_ordered_durations(&self) -> bool {
        self.renew_seconds < self.rebind_seconds && self.rebind_seconds < self.lease_seconds
    }
}

/// Prints an address field or a dash if it is absent.
struct Field(Option<Ipv4Addr>);

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(address) => write!(f, "{}", address),
            None => write!(f, "-"),
        }
    }
}

impl fmt::Display for LeaseMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}HEADER{}", "_".repeat(30), "_".repeat(39))?;
        writeln!(f, "{:32} | {}", "Message type", self.message_type)?;
        writeln!(f, "{:32} | {}", "Transaction ID", self.transaction_id)?;
        writeln!(f, "{:32} | {}", "Client ID", self.client_id)?;
        writeln!(f, "{:32} | {}", "Requested address", Field(self.requested_address))?;
        writeln!(f, "{:32} | {}", "Offered address", Field(self.offered_address))?;
        writeln!(f, "{:32} | {}", "Server ID", Field(self.server_id))?;
        writeln!(f, "{:32} | {}", "Gateway address", Field(self.gateway_address))?;
        writeln!(f, "{:32} | {}", "Subnet mask", Field(self.subnet_mask))?;
        writeln!(f, "{:32} | {}", "Router", Field(self.router))?;
        writeln!(f, "{:32} | {}", "Lease seconds", self.lease_seconds)?;
        writeln!(f, "{:32} | {}", "Renew seconds", self.renew_seconds)?;
        writeln!(f, "{:32} | {}", "Rebind seconds", self.rebind_seconds)?;
        writeln!(f, "{:32} | {}", "Timestamp", self.timestamp)?;
        writeln!(f, "{}", "_".repeat(75))?;
        Ok(())
    }
}
