//! Relay configuration.

use std::net::Ipv4Addr;

use dhcp_protocol::{Ipv4Net, PORT_CLIENT, PORT_SERVER};

use crate::error::Error;

/// Where the server is and how the relay reaches it.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The server every client message is forwarded to.
    pub server_address: Ipv4Addr,
    /// The relay's own address and subnet on the server side.
    pub server_side: Ipv4Net,
    pub server_port: u16,
    pub client_port: u16,
}

impl RelayConfig {
    pub fn new(server_address: Ipv4Addr, server_side: Ipv4Net) -> Self {
        RelayConfig {
            server_address,
            server_side,
            server_port: PORT_SERVER,
            client_port: PORT_CLIENT,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.server_address.is_unspecified() || self.server_address.is_broadcast() {
            return Err(Error::Config("the server address must be a unicast address"));
        }
        if self.server_port == self.client_port {
            return Err(Error::Config("the server and client ports must differ"));
        }
        Ok(())
    }
}
