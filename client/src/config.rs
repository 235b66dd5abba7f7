//! Client configuration.

use std::time::Duration;

use dhcp_protocol::{ClientId, PORT_CLIENT, PORT_SERVER};

use crate::error::Error;

/// Client timing and identity.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: ClientId,
    /// How long to wait for the first OFFER before discovering again.
    pub retransmit: Duration,
    /// How long to collect OFFERs after the first one.
    pub collect: Duration,
    /// How long to wait for an ACK or NACK before trying the next OFFER.
    pub re_request: Duration,
    pub server_port: u16,
    pub client_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_id: ClientId::default(),
            retransmit: Duration::from_secs(5),
            collect: Duration::from_secs(5),
            re_request: Duration::from_secs(10),
            server_port: PORT_SERVER,
            client_port: PORT_CLIENT,
        }
    }
}

impl ClientConfig {
    pub fn new(client_id: ClientId) -> Self {
        ClientConfig {
            client_id,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.retransmit == Duration::from_secs(0) {
            return Err(Error::Timing("retransmit"));
        }
        if self.collect == Duration::from_secs(0) {
            return Err(Error::Timing("collect"));
        }
        if self.re_request == Duration::from_secs(0) {
            return Err(Error::Timing("re_request"));
        }
        if self.server_port == self.client_port {
            return Err(Error::Ports(self.client_port));
        }
        Ok(())
    }
}
