//! Server configuration.

use std::{net::Ipv4Addr, time::Duration};

use dhcp_protocol::{PORT_CLIENT, PORT_SERVER};

use crate::error::Error;

/// A client has only `OFFER_TIMEOUT` to accept an OFFER.
pub const OFFER_TIMEOUT: Duration = Duration::from_secs(60);

/// Server identity and timing.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Sent to clients in the `server_id` field.
    pub server_address: Ipv4Addr,
    /// How long an address is leased for in seconds.
    pub lease_seconds: u32,
    pub renew_seconds: u32,
    pub rebind_seconds: u32,
    /// How often expired records are removed.
    pub sweep_interval: Duration,
    pub offer_timeout: Duration,
    pub server_port: u16,
    pub client_port: u16,
}

impl ServerConfig {
    pub fn new(server_address: Ipv4Addr) -> Self {
        ServerConfig {
            server_address,
            lease_seconds: 30,
            renew_seconds: 15,
            rebind_seconds: 25,
            sweep_interval: Duration::from_secs(1),
            offer_timeout: OFFER_TIMEOUT,
            server_port: PORT_SERVER,
            client_port: PORT_CLIENT,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.renew_seconds == 0 {
            return Err(Error::Timing("renew time must be positive"));
        }
        if self.renew_seconds >= self.rebind_seconds {
            return Err(Error::Timing("renew time must be less than rebind time"));
        }
        if self.rebind_seconds >= self.lease_seconds {
            return Err(Error::Timing("rebind time must be less than lease time"));
        }
        if self.sweep_interval == Duration::from_secs(0) {
            return Err(Error::Timing("sweep interval must be positive"));
        }
        if self.offer_timeout == Duration::from_secs(0) {
            return Err(Error::Timing("offer timeout must be positive"));
        }
        Ok(())
    }

    pub fn lease_time(&self) -> Duration {
        Duration::from_secs(u64::from(self.lease_seconds))
    }
}
