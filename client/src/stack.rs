//! The host network stack the client installs its lease into.

use std::{io, net::Ipv4Addr};

/// Address and route management of the client's interface.
///
/// Failures are logged by the client and do not change its state.
pub trait HostInterface {
    fn add_address(&mut self, address: Ipv4Addr, mask: Ipv4Addr) -> io::Result<()>;

    fn remove_address(&mut self, address: Ipv4Addr) -> io::Result<()>;

    fn set_default_route(&mut self, gateway: Ipv4Addr) -> io::Result<()>;

    fn remove_default_route(&mut self, gateway: Ipv4Addr) -> io::Result<()>;
}

/// Keeps the installed configuration in memory.
///
/// Suits simulations and hosts where another component applies the lease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHost {
    pub addresses: Vec<(Ipv4Addr, Ipv4Addr)>,
    pub default_route: Option<Ipv4Addr>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_address(&self, address: Ipv4Addr) -> bool {
        self.addresses.iter().any(|(installed, _)| *installed == address)
    }
}

impl HostInterface for MemoryHost {
    fn add_address(&mut self, address: Ipv4Addr, mask: Ipv4Addr) -> io::Result<()> {
        if self.has_address(address) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "Address is already installed"));
        }
        self.addresses.push((address, mask));
        Ok(())
    }

    fn remove_address(&mut self, address: Ipv4Addr) -> io::Result<()> {
        let before = self.addresses.len();
        self.addresses.retain(|(installed, _)| *installed != address);
        if self.addresses.len() == before {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Address is not installed"));
        }
        Ok(())
    }

    fn set_default_route(&mut self, gateway: Ipv4Addr) -> io::Result<()> {
        self.default_route = Some(gateway);
        Ok(())
    }

    fn remove_default_route(&mut self, gateway: Ipv4Addr) -> io::Result<()> {
        if self.default_route != Some(gateway) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such default route"));
        }
        self.default_route = None;
        Ok(())
    }
}
