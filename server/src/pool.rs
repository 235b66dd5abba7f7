//! Dynamic address pools.

use std::net::Ipv4Addr;

use dhcp_protocol::Ipv4Net;

use crate::error::Error;

/// An inclusive address range inside one subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
    subnet: Ipv4Net,
    first: Ipv4Addr,
    last: Ipv4Addr,
    router: Option<Ipv4Addr>,
}

impl AddressPool {
    /// # Errors
    /// The mask is not contiguous, the range is reversed, the range leaves
    /// the subnet or the router is outside the subnet.
    pub fn new(
        network: Ipv4Addr,
        mask: Ipv4Addr,
        first: Ipv4Addr,
        last: Ipv4Addr,
        router: Option<Ipv4Addr>,
    ) -> Result<Self, Error> {
        let subnet = Ipv4Net::new(network, mask)?;
        let invalid = |reason| Error::Pool { first, last, reason };

        if u32::from(first) > u32::from(last) {
            return Err(invalid("the first address is greater than the last one"));
        }
        if !subnet.contains(first) || !subnet.contains(last) {
            return Err(invalid("the range is outside the subnet"));
        }
        if let Some(router) = router {
            if !subnet.contains(router) {
                return Err(invalid("the router is outside the subnet"));
            }
        }
        Ok(AddressPool {
            subnet: Ipv4Net::new(subnet.network(), mask)?,
            first,
            last,
            router,
        })
    }

    pub fn subnet(&self) -> Ipv4Net {
        self.subnet
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.subnet.mask()
    }

    pub fn router(&self) -> Option<Ipv4Addr> {
        self.router
    }

    pub fn first(&self) -> Ipv4Addr {
        self.first
    }

    pub fn last(&self) -> Ipv4Addr {
        self.last
    }

    /// Whether `address` is inside the range.
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        let address = u32::from(address);
        u32::from(self.first) <= address && address <= u32::from(self.last)
    }

    /// Whether `address` is inside the subnet the pool serves.
    pub fn serves(&self, address: Ipv4Addr) -> bool {
        self.subnet.contains(address)
    }

    /// Pools clash if either their ranges or their subnets overlap.
    pub fn overlaps(&self, other: &AddressPool) -> bool {
        let ranges = u32::from(self.first) <= u32::from(other.last) && u32::from(other.first) <= u32::from(self.last);
        ranges || self.subnet.overlaps(&other.subnet)
    }

    /// The range addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        (u32::from(self.first)..=u32::from(self.last)).map(Ipv4Addr::from)
    }
}
