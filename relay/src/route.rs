//! Client-side subnets the relay serves.

use std::net::Ipv4Addr;

use dhcp_protocol::Ipv4Net;

use crate::error::Error;

/// A client-facing subnet and the relay address on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRoute {
    subnet: Ipv4Net,
    gateway: Ipv4Addr,
}

impl RelayRoute {
    /// # Errors
    /// The mask is not contiguous or the gateway is outside the subnet.
    pub fn new(subnet: Ipv4Addr, mask: Ipv4Addr, gateway: Ipv4Addr) -> Result<Self, Error> {
        let subnet = Ipv4Net::new(subnet, mask)?;
        let subnet = Ipv4Net::new(subnet.network(), mask)?;
        if !subnet.contains(gateway) {
            return Err(Error::GatewayOutsideSubnet { gateway, subnet });
        }
        Ok(RelayRoute { subnet, gateway })
    }

    pub fn subnet(&self) -> Ipv4Net {
        self.subnet
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.subnet.mask()
    }

    /// The relay address stamped into forwarded messages.
    pub fn gateway(&self) -> Ipv4Addr {
        self.gateway
    }
}

/// The routes of one relay. Gateways are unique and subnets are disjoint.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<RelayRoute>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// The gateway is taken or the subnet overlaps an existing route.
    pub fn add(&mut self, route: RelayRoute) -> Result<(), Error> {
        for existing in self.routes.iter() {
            if existing.gateway == route.gateway {
                return Err(Error::DuplicateGateway(route.gateway));
            }
            if existing.subnet.overlaps(&route.subnet) {
                return Err(Error::OverlappingRoute(route.subnet, existing.subnet));
            }
        }
        self.routes.push(route);
        Ok(())
    }

    pub fn by_gateway(&self, gateway: Ipv4Addr) -> Option<&RelayRoute> {
        self.routes.iter().find(|route| route.gateway == gateway)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelayRoute> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
