//! Error module

use std::net::Ipv4Addr;

use thiserror::Error;

use dhcp_protocol::Ipv4Net;

/// Routing and configuration errors. All of them are fatal at setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid subnet: {0}")]
    Subnet(#[from] dhcp_protocol::Error),
    #[error("The gateway {0} already serves another subnet")]
    DuplicateGateway(Ipv4Addr),
    #[error("The subnet {0} overlaps the route subnet {1}")]
    OverlappingRoute(Ipv4Net, Ipv4Net),
    #[error("The gateway {gateway} is outside its subnet {subnet}")]
    GatewayOutsideSubnet { gateway: Ipv4Addr, subnet: Ipv4Net },
    #[error("Invalid configuration: {0}")]
    Config(&'static str),
}
