//! Error module

use std::net::Ipv4Addr;

use thiserror::Error;

use dhcp_protocol::{ClientId, Ipv4Net};

/// Configuration errors. All of them are fatal at setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid timing: {0}")]
    Timing(&'static str),
    #[error("Invalid subnet: {0}")]
    Subnet(#[from] dhcp_protocol::Error),
    #[error("Invalid pool {first}-{last}: {reason}")]
    Pool {
        first: Ipv4Addr,
        last: Ipv4Addr,
        reason: &'static str,
    },
    #[error("The pool {0} overlaps the pool {1}")]
    OverlappingPools(Ipv4Net, Ipv4Net),
    #[error("The reserved address {0} lies inside a pool range")]
    ReservedInPool(Ipv4Addr),
    #[error("The static address {address} is already reserved for {owner}")]
    StaticConflict { address: Ipv4Addr, owner: ClientId },
}
