//! IPv4 subnet helpers.

use std::{fmt, net::Ipv4Addr};

use ipnetwork::{ipv4_mask_to_prefix, Ipv4Network};

use crate::error::Error;

/// The prefix length of a dotted mask.
///
/// # Errors
/// `Error::InvalidMask` if the mask is not contiguous.
pub fn mask_prefix(mask: Ipv4Addr) -> Result<u8, Error> {
    ipv4_mask_to_prefix(mask).map_err(|_| Error::InvalidMask(mask))
}

/// An interface address together with its subnet mask.
///
/// Also used for pool and route subnets, where `address` is usually the
/// network address itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Net {
    inner: Ipv4Network,
}

impl Ipv4Net {
    /// # Errors
    /// `Error::InvalidMask` if the mask is not contiguous.
    pub fn new(address: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, Error> {
        let prefix = mask_prefix(mask)?;
        let inner = Ipv4Network::new(address, prefix).map_err(|_| Error::InvalidMask(mask))?;
        Ok(Ipv4Net { inner })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.inner.ip()
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.inner.mask()
    }

    pub fn prefix_len(&self) -> u8 {
        self.inner.prefix()
    }

    pub fn network(&self) -> Ipv4Addr {
        self.inner.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.inner.broadcast()
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.inner.contains(address)
    }

    /// Whether both describe the same subnet, regardless of the host part.
    pub fn same_subnet(&self, other: &Ipv4Net) -> bool {
        self.prefix_len() == other.prefix_len() && self.network() == other.network()
    }

    pub fn overlaps(&self, other: &Ipv4Net) -> bool {
        self.inner.overlaps(other.inner)
    }
}

impl fmt::Display for Ipv4Net {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.prefix_len())
    }
}
