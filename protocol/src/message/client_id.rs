//! The client hardware identifier.

use std::fmt;

use eui48::MacAddress;

use super::constants::SIZE_CLIENT_ID;

/// A stable 16-byte identifier of the requesting interface.
///
/// Shorter hardware addresses are stored left-aligned and zero-padded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientId([u8; SIZE_CLIENT_ID]);

impl ClientId {
    pub fn new(bytes: [u8; SIZE_CLIENT_ID]) -> Self {
        ClientId(bytes)
    }

    /// Pads `bytes` with zeros, truncating anything beyond 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut id = [0u8; SIZE_CLIENT_ID];
        let length = bytes.len().min(SIZE_CLIENT_ID);
        id[..length].copy_from_slice(&bytes[..length]);
        ClientId(id)
    }

    pub fn as_bytes(&self) -> &[u8; SIZE_CLIENT_ID] {
        &self.0
    }
}

impl From<MacAddress> for ClientId {
    fn from(address: MacAddress) -> Self {
        ClientId::from_slice(address.as_bytes())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let last = self
            .0
            .iter()
            .rposition(|byte| *byte != 0)
            .map_or(0, |position| position + 1);
        for (index, byte) in self.0[..last].iter().enumerate() {
            if index > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClientId({})", self)
    }
}
