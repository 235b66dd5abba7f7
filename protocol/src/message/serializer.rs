//! Lease message serialization module.

use std::net::Ipv4Addr;

use bytes::BufMut;

use super::{constants::*, LeaseMessage};
use crate::error::Error;

/// Checks if there is enough space in buffer to put the message.
macro_rules! check_remaining(
    ($buffer:expr, $distance:expr) => (
        if $buffer.remaining_mut() < $distance {
            return Err(Error::BufferTooSmall {
                expected: $distance,
                actual: $buffer.remaining_mut(),
            });
        }
    )
);

impl LeaseMessage {
    /// Lease message serialization.
    ///
    /// Returns the number of bytes written, which is always `SIZE_MESSAGE`.
    ///
    /// # Errors
    /// `Error::BufferTooSmall` if `dst` is shorter than `SIZE_MESSAGE`.
    pub fn to_bytes(&self, dst: &mut [u8]) -> Result<usize, Error> {
        check_remaining!(dst, SIZE_MESSAGE);
        self.write(&mut dst[..SIZE_MESSAGE]);
        Ok(SIZE_MESSAGE)
    }

    /// Serializes into a freshly allocated buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; SIZE_MESSAGE];
        self.write(&mut buffer);
        buffer
    }

    /// Writes the fields into exactly `SIZE_MESSAGE` bytes.
    fn write(&self, mut buffer: &mut [u8]) {
        buffer.put_u32(MAGIC_COOKIE);
        buffer.put_u8(self.message_type as u8);
        buffer.put_u32(self.transaction_id);
        buffer.put_slice(self.client_id.as_bytes());
        Self::put_ipv4(&mut buffer, self.requested_address);
        Self::put_ipv4(&mut buffer, self.offered_address);
        Self::put_ipv4(&mut buffer, self.server_id);
        Self::put_ipv4(&mut buffer, self.gateway_address);
        Self::put_ipv4(&mut buffer, self.subnet_mask);
        Self::put_ipv4(&mut buffer, self.router);
        buffer.put_u32(self.lease_seconds);
        buffer.put_u32(self.renew_seconds);
        buffer.put_u32(self.rebind_seconds);
        buffer.put_u32(self.timestamp);
    }

    fn put_ipv4(buffer: &mut &mut [u8], value: Option<Ipv4Addr>) {
        buffer.put_u32(u32::from(value.unwrap_or(Ipv4Addr::UNSPECIFIED)));
    }
}
