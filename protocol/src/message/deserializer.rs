//! Lease message deserialization module.

use std::{convert::TryFrom, net::Ipv4Addr};

use bytes::Buf;

use super::{constants::*, ClientId, LeaseMessage, MessageType};
use crate::error::Error;

/// Checks if there is enough data in buffer to get the message.
macro_rules! check_remaining(
    ($buffer:expr, $length:expr) => (
        if $buffer.remaining() < $length {
            return Err(Error::Truncated {
                expected: $length,
                actual: $buffer.remaining(),
            });
        }
    )
);

impl LeaseMessage {
    /// Lease message deserialization.
    ///
    /// Bytes beyond `SIZE_MESSAGE` are ignored.
    ///
    /// # Errors
    /// `Error::Truncated`, `Error::MagicCookie` or `Error::UnknownMessageType`.
    pub fn from_bytes(src: &[u8]) -> Result<Self, Error> {
        let mut buffer = src;
        check_remaining!(buffer, SIZE_MESSAGE);

        let magic = buffer.get_u32();
        if magic != MAGIC_COOKIE {
            return Err(Error::MagicCookie(magic));
        }
        let message_type = MessageType::try_from(buffer.get_u8())?;
        let transaction_id = buffer.get_u32();
        let client_id = ClientId::from_slice(&buffer[..SIZE_CLIENT_ID]);
        buffer.advance(SIZE_CLIENT_ID);

        Ok(LeaseMessage {
            message_type,
            transaction_id,
            client_id,
            requested_address: Self::get_ipv4(&mut buffer),
            offered_address: Self::get_ipv4(&mut buffer),
            server_id: Self::get_ipv4(&mut buffer),
            gateway_address: Self::get_ipv4(&mut buffer),
            subnet_mask: Self::get_ipv4(&mut buffer),
            router: Self::get_ipv4(&mut buffer),
            lease_seconds: buffer.get_u32(),
            renew_seconds: buffer.get_u32(),
            rebind_seconds: buffer.get_u32(),
            timestamp: buffer.get_u32(),
        })
    }

    fn get_ipv4(buffer: &mut &[u8]) -> Option<Ipv4Addr> {
        let address = Ipv4Addr::from(buffer.get_u32());
        if address.is_unspecified() {
            None
        } else {
            Some(address)
        }
    }
}
