//! A builder for the client messages.

use std::net::Ipv4Addr;

use dhcp_protocol::{ClientId, LeaseMessage, MessageType};

/// Builds client messages for one client identity.
pub struct MessageBuilder {
    client_id: ClientId,
}

impl MessageBuilder {
    /// Creates a builder with message parameters which will not be changed.
    pub fn new(client_id: ClientId) -> Self {
        MessageBuilder { client_id }
    }

    /// Creates a `DISCOVER` message.
    pub fn discover(&self, transaction_id: u32, timestamp: u32) -> LeaseMessage {
        let mut message = LeaseMessage::new(MessageType::Discover, transaction_id, self.client_id);
        message.timestamp = timestamp;
        message
    }

    /// Creates a `REQUEST` message.
    ///
    /// Used both for a chosen OFFER and for renewing or rebinding a held lease.
    pub fn request(
        &self,
        transaction_id: u32,
        timestamp: u32,
        requested_address: Ipv4Addr,
        server_id: Option<Ipv4Addr>,
    ) -> LeaseMessage {
        let mut message = LeaseMessage::new(MessageType::Request, transaction_id, self.client_id);
        message.timestamp = timestamp;
        message.requested_address = Some(requested_address);
        message.server_id = server_id;
        message
    }
}
