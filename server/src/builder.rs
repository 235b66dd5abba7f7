//! A builder for the server messages.

use std::net::Ipv4Addr;

use dhcp_protocol::{LeaseMessage, MessageType};

/// Builds server replies with parameters which will not be changed.
pub struct MessageBuilder {
    /// Sent to clients in the `server_id` field.
    server_id: Ipv4Addr,
    lease_seconds: u32,
    renew_seconds: u32,
    rebind_seconds: u32,
}

/// Per-subnet data sent along with an address.
#[derive(Debug, Clone, Copy)]
pub struct SubnetData {
    pub mask: Option<Ipv4Addr>,
    pub router: Option<Ipv4Addr>,
}

impl MessageBuilder {
    pub fn new(server_id: Ipv4Addr, lease_seconds: u32, renew_seconds: u32, rebind_seconds: u32) -> Self {
        MessageBuilder {
            server_id,
            lease_seconds,
            renew_seconds,
            rebind_seconds,
        }
    }

    /// Creates an `OFFER` message from a `DISCOVER` message.
    pub fn discover_to_offer(&self, discover: &LeaseMessage, address: Ipv4Addr, subnet: SubnetData) -> LeaseMessage {
        let mut offer = self.reply(MessageType::Offer, discover);
        offer.offered_address = Some(address);
        offer.subnet_mask = subnet.mask;
        offer.router = subnet.router;
        offer
    }

    /// Creates an `ACK` message from a `REQUEST` message.
    pub fn request_to_ack(&self, request: &LeaseMessage, address: Ipv4Addr, subnet: SubnetData) -> LeaseMessage {
        let mut ack = self.reply(MessageType::Ack, request);
        ack.offered_address = Some(address);
        ack.subnet_mask = subnet.mask;
        ack.router = subnet.router;
        ack
    }

    /// Creates a `NACK` message from a `REQUEST` message.
    pub fn request_to_nack(&self, request: &LeaseMessage) -> LeaseMessage {
        self.reply(MessageType::Nack, request)
    }

    /// Echoes the transaction, the client and the relay of the request.
    fn reply(&self, message_type: MessageType, request: &LeaseMessage) -> LeaseMessage {
        let mut reply = LeaseMessage::new(message_type, request.transaction_id, request.client_id);
        reply.server_id = Some(self.server_id);
        reply.gateway_address = request.gateway_address;
        reply.timestamp = request.timestamp;
        reply.lease_seconds = self.lease_seconds;
        reply.renew_seconds = self.renew_seconds;
        reply.rebind_seconds = self.rebind_seconds;
        reply
    }
}
