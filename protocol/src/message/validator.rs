//! Lease message validation module.

use super::{LeaseMessage, MessageType};
use crate::{error::Error, net};

use crate::error::Error::Validation;

macro_rules! must_set_option (
    ($name:expr, $error:expr) => ( if $name.is_none() { return Err(Validation($error)); } )
);
macro_rules! must_not_set_option (
    ($name:expr, $error:expr) => ( if $name.is_some() { return Err(Validation($error)); } )
);

impl LeaseMessage {
    /// Lease message validation.
    ///
    /// Returns the message type on successful validation.
    ///
    /// # Errors
    /// `Error::Validation` if a field is inconsistent with the message type,
    /// `Error::InvalidMask` if the subnet mask is not contiguous.
    pub fn validate(&self) -> Result<MessageType, Error> {
        if let Some(mask) = self.subnet_mask {
            net::mask_prefix(mask)?;
        }

        match self.message_type {
            // client generated packets section
            MessageType::Discover => {
                must_not_set_option!(self.offered_address, "offered_address");
                must_not_set_option!(self.server_id, "server_id");
            }
            MessageType::Request => {
                must_set_option!(self.requested_address, "requested_address");
                must_not_set_option!(self.offered_address, "offered_address");
            }

            // server generated packets section
            MessageType::Offer | MessageType::Ack => {
                must_set_option!(self.offered_address, "offered_address");
                must_set_option!(self.server_id, "server_id");
                must_not_set_option!(self.requested_address, "requested_address");
                if !self.has_ordered_durations() {
                    return Err(Validation("durations"));
                }
            }
            MessageType::Nack => {
                must_set_option!(self.server_id, "server_id");
                must_not_set_option!(self.offered_address, "offered_address");
            }
        }

        Ok(self.message_type)
    }
}
