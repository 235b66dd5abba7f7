//! Error module

use thiserror::Error;

/// Returned by the message codec, the message validator and the subnet helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Message is truncated: {actual} bytes out of {expected}")]
    Truncated { expected: usize, actual: usize },
    #[error("Buffer is too small: {actual} bytes out of {expected}")]
    BufferTooSmall { expected: usize, actual: usize },
    #[error("Invalid magic cookie: {0:#010x}")]
    MagicCookie(u32),
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),
    #[error("Validation error: {0}")]
    Validation(&'static str),
    #[error("Invalid subnet mask: {0}")]
    InvalidMask(std::net::Ipv4Addr),
}
