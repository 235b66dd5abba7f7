//! Error module

use thiserror::Error;

/// Returned when the client configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid timing: {0} must be positive")]
    Timing(&'static str),
    #[error("The client and server ports must differ: {0}")]
    Ports(u16),
}
