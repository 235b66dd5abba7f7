//! Client states.

use std::fmt;

/// Where the client is in the lease lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not started, or stopped.
    Init,
    /// DISCOVER sent, collecting OFFERs.
    Selecting,
    /// REQUEST broadcast for a chosen OFFER.
    Requesting,
    Bound,
    /// REQUEST unicast to the leasing server.
    Renewing,
    /// REQUEST broadcast to any server.
    Rebinding,
    /// The link is down.
    Suspended,
}

impl State {
    /// Whether an ACK or NACK is expected.
    pub fn awaits_answer(self) -> bool {
        match self {
            State::Requesting | State::Renewing | State::Rebinding => true,
            _ => false,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::State::*;
        match self {
            Init => write!(f, "INIT"),
            Selecting => write!(f, "SELECTING"),
            Requesting => write!(f, "REQUESTING"),
            Bound => write!(f, "BOUND"),
            Renewing => write!(f, "RENEWING"),
            Rebinding => write!(f, "REBINDING"),
            Suspended => write!(f, "SUSPENDED"),
        }
    }
}
