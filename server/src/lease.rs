//! Address lease implementation.

use std::{
    net::Ipv4Addr,
    time::{Duration, Instant},
};

/// The state of the `Lease`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// An OFFER is outstanding.
    Offered,
    /// The client got an ACK.
    Assigned,
}

/// A lease record of the server lease table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    address: Ipv4Addr,
    state: State,
    expires_at: Instant,
}

impl Lease {
    /// Creates a new `Lease` in `Offered` state, valid for `timeout`.
    pub fn offered(address: Ipv4Addr, now: Instant, timeout: Duration) -> Self {
        Lease {
            address,
            state: State::Offered,
            expires_at: now + timeout,
        }
    }

    /// Creates a new `Lease` in `Assigned` state, valid for `lease_time`.
    pub fn assigned(address: Ipv4Addr, now: Instant, lease_time: Duration) -> Self {
        Lease {
            address,
            state: State::Assigned,
            expires_at: now + lease_time,
        }
    }

    /// `IPv4` lease address.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Moves the lease to the `Assigned` state or extends an assigned one.
    pub fn assign(&mut self, now: Instant, lease_time: Duration) {
        self.state = State::Assigned;
        self.expires_at = now + lease_time;
    }

    /// Check whether the lease is in `Offered` state.
    ///
    /// Does not check for expiration.
    pub fn is_offered(&self) -> bool {
        self.state == State::Offered
    }

    /// Check whether the lease is in `Assigned` state.
    ///
    /// Does not check for expiration.
    pub fn is_assigned(&self) -> bool {
        self.state == State::Assigned
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Check whether the lease is assigned and not expired.
    pub fn is_active(&self, now: Instant) -> bool {
        self.is_assigned() && !self.is_expired(now)
    }
}
