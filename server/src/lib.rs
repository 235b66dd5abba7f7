//! The lease negotiation server engine.
//!
//! Allocates addresses from per-subnet pools and static reservations,
//! answers clients directly or through relays and expires stale leases.

#[macro_use]
extern crate log;

#[macro_use]
mod macros;

mod builder;
mod config;
mod error;
mod lease;
mod pool;
mod server;
mod storage;

pub use self::{
    builder::{MessageBuilder, SubnetData},
    config::{ServerConfig, OFFER_TIMEOUT},
    error::Error,
    lease::Lease,
    pool::AddressPool,
    server::{Server, ServerTimer},
    storage::{Assignment, Refusal, Storage},
};
