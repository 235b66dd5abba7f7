//! The lease negotiation client engine.
//!
//! Acquires an address with DISCOVER/OFFER/REQUEST/ACK, installs it on the
//! host and keeps it alive by renewing and rebinding until the link drops
//! or the client is stopped.

#[macro_use]
extern crate log;

#[macro_use]
mod macros;

mod builder;
mod client;
mod config;
mod error;
mod stack;
mod state;

pub use self::{
    builder::MessageBuilder,
    client::{Binding, Client, ClientTimer},
    config::ClientConfig,
    error::Error,
    stack::{HostInterface, MemoryHost},
    state::State,
};
