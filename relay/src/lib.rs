//! The lease negotiation relay engine.
//!
//! Forwards client traffic from subnets without a server to a configured
//! server and broadcasts the replies back on the subnet they belong to.

#[macro_use]
extern crate log;

mod config;
mod error;
mod relay;
mod route;

pub use self::{
    config::RelayConfig,
    error::Error,
    relay::Relay,
    route::{RelayRoute, RoutingTable},
};
