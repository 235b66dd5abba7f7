//! Runs the lease negotiation engines on tokio.
//!
//! Supplies a UDP `Transport`, tokio-backed `Timers` and a driver loop
//! feeding datagrams and timer expiries into any `Engine`.

#[macro_use]
extern crate log;

mod driver;
mod socket;
mod timers;

pub use self::{
    driver::{drive, Endpoint},
    socket::{bind, UdpTransport, BUFFER_READ_CAPACITY},
    timers::{TimerReceiver, TokioTimers},
};
