//! Lease events published by the client and server engines.

use std::{fmt, net::Ipv4Addr};

use futures::channel::mpsc;

/// A change of a lease as seen by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseEvent {
    Granted(Ipv4Addr),
    Expired(Ipv4Addr),
}

impl fmt::Display for LeaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LeaseEvent::Granted(address) => write!(f, "granted {}", address),
            LeaseEvent::Expired(address) => write!(f, "expired {}", address),
        }
    }
}

/// Fans lease events out to every live subscriber.
#[derive(Debug, Default)]
pub struct Notifier {
    subscribers: Vec<mpsc::UnboundedSender<LeaseEvent>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LeaseEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Subscribers whose receiver was dropped are forgotten.
    pub fn notify(&mut self, event: LeaseEvent) {
        self.subscribers.retain(|tx| tx.unbounded_send(event).is_ok());
    }
}
