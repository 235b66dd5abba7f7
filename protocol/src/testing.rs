//! Deterministic collaborators for driving the engines in tests.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    io,
    net::SocketAddrV4,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    error::Error,
    message::LeaseMessage,
    timer::{TimerHandle, Timers},
    transport::{InterfaceId, Transport},
};

struct Queue<E> {
    now: Instant,
    next_id: u64,
    pending: BTreeMap<(Instant, u64), E>,
    deadlines: HashMap<u64, Instant>,
}

/// A virtual clock with a timer queue. Time only moves when the test moves it.
///
/// Clones share the same clock, so a test keeps one handle while the engine
/// owns another.
pub struct ManualTimers<E> {
    queue: Rc<RefCell<Queue<E>>>,
}

impl<E> Clone for ManualTimers<E> {
    fn clone(&self) -> Self {
        ManualTimers {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<E> Default for ManualTimers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ManualTimers<E> {
    pub fn new() -> Self {
        ManualTimers {
            queue: Rc::new(RefCell::new(Queue {
                now: Instant::now(),
                next_id: 0,
                pending: BTreeMap::new(),
                deadlines: HashMap::new(),
            })),
        }
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.borrow().pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes the earliest timer due at or before `until` and moves the
    /// clock to its deadline.
    pub fn pop_due(&self, until: Instant) -> Option<(TimerHandle, E)> {
        let mut queue = self.queue.borrow_mut();
        let key = *queue.pending.keys().next()?;
        if key.0 > until {
            return None;
        }
        let event = queue.pending.remove(&key)?;
        queue.deadlines.remove(&key.1);
        if key.0 > queue.now {
            queue.now = key.0;
        }
        Some((TimerHandle::new(key.1), event))
    }

    /// Moves the clock forward without firing anything.
    pub fn advance_to(&self, until: Instant) {
        let mut queue = self.queue.borrow_mut();
        if until > queue.now {
            queue.now = until;
        }
    }

    pub fn advance(&self, delay: Duration) {
        let until = self.now() + delay;
        self.advance_to(until);
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }
}

impl<E> Timers<E> for ManualTimers<E> {
    fn now(&self) -> Instant {
        self.queue.borrow().now
    }

    fn schedule(&mut self, delay: Duration, event: E) -> TimerHandle {
        let mut queue = self.queue.borrow_mut();
        let id = queue.next_id;
        queue.next_id += 1;
        let deadline = queue.now + delay;
        queue.pending.insert((deadline, id), event);
        queue.deadlines.insert(id, deadline);
        TimerHandle::new(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut queue = self.queue.borrow_mut();
        if let Some(deadline) = queue.deadlines.remove(&handle.id()) {
            queue.pending.remove(&(deadline, handle.id()));
        }
    }
}

/// A datagram handed to a `RecordingTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub payload: Vec<u8>,
    pub destination: SocketAddrV4,
    pub interface: Option<InterfaceId>,
}

impl Sent {
    pub fn message(&self) -> Result<LeaseMessage, Error> {
        LeaseMessage::from_bytes(&self.payload)
    }
}

/// Records every datagram instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    outbox: Rc<RefCell<Vec<Sent>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the datagrams sent so far.
    pub fn take(&self) -> Vec<Sent> {
        self.outbox.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.outbox.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.borrow().is_empty()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, payload: &[u8], destination: SocketAddrV4, interface: Option<InterfaceId>) -> io::Result<()> {
        self.outbox.borrow_mut().push(Sent {
            payload: payload.to_vec(),
            destination,
            interface,
        });
        Ok(())
    }
}
