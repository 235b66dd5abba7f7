//! Timers backed by tokio tasks.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::{sync::mpsc, task::JoinHandle};

use dhcp_protocol::{TimerHandle, Timers};

/// Where `TokioTimers` deliver expiries.
pub type TimerReceiver<E> = mpsc::UnboundedReceiver<(TimerHandle, E)>;

/// Each timer is a sleeping task that posts its event when it wakes up.
///
/// Must be used within a tokio runtime.
pub struct TokioTimers<E> {
    sender: mpsc::UnboundedSender<(TimerHandle, E)>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl<E> TokioTimers<E>
where
    E: Send + 'static,
{
    pub fn new() -> (Self, TimerReceiver<E>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let timers = TokioTimers {
            sender,
            tasks: HashMap::new(),
            next_id: 0,
        };
        (timers, receiver)
    }

    /// The number of timers which have not fired yet.
    pub fn pending(&mut self) -> usize {
        self.tasks.retain(|_, task| !task.is_finished());
        self.tasks.len()
    }
}

impl<E> Timers<E> for TokioTimers<E>
where
    E: Send + 'static,
{
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&mut self, delay: Duration, event: E) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        let handle = TimerHandle::new(self.next_id);
        self.next_id += 1;
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send((handle, event)).is_err() {
                trace!("Timer {} fired after the engine was gone", handle);
            }
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl<E> Drop for TokioTimers<E> {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
