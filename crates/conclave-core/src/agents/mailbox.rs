//! Per-agent inbound message queue

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A message waiting in an agent's mailbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// ID of the sending agent
    pub from: String,

    /// Message content
    pub content: String,
}

impl Envelope {
    pub fn new(from: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            content: content.into(),
        }
    }
}

/// FIFO queue with its own lock so any task can deliver into it
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
}

impl Mailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        // A panic while holding the lock cannot leave the queue half-written
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, envelope: Envelope) {
        self.lock().push_back(envelope);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued envelopes, oldest first
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.lock().iter().cloned().collect()
    }

    /// Take every queued envelope in one step.
    ///
    /// The envelopes go back to the front of the queue when the returned
    /// guard is dropped without [`Drained::commit`].
    pub fn drain(self: &Arc<Self>) -> Drained {
        let envelopes: Vec<Envelope> = self.lock().drain(..).collect();
        Drained {
            mailbox: Arc::clone(self),
            envelopes,
            committed: false,
        }
    }

    fn restore(&self, envelopes: Vec<Envelope>) {
        let mut queue = self.lock();
        for envelope in envelopes.into_iter().rev() {
            queue.push_front(envelope);
        }
    }
}

/// Envelopes taken from a mailbox for one generation call
#[derive(Debug)]
pub struct Drained {
    mailbox: Arc<Mailbox>,
    envelopes: Vec<Envelope>,
    committed: bool,
}

impl Drained {
    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// The envelopes were consumed; do not requeue them
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Drained {
    fn drop(&mut self) {
        if !self.committed && !self.envelopes.is_empty() {
            debug!("Requeueing {} undelivered envelope(s)", self.envelopes.len());
            self.mailbox.restore(std::mem::take(&mut self.envelopes));
        }
    }
}
