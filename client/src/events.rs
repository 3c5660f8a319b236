//! In-process publish/subscribe for domain events.
//!
//! Delivery contract: listeners registered at dispatch time receive the
//! event synchronously, in registration order. No replay for late
//! subscribers, no ordering guarantee across independent event names.

use crate::poll::{Address, PollId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Closed union of every event the application broadcasts.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    PollCreated {
        poll_id: PollId,
    },
    VoteCompleted {
        poll_id: PollId,
    },
    UserVoted {
        poll_id: PollId,
        voter: Address,
    },
    RewardClaimed {
        wallet: Address,
        amount: u128,
    },
    ShowCreatePoll,
    ShowAllPolls,
    ShowUserProfileModal {
        wallet: Address,
    },
    Toast {
        message: String,
        kind: ToastKind,
    },
}

impl Event {
    pub fn success_toast(message: impl Into<String>) -> Self {
        Event::Toast {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn error_toast(message: impl Into<String>) -> Self {
        Event::Toast {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }
}

struct Subscriber {
    id: u64,
    queue: Arc<Mutex<VecDeque<Event>>>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

/// Cheaply clonable handle to the shared bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                queue: queue.clone(),
            });
        Subscription {
            id,
            queue,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn dispatch(&self, event: Event) {
        log::debug!("dispatching {:?}", event);
        let subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Explicit listener handle; dropping it unregisters the listener.
pub struct Subscription {
    id: u64,
    queue: Arc<Mutex<VecDeque<Event>>>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn try_next(&self) -> Option<Event> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn drain(&self) -> Vec<Event> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|s| s.id != self.id);
        }
    }
}
