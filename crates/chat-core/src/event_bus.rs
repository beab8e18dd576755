//! Event bus for decoupled communication between the chat store and UI.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Consumers either subscribe with a callback or, when they
//! render in frames, drain the buffered events each frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use chat_types::event::ChatEvent;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

type Subscriber = Rc<dyn Fn(&ChatEvent)>;

struct BusInner {
    buffered: bool,
    queue: VecDeque<ChatEvent>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

/// Shared event bus, clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    /// A bus that notifies subscribers and also buffers events for `drain`.
    pub fn new() -> Self {
        Self::with_buffering(true)
    }

    /// A bus that only notifies subscribers.
    pub fn unbuffered() -> Self {
        Self::with_buffering(false)
    }

    fn with_buffering(buffered: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                buffered,
                queue: VecDeque::new(),
                subscribers: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Register a callback invoked synchronously for every emitted event.
    pub fn subscribe(&self, callback: impl Fn(&ChatEvent) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Rc::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    /// Publish an event. Called by the chat store.
    pub fn emit(&self, event: ChatEvent) {
        // Callbacks run outside the borrow so they may emit or subscribe
        let subscribers: Vec<Subscriber> = {
            let mut inner = self.inner.borrow_mut();
            if inner.buffered {
                inner.queue.push_back(event.clone());
            }
            inner.subscribers.iter().map(|(_, s)| s.clone()).collect()
        };
        for subscriber in subscribers {
            subscriber(&event);
        }
    }

    /// Drain all pending events. Called by frame-driven UI each frame.
    pub fn drain(&self) -> Vec<ChatEvent> {
        self.inner.borrow_mut().queue.drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().queue.is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
