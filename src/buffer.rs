use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    blocked_pushes: AtomicU64,
}

/// A bounded, closable multi-producer multi-consumer queue.
///
/// `push` blocks while the queue is full, which throttles producers to the
/// pace of the consumers. After [`WorkQueue::close`] no new item is accepted,
/// but everything already queued is still handed out; consumers only see
/// end-of-stream once the backlog is drained.
pub struct WorkQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> WorkQueue<T> {
    /// Create a queue holding at most `capacity` items (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items: VecDeque::with_capacity(capacity.min(1024)),
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
                blocked_pushes: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue `item`, waiting for room if the queue is full.
    ///
    /// Hands the item back if the queue is, or becomes, closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        if !state.closed && state.items.len() >= shared.capacity {
            shared.blocked_pushes.fetch_add(1, Ordering::Relaxed);
            while !state.closed && state.items.len() >= shared.capacity {
                shared.not_full.wait(&mut state);
            }
        }
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        shared.not_empty.notify_one();
        Ok(())
    }

    /// Take the next item, waiting until one arrives.
    ///
    /// Returns `None` only once the queue is closed and empty.
    pub fn pop_blocking(&self) -> Option<T> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                shared.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            shared.not_empty.wait(&mut state);
        }
    }

    /// Take the next item if one is queued right now
    pub fn try_pop(&self) -> Option<T> {
        let item = self.shared.state.lock().items.pop_front();
        if item.is_some() {
            self.shared.not_full.notify_one();
        }
        item
    }

    /// Stop accepting items and wake every waiting producer and consumer
    pub fn close(&self) {
        self.shared.state.lock().closed = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Blocking iterator over the items, ending at end-of-stream
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { queue: self }
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Current fill level as a percentage (0-100)
    pub fn utilization(&self) -> u32 {
        ((self.len() * 100) / self.capacity()).min(100) as u32
    }

    /// Number of pushes that had to wait for room
    pub fn blocked_pushes(&self) -> u64 {
        self.shared.blocked_pushes.load(Ordering::Relaxed)
    }
}

/// Iterator returned by [`WorkQueue::iter`]
pub struct Iter<'a, T> {
    queue: &'a WorkQueue<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.pop_blocking()
    }
}
