// Bounded staging queue (§4.A). FIFO, fixed capacity, drop-at-enqueue on
// overflow. `Stage` takes a short `parking_lot::Mutex` and never awaits, so
// it can never block a caller on a full queue — it either enqueues or
// reports `QueueFull` synchronously.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::ProxyError;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue `item`. Never blocks. Fails with `QueueFull` when the queue
    /// is already at capacity, or `Closed` once `close()` has run.
    pub fn stage(&self, item: T) -> Result<(), ProxyError> {
        let mut guard = self.inner.lock();
        if guard.closed {
            return Err(ProxyError::Closed);
        }
        if guard.items.len() >= self.capacity {
            return Err(ProxyError::QueueFull);
        }
        guard.items.push_back(item);
        drop(guard);
        self.notify.notify_one();
        Ok(())
    }

    /// Blocks until an item is available or the queue is closed and
    /// drained, in which case it returns `None` (EOF).
    pub async fn drain(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut guard = self.inner.lock();
                if let Some(item) = guard.items.pop_front() {
                    return Some(item);
                }
                if guard.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stops accepting new items. Buffered items remain drainable until
    /// exhausted, after which `drain` returns `None`.
    pub fn close(&self) {
        let mut guard = self.inner.lock();
        guard.closed = true;
        drop(guard);
        self.notify.notify_waiters();
    }

    /// Discards any buffered items immediately, in addition to closing.
    pub fn close_and_discard(&self) {
        let mut guard = self.inner.lock();
        guard.closed = true;
        guard.items.clear();
        drop(guard);
        self.notify.notify_waiters();
    }

    pub fn size(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn stage_respects_capacity_boundary() {
        let q: BoundedQueue<i32> = BoundedQueue::new(2);
        assert!(q.stage(1).is_ok());
        assert_eq!(q.size(), 1);
        assert!(q.stage(2).is_ok());
        assert_eq!(q.size(), 2);
        match q.stage(3) {
            Err(ProxyError::QueueFull) => {}
            other => panic!("expected QueueFull, got {other:?}"),
        }
        assert_eq!(q.size(), 2, "rejected stage must not mutate queue state");
    }

    #[tokio::test]
    async fn drain_blocks_until_item_then_returns_fifo_order() {
        let q = Arc::new(BoundedQueue::new(4));
        q.stage(1).unwrap();
        q.stage(2).unwrap();
        assert_eq!(q.drain().await, Some(1));
        assert_eq!(q.drain().await, Some(2));
    }

    #[tokio::test]
    async fn stage_after_close_fails() {
        let q: BoundedQueue<i32> = BoundedQueue::new(4);
        q.close();
        match q.stage(1) {
            Err(ProxyError::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drain_returns_remaining_then_eof_after_close() {
        let q: BoundedQueue<i32> = BoundedQueue::new(4);
        q.stage(1).unwrap();
        q.close();
        assert_eq!(q.drain().await, Some(1));
        assert_eq!(q.drain().await, None);
    }

    #[tokio::test]
    async fn close_and_discard_empties_immediately() {
        let q: BoundedQueue<i32> = BoundedQueue::new(4);
        q.stage(1).unwrap();
        q.stage(2).unwrap();
        q.close_and_discard();
        assert_eq!(q.drain().await, None);
    }
}
