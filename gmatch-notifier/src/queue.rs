// Bounded dispatch queue with oldest-drop overflow

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::warn;

use crate::event::MatchEvent;

/// Fixed-capacity event queue between the scheduler and the send worker.
/// Overflow drops the oldest pending event rather than blocking the
/// scheduler; event rates are far below 1/s, so drops only happen when the
/// transport is stuck.
pub struct DispatchQueue {
    events: Mutex<VecDeque<MatchEvent>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl DispatchQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue an event. Never blocks and never fails; a full queue sheds
    /// its oldest event.
    pub fn push(&self, event: MatchEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(mut events) = self.events.lock() {
            if events.len() == self.capacity {
                if let Some(dropped) = events.pop_front() {
                    warn!(recipient = dropped.recipient(), "notification queue full, dropping oldest event");
                }
            }
            events.push_back(event);
        }
        self.notify.notify_one();
    }

    /// Wait for the next event; `None` once the queue is closed and fully
    /// drained.
    pub async fn pop(&self) -> Option<MatchEvent> {
        loop {
            let notified = self.notify.notified();
            {
                if let Ok(mut events) = self.events.lock() {
                    if let Some(event) = events.pop_front() {
                        return Some(event);
                    }
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting events and wake the worker so it can drain and exit.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired(email: &str) -> MatchEvent {
        MatchEvent::Expired {
            email: email.to_string(),
            display_name: "t".to_string(),
        }
    }

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let queue = DispatchQueue::new(4);
        queue.push(expired("a@x"));
        queue.push(expired("b@x"));

        assert_eq!(queue.pop().await.unwrap().recipient(), "a@x");
        assert_eq!(queue.pop().await.unwrap().recipient(), "b@x");
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let queue = DispatchQueue::new(2);
        queue.push(expired("a@x"));
        queue.push(expired("b@x"));
        queue.push(expired("c@x"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().await.unwrap().recipient(), "b@x");
        assert_eq!(queue.pop().await.unwrap().recipient(), "c@x");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = DispatchQueue::new(4);
        queue.push(expired("a@x"));
        queue.close();
        queue.push(expired("b@x")); // ignored after close

        assert_eq!(queue.pop().await.unwrap().recipient(), "a@x");
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = std::sync::Arc::new(DispatchQueue::new(4));
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        queue.push(expired("a@x"));

        let event = waiter.await.unwrap();
        assert_eq!(event.unwrap().recipient(), "a@x");
    }
}
