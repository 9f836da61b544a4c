//! Bounded FIFO buffer for outbound messages awaiting a live transport.
//!
//! Messages sent while the session is not connected land here and are
//! replayed, oldest first, as soon as the transport opens. The buffer is
//! bounded: when full, the oldest entry is evicted to make room for the
//! newest, so after a long offline gap the buffer holds the most recent
//! tail of the conversation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A buffered outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Correlation id for log lines; never transmitted.
    pub id: Uuid,
    /// Message body, transmitted verbatim.
    pub body: String,
    /// When the message entered the buffer.
    pub queued_at: DateTime<Utc>,
}

impl QueuedMessage {
    fn new(body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
            queued_at: Utc::now(),
        }
    }
}

/// Bounded FIFO queue of [`QueuedMessage`]s.
#[derive(Debug)]
pub struct PendingQueue {
    items: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl PendingQueue {
    /// Creates an empty queue bounded at `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message, evicting the oldest entry if the queue is full.
    ///
    /// Returns the new message's correlation id and the evicted entry,
    /// if any, so the caller can log and count the drop.
    pub fn enqueue(&mut self, body: String) -> (Uuid, Option<QueuedMessage>) {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        let message = QueuedMessage::new(body);
        let id = message.id;
        self.items.push_back(message);
        (id, evicted)
    }

    /// Removes and returns the oldest message.
    pub fn dequeue(&mut self) -> Option<QueuedMessage> {
        self.items.pop_front()
    }

    /// Puts a message back at the front of the queue.
    ///
    /// Used when a drain is interrupted mid-flight. Only messages taken
    /// from this queue are put back, so the bound cannot be exceeded.
    pub fn requeue_front(&mut self, message: QueuedMessage) {
        self.items.push_front(message);
    }

    /// Returns the number of buffered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn bodies(queue: &mut PendingQueue) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(msg) = queue.dequeue() {
            out.push(msg.body);
        }
        out
    }

    #[test]
    fn drains_in_fifo_order() {
        let mut queue = PendingQueue::new(8);
        queue.enqueue("one".to_string());
        queue.enqueue("two".to_string());
        queue.enqueue("three".to_string());

        assert_eq!(bodies(&mut queue), vec!["one", "two", "three"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut queue = PendingQueue::new(2);
        queue.enqueue("one".to_string());
        queue.enqueue("two".to_string());
        let (_, evicted) = queue.enqueue("three".to_string());

        assert_eq!(evicted.map(|m| m.body), Some("one".to_string()));
        assert_eq!(bodies(&mut queue), vec!["two", "three"]);
    }

    #[test]
    fn requeue_front_restores_order() {
        let mut queue = PendingQueue::new(8);
        queue.enqueue("one".to_string());
        queue.enqueue("two".to_string());

        let Some(first) = queue.dequeue() else {
            panic!("queue not empty");
        };
        queue.requeue_front(first);

        assert_eq!(bodies(&mut queue), vec!["one", "two"]);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut queue = PendingQueue::new(0);
        queue.enqueue("one".to_string());
        let (_, evicted) = queue.enqueue("two".to_string());

        assert_eq!(evicted.map(|m| m.body), Some("one".to_string()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut queue = PendingQueue::new(4);
        let (a, _) = queue.enqueue("x".to_string());
        let (b, _) = queue.enqueue("x".to_string());
        assert_ne!(a, b);
    }
}
