use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use crate::domain::MessageRef;

/// Drops re-delivered updates: a message seen within `window` is a duplicate.
///
/// Bounded to `capacity` entries; the oldest are evicted first.
#[derive(Clone, Debug)]
pub struct MessageDeduplicator {
    capacity: usize,
    window: Duration,
    seen: HashMap<MessageRef, Instant>,
    order: VecDeque<(MessageRef, Instant)>,
}

impl MessageDeduplicator {
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window,
            seen: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// `true` if the message is new and should be processed.
    pub fn check(&mut self, key: MessageRef) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&mut self, key: MessageRef, now: Instant) -> bool {
        self.expire(now);

        if let Some(first_seen) = self.seen.get(&key) {
            if now.saturating_duration_since(*first_seen) < self.window {
                return false;
            }
        }

        while self.seen.len() >= self.capacity {
            let Some((old, at)) = self.order.pop_front() else {
                break;
            };
            // Skip queue entries superseded by a later insert of the same key.
            if self.seen.get(&old) == Some(&at) {
                self.seen.remove(&old);
            }
        }

        self.seen.insert(key, now);
        self.order.push_back((key, now));
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&(key, at)) = self.order.front() {
            if now.saturating_duration_since(at) < self.window {
                break;
            }
            self.order.pop_front();
            if self.seen.get(&key) == Some(&at) {
                self.seen.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId};

    fn msg(chat: i64, id: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(chat),
            message_id: MessageId(id),
        }
    }

    #[test]
    fn rejects_repeat_within_window() {
        let mut dedup = MessageDeduplicator::new(10, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(dedup.check_at(msg(1, 1), t0));
        assert!(!dedup.check_at(msg(1, 1), t0 + Duration::from_secs(5)));
        // Same message id in another chat is a different message.
        assert!(dedup.check_at(msg(2, 1), t0 + Duration::from_secs(5)));
    }

    #[test]
    fn accepts_again_after_window() {
        let mut dedup = MessageDeduplicator::new(10, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(dedup.check_at(msg(1, 1), t0));
        assert!(dedup.check_at(msg(1, 1), t0 + Duration::from_secs(61)));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut dedup = MessageDeduplicator::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(dedup.check_at(msg(1, 1), t0));
        assert!(dedup.check_at(msg(1, 2), t0));
        assert!(dedup.check_at(msg(1, 3), t0));
        assert_eq!(dedup.len(), 2);

        // (1,1) was evicted, (1,3) is still remembered.
        assert!(dedup.check_at(msg(1, 1), t0));
        assert!(!dedup.check_at(msg(1, 3), t0));
    }
}
