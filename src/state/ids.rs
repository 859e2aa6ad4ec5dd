//! Unique id generation for markers and photos

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of fresh, unique ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-derived ids (epoch millis) that never repeat.
///
/// Two calls inside the same millisecond get consecutive values instead of
/// the same one.
#[derive(Debug, Default)]
pub struct MonotonicIds {
    last: AtomicI64,
}

impl MonotonicIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_value(&self, now_millis: i64) -> i64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_millis.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&self) -> String {
        self.next_value(Utc::now().timestamp_millis()).to_string()
    }
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_millisecond_ids_are_distinct() {
        let ids = MonotonicIds::new();
        assert_eq!(ids.next_value(1000), 1000);
        assert_eq!(ids.next_value(1000), 1001);
        assert_eq!(ids.next_value(999), 1002);
        assert_eq!(ids.next_value(5000), 5000);
    }

    #[test]
    fn test_rapid_ids_unique() {
        let ids = MonotonicIds::new();
        let seen: HashSet<String> = (0..500).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn test_uuid_ids_unique() {
        let ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
