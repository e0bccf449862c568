//! One-shot deferred events.
//!
//! Every timer use-site owns its own instance and polls it from the actor's
//! tick. A fire is consumed by the poll that observes it, so cancelling
//! after that poll is a no-op on the in-flight fire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single cancellable deferred fire
#[derive(Debug, Default)]
pub struct DeferredTimer {
    due: Option<DateTime<Utc>>,
}

impl DeferredTimer {
    /// Arm the timer, replacing any pending fire
    pub fn arm(&mut self, due: DateTime<Utc>) {
        self.due = Some(due);
    }

    /// Disarm; returns whether a fire was pending
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due
    }

    /// Consume the fire if it is due at `now`
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Keyed one-shot fires; one entry per key.
/// Serializes as a plain `{ key: time }` map.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerQueue {
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl TimerQueue {
    /// Schedule `key`, replacing an existing entry with the same key
    pub fn schedule(&mut self, key: impl Into<String>, due: DateTime<Utc>) {
        self.entries.insert(key.into(), due);
    }

    pub fn cancel(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.entries.iter().map(|(key, due)| (key.as_str(), *due))
    }

    /// Remove and return every key due at `now`, earliest first
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut due: Vec<(DateTime<Utc>, String)> = self
            .entries
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, key.clone()))
            .collect();
        due.sort();

        for (_, key) in &due {
            self.entries.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_deferred_timer_fires_once() {
        let mut timer = DeferredTimer::default();
        timer.arm(at(1_000));

        assert!(!timer.poll(at(999)));
        assert!(timer.poll(at(1_000)));
        assert!(!timer.poll(at(5_000)));
        assert_eq!(timer.due_at(), None);
    }

    #[test]
    fn test_deferred_timer_cancel() {
        let mut timer = DeferredTimer::default();
        timer.arm(at(1_000));

        assert!(timer.cancel());
        assert!(!timer.poll(at(2_000)));
        assert!(!timer.cancel());
    }

    #[test]
    fn test_deferred_timer_rearm_replaces() {
        let mut timer = DeferredTimer::default();
        timer.arm(at(1_000));
        timer.arm(at(3_000));

        assert!(!timer.poll(at(2_000)));
        assert!(timer.poll(at(3_000)));
    }

    #[test]
    fn test_queue_takes_due_in_order() {
        let mut queue = TimerQueue::default();
        queue.schedule("b", at(2_000));
        queue.schedule("a", at(3_000));
        queue.schedule("c", at(1_000));
        queue.schedule("later", at(9_000));

        assert_eq!(queue.take_due(at(3_000)), vec!["c", "b", "a"]);
        assert_eq!(queue.iter().count(), 1);
        assert!(queue.take_due(at(3_000)).is_empty());
    }

    #[test]
    fn test_queue_reschedule_replaces_entry() {
        let mut queue = TimerQueue::default();
        queue.schedule("k", at(1_000));
        queue.schedule("k", at(5_000));

        assert_eq!(queue.iter().count(), 1);
        assert!(queue.take_due(at(1_000)).is_empty());
        assert_eq!(queue.take_due(at(5_000)), vec!["k"]);
    }

    #[test]
    fn test_queue_json_is_plain_map() {
        let mut queue = TimerQueue::default();
        queue.schedule("TASK_REMINDER_1", at(0));

        let json = serde_json::to_string(&queue).unwrap();
        assert_eq!(json, r#"{"TASK_REMINDER_1":"1970-01-01T00:00:00Z"}"#);
        assert_eq!(serde_json::from_str::<TimerQueue>(&json).unwrap(), queue);
    }

    #[test]
    fn test_queue_cancel_after_take_is_noop() {
        let mut queue = TimerQueue::default();
        queue.schedule("k", at(1_000));

        assert_eq!(queue.take_due(at(1_000)), vec!["k"]);
        assert!(!queue.cancel("k"));
    }
}
