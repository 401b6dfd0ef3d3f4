// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, PartialEq)]
struct PendingTask<K, P> {
    handle: TaskHandle,
    key: K,
    due: Duration,
    payload: P,
}

/// Cancellable delayed tasks on a caller-supplied clock.
///
/// Time is the elapsed `Duration` since the owner started. Each key holds at
/// most one pending task: scheduling a key again cancels its previous task,
/// which makes every key a debounce slot.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedTasks<K, P> {
    pending: Vec<PendingTask<K, P>>,
    next_handle: u64,
}

impl<K, P> Default for DelayedTasks<K, P> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<K: Copy + Eq, P> DelayedTasks<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: K, payload: P, now: Duration, delay: Duration) -> TaskHandle {
        self.cancel_key(key);
        let handle = TaskHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.pending.push(PendingTask {
            handle,
            key,
            due: now.saturating_add(delay),
            payload,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_key(&mut self, key: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.key != key);
        self.pending.len() != before
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|task| task.key == key)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|task| task.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every task due at `now`, earliest first. Tasks due
    /// at the same instant come out in scheduling order.
    pub fn take_due(&mut self, now: Duration) -> Vec<(K, P)> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due <= now {
                due.push(self.pending.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|task| (task.due, task.handle));
        due.into_iter().map(|task| (task.key, task.payload)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::DelayedTasks;
    use std::time::Duration;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn task_fires_once_after_delay() {
        let mut tasks = DelayedTasks::new();
        tasks.schedule("scroll", 3_usize, ms(0), ms(400));

        assert!(tasks.take_due(ms(399)).is_empty());
        assert_eq!(tasks.take_due(ms(400)), vec![("scroll", 3)]);
        assert!(tasks.take_due(ms(10_000)).is_empty());
        assert!(tasks.is_empty());
    }

    #[test]
    fn rescheduling_a_key_cancels_the_previous_task() {
        let mut tasks = DelayedTasks::new();
        let first = tasks.schedule("debounce", 1_usize, ms(0), ms(1300));
        tasks.schedule("debounce", 2_usize, ms(500), ms(1300));

        assert_eq!(tasks.len(), 1);
        assert!(!tasks.cancel(first));
        assert!(tasks.take_due(ms(1300)).is_empty());
        assert_eq!(tasks.take_due(ms(1800)), vec![("debounce", 2)]);
    }

    #[test]
    fn independent_keys_fire_in_deadline_order() {
        let mut tasks = DelayedTasks::new();
        tasks.schedule("late", 'a', ms(0), ms(600));
        tasks.schedule("early", 'b', ms(0), ms(100));
        tasks.schedule("tie", 'c', ms(0), ms(600));

        assert_eq!(tasks.next_due(), Some(ms(100)));
        assert_eq!(
            tasks.take_due(ms(1000)),
            vec![("early", 'b'), ("late", 'a'), ("tie", 'c')]
        );
    }

    #[test]
    fn cancel_by_handle_and_key() {
        let mut tasks = DelayedTasks::new();
        let handle = tasks.schedule(1_u8, (), ms(0), ms(10));
        tasks.schedule(2_u8, (), ms(0), ms(10));

        assert!(tasks.is_pending(1));
        assert!(tasks.cancel(handle));
        assert!(!tasks.is_pending(1));
        assert!(tasks.cancel_key(2));
        assert!(!tasks.cancel_key(2));
        assert!(tasks.take_due(ms(10)).is_empty());
    }
}
