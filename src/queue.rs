//! A thread-safe FIFO queue with multiple priority lanes.
//!
//! Lane 0 is the most urgent: `pop_front` always drains the lowest-numbered
//! non-empty lane first, and items within a lane dequeue in FIFO order.
//!
//! The queue can be *disabled*, which gates `push_back` only. The raw push
//! operations bypass the gate; the pool uses them for internal control
//! signals that must get through even while user enqueues are rejected.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex};

use crate::error::EnqueueError;

#[derive(Debug)]
struct Lanes<T> {
    lanes: Vec<VecDeque<T>>,
    len: usize,
    enabled: bool,
}

impl<T> Lanes<T> {
    /// Removes and returns the front item of the most urgent non-empty lane.
    fn take_front(&mut self) -> Option<(T, usize)> {
        let priority = self.lanes.iter().position(|lane| !lane.is_empty())?;
        let item = self.lanes[priority].pop_front()?;
        self.len -= 1;
        Some((item, priority))
    }
}

/// A multi-priority FIFO with blocking pop and enable/disable gating.
pub struct MultipriorityQueue<T> {
    num_priorities: usize,
    inner: Mutex<Lanes<T>>,
    not_empty: Condvar,
}

impl<T> fmt::Debug for MultipriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MultipriorityQueue")
            .field("num_priorities", &self.num_priorities)
            .field("len", &inner.len)
            .field("enabled", &inner.enabled)
            .finish()
    }
}

impl<T> MultipriorityQueue<T> {
    /// Creates an empty, enabled queue with `num_priorities` lanes.
    pub fn new(num_priorities: usize) -> Self {
        assert!(num_priorities >= 1, "a queue needs at least one priority lane");
        Self {
            num_priorities,
            inner: Mutex::new(Lanes {
                lanes: (0..num_priorities).map(|_| VecDeque::new()).collect(),
                len: 0,
                enabled: true,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Appends `item` to the back of its priority lane.
    ///
    /// Fails with [`EnqueueError::Disabled`] if the queue is disabled.
    pub fn push_back(&self, item: T, priority: usize) -> Result<(), EnqueueError> {
        let mut inner = self.inner.lock().unwrap();
        assert!(priority < self.num_priorities, "priority {priority} out of range");
        if !inner.enabled {
            return Err(EnqueueError::Disabled);
        }
        inner.lanes[priority].push_back(item);
        inner.len += 1;
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Inserts `item` at the *front* of its priority lane, ahead of items
    /// already queued there. Bypasses the enable/disable gate.
    pub fn push_front(&self, item: T, priority: usize) {
        let mut inner = self.inner.lock().unwrap();
        assert!(priority < self.num_priorities, "priority {priority} out of range");
        inner.lanes[priority].push_front(item);
        inner.len += 1;
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Front-pushes every item of `items` under a single lock acquisition,
    /// bypassing the enable/disable gate, and wakes all blocked poppers.
    ///
    /// Items land at the front of the lane in reverse iteration order.
    pub fn push_front_multiple_raw<I>(&self, items: I, priority: usize)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.lock().unwrap();
        assert!(priority < self.num_priorities, "priority {priority} out of range");
        let mut added = 0;
        for item in items {
            inner.lanes[priority].push_front(item);
            added += 1;
        }
        inner.len += added;
        drop(inner);
        self.not_empty.notify_all();
    }

    /// Back-pushes every item of `items` under a single lock acquisition,
    /// bypassing the enable/disable gate, and wakes all blocked poppers.
    pub fn push_back_multiple_raw<I>(&self, items: I, priority: usize)
    where
        I: IntoIterator<Item = T>,
    {
        let mut inner = self.inner.lock().unwrap();
        assert!(priority < self.num_priorities, "priority {priority} out of range");
        let mut added = 0;
        for item in items {
            inner.lanes[priority].push_back(item);
            added += 1;
        }
        inner.len += added;
        drop(inner);
        self.not_empty.notify_all();
    }

    /// Removes and returns the most urgent item, blocking while the queue is
    /// empty. Also returns the priority the item was queued at.
    pub fn pop_front(&self) -> (T, usize) {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(found) = inner.take_front() {
                return found;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Non-blocking variant of [`pop_front`](Self::pop_front).
    pub fn try_pop_front(&self) -> Option<(T, usize)> {
        self.inner.lock().unwrap().take_front()
    }

    /// Allows `push_back` to accept items again.
    pub fn enable(&self) {
        self.inner.lock().unwrap().enabled = true;
    }

    /// Makes `push_back` reject items. Raw pushes and pops are unaffected.
    pub fn disable(&self) {
        self.inner.lock().unwrap().enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().unwrap().enabled
    }

    /// Discards every queued item.
    pub fn remove_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        for lane in &mut inner.lanes {
            lane.clear();
        }
        inner.len = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_priorities(&self) -> usize {
        self.num_priorities
    }
}
