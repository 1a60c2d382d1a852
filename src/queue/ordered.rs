//! Ordered queue
//!
//! A doubly linked sequence backed by an index arena. Nodes live in a `Vec`
//! of slots and link to each other by slot index, which keeps push/pop at
//! either end O(1) without any unsafe pointer juggling. Freed slots are
//! recycled through a free list.
//!
//! Besides plain FIFO use, values can be inserted in order of an integer
//! priority (higher first) or of a timestamp (earlier first, unset before
//! set). Ordered inserts scan linearly from the front, which is fine for the
//! shallow per-client backlogs this type is used for.

use chrono::{DateTime, Utc};

/// Stable reference to a node, returned by every insert.
///
/// A handle stays valid until its node is removed. After that the slot may be
/// reused, but the generation no longer matches, so the stale handle is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    priority: i64,
    timestamp: Option<DateTime<Utc>>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    node: Option<Node<T>>,
}

#[derive(Debug)]
pub struct OrderedQueue<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for OrderedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedQueue<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of linked nodes. O(1).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` at the front and returns its handle.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value, 0, None);
        self.link_before(index, self.head);
        self.handle(index)
    }

    /// Inserts `value` at the back and returns its handle.
    pub fn push_back(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value, 0, None);
        self.link_before(index, None);
        self.handle(index)
    }

    /// Appends every value of `values` at the back, in iteration order.
    pub fn push_back_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.push_back(value);
        }
    }

    /// Removes and returns the front value, or `None` when the queue is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.unlink(head)
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|index| &self.node(index).value)
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.map(|index| &self.node(index).value)
    }

    /// Inserts `value` keeping priorities non-increasing from front to back.
    ///
    /// The new node goes immediately before the first node with a strictly
    /// lower priority, so equal priorities keep their arrival order.
    pub fn insert_by_priority(&mut self, value: T, priority: i64) -> NodeHandle {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node(index);
            if node.priority < priority {
                break;
            }
            cursor = node.next;
        }

        let index = self.alloc(value, priority, None);
        self.link_before(index, cursor);
        self.handle(index)
    }

    /// Inserts `value` keeping timestamps ascending from front to back.
    ///
    /// Unset timestamps sort before any set one. Among equal keys, arrival
    /// order is kept.
    pub fn insert_by_timestamp(
        &mut self,
        value: T,
        timestamp: Option<DateTime<Utc>>,
    ) -> NodeHandle {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node(index);
            if timestamp_after(node.timestamp, timestamp) {
                break;
            }
            cursor = node.next;
        }

        let index = self.alloc(value, 0, timestamp);
        self.link_before(index, cursor);
        self.handle(index)
    }

    /// Removes the node behind `handle` and returns its value.
    ///
    /// Returns `None` if the handle is stale (its node was already removed).
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation || slot.node.is_none() {
            return None;
        }
        self.unlink(handle.index)
    }

    /// Drops every value. Outstanding handles become stale.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// Re-orders the queue by priority, highest first. Stable.
    pub fn sort_by_priority(&mut self) {
        self.rebuild_sorted(|a, b| b.priority.cmp(&a.priority));
    }

    /// Re-orders the queue by timestamp, unset first, then earliest. Stable.
    pub fn sort_by_timestamp(&mut self) {
        // `Option` orders `None` before any `Some`, which is exactly the rule.
        self.rebuild_sorted(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    /// Iterates values from front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, index: usize) -> &Node<T> {
        match self.slots[index].node.as_ref() {
            Some(node) => node,
            None => unreachable!("linked index {index} points at a free slot"),
        }
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        match self.slots[index].node.as_mut() {
            Some(node) => node,
            None => unreachable!("linked index {index} points at a free slot"),
        }
    }

    fn alloc(&mut self, value: T, priority: i64, timestamp: Option<DateTime<Utc>>) -> usize {
        let node = Node {
            value,
            priority,
            timestamp,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Links the freshly allocated node `index` before `at`, or at the back
    /// when `at` is `None`.
    fn link_before(&mut self, index: usize, at: Option<usize>) {
        let prev = match at {
            Some(at) => self.node(at).prev,
            None => self.tail,
        };

        {
            let node = self.node_mut(index);
            node.prev = prev;
            node.next = at;
        }

        match prev {
            Some(prev) => self.node_mut(prev).next = Some(index),
            None => self.head = Some(index),
        }
        match at {
            Some(at) => self.node_mut(at).prev = Some(index),
            None => self.tail = Some(index),
        }

        self.len += 1;
    }

    fn unlink(&mut self, index: usize) -> Option<T> {
        let slot = &mut self.slots[index];
        let mut node = slot.node.take()?;
        slot.generation += 1;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        node.prev = None;
        node.next = None;
        self.free.push(index);
        self.len -= 1;

        Some(node.value)
    }

    fn rebuild_sorted<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Node<T>, &Node<T>) -> std::cmp::Ordering,
    {
        let mut order: Vec<usize> = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            order.push(index);
            cursor = self.node(index).next;
        }

        order.sort_by(|&a, &b| compare(self.node(a), self.node(b)));

        self.head = order.first().copied();
        self.tail = order.last().copied();
        for (position, &index) in order.iter().enumerate() {
            let prev = position.checked_sub(1).map(|p| order[p]);
            let next = order.get(position + 1).copied();
            let node = self.node_mut(index);
            node.prev = prev;
            node.next = next;
        }
    }
}

/// `true` when `existing` sorts strictly after `incoming`.
fn timestamp_after(existing: Option<DateTime<Utc>>, incoming: Option<DateTime<Utc>>) -> bool {
    match (existing, incoming) {
        (Some(existing), Some(incoming)) => existing > incoming,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

pub struct Iter<'a, T> {
    queue: &'a OrderedQueue<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.queue.node(index);
        self.cursor = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a OrderedQueue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
