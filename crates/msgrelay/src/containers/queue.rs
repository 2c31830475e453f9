// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unbounded singly-linked FIFO.
//!
//! The queue owns the node chain from head to tail; `push` appends at the
//! tail in O(1) through a raw tail pointer, `pop` unlinks the head.
//!
//! Not internally synchronized. The relay path checks [`Queue::is_empty`]
//! and pops under the same lock that guards pushes.

use std::fmt;
use std::ptr::NonNull;

struct Node<T> {
    value: T,
    next: Option<Box<Node<T>>>,
}

/// Linked FIFO queue.
pub struct Queue<T> {
    head: Option<Box<Node<T>>>,
    /// Last node of the chain owned by `head`; `None` iff the queue is empty.
    tail: Option<NonNull<Node<T>>>,
    len: usize,
}

// SAFETY: `tail` only ever points into the chain owned by `head`, so moving
// the queue to another thread moves the whole chain with it.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Sync> Sync for Queue<T> {}

impl<T> Queue<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Append `value` at the tail.
    pub fn push(&mut self, value: T) {
        let mut node = Box::new(Node { value, next: None });
        let new_tail = NonNull::from(node.as_mut());

        match self.tail {
            // SAFETY: `tail` points at the last node of the chain owned by
            // `self.head`, and `&mut self` guarantees exclusive access.
            Some(mut tail) => unsafe { tail.as_mut().next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(new_tail);
        self.len += 1;
    }

    /// Remove and return the head, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        let head = self.head.take()?;
        let Node { value, next } = *head;
        self.head = next;
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(value)
    }

    pub fn peek(&self) -> Option<&T> {
        self.head.as_deref().map(|node| &node.value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Unlink iteratively; recursive Box drops overflow on long chains.
        let mut cur = self.head.take();
        while let Some(mut node) = cur {
            cur = node.next.take();
        }
        self.tail = None;
    }
}

impl<T: fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("len", &self.len)
            .field("head", &self.peek())
            .finish()
    }
}
