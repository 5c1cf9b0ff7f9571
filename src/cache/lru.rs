//! LRU cache implementation
//!
//! Slab-backed doubly-linked recency list plus a key index, under one RwLock.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{Result, StashError};

use super::Cache;

/// Fixed-capacity least-recently-written cache
///
/// Recency is only refreshed by `write`. `read` is a pure lookup and does not
/// move the entry, so eviction order is insertion/overwrite order.
///
/// ## Concurrency:
/// - `read`: shared lock
/// - `write` / `delete`: exclusive lock
pub struct LruCache {
    capacity: usize,
    state: RwLock<LruState>,
}

impl LruCache {
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StashError::Config(
                "cache capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            state: RwLock::new(LruState::with_capacity(capacity)),
        })
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most to least recently written
    pub fn keys_by_recency(&self) -> Vec<String> {
        let state = self.state.read();
        let mut keys = Vec::with_capacity(state.index.len());
        let mut cursor = state.head;
        while let Some(idx) = cursor {
            let node = state.node(idx);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

impl Cache for LruCache {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        let state = self.state.read();
        state
            .index
            .get(key)
            .map(|&idx| state.node(idx).value.clone())
    }

    fn write(&self, key: &str, value: Vec<u8>) {
        let mut state = self.state.write();

        // Overwrite = drop the old position, re-insert at the front
        if let Some(idx) = state.index.remove(key) {
            state.unlink(idx);
            state.release(idx);
        }

        let idx = state.alloc(Node {
            key: key.to_string(),
            value,
            prev: None,
            next: None,
        });
        state.push_front(idx);
        state.index.insert(key.to_string(), idx);

        while state.index.len() > self.capacity {
            match state.pop_back() {
                Some(evicted) => tracing::trace!(key = %evicted.key, "lru eviction"),
                None => break,
            }
        }
    }

    fn delete(&self, key: &str) {
        let mut state = self.state.write();
        if let Some(idx) = state.index.remove(key) {
            state.unlink(idx);
            state.release(idx);
        }
    }
}

// =============================================================================
// Internal list structure
// =============================================================================

struct Node {
    key: String,
    value: Vec<u8>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list stored in a slab. Freed slots are recycled through `free`.
///
/// Invariant: every index in `index` points at an occupied slot that is
/// linked exactly once between `head` and `tail`, and vice versa.
struct LruState {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    /// Most recently written
    head: Option<usize>,
    /// Least recently written
    tail: Option<usize>,
}

impl LruState {
    fn with_capacity(capacity: usize) -> Self {
        // One spare slot: a write inserts before it evicts
        let slots = capacity.saturating_add(1).min(4096);
        Self {
            slots: Vec::with_capacity(slots),
            free: Vec::new(),
            index: HashMap::with_capacity(slots),
            head: None,
            tail: None,
        }
    }

    fn node(&self, idx: usize) -> &Node {
        self.slots[idx]
            .as_ref()
            .unwrap_or_else(|| unreachable!("lru index points at free slot {idx}"))
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.slots[idx]
            .as_mut()
            .unwrap_or_else(|| unreachable!("lru index points at free slot {idx}"))
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Option<Node> {
        let node = self.slots[idx].take();
        if node.is_some() {
            self.free.push(idx);
        }
        node
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn pop_back(&mut self) -> Option<Node> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.release(idx)?;
        self.index.remove(&node.key);
        Some(node)
    }
}
