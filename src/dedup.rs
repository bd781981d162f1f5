use lru::LruCache;
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

const SEEN_HIGH_WATER: usize = 1000;
const SEEN_KEEP: usize = 500;
const FINGERPRINT_CAPACITY: usize = 100;

/// Message ids already processed, so a polling cycle never reprocesses an
/// item it saw on an earlier page. Insertion order is tracked so the trim
/// keeps the most recently added half.
pub struct SeenIdSet {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenIdSet {
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns false if the id was already present, true if newly inserted.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Run after each successful page: once the set grows past 1000 entries,
    /// drop everything but the newest 500.
    pub fn trim(&mut self) {
        if self.ids.len() <= SEEN_HIGH_WATER {
            return;
        }
        while self.order.len() > SEEN_KEEP {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
    }
}

impl Default for SeenIdSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity set of (author, text) fingerprints for repeat detection.
/// Eviction is true LRU, so a message only counts as fresh again after a
/// hundred distinct fingerprints have passed through the window.
pub struct SpamFingerprintSet {
    cache: LruCache<String, ()>,
}

impl SpamFingerprintSet {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(FINGERPRINT_CAPACITY).expect("capacity is non-zero");
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn fingerprint(author: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(author.as_bytes());
        hasher.update(b":");
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Returns true if this (author, text) pair was already in the window.
    /// A miss records the fingerprint, evicting the least recently used
    /// entry when the window is full.
    pub fn check_and_insert(&mut self, author: &str, text: &str) -> bool {
        let key = Self::fingerprint(author, text);
        if self.cache.contains(&key) {
            return true;
        }
        self.cache.put(key, ());
        false
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for SpamFingerprintSet {
    fn default() -> Self {
        Self::new()
    }
}
