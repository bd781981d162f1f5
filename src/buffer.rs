use crate::config_loader::{BUFFER_MAX, BUFFER_MIN};
use crate::filter::Utterance;
use std::collections::VecDeque;
use std::sync::Mutex;

struct BufferState {
    entries: VecDeque<Utterance>,
    capacity: usize,
}

/// Bounded FIFO of utterances waiting to be spoken. All mutation happens
/// under one lock so the size invariant holds at every observation point.
///
/// Overflow and shrink deliberately evict from opposite ends: enqueueing
/// into a full buffer drops the oldest entry, while shrinking the capacity
/// replays entries oldest-first and drops the newest overflow. The second
/// behavior looks backwards next to the first but is what the product has
/// always done; keep it until someone decides otherwise.
pub struct UtteranceBuffer {
    state: Mutex<BufferState>,
}

impl UtteranceBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(BUFFER_MIN, BUFFER_MAX);
        Self {
            state: Mutex::new(BufferState {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Appends an utterance, evicting the oldest entry when full.
    pub fn enqueue(&self, utterance: Utterance) {
        let mut state = self.state.lock().unwrap();
        while state.entries.len() >= state.capacity {
            state.entries.pop_front();
        }
        state.entries.push_back(utterance);
    }

    pub fn dequeue_oldest(&self) -> Option<Utterance> {
        self.state.lock().unwrap().entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().unwrap().capacity
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().entries.clear();
    }

    /// Changes the capacity, clamping requests outside [1, 200]. Existing
    /// entries are replayed oldest-first into the new bound, so a shrink
    /// drops the newest entries. Returns the capacity now in effect and an
    /// error message when the request had to be clamped.
    pub fn resize(&self, new_capacity: usize) -> Result<usize, (usize, String)> {
        let clamped = new_capacity.clamp(BUFFER_MIN, BUFFER_MAX);
        let mut state = self.state.lock().unwrap();
        state.capacity = clamped;
        while state.entries.len() > clamped {
            state.entries.pop_back();
        }

        if clamped == new_capacity {
            Ok(clamped)
        } else {
            Err((
                clamped,
                format!(
                    "capacity {} outside [{}, {}], clamped to {}",
                    new_capacity, BUFFER_MIN, BUFFER_MAX, clamped
                ),
            ))
        }
    }
}
