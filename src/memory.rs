//! Bounded rolling window of conversation turns.
//!
//! Session-scoped, in-memory state with ring-buffer semantics: once the
//! configured capacity is reached, each append evicts the oldest turn.
//! The window is owned by the caller (the chat loop), which passes recent
//! turns into prompt construction; there is no persistence beyond the
//! session.

use std::collections::VecDeque;

use crate::models::ConversationTurn;

pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create a memory window holding at most `capacity` turns.
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a completed exchange, evicting the oldest turn when full.
    pub fn append(&mut self, turn: ConversationTurn) {
        if self.capacity == 0 {
            return;
        }
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The `n` most recent turns in chronological order (oldest first).
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
