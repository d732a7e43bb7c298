//! Per-session caches keyed by ply.
//!
//! Entries are never overwritten: an evaluation of a given position is
//! stable for the life of a session, so the first stored value wins.
//! The orchestrator owns one cache per kind and clears it on session change.

use std::collections::HashMap;

use chess_core::game_data::Evaluation;

use crate::api::Explanation;

#[derive(Debug, Clone)]
pub struct PlyCache<T> {
    entries: HashMap<usize, T>,
}

pub type EvaluationCache = PlyCache<Evaluation>;
pub type ExplanationCache = PlyCache<Explanation>;

impl<T> Default for PlyCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> PlyCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `ply` unless an entry already exists.
    /// Returns true if the entry was added.
    pub fn insert(&mut self, ply: usize, value: T) -> bool {
        if self.entries.contains_key(&ply) {
            return false;
        }
        self.entries.insert(ply, value);
        true
    }

    pub fn get(&self, ply: usize) -> Option<&T> {
        self.entries.get(&ply)
    }

    pub fn contains(&self, ply: usize) -> bool {
        self.entries.contains_key(&ply)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
