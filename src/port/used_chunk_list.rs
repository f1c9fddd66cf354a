// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Bounded per-port set of chunks currently held by user code. Grounded on
// the teacher's circ::BroadcastConnHead fixed-capacity, spinlock-guarded
// bookkeeping style.
//
// Single-threaded by contract (§5, "the UsedChunkList on a port is
// single-threaded: only its owning user thread mutates it"), so this uses
// a plain Vec behind no internal synchronization.

use crate::mem::SharedChunk;

/// The held-chunk limit is a configuration knob, not a hard-coded
/// constant (Open Question decision in SPEC_FULL.md/DESIGN.md).
pub const DEFAULT_MAX_HELD_PER_PORT: usize = 8;

pub struct UsedChunkList {
    max_held: usize,
    held: Vec<SharedChunk>,
}

impl UsedChunkList {
    pub fn new(max_held: usize) -> Self {
        Self {
            max_held,
            held: Vec::with_capacity(max_held),
        }
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.held.len() >= self.max_held
    }

    /// Inserts `chunk`. Returns `false` (giving `chunk` back) if the list
    /// is already at capacity.
    pub fn insert(&mut self, chunk: SharedChunk) -> Result<(), SharedChunk> {
        if self.is_full() {
            return Err(chunk);
        }
        debug_assert!(
            self.held.iter().all(|c| c.identity() != chunk.identity()),
            "payload pointers in a UsedChunkList must be pairwise distinct"
        );
        self.held.push(chunk);
        Ok(())
    }

    /// Removes and returns the chunk whose payload pointer matches
    /// `payload_identity`, if held.
    pub fn remove(&mut self, payload_identity: usize) -> Option<SharedChunk> {
        let idx = self.held.iter().position(|c| c.identity() == payload_identity)?;
        Some(self.held.swap_remove(idx))
    }

    /// Empties the list, dropping every held chunk's refcount.
    pub fn clear(&mut self) {
        self.held.clear();
    }
}
