// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Wraps a queue popper + UsedChunkList; the consumer side's
// tryGet/release surface (spec §4.6).

use std::sync::Arc;

use crate::error::ChunkReceiveResult;
use crate::mem::{ChunkQueue, SharedChunk};
use crate::port::used_chunk_list::UsedChunkList;

pub struct ChunkReceiver {
    queue: Arc<ChunkQueue>,
    used: UsedChunkList,
}

impl ChunkReceiver {
    pub fn new(queue: Arc<ChunkQueue>, max_held: usize) -> Self {
        Self {
            queue,
            used: UsedChunkList::new(max_held),
        }
    }

    pub fn queue(&self) -> &Arc<ChunkQueue> {
        &self.queue
    }

    pub fn try_get(&mut self) -> Result<SharedChunk, ChunkReceiveResult> {
        let chunk = self.queue.pop().ok_or(ChunkReceiveResult::NoChunkAvailable)?;
        self.used.insert(chunk.clone()).map_err(|evicted| {
            // the chunk we just popped cannot be held; it is immediately
            // released back (dropped here).
            drop(evicted);
            ChunkReceiveResult::TooManyChunksHeldInParallel
        })?;
        Ok(chunk)
    }

    pub fn release(&mut self, chunk: &SharedChunk) {
        self.used
            .remove(chunk.identity())
            .expect("release() called with a chunk not in this receiver's UsedChunkList");
    }

    pub fn release_all(&mut self) {
        self.used.clear();
        while self.queue.pop().is_some() {}
    }

    pub fn has_lost_chunks(&self) -> bool {
        self.queue.has_lost_chunks()
    }

    pub fn has_new_chunks(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn held_count(&self) -> usize {
        self.used.len()
    }
}
