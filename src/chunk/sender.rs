// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Wraps MemoryManager + UsedChunkList + ChunkDistributor; the producer
// side's allocate/send/release surface (spec §4.5). Grounded on the
// teacher's channel::Channel::send high-level flow: allocate-or-reuse,
// stamp, hand off, remember as "last sent".

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::chunk::distributor::ChunkDistributor;
use crate::error::AllocationError;
use crate::mem::{ChunkQueue, ChunkSettings, MemoryManager, PushOutcome, QueueFullPolicy, SharedChunk};
use crate::port::used_chunk_list::UsedChunkList;

pub struct ChunkSender {
    manager: Arc<MemoryManager>,
    used: UsedChunkList,
    distributor: Arc<ChunkDistributor>,
    last_sent: Option<SharedChunk>,
    sequence: u64,
    origin_port_id: u64,
    pub default_policy: QueueFullPolicy,
}

impl ChunkSender {
    pub fn new(
        manager: Arc<MemoryManager>,
        distributor: Arc<ChunkDistributor>,
        max_held: usize,
        default_policy: QueueFullPolicy,
    ) -> Self {
        Self::new_for_port(manager, distributor, max_held, default_policy, 0)
    }

    /// Like [`Self::new`], stamping `origin_port_id` into every chunk this
    /// sender allocates.
    pub fn new_for_port(
        manager: Arc<MemoryManager>,
        distributor: Arc<ChunkDistributor>,
        max_held: usize,
        default_policy: QueueFullPolicy,
        origin_port_id: u64,
    ) -> Self {
        Self {
            manager,
            used: UsedChunkList::new(max_held),
            distributor,
            last_sent: None,
            sequence: 0,
            origin_port_id,
            default_policy,
        }
    }

    /// Allocates a chunk of the requested shape, reusing the previously
    /// sent chunk when it is uniquely held and big enough.
    pub fn try_allocate(&mut self, settings: ChunkSettings) -> Result<SharedChunk, AllocationError> {
        let required = settings.total_required_size();
        let reused = self.last_sent.as_ref().and_then(|prev| {
            if prev.header().refcount() == 1 && prev.header().chunk_size >= required {
                Some(prev.clone())
            } else {
                None
            }
        });

        let chunk = match reused {
            Some(c) => c,
            None => self.manager.get_chunk_for_port(settings, self.origin_port_id)?,
        };

        self.used
            .insert(chunk.clone())
            .map_err(|_| AllocationError::TooManyChunksAllocatedInParallel)?;
        Ok(chunk)
    }

    /// Releases a previously allocated-but-unsent chunk back to the pool.
    /// Passing a chunk not held by this sender is a contract violation.
    pub fn release(&mut self, chunk: &SharedChunk) {
        self.used
            .remove(chunk.identity())
            .expect("release() called with a chunk not in this sender's UsedChunkList");
    }

    /// Stamps the sequence number, fans the chunk out through the
    /// distributor, and remembers it as "last sent". Returns the number of
    /// consumer queues it was delivered to.
    pub fn send(&mut self, chunk: SharedChunk) -> usize {
        self.used
            .remove(chunk.identity())
            .expect("send() called with a chunk not in this sender's UsedChunkList");
        self.sequence += 1;
        chunk.header().sequence_number.store(self.sequence, Ordering::Release);
        self.last_sent = Some(chunk.clone());
        self.distributor.deliver_to_all_stored_queues(chunk)
    }

    /// Single-recipient delivery used by client/server request-response.
    /// Does not update history.
    pub fn send_to_queue(&mut self, chunk: SharedChunk, queue: &Arc<ChunkQueue>) -> bool {
        self.used
            .remove(chunk.identity())
            .expect("send_to_queue() called with a chunk not in this sender's UsedChunkList");
        self.sequence += 1;
        chunk.header().sequence_number.store(self.sequence, Ordering::Release);
        matches!(
            queue.push(chunk, self.default_policy),
            PushOutcome::Delivered | PushOutcome::DeliveredEvicting(_)
        )
    }

    /// Like `send` but skips fan-out: used by ports that aren't yet
    /// offered so history stays populated for later subscribers.
    pub fn push_to_history(&mut self, chunk: SharedChunk) {
        self.used
            .remove(chunk.identity())
            .expect("push_to_history() called with a chunk not in this sender's UsedChunkList");
        self.sequence += 1;
        chunk.header().sequence_number.store(self.sequence, Ordering::Release);
        self.last_sent = Some(chunk.clone());
        self.distributor.push_to_history(chunk);
    }

    pub fn try_get_previous_chunk(&self) -> Option<SharedChunk> {
        self.last_sent
            .as_ref()
            .filter(|c| c.header().refcount() == 1)
            .cloned()
    }

    pub fn release_all(&mut self) {
        self.used.clear();
        self.distributor.clear_history();
        self.last_sent = None;
    }

    pub fn distributor(&self) -> &Arc<ChunkDistributor> {
        &self.distributor
    }
}
