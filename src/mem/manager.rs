// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owns a sorted set of MemPools; dispatches chunk requests to the smallest
// fitting pool. Adapted from zenoh-shm's SharedMemoryProvider multi-pool
// dispatch-by-size idiom, layered over the teacher's chunk-size-classing
// helper in chunk_storage::calc_chunk_size.

use std::mem::{align_of, size_of};
use std::sync::Arc;

use crate::error::AllocationError;
use crate::mem::chunk::{ChunkHeader, SharedChunk};
use crate::mem::pool::MemPool;

/// Settings describing the chunk a caller wants to allocate.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSettings {
    pub user_payload_size: u32,
    pub user_payload_alignment: u16,
    pub user_header_size: u32,
    pub user_header_alignment: u16,
}

impl ChunkSettings {
    pub fn new(user_payload_size: u32, user_payload_alignment: u16) -> Self {
        Self {
            user_payload_size,
            user_payload_alignment,
            user_header_size: 0,
            user_header_alignment: 1,
        }
    }

    /// Total bytes a chunk must provide to hold header + user header +
    /// padding + user payload, given the required alignment.
    pub fn total_required_size(&self) -> u32 {
        let header_size = size_of::<ChunkHeader>() as u32;
        let align = self
            .user_payload_alignment
            .max(align_of::<ChunkHeader>() as u16) as u32;
        let after_user_header = header_size + self.user_header_size;
        let payload_offset = round_up(after_user_header, align);
        payload_offset + self.user_payload_size
    }
}

fn round_up(value: u32, align: u32) -> u32 {
    if align == 0 {
        return value;
    }
    (value + align - 1) / align * align
}

/// An ascending-sorted set of [`MemPool`]s, one per size class. Configured
/// once at daemon startup from [`crate::config::RouterConfig`]; never resized.
pub struct MemoryManager {
    pools: Vec<MemPool>,
}

impl MemoryManager {
    /// Build from a list of `(chunk_size, num_chunks)` pairs. Pools are
    /// sorted by ascending chunk size; sizes must be unique.
    pub fn new(mut configs: Vec<(u32, u32)>) -> Self {
        configs.sort_by_key(|(size, _)| *size);
        for w in configs.windows(2) {
            assert!(w[0].0 != w[1].0, "mempool chunk sizes must be unique");
        }
        let pools = configs
            .into_iter()
            .map(|(size, count)| MemPool::new(size, count))
            .collect();
        Self { pools }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, id: u32) -> &MemPool {
        &self.pools[id as usize]
    }

    /// Allocate a chunk fitting `settings`, returning a fully initialized
    /// [`SharedChunk`] with refcount 1. Equivalent to
    /// `get_chunk_for_port(settings, 0)`: used by callers with no port of
    /// their own to stamp into the chunk's `origin_port_id`.
    pub fn get_chunk(
        self: &Arc<Self>,
        settings: ChunkSettings,
    ) -> Result<SharedChunk, AllocationError> {
        self.get_chunk_for_port(settings, 0)
    }

    /// Like [`Self::get_chunk`], stamping `origin_port_id` into the
    /// header so a consumer can trace a chunk back to the port that
    /// allocated it.
    pub fn get_chunk_for_port(
        self: &Arc<Self>,
        settings: ChunkSettings,
        origin_port_id: u64,
    ) -> Result<SharedChunk, AllocationError> {
        let required = settings.total_required_size();
        let (mempool_id, pool) = self
            .pools
            .iter()
            .enumerate()
            .find(|(_, p)| p.chunk_size() >= required)
            .map(|(i, p)| (i as u32, p))
            .ok_or(AllocationError::NoMempoolsAvailable)?;

        let slot = pool
            .allocate()
            .ok_or(AllocationError::RunningOutOfChunks)?;

        let header_ptr = pool.slot_ptr(slot) as *mut ChunkHeader;
        // SAFETY: `header_ptr` points at a freshly allocated, exclusively
        // owned slot at least `pool.chunk_size()` bytes long, which is >=
        // `required` bytes and therefore fits a `ChunkHeader`.
        unsafe {
            ChunkHeader::init_in_place(
                header_ptr,
                pool.chunk_size(),
                settings,
                mempool_id,
                slot,
                origin_port_id,
            );
        }
        Ok(unsafe { SharedChunk::from_raw(Arc::clone(self), header_ptr) })
    }

    /// Return a chunk's slot to its originating pool. Called only from
    /// `SharedChunk`'s drop glue once the refcount reaches zero.
    pub(crate) fn free_chunk(&self, mempool_id: u32, slot: u32) {
        self.pools[mempool_id as usize].free(slot);
    }
}
