// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fan-out to attached consumer queues plus a history ring for late
// subscribers. Grounded on the teacher's channel::Channel broadcast
// delivery (iterate attached connections, push to each) and circ.rs's
// connection-bookkeeping for attach/detach.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::PortPoolError;
use crate::mem::{ChunkQueue, PushOutcome, QueueFullPolicy, SharedChunk};

struct AttachedQueue {
    id: u64,
    queue: Arc<ChunkQueue>,
    policy: QueueFullPolicy,
}

/// Per spec §4.4. The distributor's queue set is single-writer (the
/// router discovery loop only); data-path fan-out reads concurrently with
/// that writer, which is why queue attach/detach is guarded by a mutex
/// while `deliver_to_all_stored_queues` only needs shared access to the
/// queues it iterates.
pub struct ChunkDistributor {
    queues: Mutex<Vec<AttachedQueue>>,
    history: Mutex<VecDeque<SharedChunk>>,
    history_capacity: usize,
    max_queues: usize,
}

impl ChunkDistributor {
    pub fn new(max_queues: usize, history_capacity: usize) -> Self {
        Self {
            queues: Mutex::new(Vec::with_capacity(max_queues)),
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            max_queues,
        }
    }

    pub fn queue_count(&self) -> usize {
        self.queues.lock().unwrap().len()
    }

    /// Attach `queue`. If newly attached, immediately replays the last
    /// `min(requested_history, history_size)` chunks, in send order.
    pub fn add_queue(
        &self,
        id: u64,
        queue: Arc<ChunkQueue>,
        policy: QueueFullPolicy,
        requested_history: usize,
    ) -> Result<(), PortPoolError> {
        {
            let mut queues = self.queues.lock().unwrap();
            if queues.len() >= self.max_queues {
                return Err(PortPoolError::SubscriberPortListFull);
            }
            queues.push(AttachedQueue { id, queue: Arc::clone(&queue), policy });
        }

        let history = self.history.lock().unwrap();
        let n = requested_history.min(history.len());
        let replay: Vec<SharedChunk> = history.iter().rev().take(n).rev().cloned().collect();
        drop(history);
        for chunk in replay {
            let _ = queue.push(chunk, policy);
        }
        Ok(())
    }

    pub fn remove_queue(&self, id: u64) {
        self.queues.lock().unwrap().retain(|q| q.id != id);
    }

    /// Detaches every attached queue without delivering. Used by
    /// `StopOffer` handling; history is left untouched.
    pub fn clear_queues(&self) {
        self.queues.lock().unwrap().clear();
    }

    pub fn queue_by_id(&self, id: u64) -> Option<Arc<ChunkQueue>> {
        self.queues
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.id == id)
            .map(|q| Arc::clone(&q.queue))
    }

    /// Pushes `chunk` to every attached queue honoring each queue's
    /// overflow policy, then records it in the history ring. Returns the
    /// number of queues the chunk was delivered to.
    pub fn deliver_to_all_stored_queues(&self, chunk: SharedChunk) -> usize {
        let queues: Vec<(Arc<ChunkQueue>, QueueFullPolicy)> = self
            .queues
            .lock()
            .unwrap()
            .iter()
            .map(|q| (Arc::clone(&q.queue), q.policy))
            .collect();

        let mut delivered = 0usize;
        for (queue, policy) in &queues {
            match queue.push(chunk.clone(), *policy) {
                PushOutcome::Delivered => delivered += 1,
                PushOutcome::DeliveredEvicting(_evicted) => {
                    // evicted chunk's SharedChunk drops here, releasing its
                    // refcount back toward the originating MemPool.
                    delivered += 1;
                }
            }
        }
        self.push_to_history(chunk);
        delivered
    }

    /// Records `chunk` in the history ring without fanning out — used by
    /// `pushToHistory` (publisher not yet offered) as well as internally
    /// after every delivery.
    pub fn push_to_history(&self, chunk: SharedChunk) {
        if self.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().unwrap();
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(chunk);
    }

    /// Empties the history ring. Never called implicitly by `stop_offer`
    /// (decision recorded in DESIGN.md): history survives offer cycling.
    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}
