// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Publisher port state machine (spec §4.7). User-side and router-side
// capability sets over one shared `PublisherPortData`, grounded on the
// teacher's scoped_access::ScopedAccess RAII-guarded-shared-data pattern
// (here used to split disjoint method sets instead of a lock guard) and
// on original_source's ports/publisher_port_{user,roudi}.hpp transition
// table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::capro::{CaProMessage, ServiceDescription};
use crate::chunk::{ChunkDistributor, ChunkSender};
use crate::error::AllocationError;
use crate::fatal::fatal_error;
use crate::mem::{ChunkSettings, MemoryManager, QueueFullPolicy, SharedChunk};

pub struct PublisherPortData {
    pub id: u64,
    pub desc: ServiceDescription,
    pub runtime_name: String,
    offering_requested: AtomicBool,
    offered: AtomicBool,
    sender: Mutex<ChunkSender>,
}

impl PublisherPortData {
    pub fn new(
        id: u64,
        desc: ServiceDescription,
        runtime_name: String,
        manager: Arc<MemoryManager>,
        max_subscribers: usize,
        history_capacity: usize,
        max_held: usize,
        default_policy: QueueFullPolicy,
    ) -> Arc<Self> {
        let distributor = Arc::new(ChunkDistributor::new(max_subscribers, history_capacity));
        Arc::new(Self {
            id,
            desc,
            runtime_name,
            offering_requested: AtomicBool::new(false),
            offered: AtomicBool::new(false),
            sender: Mutex::new(ChunkSender::new_for_port(manager, distributor, max_held, default_policy, id)),
        })
    }
}

/// User-facing half.
pub struct PublisherPortUser(pub Arc<PublisherPortData>);

impl PublisherPortUser {
    pub fn offer(&self) {
        self.0.offering_requested.store(true, Ordering::Release);
    }

    pub fn stop_offer(&self) {
        self.0.offering_requested.store(false, Ordering::Release);
    }

    pub fn is_offered(&self) -> bool {
        self.0.offered.load(Ordering::Acquire)
    }

    pub fn has_subscribers(&self) -> bool {
        self.0.sender.lock().unwrap().distributor().queue_count() > 0
    }

    pub fn try_allocate_chunk(
        &self,
        settings: ChunkSettings,
    ) -> Result<SharedChunk, AllocationError> {
        self.0.sender.lock().unwrap().try_allocate(settings)
    }

    pub fn release_chunk(&self, chunk: &SharedChunk) {
        self.0.sender.lock().unwrap().release(chunk);
    }

    /// Sends `chunk`. While not offered, pushes to history without
    /// delivery so a later `offer()` can still serve history to new
    /// subscribers.
    pub fn send_chunk(&self, chunk: SharedChunk) -> usize {
        let mut sender = self.0.sender.lock().unwrap();
        if self.0.offered.load(Ordering::Acquire) {
            sender.send(chunk)
        } else {
            sender.push_to_history(chunk);
            0
        }
    }

    pub fn try_get_previous_chunk(&self) -> Option<SharedChunk> {
        self.0.sender.lock().unwrap().try_get_previous_chunk()
    }

    /// Detaches a single subscriber queue by id, leaving the rest of the
    /// distributor's queue set untouched. Used by the router to unwind a
    /// single reclaimed subscriber rather than the whole publisher.
    pub fn detach_queue(&self, queue_id: u64) {
        self.0.sender.lock().unwrap().distributor().remove_queue(queue_id);
    }

    /// Tears the port down outside the normal offer/stop_offer handshake:
    /// clears every attached subscriber queue and marks the port
    /// unoffered. Used when the owning runtime has been reaped.
    pub fn force_detach(&self) {
        self.0.offering_requested.store(false, Ordering::Release);
        self.0.offered.store(false, Ordering::Release);
        self.0.sender.lock().unwrap().distributor().clear_queues();
    }
}

/// Router-facing half.
pub struct PublisherPortRouDi(pub Arc<PublisherPortData>);

impl PublisherPortRouDi {
    /// Polled by the router discovery loop to learn of user-requested
    /// state changes it hasn't yet observed.
    pub fn try_get_capro_message(&self) -> Option<CaProMessage> {
        let requested = self.0.offering_requested.load(Ordering::Acquire);
        let current = self.0.offered.load(Ordering::Acquire);
        if requested && !current {
            self.0.offered.store(true, Ordering::Release);
            return Some(CaProMessage::Offer(self.0.desc.clone()));
        }
        if !requested && current {
            self.0.offered.store(false, Ordering::Release);
            self.0
                .sender
                .lock()
                .unwrap()
                .distributor()
                .clear_queues();
            return Some(CaProMessage::StopOffer(self.0.desc.clone()));
        }
        None
    }

    /// Delivers a message the router routed to this port, returning the
    /// reply (`Ack`/`Nack`) if any.
    pub fn dispatch_capro_message(&self, msg: CaProMessage) -> Option<CaProMessage> {
        match msg {
            CaProMessage::Sub { desc, queue_id, queue, requested_history, policy } => {
                let sender = self.0.sender.lock().unwrap();
                match sender
                    .distributor()
                    .add_queue(queue_id.0, queue, policy, requested_history)
                {
                    Ok(()) => Some(CaProMessage::Ack { desc, queue_id: None, queue: None }),
                    Err(_) => Some(CaProMessage::Nack(desc)),
                }
            }
            CaProMessage::Unsub { queue_id, desc } => {
                self.0
                    .sender
                    .lock()
                    .unwrap()
                    .distributor()
                    .remove_queue(queue_id.0);
                Some(CaProMessage::Ack { desc, queue_id: None, queue: None })
            }
            other if self.0.offered.load(Ordering::Acquire) => {
                fatal_error(&format!(
                    "publisher port {} received unexpected message while offered: {other:?}",
                    self.0.id
                ));
            }
            other => {
                fatal_error(&format!(
                    "publisher port {} received unexpected message: {other:?}",
                    self.0.id
                ));
            }
        }
    }
}
