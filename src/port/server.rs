// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Server port state machine (spec §4.9). Offer/stopOffer mirrors
// publisher.rs exactly; Connect/Disconnect reuses ChunkDistributor as a
// keyed table of connected clients' response queues rather than a
// broadcast fan-out set, since each response targets exactly one client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::capro::{CaProMessage, QueueId, ServiceDescription};
use crate::chunk::{ChunkDistributor, ChunkReceiver, ChunkSender};
use crate::error::{AllocationError, ServerRequestResult, ServerSendError};
use crate::fatal::fatal_error;
use crate::mem::{ChunkQueue, ChunkSettings, MemoryManager, QueueFullPolicy, SharedChunk};
use crate::port::request_response::{
    read_request_header, write_response_header, ResponseHeader,
};

pub struct ServerPortData {
    pub id: u64,
    pub desc: ServiceDescription,
    pub runtime_name: String,
    offering_requested: AtomicBool,
    offered: AtomicBool,
    request_queue_id: QueueId,
    request_queue: Arc<ChunkQueue>,
    receiver: Mutex<ChunkReceiver>,
    sender: Mutex<ChunkSender>,
}

impl ServerPortData {
    pub fn new(
        id: u64,
        desc: ServiceDescription,
        runtime_name: String,
        manager: Arc<MemoryManager>,
        request_queue_id: u64,
        request_queue_capacity: usize,
        max_clients: usize,
        max_held: usize,
        default_policy: QueueFullPolicy,
    ) -> Arc<Self> {
        let request_queue = Arc::new(ChunkQueue::new_sofi(request_queue_capacity));
        let clients = Arc::new(ChunkDistributor::new(max_clients, 0));
        Arc::new(Self {
            id,
            desc,
            runtime_name,
            offering_requested: AtomicBool::new(false),
            offered: AtomicBool::new(false),
            request_queue_id: QueueId(request_queue_id),
            request_queue: Arc::clone(&request_queue),
            receiver: Mutex::new(ChunkReceiver::new(request_queue, max_held)),
            sender: Mutex::new(ChunkSender::new_for_port(manager, clients, max_held, default_policy, id)),
        })
    }
}

pub struct ServerPortUser(pub Arc<ServerPortData>);

impl ServerPortUser {
    pub fn offer(&self) {
        self.0.offering_requested.store(true, Ordering::Release);
    }

    pub fn stop_offer(&self) {
        self.0.offering_requested.store(false, Ordering::Release);
    }

    pub fn is_offered(&self) -> bool {
        self.0.offered.load(Ordering::Acquire)
    }

    pub fn try_get_request(&self) -> Result<SharedChunk, ServerRequestResult> {
        if !self.0.offered.load(Ordering::Acquire) && !self.0.receiver.lock().unwrap().has_new_chunks()
        {
            return Err(ServerRequestResult::NoPendingRequestsAndServerDoesNotOffer);
        }
        self.0.receiver.lock().unwrap().try_get().map_err(|e| match e {
            crate::error::ChunkReceiveResult::NoChunkAvailable => ServerRequestResult::NoChunkAvailable,
            crate::error::ChunkReceiveResult::TooManyChunksHeldInParallel => {
                ServerRequestResult::TooManyChunksHeldInParallel
            }
        })
    }

    pub fn release_request(&self, chunk: &SharedChunk) {
        self.0.receiver.lock().unwrap().release(chunk);
    }

    pub fn try_allocate_response(
        &self,
        settings: ChunkSettings,
    ) -> Result<SharedChunk, AllocationError> {
        self.0.sender.lock().unwrap().try_allocate(settings)
    }

    /// Routes `response` back to whichever client sent `request`, stamping
    /// the client's `unique_client_queue_id`/`sequence_id` into the
    /// response header.
    pub fn send_response(
        &self,
        request: &SharedChunk,
        mut response: SharedChunk,
    ) -> Result<(), ServerSendError> {
        if !self.0.offered.load(Ordering::Acquire) {
            return Err(ServerSendError::NotOffered);
        }
        let req_header = read_request_header(request);
        let client_queue = self
            .0
            .sender
            .lock()
            .unwrap()
            .distributor()
            .queue_by_id(req_header.unique_client_queue_id)
            .ok_or(ServerSendError::ClientNotAvailable)?;
        unsafe {
            write_response_header(
                &mut response,
                ResponseHeader {
                    unique_client_queue_id: req_header.unique_client_queue_id,
                    sequence_id: req_header.sequence_id,
                },
            );
        }
        let delivered = self
            .0
            .sender
            .lock()
            .unwrap()
            .send_to_queue(response, &client_queue);
        if delivered {
            Ok(())
        } else {
            Err(ServerSendError::ClientNotAvailable)
        }
    }

    /// Detaches a single client's response queue by id. Used by the
    /// router to unwind a single reclaimed client rather than the whole
    /// server.
    pub fn detach_queue(&self, queue_id: u64) {
        self.0.sender.lock().unwrap().distributor().remove_queue(queue_id);
    }

    /// Tears the port down outside the normal offer/stop_offer handshake:
    /// clears every connected client and marks the port unoffered. Used
    /// when the owning runtime has been reaped.
    pub fn force_detach(&self) {
        self.0.offering_requested.store(false, Ordering::Release);
        self.0.offered.store(false, Ordering::Release);
        self.0.sender.lock().unwrap().distributor().clear_queues();
    }
}

pub struct ServerPortRouDi(pub Arc<ServerPortData>);

impl ServerPortRouDi {
    pub fn try_get_capro_message(&self) -> Option<CaProMessage> {
        let requested = self.0.offering_requested.load(Ordering::Acquire);
        let current = self.0.offered.load(Ordering::Acquire);
        if requested && !current {
            self.0.offered.store(true, Ordering::Release);
            return Some(CaProMessage::Offer(self.0.desc.clone()));
        }
        if !requested && current {
            self.0.offered.store(false, Ordering::Release);
            self.0.sender.lock().unwrap().distributor().clear_queues();
            return Some(CaProMessage::StopOffer(self.0.desc.clone()));
        }
        None
    }

    pub fn dispatch_capro_message(&self, msg: CaProMessage) -> Option<CaProMessage> {
        match msg {
            CaProMessage::Connect { desc, queue_id, queue, policy } => {
                let sender = self.0.sender.lock().unwrap();
                match sender.distributor().add_queue(queue_id.0, queue, policy, 0) {
                    Ok(()) => Some(CaProMessage::Ack {
                        desc,
                        queue_id: Some(self.0.request_queue_id),
                        queue: Some(Arc::clone(&self.0.request_queue)),
                    }),
                    Err(_) => Some(CaProMessage::Nack(desc)),
                }
            }
            CaProMessage::Disconnect { desc, queue_id } => {
                self.0.sender.lock().unwrap().distributor().remove_queue(queue_id.0);
                Some(CaProMessage::Ack { desc, queue_id: None, queue: None })
            }
            other if self.0.offered.load(Ordering::Acquire) => {
                fatal_error(&format!(
                    "server port {} received unexpected message while offered: {other:?}",
                    self.0.id
                ));
            }
            other => {
                fatal_error(&format!(
                    "server port {} received unexpected message: {other:?}",
                    self.0.id
                ));
            }
        }
    }
}
