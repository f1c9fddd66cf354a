// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Client port state machine (spec §4.9). Request path mirrors the
// publisher's single-destination ChunkSender::send_to_queue; response
// path mirrors the subscriber's ChunkReceiver. Connect/disconnect
// transitions follow subscriber.rs's single-producer transition table.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::capro::{CaProMessage, QueueId, ServiceDescription};
use crate::chunk::{ChunkDistributor, ChunkReceiver, ChunkSender};
use crate::error::{AllocationError, ChunkReceiveResult};
use crate::fatal::fatal_error;
use crate::mem::{ChunkQueue, ChunkSettings, MemoryManager, QueueFullPolicy, SharedChunk};
use crate::port::request_response::{read_response_header, write_request_header, RequestHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConnectionState {
    NotConnected,
    ConnectRequested,
    Connected,
    WaitForOffer,
}

pub struct ClientPortData {
    pub id: u64,
    pub desc: ServiceDescription,
    pub runtime_name: String,
    response_queue_id: QueueId,
    response_queue: Arc<ChunkQueue>,
    connect_requested: AtomicBool,
    state: Mutex<ClientConnectionState>,
    request_sequence: AtomicU64,
    last_known_client_queue_index: AtomicU64,
    server_request_queue: Mutex<Option<Arc<ChunkQueue>>>,
    sender: Mutex<ChunkSender>,
    receiver: Mutex<ChunkReceiver>,
}

impl ClientPortData {
    pub fn new(
        id: u64,
        desc: ServiceDescription,
        runtime_name: String,
        manager: Arc<MemoryManager>,
        response_queue_id: u64,
        response_queue_capacity: usize,
        max_held: usize,
        default_policy: QueueFullPolicy,
    ) -> Arc<Self> {
        let response_queue = Arc::new(ChunkQueue::new_sofi(response_queue_capacity));
        // The request-side distributor is never fanned out to; a client
        // sends to exactly one server queue via `send_to_queue`.
        let unused_distributor = Arc::new(ChunkDistributor::new(1, 0));
        Arc::new(Self {
            id,
            desc,
            runtime_name,
            response_queue_id: QueueId(response_queue_id),
            response_queue: Arc::clone(&response_queue),
            connect_requested: AtomicBool::new(false),
            state: Mutex::new(ClientConnectionState::NotConnected),
            request_sequence: AtomicU64::new(0),
            last_known_client_queue_index: AtomicU64::new(0),
            server_request_queue: Mutex::new(None),
            sender: Mutex::new(ChunkSender::new_for_port(manager, unused_distributor, max_held, default_policy, id)),
            receiver: Mutex::new(ChunkReceiver::new(response_queue, max_held)),
        })
    }
}

pub struct ClientPortUser(pub Arc<ClientPortData>);

impl ClientPortUser {
    pub fn connect(&self) {
        self.0.connect_requested.store(true, Ordering::Release);
    }

    pub fn disconnect(&self) {
        self.0.connect_requested.store(false, Ordering::Release);
    }

    pub fn connection_state(&self) -> ClientConnectionState {
        *self.0.state.lock().unwrap()
    }

    /// The queue id this client's responses are delivered under, i.e. the
    /// id any connected server's distributor keys it by.
    pub fn response_queue_id(&self) -> u64 {
        self.0.response_queue_id.0
    }

    pub fn try_allocate_request(
        &self,
        settings: ChunkSettings,
    ) -> Result<SharedChunk, AllocationError> {
        self.0.sender.lock().unwrap().try_allocate(settings)
    }

    /// Stamps the request header and sends to the server's request queue.
    /// Fails with `TooManyChunksAllocatedInParallel`-adjacent
    /// `InvalidParameterForRequestHeader` semantics if not yet connected.
    pub fn send_request(&self, mut chunk: SharedChunk) -> Result<bool, AllocationError> {
        let server_queue = self
            .0
            .server_request_queue
            .lock()
            .unwrap()
            .clone()
            .ok_or(AllocationError::InvalidParameterForRequestHeader)?;
        let sequence_id = self.0.request_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        unsafe {
            write_request_header(
                &mut chunk,
                RequestHeader {
                    unique_client_queue_id: self.0.response_queue_id.0,
                    last_known_client_queue_index: self
                        .0
                        .last_known_client_queue_index
                        .load(Ordering::Relaxed),
                    sequence_id,
                },
            );
        }
        Ok(self.0.sender.lock().unwrap().send_to_queue(chunk, &server_queue))
    }

    pub fn try_get_response(&self) -> Result<SharedChunk, ChunkReceiveResult> {
        self.0.receiver.lock().unwrap().try_get()
    }

    pub fn release_response(&self, chunk: &SharedChunk) {
        self.0.receiver.lock().unwrap().release(chunk);
    }

    pub fn has_new_responses(&self) -> bool {
        self.0.receiver.lock().unwrap().has_new_chunks()
    }
}

pub struct ClientPortRouDi(pub Arc<ClientPortData>);

impl ClientPortRouDi {
    pub fn try_get_capro_message(&self) -> Option<CaProMessage> {
        let requested = self.0.connect_requested.load(Ordering::Acquire);
        let mut state = self.0.state.lock().unwrap();
        match (*state, requested) {
            (ClientConnectionState::NotConnected, true)
            | (ClientConnectionState::WaitForOffer, true) => {
                *state = ClientConnectionState::ConnectRequested;
                Some(CaProMessage::Connect {
                    desc: self.0.desc.clone(),
                    queue_id: self.0.response_queue_id,
                    queue: Arc::clone(&self.0.response_queue),
                    policy: self.0.sender.lock().unwrap().default_policy,
                })
            }
            (ClientConnectionState::Connected, false) => {
                // Disconnect completes immediately rather than waiting on
                // an acknowledgement, mirroring the subscriber's
                // unsubscribe transition.
                *state = ClientConnectionState::NotConnected;
                *self.0.server_request_queue.lock().unwrap() = None;
                Some(CaProMessage::Disconnect {
                    desc: self.0.desc.clone(),
                    queue_id: self.0.response_queue_id,
                })
            }
            (ClientConnectionState::WaitForOffer, false) => {
                *state = ClientConnectionState::NotConnected;
                None
            }
            _ => None,
        }
    }

    pub fn dispatch_capro_message(&self, msg: CaProMessage) -> Option<CaProMessage> {
        let mut state = self.0.state.lock().unwrap();
        match (*state, msg) {
            (ClientConnectionState::ConnectRequested, CaProMessage::Ack { queue, .. }) => {
                *self.0.server_request_queue.lock().unwrap() = queue;
                *state = ClientConnectionState::Connected;
                None
            }
            (ClientConnectionState::ConnectRequested, CaProMessage::Nack(_)) => {
                *state = ClientConnectionState::WaitForOffer;
                None
            }
            (ClientConnectionState::Connected, CaProMessage::StopOffer(_)) => {
                *state = ClientConnectionState::WaitForOffer;
                *self.0.server_request_queue.lock().unwrap() = None;
                None
            }
            (ClientConnectionState::WaitForOffer, CaProMessage::Offer(desc)) => {
                *state = ClientConnectionState::ConnectRequested;
                Some(CaProMessage::Connect {
                    desc,
                    queue_id: self.0.response_queue_id,
                    queue: Arc::clone(&self.0.response_queue),
                    policy: self.0.sender.lock().unwrap().default_policy,
                })
            }
            (_, other) => fatal_error(&format!(
                "client port {} received unexpected message in state {:?}: {other:?}",
                self.0.id, *state
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::request_response::request_header_settings;

    fn client() -> (ClientPortUser, ClientPortRouDi, Arc<MemoryManager>) {
        let mgr = Arc::new(MemoryManager::new(vec![(128, 8)]));
        let data = ClientPortData::new(
            1,
            ServiceDescription::new("svc", "inst", "event"),
            "client".into(),
            Arc::clone(&mgr),
            21,
            4,
            4,
            QueueFullPolicy::DiscardOldestData,
        );
        (
            ClientPortUser(Arc::clone(&data)),
            ClientPortRouDi(data),
            mgr,
        )
    }

    #[test]
    fn connect_ack_then_send_request_reaches_server_queue() {
        let (user, roudi, _mgr) = client();
        user.connect();
        let msg = roudi.try_get_capro_message();
        assert!(matches!(msg, Some(CaProMessage::Connect { .. })));

        let server_queue = Arc::new(ChunkQueue::new_sofi(4));
        roudi.dispatch_capro_message(CaProMessage::Ack {
            desc: ServiceDescription::new("svc", "inst", "event"),
            queue_id: None,
            queue: Some(Arc::clone(&server_queue)),
        });
        assert_eq!(user.connection_state(), ClientConnectionState::Connected);

        let chunk = user
            .try_allocate_request(request_header_settings(8, 8))
            .unwrap();
        assert!(user.send_request(chunk).unwrap());
        assert!(server_queue.pop().is_some());
    }

    #[test]
    fn send_request_before_connected_fails() {
        let (user, _roudi, _mgr) = client();
        let chunk = user
            .try_allocate_request(request_header_settings(8, 8))
            .unwrap();
        assert_eq!(
            user.send_request(chunk).unwrap_err(),
            AllocationError::InvalidParameterForRequestHeader
        );
    }
}
