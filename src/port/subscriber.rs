// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Subscriber port state machines, both flavors (spec §4.8). Grounded on
// original_source's subscriber_port_{user,roudi,single_producer,
// multi_producer}.hpp for the transition tables.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::capro::{CaProMessage, QueueId, ServiceDescription};
use crate::chunk::ChunkReceiver;
use crate::error::ChunkReceiveResult;
use crate::fatal::fatal_error;
use crate::mem::{ChunkQueue, QueueFullPolicy, SharedChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    NotSubscribed,
    SubscribeRequested,
    Subscribed,
    UnsubscribeRequested,
    WaitForOffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberFlavor {
    /// 1:m with exactly one matching publisher; explicit request/ack.
    SingleProducer,
    /// n:m; subscribes immediately, silently ignores Ack/Nack/StopOffer.
    MultiProducer,
}

pub struct SubscriberPortData {
    pub id: u64,
    pub desc: ServiceDescription,
    pub runtime_name: String,
    pub flavor: SubscriberFlavor,
    pub queue_id: QueueId,
    pub requested_history: usize,
    pub policy: QueueFullPolicy,
    requested: AtomicBool,
    state: Mutex<SubscriptionState>,
    receiver: Mutex<ChunkReceiver>,
    queue: Arc<ChunkQueue>,
}

impl SubscriberPortData {
    pub fn new(
        id: u64,
        desc: ServiceDescription,
        runtime_name: String,
        flavor: SubscriberFlavor,
        queue_id: u64,
        queue_capacity: usize,
        max_held: usize,
        requested_history: usize,
        policy: QueueFullPolicy,
    ) -> Arc<Self> {
        let queue = Arc::new(ChunkQueue::new_sofi(queue_capacity));
        Arc::new(Self {
            id,
            desc,
            runtime_name,
            flavor,
            queue_id: QueueId(queue_id),
            requested_history,
            policy,
            requested: AtomicBool::new(false),
            state: Mutex::new(SubscriptionState::NotSubscribed),
            receiver: Mutex::new(ChunkReceiver::new(Arc::clone(&queue), max_held)),
            queue,
        })
    }

    pub fn queue(&self) -> Arc<ChunkQueue> {
        Arc::clone(&self.queue)
    }
}

pub struct SubscriberPortUser(pub Arc<SubscriberPortData>);

impl SubscriberPortUser {
    pub fn subscribe(&self) {
        self.0.requested.store(true, Ordering::Release);
        if self.0.flavor == SubscriberFlavor::MultiProducer {
            *self.0.state.lock().unwrap() = SubscriptionState::Subscribed;
        }
    }

    pub fn unsubscribe(&self) {
        self.0.requested.store(false, Ordering::Release);
        if self.0.flavor == SubscriberFlavor::MultiProducer {
            *self.0.state.lock().unwrap() = SubscriptionState::NotSubscribed;
        }
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        *self.0.state.lock().unwrap()
    }

    pub fn try_get_chunk(&self) -> Result<SharedChunk, ChunkReceiveResult> {
        self.0.receiver.lock().unwrap().try_get()
    }

    pub fn release_chunk(&self, chunk: &SharedChunk) {
        self.0.receiver.lock().unwrap().release(chunk);
    }

    pub fn release_queued_chunks(&self) {
        self.0.receiver.lock().unwrap().release_all();
    }

    pub fn has_new_chunks(&self) -> bool {
        self.0.receiver.lock().unwrap().has_new_chunks()
    }

    pub fn has_lost_chunks_since_last_call(&self) -> bool {
        self.0.receiver.lock().unwrap().has_lost_chunks()
    }
}

pub struct SubscriberPortRouDi(pub Arc<SubscriberPortData>);

impl SubscriberPortRouDi {
    /// Only meaningful for `SingleProducer`: emits `Sub`/`Unsub` in
    /// response to the user's `requested` flag flipping. Multi-producer
    /// subscribers drive their own state directly in `subscribe`/
    /// `unsubscribe` and never emit here — the port manager instead
    /// proactively attaches them to every matching publisher it discovers.
    pub fn try_get_capro_message(&self) -> Option<CaProMessage> {
        if self.0.flavor == SubscriberFlavor::MultiProducer {
            return None;
        }
        let requested = self.0.requested.load(Ordering::Acquire);
        let mut state = self.0.state.lock().unwrap();
        match (*state, requested) {
            (SubscriptionState::NotSubscribed, true) | (SubscriptionState::WaitForOffer, true) => {
                *state = SubscriptionState::SubscribeRequested;
                Some(CaProMessage::Sub {
                    desc: self.0.desc.clone(),
                    queue_id: self.0.queue_id,
                    queue: self.0.queue(),
                    requested_history: self.0.requested_history,
                    policy: self.0.policy,
                })
            }
            (SubscriptionState::Subscribed, false) => {
                *state = SubscriptionState::UnsubscribeRequested;
                Some(CaProMessage::Unsub {
                    desc: self.0.desc.clone(),
                    queue_id: self.0.queue_id,
                })
            }
            (SubscriptionState::WaitForOffer, false) => {
                *state = SubscriptionState::NotSubscribed;
                None
            }
            _ => None,
        }
    }

    /// Delivers an `Offer`/`StopOffer`/`Ack`/`Nack` the router routed to
    /// this port.
    pub fn dispatch_capro_message(&self, msg: CaProMessage) -> Option<CaProMessage> {
        if self.0.flavor == SubscriberFlavor::MultiProducer {
            // Ack/Nack/StopOffer silently ignored per spec §4.8.
            return None;
        }
        let mut state = self.0.state.lock().unwrap();
        match (*state, msg) {
            (SubscriptionState::SubscribeRequested, CaProMessage::Ack { .. }) => {
                *state = SubscriptionState::Subscribed;
                None
            }
            (SubscriptionState::SubscribeRequested, CaProMessage::Nack(_)) => {
                *state = SubscriptionState::WaitForOffer;
                None
            }
            (SubscriptionState::Subscribed, CaProMessage::StopOffer(_)) => {
                *state = SubscriptionState::WaitForOffer;
                None
            }
            (SubscriptionState::UnsubscribeRequested, CaProMessage::Ack { .. })
            | (SubscriptionState::UnsubscribeRequested, CaProMessage::Nack(_)) => {
                *state = SubscriptionState::NotSubscribed;
                None
            }
            (SubscriptionState::WaitForOffer, CaProMessage::Offer(desc)) => {
                *state = SubscriptionState::SubscribeRequested;
                Some(CaProMessage::Sub {
                    desc,
                    queue_id: self.0.queue_id,
                    queue: self.0.queue(),
                    requested_history: self.0.requested_history,
                    policy: self.0.policy,
                })
            }
            (_, other) => fatal_error(&format!(
                "subscriber port {} received unexpected message in state {:?}: {other:?}",
                self.0.id, *state
            )),
        }
    }
}
