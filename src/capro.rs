// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The discovery-plane control message protocol exchanged between ports
// and the router. Shape grounded on original_source's
// capro/capro_message.{hpp,cpp}; the typed envelope convention (carrying
// these over the control channel as a FlatBuffer-ish fixed record) is
// grounded on the teacher's proto::message::Message<T>/Builder wrapper.

use std::sync::Arc;

use crate::mem::{ChunkQueue, QueueFullPolicy};

/// Maximum length of one identifier in a `ServiceDescription`, per
/// original_source's `capro::IdString_t` cap.
pub const MAX_ID_LEN: usize = 100;

/// A bounded identifier used within a [`ServiceDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id(String);

impl Id {
    pub fn new(s: &str) -> Self {
        assert!(s.len() <= MAX_ID_LEN, "identifier exceeds MAX_ID_LEN");
        Self(s.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The (service, instance, event) identifier triple used for discovery
/// matching between publishers/subscribers and servers/clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceDescription {
    pub service: Id,
    pub instance: Id,
    pub event: Id,
}

impl ServiceDescription {
    pub fn new(service: &str, instance: &str, event: &str) -> Self {
        Self {
            service: Id::new(service),
            instance: Id::new(instance),
            event: Id::new(event),
        }
    }
}

impl std::fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.instance, self.event)
    }
}

/// Identifies a queue attached during `Sub`/`Connect` for later `Unsub`/
/// `Disconnect` lookups. In a true shared-memory deployment this would be
/// a `(segmentId, offset)` relative pointer (DESIGN NOTES §9); here, since
/// router and runtimes share one address space, the message additionally
/// carries the live `Arc<ChunkQueue>` directly rather than a pointer the
/// router must resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueId(pub u64);

/// The discovery-plane control message. Every variant carries the
/// `ServiceDescription` the message concerns.
#[derive(Debug, Clone)]
pub enum CaProMessage {
    Offer(ServiceDescription),
    StopOffer(ServiceDescription),
    Sub {
        desc: ServiceDescription,
        queue_id: QueueId,
        queue: Arc<ChunkQueue>,
        requested_history: usize,
        policy: QueueFullPolicy,
    },
    Unsub {
        desc: ServiceDescription,
        queue_id: QueueId,
    },
    Connect {
        desc: ServiceDescription,
        queue_id: QueueId,
        queue: Arc<ChunkQueue>,
        policy: QueueFullPolicy,
    },
    Disconnect {
        desc: ServiceDescription,
        queue_id: QueueId,
    },
    Ack {
        desc: ServiceDescription,
        queue_id: Option<QueueId>,
        queue: Option<Arc<ChunkQueue>>,
    },
    Nack(ServiceDescription),
}

impl CaProMessage {
    pub fn service_description(&self) -> &ServiceDescription {
        match self {
            CaProMessage::Offer(d)
            | CaProMessage::StopOffer(d)
            | CaProMessage::Sub { desc: d, .. }
            | CaProMessage::Unsub { desc: d, .. }
            | CaProMessage::Connect { desc: d, .. }
            | CaProMessage::Disconnect { desc: d, .. }
            | CaProMessage::Ack { desc: d, .. }
            | CaProMessage::Nack(d) => d,
        }
    }
}

/// Runtime registration handshake, carried over the same out-of-band
/// control channel (§6). `version` is `(major, minor, patch)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegMessage {
    pub runtime_name: String,
    pub version: (u16, u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegAckMessage {
    pub ok: bool,
    pub reason: Option<String>,
}
