// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

pub mod client;
pub mod publisher;
pub mod request_response;
pub mod server;
pub mod subscriber;
pub mod used_chunk_list;

pub use client::{ClientConnectionState, ClientPortData, ClientPortRouDi, ClientPortUser};
pub use publisher::{PublisherPortData, PublisherPortRouDi, PublisherPortUser};
pub use request_response::{RequestHeader, ResponseHeader};
pub use server::{ServerPortData, ServerPortRouDi, ServerPortUser};
pub use subscriber::{
    SubscriberFlavor, SubscriberPortData, SubscriberPortRouDi, SubscriberPortUser, SubscriptionState,
};
pub use used_chunk_list::UsedChunkList;
