// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Recoverable error taxonomy for the chunk/port data plane.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    #[error("no mempool configured is large enough for the requested chunk")]
    NoMempoolsAvailable,
    #[error("the fitting mempool has no free chunks left")]
    RunningOutOfChunks,
    #[error("the port already holds the maximum number of chunks allowed in parallel")]
    TooManyChunksAllocatedInParallel,
    #[error("invalid user payload or user header size/alignment")]
    InvalidParameterForUserPayloadOrUserHeader,
    #[error("invalid request header parameter")]
    InvalidParameterForRequestHeader,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkReceiveResult {
    #[error("no chunk is currently available on the queue")]
    NoChunkAvailable,
    #[error("the port already holds the maximum number of chunks allowed in parallel")]
    TooManyChunksHeldInParallel,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServerRequestResult {
    #[error("no pending requests and the server does not currently offer")]
    NoPendingRequestsAndServerDoesNotOffer,
    #[error("no chunk is currently available on the queue")]
    NoChunkAvailable,
    #[error("the port already holds the maximum number of chunks allowed in parallel")]
    TooManyChunksHeldInParallel,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServerSendError {
    #[error("the requesting client is no longer connected")]
    ClientNotAvailable,
    #[error("the server does not currently offer")]
    NotOffered,
    #[error("the response does not reference a known request")]
    InvalidResponse,
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PortPoolError {
    #[error("publisher port list is full")]
    PublisherPortListFull,
    #[error("subscriber port list is full")]
    SubscriberPortListFull,
    #[error("client port list is full")]
    ClientPortListFull,
    #[error("server port list is full")]
    ServerPortListFull,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("a live runtime named {0:?} is already registered")]
    DuplicateRuntimeName(String),
    #[error("runtime protocol version {found:?} is incompatible with router level {level:?} (router is {router:?})")]
    IncompatibleVersion {
        found: (u16, u16, u16),
        router: (u16, u16, u16),
        level: crate::config::CompatibilityLevel,
    },
}
