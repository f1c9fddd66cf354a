// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Request/response envelope headers for client/server ports (spec §4.9).
// Stored in a chunk's user-header region.

use crate::mem::SharedChunk;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RequestHeader {
    pub unique_client_queue_id: u64,
    pub last_known_client_queue_index: u64,
    pub sequence_id: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ResponseHeader {
    pub unique_client_queue_id: u64,
    pub sequence_id: u64,
}

pub fn request_header_settings(payload_size: u32, payload_align: u16) -> crate::mem::ChunkSettings {
    crate::mem::ChunkSettings {
        user_payload_size: payload_size,
        user_payload_alignment: payload_align,
        user_header_size: std::mem::size_of::<RequestHeader>() as u32,
        user_header_alignment: std::mem::align_of::<RequestHeader>() as u16,
    }
}

pub fn response_header_settings(payload_size: u32, payload_align: u16) -> crate::mem::ChunkSettings {
    crate::mem::ChunkSettings {
        user_payload_size: payload_size,
        user_payload_alignment: payload_align,
        user_header_size: std::mem::size_of::<ResponseHeader>() as u32,
        user_header_alignment: std::mem::align_of::<ResponseHeader>() as u16,
    }
}

/// SAFETY: `chunk` must have been allocated with `request_header_settings`.
pub unsafe fn write_request_header(chunk: &mut SharedChunk, header: RequestHeader) {
    let ptr = chunk.user_header_ptr() as *mut RequestHeader;
    ptr.write(header);
}

pub fn read_request_header(chunk: &SharedChunk) -> RequestHeader {
    unsafe { *(chunk.user_header_ptr() as *const RequestHeader) }
}

/// SAFETY: `chunk` must have been allocated with `response_header_settings`.
pub unsafe fn write_response_header(chunk: &mut SharedChunk, header: ResponseHeader) {
    let ptr = chunk.user_header_ptr() as *mut ResponseHeader;
    ptr.write(header);
}

pub fn read_response_header(chunk: &SharedChunk) -> ResponseHeader {
    unsafe { *(chunk.user_header_ptr() as *const ResponseHeader) }
}
