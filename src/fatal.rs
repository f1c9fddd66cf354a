// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fatal-condition reporting. Per spec §7: a protocol violation or a
// release of an un-held chunk indicates a daemon/runtime bug, not a
// recoverable error, and is not locally catchable.

/// Logs `msg` at error level and aborts the process. Never returns.
#[track_caller]
pub fn fatal_error(msg: &str) -> ! {
    tracing::error!(location = %std::panic::Location::caller(), "{msg}");
    std::process::abort();
}
