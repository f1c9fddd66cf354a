// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

pub mod distributor;
pub mod receiver;
pub mod sender;

pub use distributor::ChunkDistributor;
pub use receiver::ChunkReceiver;
pub use sender::ChunkSender;
