// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// A zero-copy shared-memory IPC middleware: a router daemon, runtimes,
// and four port types (publisher/subscriber/client/server) exchanging
// reference-counted chunks over lock-free queues. The mutex/condvar/ring
// primitives below are the teacher's original shared-memory building
// blocks, kept as the substrate a future true-shared-memory backend would
// map the data plane onto (see DESIGN.md).

pub mod shm_name;

mod platform;

mod shm;
pub use shm::{ShmHandle, ShmOpenMode};

mod mutex;
pub use mutex::IpcMutex;

mod scoped_access;
pub use scoped_access::ScopedAccess;

pub mod spin_lock;
pub use spin_lock::SpinLock;

mod rw_lock;
pub use rw_lock::RwLock;

mod condition;
pub use condition::IpcCondition;

mod waiter;
pub use waiter::Waiter;

mod buffer;
pub use buffer::IpcBuffer;

mod circ;
pub use circ::{BroadcastConnHead, ConnId, UnicastConnHead};

mod chunk_storage;

mod channel;
pub use channel::{Channel, Mode, Route};

pub mod mem;
pub mod chunk;
pub mod port;
pub mod router;

pub mod capro;
pub mod config;
pub mod error;
pub mod fatal;
