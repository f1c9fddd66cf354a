// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The router daemon's in-process state: port directory, runtime registry,
// memory manager and the unique port-id allocator. Grounded on
// DESIGN NOTES §9's "daemon singleton via file lock" note, modeled here
// as an explicit context object rather than a process-wide global.

pub mod port_manager;
pub mod registry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::RouterConfig;
use crate::mem::MemoryManager;
use crate::router::port_manager::PortManager;
use crate::router::registry::RuntimeRegistry;

/// Router-private state threaded through the daemon. Not placed in shared
/// memory: only this process ever reads it.
pub struct DaemonContext {
    pub config: RouterConfig,
    pub memory: Arc<MemoryManager>,
    pub ports: PortManager,
    pub runtimes: Arc<Mutex<RuntimeRegistry>>,
    next_port_id: AtomicU64,
}

/// The router's own protocol version, compared against a registering
/// runtime's version tuple per the configured `CompatibilityLevel`.
pub const ROUTER_VERSION: (u16, u16, u16) = (1, 0, 0);

impl DaemonContext {
    pub fn new(config: RouterConfig) -> Self {
        let memory = Arc::new(MemoryManager::new(config.mempool_configs()));
        let runtimes = Arc::new(Mutex::new(RuntimeRegistry::new(config.compatibility, ROUTER_VERSION)));
        let max_ports = config.max_ports_per_kind;
        Self {
            config,
            memory,
            ports: PortManager::new(max_ports, Arc::clone(&runtimes)),
            runtimes,
            next_port_id: AtomicU64::new(1),
        }
    }

    pub fn allocate_port_id(&self) -> u64 {
        self.next_port_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs the discovery loop forever on the calling thread: one pass of
    /// port-state-machine polling, then a liveness reap, then sleep.
    pub fn run_discovery_loop(&self, tick: Duration) -> ! {
        info!(segment = %self.config.segment.name, "router discovery loop starting");
        loop {
            self.ports.run_discovery_tick();
            let reclaimed = self.runtimes.lock().unwrap().reap_dead();
            if !reclaimed.is_empty() {
                debug!(?reclaimed, "reclaimed ports from dead runtimes");
                for port_id in reclaimed {
                    self.ports.detach_port(port_id);
                }
            }
            std::thread::sleep(tick);
        }
    }
}
