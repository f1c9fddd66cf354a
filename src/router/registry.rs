// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Router-private runtime registry (spec §4.10). Grounded on the teacher's
// proto::service_registry::ServiceRegistry table shape, moved out of
// shared memory since only the router needs to read it.

use std::collections::HashMap;

use crate::config::CompatibilityLevel;
use crate::error::RegistrationError;

struct RuntimeEntry {
    pid: u32,
    version: (u16, u16, u16),
    owned_ports: Vec<u64>,
}

/// `version` tuples are compared component-wise, truncated to the
/// configured compatibility level: `Off` never rejects, `Major` compares
/// only the first component, `Minor` the first two, `Patch` all three.
/// `CommitId`/`BuildDate` are accepted structurally identical to `Patch`
/// here since this in-process simulation has no commit/build metadata to
/// compare against.
fn compatible(level: CompatibilityLevel, router: (u16, u16, u16), found: (u16, u16, u16)) -> bool {
    match level {
        CompatibilityLevel::Off => true,
        CompatibilityLevel::Major => router.0 == found.0,
        CompatibilityLevel::Minor => router.0 == found.0 && router.1 == found.1,
        CompatibilityLevel::Patch | CompatibilityLevel::CommitId | CompatibilityLevel::BuildDate => {
            router == found
        }
    }
}

pub struct RuntimeRegistry {
    level: CompatibilityLevel,
    router_version: (u16, u16, u16),
    runtimes: HashMap<String, RuntimeEntry>,
}

impl RuntimeRegistry {
    pub fn new(level: CompatibilityLevel, router_version: (u16, u16, u16)) -> Self {
        Self { level, router_version, runtimes: HashMap::new() }
    }

    pub fn register(
        &mut self,
        name: &str,
        pid: u32,
        version: (u16, u16, u16),
    ) -> Result<(), RegistrationError> {
        if !compatible(self.level, self.router_version, version) {
            return Err(RegistrationError::IncompatibleVersion {
                found: version,
                router: self.router_version,
                level: self.level,
            });
        }
        if let Some(existing) = self.runtimes.get(name) {
            if is_alive(existing.pid) {
                return Err(RegistrationError::DuplicateRuntimeName(name.to_owned()));
            }
        }
        self.runtimes.insert(
            name.to_owned(),
            RuntimeEntry { pid, version, owned_ports: Vec::new() },
        );
        Ok(())
    }

    pub fn keepalive(&mut self, name: &str) {
        // Presence in the map plus a live pid is the liveness signal; no
        // separate timestamp is tracked since reap_dead checks the pid
        // directly.
        let _ = self.runtimes.get(name);
    }

    pub fn attach_port(&mut self, name: &str, port_id: u64) {
        if let Some(e) = self.runtimes.get_mut(name) {
            e.owned_ports.push(port_id);
        }
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.runtimes.get(name).map(|e| is_alive(e.pid)).unwrap_or(false)
    }

    /// Removes every runtime whose pid is no longer alive, returning the
    /// port ids that belonged to them so the caller can tear those ports
    /// down.
    pub fn reap_dead(&mut self) -> Vec<u64> {
        let dead: Vec<String> = self
            .runtimes
            .iter()
            .filter(|(_, e)| !is_alive(e.pid))
            .map(|(name, _)| name.clone())
            .collect();
        let mut reclaimed = Vec::new();
        for name in dead {
            if let Some(entry) = self.runtimes.remove(&name) {
                reclaimed.extend(entry.owned_ports);
            }
        }
        reclaimed
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    // kill(pid, 0) performs no signal delivery, only existence/permission
    // checks.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    true
}
