// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Router configuration: mempool ladder, ACL strings, compatibility level,
// log filter. Loaded from TOML, grounded on econic-ai-massive-graph's
// config/toml Cargo.toml convention (the teacher has no config loader).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityLevel {
    Off,
    Major,
    Minor,
    Patch,
    CommitId,
    BuildDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemPoolConfig {
    pub chunk_size: u32,
    pub num_chunks: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentConfig {
    pub name: String,
    #[serde(default)]
    pub acl_owner: Option<String>,
    #[serde(default)]
    pub acl_group: Option<String>,
    pub mempools: Vec<MemPoolConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub segment: SegmentConfig,
    #[serde(default = "default_compatibility")]
    pub compatibility: CompatibilityLevel,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_max_held_per_port")]
    pub max_chunks_held_per_port: usize,
    #[serde(default = "default_max_ports_per_kind")]
    pub max_ports_per_kind: usize,
}

fn default_compatibility() -> CompatibilityLevel {
    CompatibilityLevel::Minor
}

fn default_log_filter() -> String {
    "info".to_owned()
}

fn default_max_held_per_port() -> usize {
    crate::port::used_chunk_list::DEFAULT_MAX_HELD_PER_PORT
}

fn default_max_ports_per_kind() -> usize {
    crate::router::port_manager::DEFAULT_MAX_PORTS_PER_KIND
}

impl RouterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// A single-tier default usable without a configuration file: one
    /// small, one medium, one large, one extra-large chunk pool.
    pub fn default_standalone() -> Self {
        Self {
            segment: SegmentConfig {
                name: "iceshim".to_owned(),
                acl_owner: None,
                acl_group: None,
                mempools: vec![
                    MemPoolConfig { chunk_size: 128, num_chunks: 4096 },
                    MemPoolConfig { chunk_size: 1024, num_chunks: 1024 },
                    MemPoolConfig { chunk_size: 16 * 1024, num_chunks: 256 },
                    MemPoolConfig { chunk_size: 1024 * 1024, num_chunks: 32 },
                ],
            },
            compatibility: default_compatibility(),
            log_filter: default_log_filter(),
            max_chunks_held_per_port: default_max_held_per_port(),
            max_ports_per_kind: default_max_ports_per_kind(),
        }
    }

    pub fn mempool_configs(&self) -> Vec<(u32, u32)> {
        self.segment
            .mempools
            .iter()
            .map(|p| (p.chunk_size, p.num_chunks))
            .collect()
    }
}
