//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use serde::{Deserialize, Serialize};

/// Process-wide tunables consulted on every potentially-promoting mutation.
///
/// Defaults match the values this family of in-memory engines has shipped
/// with for years; operators override them via a config file or CLI flags
/// in `warren-cli`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Above this many entries, an integer-only set promotes from its
    /// packed encoding to a hash table.
    pub set_max_intset_entries: usize,
    /// Above this many entries, a list promotes from its compact encoding
    /// to a doubly-linked list.
    pub list_max_ziplist_entries: usize,
    /// A single byte element longer than this forces list promotion
    /// regardless of length.
    pub list_max_ziplist_value: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            set_max_intset_entries: 512,
            list_max_ziplist_entries: 128,
            list_max_ziplist_value: 64,
        }
    }
}

/// The config a runnable server needs beyond the engine's own tunables:
/// where to listen, and the `EngineConfig` to hand every `Database` it
/// creates. Kept separate from `EngineConfig` itself so the hot-path
/// struct every container operation borrows stays a plain `Copy` value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6399,
            engine: EngineConfig::default(),
        }
    }
}
