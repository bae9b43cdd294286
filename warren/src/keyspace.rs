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

//! The keyspace hook (§3): `keys -> value-object` plus `lookup`, `add`,
//! `delete`, and a `signal-modified` notification. Deliberately a bare
//! `HashMap` -- spec.md scopes the keyspace's own data structure out, and
//! nothing here is performance-sensitive the way the containers are.

use std::collections::HashMap;

use bytes::Bytes;
use warren_collections::{List, Set};

#[derive(Debug)]
pub enum Value {
    Set(Set),
    List(List),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Set(_) => "set",
            Value::List(_) => "list",
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Keyspace {
    map: HashMap<Bytes, Value>,
    /// Process-wide monotonic count of mutating operations. Out of scope
    /// for this crate to *consume* -- persistence/replication would be
    /// the consumer -- but the core still has to increment it so those
    /// external collaborators have something to read.
    dirty: u64,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_read(&self, key: &[u8]) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn lookup_write(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.map.get_mut(key)
    }

    pub fn add(&mut self, key: Bytes, value: Value) {
        self.map.insert(key, value);
    }

    pub fn delete(&mut self, key: &[u8]) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.map.contains_key(key)
    }

    pub fn signal_modified(&mut self, key: &[u8]) {
        self.dirty += 1;
        tracing::trace!(key = ?String::from_utf8_lossy(key), dirty = self.dirty, "key modified");
    }

    pub fn dirty(&self) -> u64 {
        self.dirty
    }

    /// Delete `key` if the value at it is a container that has become
    /// empty. The "empty-collection deletion" invariant (§8): any
    /// mutation reducing size to 0 deletes the key and signals exactly
    /// once.
    pub fn delete_if_empty(&mut self, key: &[u8]) {
        let container = match self.map.get(key) {
            Some(Value::Set(s)) if s.is_empty() => Some("set"),
            Some(Value::List(l)) if l.is_empty() => Some("list"),
            _ => None,
        };
        if let Some(container) = container {
            self.map.remove(key);
            warren_common::metrics::record_key_deleted_empty(container);
            self.signal_modified(key);
        }
    }

    /// Get the `List` at `key`, creating an empty one if absent. Used by
    /// the blocking-key rendezvous ("push the element onto the target's
    /// head, creating an empty list if needed") and by `RPUSH`/`LPUSH`.
    ///
    /// Panics if `key` exists but is not a list -- callers must type-check
    /// first, exactly as the blocking hand-off path does.
    pub fn get_or_create_list(&mut self, key: &Bytes) -> &mut List {
        match self
            .map
            .entry(key.clone())
            .or_insert_with(|| Value::List(List::new()))
        {
            Value::List(l) => l,
            Value::Set(_) => unreachable!("caller must type-check before calling get_or_create_list"),
        }
    }

    pub fn get_or_create_set(&mut self, key: &Bytes) -> &mut Set {
        match self
            .map
            .entry(key.clone())
            .or_insert_with(|| Value::Set(Set::empty_int()))
        {
            Value::Set(s) => s,
            Value::List(_) => unreachable!("caller must type-check before calling get_or_create_set"),
        }
    }
}
