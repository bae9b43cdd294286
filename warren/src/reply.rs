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

//! The reply shapes every command produces, per §6's "Reply conventions":
//! integers for counts/booleans, a bulk reply for a single element, a
//! multi-bulk for sequences, nil for misses, and errors. `warren-cli`
//! serialises these to wire bytes; this crate never does I/O.

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Int(i64),
    Bulk(Option<Bytes>),
    Multi(Vec<Reply>),
    Ok,
}

impl Reply {
    pub fn bulk(b: Bytes) -> Self {
        Reply::Bulk(Some(b))
    }

    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    pub fn multi(items: Vec<Bytes>) -> Self {
        Reply::Multi(items.into_iter().map(|b| Reply::Bulk(Some(b))).collect())
    }

    pub fn bool(b: bool) -> Self {
        Reply::Int(b as i64)
    }
}
