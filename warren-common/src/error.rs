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

//! Error categories for the collection engine.
//!
//! These map one-to-one onto the error kinds a command layer must be able
//! to distinguish: everything here leaves state unchanged and produces a
//! reply. Invariant violations (an unknown encoding tag, an impossible
//! branch) are not represented as variants here — they are programmer
//! errors and are asserted or `unreachable!()`'d at the violation site
//! instead of propagated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("no such key")]
    NoSuchKey,

    #[error("index out of range")]
    OutOfRange,

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("timeout is not a float or negative")]
    BadTimeout,

    #[error("pivot not found")]
    PivotNotFound,
}

pub type Result<T> = std::result::Result<T, Error>;
