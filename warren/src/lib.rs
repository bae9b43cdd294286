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

//! The facade: a concrete `Keyspace` over `warren-collections`' Set and
//! List containers, a `Database` that threads keyspace lookups through
//! them, and the command surface that gives every command in the wire
//! protocol a one-to-one `Database` method. Everything here is glue --
//! the container algorithms live one crate down.

pub mod commands;
pub mod database;
pub mod keyspace;
pub mod reply;

pub use database::{BlockOutcome, Database, WakeReply};
pub use keyspace::{Keyspace, Value};
pub use reply::Reply;
