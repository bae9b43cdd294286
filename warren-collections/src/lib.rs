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

//! The in-memory collection engine: Set and List containers, each a
//! polymorphic object over two interchangeable physical encodings, their
//! multi-key set algebra, and the blocking-key rendezvous that parks
//! connections against keys until a matching push wakes them.
//!
//! This crate has no notion of a keyspace, a wire protocol, or a socket.
//! It is the "hard part" -- component A through E of the engine -- with
//! every external collaborator (command dispatch, persistence, the
//! keyspace map) left to `warren`.

pub mod algebra;
pub mod blocking;
pub mod elem;
pub mod list;
pub mod set;

pub use blocking::{BlockingTable, WaiterId, WaiterInfo};
pub use elem::Elem;
pub use list::{End, List, Side};
pub use set::Set;
