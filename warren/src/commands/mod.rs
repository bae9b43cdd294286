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

//! The command surface (§6): one `impl Database` block per container
//! family, each method a thin, mechanical translation from a command's
//! argument list to the corresponding `warren-collections` operation plus
//! whatever keyspace bookkeeping (type-check, create-on-demand,
//! delete-if-empty, signal-modified) the operation needs. No algorithmic
//! content lives here that doesn't already live in `warren-collections`.

pub mod blocking;
pub mod lists;
pub mod sets;
