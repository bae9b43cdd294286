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

//! Ambient stack shared by the rest of the workspace: errors, config,
//! metrics, logging. No collection semantics live here.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{EngineConfig, ServerConfig};
pub use error::{Error, Result};
