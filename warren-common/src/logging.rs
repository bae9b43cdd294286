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

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber reading `WARREN_LOG`, falling back
/// to `RUST_LOG`, falling back to `info`. Call once, from a binary's `main`.
pub fn init() {
    let filter = EnvFilter::try_from_env("WARREN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).try_init();
}
