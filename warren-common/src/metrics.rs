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

//! Thin wrappers over the `metrics` facade. Counting is additive and never
//! gates control flow; if no recorder is installed these are no-ops.

pub fn record_promotion(container: &'static str) {
    metrics::counter!("warren_promotions_total", "container" => container).increment(1);
}

pub fn record_blocking_deliver() {
    metrics::counter!("warren_blocking_delivered_total").increment(1);
}

pub fn record_blocking_timeout() {
    metrics::counter!("warren_blocking_timeout_total").increment(1);
}

pub fn record_blocking_block() {
    metrics::counter!("warren_blocking_blocked_total").increment(1);
}

pub fn record_key_deleted_empty(container: &'static str) {
    metrics::counter!("warren_keys_deleted_empty_total", "container" => container).increment(1);
}

pub fn record_sadd(inserted: u64) {
    metrics::counter!("warren_sadd_total").increment(inserted);
}

pub fn record_srem(removed: u64) {
    metrics::counter!("warren_srem_total").increment(removed);
}
