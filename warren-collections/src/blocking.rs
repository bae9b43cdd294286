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

//! The Blocking-Key Rendezvous (component E): parks waiters against one
//! or more keys with an optional deadline, and hands the oldest waiter on
//! a key an element directly when one becomes available.
//!
//! This module knows nothing about sockets, clients, or channels -- it is
//! pure bookkeeping over opaque `WaiterId`s, two indices kept in sync
//! (`by_key` and `waiters`), and a deadline. The actual suspension of a
//! connection's read side, and the delivery of a reply to it, are done by
//! `warren`'s command glue, which maps a `WaiterId` to whatever channel it
//! used to register the waiter (see SPEC_FULL.md §5).

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use bytes::Bytes;

/// Opaque identifier for a parked waiter. Carries no lifetime and no
/// client pointer -- a deliberate substitution for the C original's
/// `client*`, which Rust's ownership model has no direct equivalent for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

#[derive(Debug, Clone)]
pub struct WaiterInfo {
    pub keys: Vec<Bytes>,
    pub deadline: Option<Instant>,
    /// `BRPOPLPUSH`-style pop-and-push target, if any.
    pub target: Option<Bytes>,
}

/// Per-database blocking tables: `blocking_keys: key -> ordered waiters`
/// plus the reverse index needed to remove a waiter from every key it
/// registered on in one call.
#[derive(Debug, Default)]
pub struct BlockingTable {
    by_key: HashMap<Bytes, VecDeque<WaiterId>>,
    waiters: HashMap<WaiterId, WaiterInfo>,
    next_id: u64,
}

impl BlockingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Block(client, keys[], deadline, target-or-none)`. A `deadline` of
    /// `None` means "no expiry" (the caller-facing timeout of `0`).
    pub fn block(&mut self, keys: Vec<Bytes>, deadline: Option<Instant>, target: Option<Bytes>) -> WaiterId {
        self.next_id += 1;
        let id = WaiterId(self.next_id);
        for key in &keys {
            self.by_key.entry(key.clone()).or_default().push_back(id);
        }
        self.waiters.insert(id, WaiterInfo { keys, deadline, target });
        warren_common::metrics::record_blocking_block();
        id
    }

    /// `Unblock(client)`: removes the waiter from every per-key list it is
    /// registered on, dropping any per-key list that becomes empty.
    /// Returns its info if it was still blocked (disconnect/expiry race
    /// with a concurrent deliver makes a double-unblock possible at the
    /// call site, so this is intentionally idempotent).
    pub fn unblock(&mut self, id: WaiterId) -> Option<WaiterInfo> {
        let info = self.waiters.remove(&id)?;
        for key in &info.keys {
            self.detach(key, id);
        }
        Some(info)
    }

    fn detach(&mut self, key: &Bytes, id: WaiterId) {
        if let Some(q) = self.by_key.get_mut(key) {
            q.retain(|w| *w != id);
            if q.is_empty() {
                self.by_key.remove(key);
            }
        }
    }

    /// Pop the oldest waiter registered on `key`, fully unblocking it (it
    /// is removed from every other key it was registered on too). This is
    /// the primitive `try-deliver`'s FIFO loop is built from: the caller
    /// decides whether the popped waiter is actually deliverable (e.g. its
    /// pop-and-push target type-checks) and, if not, calls this again for
    /// the next one.
    pub fn pop_waiter(&mut self, key: &[u8]) -> Option<(WaiterId, WaiterInfo)> {
        let id = {
            let q = self.by_key.get_mut(key)?;
            let id = q.pop_front()?;
            if q.is_empty() {
                self.by_key.remove(key);
            }
            id
        };
        let info = self.waiters.remove(&id).expect("waiter present in by_key must be in waiters");
        for k in &info.keys {
            if k.as_ref() != key {
                self.detach(k, id);
            }
        }
        Some((id, info))
    }

    /// Number of waiters currently parked on `key`, for `try-deliver`'s
    /// caller to bound its loop to the count captured at entry.
    pub fn waiting_len(&self, key: &[u8]) -> usize {
        self.by_key.get(key).map_or(0, VecDeque::len)
    }

    pub fn has_waiters(&self, key: &[u8]) -> bool {
        self.by_key.contains_key(key)
    }

    /// Deadline sweep: unblock and return every waiter whose non-`None`
    /// deadline has elapsed as of `now`. The event loop's timer tick
    /// drives this; the core itself never measures time on its own.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(WaiterId, WaiterInfo)> {
        let expired: Vec<WaiterId> = self
            .waiters
            .iter()
            .filter(|(_, info)| info.deadline.is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.unblock(id).map(|info| (id, info)))
            .inspect(|_| warren_common::metrics::record_blocking_timeout())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn fifo_order_within_a_key() {
        let mut t = BlockingTable::new();
        let a = t.block(vec![key("k")], None, None);
        let b = t.block(vec![key("k")], None, None);

        let (first, _) = t.pop_waiter(b"k").unwrap();
        assert_eq!(first, a);
        let (second, _) = t.pop_waiter(b"k").unwrap();
        assert_eq!(second, b);
        assert!(t.pop_waiter(b"k").is_none());
    }

    #[test]
    fn unblock_removes_from_every_registered_key() {
        let mut t = BlockingTable::new();
        let id = t.block(vec![key("a"), key("b")], None, None);
        assert!(t.has_waiters(b"a"));
        assert!(t.has_waiters(b"b"));

        t.unblock(id);
        assert!(!t.has_waiters(b"a"));
        assert!(!t.has_waiters(b"b"));
        assert!(t.is_empty());
    }

    #[test]
    fn waiter_registered_on_multiple_keys_is_claimed_once() {
        let mut t = BlockingTable::new();
        let id = t.block(vec![key("a"), key("b")], None, None);

        let (popped, _) = t.pop_waiter(b"a").unwrap();
        assert_eq!(popped, id);
        // Delivered via "a"; must no longer be reachable via "b".
        assert!(!t.has_waiters(b"b"));
        assert!(t.is_empty());
    }

    #[test_log::test]
    fn expired_waiters_are_swept() {
        let mut t = BlockingTable::new();
        let past = Instant::now() - Duration::from_secs(1);
        let never = t.block(vec![key("k")], None, None);
        let gone = t.block(vec![key("k2")], Some(past), None);

        let expired = t.take_expired(Instant::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, gone);
        assert!(t.has_waiters(b"k"));
        let _ = never;
    }
}
