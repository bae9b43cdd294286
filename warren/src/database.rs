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

//! `Database` ties the keyspace (§3) and the blocking-key rendezvous
//! (§4.E) together with the one piece neither of those crates owns: a
//! `WaiterId -> oneshot::Sender` map, so "hand the waiter its value" means
//! sending on a channel instead of writing to a socket directly.
//! `warren-cli` owns the receiving ends and whatever connection state a
//! wake-up needs to re-attach to.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::oneshot;

use warren_collections::blocking::{BlockingTable, WaiterId};
use warren_collections::list::End;
use warren_collections::Elem;
use warren_common::config::EngineConfig;
use warren_common::error::{Error, Result};

use crate::keyspace::{Keyspace, Value};
use crate::reply::Reply;

/// What a parked waiter is ultimately woken with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeReply {
    /// An element popped from `key` (or handed off by a matching push)
    /// and, for a pop-and-push waiter, already installed at its target.
    Popped { key: Bytes, value: Bytes },
    /// The waiter's deadline elapsed with nothing delivered.
    TimedOut,
}

impl WakeReply {
    /// `BLPOP`/`BRPOP`'s wire shape: `[key, value]`, or nil on timeout.
    pub fn into_pair_reply(self) -> Reply {
        match self {
            WakeReply::Popped { key, value } => Reply::Multi(vec![Reply::bulk(key), Reply::bulk(value)]),
            WakeReply::TimedOut => Reply::nil(),
        }
    }

    /// `BRPOPLPUSH`'s wire shape: just the value, or nil on timeout.
    pub fn into_value_reply(self) -> Reply {
        match self {
            WakeReply::Popped { value, .. } => Reply::bulk(value),
            WakeReply::TimedOut => Reply::nil(),
        }
    }
}

/// The outcome of a blocking-pop style command: either it was satisfiable
/// immediately against the keyspace as it stood, or the caller is now
/// parked and must await the returned receiver.
pub enum BlockOutcome {
    Immediate { key: Bytes, value: Bytes },
    Blocked { id: WaiterId, rx: oneshot::Receiver<WakeReply> },
}

pub struct Database {
    pub(crate) keyspace: Keyspace,
    pub(crate) blocking: BlockingTable,
    pub(crate) config: EngineConfig,
    wakers: HashMap<WaiterId, oneshot::Sender<WakeReply>>,
}

impl Database {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            keyspace: Keyspace::new(),
            blocking: BlockingTable::new(),
            config,
            wakers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Register a new waiter and its delivery channel. Internal helper
    /// shared by `blocking_pop` and `blocking_pop_push`'s blocked path.
    fn park(&mut self, keys: Vec<Bytes>, timeout: Option<Duration>, target: Option<Bytes>) -> (WaiterId, oneshot::Receiver<WakeReply>) {
        let deadline = timeout.map(|d| Instant::now() + d);
        let id = self.blocking.block(keys, deadline, target);
        let (tx, rx) = oneshot::channel();
        self.wakers.insert(id, tx);
        (id, rx)
    }

    /// `BLPOP`/`BRPOP`: try every key left-to-right for an immediately
    /// poppable list; if none has one, park on all of them in the order
    /// given.
    pub fn blocking_pop(&mut self, keys: &[Bytes], end: End, timeout: Option<Duration>) -> Result<BlockOutcome> {
        for key in keys {
            match self.keyspace.lookup_read(key) {
                Some(v) if v.as_list().is_none() => return Err(Error::WrongType),
                _ => {}
            }
        }
        for key in keys {
            if let Some(Value::List(list)) = self.keyspace.lookup_write(key) {
                if let Some(value) = list.pop(end) {
                    self.keyspace.signal_modified(key);
                    self.keyspace.delete_if_empty(key);
                    return Ok(BlockOutcome::Immediate { key: key.clone(), value });
                }
            }
        }
        let (id, rx) = self.park(keys.to_vec(), timeout, None);
        Ok(BlockOutcome::Blocked { id, rx })
    }

    /// `BRPOPLPUSH src dst timeout`: pop-and-push, blocking on `src` when
    /// it has nothing to pop. `dst`'s type is checked up front so a wrong
    /// type at the destination fails fast instead of parking a waiter
    /// that can never be satisfied.
    pub fn blocking_pop_push(&mut self, src: &Bytes, dst: &Bytes, timeout: Option<Duration>) -> Result<BlockOutcome> {
        if let Some(v) = self.keyspace.lookup_read(dst) {
            if v.as_list().is_none() {
                return Err(Error::WrongType);
            }
        }
        if let Some(v) = self.keyspace.lookup_read(src) {
            if v.as_list().is_none() {
                return Err(Error::WrongType);
            }
        }
        if let Some(Value::List(list)) = self.keyspace.lookup_write(src) {
            if let Some(value) = list.pop(End::Tail) {
                self.keyspace.signal_modified(src);
                self.keyspace.delete_if_empty(src);
                self.keyspace
                    .get_or_create_list(dst)
                    .push(&self.config, Elem::from_object(&value), End::Head);
                self.keyspace.signal_modified(dst);
                return Ok(BlockOutcome::Immediate { key: src.clone(), value });
            }
        }
        let (id, rx) = self.park(vec![src.clone()], timeout, Some(dst.clone()));
        Ok(BlockOutcome::Blocked { id, rx })
    }

    /// Try to hand `value`, just pushed onto `key`, directly to the
    /// oldest waiter parked on `key` instead of letting it land in the
    /// list at all. Waiters whose pop-and-push target exists but is the
    /// wrong type are skipped and the next one in FIFO order is tried,
    /// per the rendezvous's "skip, keep looking" rule. Returns `true` if
    /// some waiter took it, in which case the caller must not also push.
    pub fn try_deliver(&mut self, key: &Bytes, value: &Elem<'_>) -> bool {
        loop {
            let Some((id, info)) = self.blocking.pop_waiter(key) else {
                return false;
            };

            if let Some(target) = &info.target {
                if let Some(v) = self.keyspace.lookup_read(target) {
                    if v.as_list().is_none() {
                        self.wakers.remove(&id);
                        continue;
                    }
                }
            }

            let delivered = value.as_object();

            if let Some(target) = &info.target {
                self.keyspace
                    .get_or_create_list(target)
                    .push(&self.config, Elem::from_object(&delivered), End::Head);
                self.keyspace.signal_modified(target);
            }

            if let Some(tx) = self.wakers.remove(&id) {
                let _ = tx.send(WakeReply::Popped { key: key.clone(), value: delivered });
            }
            warren_common::metrics::record_blocking_deliver();
            return true;
        }
    }

    /// Deadline sweep: the event loop's timer tick drives this, waking
    /// every waiter whose deadline has elapsed with `WakeReply::TimedOut`.
    pub fn sweep_expired(&mut self) {
        let now = Instant::now();
        for (id, _info) in self.blocking.take_expired(now) {
            if let Some(tx) = self.wakers.remove(&id) {
                let _ = tx.send(WakeReply::TimedOut);
            }
        }
    }

    /// Cancel a waiter, e.g. on client disconnect. A no-op if it was
    /// already delivered or swept.
    pub fn unblock_waiter(&mut self, id: WaiterId) {
        self.blocking.unblock(id);
        self.wakers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_collections::Set;

    fn db() -> Database {
        Database::new(EngineConfig::default())
    }

    #[tokio::test]
    async fn blocking_pop_is_immediate_when_a_list_already_has_data() {
        let mut d = db();
        d.keyspace.add(Bytes::from_static(b"k"), Value::List({
            let mut l = warren_collections::List::new();
            l.push(&d.config, Elem::from_bytes(b"v"), End::Tail);
            l
        }));

        match d.blocking_pop(&[Bytes::from_static(b"k")], End::Head, None).unwrap() {
            BlockOutcome::Immediate { key, value } => {
                assert_eq!(key, Bytes::from_static(b"k"));
                assert_eq!(value, Bytes::from_static(b"v"));
            }
            BlockOutcome::Blocked { .. } => panic!("expected an immediate pop"),
        }
        assert!(!d.keyspace.exists(b"k"), "emptied list must be deleted");
    }

    #[tokio::test]
    async fn blocking_pop_parks_and_is_woken_by_a_push() {
        let mut d = db();
        let key = Bytes::from_static(b"k");

        let rx = match d.blocking_pop(&[key.clone()], End::Head, None).unwrap() {
            BlockOutcome::Blocked { rx, .. } => rx,
            BlockOutcome::Immediate { .. } => panic!("expected to block"),
        };

        let delivered = d.try_deliver(&key, &Elem::from_bytes(b"hello"));
        assert!(delivered);

        let reply = rx.await.unwrap();
        assert_eq!(reply, WakeReply::Popped { key, value: Bytes::from_static(b"hello") });
    }

    #[tokio::test]
    async fn blocking_pop_rejects_wrong_type_key() {
        let mut d = db();
        d.keyspace.add(Bytes::from_static(b"k"), Value::Set(Set::empty_int()));
        let err = d.blocking_pop(&[Bytes::from_static(b"k")], End::Head, None).unwrap_err();
        assert!(matches!(err, Error::WrongType));
    }

    #[test_log::test(tokio::test)]
    async fn expired_waiter_is_woken_with_timeout() {
        let mut d = db();
        let rx = match d
            .blocking_pop(&[Bytes::from_static(b"k")], End::Head, Some(Duration::from_millis(0)))
            .unwrap()
        {
            BlockOutcome::Blocked { rx, .. } => rx,
            BlockOutcome::Immediate { .. } => panic!("expected to block"),
        };
        std::thread::sleep(Duration::from_millis(5));
        d.sweep_expired();
        assert_eq!(rx.await.unwrap(), WakeReply::TimedOut);
    }

    #[tokio::test]
    async fn pop_and_push_waiter_is_skipped_if_target_becomes_wrong_type() {
        let mut d = db();
        let src = Bytes::from_static(b"src");
        let dst = Bytes::from_static(b"dst");

        let _rx = match d.blocking_pop_push(&src, &dst, None).unwrap() {
            BlockOutcome::Blocked { rx, .. } => rx,
            BlockOutcome::Immediate { .. } => panic!("expected to block"),
        };

        // A SADD on dst after the waiter parked makes it undeliverable;
        // try_deliver must skip it rather than push into a set.
        d.keyspace.add(dst.clone(), Value::Set(Set::empty_int()));
        let delivered = d.try_deliver(&src, &Elem::from_bytes(b"x"));
        assert!(!delivered, "no waiter left to claim the push, so it lands in the list");

        // The caller's normal push path then runs, same as any push that
        // `try_deliver` declines: the element lands in `src`'s own list.
        d.keyspace
            .get_or_create_list(&src)
            .push(&d.config, Elem::from_bytes(b"x"), End::Tail);
        assert_eq!(
            d.keyspace.lookup_read(b"src").and_then(Value::as_list).map(warren_collections::List::len),
            Some(1)
        );
    }
}
