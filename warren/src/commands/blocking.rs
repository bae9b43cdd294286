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

//! `BLPOP`/`BRPOP`/`BRPOPLPUSH` as convenience `async fn`s that await the
//! immediate-or-parked outcome straight through to a `Reply`.
//!
//! These hide the `WaiterId` a parked call produces, which is fine for a
//! connection handler that just awaits its command to completion. A
//! handler that also needs to race a client disconnect against the block
//! (so it can cancel cleanly) should use `Database::blocking_pop` /
//! `blocking_pop_push` directly instead and call `unblock_waiter` itself
//! on cancellation -- that wiring belongs to `warren-cli`'s connection
//! loop, not here.

use std::time::Duration;

use bytes::Bytes;
use warren_collections::list::End;
use warren_common::error::Result;

use crate::database::{BlockOutcome, Database, WakeReply};
use crate::reply::Reply;

impl Database {
    pub async fn blpop(&mut self, keys: &[Bytes], timeout: Option<Duration>) -> Result<Reply> {
        self.blocking_pop_reply(keys, End::Head, timeout).await
    }

    pub async fn brpop(&mut self, keys: &[Bytes], timeout: Option<Duration>) -> Result<Reply> {
        self.blocking_pop_reply(keys, End::Tail, timeout).await
    }

    async fn blocking_pop_reply(&mut self, keys: &[Bytes], end: End, timeout: Option<Duration>) -> Result<Reply> {
        match self.blocking_pop(keys, end, timeout)? {
            BlockOutcome::Immediate { key, value } => Ok(Reply::Multi(vec![Reply::bulk(key), Reply::bulk(value)])),
            BlockOutcome::Blocked { rx, .. } => Ok(rx.await.unwrap_or(WakeReply::TimedOut).into_pair_reply()),
        }
    }

    pub async fn brpoplpush(&mut self, src: &Bytes, dst: &Bytes, timeout: Option<Duration>) -> Result<Reply> {
        match self.blocking_pop_push(src, dst, timeout)? {
            BlockOutcome::Immediate { value, .. } => Ok(Reply::bulk(value)),
            BlockOutcome::Blocked { rx, .. } => Ok(rx.await.unwrap_or(WakeReply::TimedOut).into_value_reply()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_common::config::EngineConfig;

    fn db() -> Database {
        Database::new(EngineConfig::default())
    }

    #[tokio::test]
    async fn blpop_returns_immediately_when_data_is_already_there() {
        let mut d = db();
        let k = Bytes::from_static(b"k");
        d.rpush(&k, &[Bytes::from_static(b"v")]).unwrap();
        let reply = d.blpop(&[k.clone()], None).await.unwrap();
        assert_eq!(reply, Reply::Multi(vec![Reply::bulk(k), Reply::bulk(Bytes::from_static(b"v"))]));
    }

    #[tokio::test]
    async fn blpop_blocks_then_wakes_on_a_matching_push() {
        let mut d = db();
        let k = Bytes::from_static(b"k");

        let outcome = d.blocking_pop(&[k.clone()], End::Head, None).unwrap();
        let rx = match outcome {
            BlockOutcome::Blocked { rx, .. } => rx,
            BlockOutcome::Immediate { .. } => panic!("expected to block"),
        };

        assert!(d.try_deliver(&k, &warren_collections::Elem::from_bytes(b"later")));
        assert_eq!(
            rx.await.unwrap().into_pair_reply(),
            Reply::Multi(vec![Reply::bulk(k), Reply::bulk(Bytes::from_static(b"later"))])
        );
    }

    #[tokio::test]
    async fn brpoplpush_rejects_wrong_type_destination_up_front() {
        let mut d = db();
        let src = Bytes::from_static(b"src");
        let dst = Bytes::from_static(b"dst");
        d.sadd(&dst, &[Bytes::from_static(b"x")]).unwrap();
        let err = d.brpoplpush(&src, &dst, None).await.unwrap_err();
        assert!(matches!(err, warren_common::error::Error::WrongType));
    }
}
