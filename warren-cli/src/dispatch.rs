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

//! Translates a parsed request (`Vec<Bytes>`, command name first) into a
//! `Database` call and a `Reply`.
//!
//! Blocking commands deliberately do *not* go through `Database`'s
//! `blpop`/`brpop`/`brpoplpush` convenience wrappers: those are `&mut
//! self` async fns, so calling them through `db.borrow_mut()` would hold
//! the `RefCell` borrow for the entire blocked wait and wedge every other
//! connection sharing this `Database`. Instead this module calls the
//! synchronous `blocking_pop`/`blocking_pop_push`, lets the borrow drop
//! immediately, and only then awaits the receiver.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;

use warren::{BlockOutcome, Database, Reply, WakeReply};
use warren_collections::list::{End, Side};
use warren_common::error::{Error, Result};

pub async fn dispatch(db: &Rc<RefCell<Database>>, args: Vec<Bytes>) -> Result<Reply> {
    let Some((name, rest)) = args.split_first() else {
        return Err(Error::Syntax("empty command".to_string()));
    };
    let name = String::from_utf8_lossy(name).to_ascii_uppercase();

    match name.as_str() {
        "PING" => Ok(Reply::bulk(Bytes::from_static(b"PONG"))),

        "SADD" => {
            let (key, members) = key_and_rest(rest, "SADD")?;
            db.borrow_mut().sadd(key, members)
        }
        "SREM" => {
            let (key, members) = key_and_rest(rest, "SREM")?;
            db.borrow_mut().srem(key, members)
        }
        "SISMEMBER" => {
            let args = exact_n(rest, 2, "SISMEMBER")?;
            db.borrow().sismember(&args[0], &args[1])
        }
        "SCARD" => db.borrow().scard(exact_one(rest, "SCARD")?),
        "SMOVE" => {
            let args = exact_n(rest, 3, "SMOVE")?;
            db.borrow_mut().smove(&args[0], &args[1], &args[2])
        }
        "SPOP" => {
            let (key, count) = key_and_optional_count(rest, "SPOP")?;
            db.borrow_mut().spop(key, count)
        }
        "SRANDMEMBER" => {
            let (key, count) = key_and_optional_count(rest, "SRANDMEMBER")?;
            db.borrow().srandmember(key, count)
        }
        "SINTER" => db.borrow().sinter(rest),
        "SUNION" => db.borrow().sunion(rest),
        "SDIFF" => db.borrow().sdiff(rest),
        "SINTERSTORE" => {
            let (dst, keys) = key_and_rest(rest, "SINTERSTORE")?;
            db.borrow_mut().sinterstore(dst, keys)
        }
        "SUNIONSTORE" => {
            let (dst, keys) = key_and_rest(rest, "SUNIONSTORE")?;
            db.borrow_mut().sunionstore(dst, keys)
        }
        "SDIFFSTORE" => {
            let (dst, keys) = key_and_rest(rest, "SDIFFSTORE")?;
            db.borrow_mut().sdiffstore(dst, keys)
        }

        "LPUSH" => {
            let (key, values) = key_and_rest(rest, "LPUSH")?;
            db.borrow_mut().lpush(key, values)
        }
        "RPUSH" => {
            let (key, values) = key_and_rest(rest, "RPUSH")?;
            db.borrow_mut().rpush(key, values)
        }
        "LPUSHX" => {
            let (key, values) = key_and_rest(rest, "LPUSHX")?;
            db.borrow_mut().lpushx(key, values)
        }
        "RPUSHX" => {
            let (key, values) = key_and_rest(rest, "RPUSHX")?;
            db.borrow_mut().rpushx(key, values)
        }
        "LLEN" => db.borrow().llen(exact_one(rest, "LLEN")?),
        "LINDEX" => {
            let args = exact_n(rest, 2, "LINDEX")?;
            db.borrow().lindex(&args[0], parse_i64(&args[1])?)
        }
        "LSET" => {
            let args = exact_n(rest, 3, "LSET")?;
            db.borrow_mut().lset(&args[0], parse_i64(&args[1])?, &args[2])
        }
        "LINSERT" => {
            let args = exact_n(rest, 4, "LINSERT")?;
            db.borrow_mut().linsert(&args[0], parse_side(&args[1])?, &args[2], &args[3])
        }
        "LRANGE" => {
            let args = exact_n(rest, 3, "LRANGE")?;
            db.borrow().lrange(&args[0], parse_i64(&args[1])?, parse_i64(&args[2])?)
        }
        "LTRIM" => {
            let args = exact_n(rest, 3, "LTRIM")?;
            db.borrow_mut().ltrim(&args[0], parse_i64(&args[1])?, parse_i64(&args[2])?)
        }
        "LREM" => {
            let args = exact_n(rest, 3, "LREM")?;
            db.borrow_mut().lrem(&args[0], parse_i64(&args[1])?, &args[2])
        }
        "LPOP" => {
            let (key, count) = key_and_optional_count(rest, "LPOP")?;
            db.borrow_mut().lpop(key, count)
        }
        "RPOP" => {
            let (key, count) = key_and_optional_count(rest, "RPOP")?;
            db.borrow_mut().rpop(key, count)
        }
        "RPOPLPUSH" => {
            let args = exact_n(rest, 2, "RPOPLPUSH")?;
            db.borrow_mut().rpoplpush(&args[0], &args[1])
        }

        "BLPOP" => {
            let (keys, timeout) = keys_and_timeout(rest, "BLPOP")?;
            blocking_pop(db, keys, End::Head, timeout).await
        }
        "BRPOP" => {
            let (keys, timeout) = keys_and_timeout(rest, "BRPOP")?;
            blocking_pop(db, keys, End::Tail, timeout).await
        }
        "BRPOPLPUSH" => {
            let args = exact_n(rest, 3, "BRPOPLPUSH")?;
            let timeout = parse_timeout(&args[2])?;
            blocking_pop_push(db, args[0].clone(), args[1].clone(), timeout).await
        }

        other => Err(Error::Syntax(format!("unknown command '{other}'"))),
    }
}

async fn blocking_pop(db: &Rc<RefCell<Database>>, keys: Vec<Bytes>, end: End, timeout: Option<Duration>) -> Result<Reply> {
    let outcome = db.borrow_mut().blocking_pop(&keys, end, timeout)?;
    match outcome {
        BlockOutcome::Immediate { key, value } => Ok(Reply::Multi(vec![Reply::bulk(key), Reply::bulk(value)])),
        BlockOutcome::Blocked { rx, .. } => Ok(rx.await.unwrap_or(WakeReply::TimedOut).into_pair_reply()),
    }
}

async fn blocking_pop_push(db: &Rc<RefCell<Database>>, src: Bytes, dst: Bytes, timeout: Option<Duration>) -> Result<Reply> {
    let outcome = db.borrow_mut().blocking_pop_push(&src, &dst, timeout)?;
    match outcome {
        BlockOutcome::Immediate { value, .. } => Ok(Reply::bulk(value)),
        BlockOutcome::Blocked { rx, .. } => Ok(rx.await.unwrap_or(WakeReply::TimedOut).into_value_reply()),
    }
}

fn exact_n<'a>(args: &'a [Bytes], n: usize, name: &'static str) -> Result<&'a [Bytes]> {
    if args.len() == n {
        Ok(args)
    } else {
        Err(Error::Syntax(format!("{name}: wrong number of arguments")))
    }
}

fn exact_one<'a>(args: &'a [Bytes], name: &'static str) -> Result<&'a Bytes> {
    Ok(&exact_n(args, 1, name)?[0])
}

fn key_and_rest<'a>(args: &'a [Bytes], name: &'static str) -> Result<(&'a Bytes, &'a [Bytes])> {
    match args.split_first() {
        Some((key, rest)) if !rest.is_empty() => Ok((key, rest)),
        _ => Err(Error::Syntax(format!("{name}: wrong number of arguments"))),
    }
}

fn key_and_optional_count<'a>(args: &'a [Bytes], name: &'static str) -> Result<(&'a Bytes, Option<i64>)> {
    match args.len() {
        1 => Ok((&args[0], None)),
        2 => Ok((&args[0], Some(parse_i64(&args[1])?))),
        _ => Err(Error::Syntax(format!("{name}: wrong number of arguments"))),
    }
}

fn keys_and_timeout<'a>(args: &'a [Bytes], name: &'static str) -> Result<(Vec<Bytes>, Option<Duration>)> {
    match args.split_last() {
        Some((timeout_arg, keys)) if !keys.is_empty() => {
            let timeout = parse_timeout(timeout_arg)?;
            Ok((keys.to_vec(), timeout))
        }
        _ => Err(Error::Syntax(format!("{name}: wrong number of arguments"))),
    }
}

fn parse_i64(b: &Bytes) -> Result<i64> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Syntax("value is not an integer".to_string()))
}

fn parse_side(b: &Bytes) -> Result<Side> {
    match b.to_ascii_uppercase().as_slice() {
        b"BEFORE" => Ok(Side::Before),
        b"AFTER" => Ok(Side::After),
        _ => Err(Error::Syntax("side must be BEFORE or AFTER".to_string())),
    }
}

/// A timeout argument is seconds, `0` meaning "block forever".
fn parse_timeout(b: &Bytes) -> Result<Option<Duration>> {
    let secs: f64 = std::str::from_utf8(b).ok().and_then(|s| s.parse().ok()).ok_or(Error::BadTimeout)?;
    if secs < 0.0 || !secs.is_finite() {
        return Err(Error::BadTimeout);
    }
    if secs == 0.0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_secs_f64(secs)))
    }
}
