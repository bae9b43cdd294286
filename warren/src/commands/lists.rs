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

//! `LPUSH`/`RPUSH` and their `X` guarded variants, element access
//! (`LINDEX`/`LSET`/`LINSERT`), range operations (`LRANGE`/`LTRIM`/`LREM`),
//! pop commands, and the non-blocking `RPOPLPUSH`. The blocking siblings
//! (`BLPOP`/`BRPOP`/`BRPOPLPUSH`) live in `commands::blocking`.

use bytes::Bytes;

use warren_collections::list::{End, Side};
use warren_collections::{Elem, List};
use warren_common::error::{Error, Result};

use crate::database::Database;
use crate::keyspace::Value;
use crate::reply::Reply;

impl Database {
    pub fn lpush(&mut self, key: &Bytes, values: &[Bytes]) -> Result<Reply> {
        self.push_many(key, values, End::Head)
    }

    pub fn rpush(&mut self, key: &Bytes, values: &[Bytes]) -> Result<Reply> {
        self.push_many(key, values, End::Tail)
    }

    pub fn lpushx(&mut self, key: &Bytes, values: &[Bytes]) -> Result<Reply> {
        self.push_many_guarded(key, values, End::Head)
    }

    pub fn rpushx(&mut self, key: &Bytes, values: &[Bytes]) -> Result<Reply> {
        self.push_many_guarded(key, values, End::Tail)
    }

    fn push_many_guarded(&mut self, key: &Bytes, values: &[Bytes], end: End) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) if v.as_list().is_some() => self.push_many(key, values, end),
            Some(_) => Err(Error::WrongType),
            None => Ok(Reply::Int(0)),
        }
    }

    /// Pushes one value at a time so each gets a chance to satisfy a
    /// waiter parked on `key` before it would otherwise land in the list
    /// (see `Database::try_deliver`).
    fn push_many(&mut self, key: &Bytes, values: &[Bytes], end: End) -> Result<Reply> {
        if let Some(v) = self.keyspace.lookup_read(key) {
            if v.as_list().is_none() {
                return Err(Error::WrongType);
            }
        }
        let mut landed = false;
        for value in values {
            let elem = Elem::from_object(value);
            if self.try_deliver(key, &elem) {
                continue;
            }
            self.keyspace.get_or_create_list(key).push(&self.config, elem, end);
            landed = true;
        }
        if landed {
            self.keyspace.signal_modified(key);
        }
        let len = self.keyspace.lookup_read(key).and_then(Value::as_list).map(List::len).unwrap_or(0);
        Ok(Reply::Int(len as i64))
    }

    pub fn llen(&self, key: &Bytes) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) => Ok(Reply::Int(v.as_list().ok_or(Error::WrongType)?.len() as i64)),
            None => Ok(Reply::Int(0)),
        }
    }

    pub fn lindex(&self, key: &Bytes, index: i64) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) => {
                let list = v.as_list().ok_or(Error::WrongType)?;
                Ok(list.index(index).map(Reply::bulk).unwrap_or_else(Reply::nil))
            }
            None => Ok(Reply::nil()),
        }
    }

    pub fn lset(&mut self, key: &Bytes, index: i64, value: &Bytes) -> Result<Reply> {
        let list = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?,
            None => return Err(Error::NoSuchKey),
        };
        list.set(&self.config, index, Elem::from_object(value))?;
        self.keyspace.signal_modified(key);
        Ok(Reply::Ok)
    }

    /// `LINSERT key BEFORE|AFTER pivot value`. `0` if `key` doesn't exist,
    /// `-1` if the pivot wasn't found, otherwise the list's new length.
    pub fn linsert(&mut self, key: &Bytes, side: Side, pivot: &Bytes, value: &Bytes) -> Result<Reply> {
        let list = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?,
            None => return Ok(Reply::Int(0)),
        };
        let inserted = list.insert_relative(&self.config, &Elem::from_object(pivot), Elem::from_object(value), side);
        if !inserted {
            return Ok(Reply::Int(-1));
        }
        let len = list.len() as i64;
        self.keyspace.signal_modified(key);
        Ok(Reply::Int(len))
    }

    pub fn lrange(&self, key: &Bytes, start: i64, end: i64) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) => {
                let list = v.as_list().ok_or(Error::WrongType)?;
                Ok(Reply::multi(list.range(start, end)))
            }
            None => Ok(Reply::Multi(vec![])),
        }
    }

    pub fn ltrim(&mut self, key: &Bytes, start: i64, end: i64) -> Result<Reply> {
        let list = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?,
            None => return Ok(Reply::Ok),
        };
        list.trim(start, end);
        self.keyspace.signal_modified(key);
        self.keyspace.delete_if_empty(key);
        Ok(Reply::Ok)
    }

    pub fn lrem(&mut self, key: &Bytes, count: i64, value: &Bytes) -> Result<Reply> {
        let list = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?,
            None => return Ok(Reply::Int(0)),
        };
        let removed = list.remove(count, &Elem::from_object(value));
        if removed > 0 {
            self.keyspace.signal_modified(key);
            self.keyspace.delete_if_empty(key);
        }
        Ok(Reply::Int(removed as i64))
    }

    pub fn lpop(&mut self, key: &Bytes, count: Option<i64>) -> Result<Reply> {
        self.pop_many(key, End::Head, count)
    }

    pub fn rpop(&mut self, key: &Bytes, count: Option<i64>) -> Result<Reply> {
        self.pop_many(key, End::Tail, count)
    }

    fn pop_many(&mut self, key: &Bytes, end: End, count: Option<i64>) -> Result<Reply> {
        let list = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?,
            None => {
                return Ok(match count {
                    Some(_) => Reply::Multi(vec![]),
                    None => Reply::nil(),
                });
            }
        };
        match count {
            None => {
                let popped = list.pop(end);
                if popped.is_some() {
                    self.keyspace.signal_modified(key);
                }
                self.keyspace.delete_if_empty(key);
                Ok(popped.map(Reply::bulk).unwrap_or_else(Reply::nil))
            }
            Some(n) if n <= 0 => Ok(Reply::Multi(vec![])),
            Some(n) => {
                let mut popped = Vec::new();
                for _ in 0..n {
                    match list.pop(end) {
                        Some(v) => popped.push(v),
                        None => break,
                    }
                }
                if !popped.is_empty() {
                    self.keyspace.signal_modified(key);
                }
                self.keyspace.delete_if_empty(key);
                Ok(Reply::multi(popped))
            }
        }
    }

    /// Non-blocking `RPOPLPUSH`. `dst`'s type is checked before `src` is
    /// touched, same ordering discipline as `SMOVE`.
    pub fn rpoplpush(&mut self, src: &Bytes, dst: &Bytes) -> Result<Reply> {
        if let Some(v) = self.keyspace.lookup_read(dst) {
            if v.as_list().is_none() {
                return Err(Error::WrongType);
            }
        }
        let value = match self.keyspace.lookup_write(src) {
            Some(v) => v.as_list_mut().ok_or(Error::WrongType)?.pop(End::Tail),
            None => None,
        };
        let Some(value) = value else {
            return Ok(Reply::nil());
        };
        self.keyspace.signal_modified(src);
        self.keyspace.delete_if_empty(src);
        self.keyspace
            .get_or_create_list(dst)
            .push(&self.config, Elem::from_object(&value), End::Head);
        self.keyspace.signal_modified(dst);
        Ok(Reply::bulk(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_common::config::EngineConfig;

    fn db() -> Database {
        Database::new(EngineConfig::default())
    }

    #[test]
    fn lpush_rpush_and_range() {
        let mut d = db();
        let k = Bytes::from_static(b"l");
        d.rpush(&k, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        d.lpush(&k, &[Bytes::from_static(b"z")]).unwrap();
        assert_eq!(
            d.lrange(&k, 0, -1).unwrap(),
            Reply::multi(vec![Bytes::from_static(b"z"), Bytes::from_static(b"a"), Bytes::from_static(b"b")])
        );
    }

    #[test]
    fn pushx_is_a_noop_when_key_is_absent() {
        let mut d = db();
        let k = Bytes::from_static(b"l");
        assert_eq!(d.lpushx(&k, &[Bytes::from_static(b"a")]).unwrap(), Reply::Int(0));
        assert!(!d.keyspace.exists(b"l"));
    }

    #[test]
    fn linsert_reports_pivot_not_found_as_negative_one() {
        let mut d = db();
        let k = Bytes::from_static(b"l");
        d.rpush(&k, &[Bytes::from_static(b"a")]).unwrap();
        assert_eq!(
            d.linsert(&k, Side::Before, &Bytes::from_static(b"zzz"), &Bytes::from_static(b"x")).unwrap(),
            Reply::Int(-1)
        );
    }

    #[test]
    fn lpop_with_count_removes_from_the_head() {
        let mut d = db();
        let k = Bytes::from_static(b"l");
        d.rpush(&k, &[Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"c")])
            .unwrap();
        assert_eq!(
            d.lpop(&k, Some(2)).unwrap(),
            Reply::multi(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")])
        );
        assert_eq!(d.llen(&k).unwrap(), Reply::Int(1));
    }

    #[test]
    fn rpoplpush_moves_the_tail_element_to_the_destination_head() {
        let mut d = db();
        let src = Bytes::from_static(b"src");
        let dst = Bytes::from_static(b"dst");
        d.rpush(&src, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        assert_eq!(d.rpoplpush(&src, &dst).unwrap(), Reply::bulk(Bytes::from_static(b"b")));
        assert_eq!(d.lrange(&dst, 0, -1).unwrap(), Reply::multi(vec![Bytes::from_static(b"b")]));
    }

    #[test]
    fn emptied_list_is_deleted() {
        let mut d = db();
        let k = Bytes::from_static(b"l");
        d.rpush(&k, &[Bytes::from_static(b"a")]).unwrap();
        d.lpop(&k, None).unwrap();
        assert!(!d.keyspace.exists(b"l"));
    }
}
