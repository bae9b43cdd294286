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

//! `SADD`, `SREM`, `SMOVE`, and the read-only and multi-key set algebra
//! commands (`SINTER`/`SUNION`/`SDIFF` and their `*STORE` forms).
//!
//! Missing-source handling: a key absent from the keyspace behaves like an
//! empty set. Intersecting with an empty set is always empty, so any
//! missing source short-circuits `SINTER*` to empty without even running
//! the algebra. `SUNION*` simply omits missing sources. `SDIFF*` treats a
//! missing base (the first key) as an empty accumulator -- also empty --
//! but still type-checks the remaining keys, so a `WRONGTYPE` among them
//! is reported even when the base is absent.

use bytes::Bytes;
use rand::Rng;

use warren_collections::{algebra, Elem, Set};
use warren_common::error::{Error, Result};

use crate::database::Database;
use crate::keyspace::Value;
use crate::reply::Reply;

fn reply_from_set(set: &Set) -> Reply {
    Reply::multi(set.iter().map(|e| e.as_object()).collect())
}

impl Database {
    pub fn sadd(&mut self, key: &Bytes, members: &[Bytes]) -> Result<Reply> {
        if let Some(v) = self.keyspace.lookup_read(key) {
            if v.as_set().is_none() {
                return Err(Error::WrongType);
            }
        }
        let set = self.keyspace.get_or_create_set(key);
        let mut added = 0i64;
        for m in members {
            if set.add(&self.config, Elem::from_object(m)) {
                added += 1;
            }
        }
        if added > 0 {
            self.keyspace.signal_modified(key);
        }
        warren_common::metrics::record_sadd(added as u64);
        Ok(Reply::Int(added))
    }

    pub fn srem(&mut self, key: &Bytes, members: &[Bytes]) -> Result<Reply> {
        let set = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_set_mut().ok_or(Error::WrongType)?,
            None => return Ok(Reply::Int(0)),
        };
        let mut removed = 0i64;
        for m in members {
            if set.remove(&Elem::from_object(m)) {
                removed += 1;
            }
        }
        if removed > 0 {
            self.keyspace.signal_modified(key);
            self.keyspace.delete_if_empty(key);
        }
        warren_common::metrics::record_srem(removed as u64);
        Ok(Reply::Int(removed))
    }

    pub fn sismember(&self, key: &Bytes, member: &Bytes) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) => {
                let set = v.as_set().ok_or(Error::WrongType)?;
                Ok(Reply::bool(set.contains(&Elem::from_object(member))))
            }
            None => Ok(Reply::bool(false)),
        }
    }

    pub fn scard(&self, key: &Bytes) -> Result<Reply> {
        match self.keyspace.lookup_read(key) {
            Some(v) => Ok(Reply::Int(v.as_set().ok_or(Error::WrongType)?.len() as i64)),
            None => Ok(Reply::Int(0)),
        }
    }

    /// `SMOVE src dst member`: remove from `src`, and only if that
    /// succeeded, add to `dst` (creating it if missing). `dst`'s type is
    /// checked before touching `src` so a `WRONGTYPE` at the destination
    /// never leaves `src` mutated.
    pub fn smove(&mut self, src: &Bytes, dst: &Bytes, member: &Bytes) -> Result<Reply> {
        if let Some(v) = self.keyspace.lookup_read(dst) {
            if v.as_set().is_none() {
                return Err(Error::WrongType);
            }
        }
        let removed = match self.keyspace.lookup_write(src) {
            Some(v) => {
                let set = v.as_set_mut().ok_or(Error::WrongType)?;
                set.remove(&Elem::from_object(member))
            }
            None => false,
        };
        if !removed {
            return Ok(Reply::bool(false));
        }
        self.keyspace.signal_modified(src);
        self.keyspace.delete_if_empty(src);
        self.keyspace.get_or_create_set(dst).add(&self.config, Elem::from_object(member));
        self.keyspace.signal_modified(dst);
        Ok(Reply::bool(true))
    }

    pub fn spop(&mut self, key: &Bytes, count: Option<i64>) -> Result<Reply> {
        let set = match self.keyspace.lookup_write(key) {
            Some(v) => v.as_set_mut().ok_or(Error::WrongType)?,
            None => {
                return Ok(match count {
                    Some(_) => Reply::Multi(vec![]),
                    None => Reply::nil(),
                });
            }
        };
        match count {
            None => {
                let Some(elem) = set.random_elem() else {
                    return Ok(Reply::nil());
                };
                let obj = elem.as_object();
                set.remove(&Elem::from_object(&obj));
                self.keyspace.signal_modified(key);
                self.keyspace.delete_if_empty(key);
                Ok(Reply::bulk(obj))
            }
            Some(n) if n <= 0 => Ok(Reply::Multi(vec![])),
            Some(n) => {
                let n = (n as usize).min(set.len());
                let mut popped = Vec::with_capacity(n);
                for _ in 0..n {
                    let elem = set.random_elem().expect("cardinality checked above");
                    let obj = elem.as_object();
                    set.remove(&Elem::from_object(&obj));
                    popped.push(obj);
                }
                if !popped.is_empty() {
                    self.keyspace.signal_modified(key);
                    self.keyspace.delete_if_empty(key);
                }
                Ok(Reply::multi(popped))
            }
        }
    }

    pub fn srandmember(&self, key: &Bytes, count: Option<i64>) -> Result<Reply> {
        let set = match self.keyspace.lookup_read(key) {
            Some(v) => v.as_set().ok_or(Error::WrongType)?,
            None => {
                return Ok(match count {
                    Some(_) => Reply::Multi(vec![]),
                    None => Reply::nil(),
                });
            }
        };
        match count {
            None => Ok(set.random_elem().map(|e| Reply::bulk(e.as_object())).unwrap_or_else(Reply::nil)),
            Some(0) => Ok(Reply::Multi(vec![])),
            Some(n) if n > 0 => {
                let take = (n as usize).min(set.len());
                let mut all: Vec<Bytes> = set.iter().map(|e| e.as_object()).collect();
                let mut rng = rand::thread_rng();
                for i in 0..take {
                    let j = rng.gen_range(i..all.len());
                    all.swap(i, j);
                }
                all.truncate(take);
                Ok(Reply::multi(all))
            }
            Some(n) => {
                let want = (-n) as usize;
                let mut picked = Vec::with_capacity(want);
                for _ in 0..want {
                    if let Some(e) = set.random_elem() {
                        picked.push(e.as_object());
                    }
                }
                Ok(Reply::multi(picked))
            }
        }
    }

    fn collect_present_sets<'a>(&'a self, keys: &[Bytes]) -> Result<Vec<&'a Set>> {
        let mut out = Vec::with_capacity(keys.len());
        for k in keys {
            if let Some(v) = self.keyspace.lookup_read(k) {
                out.push(v.as_set().ok_or(Error::WrongType)?);
            }
        }
        Ok(out)
    }

    fn inter_result(&self, keys: &[Bytes]) -> Result<Set> {
        let sets = self.collect_present_sets(keys)?;
        if sets.len() != keys.len() {
            return Ok(Set::empty_int());
        }
        Ok(algebra::intersect(&self.config, &sets))
    }

    fn union_result(&self, keys: &[Bytes]) -> Result<Set> {
        let sets = self.collect_present_sets(keys)?;
        Ok(algebra::union(&self.config, &sets))
    }

    fn diff_result(&self, keys: &[Bytes]) -> Result<Set> {
        let Some((first, rest)) = keys.split_first() else {
            return Ok(Set::empty_int());
        };
        let first_set = match self.keyspace.lookup_read(first) {
            Some(v) => Some(v.as_set().ok_or(Error::WrongType)?),
            None => None,
        };
        let rest_sets = self.collect_present_sets(rest)?;
        match first_set {
            None => Ok(Set::empty_int()),
            Some(base) => {
                let mut all = Vec::with_capacity(1 + rest_sets.len());
                all.push(base);
                all.extend(rest_sets);
                Ok(algebra::difference(&self.config, &all))
            }
        }
    }

    pub fn sinter(&self, keys: &[Bytes]) -> Result<Reply> {
        Ok(reply_from_set(&self.inter_result(keys)?))
    }

    pub fn sunion(&self, keys: &[Bytes]) -> Result<Reply> {
        Ok(reply_from_set(&self.union_result(keys)?))
    }

    pub fn sdiff(&self, keys: &[Bytes]) -> Result<Reply> {
        Ok(reply_from_set(&self.diff_result(keys)?))
    }

    /// Install an algebra result at `dst`, deferred until the computed set
    /// is fully in hand -- never aliased with a source during iteration.
    /// An empty result deletes `dst` rather than leaving an empty set
    /// behind, consistent with the "no empty collections" invariant.
    fn install_algebra_result(&mut self, dst: &Bytes, result: Set) -> Result<Reply> {
        let card = result.len() as i64;
        if result.is_empty() {
            self.keyspace.delete(dst);
        } else {
            self.keyspace.add(dst.clone(), Value::Set(result));
        }
        self.keyspace.signal_modified(dst);
        Ok(Reply::Int(card))
    }

    pub fn sinterstore(&mut self, dst: &Bytes, keys: &[Bytes]) -> Result<Reply> {
        let result = self.inter_result(keys)?;
        self.install_algebra_result(dst, result)
    }

    pub fn sunionstore(&mut self, dst: &Bytes, keys: &[Bytes]) -> Result<Reply> {
        let result = self.union_result(keys)?;
        self.install_algebra_result(dst, result)
    }

    pub fn sdiffstore(&mut self, dst: &Bytes, keys: &[Bytes]) -> Result<Reply> {
        let result = self.diff_result(keys)?;
        self.install_algebra_result(dst, result)
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
    fn sadd_reports_only_newly_inserted_members() {
        let mut d = db();
        let k = Bytes::from_static(b"s");
        assert_eq!(d.sadd(&k, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap(), Reply::Int(2));
        assert_eq!(d.sadd(&k, &[Bytes::from_static(b"b"), Bytes::from_static(b"c")]).unwrap(), Reply::Int(1));
        assert_eq!(d.scard(&k).unwrap(), Reply::Int(3));
    }

    #[test]
    fn srem_deletes_the_key_once_the_set_empties() {
        let mut d = db();
        let k = Bytes::from_static(b"s");
        d.sadd(&k, &[Bytes::from_static(b"a")]).unwrap();
        assert_eq!(d.srem(&k, &[Bytes::from_static(b"a")]).unwrap(), Reply::Int(1));
        assert_eq!(d.scard(&k).unwrap(), Reply::Int(0));
        assert!(!d.keyspace.exists(b"s"));
    }

    #[test]
    fn smove_moves_a_member_between_sets() {
        let mut d = db();
        let src = Bytes::from_static(b"src");
        let dst = Bytes::from_static(b"dst");
        d.sadd(&src, &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]).unwrap();
        assert_eq!(d.smove(&src, &dst, &Bytes::from_static(b"a")).unwrap(), Reply::bool(true));
        assert_eq!(d.sismember(&src, &Bytes::from_static(b"a")).unwrap(), Reply::bool(false));
        assert_eq!(d.sismember(&dst, &Bytes::from_static(b"a")).unwrap(), Reply::bool(true));
        assert_eq!(d.smove(&src, &dst, &Bytes::from_static(b"zzz")).unwrap(), Reply::bool(false));
    }

    #[test]
    fn sinter_is_empty_when_any_source_is_missing() {
        let mut d = db();
        d.sadd(&Bytes::from_static(b"a"), &[Bytes::from_static(b"1")]).unwrap();
        let result = d.sinter(&[Bytes::from_static(b"a"), Bytes::from_static(b"missing")]).unwrap();
        assert_eq!(result, Reply::Multi(vec![]));
    }

    #[test]
    fn sunionstore_deletes_destination_when_result_is_empty() {
        let mut d = db();
        let dst = Bytes::from_static(b"dst");
        d.sadd(&dst, &[Bytes::from_static(b"stale")]).unwrap();
        assert_eq!(d.sunionstore(&dst, &[]).unwrap(), Reply::Int(0));
        assert!(!d.keyspace.exists(b"dst"));
    }

    #[test]
    fn sdiff_type_checks_later_keys_even_when_base_is_missing() {
        let mut d = db();
        d.keyspace.add(Bytes::from_static(b"alist"), Value::List(warren_collections::List::new()));
        let err = d
            .sdiff(&[Bytes::from_static(b"missing"), Bytes::from_static(b"alist")])
            .unwrap_err();
        assert!(matches!(err, Error::WrongType));
    }
}
