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

//! The Set container (component B): unordered unique elements with two
//! interchangeable encodings, INT (a sorted packed array of `i64`) and
//! HASH (a hash table of byte strings), promoting one-way from the
//! former to the latter.

use ahash::RandomState;
use bytes::Bytes;
use hashbrown::HashSet as HashbrownSet;
use rand::Rng;
use warren_common::config::EngineConfig;

use crate::elem::Elem;

/// A set container. Starts `Int`-encoded and promotes to `Hash` either
/// when a non-integer element is added or when cardinality exceeds
/// `set_max_intset_entries`. Promotion is one-way: a `Hash`-encoded set is
/// never demoted back to `Int`, even if every byte element is removed.
#[derive(Debug)]
pub enum Set {
    Int(Vec<i64>),
    Hash(HashbrownSet<Bytes, RandomState>),
}

impl Set {
    /// `create-for(value)`: INT if the seed value is integer-encodable,
    /// else HASH.
    pub fn create_for(value: &Elem<'_>) -> Self {
        match value.as_integer() {
            Some(i) => Set::Int(vec![i]),
            None => {
                let mut h = HashbrownSet::with_capacity_and_hasher(1, RandomState::default());
                h.insert(value.as_object());
                Set::Hash(h)
            }
        }
    }

    pub fn empty_int() -> Self {
        Set::Int(Vec::new())
    }

    pub fn is_int_encoded(&self) -> bool {
        matches!(self, Set::Int(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Set::Int(v) => v.len(),
            Set::Hash(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Add(literal) -> bool inserted`, including automatic promotion.
    pub fn add(&mut self, config: &EngineConfig, literal: Elem<'_>) -> bool {
        match self {
            Set::Int(ints) => match literal.as_integer() {
                Some(i) => {
                    let inserted = insert_sorted(ints, i);
                    if inserted && ints.len() > config.set_max_intset_entries {
                        self.convert_to_hash();
                    }
                    inserted
                }
                None => {
                    self.convert_to_hash();
                    let inserted = self.add(config, literal);
                    debug_assert!(inserted, "a fresh HASH promotion can never collide");
                    inserted
                }
            },
            Set::Hash(h) => h.insert(literal.as_object()),
        }
    }

    /// `Remove(literal) -> bool removed`.
    pub fn remove(&mut self, literal: &Elem<'_>) -> bool {
        match self {
            Set::Int(ints) => match literal.as_integer() {
                Some(i) => remove_sorted(ints, i),
                None => false,
            },
            Set::Hash(h) => h.remove(literal.bytes_view().as_ref()),
        }
    }

    /// `Find(literal) -> bool`.
    pub fn contains(&self, literal: &Elem<'_>) -> bool {
        match self {
            Set::Int(ints) => match literal.as_integer() {
                Some(i) => ints.binary_search(&i).is_ok(),
                None => false,
            },
            Set::Hash(h) => h.contains(literal.bytes_view().as_ref()),
        }
    }

    /// A uniformly random element for `Int`; a bucket-sampled (and
    /// documented as slightly non-uniform) element for `Hash`.
    pub fn random_elem(&self) -> Option<Elem<'_>> {
        if self.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        match self {
            Set::Int(ints) => {
                let idx = rng.gen_range(0..ints.len());
                Some(Elem::from_integer(ints[idx]))
            }
            Set::Hash(h) => {
                let idx = rng.gen_range(0..h.len());
                h.iter().nth(idx).map(|b| Elem::from_bytes(b.as_ref()))
            }
        }
    }

    pub fn iter(&self) -> SetIter<'_> {
        match self {
            Set::Int(ints) => SetIter::Int(ints.iter()),
            Set::Hash(h) => SetIter::Hash(h.iter()),
        }
    }

    /// `Convert(target=HASH)`: presize and stream elements across,
    /// replacing storage atomically from the caller's point of view (no
    /// intermediate state is observable between the old and new encoding).
    pub fn convert_to_hash(&mut self) {
        if let Set::Int(ints) = self {
            let mut h = HashbrownSet::with_capacity_and_hasher(ints.len(), RandomState::default());
            for i in ints.iter() {
                h.insert(Bytes::from(i.to_string().into_bytes()));
            }
            warren_common::metrics::record_promotion("set");
            tracing::debug!(cardinality = ints.len(), "set promoted from INT to HASH encoding");
            *self = Set::Hash(h);
        }
    }
}

pub enum SetIter<'a> {
    Int(std::slice::Iter<'a, i64>),
    Hash(hashbrown::hash_set::Iter<'a, Bytes>),
}

impl<'a> Iterator for SetIter<'a> {
    type Item = Elem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SetIter::Int(it) => it.next().map(|i| Elem::from_integer(*i)),
            SetIter::Hash(it) => it.next().map(|b| Elem::from_bytes(b.as_ref())),
        }
    }
}

fn insert_sorted(v: &mut Vec<i64>, x: i64) -> bool {
    match v.binary_search(&x) {
        Ok(_) => false,
        Err(pos) => {
            v.insert(pos, x);
            true
        }
    }
}

fn remove_sorted(v: &mut Vec<i64>, x: i64) -> bool {
    match v.binary_search(&x) {
        Ok(pos) => {
            v.remove(pos);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig {
            set_max_intset_entries: 4,
            ..Default::default()
        }
    }

    #[test]
    fn add_and_remove_int_encoded() {
        let mut s = Set::empty_int();
        let c = cfg();
        assert!(s.add(&c, Elem::from_integer(1)));
        assert!(s.add(&c, Elem::from_integer(2)));
        assert!(!s.add(&c, Elem::from_integer(1)));
        assert!(s.is_int_encoded());
        assert_eq!(s.len(), 2);

        assert!(s.contains(&Elem::from_integer(2)));
        assert!(s.remove(&Elem::from_integer(2)));
        assert!(!s.contains(&Elem::from_integer(2)));
    }

    #[test]
    fn non_integer_promotes_to_hash() {
        let mut s = Set::empty_int();
        let c = cfg();
        s.add(&c, Elem::from_integer(1));
        s.add(&c, Elem::from_integer(2));
        assert!(s.add(&c, Elem::from_bytes(b"x")));
        assert!(!s.is_int_encoded());
        assert_eq!(s.len(), 3);
        assert!(s.contains(&Elem::from_integer(1)));
        assert!(s.contains(&Elem::from_bytes(b"x")));
    }

    #[test_log::test]
    fn cardinality_promotes_to_hash() {
        let mut s = Set::empty_int();
        let c = cfg();
        for i in 0..=c.set_max_intset_entries as i64 {
            s.add(&c, Elem::from_integer(i));
        }
        assert!(!s.is_int_encoded());
        assert_eq!(s.len(), c.set_max_intset_entries + 1);
    }

    #[test]
    fn promotion_is_one_way() {
        let mut s = Set::empty_int();
        let c = cfg();
        s.add(&c, Elem::from_bytes(b"x"));
        assert!(!s.is_int_encoded());
        s.remove(&Elem::from_bytes(b"x"));
        assert_eq!(s.len(), 0);
        assert!(!s.is_int_encoded(), "removing all bytes must not demote back to INT");
    }

    #[test]
    fn mixed_equality_on_remove() {
        let mut s = Set::empty_int();
        let c = cfg();
        s.add(&c, Elem::from_bytes(b"42"));
        assert!(!s.is_int_encoded());
        assert!(s.remove(&Elem::from_integer(42)));
    }

    #[test]
    fn iter_yields_every_element_once() {
        let mut s = Set::empty_int();
        let c = cfg();
        for i in 0..3 {
            s.add(&c, Elem::from_integer(i));
        }
        let mut seen: Vec<i64> = s.iter().map(|e| e.as_integer().unwrap()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
