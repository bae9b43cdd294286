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

//! Cross-module behavior that doesn't belong inside a single file's unit
//! tests: algebra over sets that straddle both encodings, and the
//! blocking table wired up the way `warren`'s push path actually uses it
//! (pop the oldest waiter, then hand it the pushed element directly
//! instead of landing it in the list).

use bytes::Bytes;
use warren_collections::blocking::BlockingTable;
use warren_collections::list::{End, List};
use warren_collections::{algebra, Elem, Set};
use warren_common::config::EngineConfig;

fn cfg() -> EngineConfig {
    EngineConfig {
        set_max_intset_entries: 2,
        ..Default::default()
    }
}

#[test]
fn intersection_across_a_promoted_and_an_unpromoted_set() {
    let c = cfg();

    let mut a = Set::empty_int();
    a.add(&c, Elem::from_integer(1));
    a.add(&c, Elem::from_integer(2));
    a.add(&c, Elem::from_bytes(b"3")); // forces promotion to HASH

    let mut b = Set::empty_int();
    b.add(&c, Elem::from_integer(2));
    b.add(&c, Elem::from_integer(3));
    b.add(&c, Elem::from_integer(4));

    assert!(!a.is_int_encoded());
    assert!(b.is_int_encoded());

    let inter = algebra::intersect(&c, &[&a, &b]);
    let mut members: Vec<i64> = inter.iter().map(|e| e.as_integer().unwrap()).collect();
    members.sort();
    assert_eq!(members, vec![2, 3]);
}

#[test]
fn a_push_that_has_a_waiter_never_lands_in_the_list() {
    let c = cfg();
    let key = Bytes::from_static(b"k");

    let mut blocking = BlockingTable::new();
    let mut list = List::new();

    let waiter = blocking.block(vec![key.clone()], None, None);

    // Simulate the push path: try-deliver runs before the push commits.
    let delivered = match blocking.pop_waiter(&key) {
        Some((id, _info)) => {
            assert_eq!(id, waiter);
            Some(Elem::from_bytes(b"hello").as_object())
        }
        None => {
            list.push(&c, Elem::from_bytes(b"hello"), End::Tail);
            None
        }
    };

    assert_eq!(delivered, Some(Bytes::from_static(b"hello")));
    assert_eq!(list.len(), 0, "element handed off to the waiter, never stored");
    assert!(blocking.is_empty());
}

#[test]
fn a_push_with_no_waiter_lands_in_the_list_normally() {
    let c = cfg();
    let key = Bytes::from_static(b"k");
    let mut blocking = BlockingTable::new();
    let mut list = List::new();

    assert!(blocking.pop_waiter(&key).is_none());
    list.push(&c, Elem::from_bytes(b"hello"), End::Tail);

    assert_eq!(list.len(), 1);
    assert_eq!(list.index(0).unwrap(), Bytes::from_static(b"hello"));
}
