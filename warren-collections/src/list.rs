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

//! The List container (component C): an ordered sequence allowing
//! duplicates, with two interchangeable encodings, `Zip` (a compact
//! packed array of inline integers or short byte slices) and `Linked` (a
//! genuine doubly-linked list of shared value objects), promoting one-way
//! from the former to the latter.

use std::borrow::Cow;
use std::collections::LinkedList;

use bytes::Bytes;
use warren_common::config::EngineConfig;
use warren_common::error::{Error, Result};

use crate::elem::Elem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Head,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// An entry in the `Zip` encoding: either an inline integer or an owned
/// short byte string, mirroring the packed representation's two physical
/// shapes.
#[derive(Debug, Clone)]
enum ZipEntry {
    Int(i64),
    Bytes(Bytes),
}

impl ZipEntry {
    fn from_elem(e: &Elem<'_>) -> Self {
        match e.as_integer() {
            Some(i) => ZipEntry::Int(i),
            None => ZipEntry::Bytes(e.as_object()),
        }
    }

    fn to_bytes(&self) -> Bytes {
        match self {
            ZipEntry::Int(i) => Bytes::from(i.to_string().into_bytes()),
            ZipEntry::Bytes(b) => b.clone(),
        }
    }

    fn view(&self) -> Cow<'_, [u8]> {
        match self {
            ZipEntry::Int(i) => Cow::Owned(i.to_string().into_bytes()),
            ZipEntry::Bytes(b) => Cow::Borrowed(b.as_ref()),
        }
    }

    /// Length as it would count against `list-max-ziplist-value`: inline
    /// integers never trigger the byte-length promotion trigger.
    fn raw_byte_len(&self) -> Option<usize> {
        match self {
            ZipEntry::Int(_) => None,
            ZipEntry::Bytes(b) => Some(b.len()),
        }
    }
}

#[derive(Debug)]
pub enum List {
    Zip(Vec<ZipEntry>),
    Linked(LinkedList<Bytes>),
}

impl List {
    pub fn new() -> Self {
        List::Zip(Vec::new())
    }

    pub fn is_zip_encoded(&self) -> bool {
        matches!(self, List::Zip(_))
    }

    pub fn len(&self) -> usize {
        match self {
            List::Zip(v) => v.len(),
            List::Linked(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `check_entries` gates the length-threshold trigger: it only applies
    /// to operations that actually grow the list (`Push`, `Insert-relative`).
    /// `Set` replaces an element in place -- cardinality is unchanged -- so
    /// it must evaluate the byte-length trigger alone, per spec.md §4.C:
    /// "size is unchanged but a long value on ZIP may force promotion".
    fn would_promote(&self, config: &EngineConfig, incoming: Option<&Elem<'_>>, check_entries: bool) -> bool {
        match self {
            List::Linked(_) => false,
            List::Zip(v) => {
                if check_entries && v.len() >= config.list_max_ziplist_entries {
                    return true;
                }
                if let Some(e) = incoming {
                    if e.as_integer().is_none() && e.len() > config.list_max_ziplist_value {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn maybe_promote(&mut self, config: &EngineConfig, incoming: Option<&Elem<'_>>) {
        if self.would_promote(config, incoming, true) {
            self.convert_to_linked();
        }
    }

    /// Promotion check for `Set`: byte-length trigger only, never the
    /// entries-count one, since `Set` never changes the list's length.
    fn maybe_promote_for_set(&mut self, config: &EngineConfig, incoming: &Elem<'_>) {
        if self.would_promote(config, Some(incoming), false) {
            self.convert_to_linked();
        }
    }

    /// `Convert(target=LINKED)`: stream the current contents into a fresh
    /// doubly-linked list, replacing storage atomically from the caller's
    /// point of view.
    pub fn convert_to_linked(&mut self) {
        if let List::Zip(v) = self {
            let linked: LinkedList<Bytes> = v.iter().map(ZipEntry::to_bytes).collect();
            warren_common::metrics::record_promotion("list");
            tracing::debug!(len = linked.len(), "list promoted from ZIP to LINKED encoding");
            *self = List::Linked(linked);
        }
    }

    /// `Push(value, end)`.
    pub fn push(&mut self, config: &EngineConfig, value: Elem<'_>, end: End) {
        self.maybe_promote(config, Some(&value));
        match self {
            List::Zip(v) => {
                let entry = ZipEntry::from_elem(&value);
                match end {
                    End::Head => v.insert(0, entry),
                    End::Tail => v.push(entry),
                }
            }
            List::Linked(l) => {
                let b = value.as_object();
                match end {
                    End::Head => l.push_front(b),
                    End::Tail => l.push_back(b),
                }
            }
        }
    }

    /// `Pop(end) -> option<value-object>`.
    pub fn pop(&mut self, end: End) -> Option<Bytes> {
        match self {
            List::Zip(v) => {
                if v.is_empty() {
                    return None;
                }
                let entry = match end {
                    End::Head => v.remove(0),
                    End::Tail => v.pop().unwrap(),
                };
                Some(entry.to_bytes())
            }
            List::Linked(l) => match end {
                End::Head => l.pop_front(),
                End::Tail => l.pop_back(),
            },
        }
    }

    fn normalize_index(&self, i: i64) -> Option<usize> {
        let len = self.len() as i64;
        let idx = if i < 0 { len + i } else { i };
        if idx < 0 || idx >= len {
            None
        } else {
            Some(idx as usize)
        }
    }

    /// `Index(i) -> option<value>`, negative indices counting from the
    /// tail. O(n) on `Zip`, O(min(i, n-i)) on `Linked`.
    pub fn index(&self, i: i64) -> Option<Bytes> {
        let idx = self.normalize_index(i)?;
        match self {
            List::Zip(v) => v.get(idx).map(ZipEntry::to_bytes),
            List::Linked(l) => linked_get(l, idx).cloned(),
        }
    }

    /// `Set(i, value)`.
    pub fn set(&mut self, config: &EngineConfig, i: i64, value: Elem<'_>) -> Result<()> {
        let idx = self.normalize_index(i).ok_or(Error::OutOfRange)?;
        self.maybe_promote_for_set(config, &value);
        let idx = self.normalize_index(i).ok_or(Error::OutOfRange)?;
        match self {
            List::Zip(v) => v[idx] = ZipEntry::from_elem(&value),
            List::Linked(l) => {
                if let Some(slot) = linked_get_mut(l, idx) {
                    *slot = value.as_object();
                }
            }
        }
        Ok(())
    }

    /// `Insert-relative(pivot, value, side)`. Returns `Ok(true)` if the
    /// pivot was found and the insert performed, `Ok(false)` if the list
    /// exists but the pivot was not found (the "pivot not found" sentinel
    /// is a caller-level -1 reply, not an `Error` here).
    pub fn insert_relative(
        &mut self,
        config: &EngineConfig,
        pivot: &Elem<'_>,
        value: Elem<'_>,
        side: Side,
    ) -> bool {
        let found_at = match self {
            List::Zip(v) => v.iter().position(|e| elem_eq_view(pivot, &e.view())),
            List::Linked(l) => l.iter().position(|b| elem_eq_view(pivot, &Cow::Borrowed(b.as_ref()))),
        };
        let Some(pos) = found_at else {
            return false;
        };
        let at = match side {
            Side::Before => pos,
            Side::After => pos + 1,
        };
        self.maybe_promote(config, Some(&value));
        match self {
            List::Zip(v) => v.insert(at, ZipEntry::from_elem(&value)),
            List::Linked(l) => {
                let mut tail = l.split_off(at.min(l.len()));
                l.push_back(value.as_object());
                l.append(&mut tail);
            }
        }
        true
    }

    /// `Range(start, end)`: normalises negative indices, clamps, and
    /// produces the ordered subsequence.
    pub fn range(&self, start: i64, end: i64) -> Vec<Bytes> {
        let len = self.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let (s, e) = normalize_range(len, start, end);
        if s > e {
            return Vec::new();
        }
        match self {
            List::Zip(v) => v[s..=e].iter().map(ZipEntry::to_bytes).collect(),
            List::Linked(l) => l.iter().skip(s).take(e - s + 1).cloned().collect(),
        }
    }

    /// `Trim(start, end)`: keep only the normalised range, deleting
    /// `ltrim` head nodes and `rtrim` tail nodes.
    pub fn trim(&mut self, start: i64, end: i64) {
        let len = self.len() as i64;
        if len == 0 {
            return;
        }
        let (s, e) = normalize_range(len, start, end);
        if s > e {
            self.clear();
            return;
        }
        let ltrim = s;
        let rtrim = (len as usize) - e - 1;
        match self {
            List::Zip(v) => {
                v.drain(0..ltrim);
                let new_len = v.len() - rtrim;
                v.truncate(new_len);
            }
            List::Linked(l) => {
                for _ in 0..ltrim {
                    l.pop_front();
                }
                for _ in 0..rtrim {
                    l.pop_back();
                }
            }
        }
    }

    fn clear(&mut self) {
        match self {
            List::Zip(v) => v.clear(),
            List::Linked(l) => l.clear(),
        }
    }

    /// `Remove(count, value)`: `count = 0` removes all matches, `count >
    /// 0` removes the first `count` from the head, `count < 0` removes
    /// `|count|` from the tail. Returns the number removed.
    pub fn remove(&mut self, count: i64, value: &Elem<'_>) -> usize {
        let matches: Vec<bool> = match self {
            List::Zip(v) => v.iter().map(|e| elem_eq_view(value, &e.view())).collect(),
            List::Linked(l) => l
                .iter()
                .map(|b| elem_eq_view(value, &Cow::Borrowed(b.as_ref())))
                .collect(),
        };

        let mut keep = vec![true; matches.len()];
        let mut removed = 0usize;
        if count == 0 {
            for (i, m) in matches.iter().enumerate() {
                if *m {
                    keep[i] = false;
                    removed += 1;
                }
            }
        } else if count > 0 {
            let mut budget = count as usize;
            for (i, m) in matches.iter().enumerate() {
                if budget == 0 {
                    break;
                }
                if *m {
                    keep[i] = false;
                    removed += 1;
                    budget -= 1;
                }
            }
        } else {
            let mut budget = (-count) as usize;
            for (i, m) in matches.iter().enumerate().rev() {
                if budget == 0 {
                    break;
                }
                if *m {
                    keep[i] = false;
                    removed += 1;
                    budget -= 1;
                }
            }
        }

        if removed == 0 {
            return 0;
        }

        match self {
            List::Zip(v) => {
                let mut it = keep.into_iter();
                v.retain(|_| it.next().unwrap());
            }
            List::Linked(l) => {
                let mut it = keep.into_iter();
                let retained: LinkedList<Bytes> = std::mem::take(l)
                    .into_iter()
                    .filter(|_| it.next().unwrap())
                    .collect();
                *l = retained;
            }
        }
        removed
    }

    pub fn iter(&self) -> ListIter<'_> {
        match self {
            List::Zip(v) => ListIter::Zip(v.iter()),
            List::Linked(l) => ListIter::Linked(l.iter()),
        }
    }
}

impl Default for List {
    fn default() -> Self {
        List::new()
    }
}

pub enum ListIter<'a> {
    Zip(std::slice::Iter<'a, ZipEntry>),
    Linked(std::collections::linked_list::Iter<'a, Bytes>),
}

impl<'a> Iterator for ListIter<'a> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ListIter::Zip(it) => it.next().map(ZipEntry::to_bytes),
            ListIter::Linked(it) => it.next().cloned(),
        }
    }
}

fn elem_eq_view(elem: &Elem<'_>, view: &Cow<'_, [u8]>) -> bool {
    elem.bytes_view().as_ref() == view.as_ref()
}

/// Normalise `[start, end]` (possibly negative, possibly out of bounds)
/// against `len`, clamped to valid array bounds. Returns a pair that may
/// have `s > e`, meaning an empty range.
fn normalize_range(len: i64, start: i64, end: i64) -> (usize, usize) {
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len + i).max(0)
        } else {
            i
        }
    };
    let s = norm(start).min(len - 1).max(0);
    let e = norm(end).min(len - 1);
    if e < 0 || s > e {
        (1, 0) // deliberately empty: s > e
    } else {
        (s as usize, e as usize)
    }
}

fn linked_get(l: &LinkedList<Bytes>, idx: usize) -> Option<&Bytes> {
    let len = l.len();
    if idx * 2 <= len {
        l.iter().nth(idx)
    } else {
        l.iter().rev().nth(len - 1 - idx)
    }
}

fn linked_get_mut(l: &mut LinkedList<Bytes>, idx: usize) -> Option<&mut Bytes> {
    let len = l.len();
    if idx * 2 <= len {
        l.iter_mut().nth(idx)
    } else {
        l.iter_mut().rev().nth(len - 1 - idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig {
            list_max_ziplist_entries: 4,
            list_max_ziplist_value: 8,
            ..Default::default()
        }
    }

    fn push_all(l: &mut List, c: &EngineConfig, items: &[&str]) {
        for s in items {
            l.push(c, Elem::from_bytes(s.as_bytes()), End::Tail);
        }
    }

    #[test]
    fn push_pop_preserves_order() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "b", "c"]);
        assert_eq!(l.range(0, -1), vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert_eq!(l.pop(End::Head).unwrap(), Bytes::from("a"));
        assert_eq!(l.pop(End::Tail).unwrap(), Bytes::from("c"));
    }

    #[test]
    fn trim_keeps_inclusive_range() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "b", "c"]);
        l.trim(1, -1);
        assert_eq!(l.range(0, -1), vec![Bytes::from("b"), Bytes::from("c")]);
    }

    #[test_log::test]
    fn promotes_on_entry_count() {
        let c = cfg();
        let mut l = List::new();
        for i in 0..c.list_max_ziplist_entries {
            l.push(&c, Elem::from_integer(i as i64), End::Tail);
        }
        assert!(l.is_zip_encoded());
        l.push(&c, Elem::from_integer(99), End::Tail);
        assert!(!l.is_zip_encoded());
    }

    #[test]
    fn set_at_the_entries_threshold_does_not_promote() {
        let c = cfg();
        let mut l = List::new();
        for i in 0..c.list_max_ziplist_entries {
            l.push(&c, Elem::from_integer(i as i64), End::Tail);
        }
        assert!(l.is_zip_encoded(), "length == threshold is legal, not exceeding it");

        l.set(&c, 0, Elem::from_bytes(b"short")).unwrap();
        assert!(l.is_zip_encoded(), "Set doesn't change length, so the entries trigger must not fire");
        assert_eq!(l.index(0).unwrap(), Bytes::from("short"));
    }

    #[test]
    fn set_with_an_over_long_value_still_promotes() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "b"]);
        l.set(&c, 0, Elem::from_bytes(b"a value much longer than the threshold")).unwrap();
        assert!(!l.is_zip_encoded());
    }

    #[test]
    fn promotes_on_long_value() {
        let c = cfg();
        let mut l = List::new();
        l.push(&c, Elem::from_bytes(b"short"), End::Tail);
        assert!(l.is_zip_encoded());
        l.push(&c, Elem::from_bytes(b"a value much longer than the threshold"), End::Tail);
        assert!(!l.is_zip_encoded());
    }

    #[test]
    fn promotion_is_one_way() {
        let c = cfg();
        let mut l = List::new();
        l.push(&c, Elem::from_bytes(b"a value much longer than the threshold"), End::Tail);
        assert!(!l.is_zip_encoded());
        l.pop(End::Tail);
        assert!(l.is_empty());
        assert!(!l.is_zip_encoded());
    }

    #[test]
    fn remove_by_count_and_value() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "b", "c"]);
        assert_eq!(l.remove(-2, &Elem::from_bytes(b"x")), 0);
        assert_eq!(l.range(0, -1), vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert_eq!(l.remove(0, &Elem::from_bytes(b"b")), 1);
        assert_eq!(l.range(0, -1), vec![Bytes::from("a"), Bytes::from("c")]);
    }

    #[test]
    fn insert_relative_before_and_after() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "c"]);
        assert!(l.insert_relative(&c, &Elem::from_bytes(b"c"), Elem::from_bytes(b"b"), Side::Before));
        assert_eq!(l.range(0, -1), vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
        assert!(!l.insert_relative(&c, &Elem::from_bytes(b"zzz"), Elem::from_bytes(b"nope"), Side::After));
    }

    #[test]
    fn index_linked_matches_zip() {
        let c = cfg();
        let mut l = List::new();
        push_all(&mut l, &c, &["a", "b", "c", "d", "e"]);
        l.push(&c, Elem::from_bytes(b"a value much longer than the threshold"), End::Tail);
        assert!(!l.is_zip_encoded());
        assert_eq!(l.index(0).unwrap(), Bytes::from("a"));
        assert_eq!(l.index(-1).unwrap(), Bytes::from("a value much longer than the threshold"));
        assert_eq!(l.index(2).unwrap(), Bytes::from("c"));
    }
}
